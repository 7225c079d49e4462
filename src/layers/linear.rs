//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::adjust::Movable;
use crate::inject::Visit;
use crate::layer::Layer;
use crate::optimizable::Optimizable;
use crate::util::LossyInto;
use crate::visit_fields;

//--------------------------------------------------------------------------------------------------

/// Linear Layer transforming inputs to outputs
///
/// This is basically a thin wrapper around matrix multiplication.
/// It does not include a bias term.
///
///     input: [inputs]
///     output: [outputs]
///     weights: [outputs, inputs]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
	pub weights: Optimizable<Array2<f64>>,
	forward_scale: f64,
}

impl Linear {
	/// Zero weights.
	pub fn new(inputs: usize, outputs: usize) -> Self {
		Self::with_weights(Array2::zeros((outputs, inputs)))
	}

	/// `weights` has shape `[outputs, inputs]`.
	pub fn with_weights(weights: Array2<f64>) -> Self {
		let inputs = weights.ncols().max(1);
		Self {
			weights: Optimizable::new(weights),
			forward_scale: 1.0 / inputs.lossy_into().sqrt(),
		}
	}

	pub fn inputs(&self) -> usize {
		self.weights.value().ncols()
	}

	pub fn outputs(&self) -> usize {
		self.weights.value().nrows()
	}
}

impl Movable for Linear {
	type Adjustment = Array2<f64>;

	fn shift(&mut self, adjustment: Array2<f64>) {
		self.weights.shift(adjustment);
	}
}

impl Layer for Linear {
	type Input = Array1<f64>;
	type Output = Array1<f64>;
	type Auxiliary = ();

	fn inspectable_apply(&self, input: &Array1<f64>) -> (Array1<f64>, ()) {
		let w = self.weights.value();
		(w.dot(input) * self.forward_scale, ())
	}

	fn adjustment(
		&self,
		input: &Array1<f64>,
		_aux: (),
		d_out: Array1<f64>,
	) -> (Array2<f64>, Array1<f64>) {
		let w = self.weights.value();

		// d_w = d_out (x) input
		let d_o = d_out.view().insert_axis(Axis(1));
		let i = input.view().insert_axis(Axis(0));
		let d_w = d_o.dot(&i) * self.forward_scale;

		let d_inp = w.t().dot(&d_out) * self.forward_scale;

		(d_w, d_inp)
	}
}

impl Visit for Linear {
	visit_fields!(weights);
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use assert_approx_eq::assert_approx_eq;
	use ndarray::array;

	#[test]
	fn test_linear() {
		let linear = Linear::with_weights(array![[1.0, 2.0], [3.0, 4.0]]);
		assert_eq!(linear.inputs(), 2);
		assert_eq!(linear.outputs(), 2);
		let s = 1.0 / 2.0_f64.sqrt();

		let x = array![1.0, 1.0];
		let (out, aux) = linear.inspectable_apply(&x);
		assert_approx_eq!(out[0], 3.0 * s);
		assert_approx_eq!(out[1], 7.0 * s);

		let (d_w, d_inp) = linear.adjustment(&x, aux, array![1.0, 0.0]);
		assert_approx_eq!(d_inp[0], 1.0 * s);
		assert_approx_eq!(d_inp[1], 2.0 * s);
		assert_approx_eq!(d_w[[0, 0]], s);
		assert_approx_eq!(d_w[[0, 1]], s);
		assert_approx_eq!(d_w[[1, 0]], 0.0);
		assert_approx_eq!(d_w[[1, 1]], 0.0);
	}

	#[test]
	fn test_shift_moves_weights() {
		let mut linear = Linear::new(3, 1);
		assert_approx_eq!(linear.apply(&array![1.0, 2.0, 3.0])[0], 0.0);

		linear.shift(array![[1.0, 1.0, 1.0]]);
		assert_approx_eq!(linear.apply(&array![1.0, 2.0, 3.0])[0], 6.0 / 3.0_f64.sqrt());
	}

	#[test]
	fn test_serde() {
		let linear = Linear::with_weights(array![[0.5, -0.5]]);
		let text = serde_json::to_string(&linear).unwrap();
		let decoded: Linear = serde_json::from_str(&text).unwrap();
		assert_eq!(*decoded.weights.value(), array![[0.5, -0.5]]);
		assert_approx_eq!(decoded.apply(&array![2.0, 0.0])[0], 1.0 / 2.0_f64.sqrt());
	}
}
