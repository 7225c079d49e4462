//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::adjust::{DiffArithmetic, Movable, NoAdjustment, Scalar};
use crate::inject::Visit;
use crate::layer::Layer;
use crate::optimizable::Optimizable;
use crate::visit_fields;

pub mod linear;

pub use linear::Linear;

//--------------------------------------------------------------------------------------------------

/// `y = w * x`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Scale<S: Scalar> {
	pub weight: Optimizable<S>,
}

impl<S: Scalar> Scale<S> {
	pub fn new(weight: S) -> Self {
		Self { weight: Optimizable::new(weight) }
	}
}

impl<S: Scalar> Movable for Scale<S> {
	type Adjustment = S;

	fn shift(&mut self, adjustment: S) {
		self.weight.shift(adjustment);
	}
}

impl<S: Scalar> Layer for Scale<S> {
	type Input = S;
	type Output = S;
	type Auxiliary = ();

	fn inspectable_apply(&self, input: &S) -> (S, ()) {
		(*self.weight.value() * *input, ())
	}

	fn adjustment(&self, input: &S, _aux: (), gradient: S) -> (S, S) {
		(gradient * *input, gradient * *self.weight.value())
	}
}

impl<S: Scalar> Visit for Scale<S> {
	visit_fields!(weight);
}

//--------------------------------------------------------------------------------------------------

/// `y = x + b`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Offset<S: Scalar> {
	pub bias: Optimizable<S>,
}

impl<S: Scalar> Offset<S> {
	pub fn new(bias: S) -> Self {
		Self { bias: Optimizable::new(bias) }
	}
}

impl<S: Scalar> Movable for Offset<S> {
	type Adjustment = S;

	fn shift(&mut self, adjustment: S) {
		self.bias.shift(adjustment);
	}
}

impl<S: Scalar> Layer for Offset<S> {
	type Input = S;
	type Output = S;
	type Auxiliary = ();

	fn inspectable_apply(&self, input: &S) -> (S, ()) {
		(*input + *self.bias.value(), ())
	}

	fn adjustment(&self, _input: &S, _aux: (), gradient: S) -> (S, S) {
		(gradient, gradient)
	}
}

impl<S: Scalar> Visit for Offset<S> {
	visit_fields!(bias);
}

//--------------------------------------------------------------------------------------------------

/// Loss: `½ (y - target)²`
///
/// The auxiliary data is the descent direction `rate * (target - y)`, so the loss can be
/// passed to `Layer::learn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SquaredError<S: Scalar> {
	pub target: S,
	pub rate: S,
}

impl<S: Scalar> SquaredError<S> {
	pub fn new(target: S, rate: S) -> Self {
		Self { target, rate }
	}
}

impl<S: Scalar> Movable for SquaredError<S> {
	type Adjustment = NoAdjustment<S>;

	fn shift(&mut self, _adjustment: NoAdjustment<S>) {}
}

impl<S: Scalar> Layer for SquaredError<S> {
	type Input = S;
	type Output = S;
	type Auxiliary = S;

	fn inspectable_apply(&self, input: &S) -> (S, S) {
		let diff = *input - self.target;
		((diff * diff).scaled_f64(0.5), self.rate * (self.target - *input))
	}

	fn adjustment(&self, _input: &S, aux: S, gradient: S) -> (NoAdjustment<S>, S) {
		(NoAdjustment::new(), gradient * aux)
	}
}

impl<S: Scalar> Visit for SquaredError<S> {
	visit_fields!();
}

//--------------------------------------------------------------------------------------------------
