//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::adjust::{Adj, Movable};
use crate::inject::Visit;
use crate::visit_fields;

use super::Layer;

//--------------------------------------------------------------------------------------------------

/// Input and auxiliary data recorded for one iteration of `Many` or `Repeat`.
#[derive(Debug, Clone)]
pub struct Step<I, A> {
	pub input: I,
	pub aux: A,
}

pub type StepTape<I, A> = SmallVec<[Step<I, A>; 4]>;

//--------------------------------------------------------------------------------------------------

/// A list of layers with `Input == Output`, applied left to right.
///
/// The adjustment is index-aligned with `layers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Many<L> {
	pub layers: Vec<L>,
}

impl<L> Many<L> {
	pub fn new(layers: Vec<L>) -> Self {
		Self { layers }
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}
}

impl<L: Movable> Movable for Many<L> {
	type Adjustment = Vec<L::Adjustment>;

	fn shift(&mut self, adjustment: Self::Adjustment) {
		debug_assert_eq!(self.layers.len(), adjustment.len(), "Many::shift(): length mismatch");
		for (layer, adj) in self.layers.iter_mut().zip(adjustment) {
			layer.shift(adj);
		}
	}
}

impl<L, T> Layer for Many<L>
where
	L: Layer<Input = T, Output = T>,
	T: Movable + Clone,
{
	type Input = T;
	type Output = T;
	type Auxiliary = StepTape<T, L::Auxiliary>;

	fn inspectable_apply(&self, input: &T) -> (T, Self::Auxiliary) {
		let mut tape = StepTape::with_capacity(self.layers.len());
		let mut out = input.clone();
		for layer in &self.layers {
			let (result, aux) = layer.inspectable_apply(&out);
			tape.push(Step { input: out, aux });
			out = result;
		}
		(out, tape)
	}

	fn adjustment(
		&self,
		_input: &T,
		aux: Self::Auxiliary,
		gradient: Adj<T>,
	) -> (Self::Adjustment, Adj<T>) {
		let mut adjustments = Vec::with_capacity(aux.len());
		let mut grad = gradient;
		for (layer, Step { input, aux }) in self.layers.iter().zip(aux).rev() {
			let (adj, d_inp) = layer.adjustment(&input, aux, grad);
			adjustments.push(adj);
			grad = d_inp;
		}
		adjustments.reverse();
		(adjustments, grad)
	}

	fn backprop(&self, _input: &T, aux: Self::Auxiliary, gradient: Adj<T>) -> Adj<T> {
		let mut grad = gradient;
		for (layer, Step { input, aux }) in self.layers.iter().zip(aux).rev() {
			grad = layer.backprop(&input, aux, grad);
		}
		grad
	}
}

impl<L: Visit> Visit for Many<L> {
	visit_fields!(layers);
}

//--------------------------------------------------------------------------------------------------
