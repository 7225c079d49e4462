//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::adjust::{Adj, Movable};
use crate::inject::Visit;
use crate::visit_fields;

use super::Layer;
use super::many::{Step, StepTape};

//--------------------------------------------------------------------------------------------------

/// One layer applied to its own output `repetitions` times.
///
/// The adjustment holds one entry per iteration, last iteration first.
/// `shift` applies them to the single layer in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repeat<L> {
	pub layer: L,
	repetitions: usize,
}

impl<L> Repeat<L> {
	pub fn new(layer: L, repetitions: usize) -> Self {
		Self { layer, repetitions }
	}

	pub fn repetitions(&self) -> usize {
		self.repetitions
	}
}

impl<L: Movable> Movable for Repeat<L> {
	type Adjustment = Vec<L::Adjustment>;

	fn shift(&mut self, adjustment: Self::Adjustment) {
		for adj in adjustment {
			self.layer.shift(adj);
		}
	}
}

impl<L, T> Layer for Repeat<L>
where
	L: Layer<Input = T, Output = T>,
	T: Movable + Clone,
{
	type Input = T;
	type Output = T;
	type Auxiliary = StepTape<T, L::Auxiliary>;

	fn inspectable_apply(&self, input: &T) -> (T, Self::Auxiliary) {
		let mut tape = StepTape::with_capacity(self.repetitions);
		let mut out = input.clone();
		for _ in 0..self.repetitions {
			let (result, aux) = self.layer.inspectable_apply(&out);
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
		for Step { input, aux } in aux.into_iter().rev() {
			let (adj, d_inp) = self.layer.adjustment(&input, aux, grad);
			adjustments.push(adj);
			grad = d_inp;
		}
		(adjustments, grad)
	}

	fn backprop(&self, _input: &T, aux: Self::Auxiliary, gradient: Adj<T>) -> Adj<T> {
		let mut grad = gradient;
		for Step { input, aux } in aux.into_iter().rev() {
			grad = self.layer.backprop(&input, aux, grad);
		}
		grad
	}
}

impl<L: Visit> Visit for Repeat<L> {
	visit_fields!(layer, repetitions);
}

//--------------------------------------------------------------------------------------------------
