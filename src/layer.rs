//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

pub mod chain;
pub mod combinator;
pub mod frozen;
pub mod learner;
pub mod many;
pub mod repeat;

#[cfg(test)]
mod tests;

use crate::adjust::{Adj, DiffArithmetic, Movable, NoAdjustment, Scalar};
use crate::optimizer::layer_optimizer::LayerOptimizer;

pub use chain::{Chain, Chain3, ChainAux};
pub use combinator::{Combinator, CombinatorAux, Combine, Sum};
pub use frozen::Frozen;
pub use learner::Learner;
pub use many::{Many, Step, StepTape};
pub use repeat::Repeat;

//--------------------------------------------------------------------------------------------------

/// Scalar shared by every leaf of a layer's adjustment.
pub type ScalarOf<L> = <<L as Movable>::Adjustment as DiffArithmetic>::Scalar;

/// A differentiable unit of computation.
///
/// `inspectable_apply` is the forward pass. It returns the output together with the
/// auxiliary data the reverse pass needs. The auxiliary data is consumed by `adjustment`,
/// so it serves exactly one reverse pass. Pairing it with a different input is a contract
/// violation which is not detected; the results are unspecified.
///
/// The layer's learnable state is updated through `Movable::shift`.
pub trait Layer: Movable {
	type Input: Movable;
	type Output: Movable;
	type Auxiliary;

	fn inspectable_apply(&self, input: &Self::Input) -> (Self::Output, Self::Auxiliary);

	fn apply(&self, input: &Self::Input) -> Self::Output {
		self.inspectable_apply(input).0
	}

	fn aux_data(&self, input: &Self::Input) -> Self::Auxiliary {
		self.inspectable_apply(input).1
	}

	/// Reverse pass.
	///
	/// Given the gradient with respect to the output, returns the adjustment of the
	/// layer's own state and the gradient with respect to the input.
	fn adjustment(
		&self,
		input: &Self::Input,
		aux: Self::Auxiliary,
		gradient: Adj<Self::Output>,
	) -> (Self::Adjustment, Adj<Self::Input>);

	fn backprop(
		&self,
		input: &Self::Input,
		aux: Self::Auxiliary,
		gradient: Adj<Self::Output>,
	) -> Adj<Self::Input> {
		self.adjustment(input, aux, gradient).1
	}

	/// One training step.
	///
	/// The loss layer's auxiliary data is used directly as the gradient, so this only works
	/// with losses that compute their gradient during the forward pass.
	fn learn<Loss>(&mut self, examples: &Self::Input, loss: &Loss)
	where
		Loss: Function<Input = Self::Output, Auxiliary = Adj<Self::Output>>,
	{
		let (result, aux) = self.inspectable_apply(examples);
		let gradient = loss.aux_data(&result);
		let (adjustment, _) = self.adjustment(examples, aux, gradient);
		self.shift(adjustment);
	}

	fn chain<Next>(self, next: Next) -> Chain<Self, Next>
	where
		Self: Sized,
		Next: Layer<Input = Self::Output>,
	{
		Chain::new(self, next)
	}

	fn frozen(self) -> Frozen<Self>
	where
		Self: Sized,
	{
		Frozen::new(self)
	}

	/// Uses the layer's output as an optimized value: moving the output moves both the layer
	/// and `seed`.
	fn as_optimizer(self, identifier: impl Into<String>, seed: Self::Input) -> LayerOptimizer<Self>
	where
		Self: Sized,
	{
		LayerOptimizer::new(identifier, self, seed)
	}
}

//--------------------------------------------------------------------------------------------------

/// A layer without learnable state.
pub trait Function: Layer {}

impl<L, S> Function for L
where
	S: Scalar,
	L: Layer<Adjustment = NoAdjustment<S>>,
{
}

//--------------------------------------------------------------------------------------------------
