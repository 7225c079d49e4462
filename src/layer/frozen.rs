//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::adjust::{Adj, Movable, NoAdjustment};
use crate::inject::Visit;
use crate::visit_fields;

use super::{Layer, ScalarOf};

//--------------------------------------------------------------------------------------------------

/// A layer excluded from training.
///
/// Evaluation is forwarded to the wrapped layer, but the adjustment is `NoAdjustment`
/// and `shift` does nothing. Serializes as the wrapped layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frozen<L> {
	wrapped: L,
}

impl<L> Frozen<L> {
	pub fn new(wrapped: L) -> Self {
		Self { wrapped }
	}

	pub fn get_ref(&self) -> &L {
		&self.wrapped
	}

	pub fn into_inner(self) -> L {
		self.wrapped
	}
}

impl<L: Movable> Movable for Frozen<L> {
	type Adjustment = NoAdjustment<ScalarOf<L>>;

	fn shift(&mut self, _adjustment: Self::Adjustment) {
		// frozen
	}
}

impl<L: Layer> Layer for Frozen<L> {
	type Input = L::Input;
	type Output = L::Output;
	type Auxiliary = L::Auxiliary;

	fn inspectable_apply(&self, input: &L::Input) -> (L::Output, L::Auxiliary) {
		self.wrapped.inspectable_apply(input)
	}

	fn adjustment(
		&self,
		input: &L::Input,
		aux: L::Auxiliary,
		gradient: Adj<L::Output>,
	) -> (Self::Adjustment, Adj<L::Input>) {
		(NoAdjustment::new(), self.wrapped.backprop(input, aux, gradient))
	}

	fn backprop(
		&self,
		input: &L::Input,
		aux: L::Auxiliary,
		gradient: Adj<L::Output>,
	) -> Adj<L::Input> {
		self.wrapped.backprop(input, aux, gradient)
	}
}

impl<L: Visit> Visit for Frozen<L> {
	visit_fields!(wrapped);
}

//--------------------------------------------------------------------------------------------------
