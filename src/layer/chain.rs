//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::adjust::{Adj, DiffArithmetic, Movable};
use crate::inject::Visit;
use crate::visit_fields;

use super::{Layer, ScalarOf};

//--------------------------------------------------------------------------------------------------

/// Two layers applied one after the other.
///
/// ```
///     +-------+  mid   +--------+
/// --->| first |------->| second |--->
///     +-------+        +--------+
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain<L1, L2> {
	pub first: L1,
	pub second: L2,
}

/// Three layers, right-nested.
pub type Chain3<L1, L2, L3> = Chain<L1, Chain<L2, L3>>;

/// Auxiliary data of a `Chain`.
#[derive(Debug, Clone)]
pub struct ChainAux<Mid, SecondAux, FirstAux> {
	/// Output of `first`, input of `second`.
	pub mid: Mid,
	pub second: SecondAux,
	pub first: FirstAux,
}

impl<L1, L2> Chain<L1, L2> {
	pub fn new(first: L1, second: L2) -> Self {
		Self { first, second }
	}
}

/// Right-nests any number of layers into `Chain`s.
///
/// `chain![a, b, c]` is `Chain::new(a, Chain::new(b, c))`.
#[macro_export]
macro_rules! chain {
	($layer:expr $(,)?) => {
		$layer
	};
	($first:expr, $($rest:expr),+ $(,)?) => {
		$crate::layer::Chain::new($first, $crate::chain!($($rest),+))
	};
}

impl<L1, L2> Movable for Chain<L1, L2>
where
	L1: Layer,
	L2: Layer<Input = L1::Output>,
	L2::Adjustment: DiffArithmetic<Scalar = ScalarOf<L1>>,
{
	type Adjustment = (L1::Adjustment, L2::Adjustment);

	fn shift(&mut self, (first, second): Self::Adjustment) {
		self.first.shift(first);
		self.second.shift(second);
	}
}

impl<L1, L2> Layer for Chain<L1, L2>
where
	L1: Layer,
	L2: Layer<Input = L1::Output>,
	L2::Adjustment: DiffArithmetic<Scalar = ScalarOf<L1>>,
{
	type Input = L1::Input;
	type Output = L2::Output;
	type Auxiliary = ChainAux<L1::Output, L2::Auxiliary, L1::Auxiliary>;

	fn inspectable_apply(&self, input: &L1::Input) -> (L2::Output, Self::Auxiliary) {
		let (mid, first) = self.first.inspectable_apply(input);
		let (out, second) = self.second.inspectable_apply(&mid);
		(out, ChainAux { mid, second, first })
	}

	fn adjustment(
		&self,
		input: &L1::Input,
		aux: Self::Auxiliary,
		gradient: Adj<L2::Output>,
	) -> (Self::Adjustment, Adj<L1::Input>) {
		let ChainAux { mid, second, first } = aux;
		// reverse order: `second` first
		let (second_adj, d_mid) = self.second.adjustment(&mid, second, gradient);
		let (first_adj, d_inp) = self.first.adjustment(input, first, d_mid);
		((first_adj, second_adj), d_inp)
	}

	fn backprop(
		&self,
		input: &L1::Input,
		aux: Self::Auxiliary,
		gradient: Adj<L2::Output>,
	) -> Adj<L1::Input> {
		let ChainAux { mid, second, first } = aux;
		let d_mid = self.second.backprop(&mid, second, gradient);
		self.first.backprop(input, first, d_mid)
	}
}

impl<L1: Visit, L2: Visit> Visit for Chain<L1, L2> {
	visit_fields!(first, second);
}

//--------------------------------------------------------------------------------------------------
