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

/// Merges the outputs of the two branches of a `Combinator`.
pub trait Combine<L: Movable, R: Movable> {
	type Output: Movable;

	/// Extra data captured while merging, needed by `adjustments`.
	type Auxiliary;

	fn inspectable_combine(&self, lhs: &L, rhs: &R) -> (Self::Output, Self::Auxiliary);

	fn combine(&self, lhs: &L, rhs: &R) -> Self::Output {
		self.inspectable_combine(lhs, rhs).0
	}

	/// Adjoint of `combine`: splits the gradient of the merged output into the
	/// gradients of the two branch outputs.
	fn adjustments(
		&self,
		lhs: &L,
		rhs: &R,
		aux: Self::Auxiliary,
		gradient: Adj<Self::Output>,
	) -> (Adj<L>, Adj<R>);
}

//--------------------------------------------------------------------------------------------------

/// Two layers applied to the same input, merged by `combine`.
///
/// ```
///        +-----+
///    +-->| lhs |---+
///    |   +-----+   v
/// ---+          +---------+
///    |          | combine |--->
///    |   +-----+   +---------+
///    +-->| rhs |---^
///        +-----+
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combinator<L, R, C> {
	pub lhs: L,
	pub rhs: R,
	pub combine: C,
}

#[derive(Debug, Clone)]
pub struct CombinatorAux<LOut, ROut, CAux, LAux, RAux> {
	pub lhs_out: LOut,
	pub rhs_out: ROut,
	pub combine: CAux,
	pub lhs: LAux,
	pub rhs: RAux,
}

impl<L, R, C> Combinator<L, R, C> {
	pub fn new(lhs: L, rhs: R, combine: C) -> Self {
		Self { lhs, rhs, combine }
	}
}

impl<L, R, C> Movable for Combinator<L, R, C>
where
	L: Layer,
	R: Layer<Input = L::Input>,
	R::Adjustment: DiffArithmetic<Scalar = ScalarOf<L>>,
	C: Combine<L::Output, R::Output>,
{
	type Adjustment = (L::Adjustment, R::Adjustment);

	fn shift(&mut self, (lhs, rhs): Self::Adjustment) {
		self.lhs.shift(lhs);
		self.rhs.shift(rhs);
	}
}

impl<L, R, C> Layer for Combinator<L, R, C>
where
	L: Layer,
	R: Layer<Input = L::Input>,
	R::Adjustment: DiffArithmetic<Scalar = ScalarOf<L>>,
	C: Combine<L::Output, R::Output>,
{
	type Input = L::Input;
	type Output = C::Output;
	type Auxiliary = CombinatorAux<L::Output, R::Output, C::Auxiliary, L::Auxiliary, R::Auxiliary>;

	fn inspectable_apply(&self, input: &L::Input) -> (C::Output, Self::Auxiliary) {
		let (lhs_out, lhs) = self.lhs.inspectable_apply(input);
		let (rhs_out, rhs) = self.rhs.inspectable_apply(input);
		let (out, combine) = self.combine.inspectable_combine(&lhs_out, &rhs_out);
		(out, CombinatorAux { lhs_out, rhs_out, combine, lhs, rhs })
	}

	fn adjustment(
		&self,
		input: &L::Input,
		aux: Self::Auxiliary,
		gradient: Adj<C::Output>,
	) -> (Self::Adjustment, Adj<L::Input>) {
		let CombinatorAux { lhs_out, rhs_out, combine, lhs, rhs } = aux;
		let (d_lhs, d_rhs) = self.combine.adjustments(&lhs_out, &rhs_out, combine, gradient);
		let (lhs_adj, d_inp_lhs) = self.lhs.adjustment(input, lhs, d_lhs);
		let (rhs_adj, d_inp_rhs) = self.rhs.adjustment(input, rhs, d_rhs);
		// both branches read the same input, so their contributions add up (lhs first)
		((lhs_adj, rhs_adj), d_inp_lhs.sum(d_inp_rhs))
	}

	fn backprop(
		&self,
		input: &L::Input,
		aux: Self::Auxiliary,
		gradient: Adj<C::Output>,
	) -> Adj<L::Input> {
		let CombinatorAux { lhs_out, rhs_out, combine, lhs, rhs } = aux;
		let (d_lhs, d_rhs) = self.combine.adjustments(&lhs_out, &rhs_out, combine, gradient);
		let d_inp_lhs = self.lhs.backprop(input, lhs, d_lhs);
		let d_inp_rhs = self.rhs.backprop(input, rhs, d_rhs);
		d_inp_lhs.sum(d_inp_rhs)
	}
}

impl<L: Visit, R: Visit, C: Visit> Visit for Combinator<L, R, C> {
	visit_fields!(lhs, rhs, combine);
}

//--------------------------------------------------------------------------------------------------

/// Element-wise sum of two outputs of the same type.
///
/// The gradient is passed unchanged to both branches. `Vec` outputs must have equal lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sum;

impl<T: DiffArithmetic + Clone> Combine<T, T> for Sum {
	type Output = T;
	type Auxiliary = ();

	fn inspectable_combine(&self, lhs: &T, rhs: &T) -> (T, ()) {
		(lhs.clone().sum(rhs.clone()), ())
	}

	fn adjustments(&self, _lhs: &T, _rhs: &T, _aux: (), gradient: T) -> (T, T) {
		(gradient.clone(), gradient)
	}
}

impl Visit for Sum {
	visit_fields!();
}

//--------------------------------------------------------------------------------------------------
