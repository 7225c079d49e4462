//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use ndarray::{Array, Dimension};

use super::{DiffArithmetic, Movable, Scalar};

//--------------------------------------------------------------------------------------------------

/// Element-wise. The adjustment is broadcast to the shape of `self`;
/// shapes that cannot be broadcast are a contract violation and panic.
impl<A: Scalar, D: Dimension> Movable for Array<A, D> {
	type Adjustment = Self;

	fn shift(&mut self, adjustment: Self) {
		self.zip_mut_with(&adjustment, |value, &adj| value.shift(adj));
	}
}

impl<A: Scalar, D: Dimension> DiffArithmetic for Array<A, D> {
	type Scalar = A;

	fn negated(self) -> Self {
		self.mapv_into(A::negated)
	}

	fn scaled(self, factor: A) -> Self {
		self.mapv_into(|value| value.scaled(factor))
	}

	fn scaled_f64(self, factor: f64) -> Self {
		self.mapv_into(|value| value.scaled_f64(factor))
	}
}

//--------------------------------------------------------------------------------------------------
