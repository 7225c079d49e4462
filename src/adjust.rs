//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod nd;

//--------------------------------------------------------------------------------------------------

/// Adjustment type of a movable value.
pub type Adj<T> = <T as Movable>::Adjustment;

/// A value that can be shifted by an adjustment.
///
/// `shift` is the only primitive. The operator-like methods are derived from it
/// and from the negation of the adjustment.
pub trait Movable {
	type Adjustment: DiffArithmetic;

	/// `self += adjustment`
	fn shift(&mut self, adjustment: Self::Adjustment);

	/// `self + adjustment`
	fn shifted(mut self, adjustment: Self::Adjustment) -> Self
	where
		Self: Sized,
	{
		self.shift(adjustment);
		self
	}

	/// `self -= adjustment`
	fn shift_back(&mut self, adjustment: Self::Adjustment) {
		self.shift(adjustment.negated());
	}

	/// `self - adjustment`
	fn shifted_back(mut self, adjustment: Self::Adjustment) -> Self
	where
		Self: Sized,
	{
		self.shift_back(adjustment);
		self
	}
}

/// An adjustment: closed under addition, negation and scaling, and its own adjustment.
///
/// Every component of a composite adjustment uses the same `Scalar`, so scaling
/// a nested adjustment scales every leaf by the same number.
pub trait DiffArithmetic: Movable<Adjustment = Self> + Sized {
	type Scalar: Scalar;

	fn negated(self) -> Self;

	fn scaled(self, factor: Self::Scalar) -> Self;

	/// Scales every leaf by a real factor. Integer leaves multiply in `f64` and
	/// truncate the product toward zero.
	fn scaled_f64(self, factor: f64) -> Self;

	fn sum(self, other: Self) -> Self {
		self.shifted(other)
	}
}

/// A numeric leaf of the algebra. Its scalar is itself.
pub trait Scalar:
	DiffArithmetic<Scalar = Self>
	+ Copy
	+ Default
	+ PartialEq
	+ PartialOrd
	+ Debug
	+ Add<Output = Self>
	+ Sub<Output = Self>
	+ Mul<Output = Self>
	+ Serialize
	+ DeserializeOwned
	+ 'static
{
	/// Integer scalars truncate toward zero.
	fn from_f64(value: f64) -> Self;

	fn to_f64(self) -> f64;
}

//--------------------------------------------------------------------------------------------------

macro_rules! impl_scalar_algebra {
	($($t:ty),*) => {
		$(
			impl Movable for $t {
				type Adjustment = Self;

				#[inline]
				fn shift(&mut self, adjustment: Self) {
					*self += adjustment;
				}
			}

			impl DiffArithmetic for $t {
				type Scalar = Self;

				#[inline]
				fn negated(self) -> Self {
					-self
				}

				#[inline]
				fn scaled(self, factor: Self) -> Self {
					factor * self
				}

				#[inline]
				fn scaled_f64(self, factor: f64) -> Self {
					Self::from_f64(self.to_f64() * factor)
				}
			}
		)*
	};
}

impl_scalar_algebra!(f32, f64, i32, i64);

impl Scalar for f32 {
	#[allow(clippy::cast_possible_truncation)]
	fn from_f64(value: f64) -> Self {
		value as Self
	}

	fn to_f64(self) -> f64 {
		f64::from(self)
	}
}

impl Scalar for f64 {
	fn from_f64(value: f64) -> Self {
		value
	}

	fn to_f64(self) -> f64 {
		self
	}
}

impl Scalar for i32 {
	#[allow(clippy::cast_possible_truncation)]
	fn from_f64(value: f64) -> Self {
		value as Self
	}

	fn to_f64(self) -> f64 {
		f64::from(self)
	}
}

impl Scalar for i64 {
	#[allow(clippy::cast_possible_truncation)]
	fn from_f64(value: f64) -> Self {
		value as Self
	}

	#[allow(clippy::cast_precision_loss)]
	fn to_f64(self) -> f64 {
		self as f64
	}
}

//--------------------------------------------------------------------------------------------------

impl<A: Movable, B: Movable> Movable for (A, B)
where
	B::Adjustment: DiffArithmetic<Scalar = <A::Adjustment as DiffArithmetic>::Scalar>,
{
	type Adjustment = (A::Adjustment, B::Adjustment);

	fn shift(&mut self, (a, b): Self::Adjustment) {
		self.0.shift(a);
		self.1.shift(b);
	}
}

impl<A: DiffArithmetic, B: DiffArithmetic<Scalar = A::Scalar>> DiffArithmetic for (A, B) {
	type Scalar = A::Scalar;

	fn negated(self) -> Self {
		(self.0.negated(), self.1.negated())
	}

	fn scaled(self, factor: A::Scalar) -> Self {
		(self.0.scaled(factor), self.1.scaled(factor))
	}

	fn scaled_f64(self, factor: f64) -> Self {
		(self.0.scaled_f64(factor), self.1.scaled_f64(factor))
	}
}

/// Element-wise. The lengths must match; release builds shift only the common prefix.
impl<T: Movable> Movable for Vec<T> {
	type Adjustment = Vec<T::Adjustment>;

	fn shift(&mut self, adjustment: Self::Adjustment) {
		debug_assert_eq!(self.len(), adjustment.len(), "Vec::shift(): length mismatch");
		for (value, adj) in self.iter_mut().zip(adjustment) {
			value.shift(adj);
		}
	}
}

impl<T: DiffArithmetic> DiffArithmetic for Vec<T> {
	type Scalar = T::Scalar;

	fn negated(self) -> Self {
		self.into_iter().map(T::negated).collect()
	}

	fn scaled(self, factor: T::Scalar) -> Self {
		self.into_iter().map(|value| value.scaled(factor)).collect()
	}

	fn scaled_f64(self, factor: f64) -> Self {
		self.into_iter().map(|value| value.scaled_f64(factor)).collect()
	}
}

//--------------------------------------------------------------------------------------------------

/// Zero-information adjustment. Every operation is a no-op.
pub struct NoAdjustment<S = f64>(PhantomData<S>);

impl<S> NoAdjustment<S> {
	pub const fn new() -> Self {
		Self(PhantomData)
	}
}

impl<S> Clone for NoAdjustment<S> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<S> Copy for NoAdjustment<S> {}

impl<S> Default for NoAdjustment<S> {
	fn default() -> Self {
		Self::new()
	}
}

impl<S> PartialEq for NoAdjustment<S> {
	fn eq(&self, _other: &Self) -> bool {
		true
	}
}

impl<S> Eq for NoAdjustment<S> {}

impl<S> Debug for NoAdjustment<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("NoAdjustment")
	}
}

impl<S: Scalar> Movable for NoAdjustment<S> {
	type Adjustment = Self;

	fn shift(&mut self, _adjustment: Self) {}
}

impl<S: Scalar> DiffArithmetic for NoAdjustment<S> {
	type Scalar = S;

	fn negated(self) -> Self {
		self
	}

	fn scaled(self, _factor: S) -> Self {
		self
	}

	fn scaled_f64(self, _factor: f64) -> Self {
		self
	}
}

impl<S> Serialize for NoAdjustment<S> {
	fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
		serializer.serialize_unit()
	}
}

impl<'de, S> Deserialize<'de> for NoAdjustment<S> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		<()>::deserialize(deserializer)?;
		Ok(Self::new())
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use assert_approx_eq::assert_approx_eq;

	#[test]
	fn test_operators_derive_from_shift() {
		let mut x = 1.5_f64;
		x.shift(2.0);
		assert_approx_eq!(x, 3.5);
		assert_approx_eq!(x.shifted(1.0), 4.5);
		assert_approx_eq!(x.shifted_back(1.0), 2.5);
		x.shift_back(0.5);
		assert_approx_eq!(x, 3.0);
	}

	#[test]
	fn test_scaling_uses_leaf_scalar() {
		assert_approx_eq!(3.0_f32.scaled(0.5), 1.5_f32);
		assert_eq!(7_i64.scaled(3), 21);
		assert_eq!(i64::from_f64(2.9), 2);
		assert_eq!(i32::from_f64(-2.9), -2);
	}

	#[test]
	fn test_real_factor_on_integer_leaves() {
		assert_eq!(100_i64.scaled_f64(0.9), 90);
		assert_eq!(7_i32.scaled_f64(0.5), 3);
		assert_eq!((-7_i64).scaled_f64(0.5), -3);
		assert_eq!(vec![(10_i64, 20_i64)].scaled_f64(0.25), vec![(2, 5)]);
		assert_approx_eq!(3.0_f32.scaled_f64(0.5), 1.5_f32);
	}

	#[test]
	fn test_pair_algebra() {
		let pair = (1.0_f64, vec![2.0_f64, -3.0]);
		let neg = pair.clone().negated();
		assert_approx_eq!(neg.0, -1.0);
		assert_eq!(neg.1, vec![-2.0, 3.0]);

		let scaled = pair.clone().scaled(2.0);
		assert_approx_eq!(scaled.0, 2.0);
		assert_eq!(scaled.1, vec![4.0, -6.0]);

		let sum = pair.clone().sum(neg);
		assert_approx_eq!(sum.0, 0.0);
		assert_eq!(sum.1, vec![0.0, 0.0]);
	}

	#[test]
	fn test_nested_adjustments_share_scalar() {
		let nested = ((1.0_f64, 2.0_f64), vec![(3.0_f64, 4.0_f64)]);
		let ((a, b), rest) = nested.scaled(10.0);
		assert_approx_eq!(a, 10.0);
		assert_approx_eq!(b, 20.0);
		assert_approx_eq!(rest[0].0, 30.0);
		assert_approx_eq!(rest[0].1, 40.0);
	}

	#[test]
	fn test_vec_shift() {
		let mut v = vec![1.0_f64, 2.0, 3.0];
		v.shift(vec![1.0, 1.0, -1.0]);
		assert_eq!(v, vec![2.0, 3.0, 2.0]);
		assert_eq!(v.sum(vec![0.5, 0.5, 0.5]), vec![2.5, 3.5, 2.5]);
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "length mismatch")]
	fn test_vec_sum_rejects_length_mismatch() {
		let _ = vec![1.0_f64, 2.0].sum(vec![1.0, 1.0, 1.0]);
	}

	#[test]
	fn test_no_adjustment_is_inert() {
		let mut none = NoAdjustment::<f64>::new();
		none.shift(NoAdjustment::new());
		assert_eq!(none.negated().scaled(5.0), NoAdjustment::new());
		assert_eq!(serde_json::to_string(&none).ok().as_deref(), Some("null"));
	}
}
