//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use super::Layer;

//--------------------------------------------------------------------------------------------------

/// A model defined by a body layer.
///
/// `learner!` generates `Movable`, `Layer` and `Visit` for the model by forwarding every
/// operation to the body:
///
///     struct Affine {
///         body: Chain<Scale<f64>, Offset<f64>>,
///     }
///
///     impl Learner for Affine {
///         type Body = Chain<Scale<f64>, Offset<f64>>;
///
///         fn body(&self) -> &Self::Body {
///             &self.body
///         }
///
///         fn body_mut(&mut self) -> &mut Self::Body {
///             &mut self.body
///         }
///     }
///
///     learner!(Affine);
///
/// Generic models list their parameters in brackets: `learner!([S: Scalar] Affine<S>)`.
///
/// For `Visit`, the body is the same node as the model, so injection order is the
/// body's order.
pub trait Learner {
	type Body: Layer;

	fn body(&self) -> &Self::Body;

	fn body_mut(&mut self) -> &mut Self::Body;
}

#[macro_export]
macro_rules! learner {
	([$($gen:tt)*] $ty:ty) => {
		impl<$($gen)*> $crate::adjust::Movable for $ty {
			type Adjustment = $crate::adjust::Adj<<$ty as $crate::layer::Learner>::Body>;

			fn shift(&mut self, adjustment: Self::Adjustment) {
				$crate::adjust::Movable::shift($crate::layer::Learner::body_mut(self), adjustment);
			}
		}

		impl<$($gen)*> $crate::layer::Layer for $ty {
			type Input = <<$ty as $crate::layer::Learner>::Body as $crate::layer::Layer>::Input;
			type Output = <<$ty as $crate::layer::Learner>::Body as $crate::layer::Layer>::Output;
			type Auxiliary =
				<<$ty as $crate::layer::Learner>::Body as $crate::layer::Layer>::Auxiliary;

			fn inspectable_apply(&self, input: &Self::Input) -> (Self::Output, Self::Auxiliary) {
				$crate::layer::Layer::inspectable_apply($crate::layer::Learner::body(self), input)
			}

			fn apply(&self, input: &Self::Input) -> Self::Output {
				$crate::layer::Layer::apply($crate::layer::Learner::body(self), input)
			}

			fn aux_data(&self, input: &Self::Input) -> Self::Auxiliary {
				$crate::layer::Layer::aux_data($crate::layer::Learner::body(self), input)
			}

			fn adjustment(
				&self,
				input: &Self::Input,
				aux: Self::Auxiliary,
				gradient: $crate::adjust::Adj<Self::Output>,
			) -> (Self::Adjustment, $crate::adjust::Adj<Self::Input>) {
				$crate::layer::Layer::adjustment(
					$crate::layer::Learner::body(self),
					input,
					aux,
					gradient,
				)
			}

			fn backprop(
				&self,
				input: &Self::Input,
				aux: Self::Auxiliary,
				gradient: $crate::adjust::Adj<Self::Output>,
			) -> $crate::adjust::Adj<Self::Input> {
				$crate::layer::Layer::backprop($crate::layer::Learner::body(self), input, aux, gradient)
			}
		}

		impl<$($gen)*> $crate::inject::Visit for $ty
		where
			<$ty as $crate::layer::Learner>::Body: $crate::inject::Visit,
		{
			fn visit_level<P: $crate::inject::ParamVisitor>(
				&mut self,
				level: usize,
				visitor: &mut P,
			) -> bool {
				$crate::inject::Visit::visit_level(
					$crate::layer::Learner::body_mut(self),
					level,
					visitor,
				)
			}
		}
	};
	($ty:ty) => {
		$crate::learner!([] $ty);
	};
}

//--------------------------------------------------------------------------------------------------
