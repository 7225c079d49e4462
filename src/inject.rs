//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

// Installing and removing optimizers on every `Optimizable` inside a model.
//
// `Visit` is the only thing a composite type has to provide. It is usually generated
// with `visit_fields!`, which forwards to each listed field:
//
//     impl Visit for MyLayer {
//         visit_fields!(weights, bias);
//     }
//
// The traversal is breadth-first. It is implemented with iterative deepening:
// `visit_level(n)` reaches exactly the nodes `n` edges below the root, so the
// parameters closest to the root are visited first.

use ndarray::{Array, Dimension};

use crate::optimizable::Optimizable;
use crate::optimizer::{OptimizerFactory, Param};

//--------------------------------------------------------------------------------------------------

pub trait ParamVisitor {
	fn visit_param<V: Param>(&mut self, param: &mut Optimizable<V>);
}

pub trait Visit {
	/// Visits the parameters exactly `level` edges below `self`.
	///
	/// Returns `true` if there are nodes more than `level` edges below `self`.
	fn visit_level<P: ParamVisitor>(&mut self, level: usize, visitor: &mut P) -> bool;
}

/// Generates `Visit::visit_level` for a struct from a list of its fields.
#[macro_export]
macro_rules! visit_fields {
	($($field:tt),* $(,)?) => {
		#[allow(unused_mut, unused_variables)]
		fn visit_level<P: $crate::inject::ParamVisitor>(
			&mut self,
			level: usize,
			visitor: &mut P,
		) -> bool {
			let Some(below) = level.checked_sub(1) else {
				let fields: &[&str] = &[$(stringify!($field)),*];
				return !fields.is_empty();
			};
			let mut deeper = false;
			$(
				deeper |= $crate::inject::Visit::visit_level(&mut self.$field, below, visitor);
			)*
			deeper
		}
	};
}

//--------------------------------------------------------------------------------------------------

impl<V: Param> Visit for Optimizable<V> {
	fn visit_level<P: ParamVisitor>(&mut self, level: usize, visitor: &mut P) -> bool {
		if level == 0 {
			visitor.visit_param(self);
		}
		false
	}
}

macro_rules! impl_visit_leaf {
	($($t:ty),*) => {
		$(
			impl Visit for $t {
				#[inline]
				fn visit_level<P: ParamVisitor>(&mut self, _level: usize, _visitor: &mut P) -> bool {
					false
				}
			}
		)*
	};
}

impl_visit_leaf!(f32, f64, i32, i64, usize, bool, String);

impl<A, D: Dimension> Visit for Array<A, D> {
	fn visit_level<P: ParamVisitor>(&mut self, _level: usize, _visitor: &mut P) -> bool {
		false
	}
}

impl<T: Visit> Visit for Vec<T> {
	fn visit_level<P: ParamVisitor>(&mut self, level: usize, visitor: &mut P) -> bool {
		let Some(below) = level.checked_sub(1) else {
			return !self.is_empty();
		};
		let mut deeper = false;
		for item in self.iter_mut() {
			deeper |= item.visit_level(below, visitor);
		}
		deeper
	}
}

impl<T: Visit> Visit for Option<T> {
	fn visit_level<P: ParamVisitor>(&mut self, level: usize, visitor: &mut P) -> bool {
		match self {
			Some(item) => item.visit_level(level, visitor),
			None => false,
		}
	}
}

impl<A: Visit, B: Visit> Visit for (A, B) {
	visit_fields!(0, 1);
}

//--------------------------------------------------------------------------------------------------

struct SetOptimizer<'a, F: OptimizerFactory> {
	factory: &'a F,
	installed: usize,
	declined: usize,
}

impl<F: OptimizerFactory> ParamVisitor for SetOptimizer<'_, F> {
	fn visit_param<V: Param>(&mut self, param: &mut Optimizable<V>) {
		if param.accept_optimizer(self.factory) {
			self.installed += 1;
		} else {
			self.declined += 1;
		}
	}
}

struct EjectOptimizer {
	ejected: usize,
}

impl ParamVisitor for EjectOptimizer {
	fn visit_param<V: Param>(&mut self, param: &mut Optimizable<V>) {
		if param.eject_optimizer() {
			self.ejected += 1;
		}
	}
}

struct CountParams {
	count: usize,
}

impl ParamVisitor for CountParams {
	fn visit_param<V: Param>(&mut self, _param: &mut Optimizable<V>) {
		self.count += 1;
	}
}

/// Whole-model operations built on `Visit`.
pub trait Inject: Visit {
	/// Breadth-first walk over every parameter.
	fn walk<P: ParamVisitor>(&mut self, visitor: &mut P) {
		let mut level = 0;
		while self.visit_level(level, visitor) {
			level += 1;
		}
	}

	/// Installs an optimizer on every parameter the factory accepts.
	/// Returns the number of installed optimizers.
	///
	/// Copies of the model made before this call keep their plain parameters.
	fn set_optimizer<F: OptimizerFactory>(&mut self, factory: &F) -> usize {
		let mut visitor = SetOptimizer { factory, installed: 0, declined: 0 };
		self.walk(&mut visitor);
		if visitor.declined > 0 {
			log::warn!(
				"set_optimizer(): factory declined {} of {} parameters",
				visitor.declined,
				visitor.installed + visitor.declined
			);
		}
		log::debug!("set_optimizer(): installed {} optimizers", visitor.installed);
		visitor.installed
	}

	fn optimized<F: OptimizerFactory>(mut self, factory: &F) -> Self
	where
		Self: Sized,
	{
		self.set_optimizer(factory);
		self
	}

	/// Replaces every attached optimizer by its current value.
	/// Returns the number of removed optimizers.
	fn eject_optimizer(&mut self) -> usize {
		let mut visitor = EjectOptimizer { ejected: 0 };
		self.walk(&mut visitor);
		log::debug!("eject_optimizer(): removed {} optimizers", visitor.ejected);
		visitor.ejected
	}

	fn ejecting_optimizer(mut self) -> Self
	where
		Self: Sized,
	{
		self.eject_optimizer();
		self
	}

	fn count_params(&mut self) -> usize {
		let mut visitor = CountParams { count: 0 };
		self.walk(&mut visitor);
		visitor.count
	}
}

impl<T: Visit + ?Sized> Inject for T {}

//--------------------------------------------------------------------------------------------------
