//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::adjust::{Adj, Movable};

pub mod layer_optimizer;
pub mod momentum;
pub mod registry;

pub use layer_optimizer::LayerOptimizer;
pub use momentum::{Momentum, MomentumCoef, MomentumFactory};
pub use registry::{OptimizerFamily, OptimizerRegistry, RegistryGuard};

//--------------------------------------------------------------------------------------------------

/// A value that can live inside an `Optimizable`.
pub trait Param:
	Movable<Adjustment: Clone + Serialize + DeserializeOwned + 'static>
	+ Clone
	+ Serialize
	+ DeserializeOwned
	+ 'static
{
}

impl<T> Param for T
where
	T: Movable + Clone + Serialize + DeserializeOwned + 'static,
	T::Adjustment: Clone + Serialize + DeserializeOwned + 'static,
{
}

/// An update rule paired with the value it updates.
pub trait Optimizer: Serialize {
	type Value: Movable;

	fn value(&self) -> &Self::Value;

	/// Stable name of the algorithm. Written next to the serialized state.
	fn identifier(&self) -> &str;

	/// Turns the incoming adjustment into an update of `value`.
	fn step(&mut self, adjustment: Adj<Self::Value>);

	fn erased(self) -> AnyOptimizer<Self::Value>
	where
		Self: Clone + Sized + 'static,
	{
		AnyOptimizer::new(self)
	}
}

/// Creates optimizers for parameters during injection.
pub trait OptimizerFactory {
	/// Returns `None` to leave the parameter without an optimizer.
	fn make_optimizer<V: Param>(&self, value: V) -> Option<AnyOptimizer<V>>;
}

//--------------------------------------------------------------------------------------------------

trait DynOptimizer<V: Movable> {
	fn value(&self) -> &V;
	fn identifier(&self) -> &str;
	fn step(&mut self, adjustment: Adj<V>);
	fn duplicate(&self) -> Rc<dyn DynOptimizer<V>>;
	fn to_document(&self) -> serde_json::Result<serde_json::Value>;
}

impl<O: Optimizer + Clone + 'static> DynOptimizer<O::Value> for O {
	fn value(&self) -> &O::Value {
		Optimizer::value(self)
	}

	fn identifier(&self) -> &str {
		Optimizer::identifier(self)
	}

	fn step(&mut self, adjustment: Adj<O::Value>) {
		Optimizer::step(self, adjustment);
	}

	fn duplicate(&self) -> Rc<dyn DynOptimizer<O::Value>> {
		Rc::new(self.clone())
	}

	fn to_document(&self) -> serde_json::Result<serde_json::Value> {
		serde_json::to_value(self)
	}
}

/// Type-erased optimizer with copy-on-write semantics.
///
/// Clones share one instance. `shift` first makes a private copy if the
/// instance is shared, so clones never observe each other's updates.
pub struct AnyOptimizer<V: Movable> {
	inner: Rc<dyn DynOptimizer<V>>,
}

impl<V: Movable> Clone for AnyOptimizer<V> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}

impl<V: Movable + 'static> AnyOptimizer<V> {
	pub fn new<O: Optimizer<Value = V> + Clone + 'static>(optimizer: O) -> Self {
		Self { inner: Rc::new(optimizer) }
	}

	pub fn value(&self) -> &V {
		self.inner.value()
	}

	pub fn identifier(&self) -> &str {
		self.inner.identifier()
	}

	pub fn is_shared(&self) -> bool {
		Rc::strong_count(&self.inner) > 1
	}

	/// Serialized state of the optimizer, tagged with an `optimizer` identifier field.
	pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
		let mut document = self.inner.to_document()?;
		let Some(map) = document.as_object_mut() else {
			return Err(serde::ser::Error::custom(format!(
				"state of optimizer `{}` must serialize as a map",
				self.identifier()
			)));
		};
		map.insert(
			"optimizer".to_owned(),
			serde_json::Value::String(self.identifier().to_owned()),
		);
		Ok(document)
	}

	#[cold]
	#[inline(never)]
	fn privatize(&mut self) {
		self.inner = self.inner.duplicate();
	}
}

impl<V: Movable + 'static> Movable for AnyOptimizer<V> {
	type Adjustment = Adj<V>;

	fn shift(&mut self, adjustment: Adj<V>) {
		if Rc::get_mut(&mut self.inner).is_none() {
			self.privatize();
		}
		if let Some(optimizer) = Rc::get_mut(&mut self.inner) {
			optimizer.step(adjustment);
		}
	}
}

impl<V: Movable + 'static> Serialize for AnyOptimizer<V> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let document = self.to_document().map_err(serde::ser::Error::custom)?;
		document.serialize(serializer)
	}
}

impl<V: Movable + 'static> std::fmt::Debug for AnyOptimizer<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "AnyOptimizer({})", self.identifier())
	}
}

//--------------------------------------------------------------------------------------------------
