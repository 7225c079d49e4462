//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::{DeserializeSeed, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ErrPack;
use crate::adjust::Movable;
use crate::error::DecodeError;
use crate::optimizer::{AnyOptimizer, OptimizerFactory, OptimizerRegistry, Param, registry};

//--------------------------------------------------------------------------------------------------

#[derive(Clone)]
enum Slot<V: Movable> {
	Plain(V),
	Optimized(AnyOptimizer<V>),
}

/// A learnable value, either plain or driven by an optimizer.
///
/// `value()` reads the same in both representations. Moving a plain value shifts it
/// directly; moving an optimized value hands the adjustment to the optimizer.
///
/// Clones share storage until one of them is moved.
pub struct Optimizable<V: Movable> {
	slot: Rc<Slot<V>>,
}

impl<V: Movable> Clone for Optimizable<V> {
	fn clone(&self) -> Self {
		Self { slot: self.slot.clone() }
	}
}

impl<V: Movable + 'static> Optimizable<V> {
	pub fn new(value: V) -> Self {
		Self { slot: Rc::new(Slot::Plain(value)) }
	}

	pub fn with_optimizer(optimizer: AnyOptimizer<V>) -> Self {
		Self { slot: Rc::new(Slot::Optimized(optimizer)) }
	}

	pub fn value(&self) -> &V {
		match &*self.slot {
			Slot::Plain(value) => value,
			Slot::Optimized(optimizer) => optimizer.value(),
		}
	}

	pub fn is_optimized(&self) -> bool {
		matches!(&*self.slot, Slot::Optimized(_))
	}

	pub fn optimizer(&self) -> Option<&AnyOptimizer<V>> {
		match &*self.slot {
			Slot::Plain(_) => None,
			Slot::Optimized(optimizer) => Some(optimizer),
		}
	}

	pub fn is_shared(&self) -> bool {
		Rc::strong_count(&self.slot) > 1
	}
}

impl<V: Param> Optimizable<V> {
	/// Replaces the current representation by an optimizer made from the current value.
	/// Returns `false` and keeps the parameter unchanged if the factory declines.
	pub fn accept_optimizer<F: OptimizerFactory>(&mut self, factory: &F) -> bool {
		let Some(optimizer) = factory.make_optimizer(self.value().clone()) else {
			return false;
		};
		log::trace!(
			"Optimizable<{}>: installing `{}`",
			std::any::type_name::<V>(),
			optimizer.identifier()
		);
		self.slot = Rc::new(Slot::Optimized(optimizer));
		true
	}

	/// Replaces the optimizer by its current value.
	/// Returns `false` if there was no optimizer.
	pub fn eject_optimizer(&mut self) -> bool {
		let Slot::Optimized(optimizer) = &*self.slot else {
			return false;
		};
		log::trace!(
			"Optimizable<{}>: ejecting `{}`",
			std::any::type_name::<V>(),
			optimizer.identifier()
		);
		self.slot = Rc::new(Slot::Plain(optimizer.value().clone()));
		true
	}

	pub fn into_value(self) -> V {
		match Rc::try_unwrap(self.slot) {
			Ok(Slot::Plain(value)) => value,
			Ok(Slot::Optimized(optimizer)) => optimizer.value().clone(),
			Err(shared) => match &*shared {
				Slot::Plain(value) => value.clone(),
				Slot::Optimized(optimizer) => optimizer.value().clone(),
			},
		}
	}

	/// Decodes a document written by `Serialize`.
	///
	/// A plain value is tried first. Otherwise the document must be an optimizer
	/// tagged with an identifier registered in `registry`.
	///
	/// # Panics
	///
	/// If the identifier is not registered for `V`.
	pub fn decode(
		document: &serde_json::Value,
		registry: &OptimizerRegistry,
	) -> Result<Self, ErrPack<DecodeError>> {
		if let Ok(value) = V::deserialize(document) {
			return Ok(Self::new(value));
		}
		trace_fallback::<V>();
		registry.decode::<V>(document).map(Self::with_optimizer)
	}
}

impl<V: Movable + Clone + 'static> Movable for Optimizable<V> {
	type Adjustment = V::Adjustment;

	fn shift(&mut self, adjustment: V::Adjustment) {
		match Rc::make_mut(&mut self.slot) {
			Slot::Plain(value) => value.shift(adjustment),
			Slot::Optimized(optimizer) => optimizer.shift(adjustment),
		}
	}
}

impl<V: Movable + Serialize + 'static> Serialize for Optimizable<V> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match &*self.slot {
			Slot::Plain(value) => value.serialize(serializer),
			Slot::Optimized(optimizer) => optimizer.serialize(serializer),
		}
	}
}

/// Optimizer documents are decoded with the registry installed by
/// `OptimizerRegistry::install`.
///
/// The input is buffered as a `serde_json::Value` before either form is tried, so
/// only self-describing formats are supported. The same holds for `OptimizableSeed`.
impl<'de, V: Param> Deserialize<'de> for Optimizable<V> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let document = serde_json::Value::deserialize(deserializer)?;
		if let Ok(value) = V::deserialize(&document) {
			return Ok(Self::new(value));
		}
		trace_fallback::<V>();
		let result = match registry::installed() {
			Some(registry) => registry.decode::<V>(&document),
			None if document.get("optimizer").is_none() => Err(DecodeError::missing_identifier()),
			None => no_registry::<V>(),
		};
		result.map(Self::with_optimizer).map_err(D::Error::custom)
	}
}

fn trace_fallback<V>() {
	log::trace!(
		"Optimizable<{}>: not a plain value, decoding as optimizer",
		std::any::type_name::<V>()
	);
}

#[cold]
#[inline(never)]
fn no_registry<V>() -> ! {
	let value_type = std::any::type_name::<V>();
	log::error!("Optimizable<{value_type}>: optimizer document found, but no registry is installed");
	panic!("no optimizer registry installed while decoding Optimizable<{value_type}>");
}

impl<V: Movable + std::fmt::Debug + 'static> std::fmt::Debug for Optimizable<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut tuple = f.debug_tuple("Optimizable");
		tuple.field(self.value());
		if let Some(optimizer) = self.optimizer() {
			tuple.field(&optimizer.identifier());
		}
		tuple.finish()
	}
}

//--------------------------------------------------------------------------------------------------

/// Decodes an `Optimizable<V>` with an explicit registry.
pub struct OptimizableSeed<'r, V> {
	registry: &'r OptimizerRegistry,
	value: PhantomData<V>,
}

impl OptimizerRegistry {
	pub fn seed<V: Param>(&self) -> OptimizableSeed<'_, V> {
		OptimizableSeed { registry: self, value: PhantomData }
	}
}

impl<'de, V: Param> DeserializeSeed<'de> for OptimizableSeed<'_, V> {
	type Value = Optimizable<V>;

	fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Optimizable<V>, D::Error> {
		let document = serde_json::Value::deserialize(deserializer)?;
		Optimizable::decode(&document, self.registry).map_err(D::Error::custom)
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::optimizer::{Momentum, MomentumCoef, MomentumFactory, Optimizer};
	use assert_approx_eq::assert_approx_eq;

	fn momentum(value: f64) -> Optimizable<f64> {
		let coef = MomentumCoef { retain: 0.5, step_width: 1.0 };
		Optimizable::with_optimizer(Momentum::new(value, coef).map(Optimizer::erased).unwrap())
	}

	fn registry() -> OptimizerRegistry {
		OptimizerRegistry::new().with::<Momentum<f64>>()
	}

	#[test]
	fn test_value_is_representation_transparent() {
		let mut plain = Optimizable::new(1.5_f64);
		let mut optimized = momentum(1.5);
		assert_approx_eq!(*plain.value(), *optimized.value());

		// a fresh momentum applies the first adjustment as is
		plain.shift(1.0);
		optimized.shift(1.0);
		assert_approx_eq!(*plain.value(), 2.5);
		assert_approx_eq!(*optimized.value(), 2.5);

		// second step: 0.5 * 1.0 - 1.0 * 1.0
		optimized.shift(1.0);
		assert_approx_eq!(*optimized.value(), 2.0);
	}

	#[test]
	fn test_clones_are_isolated() {
		let a = Optimizable::new(1.0_f64);
		let mut b = a.clone();
		assert!(a.is_shared());
		b.shift(1.0);
		assert_approx_eq!(*a.value(), 1.0);
		assert_approx_eq!(*b.value(), 2.0);

		let c = momentum(1.0);
		let mut d = c.clone();
		d.shift(1.0);
		d.shift(1.0);
		assert_approx_eq!(*c.value(), 1.0);
		assert_approx_eq!(*d.value(), 1.5);
		let untouched = c.optimizer().unwrap().to_document().unwrap();
		assert!(untouched["running"].is_null());
	}

	#[test]
	fn test_accept_and_eject() {
		let mut param = Optimizable::new(4.0_f64);
		assert!(!param.eject_optimizer());

		assert!(param.accept_optimizer(&MomentumFactory::default()));
		assert!(param.is_optimized());
		assert_approx_eq!(*param.value(), 4.0);

		param.shift(-1.0);
		assert!(param.eject_optimizer());
		assert!(!param.is_optimized());
		assert_approx_eq!(*param.value(), 3.0);
		assert_approx_eq!(param.into_value(), 3.0);
	}

	#[test]
	fn test_declined_factory_keeps_parameter() {
		let factory = MomentumFactory::new(MomentumCoef { retain: 7.0, step_width: 0.1 });
		let mut param = Optimizable::new(4.0_f64);
		assert!(!param.accept_optimizer(&factory));
		assert!(!param.is_optimized());
	}

	#[test]
	fn test_serialize() {
		let plain = Optimizable::new(1.5_f64);
		assert_eq!(serde_json::to_string(&plain).unwrap(), "1.5");

		let document = serde_json::to_value(momentum(1.5)).unwrap();
		assert_eq!(document["optimizer"], "momentum");
		assert_approx_eq!(document["value"].as_f64().unwrap(), 1.5);
	}

	#[test]
	fn test_decode_prefers_plain_value() {
		let registry = registry();
		let decoded = Optimizable::<f64>::decode(&serde_json::json!(2.5), &registry).unwrap();
		assert!(!decoded.is_optimized());
		assert_approx_eq!(*decoded.value(), 2.5);

		let document = serde_json::to_value(momentum(1.5)).unwrap();
		let decoded = Optimizable::<f64>::decode(&document, &registry).unwrap();
		assert!(decoded.is_optimized());
		assert_approx_eq!(*decoded.value(), 1.5);
	}

	#[test]
	fn test_decode_errors() {
		let registry = registry();
		let err = Optimizable::<f64>::decode(&serde_json::json!({ "value": 1.0 }), &registry)
			.unwrap_err();
		assert_eq!(err.code, DecodeError::MissingIdentifier);

		let document = serde_json::json!({ "optimizer": "momentum" });
		let err = Optimizable::<f64>::decode(&document, &registry).unwrap_err();
		assert_eq!(err.code, DecodeError::DataCorrupted);
	}

	#[test]
	fn test_seed() {
		let registry = registry();
		let document = serde_json::to_value(momentum(0.25)).unwrap();
		let decoded = registry.seed::<f64>().deserialize(&document).unwrap();
		assert!(decoded.is_optimized());
		assert_approx_eq!(*decoded.value(), 0.25);
	}

	#[test]
	fn test_deserialize_with_installed_registry() {
		let registry = Rc::new(registry());
		let text = serde_json::to_string(&vec![Optimizable::new(1.0_f64), momentum(2.0)]).unwrap();

		let _guard = registry.install();
		let decoded: Vec<Optimizable<f64>> = serde_json::from_str(&text).unwrap();
		assert!(!decoded[0].is_optimized());
		assert!(decoded[1].is_optimized());
		assert_approx_eq!(*decoded[1].value(), 2.0);
	}

	#[test]
	fn test_deserialize_plain_without_registry() {
		let decoded: Optimizable<f64> = serde_json::from_str("3.0").unwrap();
		assert_approx_eq!(*decoded.value(), 3.0);

		let result: Result<Optimizable<f64>, _> = serde_json::from_str(r#"{ "value": 1.0 }"#);
		assert!(result.is_err());
	}

	#[test]
	fn test_deserialize_from_any_self_describing_source() {
		use serde::de::IntoDeserializer;
		use serde::de::value::{Error, F64Deserializer};

		let deserializer: F64Deserializer<Error> = 2.5_f64.into_deserializer();
		let decoded = Optimizable::<f64>::deserialize(deserializer).unwrap();
		assert_approx_eq!(*decoded.value(), 2.5);

		let document = serde_json::to_value(Optimizable::new(0.5_f64)).unwrap();
		let decoded: Optimizable<f64> = serde_json::from_value(document).unwrap();
		assert_approx_eq!(*decoded.value(), 0.5);
	}

	#[test]
	#[should_panic(expected = "no optimizer registry")]
	fn test_deserialize_optimizer_without_registry_panics() {
		let text = serde_json::to_string(&momentum(2.0)).unwrap();
		let _ = serde_json::from_str::<Optimizable<f64>>(&text);
	}

	#[test]
	#[should_panic(expected = "not registered")]
	fn test_unknown_identifier_panics() {
		let document = serde_json::json!({ "optimizer": "adam", "value": 1.0 });
		let _ = Optimizable::<f64>::decode(&document, &registry());
	}
}
