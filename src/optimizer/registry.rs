//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ErrPack;
use crate::adjust::Movable;
use crate::error::DecodeError;

use super::{AnyOptimizer, Optimizer, Param};

//--------------------------------------------------------------------------------------------------

/// An optimizer type that can be decoded from its serialized document.
pub trait OptimizerFamily: Optimizer + Clone + 'static {
	const IDENTIFIER: &'static str;

	/// Returns `Ok(None)` if the document is well formed but describes an invalid state.
	fn decode(document: &serde_json::Value) -> serde_json::Result<Option<Self>>;
}

pub type DecodeFn<V> = fn(&serde_json::Value) -> serde_json::Result<Option<AnyOptimizer<V>>>;

fn decode_family<O>(document: &serde_json::Value) -> serde_json::Result<Option<AnyOptimizer<O::Value>>>
where
	O: OptimizerFamily,
	O::Value: 'static,
{
	Ok(O::decode(document)?.map(AnyOptimizer::new))
}

/// Maps optimizer identifiers to decoders.
///
/// A decoder is registered for one value type. `Momentum<f64>` and
/// `Momentum<Array2<f64>>` share the identifier but are registered separately.
#[derive(Default)]
pub struct OptimizerRegistry {
	decoders: HashMap<String, HashMap<TypeId, Box<dyn Any>>>,
}

impl OptimizerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<O>(&mut self) -> &mut Self
	where
		O: OptimizerFamily,
		O::Value: 'static,
	{
		self.register_decoder::<O::Value>(O::IDENTIFIER, decode_family::<O>)
	}

	pub fn with<O>(mut self) -> Self
	where
		O: OptimizerFamily,
		O::Value: 'static,
	{
		self.register::<O>();
		self
	}

	/// Registers a decoder under an explicit identifier. A previous decoder for the
	/// same identifier and value type is replaced.
	pub fn register_decoder<V: 'static>(
		&mut self,
		identifier: impl Into<String>,
		decoder: DecodeFn<V>,
	) -> &mut Self
	where
		V: Movable,
	{
		let identifier = identifier.into();
		log::debug!(
			"OptimizerRegistry: registering `{identifier}` for {}",
			std::any::type_name::<V>()
		);
		let by_type = self.decoders.entry(identifier).or_default();
		by_type.insert(TypeId::of::<V>(), Box::new(decoder));
		self
	}

	pub fn contains<V: 'static>(&self, identifier: &str) -> bool {
		self.decoders
			.get(identifier)
			.is_some_and(|by_type| by_type.contains_key(&TypeId::of::<V>()))
	}

	pub fn decoder<V: Movable + 'static>(&self, identifier: &str) -> Option<DecodeFn<V>> {
		let by_type = self.decoders.get(identifier)?;
		let decoder = by_type.get(&TypeId::of::<V>())?;
		decoder.downcast_ref::<DecodeFn<V>>().copied()
	}

	/// Decodes an optimizer document tagged with an `optimizer` identifier.
	///
	/// # Panics
	///
	/// If the identifier is not registered for `V`.
	pub fn decode<V: Param>(
		&self,
		document: &serde_json::Value,
	) -> Result<AnyOptimizer<V>, ErrPack<DecodeError>> {
		let Some(identifier) = document.get("optimizer").and_then(serde_json::Value::as_str) else {
			return Err(DecodeError::missing_identifier());
		};
		let Some(decoder) = self.decoder::<V>(identifier) else {
			unregistered::<V>(identifier);
		};
		match decoder(document) {
			Ok(Some(optimizer)) => Ok(optimizer),
			Ok(None) => Err(DecodeError::data_corrupted(identifier, None)),
			Err(err) => Err(DecodeError::data_corrupted(identifier, Some(err))),
		}
	}

	/// Makes the registry available to `Deserialize` impls on this thread
	/// until the guard is dropped. Installations nest.
	pub fn install(self: &Rc<Self>) -> RegistryGuard {
		INSTALLED.with(|stack| stack.borrow_mut().push(self.clone()));
		RegistryGuard { _not_send: std::marker::PhantomData }
	}
}

impl std::fmt::Debug for OptimizerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut identifiers: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
		identifiers.sort_unstable();
		f.debug_struct("OptimizerRegistry").field("identifiers", &identifiers).finish()
	}
}

#[cold]
#[inline(never)]
fn unregistered<V>(identifier: &str) -> ! {
	let value_type = std::any::type_name::<V>();
	log::error!("OptimizerRegistry: `{identifier}` is not registered for {value_type}");
	panic!("optimizer `{identifier}` is not registered for {value_type}");
}

//--------------------------------------------------------------------------------------------------

thread_local! {
	static INSTALLED: RefCell<Vec<Rc<OptimizerRegistry>>> = const { RefCell::new(Vec::new()) };
}

/// Uninstalls the registry when dropped.
#[must_use]
pub struct RegistryGuard {
	_not_send: std::marker::PhantomData<Rc<()>>,
}

impl Drop for RegistryGuard {
	fn drop(&mut self) {
		INSTALLED.with(|stack| {
			stack.borrow_mut().pop();
		});
	}
}

/// The most recently installed registry on this thread.
pub fn installed() -> Option<Rc<OptimizerRegistry>> {
	INSTALLED.with(|stack| stack.borrow().last().cloned())
}

//--------------------------------------------------------------------------------------------------
