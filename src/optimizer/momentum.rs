//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

// Momentum:
//
//     running = adjustment                                      (first step)
//     running = retain * running - step_width * adjustment      (later steps)
//     value += running

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::adjust::{Adj, DiffArithmetic, Movable};

use super::{AnyOptimizer, Optimizer, OptimizerFactory, OptimizerFamily, Param};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumCoef {
	pub retain: f64,
	pub step_width: f64,
}

impl Default for MomentumCoef {
	fn default() -> Self {
		Self { retain: 0.9, step_width: 0.1 }
	}
}

impl MomentumCoef {
	/// `retain` must be in `[0, 1]`.
	pub fn is_valid(&self) -> bool {
		(0.0..=1.0).contains(&self.retain)
	}
}

//--------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(bound(
	serialize = "V: Serialize, V::Adjustment: Serialize",
	deserialize = "V: DeserializeOwned, V::Adjustment: DeserializeOwned"
))]
pub struct Momentum<V: Movable> {
	value: V,
	running: Option<V::Adjustment>,
	coef: MomentumCoef,
}

const IDENTIFIER: &str = "momentum";

impl<V: Movable> Momentum<V> {
	/// Returns `None` if `coef` is not valid.
	pub fn new(value: V, coef: MomentumCoef) -> Option<Self> {
		if !coef.is_valid() {
			Self::invalid_coef(coef);
			return None;
		}
		Some(Self { value, running: None, coef })
	}

	#[cold]
	#[inline(never)]
	fn invalid_coef(coef: MomentumCoef) {
		log::warn!("Momentum::new(): retain = {} is outside of [0, 1]", coef.retain);
	}

	pub fn coef(&self) -> MomentumCoef {
		self.coef
	}

	/// The last applied update. `None` before the first step.
	pub fn running(&self) -> Option<&V::Adjustment> {
		self.running.as_ref()
	}

	pub fn into_value(self) -> V {
		self.value
	}
}

impl<V: Movable + Clone> Clone for Momentum<V>
where
	V::Adjustment: Clone,
{
	fn clone(&self) -> Self {
		Self {
			value: self.value.clone(),
			running: self.running.clone(),
			coef: self.coef,
		}
	}
}

impl<V> Optimizer for Momentum<V>
where
	V: Movable + Serialize,
	V::Adjustment: Clone + Serialize,
{
	type Value = V;

	fn value(&self) -> &V {
		&self.value
	}

	fn identifier(&self) -> &str {
		IDENTIFIER
	}

	fn step(&mut self, adjustment: Adj<V>) {
		let running = match self.running.take() {
			None => adjustment,
			Some(previous) => previous
				.scaled_f64(self.coef.retain)
				.sum(adjustment.scaled_f64(self.coef.step_width).negated()),
		};
		self.value.shift(running.clone());
		self.running = Some(running);
	}
}

impl<V: Param> OptimizerFamily for Momentum<V> {
	const IDENTIFIER: &'static str = IDENTIFIER;

	fn decode(document: &serde_json::Value) -> serde_json::Result<Option<Self>> {
		let optimizer = Self::deserialize(document)?;
		Ok(optimizer.coef.is_valid().then_some(optimizer))
	}
}

//--------------------------------------------------------------------------------------------------

/// Installs `Momentum` with the same coefficients on every parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumFactory {
	pub coef: MomentumCoef,
}

impl MomentumFactory {
	pub fn new(coef: MomentumCoef) -> Self {
		Self { coef }
	}
}

impl OptimizerFactory for MomentumFactory {
	fn make_optimizer<V: Param>(&self, value: V) -> Option<AnyOptimizer<V>> {
		Momentum::new(value, self.coef).map(Optimizer::erased)
	}
}

//--------------------------------------------------------------------------------------------------
