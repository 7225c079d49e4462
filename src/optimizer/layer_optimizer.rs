//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::adjust::{Adj, Movable};
use crate::layer::Layer;

use super::{AnyOptimizer, Optimizer};

//--------------------------------------------------------------------------------------------------

/// A layer evaluated on a fixed input, used as an optimized value.
///
/// The optimized value is `layer.apply(params)`. An adjustment of the value is
/// backpropagated into both `layer` and `params`, and the value is re-evaluated.
pub struct LayerOptimizer<L: Layer> {
	identifier: String,
	layer: L,
	params: L::Input,
	value: L::Output,
}

impl<L: Layer> LayerOptimizer<L> {
	pub fn new(identifier: impl Into<String>, layer: L, params: L::Input) -> Self {
		let value = layer.apply(&params);
		Self { identifier: identifier.into(), layer, params, value }
	}

	pub fn layer(&self) -> &L {
		&self.layer
	}

	pub fn params(&self) -> &L::Input {
		&self.params
	}
}

impl<L> LayerOptimizer<L>
where
	L: Layer + Clone + Serialize + DeserializeOwned + 'static,
	L::Input: Clone + Serialize + DeserializeOwned + 'static,
	L::Output: Clone + 'static,
{
	/// Decoder for `OptimizerRegistry::register_decoder`.
	/// The identifier is taken from the document.
	pub fn decode(document: &serde_json::Value) -> serde_json::Result<Option<AnyOptimizer<L::Output>>> {
		#[derive(Deserialize)]
		struct Parts<L, I> {
			layer: L,
			params: I,
		}

		let identifier = document
			.get("optimizer")
			.and_then(serde_json::Value::as_str)
			.ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("optimizer"))?;
		let Parts { layer, params } = Parts::<L, L::Input>::deserialize(document)?;
		Ok(Some(Self::new(identifier, layer, params).erased()))
	}
}

impl<L: Layer + Clone> Clone for LayerOptimizer<L>
where
	L::Input: Clone,
	L::Output: Clone,
{
	fn clone(&self) -> Self {
		Self {
			identifier: self.identifier.clone(),
			layer: self.layer.clone(),
			params: self.params.clone(),
			value: self.value.clone(),
		}
	}
}

impl<L: Layer + Serialize> Serialize for LayerOptimizer<L>
where
	L::Input: Serialize,
{
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("LayerOptimizer", 2)?;
		state.serialize_field("layer", &self.layer)?;
		state.serialize_field("params", &self.params)?;
		state.end()
	}
}

impl<L: Layer + Serialize> Optimizer for LayerOptimizer<L>
where
	L::Input: Serialize,
{
	type Value = L::Output;

	fn value(&self) -> &L::Output {
		&self.value
	}

	fn identifier(&self) -> &str {
		&self.identifier
	}

	fn step(&mut self, adjustment: Adj<L::Output>) {
		let aux = self.layer.aux_data(&self.params);
		let (layer_adj, params_adj) = self.layer.adjustment(&self.params, aux, adjustment);
		self.layer.shift(layer_adj);
		self.params.shift(params_adj);
		self.value = self.layer.apply(&self.params);
	}
}

//--------------------------------------------------------------------------------------------------
