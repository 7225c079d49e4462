//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::rc::Rc;

use deepcompose::layers::{Offset, Scale, SquaredError};
use deepcompose::optimizer::{Momentum, MomentumFactory};
use deepcompose::{Chain, Inject, Layer, OptimizerRegistry, chain};

type Model = Chain<Scale<f64>, Offset<f64>>;

/// Samples of `y = 3x + 1`.
const SAMPLES: [(f64, f64); 4] = [(-1.0, -2.0), (0.0, 1.0), (0.5, 2.5), (2.0, 7.0)];

fn total_loss(model: &Model) -> f64 {
	SAMPLES
		.iter()
		.map(|&(x, y)| SquaredError::new(y, 1.0).apply(&model.apply(&x)))
		.sum()
}

fn train(model: &mut Model, epochs: usize, rate: f64) {
	for _ in 0..epochs {
		for &(x, y) in &SAMPLES {
			model.learn(&x, &SquaredError::new(y, rate));
		}
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	stderrlog::new().module(module_path!()).verbosity(2_usize).init()?;

	let mut model: Model = chain![Scale::new(0.5), Offset::new(0.0)];
	log::info!("initial loss = {:.6}", total_loss(&model));

	train(&mut model, 200, 0.05);
	log::info!(
		"plain training: w = {:.4}, b = {:.4}, loss = {:.6}",
		model.first.weight.value(),
		model.second.bias.value(),
		total_loss(&model)
	);

	// fine-tune with optimizers attached
	let mut tuned = model.clone();
	let installed = tuned.set_optimizer(&MomentumFactory::default());
	log::info!("installed {installed} optimizers");
	train(&mut tuned, 1, 0.001);

	let registry = Rc::new(OptimizerRegistry::new().with::<Momentum<f64>>());
	let text = serde_json::to_string_pretty(&tuned)?;
	log::info!("saved model:\n{text}");

	let restored: Model = {
		let _guard = registry.install();
		serde_json::from_str(&text)?
	};
	log::info!(
		"restored model: weight optimized = {}, loss = {:.6}",
		restored.first.weight.is_optimized(),
		total_loss(&restored)
	);

	let ejected = tuned.eject_optimizer();
	log::info!(
		"ejected {ejected} optimizers, {} parameters remain, loss = {:.6}",
		tuned.count_params(),
		total_loss(&tuned)
	);

	Ok(())
}
