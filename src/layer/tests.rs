//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use assert_approx_eq::assert_approx_eq;

use crate::adjust::{Movable, NoAdjustment};
use crate::chain;
use crate::inject::{Inject, ParamVisitor};
use crate::layers::{Offset, Scale, SquaredError};
use crate::optimizable::Optimizable;
use crate::optimizer::{MomentumCoef, MomentumFactory, Param};

use super::*;

//--------------------------------------------------------------------------------------------------

/// `lhs * rhs`
struct Product;

impl Combine<f64, f64> for Product {
	type Output = f64;
	type Auxiliary = ();

	fn inspectable_combine(&self, lhs: &f64, rhs: &f64) -> (f64, ()) {
		(lhs * rhs, ())
	}

	fn adjustments(&self, lhs: &f64, rhs: &f64, _aux: (), gradient: f64) -> (f64, f64) {
		(gradient * rhs, gradient * lhs)
	}
}

fn two_stage() -> Chain<Scale<f64>, Scale<f64>> {
	Scale::<f64>::new(2.0).chain(Scale::<f64>::new(3.0))
}

//--------------------------------------------------------------------------------------------------

#[test]
fn test_chain_two_stage() {
	let chain = two_stage();
	let (out, aux) = chain.inspectable_apply(&1.0);
	assert_approx_eq!(out, 6.0);
	assert_approx_eq!(aux.mid, 2.0);

	let ((d_w1, d_w2), d_inp) = chain.adjustment(&1.0, aux, 1.0);
	assert_approx_eq!(d_w1, 3.0);
	assert_approx_eq!(d_w2, 2.0);
	assert_approx_eq!(d_inp, 6.0);
}

#[test]
fn test_apply_and_backprop_agree_with_inspectable_forms() {
	let chain = Scale::<f64>::new(-1.5).chain(Offset::<f64>::new(0.25));
	for x in [-2.0, 0.0, 3.5] {
		assert_approx_eq!(chain.apply(&x), chain.inspectable_apply(&x).0);

		let full = chain.adjustment(&x, chain.aux_data(&x), 0.75).1;
		let short = chain.backprop(&x, chain.aux_data(&x), 0.75);
		assert_approx_eq!(full, short);
	}
}

#[test]
fn test_chain_rule_consistency() {
	let a = Scale::<f64>::new(1.5);
	let b = Offset::<f64>::new(-4.0).chain(Scale::<f64>::new(0.5));
	let x = 2.0;
	let g = 0.3;

	let (mid, aux_a) = a.inspectable_apply(&x);
	let aux_b = b.aux_data(&mid);
	let expected = a.backprop(&x, aux_a, b.backprop(&mid, aux_b, g));

	let chain = a.chain(b);
	let (_, d_inp) = chain.adjustment(&x, chain.aux_data(&x), g);
	assert_approx_eq!(d_inp, expected);
}

#[test]
fn test_chain_macro_nests_right() {
	let chain: Chain3<Scale<f64>, Offset<f64>, Scale<f64>> =
		chain![Scale::<f64>::new(2.0), Offset::<f64>::new(1.0), Scale::<f64>::new(3.0)];
	assert_approx_eq!(chain.apply(&1.0), 9.0);

	let (d_w1, (d_b, d_w3)) = chain.adjustment(&1.0, chain.aux_data(&1.0), 1.0).0;
	assert_approx_eq!(d_w1, 3.0);
	assert_approx_eq!(d_b, 3.0);
	assert_approx_eq!(d_w3, 3.0);
}

#[test]
fn test_combinator_fan_out() {
	let combinator = Combinator::new(Scale::<f64>::new(2.0), Offset::<f64>::new(1.0), Product);
	let x = 3.0;
	let (out, aux) = combinator.inspectable_apply(&x);
	assert_approx_eq!(out, 24.0);

	let ((d_w, d_b), d_inp) = combinator.adjustment(&x, aux, 1.0);
	assert_approx_eq!(d_w, 12.0);
	assert_approx_eq!(d_b, 6.0);

	// sum of the branch gradients, each computed on its own
	let lhs = combinator.lhs.backprop(&x, (), 4.0);
	let rhs = combinator.rhs.backprop(&x, (), 6.0);
	assert_approx_eq!(d_inp, lhs + rhs);
	assert_approx_eq!(d_inp, 14.0);
}

#[test]
fn test_sum_combinator() {
	let sum = Combinator::new(Scale::<f64>::new(2.0), Scale::<f64>::new(3.0), Sum);
	assert_approx_eq!(sum.apply(&1.0), 5.0);

	let ((d_a, d_b), d_inp) = sum.adjustment(&1.0, sum.aux_data(&1.0), 2.0);
	assert_approx_eq!(d_a, 2.0);
	assert_approx_eq!(d_b, 2.0);
	assert_approx_eq!(d_inp, 10.0);
}

#[test]
fn test_frozen_ignores_shift() {
	let mut frozen = Scale::<f64>::new(2.0).chain(Offset::<f64>::new(1.0)).frozen();
	let before = frozen.apply(&3.0);
	frozen.shift(NoAdjustment::new());
	frozen.shift(NoAdjustment::<f64>::new().scaled(100.0));
	assert_approx_eq!(frozen.apply(&3.0), before);

	let (adj, d_inp) = frozen.adjustment(&3.0, frozen.aux_data(&3.0), 1.0);
	assert_eq!(adj, NoAdjustment::new());
	assert_approx_eq!(d_inp, 2.0);
}

#[test]
fn test_frozen_composes_with_trainable_layers() {
	let mut model = Scale::<f64>::new(2.0).frozen().chain(Scale::<f64>::new(3.0));
	model.learn(&1.0, &SquaredError::<f64>::new(0.0, 0.1));

	assert_approx_eq!(*model.first.get_ref().weight.value(), 2.0);
	// gradient 0.1 * (0 - 6), times mid 2
	assert_approx_eq!(*model.second.weight.value(), 3.0 - 1.2);
}

#[test]
fn test_repeat_doubler() {
	let repeat = Repeat::new(Scale::<f64>::new(2.0), 3);
	let (out, aux) = repeat.inspectable_apply(&1.0);
	assert_approx_eq!(out, 8.0);

	let (adjustments, d_inp) = repeat.adjustment(&1.0, aux, 1.0);
	assert_eq!(adjustments.len(), 3);
	for adj in &adjustments {
		assert_approx_eq!(*adj, 4.0);
	}
	assert_approx_eq!(d_inp, 8.0);

	let mut repeat = repeat;
	repeat.shift(adjustments);
	assert_approx_eq!(*repeat.layer.weight.value(), 14.0);
}

#[test]
fn test_repeat_zero_times_is_identity() {
	let repeat = Repeat::new(Scale::<f64>::new(2.0), 0);
	let (out, aux) = repeat.inspectable_apply(&5.0);
	assert_approx_eq!(out, 5.0);
	let (adjustments, d_inp) = repeat.adjustment(&5.0, aux, 1.5);
	assert!(adjustments.is_empty());
	assert_approx_eq!(d_inp, 1.5);
}

#[test]
fn test_many_adjustment_is_index_aligned() {
	let many = Many::new(vec![Scale::<f64>::new(2.0), Scale::<f64>::new(3.0), Scale::<f64>::new(5.0)]);
	let (out, aux) = many.inspectable_apply(&1.0);
	assert_approx_eq!(out, 30.0);

	let (adjustments, d_inp) = many.adjustment(&1.0, aux, 1.0);
	assert_eq!(adjustments.len(), 3);
	assert_approx_eq!(adjustments[0], 15.0);
	assert_approx_eq!(adjustments[1], 10.0);
	assert_approx_eq!(adjustments[2], 6.0);
	assert_approx_eq!(d_inp, 30.0);

	let mut many = many;
	many.shift(vec![1.0, 0.0, -1.0]);
	assert_approx_eq!(many.apply(&1.0), 3.0 * 3.0 * 4.0);
}

#[test]
fn test_empty_many_is_identity() {
	let many: Many<Scale<f64>> = Many::new(Vec::new());
	assert!(many.is_empty());
	assert_approx_eq!(many.apply(&2.5), 2.5);
	assert_approx_eq!(many.backprop(&2.5, many.aux_data(&2.5), 0.5), 0.5);
}

#[test]
fn test_learn_converges() {
	let mut model = Scale::<f64>::new(1.0);
	let loss = SquaredError::<f64>::new(6.0, 0.1);

	model.learn(&2.0, &loss);
	assert_approx_eq!(*model.weight.value(), 1.8);

	for _ in 0..100 {
		model.learn(&2.0, &loss);
	}
	assert_approx_eq!(model.apply(&2.0), 6.0);
}

//--------------------------------------------------------------------------------------------------

struct Record {
	values: Vec<f64>,
}

impl ParamVisitor for Record {
	fn visit_param<V: Param>(&mut self, param: &mut Optimizable<V>) {
		let value = serde_json::to_value(param.value()).unwrap();
		self.values.push(value.as_f64().unwrap());
	}
}

#[test]
fn test_injection_is_breadth_first() {
	let mut model = Chain::new(Chain::new(Scale::<f64>::new(1.0), Scale::<f64>::new(2.0)), Scale::<f64>::new(3.0));
	let mut record = Record { values: Vec::new() };
	model.walk(&mut record);
	assert_eq!(record.values, vec![3.0, 1.0, 2.0]);
}

#[test]
fn test_set_and_eject_optimizer() {
	let mut model = chain![Scale::<f64>::new(2.0), Offset::<f64>::new(1.0), Scale::<f64>::new(3.0)];
	let untouched = model.clone();
	assert_eq!(model.count_params(), 3);

	let factory = MomentumFactory::new(MomentumCoef { retain: 0.5, step_width: 1.0 });
	assert_eq!(model.set_optimizer(&factory), 3);
	assert!(model.first.weight.is_optimized());
	assert!(model.second.first.bias.is_optimized());
	assert!(model.second.second.weight.is_optimized());
	assert!(!untouched.first.weight.is_optimized());

	// values are unchanged by injection
	assert_approx_eq!(model.apply(&1.0), untouched.apply(&1.0));

	// first step of a fresh momentum applies the adjustment as is
	model.shift((1.0, (1.0, 1.0)));
	assert_approx_eq!(*model.first.weight.value(), 3.0);
	model.shift((1.0, (1.0, 1.0)));
	assert_approx_eq!(*model.first.weight.value(), 2.5);

	assert_eq!(model.eject_optimizer(), 3);
	assert!(!model.first.weight.is_optimized());
	assert_approx_eq!(*model.first.weight.value(), 2.5);
	assert_approx_eq!(*model.second.first.bias.value(), 1.5);
	assert_eq!(model.eject_optimizer(), 0);

	assert_approx_eq!(*untouched.first.weight.value(), 2.0);
}

#[test]
fn test_injection_reaches_every_combinator() {
	let mut model = Combinator::new(
		Many::new(vec![Scale::<f64>::new(1.0), Scale::<f64>::new(2.0)]),
		Repeat::new(Offset::<f64>::new(0.5), 4).frozen(),
		Sum,
	);
	assert_eq!(model.count_params(), 3);
	assert_eq!(model.set_optimizer(&MomentumFactory::default()), 3);
	assert!(model.lhs.layers[1].weight.is_optimized());
	assert!(model.rhs.get_ref().layer.bias.is_optimized());

	let model = model.ejecting_optimizer();
	assert!(!model.lhs.layers[0].weight.is_optimized());
}

#[test]
fn test_repeat_steps_optimizer_last_iteration_first() {
	let mut repeat = Repeat::new(Scale::<f64>::new(2.0), 2);
	let factory = MomentumFactory::new(MomentumCoef { retain: 0.5, step_width: 1.0 });
	assert_eq!(repeat.set_optimizer(&factory), 1);

	// step(4): running = 4, w = 6
	// step(2): running = 0.5 * 4 - 2 = 0, w = 6
	repeat.shift(vec![4.0, 2.0]);
	assert_approx_eq!(*repeat.layer.weight.value(), 6.0);
}

#[test]
fn test_many_steps_each_optimizer_once() {
	let mut many = Many::new(vec![Scale::<f64>::new(1.0), Scale::<f64>::new(2.0)]);
	let factory = MomentumFactory::new(MomentumCoef { retain: 0.5, step_width: 1.0 });
	assert_eq!(many.set_optimizer(&factory), 2);

	many.shift(vec![1.0, -1.0]);
	many.shift(vec![1.0, -1.0]);
	assert_approx_eq!(*many.layers[0].weight.value(), 1.5);
	assert_approx_eq!(*many.layers[1].weight.value(), 1.5);
}

#[test]
fn test_declining_factory_installs_nothing() {
	let factory = MomentumFactory::new(MomentumCoef { retain: 2.0, step_width: 0.1 });
	let mut model = two_stage();
	assert_eq!(model.set_optimizer(&factory), 0);
	assert!(!model.first.weight.is_optimized());
}
