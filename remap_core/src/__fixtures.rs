//! Shared fixtures for the crate tests.

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use serde_json::json;

use crate::Environment;
use crate::Filter;
use crate::FilterContext;
use crate::FilterOutcome;
use crate::HookOutcome;
use crate::Mapper;
use crate::RemapError;
use crate::RemapResult;
use crate::SourceSet;
use crate::Stage;
use crate::StageContext;

/// A single implicit-root source with a nested `user` object.
pub(crate) fn user_sources() -> SourceSet {
	SourceSet::root(json!({
		"user": {
			"name": "ada",
			"age": 30,
			"email": "ada@example.com",
			"address": { "city": "london", "zip": "n1" },
			"tags": ["math", "engines"],
		}
	}))
}

/// An implicit-root source with an order containing line items, for wildcard
/// fan-out tests.
pub(crate) fn order_sources() -> SourceSet {
	SourceSet::root(json!({
		"order": {
			"id": "o-1",
			"items": [
				{ "sku": "a", "qty": 2 },
				{ "sku": "b", "qty": 5 },
			],
		}
	}))
}

/// Two named sources selected by their first path segment.
pub(crate) fn named_sources() -> SourceSet {
	SourceSet::new()
		.with("user", json!({ "name": "grace", "age": 36 }))
		.with("order", json!({ "id": "o-2", "total": 99.5 }))
}

/// An environment with the builtins plus the test-only filters below.
pub(crate) fn test_environment() -> Environment {
	let mut env = Environment::new();
	env.registry.register(Arc::new(Reverse));
	env.registry.register(Arc::new(Exclaim));
	env.registry.register(Arc::new(TargetSize));
	env.registry.register(Arc::new(Failing));
	env
}

pub(crate) fn test_mapper() -> Mapper {
	Mapper::new(test_environment())
}

/// Reverses string values. An ordinary transform-stage filter.
pub(crate) struct Reverse;

impl Filter for Reverse {
	fn aliases(&self) -> &[&str] {
		&["reverse"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let value = match ctx.value {
			Value::String(text) => Value::String(text.chars().rev().collect()),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// Appends `!` to the stringified value. Declares the `BeforeWrite` stage so
/// tests can observe stage-bound filter dispatch.
pub(crate) struct Exclaim;

impl Filter for Exclaim {
	fn aliases(&self) -> &[&str] {
		&["exclaim"]
	}

	fn stage(&self) -> Stage {
		Stage::BeforeWrite
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let text = crate::stringify(ctx.value);
		Ok(FilterOutcome::Value(Value::String(format!("{text}!"))))
	}
}

/// Replaces the value with the number of keys already written to the
/// in-progress target, for context-visibility tests.
pub(crate) struct TargetSize;

impl Filter for TargetSize {
	fn aliases(&self) -> &[&str] {
		&["target_size"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let size = ctx
			.target
			.and_then(Value::as_object)
			.map_or(0, serde_json::Map::len);
		Ok(FilterOutcome::Value(json!(size)))
	}
}

/// Always fails, for error policy tests.
pub(crate) struct Failing;

impl Filter for Failing {
	fn aliases(&self) -> &[&str] {
		&["failing"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		Err(RemapError::InvalidFilterArgument {
			name: "failing".to_string(),
			value: crate::stringify(ctx.value),
			reason: "this filter always fails".to_string(),
		})
	}
}

/// A shared log of stage names, appended to by [`recording_hook`].
pub(crate) type StageLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn stage_log() -> StageLog {
	Arc::new(Mutex::new(Vec::new()))
}

/// A hook that records the stage it ran at and continues.
pub(crate) fn recording_hook(
	log: StageLog,
) -> impl Fn(&mut StageContext) -> RemapResult<HookOutcome> + Send + Sync + 'static {
	move |ctx| {
		log.lock().unwrap().push(ctx.stage.to_string());
		Ok(HookOutcome::Continue)
	}
}

pub(crate) fn logged(log: &StageLog) -> Vec<String> {
	log.lock().unwrap().clone()
}
