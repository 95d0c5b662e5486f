use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::RemapError;
use crate::error::RemapResult;
use crate::registry::Filter;
use crate::registry::FilterContext;
use crate::registry::FilterOutcome;

/// Lifecycle stages of a mapping operation, in strict order.
///
/// `BeforeAll` and `AfterAll` run once per whole `map()` call; every other
/// stage runs once per resolved source→target pair. Hooks registered for a
/// stage run first (in registration order), then any attached filter whose
/// declared [`Filter::stage`] matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Stage {
	BeforeAll,
	BeforeEntry,
	BeforeTransform,
	Transform,
	AfterTransform,
	BeforeWrite,
	Write,
	AfterWrite,
	AfterEntry,
	AfterAll,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::BeforeAll => "before_all",
			Self::BeforeEntry => "before_entry",
			Self::BeforeTransform => "before_transform",
			Self::Transform => "transform",
			Self::AfterTransform => "after_transform",
			Self::BeforeWrite => "before_write",
			Self::Write => "write",
			Self::AfterWrite => "after_write",
			Self::AfterEntry => "after_entry",
			Self::AfterAll => "after_all",
		};
		write!(f, "{name}")
	}
}

/// What a hook decided about the current pair.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HookOutcome {
	/// Keep going with the (possibly mutated) context value.
	Continue,
	/// Replace the current value and keep going.
	Replace(Value),
	/// Do not write this pair. Pair-local; siblings are unaffected.
	Skip,
}

/// The context handed to hooks and attached filters at each stage.
///
/// `value` is the pair's current value and may be mutated in place by hooks
/// at stages that are expected to influence the outcome.
#[derive(Debug)]
pub struct StageContext {
	pub stage: Stage,
	pub source_path: Option<String>,
	pub target_path: Option<String>,
	pub value: Value,
}

/// Outcome of running one stage over a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
	Continue,
	Skip,
}

/// A registered lifecycle hook callback.
pub type Hook = Arc<dyn Fn(&mut StageContext) -> RemapResult<HookOutcome> + Send + Sync>;

/// Dispatches lifecycle hooks and stage-bound filters for one mapping
/// operation. A fresh pipeline is constructed per `map()` invocation; it
/// holds no state beyond the operation's lifetime.
#[derive(Default)]
pub struct HookPipeline {
	hooks: HashMap<Stage, Vec<Hook>>,
	attached: Vec<Arc<dyn Filter>>,
}

impl HookPipeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a hook callback for a stage. Multiple hooks for the same
	/// stage run in registration order.
	pub fn on(&mut self, stage: Stage, hook: Hook) {
		self.hooks.entry(stage).or_default().push(hook);
	}

	/// Attach a filter that runs at its own declared stage for every pair.
	pub fn attach(&mut self, filter: Arc<dyn Filter>) {
		self.attached.push(filter);
	}

	/// Run all hooks and stage-bound filters for `ctx.stage`. Attached
	/// filters receive the in-progress `target` when the caller has one.
	pub fn run_stage(
		&self,
		ctx: &mut StageContext,
		target: Option<&Value>,
	) -> RemapResult<StageOutcome> {
		if let Some(hooks) = self.hooks.get(&ctx.stage) {
			for hook in hooks {
				match hook(ctx).map_err(|error| wrap_hook_error(ctx, &error))? {
					HookOutcome::Continue => {}
					HookOutcome::Replace(value) => ctx.value = value,
					HookOutcome::Skip => return Ok(StageOutcome::Skip),
				}
			}
		}

		for filter in &self.attached {
			if filter.stage() != ctx.stage {
				continue;
			}

			tracing::trace!(stage = %ctx.stage, "running attached filter");

			let filter_ctx = FilterContext {
				value: &ctx.value,
				args: &[],
				source_path: ctx.source_path.as_deref(),
				target_path: ctx.target_path.as_deref(),
				sources: None,
				target,
			};

			match filter
				.transform(&filter_ctx)
				.map_err(|error| wrap_hook_error(ctx, &error))?
			{
				FilterOutcome::Value(value) => ctx.value = value,
				FilterOutcome::Skip => return Ok(StageOutcome::Skip),
			}
		}

		Ok(StageOutcome::Continue)
	}

	/// Returns true when nothing is registered for any stage.
	pub fn is_empty(&self) -> bool {
		self.hooks.values().all(Vec::is_empty) && self.attached.is_empty()
	}
}

fn wrap_hook_error(ctx: &StageContext, error: &RemapError) -> RemapError {
	RemapError::HookFailed {
		stage: ctx.stage.to_string(),
		path: ctx
			.target_path
			.clone()
			.or_else(|| ctx.source_path.clone())
			.unwrap_or_default(),
		reason: error.to_string(),
	}
}
