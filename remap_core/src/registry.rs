use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RemapResult;
use crate::evaluator::SourceSet;
use crate::pipeline::Stage;

/// The context handed to a filter for one application.
///
/// `value` is the value being transformed and `args` the raw string arguments
/// from the filter spec (each filter owns its own coercion). Source and
/// target paths are present when known, so context-aware filters can inspect
/// where a value came from or is headed; the full containers are available
/// for filters needing broader context.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
	pub value: &'a Value,
	pub args: &'a [String],
	pub source_path: Option<&'a str>,
	pub target_path: Option<&'a str>,
	pub sources: Option<&'a SourceSet>,
	pub target: Option<&'a Value>,
}

/// What a filter produced for the current value.
///
/// `Skip` is the out-of-band "do not write this value" signal. Modelling it
/// as a variant rather than a sentinel value means it can never collide with
/// legitimate data, and it terminates the rest of the chain immediately.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FilterOutcome {
	Value(Value),
	Skip,
}

/// A named, stateless value transformation.
///
/// A filter declares one or more aliases it is registered under, the
/// lifecycle [`Stage`] it runs at when attached to a pipeline (`Transform`
/// for ordinary chain filters), and the transform itself. Implementations
/// must be stateless with respect to per-call arguments — those arrive via
/// the [`FilterContext`], never constructor state — because one instance is
/// shared across every invocation.
pub trait Filter: Send + Sync {
	/// The aliases this filter is registered under.
	fn aliases(&self) -> &[&str];

	/// The lifecycle stage this filter runs at when attached to a pipeline.
	fn stage(&self) -> Stage {
		Stage::Transform
	}

	/// Transform the context's value.
	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome>;
}

/// The alias→filter mapping used to dispatch filter invocations.
///
/// Registering a filter binds every alias it declares to one shared
/// instance. Lookup is a case-sensitive exact match and an unknown alias is
/// `None` — the caller decides whether that is fatal
/// ([`apply_filters`](crate::apply_filters) treats it as a hard error).
#[derive(Default, Clone)]
pub struct FilterRegistry {
	filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry pre-loaded with the builtin filter set.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		crate::filters::register_builtins(&mut registry);
		registry
	}

	/// Register a filter under all of its declared aliases.
	pub fn register(&mut self, filter: Arc<dyn Filter>) {
		for alias in filter.aliases() {
			tracing::debug!(alias, "registering filter");
			self.filters.insert((*alias).to_string(), Arc::clone(&filter));
		}
	}

	/// Look up a filter by alias.
	pub fn get(&self, alias: &str) -> Option<Arc<dyn Filter>> {
		self.filters.get(alias).cloned()
	}

	/// All currently known aliases, sorted.
	pub fn aliases(&self) -> Vec<String> {
		let mut aliases: Vec<String> = self.filters.keys().cloned().collect();
		aliases.sort();
		aliases
	}

	/// Remove every registration. Intended for test isolation.
	pub fn clear(&mut self) {
		self.filters.clear();
	}

	pub fn len(&self) -> usize {
		self.filters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.filters.is_empty()
	}
}

impl std::fmt::Debug for FilterRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FilterRegistry")
			.field("aliases", &self.aliases())
			.finish()
	}
}
