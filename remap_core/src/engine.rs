use serde_json::Value;

use crate::error::RemapError;
use crate::error::RemapResult;
use crate::evaluator::SourceSet;
use crate::parser::FilterSpec;
use crate::registry::FilterContext;
use crate::registry::FilterOutcome;
use crate::registry::FilterRegistry;

/// Shared, per-chain context supplied by the caller: where the value came
/// from, where it is headed, and the surrounding containers. The engine only
/// threads these through — it never invents them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainContext<'a> {
	pub source_path: Option<&'a str>,
	pub target_path: Option<&'a str>,
	pub sources: Option<&'a SourceSet>,
	pub target: Option<&'a Value>,
}

/// Apply an ordered filter chain to a value.
///
/// Filters run strictly left to right, each receiving the previous filter's
/// output. An alias the registry does not know is a hard error naming the
/// alias and listing every registered one — silently ignoring a typo would
/// mask it with a wrong-but-plausible result. A filter's own failure is
/// wrapped with the filter identity and originating path. A
/// [`FilterOutcome::Skip`] terminates the chain immediately and propagates.
pub fn apply_filters(
	registry: &FilterRegistry,
	value: Value,
	specs: &[FilterSpec],
	chain: &ChainContext<'_>,
) -> RemapResult<FilterOutcome> {
	let mut current = value;

	for spec in specs {
		let Some(filter) = registry.get(&spec.name) else {
			return Err(unknown_filter(registry, &spec.name));
		};

		let ctx = FilterContext {
			value: &current,
			args: &spec.args,
			source_path: chain.source_path,
			target_path: chain.target_path,
			sources: chain.sources,
			target: chain.target,
		};

		let outcome = filter
			.transform(&ctx)
			.map_err(|error| filter_failed(spec, chain, &error))?;

		match outcome {
			FilterOutcome::Value(next) => {
				tracing::trace!(filter = %spec.name, "applied filter");
				current = next;
			}
			FilterOutcome::Skip => return Ok(FilterOutcome::Skip),
		}
	}

	Ok(FilterOutcome::Value(current))
}

/// Build the fail-fast error for an unregistered alias.
pub(crate) fn unknown_filter(registry: &FilterRegistry, name: &str) -> RemapError {
	RemapError::UnknownFilter {
		name: name.to_string(),
		known: registry.aliases().join(", "),
	}
}

fn filter_failed(spec: &FilterSpec, chain: &ChainContext<'_>, error: &RemapError) -> RemapError {
	RemapError::FilterFailed {
		filter: spec.name.clone(),
		path: chain
			.target_path
			.or(chain.source_path)
			.unwrap_or_default()
			.to_string(),
		reason: error.to_string(),
	}
}
