use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::engine::ChainContext;
use crate::engine::apply_filters;
use crate::engine::unknown_filter;
use crate::environment::Environment;
use crate::error::RemapError;
use crate::error::RemapResult;
use crate::evaluator::Evaluation;
use crate::evaluator::SourceSet;
use crate::evaluator::apply_default;
use crate::evaluator::evaluate_entry;
use crate::evaluator::resolve_expression;
use crate::parser::FilterSpec;
use crate::parser::WILDCARD;
use crate::pipeline::Hook;
use crate::pipeline::HookOutcome;
use crate::pipeline::HookPipeline;
use crate::pipeline::Stage;
use crate::pipeline::StageContext;
use crate::pipeline::StageOutcome;
use crate::registry::Filter;
use crate::registry::FilterOutcome;
use crate::resolver::Resolved;
use crate::writer::write_path;

/// What to do when a filter or hook fails at runtime.
///
/// The recovery decision is an explicit, testable branch owned by the
/// mapping caller. Unknown filter aliases are exempt: they always propagate,
/// because silently ignoring a typo would mask it with a wrong-but-plausible
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ErrorPolicy {
	/// Surface the error to the `map()` caller.
	#[default]
	Propagate,
	/// Log, keep the pre-failure value, and continue.
	KeepOriginal,
	/// Log and skip the failing pair; siblings are unaffected.
	SkipEntry,
}

/// The template-driven data mapper.
///
/// A mapper owns an [`Environment`] and a set of lifecycle registrations.
/// Each [`map`](Mapper::map) call walks the template depth-first, evaluates
/// leaf expressions against the sources, and runs every resolved
/// source→target pair through the full stage sequence before writing it into
/// the target. A fresh [`HookPipeline`] is constructed per call.
pub struct Mapper {
	env: Environment,
	error_policy: ErrorPolicy,
	hooks: Vec<(Stage, Hook)>,
	attached: Vec<Arc<dyn Filter>>,
}

/// One resolved source→target pair discovered while walking the template.
struct Pair {
	source_path: Option<String>,
	target_path: String,
	value: Value,
	/// Transform-stage expression filters, applied at `Stage::Transform`.
	chain: Vec<FilterSpec>,
	/// Expression filters bound to other lifecycle stages.
	staged: Vec<(Stage, FilterSpec)>,
	/// A fan-out collected into one array value: the chain applies per
	/// element instead of to the collection as a whole.
	per_element: bool,
}

enum Recovery {
	Keep,
	Skip,
}

impl Mapper {
	pub fn new(env: Environment) -> Self {
		Self {
			env,
			error_policy: ErrorPolicy::default(),
			hooks: Vec::new(),
			attached: Vec::new(),
		}
	}

	pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
		self.error_policy = policy;
		self
	}

	/// Register a lifecycle hook. Hooks for the same stage run in
	/// registration order, before any stage-bound filters.
	pub fn on<F>(&mut self, stage: Stage, hook: F) -> &mut Self
	where
		F: Fn(&mut StageContext) -> RemapResult<HookOutcome> + Send + Sync + 'static,
	{
		self.hooks.push((stage, Arc::new(hook)));
		self
	}

	/// Attach a filter that runs at its declared stage for every pair.
	pub fn attach(&mut self, filter: Arc<dyn Filter>) -> &mut Self {
		self.attached.push(filter);
		self
	}

	pub fn environment(&self) -> &Environment {
		&self.env
	}

	pub fn environment_mut(&mut self) -> &mut Environment {
		&mut self.env
	}

	/// Map `sources` through `template` into a fresh target structure.
	///
	/// Template leaves that are strings are evaluated as expressions (or
	/// interpolated literals); other leaves are copied verbatim. The nesting
	/// path of a leaf, dot-joined, is its target path. Earlier outputs are
	/// visible to later `@alias` expressions.
	pub fn map(&mut self, template: &Value, sources: &SourceSet) -> RemapResult<Value> {
		if !matches!(template, Value::Object(_) | Value::Array(_)) {
			return Err(RemapError::InvalidTemplate(
				"template root must be an object or array".to_string(),
			));
		}

		let pipeline = self.build_pipeline();
		let mut target = if template.is_array() {
			Value::Array(Vec::new())
		} else {
			Value::Object(Map::new())
		};

		self.run_operation_stage(&pipeline, Stage::BeforeAll, &target)?;

		let mut leaves = Vec::new();
		collect_leaves(template, String::new(), &mut leaves);

		for (target_path, leaf) in leaves {
			match leaf {
				Value::String(raw) => {
					let pairs = self.leaf_pairs(&raw, &target_path, sources, &target)?;
					for pair in pairs {
						self.run_pair(&pipeline, pair, sources, &mut target)?;
					}
				}
				constant => write_path(&mut target, &target_path, constant),
			}
		}

		self.run_operation_stage(&pipeline, Stage::AfterAll, &target)?;

		Ok(target)
	}

	fn build_pipeline(&self) -> HookPipeline {
		let mut pipeline = HookPipeline::new();

		for (stage, hook) in &self.hooks {
			pipeline.on(*stage, Arc::clone(hook));
		}
		for filter in &self.attached {
			pipeline.attach(Arc::clone(filter));
		}

		pipeline
	}

	/// Run a once-per-operation stage. Skip has no meaning at operation
	/// scope and is ignored.
	fn run_operation_stage(
		&self,
		pipeline: &HookPipeline,
		stage: Stage,
		target: &Value,
	) -> RemapResult<()> {
		let mut ctx = StageContext {
			stage,
			source_path: None,
			target_path: None,
			value: Value::Null,
		};

		match pipeline.run_stage(&mut ctx, Some(target)) {
			Ok(_) => Ok(()),
			Err(error) => match self.recover(error)? {
				Recovery::Keep | Recovery::Skip => Ok(()),
			},
		}
	}

	/// Evaluate one template leaf into its mapping pairs.
	fn leaf_pairs(
		&mut self,
		raw: &str,
		target_path: &str,
		sources: &SourceSet,
		aliases: &Value,
	) -> RemapResult<Vec<Pair>> {
		let Some(expression) = self.env.parse(raw) else {
			// Literal or interpolated text: token filters were applied
			// inline, the whole leaf becomes one chain-free pair.
			let value = match evaluate_entry(&mut self.env, raw, sources, aliases)? {
				Evaluation::Skipped => return Ok(Vec::new()),
				evaluation => evaluation.into_value(),
			};

			return Ok(vec![Pair {
				source_path: None,
				target_path: target_path.to_string(),
				value,
				chain: Vec::new(),
				staged: Vec::new(),
				per_element: false,
			}]);
		};

		// Resolve every alias up front — an unknown filter fails the whole
		// leaf before any pair runs.
		let mut chain = Vec::new();
		let mut staged = Vec::new();

		for spec in &expression.filters {
			let Some(filter) = self.env.registry.get(&spec.name) else {
				return Err(unknown_filter(&self.env.registry, &spec.name));
			};

			match filter.stage() {
				Stage::Transform => chain.push(spec.clone()),
				stage => staged.push((stage, spec.clone())),
			}
		}

		let resolved = resolve_expression(&expression, sources, aliases)?;
		let resolved = apply_default(resolved, &expression);

		let pairs = match resolved {
			Resolved::Many(entries) => {
				if target_path.split('.').any(|segment| segment == WILDCARD) {
					// Wildcard target: one pair per entry, captures paired
					// index-for-index into the target path.
					entries
						.into_iter()
						.map(|entry| {
							Pair {
								target_path: substitute_wildcards(target_path, &entry.wildcards),
								source_path: Some(entry.path),
								value: entry.value,
								chain: chain.clone(),
								staged: staged.clone(),
								per_element: false,
							}
						})
						.collect()
				} else {
					// Plain target: the fan-out collapses to one array pair,
					// filtered per element at the transform stage.
					let values = entries.into_iter().map(|entry| entry.value).collect();
					vec![Pair {
						source_path: Some(expression.path.clone()),
						target_path: target_path.to_string(),
						value: Value::Array(values),
						chain,
						staged,
						per_element: true,
					}]
				}
			}
			Resolved::One(value) => {
				vec![Pair {
					source_path: Some(expression.path.clone()),
					target_path: target_path.to_string(),
					value,
					chain,
					staged,
					per_element: false,
				}]
			}
		};

		Ok(pairs)
	}

	/// Run one pair through the per-pair stage sequence and, unless skipped,
	/// write it into the target.
	fn run_pair(
		&mut self,
		pipeline: &HookPipeline,
		mut pair: Pair,
		sources: &SourceSet,
		target: &mut Value,
	) -> RemapResult<()> {
		let mut ctx = StageContext {
			stage: Stage::BeforeEntry,
			source_path: pair.source_path.clone(),
			target_path: Some(pair.target_path.clone()),
			value: std::mem::take(&mut pair.value),
		};
		let mut skipped = false;

		const PRE_WRITE: [Stage; 5] = [
			Stage::BeforeEntry,
			Stage::BeforeTransform,
			Stage::Transform,
			Stage::AfterTransform,
			Stage::BeforeWrite,
		];

		for stage in PRE_WRITE {
			if self.run_pair_stage(pipeline, &pair, stage, &mut ctx, sources, target)? {
				skipped = true;
				break;
			}

			if stage == Stage::Transform
				&& self.apply_chain(&pair, &mut ctx, sources, target)?
			{
				skipped = true;
				break;
			}
		}

		if !skipped
			&& !self.run_pair_stage(pipeline, &pair, Stage::Write, &mut ctx, sources, target)?
		{
			tracing::trace!(path = %pair.target_path, "writing pair");
			write_path(target, &pair.target_path, ctx.value.clone());
			// A skip after the write has nothing left to bypass.
			self.run_pair_stage(pipeline, &pair, Stage::AfterWrite, &mut ctx, sources, target)?;
		}

		// AfterEntry always runs, even for skipped pairs.
		self.run_pair_stage(pipeline, &pair, Stage::AfterEntry, &mut ctx, sources, target)?;

		Ok(())
	}

	/// Run the pipeline's hooks/attached filters for a stage, then any
	/// expression filters bound to that stage. Returns true when the pair
	/// was skipped.
	fn run_pair_stage(
		&self,
		pipeline: &HookPipeline,
		pair: &Pair,
		stage: Stage,
		ctx: &mut StageContext,
		sources: &SourceSet,
		target: &Value,
	) -> RemapResult<bool> {
		ctx.stage = stage;

		match pipeline.run_stage(ctx, Some(target)) {
			Ok(StageOutcome::Continue) => {}
			Ok(StageOutcome::Skip) => return Ok(true),
			Err(error) => match self.recover(error)? {
				Recovery::Keep => {}
				Recovery::Skip => return Ok(true),
			},
		}

		for (bound_stage, spec) in &pair.staged {
			if *bound_stage != stage {
				continue;
			}

			let chain_ctx = ChainContext {
				source_path: ctx.source_path.as_deref(),
				target_path: ctx.target_path.as_deref(),
				sources: Some(sources),
				target: Some(target),
			};
			let before = ctx.value.clone();

			match apply_filters(
				&self.env.registry,
				std::mem::take(&mut ctx.value),
				std::slice::from_ref(spec),
				&chain_ctx,
			) {
				Ok(FilterOutcome::Value(value)) => ctx.value = value,
				Ok(FilterOutcome::Skip) => return Ok(true),
				Err(error) => match self.recover(error)? {
					Recovery::Keep => ctx.value = before,
					Recovery::Skip => return Ok(true),
				},
			}
		}

		Ok(false)
	}

	/// Apply the pair's transform-stage filter chain. Returns true when the
	/// pair was skipped.
	fn apply_chain(
		&self,
		pair: &Pair,
		ctx: &mut StageContext,
		sources: &SourceSet,
		target: &Value,
	) -> RemapResult<bool> {
		if pair.chain.is_empty() {
			return Ok(false);
		}

		let chain_ctx = ChainContext {
			source_path: ctx.source_path.as_deref(),
			target_path: ctx.target_path.as_deref(),
			sources: Some(sources),
			target: Some(target),
		};

		if pair.per_element {
			let items = match std::mem::take(&mut ctx.value) {
				Value::Array(items) => items,
				// A hook replaced the fanned array wholesale; the
				// replacement passes through untouched.
				other => {
					ctx.value = other;
					return Ok(false);
				}
			};

			let mut kept = Vec::with_capacity(items.len());

			for item in items {
				let before = item.clone();

				match apply_filters(&self.env.registry, item, &pair.chain, &chain_ctx) {
					Ok(FilterOutcome::Value(value)) => kept.push(value),
					// A skipped element is dropped; the pair itself lives on.
					Ok(FilterOutcome::Skip) => {}
					Err(error) => match self.recover(error)? {
						Recovery::Keep => kept.push(before),
						Recovery::Skip => {}
					},
				}
			}

			ctx.value = Value::Array(kept);
			return Ok(false);
		}

		let before = ctx.value.clone();

		match apply_filters(
			&self.env.registry,
			std::mem::take(&mut ctx.value),
			&pair.chain,
			&chain_ctx,
		) {
			Ok(FilterOutcome::Value(value)) => {
				ctx.value = value;
				Ok(false)
			}
			Ok(FilterOutcome::Skip) => Ok(true),
			Err(error) => match self.recover(error)? {
				Recovery::Keep => {
					ctx.value = before;
					Ok(false)
				}
				Recovery::Skip => Ok(true),
			},
		}
	}

	/// Apply the error policy to a runtime failure. Unknown filter aliases
	/// always propagate.
	fn recover(&self, error: RemapError) -> RemapResult<Recovery> {
		if matches!(error, RemapError::UnknownFilter { .. }) {
			return Err(error);
		}

		match self.error_policy {
			ErrorPolicy::Propagate => Err(error),
			ErrorPolicy::KeepOriginal => {
				tracing::warn!(%error, "filter failed, keeping original value");
				Ok(Recovery::Keep)
			}
			ErrorPolicy::SkipEntry => {
				tracing::warn!(%error, "filter failed, skipping entry");
				Ok(Recovery::Skip)
			}
		}
	}
}

/// Walk the template depth-first, collecting `(target_path, leaf)` in
/// insertion order.
fn collect_leaves(template: &Value, prefix: String, leaves: &mut Vec<(String, Value)>) {
	match template {
		Value::Object(map) => {
			for (key, child) in map {
				let path = if prefix.is_empty() {
					key.clone()
				} else {
					format!("{prefix}.{key}")
				};
				collect_leaves(child, path, leaves);
			}
		}
		Value::Array(items) => {
			for (index, child) in items.iter().enumerate() {
				let path = if prefix.is_empty() {
					index.to_string()
				} else {
					format!("{prefix}.{index}")
				};
				collect_leaves(child, path, leaves);
			}
		}
		leaf => leaves.push((prefix, leaf.clone())),
	}
}

/// Replace each `*` segment of a target path with the pair's captured
/// wildcard segments, in order. Extra wildcards beyond the captures are kept
/// as-is.
fn substitute_wildcards(path: &str, captures: &[String]) -> String {
	let mut captures = captures.iter();

	path.split('.')
		.map(|segment| {
			if segment == WILDCARD {
				captures.next().map_or(segment, String::as_str)
			} else {
				segment
			}
		})
		.collect::<Vec<_>>()
		.join(".")
}
