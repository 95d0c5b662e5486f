use std::ops::Range;

use derive_more::Deref;
use derive_more::DerefMut;
use serde_json::Map;
use serde_json::Value;

use crate::engine::ChainContext;
use crate::engine::apply_filters;
use crate::environment::Environment;
use crate::error::RemapResult;
use crate::parser::Expression;
use crate::parser::ExpressionKind;
use crate::registry::FilterOutcome;
use crate::resolver::PathResolver;
use crate::resolver::Resolved;
use crate::resolver::ResolvedEntry;

/// The named sources an evaluation resolves against.
///
/// A set holding exactly one source keyed by the empty string is treated as
/// an implicit root: `{{ name }}` resolves directly inside it. Otherwise the
/// first path segment selects the source by alias and the remainder resolves
/// within it (`{{ user.address.city }}` reads `address.city` out of the
/// source registered as `user`).
#[derive(Debug, Clone, Default, Deref, DerefMut)]
pub struct SourceSet(
	#[deref]
	#[deref_mut]
	Map<String, Value>,
);

impl SourceSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// A single unnamed source acting as the implicit root.
	pub fn root(value: Value) -> Self {
		let mut map = Map::new();
		map.insert(String::new(), value);
		Self(map)
	}

	/// Add a named source.
	pub fn with(mut self, alias: impl Into<String>, value: Value) -> Self {
		self.0.insert(alias.into(), value);
		self
	}

	pub fn into_inner(self) -> Map<String, Value> {
		self.0
	}

	/// The implicit root source, when this set is exactly that.
	fn implicit_root(&self) -> Option<&Value> {
		if self.0.len() == 1 {
			self.0.get("")
		} else {
			None
		}
	}
}

impl From<Map<String, Value>> for SourceSet {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

/// How a single template leaf evaluated.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Evaluation {
	/// The leaf was not an expression (or was interpolated text); the value
	/// passes through as-is.
	Literal(Value),
	/// A single resolved, filtered value.
	Single(Value),
	/// A wildcard fan-out: one filtered entry per matched element.
	Fanned(Vec<ResolvedEntry>),
	/// A filter skipped the value; nothing should be written.
	Skipped,
}

impl Evaluation {
	/// Collapse into a plain value. `Skipped` collapses to `Null`.
	pub fn into_value(self) -> Value {
		match self {
			Self::Literal(value) | Self::Single(value) => value,
			Self::Fanned(entries) => {
				Value::Array(entries.into_iter().map(|entry| entry.value).collect())
			}
			Self::Skipped => Value::Null,
		}
	}
}

/// Evaluate a raw template leaf to a value.
///
/// `aliases` holds outputs already computed for earlier template keys, keyed
/// by their target paths; `@` expressions resolve there first. A skipped
/// evaluation collapses to `Null` here — callers that need to distinguish
/// skip from null use [`evaluate_entry`].
pub fn evaluate(
	env: &mut Environment,
	raw: &str,
	sources: &SourceSet,
	aliases: &Value,
) -> RemapResult<Value> {
	Ok(evaluate_entry(env, raw, sources, aliases)?.into_value())
}

/// Evaluate a raw template leaf, preserving fan-out and skip information.
///
/// - A string without `{{ }}` tokens passes through as a literal.
/// - A string that is exactly one full expression is parsed (through the
///   cache) and resolved.
/// - Anything else — several tokens, or one token embedded in literal text —
///   is interpolated: each token evaluates independently, is stringified,
///   and is substituted into the surrounding text.
pub fn evaluate_entry(
	env: &mut Environment,
	raw: &str,
	sources: &SourceSet,
	aliases: &Value,
) -> RemapResult<Evaluation> {
	let tokens = find_tokens(raw);

	if tokens.is_empty() {
		return Ok(Evaluation::Literal(Value::String(raw.to_string())));
	}

	if tokens.len() == 1 && tokens[0].start == 0 && tokens[0].end == raw.len() {
		let Some(expression) = env.parse(raw) else {
			return Ok(Evaluation::Literal(Value::String(raw.to_string())));
		};

		return evaluate_expression(env, &expression, sources, aliases);
	}

	let mut result = String::with_capacity(raw.len());
	let mut cursor = 0;

	for range in tokens {
		result.push_str(&raw[cursor..range.start]);
		cursor = range.end;

		let token = &raw[range];
		let piece = match evaluate_entry(env, token, sources, aliases)? {
			Evaluation::Literal(value) | Evaluation::Single(value) => stringify(&value),
			Evaluation::Fanned(entries) => stringify(&Value::Array(
				entries.into_iter().map(|entry| entry.value).collect(),
			)),
			Evaluation::Skipped => String::new(),
		};
		result.push_str(&piece);
	}

	result.push_str(&raw[cursor..]);

	Ok(Evaluation::Literal(Value::String(result)))
}

/// Evaluate an already-parsed expression: resolve, default, filter.
pub(crate) fn evaluate_expression(
	env: &mut Environment,
	expression: &Expression,
	sources: &SourceSet,
	aliases: &Value,
) -> RemapResult<Evaluation> {
	let resolved = resolve_expression(expression, sources, aliases)?;
	let resolved = apply_default(resolved, expression);

	match resolved {
		Resolved::Many(entries) => {
			// Wildcard resolutions get the filter chain per element, never
			// against the collection as a whole. Skipped elements are
			// dropped.
			let mut kept = Vec::with_capacity(entries.len());

			for mut entry in entries {
				let chain = ChainContext {
					source_path: Some(&entry.path),
					sources: Some(sources),
					..ChainContext::default()
				};

				match apply_filters(&env.registry, entry.value, &expression.filters, &chain)? {
					FilterOutcome::Value(value) => {
						entry.value = value;
						kept.push(entry);
					}
					FilterOutcome::Skip => {}
				}
			}

			Ok(Evaluation::Fanned(kept))
		}
		Resolved::One(value) => {
			let chain = ChainContext {
				source_path: Some(&expression.path),
				sources: Some(sources),
				..ChainContext::default()
			};

			match apply_filters(&env.registry, value, &expression.filters, &chain)? {
				FilterOutcome::Value(value) => Ok(Evaluation::Single(value)),
				FilterOutcome::Skip => Ok(Evaluation::Skipped),
			}
		}
	}
}

/// Resolve an expression's path against the alias store and/or the sources.
pub(crate) fn resolve_expression(
	expression: &Expression,
	sources: &SourceSet,
	aliases: &Value,
) -> RemapResult<Resolved> {
	match expression.kind {
		ExpressionKind::Alias => {
			if matches!(aliases, Value::Object(_)) {
				let resolved = PathResolver::new().resolve(aliases, &expression.path)?;
				if !resolved.is_null() {
					return Ok(resolved);
				}
			}

			resolve_in_sources(sources, &expression.path)
		}
		ExpressionKind::Path => resolve_in_sources(sources, &expression.path),
	}
}

/// Resolve a path using the source-selection rule: an implicit root when the
/// set is a single unnamed source, otherwise the first segment names the
/// source. A missing source or a scalar source asked for members resolves to
/// `Null` — absence is never an error here.
fn resolve_in_sources(sources: &SourceSet, path: &str) -> RemapResult<Resolved> {
	let resolver = PathResolver::new();

	if let Some(root) = sources.implicit_root() {
		if !matches!(root, Value::Object(_) | Value::Array(_)) {
			return Ok(Resolved::One(Value::Null));
		}
		return resolver.resolve(root, path);
	}

	let (alias, rest) = match path.split_once('.') {
		Some((alias, rest)) => (alias, rest),
		None => (path, ""),
	};

	let Some(source) = sources.get(alias) else {
		return Ok(Resolved::One(Value::Null));
	};

	if rest.is_empty() {
		return Ok(Resolved::One(source.clone()));
	}

	if !matches!(source, Value::Object(_) | Value::Array(_)) {
		return Ok(Resolved::One(Value::Null));
	}

	let resolved = resolver.resolve(source, rest)?;

	// Realized entry paths carry the source alias so context-aware filters
	// see the full origin.
	Ok(match resolved {
		Resolved::Many(entries) => Resolved::Many(
			entries
				.into_iter()
				.map(|mut entry| {
					entry.path = format!("{alias}.{}", entry.path);
					entry
				})
				.collect(),
		),
		one => one,
	})
}

/// Substitute the parsed default for a null single resolution. An empty
/// fan-out stays empty — it is an empty set, not null.
pub(crate) fn apply_default(resolved: Resolved, expression: &Expression) -> Resolved {
	match (&resolved, &expression.default) {
		(Resolved::One(Value::Null), Some(default)) => Resolved::One(default.clone()),
		_ => resolved,
	}
}

/// Find every `{{ ... }}` token in `raw`, left to right.
fn find_tokens(raw: &str) -> Vec<Range<usize>> {
	let mut tokens = Vec::new();
	let mut cursor = 0;

	while let Some(open) = raw[cursor..].find("{{").map(|at| at + cursor) {
		let Some(close) = raw[open + 2..].find("}}").map(|at| at + open + 2) else {
			break;
		};

		tokens.push(open..close + 2);
		cursor = close + 2;
	}

	tokens
}

/// Render a value into interpolated text: strings stay bare, null is empty,
/// containers serialize as JSON.
pub fn stringify(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		Value::Bool(flag) => flag.to_string(),
		Value::Number(number) => number.to_string(),
		Value::Array(_) | Value::Object(_) => {
			serde_json::to_string(value).unwrap_or_default()
		}
	}
}
