use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::split::SplitMode;
use crate::split::is_quoted;
use crate::split::split;
use crate::split::split_once_unquoted;
use crate::split::strip_quotes;

/// The path segment that matches every key or index at its level.
pub const WILDCARD: &str = "*";

/// Marker for alias expressions referencing previously-computed outputs.
pub const ALIAS_MARKER: char = '@';

/// Token that separates a path from its default literal.
const DEFAULT_TOKEN: &str = "??";

/// A single parsed template expression.
///
/// Expressions are the leaf strings of a mapping template:
///
/// ```text
/// {{ user.address.city ?? 'unknown' | trim | upper }}
/// {{ @previous.output.id }}
/// ```
///
/// Parsing is pure and deterministic: identical raw strings always produce
/// structurally equal expressions, which is what makes the
/// [`ParseCache`](crate::ParseCache) sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
	/// Whether the path resolves against sources or prior outputs.
	pub kind: ExpressionKind,
	/// The dot-notation path, segments may be keys, integer indices, or `*`.
	pub path: String,
	/// Literal substituted when resolution yields null.
	pub default: Option<Value>,
	/// The ordered filter chain, applied strictly left to right.
	pub filters: Vec<FilterSpec>,
}

impl Expression {
	/// Returns true when the path contains a wildcard segment.
	pub fn has_wildcard(&self) -> bool {
		self.path.split('.').any(|segment| segment == WILDCARD)
	}
}

/// Whether an expression addresses raw sources or already-computed outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ExpressionKind {
	/// `@path` — resolves against earlier template outputs first.
	Alias,
	/// An ordinary dot-notation path into the named sources.
	Path,
}

/// One filter invocation inside an expression's chain.
///
/// The `name` is resolved against the [`FilterRegistry`](crate::FilterRegistry)
/// at evaluation time, not at parse time, so filters may be registered after
/// templates are parsed. Arguments are kept as raw strings; each filter owns
/// its own coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
	/// The filter alias, e.g. `between` or `replace`.
	pub name: String,
	/// Positional string arguments, quotes already stripped.
	pub args: Vec<String>,
}

/// Parse a raw template leaf into an [`Expression`].
///
/// Returns `None` unless `raw` matches the full `{{ <body> }}` pattern
/// (internal whitespace is optional); callers treat a `None` as "this string
/// is a literal". Strings containing more than one `{{ }}` token are not
/// single expressions either — the evaluator owns that interpolation path.
pub fn parse_expression(raw: &str, mode: SplitMode) -> Option<Expression> {
	let body = expression_body(raw)?;

	if let Some(alias_body) = body.trim_start().strip_prefix(ALIAS_MARKER) {
		return parse_alias(alias_body, mode);
	}

	let segments = split(body, '|', mode);
	let (head, tail) = segments.split_first()?;

	let (path_part, default_part) = split_once_unquoted(head, DEFAULT_TOKEN, mode);
	let path = path_part.trim().to_string();

	if path.is_empty() {
		return None;
	}

	let default = default_part.map(|literal| parse_literal(literal, mode));
	let filters = parse_filters(tail, mode);

	Some(Expression {
		kind: ExpressionKind::Path,
		path,
		default,
		filters,
	})
}

/// Parse the remainder of an `@alias` body. No default literal is parsed in
/// this branch; pipe segments after the alias path are still ordinary
/// filters.
fn parse_alias(body: &str, mode: SplitMode) -> Option<Expression> {
	let segments = split(body, '|', mode);
	let (head, tail) = segments.split_first()?;
	let path = head.trim().to_string();

	if path.is_empty() {
		return None;
	}

	Some(Expression {
		kind: ExpressionKind::Alias,
		path,
		default: None,
		filters: parse_filters(tail, mode),
	})
}

/// Extract the body of a `{{ <body> }}` expression, or `None` when `raw`
/// is not exactly one full expression.
fn expression_body(raw: &str) -> Option<&str> {
	let rest = raw.strip_prefix("{{")?;
	let body = rest.strip_suffix("}}")?;

	// A body containing further braces means `raw` holds several tokens
	// (e.g. "{{ a }} {{ b }}"), which is interpolation, not one expression.
	if body.contains("{{") || body.contains("}}") {
		return None;
	}

	Some(body)
}

/// Parse the pipe-tail segments into filter invocations. Empty segments
/// (e.g. from a trailing pipe) are dropped.
fn parse_filters(segments: &[String], mode: SplitMode) -> Vec<FilterSpec> {
	let mut filters = Vec::with_capacity(segments.len());

	for segment in segments {
		let parts = split(segment, ':', mode);
		let Some((name, args)) = parts.split_first() else {
			continue;
		};

		let name = name.trim().to_string();
		if name.is_empty() {
			continue;
		}

		let args = args.iter().map(|arg| strip_quotes(arg, mode)).collect();

		filters.push(FilterSpec { name, args });
	}

	filters
}

/// Parse a default literal:
///
/// - quoted text becomes a string (unescaped in safe mode)
/// - numbers become `i64` or `f64` depending on the presence of `.`
/// - case-insensitive `true` / `false` / `null` keywords
/// - anything else is kept as a bare-word string
pub(crate) fn parse_literal(raw: &str, mode: SplitMode) -> Value {
	let trimmed = raw.trim();

	if is_quoted(trimmed) {
		return Value::String(strip_quotes(trimmed, mode));
	}

	if trimmed.eq_ignore_ascii_case("true") {
		return Value::Bool(true);
	}
	if trimmed.eq_ignore_ascii_case("false") {
		return Value::Bool(false);
	}
	if trimmed.eq_ignore_ascii_case("null") {
		return Value::Null;
	}

	if trimmed.contains('.') {
		if let Ok(float) = trimmed.parse::<f64>() {
			if let Some(number) = serde_json::Number::from_f64(float) {
				return Value::Number(number);
			}
		}
	} else if let Ok(int) = trimmed.parse::<i64>() {
		return Value::Number(int.into());
	}

	Value::String(trimmed.to_string())
}
