//! The builtin filter set.
//!
//! Every filter here is a thin, stateless value transform: arguments arrive
//! as raw strings on the [`FilterContext`] and each filter coerces them
//! itself. Anything beyond that (chain ordering, unknown-alias failures,
//! skip propagation) belongs to [`apply_filters`](crate::apply_filters).

use std::sync::Arc;

use float_cmp::approx_eq;
use serde_json::Value;

use crate::error::RemapError;
use crate::error::RemapResult;
use crate::evaluator::stringify;
use crate::registry::Filter;
use crate::registry::FilterContext;
use crate::registry::FilterOutcome;
use crate::registry::FilterRegistry;

/// Register the builtin filters.
pub fn register_builtins(registry: &mut FilterRegistry) {
	registry.register(Arc::new(Upper));
	registry.register(Arc::new(Lower));
	registry.register(Arc::new(Trim));
	registry.register(Arc::new(Replace));
	registry.register(Arc::new(Join));
	registry.register(Arc::new(Split));
	registry.register(Arc::new(Between));
	registry.register(Arc::new(DefaultValue));
	registry.register(Arc::new(Prefix));
	registry.register(Arc::new(Suffix));
	registry.register(Arc::new(SkipEmpty));
}

/// Uppercase a string value; non-strings pass through unchanged.
pub struct Upper;

impl Filter for Upper {
	fn aliases(&self) -> &[&str] {
		&["upper", "uppercase"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let value = match ctx.value {
			Value::String(text) => Value::String(text.to_uppercase()),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// Lowercase a string value; non-strings pass through unchanged.
pub struct Lower;

impl Filter for Lower {
	fn aliases(&self) -> &[&str] {
		&["lower", "lowercase"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let value = match ctx.value {
			Value::String(text) => Value::String(text.to_lowercase()),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// Trim leading and trailing whitespace from a string value.
pub struct Trim;

impl Filter for Trim {
	fn aliases(&self) -> &[&str] {
		&["trim"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let value = match ctx.value {
			Value::String(text) => Value::String(text.trim().to_string()),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// `replace:search:replacement` — replace every occurrence in a string.
pub struct Replace;

impl Filter for Replace {
	fn aliases(&self) -> &[&str] {
		&["replace"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let search = required_arg("replace", ctx.args, 0, "2")?;
		let replacement = required_arg("replace", ctx.args, 1, "2")?;

		let value = match ctx.value {
			Value::String(text) => Value::String(text.replace(search, replacement)),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// `join[:separator]` — join array elements into a string (default `,`).
pub struct Join;

impl Filter for Join {
	fn aliases(&self) -> &[&str] {
		&["join"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let separator = ctx.args.first().map_or(",", String::as_str);

		let value = match ctx.value {
			Value::Array(items) => {
				let joined = items.iter().map(stringify).collect::<Vec<_>>().join(separator);
				Value::String(joined)
			}
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// `split[:separator]` — split a string into an array (default `,`).
pub struct Split;

impl Filter for Split {
	fn aliases(&self) -> &[&str] {
		&["split"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let separator = ctx.args.first().map_or(",", String::as_str);

		let value = match ctx.value {
			Value::String(text) => Value::Array(
				text.split(separator)
					.map(|piece| Value::String(piece.to_string()))
					.collect(),
			),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// `between:min:max[:strict]` — test whether a numeric value lies within the
/// range. Boundaries are inclusive by default; `strict` excludes them. Float
/// boundary equality uses approximate comparison.
pub struct Between;

impl Filter for Between {
	fn aliases(&self) -> &[&str] {
		&["between"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let min = float_arg("between", ctx.args, 0, "2-3")?;
		let max = float_arg("between", ctx.args, 1, "2-3")?;
		let strict = ctx.args.get(2).is_some_and(|arg| arg == "strict");

		let value = as_number("between", ctx.value)?;

		let on_min = approx_eq!(f64, value, min, ulps = 2);
		let on_max = approx_eq!(f64, value, max, ulps = 2);

		let inside = if strict {
			value > min && value < max && !on_min && !on_max
		} else {
			(value > min || on_min) && (value < max || on_max)
		};

		Ok(FilterOutcome::Value(Value::Bool(inside)))
	}
}

/// `default:fallback` — substitute the fallback for null or empty values.
pub struct DefaultValue;

impl Filter for DefaultValue {
	fn aliases(&self) -> &[&str] {
		&["default"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let fallback = required_arg("default", ctx.args, 0, "1")?;

		let value = match ctx.value {
			Value::Null => Value::String(fallback.to_string()),
			Value::String(text) if text.is_empty() => Value::String(fallback.to_string()),
			other => other.clone(),
		};
		Ok(FilterOutcome::Value(value))
	}
}

/// `prefix:text` — prepend text to a string value.
pub struct Prefix;

impl Filter for Prefix {
	fn aliases(&self) -> &[&str] {
		&["prefix"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let prefix = required_arg("prefix", ctx.args, 0, "1")?;
		let text = stringify(ctx.value);
		Ok(FilterOutcome::Value(Value::String(format!("{prefix}{text}"))))
	}
}

/// `suffix:text` — append text to a string value.
pub struct Suffix;

impl Filter for Suffix {
	fn aliases(&self) -> &[&str] {
		&["suffix"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let suffix = required_arg("suffix", ctx.args, 0, "1")?;
		let text = stringify(ctx.value);
		Ok(FilterOutcome::Value(Value::String(format!("{text}{suffix}"))))
	}
}

/// `skip_empty` — yield [`FilterOutcome::Skip`] for null, empty strings, and
/// empty arrays, so the pair is never written.
pub struct SkipEmpty;

impl Filter for SkipEmpty {
	fn aliases(&self) -> &[&str] {
		&["skip_empty", "skipEmpty"]
	}

	fn transform(&self, ctx: &FilterContext<'_>) -> RemapResult<FilterOutcome> {
		let empty = match ctx.value {
			Value::Null => true,
			Value::String(text) => text.is_empty(),
			Value::Array(items) => items.is_empty(),
			_ => false,
		};

		if empty {
			Ok(FilterOutcome::Skip)
		} else {
			Ok(FilterOutcome::Value(ctx.value.clone()))
		}
	}
}

fn required_arg<'a>(
	name: &str,
	args: &'a [String],
	index: usize,
	expected: &str,
) -> RemapResult<&'a str> {
	args.get(index)
		.map(String::as_str)
		.ok_or_else(|| RemapError::InvalidFilterArgs {
			name: name.to_string(),
			expected: expected.to_string(),
			got: args.len(),
		})
}

fn float_arg(name: &str, args: &[String], index: usize, expected: &str) -> RemapResult<f64> {
	let raw = required_arg(name, args, index, expected)?;
	raw.trim()
		.parse::<f64>()
		.map_err(|error| RemapError::InvalidFilterArgument {
			name: name.to_string(),
			value: raw.to_string(),
			reason: error.to_string(),
		})
}

fn as_number(name: &str, value: &Value) -> RemapResult<f64> {
	match value {
		Value::Number(number) => number.as_f64().ok_or_else(|| unsupported(name, value)),
		Value::String(text) => text
			.trim()
			.parse::<f64>()
			.map_err(|_| unsupported(name, value)),
		_ => Err(unsupported(name, value)),
	}
}

fn unsupported(name: &str, value: &Value) -> RemapError {
	RemapError::InvalidFilterArgument {
		name: name.to_string(),
		value: stringify(value),
		reason: "expected a numeric value".to_string(),
	}
}
