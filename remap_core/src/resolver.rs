use serde_json::Value;

use crate::accessor::DataAccessor;
use crate::accessor::JsonAccessor;
use crate::accessor::value_kind;
use crate::error::RemapError;
use crate::error::RemapResult;
use crate::parser::WILDCARD;

/// The result of resolving a dot-notation path against a container.
///
/// Paths without wildcards always resolve to exactly one value (`Null` when
/// any segment is absent). Wildcarded paths fan out into a set of entries,
/// one per matched element, in depth-first order — and an empty set, not
/// null, when a wildcard matches nothing.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Resolved {
	One(Value),
	Many(Vec<ResolvedEntry>),
}

impl Resolved {
	/// Collapse into a single value: `One` as-is, `Many` as an array of the
	/// entry values.
	pub fn into_value(self) -> Value {
		match self {
			Self::One(value) => value,
			Self::Many(entries) => {
				Value::Array(entries.into_iter().map(|entry| entry.value).collect())
			}
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::One(Value::Null))
	}
}

/// One fanned-out resolution produced by a wildcard path.
///
/// `wildcards` holds the concrete key or index each `*` segment matched, in
/// order. Two independently wildcarded paths pair index-for-index through
/// these captures; cross-joining them is out of contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
	/// The realized sub-path with wildcards replaced by concrete segments.
	pub path: String,
	/// The concrete segment captured by each wildcard, in order.
	pub wildcards: Vec<String>,
	/// The resolved value (`Null` when a matched element lacked the
	/// remainder of the path — positions are preserved, never dropped).
	pub value: Value,
}

/// Resolves dot-notation paths (with `*` wildcard segments) against nested
/// containers, delegating per-segment member lookup to a [`DataAccessor`].
///
/// Resolution never mutates the container and never errors for missing data;
/// absence is `Null` or an empty set. The only hard error is a fundamentally
/// unsupported container: a scalar root asked to resolve a non-empty path.
pub struct PathResolver<'a> {
	accessor: &'a dyn DataAccessor,
}

impl Default for PathResolver<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> PathResolver<'a> {
	pub fn new() -> Self {
		static JSON: JsonAccessor = JsonAccessor;
		Self { accessor: &JSON }
	}

	pub fn with_accessor(accessor: &'a dyn DataAccessor) -> Self {
		Self { accessor }
	}

	/// Resolve `path` against `container`.
	pub fn resolve(&self, container: &Value, path: &str) -> RemapResult<Resolved> {
		if path.is_empty() {
			return Ok(Resolved::One(container.clone()));
		}

		if !matches!(container, Value::Object(_) | Value::Array(_)) {
			return Err(RemapError::UnsupportedContainer {
				kind: value_kind(container).to_string(),
			});
		}

		let segments: Vec<&str> = path.split('.').collect();

		if segments.iter().all(|segment| *segment != WILDCARD) {
			return Ok(Resolved::One(self.resolve_flat(container, &segments)?));
		}

		let mut entries = Vec::new();
		let mut trail = Vec::new();
		let mut captures = Vec::new();
		self.collect(container, &segments, &mut trail, &mut captures, &mut entries)?;

		Ok(Resolved::Many(entries))
	}

	/// Walk a wildcard-free path segment by segment.
	fn resolve_flat(&self, container: &Value, segments: &[&str]) -> RemapResult<Value> {
		let mut current = container.clone();

		for segment in segments {
			match self.accessor.get(&current, segment)? {
				Some(next) => current = next,
				None => return Ok(Value::Null),
			}
		}

		Ok(current)
	}

	/// Depth-first fan-out for wildcarded paths.
	fn collect(
		&self,
		value: &Value,
		segments: &[&str],
		trail: &mut Vec<String>,
		captures: &mut Vec<String>,
		entries: &mut Vec<ResolvedEntry>,
	) -> RemapResult<()> {
		let Some((segment, rest)) = segments.split_first() else {
			entries.push(ResolvedEntry {
				path: trail.join("."),
				wildcards: captures.clone(),
				value: value.clone(),
			});
			return Ok(());
		};

		if *segment == WILDCARD {
			match value {
				Value::Array(items) => {
					for (index, item) in items.iter().enumerate() {
						let key = index.to_string();
						trail.push(key.clone());
						captures.push(key);
						self.collect(item, rest, trail, captures, entries)?;
						captures.pop();
						trail.pop();
					}
				}
				Value::Object(map) => {
					for (key, item) in map {
						trail.push(key.clone());
						captures.push(key.clone());
						self.collect(item, rest, trail, captures, entries)?;
						captures.pop();
						trail.pop();
					}
				}
				// A wildcard over a scalar matches nothing.
				_ => {}
			}

			return Ok(());
		}

		match self.accessor.get(value, segment)? {
			Some(next) => {
				trail.push((*segment).to_string());
				self.collect(&next, rest, trail, captures, entries)?;
				trail.pop();
			}
			None => {
				// Inside a fan-out a missing remainder contributes a null
				// entry so positional correspondence across wildcards is
				// preserved. Before any wildcard has matched, a missing
				// segment means the wildcard matches nothing at all.
				if !captures.is_empty() {
					let mut full = trail.clone();
					full.extend(segments.iter().map(ToString::to_string));
					entries.push(ResolvedEntry {
						path: full.join("."),
						wildcards: captures.clone(),
						value: Value::Null,
					});
				}
			}
		}

		Ok(())
	}
}
