use serde_json::Value;

use crate::error::RemapResult;

/// Capability seam for reading a single named member out of a container.
///
/// The [`PathResolver`](crate::PathResolver) treats anything the accessor can
/// read uniformly with plain arrays and objects; implementing this trait is
/// how entity-like or collection-like containers plug into path resolution.
/// Absence is `Ok(None)` — an accessor only errors when handed a container
/// type it fundamentally cannot read.
pub trait DataAccessor {
	fn get(&self, container: &Value, segment: &str) -> RemapResult<Option<Value>>;
}

/// The default accessor: objects by key, arrays by integer index. Scalars
/// have no members, so every lookup against them is `Ok(None)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccessor;

impl DataAccessor for JsonAccessor {
	fn get(&self, container: &Value, segment: &str) -> RemapResult<Option<Value>> {
		let found = match container {
			Value::Object(map) => map.get(segment).cloned(),
			Value::Array(items) => segment
				.parse::<usize>()
				.ok()
				.and_then(|index| items.get(index))
				.cloned(),
			_ => None,
		};

		Ok(found)
	}
}

/// Describe a value's container kind for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
