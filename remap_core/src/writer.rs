use serde_json::Map;
use serde_json::Value;

/// Write `value` into `target` at a dot-notation path, creating intermediate
/// containers as needed. Numeric segments address arrays (padded with nulls
/// up to the index); everything else addresses object keys. Only the target
/// is ever mutated.
pub fn write_path(target: &mut Value, path: &str, value: Value) {
	if path.is_empty() {
		*target = value;
		return;
	}

	let segments: Vec<&str> = path.split('.').collect();
	write_segments(target, &segments, value);
}

fn write_segments(target: &mut Value, segments: &[&str], value: Value) {
	let Some((segment, rest)) = segments.split_first() else {
		*target = value;
		return;
	};

	if let Ok(index) = segment.parse::<usize>() {
		if !target.is_array() {
			*target = Value::Array(Vec::new());
		}

		if let Value::Array(items) = target {
			while items.len() <= index {
				items.push(Value::Null);
			}
			write_segments(&mut items[index], rest, value);
		}
	} else {
		if !target.is_object() {
			*target = Value::Object(Map::new());
		}

		if let Value::Object(map) = target {
			let slot = map.entry((*segment).to_string()).or_insert(Value::Null);
			write_segments(slot, rest, value);
		}
	}
}

/// Read back a value at a dot-notation path, without wildcard support.
/// Used to check what an earlier mapping pair produced.
pub fn read_path<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
	let mut current = target;

	for segment in path.split('.') {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}

	Some(current)
}
