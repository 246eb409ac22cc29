//! Dot-notation addressing over nested `serde_json` mappings.
//!
//! Paths such as `patient.name` are split on `.` with empty segments
//! dropped, so `.patient..name.` addresses the same value. There are no
//! array index segments: a path only ever walks through objects.

use serde_json::Map;
use serde_json::Value;

/// Iterate over the non-empty segments of a dot path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('.').filter(|segment| !segment.is_empty())
}

/// Read the value at `path`.
///
/// Returns `None` as soon as an intermediate node is missing, `null` or not
/// an object. An empty path yields `None` rather than the root itself.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
	let mut segments = segments(path).peekable();
	segments.peek()?;

	let mut current = root;
	for segment in segments {
		current = current.as_object()?.get(segment)?;
	}

	Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Any intermediate node that is not an object (including the root) is
/// replaced by an empty object. A path without segments is a no-op.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
	let segments: Vec<&str> = segments(path).collect();
	let Some((last, parents)) = segments.split_last() else {
		return;
	};

	let mut current = root;
	for segment in parents {
		let object = ensure_object(current);
		current = object
			.entry((*segment).to_string())
			.or_insert_with(|| Value::Object(Map::new()));
	}

	ensure_object(current).insert((*last).to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
	if !value.is_object() {
		*value = Value::Object(Map::new());
	}

	match value {
		Value::Object(map) => map,
		_ => unreachable!("value was just replaced with an object"),
	}
}

/// Returns true when `value` counts as "has a value": not `null` and, for
/// strings, not blank after trimming.
pub fn has_value(value: Option<&Value>) -> bool {
	match value {
		None | Some(Value::Null) => false,
		Some(Value::String(text)) => !text.trim().is_empty(),
		Some(_) => true,
	}
}

/// Render a scalar value as display text. Strings are returned as-is,
/// numbers and booleans use their JSON form and everything else is empty.
pub fn display_text(value: Option<&Value>) -> String {
	match value {
		Some(Value::String(text)) => text.clone(),
		Some(Value::Number(number)) => number.to_string(),
		Some(Value::Bool(flag)) => flag.to_string(),
		_ => String::new(),
	}
}
