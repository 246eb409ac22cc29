use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::path::display_text;
use crate::path::get_path;
use crate::path::has_value;
use crate::tables::FlagTable;

/// Predicate deciding whether a block is rendered for a data snapshot.
///
/// ```json
/// { "type": "always" }
/// { "type": "fieldHasValue", "path": "patient.name" }
/// { "type": "resultsHasFlag", "flag": "H" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockCondition {
	/// Always visible.
	#[default]
	Always,
	/// Visible when the value at `path` is present and, for strings, not
	/// blank.
	FieldHasValue { path: String },
	/// Visible when any result row carries `flag` as its code or its label.
	ResultsHasFlag { flag: String },
}

impl BlockCondition {
	/// Coerce an untrusted condition. Missing, malformed and unknown kinds
	/// all become [`BlockCondition::Always`].
	pub fn normalize(raw: Option<&Value>) -> Self {
		let Some(map) = raw.and_then(Value::as_object) else {
			return Self::Always;
		};

		let text = |key: &str| {
			map.get(key)
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string()
		};

		match map.get("type").and_then(Value::as_str) {
			Some("always") => Self::Always,
			Some("fieldHasValue") => Self::FieldHasValue { path: text("path") },
			Some("resultsHasFlag") => Self::ResultsHasFlag { flag: text("flag") },
			other => {
				tracing::warn!(kind = ?other, "unknown block condition, treating as always visible");
				Self::Always
			}
		}
	}

	/// Evaluate against a data snapshot.
	pub fn evaluate(&self, data: &Value, flags: &FlagTable) -> bool {
		match self {
			Self::Always => true,
			Self::FieldHasValue { path } => has_value(get_path(data, path)),
			Self::ResultsHasFlag { flag } => results_have_flag(data, flag, flags),
		}
	}
}

/// Scan `data.results` for a row whose flag code, stored label or derived
/// label equals `flag`.
fn results_have_flag(data: &Value, flag: &str, flags: &FlagTable) -> bool {
	let Some(rows) = data.get("results").and_then(Value::as_array) else {
		return false;
	};

	rows.iter().any(|row| {
		let code = display_text(row.get("flag"));
		if code == flag {
			return true;
		}

		if let Some(label) = row.get("flagLabel").and_then(Value::as_str) {
			if label == flag {
				return true;
			}
		}

		!code.is_empty() && flags.meta(&code).label == flag
	})
}
