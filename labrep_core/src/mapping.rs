use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::LabrepError;
use crate::LabrepResult;
use crate::path::get_path;
use crate::path::set_path;
use crate::standard::FieldGroup;
use crate::standard::ResultField;
use crate::standard::ResultRow;
use crate::standard::StandardReportData;

pub const DEFAULT_RESULT_ARRAY_PATH: &str = "results";

/// Copy the value at `source_path` in the raw input to `target_path` in
/// the standard schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub source_path: String,
	pub target_path: String,
}

impl FieldMapping {
	pub fn new(source_path: &str, target_path: &str) -> Self {
		Self {
			id: None,
			source_path: source_path.to_string(),
			target_path: target_path.to_string(),
		}
	}
}

/// Rename applied to every row of the raw results array: the value at
/// `source_key` (a path relative to the row) becomes `target_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItemMapping {
	pub target_key: ResultField,
	pub source_key: String,
}

impl ResultItemMapping {
	pub fn new(target_key: ResultField, source_key: &str) -> Self {
		Self {
			target_key,
			source_key: source_key.to_string(),
		}
	}
}

/// Field mappings used when no configuration overrides them.
pub fn default_field_mappings() -> Vec<FieldMapping> {
	[
		("patientInfo.name", "patient.name"),
		("patientInfo.sex", "patient.gender"),
		("patientInfo.age", "patient.age"),
		("patientInfo.id", "patient.idNo"),
		("patientInfo.visitNo", "patient.visitNo"),
		("orderInfo.reportNo", "order.reportNo"),
		("orderInfo.orderNo", "order.orderNo"),
		("orderInfo.sampleTime", "order.sampleTime"),
		("orderInfo.reportTime", "order.reportTime"),
		("orderInfo.department", "order.department"),
		("sourceInfo.labName", "source.labName"),
		("sourceInfo.system", "source.system"),
		("doctorInfo.name", "doctor.name"),
		("doctorInfo.auditor", "doctor.auditor"),
	]
	.into_iter()
	.enumerate()
	.map(|(index, (source, target))| {
		FieldMapping {
			id: Some(format!("m{}", index + 1)),
			..FieldMapping::new(source, target)
		}
	})
	.collect()
}

/// Result row mappings used when no configuration overrides them.
pub fn default_result_mappings() -> Vec<ResultItemMapping> {
	vec![
		ResultItemMapping::new(ResultField::ItemName, "item"),
		ResultItemMapping::new(ResultField::Value, "value"),
		ResultItemMapping::new(ResultField::Unit, "unit"),
		ResultItemMapping::new(ResultField::RefRange, "ref"),
		ResultItemMapping::new(ResultField::Flag, "flag"),
	]
}

fn default_result_array_path() -> String {
	DEFAULT_RESULT_ARRAY_PATH.to_string()
}

/// Everything needed to project one raw input onto the standard schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
	#[serde(default = "default_result_array_path")]
	pub result_array_path: String,
	#[serde(default = "default_field_mappings")]
	pub field_mappings: Vec<FieldMapping>,
	#[serde(default = "default_result_mappings")]
	pub result_mappings: Vec<ResultItemMapping>,
}

impl Default for MappingConfig {
	fn default() -> Self {
		Self {
			result_array_path: default_result_array_path(),
			field_mappings: default_field_mappings(),
			result_mappings: default_result_mappings(),
		}
	}
}

/// Project `raw` onto the standard schema.
///
/// Starts from the schema defaults, merges `org_overrides` into `org`, then
/// applies each field mapping in order. A mapping whose source is absent
/// writes nothing, so the target keeps its current value. When
/// `result_array_path` resolves to a sequence, `results` is replaced with
/// one row per source element; otherwise `results` is left as it is.
pub fn map_raw_to_standard(
	raw: &Value,
	field_mappings: &[FieldMapping],
	result_array_path: &str,
	result_mappings: &[ResultItemMapping],
	org_overrides: &FieldGroup,
) -> StandardReportData {
	let mut base = StandardReportData::default();
	base.org
		.extend(org_overrides.iter().map(|(key, value)| (key.clone(), value.clone())));

	let mut tree = base.to_value();
	let mut applied = 0usize;
	for mapping in field_mappings {
		if mapping.source_path.is_empty() || mapping.target_path.is_empty() {
			continue;
		}

		if let Some(value) = get_path(raw, &mapping.source_path) {
			set_path(&mut tree, &mapping.target_path, value.clone());
			applied += 1;
		}
	}

	let mut data = StandardReportData::from_value(tree);

	match get_path(raw, result_array_path).and_then(Value::as_array) {
		Some(rows) => {
			data.results = rows
				.iter()
				.map(|row| map_result_row(row, result_mappings))
				.collect();
		}
		None => {
			tracing::warn!(
				path = result_array_path,
				"result array path does not resolve to a sequence, keeping existing results"
			);
		}
	}

	tracing::debug!(
		mappings = field_mappings.len(),
		applied,
		rows = data.results.len(),
		"mapped raw input onto the standard schema"
	);

	data
}

fn map_result_row(row: &Value, result_mappings: &[ResultItemMapping]) -> ResultRow {
	let mut mapped = ResultRow::default();
	for mapping in result_mappings {
		if mapping.source_key.is_empty() {
			continue;
		}

		if let Some(value) = get_path(row, &mapping.source_key) {
			mapped.set(mapping.target_key, value.clone());
		}
	}
	mapped
}

/// Parse raw input text as JSON.
pub fn parse_raw_input(text: &str) -> LabrepResult<Value> {
	serde_json::from_str(text).map_err(|error| {
		LabrepError::RawInputParse {
			message: error.to_string(),
			line: error.line(),
			column: error.column(),
		}
	})
}

/// Organisation fields a fresh session starts with.
pub fn default_org() -> FieldGroup {
	[
		("name", "示例医院"),
		("address", "示例市示例区示例路 88 号"),
		("phone", "010-88888888"),
	]
	.into_iter()
	.map(|(key, value)| (key.to_string(), Value::from(value)))
	.collect()
}

/// Holds a mapping configuration together with the last successfully
/// mapped report data.
///
/// A raw input that fails to parse is reported and leaves the current data
/// untouched until a corrected input is applied. The default session uses
/// the default mappings and [`default_org`]; sessions built from a
/// `labrep.toml` only carry the configured `[org]` fields.
#[derive(Debug, Clone)]
pub struct MappingSession {
	config: MappingConfig,
	org: FieldGroup,
	data: StandardReportData,
}

impl Default for MappingSession {
	fn default() -> Self {
		Self::new(MappingConfig::default(), default_org())
	}
}

impl MappingSession {
	pub fn new(config: MappingConfig, org: FieldGroup) -> Self {
		Self {
			config,
			org,
			data: StandardReportData::default(),
		}
	}

	pub fn config(&self) -> &MappingConfig {
		&self.config
	}

	pub fn config_mut(&mut self) -> &mut MappingConfig {
		&mut self.config
	}

	pub fn org(&self) -> &FieldGroup {
		&self.org
	}

	pub fn data(&self) -> &StandardReportData {
		&self.data
	}

	/// Map an already-parsed raw input and make it the current data.
	pub fn apply(&mut self, raw: &Value) -> &StandardReportData {
		self.data = map_raw_to_standard(
			raw,
			&self.config.field_mappings,
			&self.config.result_array_path,
			&self.config.result_mappings,
			&self.org,
		);
		&self.data
	}

	/// Parse and map raw input text. On a parse failure the error is
	/// returned and the current data is kept.
	pub fn apply_raw_input(&mut self, text: &str) -> LabrepResult<&StandardReportData> {
		let raw = parse_raw_input(text)?;
		Ok(self.apply(&raw))
	}

	/// Merge organisation overrides into the session and the current data.
	pub fn update_org(&mut self, overrides: &FieldGroup) {
		for (key, value) in overrides {
			self.org.insert(key.clone(), value.clone());
			self.data.org.insert(key.clone(), value.clone());
		}
	}

	/// Restore the default mappings and result array path.
	pub fn reset_mappings(&mut self) {
		self.config = MappingConfig::default();
	}
}
