//! The canonical report data shape every raw input is mapped onto.

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// A flat mapping of named string or number fields.
pub type FieldGroup = Map<String, Value>;

/// A field of the standard schema with its display label, used by tooling
/// that lists mapping targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardField {
	pub label: &'static str,
	pub path: &'static str,
	pub group: &'static str,
}

const fn field(label: &'static str, path: &'static str, group: &'static str) -> StandardField {
	StandardField { label, path, group }
}

pub const STANDARD_FIELDS: [StandardField; 17] = [
	field("患者姓名", "patient.name", "患者"),
	field("患者性别", "patient.gender", "患者"),
	field("患者年龄", "patient.age", "患者"),
	field("患者证件号", "patient.idNo", "患者"),
	field("就诊号", "patient.visitNo", "患者"),
	field("报告号", "order.reportNo", "订单"),
	field("申请单号", "order.orderNo", "订单"),
	field("采样时间", "order.sampleTime", "订单"),
	field("报告时间", "order.reportTime", "订单"),
	field("检验科室", "order.department", "订单"),
	field("申请医生", "doctor.name", "医护"),
	field("审核医生", "doctor.auditor", "医护"),
	field("来源实验室", "source.labName", "来源"),
	field("来源系统", "source.system", "来源"),
	field("机构名称", "org.name", "机构"),
	field("机构地址", "org.address", "机构"),
	field("机构电话", "org.phone", "机构"),
];

/// The fixed keys of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultField {
	ItemName,
	Value,
	Unit,
	RefRange,
	Flag,
}

impl ResultField {
	pub const ALL: [ResultField; 5] = [
		Self::ItemName,
		Self::Value,
		Self::Unit,
		Self::RefRange,
		Self::Flag,
	];

	pub fn key(self) -> &'static str {
		match self {
			Self::ItemName => "itemName",
			Self::Value => "value",
			Self::Unit => "unit",
			Self::RefRange => "refRange",
			Self::Flag => "flag",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::ItemName => "项目名称",
			Self::Value => "结果值",
			Self::Unit => "单位",
			Self::RefRange => "参考范围",
			Self::Flag => "结果提示",
		}
	}
}

impl Display for ResultField {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.key())
	}
}

fn empty_text() -> Value {
	Value::String(String::new())
}

/// One row of the results table. Every key is always present and defaults
/// to the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
	#[serde(default = "empty_text")]
	pub item_name: Value,
	#[serde(default = "empty_text")]
	pub value: Value,
	#[serde(default = "empty_text")]
	pub unit: Value,
	#[serde(default = "empty_text")]
	pub ref_range: Value,
	#[serde(default = "empty_text")]
	pub flag: Value,
}

impl Default for ResultRow {
	fn default() -> Self {
		Self {
			item_name: empty_text(),
			value: empty_text(),
			unit: empty_text(),
			ref_range: empty_text(),
			flag: empty_text(),
		}
	}
}

impl ResultRow {
	pub fn new(item_name: &str, value: &str, unit: &str, ref_range: &str, flag: &str) -> Self {
		Self {
			item_name: Value::from(item_name),
			value: Value::from(value),
			unit: Value::from(unit),
			ref_range: Value::from(ref_range),
			flag: Value::from(flag),
		}
	}

	pub fn get(&self, field: ResultField) -> &Value {
		match field {
			ResultField::ItemName => &self.item_name,
			ResultField::Value => &self.value,
			ResultField::Unit => &self.unit,
			ResultField::RefRange => &self.ref_range,
			ResultField::Flag => &self.flag,
		}
	}

	pub fn set(&mut self, field: ResultField, value: Value) {
		match field {
			ResultField::ItemName => self.item_name = value,
			ResultField::Value => self.value = value,
			ResultField::Unit => self.unit = value,
			ResultField::RefRange => self.ref_range = value,
			ResultField::Flag => self.flag = value,
		}
	}

	/// Read the five keys from an object, leaving missing keys empty. Other
	/// keys are dropped.
	pub fn from_object(map: &Map<String, Value>) -> Self {
		let mut row = Self::default();
		for field in ResultField::ALL {
			if let Some(value) = map.get(field.key()) {
				row.set(field, value.clone());
			}
		}
		row
	}
}

const PATIENT_KEYS: [&str; 5] = ["name", "gender", "age", "idNo", "visitNo"];
const ORDER_KEYS: [&str; 5] = [
	"reportNo",
	"orderNo",
	"sampleTime",
	"reportTime",
	"department",
];
const SOURCE_KEYS: [&str; 2] = ["labName", "system"];
const ORG_KEYS: [&str; 3] = ["name", "address", "phone"];
const DOCTOR_KEYS: [&str; 2] = ["name", "auditor"];

fn default_group(keys: &[&str]) -> FieldGroup {
	keys.iter()
		.map(|key| ((*key).to_string(), empty_text()))
		.collect()
}

/// Canonical report data.
///
/// Groups are flat field mappings seeded with the schema keys; fields
/// written by mappings outside those keys (e.g. `order.specimenType`) are
/// kept. `results` is always a sequence. Top-level keys outside the schema
/// are preserved in `extra`.
///
/// Deserialization is lenient and goes through
/// [`StandardReportData::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct StandardReportData {
	pub patient: FieldGroup,
	pub order: FieldGroup,
	pub results: Vec<ResultRow>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub summary_cards: Option<Vec<Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resistance_results: Option<Vec<Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hiv_resistance_results: Option<Vec<Value>>,
	pub source: FieldGroup,
	pub org: FieldGroup,
	pub doctor: FieldGroup,
	#[serde(flatten)]
	pub extra: FieldGroup,
}

impl Default for StandardReportData {
	fn default() -> Self {
		Self {
			patient: default_group(&PATIENT_KEYS),
			order: default_group(&ORDER_KEYS),
			results: Vec::new(),
			summary_cards: None,
			resistance_results: None,
			hiv_resistance_results: None,
			source: default_group(&SOURCE_KEYS),
			org: default_group(&ORG_KEYS),
			doctor: default_group(&DOCTOR_KEYS),
			extra: FieldGroup::new(),
		}
	}
}

impl StandardReportData {
	/// Serialize into a JSON tree for path addressing.
	pub fn to_value(&self) -> Value {
		serde_json::to_value(self).unwrap_or_default()
	}

	/// Build report data from an arbitrary JSON tree, restoring every
	/// invariant instead of failing: groups that are not objects fall back to
	/// their defaults, missing schema keys are filled with empty strings,
	/// `results` is coerced to a sequence of five-key rows and extension
	/// groups that are not sequences are kept in `extra`.
	pub fn from_value(value: Value) -> Self {
		let mut map = match value {
			Value::Object(map) => map,
			_ => return Self::default(),
		};

		let results = match map.remove("results") {
			Some(Value::Array(rows)) => {
				rows.iter()
					.filter_map(Value::as_object)
					.map(ResultRow::from_object)
					.collect()
			}
			_ => Vec::new(),
		};

		Self {
			patient: take_group(&mut map, "patient", &PATIENT_KEYS),
			order: take_group(&mut map, "order", &ORDER_KEYS),
			results,
			summary_cards: take_sequence(&mut map, "summaryCards"),
			resistance_results: take_sequence(&mut map, "resistanceResults"),
			hiv_resistance_results: take_sequence(&mut map, "hivResistanceResults"),
			source: take_group(&mut map, "source", &SOURCE_KEYS),
			org: take_group(&mut map, "org", &ORG_KEYS),
			doctor: take_group(&mut map, "doctor", &DOCTOR_KEYS),
			extra: map,
		}
	}

	/// Text of a field addressed by `path`, empty when absent.
	pub fn text(&self, path: &str) -> String {
		crate::path::display_text(crate::path::get_path(&self.to_value(), path))
	}
}

impl From<Value> for StandardReportData {
	fn from(value: Value) -> Self {
		Self::from_value(value)
	}
}

fn take_group(map: &mut Map<String, Value>, key: &str, keys: &[&str]) -> FieldGroup {
	let mut group = default_group(keys);
	if let Some(Value::Object(fields)) = map.remove(key) {
		group.extend(fields);
	}
	group
}

/// Take an extension group out of `map` when it is a sequence. Any other
/// value is left in place so it survives in `extra`.
fn take_sequence(map: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
	match map.remove(key) {
		Some(Value::Array(items)) => Some(items),
		Some(other) => {
			map.insert(key.to_string(), other);
			None
		}
		None => None,
	}
}
