use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::condition::BlockCondition;
use crate::style::BlockStyle;
use crate::style::TextAlign;
use crate::style::coerce_number;

pub const DEFAULT_RESULTS_PATH: &str = "results";
pub const DEFAULT_CARDS_PATH: &str = "summaryCards";
pub const DEFAULT_IMAGE_SRC_PATH: &str = "org.logo";
pub const DEFAULT_IMAGE_ALT: &str = "图片";
pub const DEFAULT_GRID_COLUMNS: u32 = 3;

/// Generate a fresh identifier such as `blk-4f0c...`.
pub fn new_id(prefix: &str) -> String {
	format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// The discriminant of a [`TemplateBlock`], as written in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
	Header,
	Info,
	Results,
	Cards,
	Image,
	Text,
	Code,
	Footer,
}

impl BlockType {
	pub const ALL: [BlockType; 8] = [
		Self::Header,
		Self::Info,
		Self::Results,
		Self::Cards,
		Self::Image,
		Self::Text,
		Self::Code,
		Self::Footer,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Header => "header",
			Self::Info => "info",
			Self::Results => "results",
			Self::Cards => "cards",
			Self::Image => "image",
			Self::Text => "text",
			Self::Code => "code",
			Self::Footer => "footer",
		}
	}
}

impl Display for BlockType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BlockType {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|block_type| block_type.as_str() == value)
			.ok_or_else(|| format!("unknown block type `{value}`"))
	}
}

/// A `label: {{path}}` pair inside an info grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoField {
	pub id: String,
	pub label: String,
	pub path: String,
}

impl InfoField {
	pub fn new(label: &str, path: &str) -> Self {
		Self {
			id: new_id("field"),
			label: label.to_string(),
			path: path.to_string(),
		}
	}

	fn normalize(map: &Map<String, Value>) -> Self {
		Self {
			id: read_id(map).unwrap_or_else(|| new_id("field")),
			label: read_string(map, "label"),
			path: read_string(map, "path"),
		}
	}
}

/// One column of a results table. `key` is resolved relative to each row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
	pub id: String,
	pub label: String,
	pub key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub align: Option<TextAlign>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<String>,
}

impl ResultColumn {
	pub fn new(label: &str, key: &str) -> Self {
		Self {
			id: new_id("col"),
			label: label.to_string(),
			key: key.to_string(),
			align: None,
			width: None,
		}
	}

	#[must_use]
	pub fn aligned(mut self, align: TextAlign) -> Self {
		self.align = Some(align);
		self
	}

	fn normalize(map: &Map<String, Value>) -> Self {
		Self {
			id: read_id(map).unwrap_or_else(|| new_id("col")),
			label: read_string(map, "label"),
			key: read_string(map, "key"),
			align: TextAlign::from_value(map.get("align")),
			width: read_optional_string(map, "width"),
		}
	}
}

/// Variant-specific payload of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockKind {
	#[serde(rename_all = "camelCase")]
	Header { show_barcode: bool, show_qr: bool },
	#[serde(rename_all = "camelCase")]
	Info { columns: u32, fields: Vec<InfoField> },
	#[serde(rename_all = "camelCase")]
	Results {
		columns: Vec<ResultColumn>,
		data_path: String,
	},
	#[serde(rename_all = "camelCase")]
	Cards { data_path: String, columns: u32 },
	#[serde(rename_all = "camelCase")]
	Image {
		src_path: String,
		alt: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		width: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		height: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		radius: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		caption: Option<String>,
	},
	#[serde(rename_all = "camelCase")]
	Text { text: String },
	#[serde(rename_all = "camelCase")]
	Code {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		label: Option<String>,
		show_barcode: bool,
		show_qr: bool,
	},
	#[serde(rename_all = "camelCase")]
	Footer { note: String, show_generated_at: bool },
}

impl BlockKind {
	pub fn block_type(&self) -> BlockType {
		match self {
			Self::Header { .. } => BlockType::Header,
			Self::Info { .. } => BlockType::Info,
			Self::Results { .. } => BlockType::Results,
			Self::Cards { .. } => BlockType::Cards,
			Self::Image { .. } => BlockType::Image,
			Self::Text { .. } => BlockType::Text,
			Self::Code { .. } => BlockType::Code,
			Self::Footer { .. } => BlockType::Footer,
		}
	}

	/// Placeholder content used when a block of `block_type` is created.
	fn default_for(block_type: BlockType) -> Self {
		match block_type {
			BlockType::Header => {
				Self::Header {
					show_barcode: true,
					show_qr: true,
				}
			}
			BlockType::Info => {
				Self::Info {
					columns: DEFAULT_GRID_COLUMNS,
					fields: vec![
						InfoField::new("字段标题", "patient.name"),
						InfoField::new("字段标题", "order.reportNo"),
					],
				}
			}
			BlockType::Results => {
				Self::Results {
					columns: vec![
						ResultColumn::new("项目", "itemName"),
						ResultColumn::new("结果", "value"),
						ResultColumn::new("单位", "unit"),
						ResultColumn::new("参考范围", "refRange"),
						ResultColumn::new("提示", "flagLabel"),
					],
					data_path: DEFAULT_RESULTS_PATH.to_string(),
				}
			}
			BlockType::Cards => {
				Self::Cards {
					data_path: DEFAULT_CARDS_PATH.to_string(),
					columns: DEFAULT_GRID_COLUMNS,
				}
			}
			BlockType::Image => {
				Self::Image {
					src_path: DEFAULT_IMAGE_SRC_PATH.to_string(),
					alt: DEFAULT_IMAGE_ALT.to_string(),
					width: Some("120px".to_string()),
					height: Some("120px".to_string()),
					radius: Some("8px".to_string()),
					caption: None,
				}
			}
			BlockType::Text => {
				Self::Text {
					text: "请输入说明文字".to_string(),
				}
			}
			BlockType::Code => {
				Self::Code {
					label: Some("条码信息".to_string()),
					show_barcode: true,
					show_qr: true,
				}
			}
			BlockType::Footer => {
				Self::Footer {
					note: "报告仅供临床参考，请结合患者情况综合判断。".to_string(),
					show_generated_at: true,
				}
			}
		}
	}

	/// Coerce the variant fields of an untrusted block of `block_type`.
	fn normalize(block_type: BlockType, map: &Map<String, Value>) -> Self {
		match block_type {
			BlockType::Header => {
				Self::Header {
					show_barcode: read_bool(map, "showBarcode"),
					show_qr: read_bool(map, "showQr"),
				}
			}
			BlockType::Info => {
				Self::Info {
					columns: read_positive_int(map, "columns").unwrap_or(DEFAULT_GRID_COLUMNS),
					fields: read_objects(map, "fields")
						.map(InfoField::normalize)
						.collect(),
				}
			}
			BlockType::Results => {
				Self::Results {
					columns: read_objects(map, "columns")
						.map(ResultColumn::normalize)
						.collect(),
					data_path: read_optional_string(map, "dataPath")
						.unwrap_or_else(|| DEFAULT_RESULTS_PATH.to_string()),
				}
			}
			BlockType::Cards => {
				Self::Cards {
					data_path: read_optional_string(map, "dataPath")
						.unwrap_or_else(|| DEFAULT_CARDS_PATH.to_string()),
					columns: read_positive_int(map, "columns").unwrap_or(DEFAULT_GRID_COLUMNS),
				}
			}
			BlockType::Image => {
				Self::Image {
					src_path: read_optional_string(map, "srcPath")
						.unwrap_or_else(|| DEFAULT_IMAGE_SRC_PATH.to_string()),
					alt: read_optional_string(map, "alt")
						.unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string()),
					width: read_optional_string(map, "width"),
					height: read_optional_string(map, "height"),
					radius: read_optional_string(map, "radius"),
					caption: read_optional_string(map, "caption"),
				}
			}
			BlockType::Text => {
				Self::Text {
					text: read_string(map, "text"),
				}
			}
			BlockType::Code => {
				Self::Code {
					label: read_optional_string(map, "label"),
					show_barcode: read_bool(map, "showBarcode"),
					show_qr: read_bool(map, "showQr"),
				}
			}
			BlockType::Footer => {
				Self::Footer {
					note: read_string(map, "note"),
					show_generated_at: read_bool(map, "showGeneratedAt"),
				}
			}
		}
	}
}

fn default_title(block_type: BlockType) -> &'static str {
	match block_type {
		BlockType::Header => "检验报告",
		BlockType::Info => "信息块",
		BlockType::Results => "检验结果",
		BlockType::Cards => "结果综述",
		BlockType::Image => "图片",
		BlockType::Text => "文本说明",
		BlockType::Code => "条码/二维码",
		BlockType::Footer => "页脚",
	}
}

/// One renderable unit of a report template.
///
/// The common fields live on the struct and the variant payload is
/// flattened in, so the persisted JSON shape is a single object
/// discriminated by `type`:
///
/// ```json
/// { "id": "blk-1", "type": "info", "title": "患者信息", "columns": 3,
///   "fields": [{ "id": "f1", "label": "姓名", "path": "patient.name" }],
///   "style": {}, "condition": { "type": "always" } }
/// ```
///
/// Deserialization always goes through [`TemplateBlock::normalize`], so any
/// input produces a valid block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct TemplateBlock {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub hidden: bool,
	pub style: BlockStyle,
	pub condition: BlockCondition,
	#[serde(flatten)]
	pub kind: BlockKind,
}

impl TemplateBlock {
	/// Create a schema-valid block of `block_type` with placeholder content
	/// and a fresh identifier.
	pub fn create_default(block_type: BlockType) -> Self {
		Self {
			id: new_id("blk"),
			title: Some(default_title(block_type).to_string()),
			hidden: false,
			style: BlockStyle::default(),
			condition: BlockCondition::Always,
			kind: BlockKind::default_for(block_type),
		}
	}

	/// Build a block from already-typed parts, keeping the given id.
	pub fn new(id: &str, title: Option<&str>, kind: BlockKind) -> Self {
		Self {
			id: id.to_string(),
			title: title.map(ToString::to_string),
			hidden: false,
			style: BlockStyle::default(),
			condition: BlockCondition::Always,
			kind,
		}
	}

	#[must_use]
	pub fn with_style(mut self, style: BlockStyle) -> Self {
		self.style = style;
		self
	}

	#[must_use]
	pub fn with_condition(mut self, condition: BlockCondition) -> Self {
		self.condition = condition;
		self
	}

	pub fn block_type(&self) -> BlockType {
		self.kind.block_type()
	}

	/// Coerce untrusted or older-shape block data into a valid block.
	///
	/// Never fails: a non-object, a missing `type` or an unknown `type`
	/// produces a default text block. Normalizing the serialized form of a
	/// normalized block yields the same block.
	pub fn normalize(raw: &Value) -> Self {
		let Some(map) = raw.as_object() else {
			tracing::warn!("block is not an object, replacing with a text block");
			return Self::create_default(BlockType::Text);
		};

		let type_name = map.get("type").and_then(Value::as_str);
		let Some(block_type) = type_name.and_then(|name| name.parse::<BlockType>().ok()) else {
			tracing::warn!(block_type = ?type_name, "unrecognized block type, replacing with a text block");
			return Self::create_default(BlockType::Text);
		};

		Self {
			id: read_id(map).unwrap_or_else(|| new_id("blk")),
			title: map
				.get("title")
				.and_then(Value::as_str)
				.map(ToString::to_string),
			hidden: read_bool(map, "hidden"),
			style: BlockStyle::normalize(map.get("style")),
			condition: BlockCondition::normalize(map.get("condition")),
			kind: BlockKind::normalize(block_type, map),
		}
	}

	/// Serialize to the persisted JSON shape.
	pub fn to_value(&self) -> Value {
		serde_json::to_value(self).unwrap_or_default()
	}

	/// Deep copy with a fresh identity.
	#[must_use]
	pub fn duplicate(&self) -> Self {
		let mut copy = self.clone();
		copy.id = new_id("blk");
		copy
	}

	/// Replace fields from a JSON object patch and re-normalize. The block
	/// keeps its id; the patch may change the block type.
	#[must_use]
	pub fn patched(&self, patch: &Value) -> Self {
		let mut value = self.to_value();
		if let (Some(target), Some(patch)) = (value.as_object_mut(), patch.as_object()) {
			for (key, field) in patch {
				if key != "id" {
					target.insert(key.clone(), field.clone());
				}
			}
		}

		Self::normalize(&value)
	}
}

impl From<Value> for TemplateBlock {
	fn from(value: Value) -> Self {
		Self::normalize(&value)
	}
}

fn read_id(map: &Map<String, Value>) -> Option<String> {
	match map.get("id") {
		Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
		Some(Value::Number(id)) => Some(id.to_string()),
		_ => None,
	}
}

fn read_string(map: &Map<String, Value>, key: &str) -> String {
	map.get(key)
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_string()
}

fn read_optional_string(map: &Map<String, Value>, key: &str) -> Option<String> {
	map.get(key)
		.and_then(Value::as_str)
		.filter(|value| !value.trim().is_empty())
		.map(ToString::to_string)
}

fn read_bool(map: &Map<String, Value>, key: &str) -> bool {
	map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn read_positive_int(map: &Map<String, Value>, key: &str) -> Option<u32> {
	map.get(key)
		.and_then(coerce_number)
		.filter(|number| number.is_finite() && *number >= 1.0)
		.map(|number| number.trunc().min(f64::from(u32::MAX)) as u32)
}

fn read_objects<'a>(
	map: &'a Map<String, Value>,
	key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
	map.get(key)
		.and_then(Value::as_array)
		.into_iter()
		.flatten()
		.filter_map(Value::as_object)
}
