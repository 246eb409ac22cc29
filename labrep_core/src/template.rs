use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::block::BlockType;
use crate::block::TemplateBlock;
use crate::block::new_id;
use crate::compiler::Compiler;
use crate::enrich::DISPLAY_DATE_FORMAT;

/// Which representation of a template is the rendering source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
	/// Markup is compiled from `blocks`; stored `html` is ignored until the
	/// template is saved again.
	#[default]
	Structured,
	/// Stored `html` is used verbatim; `blocks` are kept for switching back.
	Html,
}

/// A named, versioned report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct TemplateItem {
	pub id: String,
	pub name: String,
	pub version: String,
	pub description: String,
	pub updated_at: String,
	pub mode: TemplateMode,
	pub blocks: Vec<TemplateBlock>,
	pub html: String,
}

fn now_text() -> String {
	Local::now().format(DISPLAY_DATE_FORMAT).to_string()
}

impl TemplateItem {
	/// Coerce a stored template. Missing metadata gets defaults, a missing or
	/// empty block list is replaced by the default template's blocks and every
	/// block is normalized.
	pub fn normalize(raw: &Value) -> Self {
		let fallback = crate::presets::default_template();
		let Some(map) = raw.as_object() else {
			return fallback;
		};

		let blocks: Vec<TemplateBlock> = match map.get("blocks") {
			Some(Value::Array(blocks)) if !blocks.is_empty() => {
				blocks.iter().map(TemplateBlock::normalize).collect()
			}
			_ => fallback.blocks.clone(),
		};

		let text = |key: &str| {
			map.get(key)
				.and_then(Value::as_str)
				.filter(|value| !value.is_empty())
				.map(ToString::to_string)
		};

		Self {
			id: text("id").unwrap_or_else(|| new_id("tpl")),
			name: text("name").unwrap_or_else(|| "未命名模板".to_string()),
			version: text("version").unwrap_or_else(|| "v1.0".to_string()),
			description: text("description").unwrap_or_default(),
			updated_at: text("updatedAt").unwrap_or_else(now_text),
			mode: match map.get("mode").and_then(Value::as_str) {
				Some("html") => TemplateMode::Html,
				_ => TemplateMode::Structured,
			},
			blocks,
			html: text("html").unwrap_or(fallback.html),
		}
	}

	pub fn to_value(&self) -> Value {
		serde_json::to_value(self).unwrap_or_default()
	}

	/// The markup this template renders with.
	///
	/// In html mode with non-empty stored `html`, that markup is returned
	/// verbatim. Otherwise the blocks are compiled.
	pub fn resolve_effective(
		&self,
		compiler: &Compiler,
		data: Option<&Value>,
		mode_override: Option<TemplateMode>,
	) -> String {
		let mode = mode_override.unwrap_or(self.mode);
		if mode == TemplateMode::Html && !self.html.is_empty() {
			return self.html.clone();
		}

		compiler.compile(&self.blocks, data)
	}

	/// Returns true when a structured template's stored `html` differs from
	/// what its blocks compile to.
	pub fn is_stale(&self, compiler: &Compiler) -> bool {
		self.mode == TemplateMode::Structured && self.html != compiler.compile(&self.blocks, None)
	}

	/// Recompile `html` from `blocks` and stamp `updated_at`.
	pub fn save(&mut self, compiler: &Compiler) {
		if self.mode == TemplateMode::Structured {
			self.html = compiler.compile(&self.blocks, None);
		}
		self.touch();
	}

	pub fn touch(&mut self) {
		self.updated_at = now_text();
	}

	pub fn set_html(&mut self, html: &str) {
		self.html = html.to_string();
		self.touch();
	}

	fn position(&self, block_id: &str) -> Option<usize> {
		self.blocks.iter().position(|block| block.id == block_id)
	}

	pub fn block(&self, block_id: &str) -> Option<&TemplateBlock> {
		self.blocks.iter().find(|block| block.id == block_id)
	}

	/// Insert a new default block of `block_type` at `index` (clamped) or at
	/// the end. Returns the new block's id.
	pub fn add_block(&mut self, block_type: BlockType, index: Option<usize>) -> String {
		let block = TemplateBlock::create_default(block_type);
		let id = block.id.clone();
		match index {
			Some(index) => self.blocks.insert(index.min(self.blocks.len()), block),
			None => self.blocks.push(block),
		}
		id
	}

	/// Replace fields of a block from a JSON object patch. Returns false for
	/// an unknown id.
	pub fn update_block(&mut self, block_id: &str, patch: &Value) -> bool {
		let Some(index) = self.position(block_id) else {
			return false;
		};
		self.blocks[index] = self.blocks[index].patched(patch);
		true
	}

	pub fn remove_block(&mut self, block_id: &str) -> bool {
		let before = self.blocks.len();
		self.blocks.retain(|block| block.id != block_id);
		self.blocks.len() != before
	}

	/// Append a deep copy of a block with a fresh id. Returns the copy's id.
	pub fn duplicate_block(&mut self, block_id: &str) -> Option<String> {
		let copy = self.block(block_id)?.duplicate();
		let id = copy.id.clone();
		self.blocks.push(copy);
		Some(id)
	}

	/// Move the block `source_id` to the position currently held by
	/// `target_id`.
	pub fn move_block(&mut self, source_id: &str, target_id: &str) -> bool {
		let (Some(source), Some(target)) = (self.position(source_id), self.position(target_id))
		else {
			return false;
		};
		let moved = self.blocks.remove(source);
		self.blocks.insert(target, moved);
		true
	}

	pub fn move_block_to_end(&mut self, source_id: &str) -> bool {
		let Some(source) = self.position(source_id) else {
			return false;
		};
		let moved = self.blocks.remove(source);
		self.blocks.push(moved);
		true
	}

	/// Deep copy under a new id and name, as a fresh version.
	#[must_use]
	pub fn duplicate(&self, version: &str) -> Self {
		let mut copy = self.clone();
		copy.id = new_id("tpl");
		copy.name = format!("{}-复制", self.name);
		copy.version = version.to_string();
		copy.touch();
		copy
	}
}

impl From<Value> for TemplateItem {
	fn from(value: Value) -> Self {
		Self::normalize(&value)
	}
}

/// Resolve the effective markup of `template` with the default compiler.
pub fn resolve_effective(
	template: &TemplateItem,
	data: Option<&Value>,
	mode_override: Option<TemplateMode>,
) -> String {
	template.resolve_effective(&Compiler::default(), data, mode_override)
}

/// Read a template object's metadata without touching its blocks.
pub fn template_summary(template: &TemplateItem) -> Map<String, Value> {
	let mut summary = Map::new();
	summary.insert("id".to_string(), Value::from(template.id.as_str()));
	summary.insert("name".to_string(), Value::from(template.name.as_str()));
	summary.insert("version".to_string(), Value::from(template.version.as_str()));
	summary.insert(
		"description".to_string(),
		Value::from(template.description.as_str()),
	);
	summary.insert("blocks".to_string(), Value::from(template.blocks.len()));
	summary
}
