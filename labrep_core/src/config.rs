use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::LabrepError;
use crate::LabrepResult;
use crate::compiler::Compiler;
use crate::enrich::Enricher;
use crate::mapping::MappingConfig;
use crate::mapping::MappingSession;
use crate::standard::FieldGroup;
use crate::tables::CardPalette;
use crate::tables::FlagEntry;
use crate::tables::FlagTable;
use crate::tables::IconSet;
use crate::tables::ToneColors;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["labrep.toml", ".labrep.toml", ".config/labrep.toml"];

/// Configuration loaded from a `labrep.toml` file.
///
/// ```toml
/// [mapping]
/// resultArrayPath = "payload.items"
///
/// [[mapping.fieldMappings]]
/// sourcePath = "patientInfo.name"
/// targetPath = "patient.name"
///
/// [[mapping.resultMappings]]
/// targetKey = "itemName"
/// sourceKey = "item"
///
/// [org]
/// name = "示例医院"
/// logo = "https://example.com/logo.png"
///
/// [[flags]]
/// code = "P"
/// label = "阳性"
/// class = "flag-positive"
/// level = "critical"
///
/// [palette.indigo]
/// bg = "#e0e7ff"
/// border = "#a5b4fc"
/// icon = "#6366f1"
///
/// [icons]
/// dna = "<svg ...>{color}</svg>"
/// ```
///
/// Every section is optional. Flags, palette tones and icons are merged over
/// the built-in tables, replacing entries with the same name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabrepConfig {
	#[serde(default)]
	pub mapping: MappingConfig,
	/// Organisation fields merged into every mapped report.
	#[serde(default)]
	pub org: FieldGroup,
	#[serde(default)]
	pub flags: Vec<FlagEntry>,
	#[serde(default)]
	pub palette: BTreeMap<String, ToneColors>,
	/// Icon markup keyed by icon name. `{color}` is replaced with the tone's
	/// icon colour.
	#[serde(default)]
	pub icons: BTreeMap<String, String>,
}

impl LabrepConfig {
	/// Return the first existing config file path for `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> LabrepResult<Option<LabrepConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> LabrepResult<LabrepConfig> {
		toml::from_str(content).map_err(|e| LabrepError::ConfigParse(e.to_string()))
	}

	pub fn flag_table(&self) -> FlagTable {
		self.flags
			.iter()
			.cloned()
			.fold(FlagTable::default(), FlagTable::with_entry)
	}

	pub fn card_palette(&self) -> CardPalette {
		self.palette
			.iter()
			.fold(CardPalette::default(), |palette, (name, colors)| {
				palette.with_tone(name, colors.clone())
			})
	}

	pub fn icon_set(&self) -> IconSet {
		self.icons
			.iter()
			.fold(IconSet::default(), |icons, (name, markup)| {
				icons.with_icon(name, markup)
			})
	}

	pub fn compiler(&self) -> Compiler {
		Compiler::new(self.flag_table())
	}

	pub fn enricher(&self) -> Enricher {
		Enricher::new(self.flag_table(), self.card_palette(), self.icon_set())
	}

	/// A mapping session seeded with this config's mappings and
	/// organisation fields.
	pub fn session(&self) -> MappingSession {
		MappingSession::new(self.mapping.clone(), self.org.clone())
	}
}

/// Read a json, toml or yaml file into a JSON tree, choosing the format by
/// file extension.
pub fn load_data_file(path: &Path) -> LabrepResult<Value> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| {
		LabrepError::DataFile {
			path: path_display.clone(),
			reason: e.to_string(),
		}
	})?;
	let format = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();

	parse_data_file(&content, format.as_str(), &path_display)
}

/// Write `value` to `path` in the format named by the file extension, so a
/// file read with [`load_data_file`] keeps its format when written back.
pub fn write_data_file(path: &Path, value: &Value) -> LabrepResult<()> {
	let path_display = path.display().to_string();
	let format = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();
	let content = format_data_file(value, format.as_str(), &path_display)?;

	std::fs::write(path, content).map_err(|e| {
		LabrepError::DataSerialize {
			path: path_display,
			reason: e.to_string(),
		}
	})
}

/// Serialize a JSON tree in the named format. TOML cannot hold `null`, so
/// null values are left out of TOML output.
pub fn format_data_file(value: &Value, format: &str, path_display: &str) -> LabrepResult<String> {
	let serialize_error = |reason: String| {
		LabrepError::DataSerialize {
			path: path_display.to_string(),
			reason,
		}
	};

	match format {
		"json" => {
			serde_json::to_string_pretty(value)
				.map(|content| format!("{content}\n"))
				.map_err(|e| serialize_error(e.to_string()))
		}
		"toml" => {
			toml::to_string_pretty(&without_nulls(value))
				.map_err(|e| serialize_error(e.to_string()))
		}
		"yaml" | "yml" => serde_yaml_ng::to_string(value).map_err(|e| serialize_error(e.to_string())),
		other => Err(LabrepError::UnsupportedDataFormat(other.to_string())),
	}
}

fn without_nulls(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			Value::Object(
				map.iter()
					.filter(|(_, value)| !value.is_null())
					.map(|(key, value)| (key.clone(), without_nulls(value)))
					.collect(),
			)
		}
		Value::Array(items) => {
			Value::Array(
				items
					.iter()
					.filter(|value| !value.is_null())
					.map(without_nulls)
					.collect(),
			)
		}
		other => other.clone(),
	}
}

/// Parse `content` in the named format into a JSON tree.
pub fn parse_data_file(content: &str, format: &str, path_display: &str) -> LabrepResult<Value> {
	match format {
		"json" => {
			serde_json::from_str(content).map_err(|e| {
				LabrepError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})
		}
		"toml" => {
			let toml_value: toml::Value = toml::from_str(content).map_err(|e| {
				LabrepError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})?;
			toml_to_json(toml_value, path_display)
		}
		"yaml" | "yml" => {
			serde_yaml_ng::from_str(content).map_err(|e| {
				LabrepError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})
		}
		other => Err(LabrepError::UnsupportedDataFormat(other.to_string())),
	}
}

fn toml_to_json(value: toml::Value, path_display: &str) -> LabrepResult<Value> {
	let json = match value {
		toml::Value::String(s) => Value::String(s),
		toml::Value::Integer(i) => Value::Number(i.into()),
		toml::Value::Float(f) => {
			Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				LabrepError::UnconvertibleFloat {
					path: path_display.to_string(),
					value: f.to_string(),
				}
			})?)
		}
		toml::Value::Boolean(b) => Value::Bool(b),
		toml::Value::Datetime(dt) => Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			let items: LabrepResult<Vec<Value>> = arr
				.into_iter()
				.map(|v| toml_to_json(v, path_display))
				.collect();
			Value::Array(items?)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k, toml_to_json(v, path_display)?);
			}
			Value::Object(map)
		}
	};

	Ok(json)
}
