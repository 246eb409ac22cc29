//! Lookup tables consulted while evaluating conditions and enriching report
//! data. Each table has a built-in default and can be replaced from
//! configuration, so callers always pass the table they want to use.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Severity attached to a flag code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlagLevel {
	#[default]
	Info,
	Warning,
	Critical,
}

/// One known result flag code with its display label and style class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEntry {
	pub code: String,
	pub label: String,
	pub class: String,
	#[serde(default)]
	pub level: FlagLevel,
}

impl FlagEntry {
	pub fn new(code: &str, label: &str, class: &str, level: FlagLevel) -> Self {
		Self {
			code: code.to_string(),
			label: label.to_string(),
			class: class.to_string(),
			level,
		}
	}
}

/// Label and class derived for a single result row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagMeta {
	pub label: String,
	pub class: String,
}

pub const CUSTOM_FLAG_CLASS: &str = "flag-custom";

/// Maps flag codes to labels and classes. Codes missing from the table
/// still get a label (the code itself) and the generic custom class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTable {
	entries: Vec<FlagEntry>,
}

impl Default for FlagTable {
	fn default() -> Self {
		Self::new(vec![
			FlagEntry::new("H", "偏高", "flag-high", FlagLevel::Warning),
			FlagEntry::new("L", "偏低", "flag-low", FlagLevel::Warning),
			FlagEntry::new("C", "危急", "flag-critical", FlagLevel::Critical),
		])
	}
}

impl FlagTable {
	pub fn new(entries: Vec<FlagEntry>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[FlagEntry] {
		&self.entries
	}

	/// Add `entry`, replacing any existing entry with the same code.
	#[must_use]
	pub fn with_entry(mut self, entry: FlagEntry) -> Self {
		match self.entries.iter_mut().find(|existing| existing.code == entry.code) {
			Some(existing) => *existing = entry,
			None => self.entries.push(entry),
		}
		self
	}

	pub fn get(&self, code: &str) -> Option<&FlagEntry> {
		self.entries.iter().find(|entry| entry.code == code)
	}

	/// Derive the label and class for `code`. An empty code has neither.
	pub fn meta(&self, code: &str) -> FlagMeta {
		if code.is_empty() {
			return FlagMeta::default();
		}

		match self.get(code) {
			Some(entry) => {
				FlagMeta {
					label: entry.label.clone(),
					class: entry.class.clone(),
				}
			}
			None => {
				FlagMeta {
					label: code.to_string(),
					class: CUSTOM_FLAG_CLASS.to_string(),
				}
			}
		}
	}
}

/// Colours used to paint one summary card tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneColors {
	pub bg: String,
	pub border: String,
	pub icon: String,
}

impl ToneColors {
	pub fn new(bg: &str, border: &str, icon: &str) -> Self {
		Self {
			bg: bg.to_string(),
			border: border.to_string(),
			icon: icon.to_string(),
		}
	}
}

pub const DEFAULT_TONE: &str = "teal";

/// Tone name to colour mapping for summary cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPalette {
	tones: BTreeMap<String, ToneColors>,
}

impl Default for CardPalette {
	fn default() -> Self {
		let mut tones = BTreeMap::new();
		tones.insert(
			"rose".to_string(),
			ToneColors::new("#fecaca", "#fda4af", "#fb7185"),
		);
		tones.insert(
			DEFAULT_TONE.to_string(),
			ToneColors::new("#a7f3d0", "#5eead4", "#14b8a6"),
		);
		tones.insert(
			"amber".to_string(),
			ToneColors::new("#fdba74", "#fb923c", "#f97316"),
		);
		tones.insert(
			"slate".to_string(),
			ToneColors::new("#e2e8f0", "#cbd5f5", "#64748b"),
		);
		Self { tones }
	}
}

impl CardPalette {
	pub fn new(tones: BTreeMap<String, ToneColors>) -> Self {
		Self { tones }
	}

	#[must_use]
	pub fn with_tone(mut self, name: &str, colors: ToneColors) -> Self {
		self.tones.insert(name.to_string(), colors);
		self
	}

	/// Resolve a tone name, falling back to `teal` for unknown or absent
	/// tones. Returns the effective tone name with its colours.
	pub fn resolve(&self, tone: Option<&str>) -> (String, ToneColors) {
		if let Some((name, colors)) = tone.and_then(|tone| self.tones.get_key_value(tone)) {
			return (name.clone(), colors.clone());
		}

		let colors = self
			.tones
			.get(DEFAULT_TONE)
			.cloned()
			.unwrap_or_else(|| ToneColors::new("#a7f3d0", "#5eead4", "#14b8a6"));
		(DEFAULT_TONE.to_string(), colors)
	}
}

pub const DEFAULT_ICON: &str = "microbe";

const MICROBE_SVG: &str = r##"<svg viewBox="0 0 48 48" xmlns="http://www.w3.org/2000/svg" aria-hidden="true"><circle cx="24" cy="24" r="20" fill="#ffffff" stroke="{color}" stroke-width="3" /><path d="M16 24c4-4 12-4 16 0" stroke="{color}" stroke-width="3" stroke-linecap="round" /><path d="M18 16c3 2 9 2 12 0" stroke="{color}" stroke-width="3" stroke-linecap="round" /><path d="M18 32c3-2 9-2 12 0" stroke="{color}" stroke-width="3" stroke-linecap="round" /></svg>"##;

const BACTERIA_SVG: &str = r##"<svg viewBox="0 0 48 48" xmlns="http://www.w3.org/2000/svg" aria-hidden="true"><circle cx="24" cy="24" r="20" fill="#ffffff" stroke="{color}" stroke-width="3" /><circle cx="18" cy="18" r="3" fill="{color}" /><circle cx="30" cy="20" r="2.5" fill="{color}" /><circle cx="22" cy="30" r="2.5" fill="{color}" /><path d="M24 12v8M24 28v8" stroke="{color}" stroke-width="3" stroke-linecap="round" /></svg>"##;

const VIRUS_SVG: &str = r##"<svg viewBox="0 0 48 48" xmlns="http://www.w3.org/2000/svg" aria-hidden="true"><circle cx="24" cy="24" r="14" fill="#ffffff" stroke="{color}" stroke-width="3" /><line x1="24" y1="4" x2="24" y2="12" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="24" y1="36" x2="24" y2="44" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="4" y1="24" x2="12" y2="24" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="36" y1="24" x2="44" y2="24" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="10" y1="10" x2="16" y2="16" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="32" y1="32" x2="38" y2="38" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="10" y1="38" x2="16" y2="32" stroke="{color}" stroke-width="3" stroke-linecap="round" /><line x1="32" y1="16" x2="38" y2="10" stroke="{color}" stroke-width="3" stroke-linecap="round" /></svg>"##;

/// Inline icon graphics keyed by icon name. Each graphic is a markup string
/// where `{color}` is replaced with the tone's icon colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
	icons: BTreeMap<String, String>,
}

impl Default for IconSet {
	fn default() -> Self {
		let mut icons = BTreeMap::new();
		icons.insert(DEFAULT_ICON.to_string(), MICROBE_SVG.to_string());
		icons.insert("bacteria".to_string(), BACTERIA_SVG.to_string());
		icons.insert("virus".to_string(), VIRUS_SVG.to_string());
		Self { icons }
	}
}

impl IconSet {
	pub fn new(icons: BTreeMap<String, String>) -> Self {
		Self { icons }
	}

	#[must_use]
	pub fn with_icon(mut self, name: &str, markup: &str) -> Self {
		self.icons.insert(name.to_string(), markup.to_string());
		self
	}

	/// Build the graphic for `key` in `color`, falling back to the default
	/// icon for unknown or absent keys.
	pub fn build(&self, key: Option<&str>, color: &str) -> String {
		let graphic = key
			.and_then(|key| self.icons.get(key))
			.or_else(|| self.icons.get(DEFAULT_ICON))
			.map_or(MICROBE_SVG, String::as_str);

		graphic.replace("{color}", color)
	}
}
