use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Escape the characters that are unsafe inside markup text and attribute
/// values. Braces are escaped too, so escaped text never forms a
/// placeholder in a compiled template.
pub fn escape_html(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for ch in value.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			'{' => escaped.push_str("&#123;"),
			'}' => escaped.push_str("&#125;"),
			other => escaped.push(other),
		}
	}

	escaped
}

/// Horizontal alignment shared by block styles and result table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
	Left,
	Center,
	Right,
}

impl TextAlign {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Left => "left",
			Self::Center => "center",
			Self::Right => "right",
		}
	}

	/// Parse an alignment keyword, ignoring anything outside the closed set.
	pub fn from_value(value: Option<&Value>) -> Option<Self> {
		match value.and_then(Value::as_str).map(str::trim) {
			Some("left") => Some(Self::Left),
			Some("center") => Some(Self::Center),
			Some("right") => Some(Self::Right),
			_ => None,
		}
	}
}

/// A font size in pixels that compares approximately so that styles loaded
/// from storage stay equal to their re-serialized form.
#[derive(Debug, Clone, Copy, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontSize(pub f64);

impl PartialEq for FontSize {
	fn eq(&self, other: &Self) -> bool {
		float_cmp::approx_eq!(f64, self.0, other.0)
	}
}

impl std::fmt::Display for FontSize {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The closed set of presentation attributes a block may carry.
///
/// Serialization to inline style text always follows field declaration
/// order, so equal styles produce byte-identical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub font_size: Option<FontSize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text_align: Option<TextAlign>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub padding: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub margin_bottom: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub background: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub border: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub border_bottom: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub border_radius: Option<String>,
}

impl BlockStyle {
	/// Coerce an untrusted style object. Unknown attributes and values of the
	/// wrong type are dropped; a non-object yields the empty style.
	pub fn normalize(raw: Option<&Value>) -> Self {
		let Some(map) = raw.and_then(Value::as_object) else {
			return Self::default();
		};

		Self {
			font_size: map
				.get("fontSize")
				.and_then(coerce_number)
				.filter(|size| size.is_finite() && *size > 0.0)
				.map(FontSize),
			text_align: TextAlign::from_value(map.get("textAlign")),
			padding: style_text(map, "padding"),
			margin_bottom: style_text(map, "marginBottom"),
			background: style_text(map, "background"),
			border: style_text(map, "border"),
			border_bottom: style_text(map, "borderBottom"),
			border_radius: style_text(map, "borderRadius"),
		}
	}

	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}

	/// Semicolon-joined `property:value` pairs with every free-form value
	/// escaped. Empty when no attribute is set.
	pub fn to_css(&self) -> String {
		let mut rules: Vec<String> = Vec::new();

		if let Some(size) = self.font_size {
			rules.push(format!("font-size:{size}px"));
		}
		if let Some(align) = self.text_align {
			rules.push(format!("text-align:{}", align.as_str()));
		}

		let text_rules = [
			("padding", &self.padding),
			("margin-bottom", &self.margin_bottom),
			("background", &self.background),
			("border", &self.border),
			("border-bottom", &self.border_bottom),
			("border-radius", &self.border_radius),
		];
		for (property, value) in text_rules {
			if let Some(value) = value {
				rules.push(format!("{property}:{}", escape_html(value)));
			}
		}

		rules.join(";")
	}

	/// The full ` style="..."` attribute, or an empty string when no
	/// attribute is set.
	pub fn to_attribute(&self) -> String {
		let css = self.to_css();
		if css.is_empty() {
			String::new()
		} else {
			format!(" style=\"{css}\"")
		}
	}
}

fn style_text(map: &Map<String, Value>, key: &str) -> Option<String> {
	map.get(key)
		.and_then(Value::as_str)
		.filter(|value| !value.trim().is_empty())
		.map(ToString::to_string)
}

/// Read a number that may have been stored as a JSON number or a numeric
/// string.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse::<f64>().ok(),
		_ => None,
	}
}
