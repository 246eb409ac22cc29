use chrono::DateTime;
use chrono::Local;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use derive_more::Deref;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::path::has_value;
use crate::path::set_path;
use crate::standard::StandardReportData;
use crate::tables::CardPalette;
use crate::tables::FlagTable;
use crate::tables::IconSet;

/// Display format for every date written into a render snapshot.
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const DATE_TIME_FORMATS: [&str; 6] = [
	"%Y-%m-%d %H:%M:%S",
	"%Y-%m-%d %H:%M",
	"%Y-%m-%dT%H:%M:%S",
	"%Y-%m-%dT%H:%M",
	"%Y/%m/%d %H:%M:%S",
	"%Y/%m/%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Reformat a date or date-time string as `YYYY-MM-DD HH:mm`.
///
/// Best effort: values that cannot be parsed are returned unchanged. RFC
/// 3339 timestamps keep the wall-clock time they were written with.
pub fn format_date(value: &str) -> String {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return String::new();
	}

	parse_date(trimmed).map_or_else(
		|| value.to_string(),
		|parsed| parsed.format(DISPLAY_DATE_FORMAT).to_string(),
	)
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
	if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
		return Some(parsed.naive_local());
	}

	DATE_TIME_FORMATS
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
		.or_else(|| {
			DATE_FORMATS
				.iter()
				.find_map(|format| NaiveDate::parse_from_str(value, format).ok())
				.and_then(|date| date.and_hms_opt(0, 0, 0))
		})
}

/// Render-ready report data consumed by the placeholder substitution step.
#[derive(Debug, Clone, PartialEq, Deref, Serialize)]
#[serde(transparent)]
pub struct RenderSnapshot(Value);

impl RenderSnapshot {
	pub fn as_value(&self) -> &Value {
		&self.0
	}

	pub fn into_value(self) -> Value {
		self.0
	}
}

/// Post-processes standard data into a render snapshot using injected flag,
/// palette and icon tables.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
	flags: FlagTable,
	palette: CardPalette,
	icons: IconSet,
}

impl Enricher {
	pub fn new(flags: FlagTable, palette: CardPalette, icons: IconSet) -> Self {
		Self {
			flags,
			palette,
			icons,
		}
	}

	/// Enrich with the current local time as the generated timestamp.
	pub fn enrich(&self, data: &StandardReportData) -> RenderSnapshot {
		self.enrich_at(data, Local::now().naive_local())
	}

	/// Enrich with an explicit generated timestamp.
	pub fn enrich_at(&self, data: &StandardReportData, generated_at: NaiveDateTime) -> RenderSnapshot {
		let mut snapshot = data.to_value();

		for key in ["sampleTime", "reportTime"] {
			if let Some(Value::String(text)) = snapshot
				.get_mut("order")
				.and_then(|order| order.get_mut(key))
			{
				*text = format_date(text);
			}
		}

		let results: Vec<Value> = data
			.results
			.iter()
			.map(|row| {
				let code = crate::path::display_text(Some(&row.flag));
				let meta = self.flags.meta(&code);
				let mut object = match serde_json::to_value(row) {
					Ok(Value::Object(object)) => object,
					_ => Map::new(),
				};
				object.insert("flagLabel".to_string(), Value::String(meta.label));
				object.insert("flagClass".to_string(), Value::String(meta.class));
				Value::Object(object)
			})
			.collect();

		let cards: Vec<Value> = data
			.summary_cards
			.iter()
			.flatten()
			.map(|card| self.enrich_card(card))
			.collect();

		if let Some(object) = snapshot.as_object_mut() {
			object.insert("results".to_string(), Value::Array(results));
			object.insert("summaryCards".to_string(), Value::Array(cards));
			for key in ["resistanceResults", "hivResistanceResults"] {
				if !object.get(key).is_some_and(Value::is_array) {
					object.insert(key.to_string(), Value::Array(Vec::new()));
				}
			}
		}

		set_path(
			&mut snapshot,
			"meta.generatedAt",
			Value::String(generated_at.format(DISPLAY_DATE_FORMAT).to_string()),
		);

		tracing::debug!(
			results = data.results.len(),
			cards = data.summary_cards.as_ref().map_or(0, Vec::len),
			"enriched report data"
		);

		RenderSnapshot(snapshot)
	}

	fn enrich_card(&self, card: &Value) -> Value {
		let Some(card) = card.as_object() else {
			return card.clone();
		};

		let text = |key: &str| {
			card.get(key)
				.and_then(Value::as_str)
				.filter(|value| !value.is_empty())
		};

		let (tone, colors) = self.palette.resolve(text("tone"));
		let icon = self.icons.build(text("iconKey"), &colors.icon);
		let icon_alt = text("iconAlt").or_else(|| text("title")).unwrap_or("图标");
		let icon_url = if has_value(card.get("iconUrl")) {
			card.get("iconUrl").cloned().unwrap_or_default()
		} else {
			Value::String(String::new())
		};

		let mut enriched = card.clone();
		enriched.insert("tone".to_string(), Value::String(tone));
		enriched.insert("bgColor".to_string(), Value::String(colors.bg));
		enriched.insert("borderColor".to_string(), Value::String(colors.border));
		enriched.insert("iconSvg".to_string(), Value::String(icon));
		enriched.insert("iconUrl".to_string(), icon_url);
		enriched.insert("iconAlt".to_string(), Value::String(icon_alt.to_string()));
		Value::Object(enriched)
	}
}

/// Enrich with the default tables and the current time.
pub fn enrich(data: &StandardReportData) -> RenderSnapshot {
	Enricher::default().enrich(data)
}
