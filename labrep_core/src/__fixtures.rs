use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde_json::Value;
use serde_json::json;

use crate::BlockKind;
use crate::InfoField;
use crate::ResultColumn;
use crate::StandardReportData;
use crate::TemplateBlock;
use crate::TextAlign;

/// A raw payload in the shape produced by the sample laboratory system.
pub fn raw_input() -> Value {
	json!({
		"patientInfo": {
			"name": "张三",
			"sex": "男",
			"age": 45,
			"id": "110101198001010011",
			"visitNo": "V2026020501"
		},
		"orderInfo": {
			"reportNo": "R20260205001",
			"orderNo": "O20260205001",
			"sampleTime": "2026-02-05T08:30:00",
			"reportTime": "2026-02-05 10:15:42",
			"department": "检验科"
		},
		"doctorInfo": { "name": "李医生", "auditor": "王审核" },
		"sourceInfo": { "labName": "中心实验室", "system": "LIS" },
		"results": [
			{ "item": "WBC", "value": 6.5, "unit": "10^9/L", "ref": "3.5-9.5", "flag": "" },
			{ "item": "HGB", "value": "168", "unit": "g/L", "ref": "130-175", "flag": "H" },
			{ "item": "PLT", "value": "89", "unit": "10^9/L", "ref": "125-350", "flag": "L" }
		]
	})
}

pub fn standard_data() -> StandardReportData {
	crate::map_raw_to_standard(
		&raw_input(),
		&crate::default_field_mappings(),
		crate::DEFAULT_RESULT_ARRAY_PATH,
		&crate::default_result_mappings(),
		&serde_json::Map::new(),
	)
}

pub fn generated_at() -> NaiveDateTime {
	NaiveDate::from_ymd_opt(2026, 2, 5)
		.and_then(|date| date.and_hms_opt(11, 0, 0))
		.unwrap_or_else(|| panic!("valid fixture date"))
}

pub fn text_block(id: &str, text: &str) -> TemplateBlock {
	TemplateBlock::new(
		id,
		None,
		BlockKind::Text {
			text: text.to_string(),
		},
	)
}

pub fn info_block() -> TemplateBlock {
	TemplateBlock::new(
		"blk-info",
		Some("患者信息"),
		BlockKind::Info {
			columns: 2,
			fields: vec![InfoField::new("姓名", "patient.name")],
		},
	)
}

pub fn results_block() -> TemplateBlock {
	TemplateBlock::new(
		"blk-results",
		None,
		BlockKind::Results {
			columns: vec![ResultColumn::new("结果", "value").aligned(TextAlign::Center)],
			data_path: crate::DEFAULT_RESULTS_PATH.to_string(),
		},
	)
}

/// Block shapes covering every variant, including older or incomplete
/// stored forms.
pub fn raw_blocks() -> Vec<Value> {
	vec![
		json!({ "type": "header", "title": "检验报告", "showBarcode": true }),
		json!({ "id": 7, "type": "info", "columns": "2", "fields": [{ "label": "姓名", "path": "patient.name" }, "bad"] }),
		json!({ "type": "results", "columns": [{ "label": "结果", "key": "value", "align": "center", "width": "80px" }] }),
		json!({ "type": "cards", "columns": 0 }),
		json!({ "type": "image", "srcPath": "https://example.com/logo.png", "width": "96px" }),
		json!({ "type": "text", "text": "说明", "hidden": true, "style": { "fontSize": 14.5, "textAlign": "middle" } }),
		json!({ "type": "code", "label": "  " }),
		json!({ "type": "footer", "condition": { "type": "fieldHasValue", "path": "doctor.name" } }),
		json!({ "type": "chart" }),
		json!("not a block"),
	]
}
