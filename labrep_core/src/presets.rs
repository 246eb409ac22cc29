//! Bundled templates: the default standard report and the tuberculosis,
//! HIV resistance and routine presets.

use serde_json::Value;
use serde_json::json;

use crate::LabrepError;
use crate::LabrepResult;
use crate::block::TemplateBlock;
use crate::compiler::compile;
use crate::template::TemplateItem;
use crate::template::TemplateMode;

pub const DEFAULT_TEMPLATE_ID: &str = "tpl-standard-001";

const SHEET_STYLE: &str = "#f8fafc";

fn header(title: &str, style: Value) -> Value {
	json!({
		"id": "blk-header",
		"type": "header",
		"title": title,
		"showBarcode": true,
		"showQr": true,
		"condition": { "type": "always" },
		"style": style,
	})
}

fn footer(note: &str) -> Value {
	json!({
		"id": "blk-footer",
		"type": "footer",
		"note": note,
		"showGeneratedAt": true,
		"condition": { "type": "always" },
	})
}

fn text(text: &str) -> Value {
	json!({
		"id": "blk-text",
		"type": "text",
		"text": text,
		"condition": { "type": "always" },
	})
}

fn panel_style() -> Value {
	json!({ "background": SHEET_STYLE, "padding": "10px 12px", "borderRadius": "10px" })
}

fn table_style() -> Value {
	json!({ "background": "#ffffff", "border": "1px solid #eef2f7", "padding": "8px", "borderRadius": "10px" })
}

fn patient_fields() -> Value {
	json!([
		{ "id": "f1", "label": "姓名", "path": "patient.name" },
		{ "id": "f2", "label": "性别", "path": "patient.gender" },
		{ "id": "f3", "label": "年龄", "path": "patient.age" },
		{ "id": "f4", "label": "就诊号", "path": "patient.visitNo" },
		{ "id": "f5", "label": "证件号", "path": "patient.idNo" },
		{ "id": "f6", "label": "检验科室", "path": "order.department" },
	])
}

fn order_fields() -> Value {
	json!([
		{ "id": "f7", "label": "报告号", "path": "order.reportNo" },
		{ "id": "f8", "label": "申请单号", "path": "order.orderNo" },
		{ "id": "f9", "label": "采样时间", "path": "order.sampleTime" },
		{ "id": "f10", "label": "报告时间", "path": "order.reportTime" },
		{ "id": "f11", "label": "申请医生", "path": "doctor.name" },
		{ "id": "f12", "label": "审核医生", "path": "doctor.auditor" },
	])
}

fn result_columns() -> Value {
	json!([
		{ "id": "c1", "label": "项目", "key": "itemName" },
		{ "id": "c2", "label": "结果", "key": "value", "align": "center" },
		{ "id": "c3", "label": "单位", "key": "unit", "align": "center" },
		{ "id": "c4", "label": "参考范围", "key": "refRange" },
		{ "id": "c5", "label": "提示", "key": "flagLabel", "align": "center" },
	])
}

fn standard_blocks() -> Value {
	json!([
		header("检验报告", json!({})),
		{
			"id": "blk-patient",
			"type": "info",
			"title": "患者信息",
			"columns": 3,
			"fields": patient_fields(),
		},
		{
			"id": "blk-order",
			"type": "info",
			"title": "检验信息",
			"columns": 3,
			"fields": order_fields(),
		},
		{
			"id": "blk-results",
			"type": "results",
			"title": "检验结果",
			"columns": result_columns(),
		},
		{
			"id": "blk-source",
			"type": "info",
			"title": "来源信息",
			"columns": 2,
			"fields": [
				{ "id": "f13", "label": "来源实验室", "path": "source.labName" },
				{ "id": "f14", "label": "来源系统", "path": "source.system" },
			],
		},
		footer("报告仅供临床参考，请结合患者情况综合判断。"),
	])
}

fn tuberculosis_blocks() -> Value {
	json!([
		header("结核检验报告", json!({ "borderBottom": "2px solid #0f766e", "padding": "0 0 10px 0" })),
		{
			"id": "blk-section-patient",
			"type": "info",
			"title": "送检信息",
			"columns": 3,
			"style": panel_style(),
			"fields": [
				{ "id": "f1", "label": "受检者姓名", "path": "patient.name" },
				{ "id": "f2", "label": "性别", "path": "patient.gender" },
				{ "id": "f3", "label": "年龄", "path": "patient.age" },
				{ "id": "f4", "label": "就诊号", "path": "patient.visitNo" },
				{ "id": "f5", "label": "送检科室", "path": "order.department" },
				{ "id": "f6", "label": "送检医生", "path": "doctor.name" },
			],
		},
		{
			"id": "blk-section-specimen",
			"type": "info",
			"title": "样本信息",
			"columns": 3,
			"style": panel_style(),
			"fields": [
				{ "id": "f7", "label": "样本编号", "path": "order.orderNo" },
				{ "id": "f8", "label": "样本类型", "path": "order.specimenType" },
				{ "id": "f9", "label": "采样时间", "path": "order.sampleTime" },
				{ "id": "f10", "label": "报告时间", "path": "order.reportTime" },
				{ "id": "f11", "label": "检测方法", "path": "order.method" },
				{ "id": "f12", "label": "复检状态", "path": "order.recheck" },
			],
		},
		{
			"id": "blk-section-results",
			"type": "results",
			"title": "结核检测结果",
			"style": table_style(),
			"columns": result_columns(),
		},
		{
			"id": "blk-section-summary",
			"type": "cards",
			"title": "本次检测结果综述",
			"dataPath": "summaryCards",
			"columns": 3,
			"style": { "marginBottom": "16px" },
		},
		{
			"id": "blk-section-resistance",
			"type": "results",
			"title": "耐药结果",
			"dataPath": "resistanceResults",
			"style": table_style(),
			"columns": [
				{ "id": "c1", "label": "分类", "key": "category" },
				{ "id": "c2", "label": "中文名", "key": "name" },
				{ "id": "c3", "label": "拉丁文名", "key": "latinName" },
				{ "id": "c4", "label": "疑似耐药药物", "key": "resistantDrug" },
			],
		},
		text("结核相关检测结果仅供临床参考，请结合患者情况综合判断。"),
		footer("检测机构：示例医院检验科"),
	])
}

fn hiv_blocks() -> Value {
	json!([
		header("HIV-1耐药及亚型检测报告", json!({ "borderBottom": "2px solid #0f766e", "padding": "0 0 10px 0" })),
		{
			"id": "blk-logo",
			"type": "image",
			"title": "机构标识",
			"srcPath": "org.logo",
			"alt": "机构标识",
			"width": "96px",
			"height": "96px",
			"radius": "18px",
			"caption": "示例医院",
			"style": { "marginBottom": "12px" },
		},
		{
			"id": "blk-section-sample",
			"type": "info",
			"title": "样本信息",
			"columns": 4,
			"style": panel_style(),
			"fields": [
				{ "id": "f1", "label": "样本编号", "path": "order.orderNo" },
				{ "id": "f2", "label": "检测日期", "path": "order.testDate" },
				{ "id": "f3", "label": "样本亚型", "path": "order.subtype" },
				{ "id": "f4", "label": "覆盖区域", "path": "order.coverage" },
				{ "id": "f5", "label": "检测方法", "path": "order.method" },
				{ "id": "f6", "label": "耐药解析系统", "path": "order.analysisSystem" },
				{ "id": "f7", "label": "检测频率阈值", "path": "order.threshold" },
				{ "id": "f8", "label": "耐药突变数", "path": "order.mutationCount" },
			],
		},
		{
			"id": "blk-section-hiv",
			"type": "results",
			"title": "耐药及相关突变结果",
			"dataPath": "hivResistanceResults",
			"style": table_style(),
			"columns": [
				{ "id": "c1", "label": "基因区", "key": "geneRegion" },
				{ "id": "c2", "label": "耐药相关突变", "key": "mutation" },
				{ "id": "c3", "label": "抗病毒药物", "key": "drug" },
				{ "id": "c4", "label": "耐药程度", "key": "level" },
			],
		},
		text("HIV-1耐药及亚型检测结果需结合临床综合判断。"),
		footer("检测机构：示例医院检验科"),
	])
}

fn routine_blocks() -> Value {
	json!([
		header("常规检验报告", json!({ "marginBottom": "8px" })),
		{
			"id": "blk-section-patient",
			"type": "info",
			"title": "患者信息",
			"columns": 3,
			"style": panel_style(),
			"fields": patient_fields(),
		},
		{
			"id": "blk-section-order",
			"type": "info",
			"title": "检验信息",
			"columns": 3,
			"style": panel_style(),
			"fields": order_fields(),
		},
		{
			"id": "blk-section-results",
			"type": "results",
			"title": "常规检验结果",
			"style": table_style(),
			"columns": result_columns(),
		},
		text("常规检验结果仅供临床参考。"),
		footer("检测机构：示例医院检验科"),
	])
}

fn build(id: &str, name: &str, description: &str, updated_at: &str, blocks: &Value) -> TemplateItem {
	let blocks: Vec<TemplateBlock> = blocks
		.as_array()
		.into_iter()
		.flatten()
		.map(TemplateBlock::normalize)
		.collect();
	let html = compile(&blocks, None);

	TemplateItem {
		id: id.to_string(),
		name: name.to_string(),
		version: "v1.0".to_string(),
		description: description.to_string(),
		updated_at: updated_at.to_string(),
		mode: TemplateMode::Structured,
		blocks,
		html,
	}
}

/// The standard report template used as the fallback for incomplete
/// stored templates.
pub fn default_template() -> TemplateItem {
	build(
		DEFAULT_TEMPLATE_ID,
		"标准检验报告",
		"标准化检验报告模板，覆盖患者信息、检验信息与结果表格。",
		"2026-02-05 10:30",
		&standard_blocks(),
	)
}

/// The bundled presets in display order.
pub fn presets() -> Vec<TemplateItem> {
	vec![
		build(
			"tpl-tb-001",
			"结核报告模板",
			"适用于结核相关检验的标准化模板。",
			"2026-02-06 10:00",
			&tuberculosis_blocks(),
		),
		build(
			"tpl-hiv-001",
			"HIV 报告模板",
			"适用于 HIV 检测报告的标准化模板。",
			"2026-02-06 10:00",
			&hiv_blocks(),
		),
		build(
			"tpl-routine-001",
			"常规检验报告模板",
			"适用于常规检验项目的标准化模板。",
			"2026-02-06 10:00",
			&routine_blocks(),
		),
	]
}

/// Look up a preset (or the default template) by id.
pub fn find_preset(id: &str) -> LabrepResult<TemplateItem> {
	if id == DEFAULT_TEMPLATE_ID {
		return Ok(default_template());
	}

	presets()
		.into_iter()
		.find(|template| template.id == id)
		.ok_or_else(|| LabrepError::UnknownPreset(id.to_string()))
}
