use std::collections::BTreeSet;

use rstest::rstest;
use serde_json::Value;
use serde_json::json;
use similar_asserts::assert_eq;

use super::__fixtures::*;
use super::*;

#[rstest]
#[case::simple("patient.name", json!({ "patient": { "name": "张三" } }))]
#[case::deep("a.b.c.d", json!({ "a": { "b": { "c": { "d": "张三" } } } }))]
#[case::stray_dots(".patient..name.", json!({ "patient": { "name": "张三" } }))]
fn set_then_get_path(#[case] path: &str, #[case] expected: Value) {
	let mut root = json!({});
	set_path(&mut root, path, json!("张三"));

	assert_eq!(root, expected);
	assert_eq!(get_path(&root, path), Some(&json!("张三")));
}

#[test]
fn get_path_stops_at_non_objects() {
	let root = json!({ "patient": { "name": null, "age": 45 }, "results": [1, 2] });

	assert_eq!(get_path(&root, "patient.name"), Some(&Value::Null));
	assert_eq!(get_path(&root, "patient.age.years"), None);
	assert_eq!(get_path(&root, "results.0"), None);
	assert_eq!(get_path(&root, "missing.name"), None);
	assert_eq!(get_path(&root, ""), None);
}

#[test]
fn set_path_replaces_non_object_intermediates() {
	let mut root = json!({ "order": "R1" });
	set_path(&mut root, "order.reportNo", json!("R2"));
	assert_eq!(root, json!({ "order": { "reportNo": "R2" } }));

	let mut scalar = json!(42);
	set_path(&mut scalar, "meta.generatedAt", json!("now"));
	assert_eq!(scalar, json!({ "meta": { "generatedAt": "now" } }));

	let before = root.clone();
	set_path(&mut root, "..", json!("ignored"));
	assert_eq!(root, before);
}

#[rstest]
#[case::missing(None, false)]
#[case::null(Some(json!(null)), false)]
#[case::blank(Some(json!("   ")), false)]
#[case::text(Some(json!("张三")), true)]
#[case::zero(Some(json!(0)), true)]
#[case::falsy(Some(json!(false)), true)]
fn has_value_rules(#[case] value: Option<Value>, #[case] expected: bool) {
	assert_eq!(has_value(value.as_ref()), expected);
}

#[test]
fn escape_html_escapes_markup_characters() {
	assert_eq!(
		escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
		"&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
	);
}

#[test]
fn style_serializes_in_declaration_order() {
	let style = BlockStyle::normalize(Some(&json!({
		"borderRadius": "4px",
		"padding": "8px",
		"textAlign": "center",
		"fontSize": 14,
		"unknown": "dropped",
		"background": 12,
	})));

	assert_eq!(
		style.to_css(),
		"font-size:14px;text-align:center;padding:8px;border-radius:4px"
	);
	assert_eq!(
		style.to_attribute(),
		r#" style="font-size:14px;text-align:center;padding:8px;border-radius:4px""#
	);
}

#[test]
fn style_escapes_values_and_handles_empty() {
	let style = BlockStyle::normalize(Some(&json!({ "background": "url(\"x\")" })));
	assert_eq!(style.to_css(), "background:url(&quot;x&quot;)");

	let empty = BlockStyle::normalize(Some(&json!("not an object")));
	assert!(empty.is_empty());
	assert_eq!(empty.to_attribute(), "");
}

#[test]
fn font_size_compares_approximately() {
	let left = BlockStyle::normalize(Some(&json!({ "fontSize": 0.1 + 0.2 })));
	let right = BlockStyle::normalize(Some(&json!({ "fontSize": "0.3" })));

	assert_eq!(left, right);
}

#[test]
fn create_default_gives_each_type_a_valid_block() {
	let mut ids = BTreeSet::new();
	for block_type in BlockType::ALL {
		let block = TemplateBlock::create_default(block_type);
		assert_eq!(block.block_type(), block_type);
		assert_eq!(block.condition, BlockCondition::Always);
		assert!(!block.hidden);
		assert!(block.title.is_some());
		assert!(ids.insert(block.id.clone()), "duplicate id {}", block.id);
	}
}

#[test]
fn normalize_replaces_unknown_blocks_with_text() {
	let unknown = TemplateBlock::normalize(&json!({ "id": "b1", "type": "chart" }));
	let scalar = TemplateBlock::normalize(&json!(3));

	assert_eq!(unknown.block_type(), BlockType::Text);
	assert_eq!(scalar.block_type(), BlockType::Text);
	assert_ne!(unknown.id, "b1");
}

#[test]
fn normalize_coerces_older_shapes() {
	let block = TemplateBlock::normalize(&json!({
		"id": 7,
		"type": "info",
		"columns": "2",
		"fields": [{ "label": "姓名", "path": "patient.name" }, "bad"],
		"condition": { "type": "somethingElse" },
	}));

	assert_eq!(block.id, "7");
	assert_eq!(block.condition, BlockCondition::Always);
	let BlockKind::Info { columns, fields } = &block.kind else {
		panic!("expected an info block, got {:?}", block.kind);
	};
	assert_eq!(*columns, 2);
	assert_eq!(fields.len(), 1);
	assert_eq!(fields[0].path, "patient.name");
	assert!(!fields[0].id.is_empty());
}

#[rstest]
fn normalize_is_idempotent() {
	for raw in raw_blocks() {
		let once = TemplateBlock::normalize(&raw);
		let twice = TemplateBlock::normalize(&once.to_value());
		assert_eq!(once, twice, "raw block: {raw}");
	}
}

#[test]
fn deserializing_a_block_normalizes_it() -> AnyEmptyResult {
	let block: TemplateBlock = serde_json::from_str(r#"{ "type": "cards", "columns": -1 }"#)?;

	assert_eq!(
		block.kind,
		BlockKind::Cards {
			data_path: DEFAULT_CARDS_PATH.to_string(),
			columns: DEFAULT_GRID_COLUMNS,
		}
	);

	Ok(())
}

#[test]
fn block_serializes_as_a_single_tagged_object() {
	let block = text_block("blk-1", "hello").with_style(BlockStyle::normalize(Some(&json!({
		"padding": "4px"
	}))));

	insta::assert_json_snapshot!(block, @r#"
	{
	  "id": "blk-1",
	  "style": {
	    "padding": "4px"
	  },
	  "condition": {
	    "type": "always"
	  },
	  "type": "text",
	  "text": "hello"
	}
	"#);
}

#[test]
fn patched_keeps_id_and_renormalizes() {
	let block = text_block("blk-1", "hello");
	let patched = block.patched(&json!({ "id": "other", "type": "footer", "note": "备注" }));

	assert_eq!(patched.id, "blk-1");
	assert_eq!(
		patched.kind,
		BlockKind::Footer {
			note: "备注".to_string(),
			show_generated_at: false,
		}
	);
}

#[rstest]
#[case::field_present(json!({ "type": "fieldHasValue", "path": "patient.name" }), true)]
#[case::field_blank(json!({ "type": "fieldHasValue", "path": "patient.gender" }), false)]
#[case::field_missing(json!({ "type": "fieldHasValue", "path": "patient.nickname" }), false)]
#[case::flag_code(json!({ "type": "resultsHasFlag", "flag": "H" }), true)]
#[case::flag_label(json!({ "type": "resultsHasFlag", "flag": "偏低" }), true)]
#[case::flag_absent(json!({ "type": "resultsHasFlag", "flag": "C" }), false)]
#[case::always(json!({ "type": "always" }), true)]
fn conditions_evaluate_against_mapped_data(#[case] raw: Value, #[case] expected: bool) {
	let mut data = standard_data().to_value();
	set_path(&mut data, "patient.gender", json!(" "));
	let condition = BlockCondition::normalize(Some(&raw));

	assert_eq!(condition.evaluate(&data, &FlagTable::default()), expected);
}

#[test]
fn results_has_flag_matches_stored_labels() {
	let data = json!({ "results": [{ "flag": "", "flagLabel": "阳性" }] });
	let condition = BlockCondition::ResultsHasFlag {
		flag: "阳性".to_string(),
	};

	assert!(condition.evaluate(&data, &FlagTable::default()));
	assert!(!condition.evaluate(&json!({ "results": "none" }), &FlagTable::default()));
}

#[test]
fn hidden_blocks_are_never_visible() {
	let mut block = text_block("blk-1", "hello");
	block.hidden = true;
	let flags = FlagTable::default();

	assert!(!is_visible(&block, None, &flags));
	assert!(!is_visible(&block, Some(&json!({})), &flags));
}

#[test]
fn conditions_are_ignored_without_data() {
	let block = text_block("blk-1", "hello").with_condition(BlockCondition::FieldHasValue {
		path: "patient.name".to_string(),
	});
	let flags = FlagTable::default();

	assert!(is_visible(&block, None, &flags));
	assert!(!is_visible(&block, Some(&json!({})), &flags));
}

#[test]
fn compile_wraps_fragments_in_document_order() {
	let blocks = vec![
		TemplateBlock::new(
			"blk-header",
			Some("检验报告"),
			BlockKind::Header {
				show_barcode: true,
				show_qr: false,
			},
		),
		text_block("blk-text", "说明"),
		TemplateBlock::new(
			"blk-footer",
			None,
			BlockKind::Footer {
				note: String::new(),
				show_generated_at: true,
			},
		),
	];

	insta::assert_snapshot!(compile(&blocks, None), @r#"
	<div class="report-sheet">
	<header class="report-header"><div class="report-brand"><div class="report-org">{{org.name}}</div><div class="report-org-sub">{{org.address}} · {{org.phone}}</div></div><div class="report-title">检验报告</div><div class="report-codes"><svg data-barcode></svg></div></header>
	<section class="report-section"><div class="report-text">说明</div></section>
	<footer class="report-footer"><div class="report-generated">报告生成时间: {{meta.generatedAt}}</div><div class="report-note">报告仅供临床参考，请结合患者情况综合判断。</div></footer>
	</div>
	"#);
}

#[test]
fn compile_empty_list_is_just_the_wrapper() {
	assert_eq!(compile(&[], None), "<div class=\"report-sheet\">\n</div>");
}

#[test]
fn compile_is_deterministic() {
	let template = default_template();
	let data = enrich(&standard_data());

	assert_eq!(
		compile(&template.blocks, Some(data.as_value())),
		compile(&template.blocks, Some(data.as_value()))
	);
	assert_eq!(compile(&template.blocks, None), template.html);
}

#[test]
fn info_block_renders_a_grid_of_placeholders() {
	assert_eq!(
		render_block(&info_block()),
		"<section class=\"report-section\"><div class=\"section-title\">患者信息</div><div \
		 class=\"info-grid\" style=\"grid-template-columns: repeat(2, minmax(0, \
		 1fr));\"><div><span>姓名</span>{{patient.name}}</div></div></section>"
	);
}

#[test]
fn results_block_repeats_one_row_per_result() {
	assert_eq!(
		render_block(&results_block()),
		"<section class=\"report-section\"><div class=\"section-title\">检验结果</div><table \
		 class=\"result-table\"><thead><tr><th \
		 style=\"text-align:center\">结果</th></tr></thead><tbody>{{#results}}<tr><td \
		 class=\"{{flagClass}}\" \
		 style=\"text-align:center\">{{value}}</td></tr>{{/results}}</tbody></table></section>"
	);
}

#[test]
fn info_grid_columns_are_clamped() {
	let block = TemplateBlock::new(
		"blk-info",
		None,
		BlockKind::Info {
			columns: 9,
			fields: Vec::new(),
		},
	);

	assert!(render_block(&block).contains("repeat(4, minmax(0, 1fr))"));
}

#[test]
fn user_text_cannot_inject_markup_or_placeholders() {
	let block = TemplateBlock::new(
		"blk-info",
		Some("<b>标题</b>"),
		BlockKind::Info {
			columns: 1,
			fields: vec![InfoField::new("{{patient.idNo}}", "patient.{{name}}")],
		},
	);
	let fragment = render_block(&block);

	assert!(fragment.contains("&lt;b&gt;标题&lt;/b&gt;"));
	assert!(fragment.contains(
		"<span>&#123;&#123;patient.idNo&#125;&#125;</span>{{patient.name}}"
	));
	assert!(!fragment.contains("{{patient.idNo}}"));

	let text = render_block(&text_block("blk-text", "机构: {{{org.name}}} {{#results}}"));
	assert!(!text.contains('{'));
	assert!(text.contains(
		"机构: &#123;&#123;&#123;org.name&#125;&#125;&#125; &#123;&#123;#results&#125;&#125;"
	));
}

#[rstest]
#[case::url("https://example.com/logo.png", Some("https://example.com/logo.png"))]
#[case::upper_url("HTTP://EXAMPLE.COM/A.PNG", Some("HTTP://EXAMPLE.COM/A.PNG"))]
#[case::data_uri("data:image/png;base64,AAAA", Some("data:image/png;base64,AAAA"))]
#[case::absolute("/static/logo.png", Some("/static/logo.png"))]
#[case::data_path("org.logo", Some("{{org.logo}}"))]
#[case::bare_file("logo.png", Some("{{logo.png}}"))]
#[case::blank("   ", None)]
fn image_sources(#[case] src_path: &str, #[case] expected: Option<&str>) {
	assert_eq!(image_source(src_path).as_deref(), expected);
}

#[test]
fn image_block_without_source_renders_placeholder() {
	let block = TemplateBlock::new(
		"blk-image",
		None,
		BlockKind::Image {
			src_path: String::new(),
			alt: String::new(),
			width: Some("96px".to_string()),
			height: None,
			radius: None,
			caption: Some("示例医院".to_string()),
		},
	);

	assert_eq!(
		render_block(&block),
		"<section class=\"report-section\"><div class=\"report-image\"><div \
		 class=\"report-image-placeholder\">暂无图片</div><div \
		 class=\"report-image-caption\">示例医院</div></div></section>"
	);
}

#[test]
fn image_block_applies_dimensions() {
	let block = TemplateBlock::normalize(&json!({
		"type": "image",
		"srcPath": "https://example.com/logo.png",
		"width": "96px",
		"radius": "18px",
	}));

	assert!(render_block(&block).contains(
		"<img src=\"https://example.com/logo.png\" alt=\"图片\" \
		 style=\"width:96px;border-radius:18px\" />"
	));
}

#[test]
fn cards_block_prefers_icon_url_over_inline_graphic() {
	let fragment = render_block(&TemplateBlock::create_default(BlockType::Cards));

	assert!(fragment.contains("{{#summaryCards}}"));
	assert!(fragment.contains(
		"{{#iconUrl}}<img src=\"{{iconUrl}}\" alt=\"{{iconAlt}}\" \
		 />{{/iconUrl}}{{^iconUrl}}{{{iconSvg}}}{{/iconUrl}}"
	));
	assert!(fragment.ends_with("{{/summaryCards}}</div></section>"));
}

#[test]
fn code_block_defaults_its_label() {
	let block = TemplateBlock::normalize(&json!({ "type": "code", "showQr": true }));

	assert_eq!(
		render_block(&block),
		"<section class=\"report-section\"><div class=\"section-title\">条码信息</div><div \
		 class=\"report-codes horizontal\"><img data-qr alt=\"二维码\" /></div></section>"
	);
}

#[test]
fn map_raw_to_standard_copies_mapped_fields() {
	let data = standard_data();

	assert_eq!(data.patient["name"], json!("张三"));
	assert_eq!(data.patient["gender"], json!("男"));
	assert_eq!(data.patient["age"], json!(45));
	assert_eq!(data.order["reportNo"], json!("R20260205001"));
	assert_eq!(data.doctor["auditor"], json!("王审核"));
	assert_eq!(data.source["system"], json!("LIS"));
	assert_eq!(data.results.len(), 3);
	assert_eq!(data.results[0], ResultRow {
		item_name: json!("WBC"),
		value: json!(6.5),
		unit: json!("10^9/L"),
		ref_range: json!("3.5-9.5"),
		flag: json!(""),
	});
}

#[test]
fn absent_sources_keep_schema_defaults() {
	let data = map_raw_to_standard(
		&json!({ "patientInfo": { "name": "张三" } }),
		&default_field_mappings(),
		DEFAULT_RESULT_ARRAY_PATH,
		&default_result_mappings(),
		&serde_json::Map::new(),
	);

	assert_eq!(data.patient["name"], json!("张三"));
	assert_eq!(data.patient["gender"], json!(""));
	assert_eq!(data.order["sampleTime"], json!(""));
	assert!(data.results.is_empty());
}

#[test]
fn unmatched_result_keys_default_to_empty() {
	let data = map_raw_to_standard(
		&json!({ "payload": { "items": [{ "name": "WBC" }, "skip"] } }),
		&[],
		"payload.items",
		&[ResultItemMapping::new(ResultField::ItemName, "name")],
		&serde_json::Map::new(),
	);

	assert_eq!(data.results, vec![
		ResultRow::new("WBC", "", "", "", ""),
		ResultRow::default(),
	]);
}

#[test]
fn mappings_can_target_keys_outside_the_schema() {
	let data = map_raw_to_standard(
		&json!({ "specimen": "痰液" }),
		&[FieldMapping::new("specimen", "order.specimenType")],
		DEFAULT_RESULT_ARRAY_PATH,
		&[],
		&serde_json::Map::new(),
	);

	assert_eq!(data.order["specimenType"], json!("痰液"));
	assert_eq!(data.order["reportNo"], json!(""));
}

#[test]
fn standard_fields_all_exist_in_the_default_schema() {
	let defaults = StandardReportData::default().to_value();
	for field in STANDARD_FIELDS {
		assert_eq!(get_path(&defaults, field.path), Some(&json!("")), "{}", field.label);
	}

	let data = map_raw_to_standard(
		&raw_input(),
		&default_field_mappings(),
		DEFAULT_RESULT_ARRAY_PATH,
		&default_result_mappings(),
		&serde_json::Map::new(),
	);
	assert_eq!(data.text("patient.name"), "张三");
	assert_eq!(data.text("patient.missing"), "");

	let labels: Vec<&str> = ResultField::ALL.iter().map(|field| field.label()).collect();
	assert_eq!(labels, vec!["项目名称", "结果值", "单位", "参考范围", "结果提示"]);
}

#[test]
fn unresolved_result_array_keeps_existing_results() {
	let raw = json!({
		"seed": [{ "itemName": "WBC", "value": "6.5", "unit": "10^9/L", "refRange": "3.5-9.5", "flag": "" }],
		"payload": { "items": "not a sequence" },
	});

	for result_array_path in ["payload.items", "missing.rows"] {
		let data = map_raw_to_standard(
			&raw,
			&[FieldMapping::new("seed", "results")],
			result_array_path,
			&default_result_mappings(),
			&serde_json::Map::new(),
		);

		assert_eq!(
			data.results,
			vec![ResultRow::new("WBC", "6.5", "10^9/L", "3.5-9.5", "")],
			"result array path: {result_array_path}"
		);
	}
}

#[test]
fn mappings_into_extension_groups_are_kept() {
	let data = map_raw_to_standard(
		&json!({ "dr": "INH-R", "cards": [{ "title": "结论" }] }),
		&[
			FieldMapping::new("dr", "resistanceResults.summary"),
			FieldMapping::new("cards", "summaryCards"),
		],
		DEFAULT_RESULT_ARRAY_PATH,
		&[],
		&serde_json::Map::new(),
	);

	assert_eq!(data.resistance_results, None);
	assert_eq!(
		data.extra.get("resistanceResults"),
		Some(&json!({ "summary": "INH-R" }))
	);
	assert_eq!(data.summary_cards, Some(vec![json!({ "title": "结论" })]));

	let value = data.to_value();
	assert_eq!(
		get_path(&value, "resistanceResults.summary"),
		Some(&json!("INH-R"))
	);
	assert_eq!(StandardReportData::from_value(value), data);
}

#[test]
fn org_overrides_are_merged() {
	let mut org = serde_json::Map::new();
	org.insert("name".to_string(), json!("示例医院"));
	let data = map_raw_to_standard(
		&raw_input(),
		&default_field_mappings(),
		DEFAULT_RESULT_ARRAY_PATH,
		&default_result_mappings(),
		&org,
	);

	assert_eq!(data.org["name"], json!("示例医院"));
	assert_eq!(data.org["phone"], json!(""));
}

#[test]
fn standard_data_deserialization_is_lenient() -> AnyEmptyResult {
	let data: StandardReportData = serde_json::from_str(
		r#"{ "patient": "oops", "results": [{ "itemName": "WBC", "extra": 1 }], "custom": true }"#,
	)?;

	assert_eq!(data.patient["name"], json!(""));
	assert_eq!(data.results, vec![ResultRow::new("WBC", "", "", "", "")]);
	assert_eq!(data.extra.get("custom"), Some(&json!(true)));

	Ok(())
}

#[test]
fn session_keeps_data_when_raw_input_fails_to_parse() {
	let mut session = MappingSession::default();
	session.apply(&raw_input());
	let before = session.data().clone();

	let error = session.apply_raw_input("{ \"patientInfo\": ");
	let Err(LabrepError::RawInputParse { line, .. }) = error else {
		panic!("expected a parse error, got {error:?}");
	};
	assert_eq!(line, 1);
	assert_eq!(session.data(), &before);
}

#[test]
fn session_updates_org_and_resets_mappings() -> LabrepResult<()> {
	let mut session = MappingSession::default();
	session.config_mut().field_mappings.clear();
	session.apply_raw_input(r#"{ "patientInfo": { "name": "张三" } }"#)?;
	assert_eq!(session.data().patient["name"], json!(""));

	assert_eq!(session.data().org["name"], json!("示例医院"));
	assert_eq!(session.data().org["phone"], json!("010-88888888"));

	let mut org = serde_json::Map::new();
	org.insert("name".to_string(), json!("东方医院"));
	session.update_org(&org);
	assert_eq!(session.data().org["name"], json!("东方医院"));

	session.reset_mappings();
	assert_eq!(session.config(), &MappingConfig::default());
	session.apply_raw_input(r#"{ "patientInfo": { "name": "张三" } }"#)?;
	assert_eq!(session.data().patient["name"], json!("张三"));
	assert_eq!(session.data().org["name"], json!("东方医院"));
	assert_eq!(session.data().org["address"], json!("示例市示例区示例路 88 号"));

	Ok(())
}

#[rstest]
#[case::iso("2026-02-05T08:30:00", "2026-02-05 08:30")]
#[case::seconds("2026-02-05 10:15:42", "2026-02-05 10:15")]
#[case::offset("2026-02-05T08:30:00+08:00", "2026-02-05 08:30")]
#[case::date_only("2026/02/05", "2026-02-05 00:00")]
#[case::unparsable("明天上午", "明天上午")]
#[case::empty("", "")]
fn format_dates(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(format_date(input), expected);
}

#[test]
fn enrich_derives_flag_labels_and_classes() {
	let mut data = standard_data();
	data.results.push(ResultRow::new("CRP", "12", "mg/L", "0-10", "X"));
	let snapshot = Enricher::default().enrich_at(&data, generated_at());
	let rows: Vec<(&str, &str)> = snapshot["results"]
		.as_array()
		.into_iter()
		.flatten()
		.map(|row| {
			(
				row["flagLabel"].as_str().unwrap_or_default(),
				row["flagClass"].as_str().unwrap_or_default(),
			)
		})
		.collect();

	assert_eq!(rows, vec![
		("", ""),
		("偏高", "flag-high"),
		("偏低", "flag-low"),
		("X", "flag-custom"),
	]);
}

#[test]
fn enrich_formats_dates_and_stamps_generation_time() {
	let mut data = standard_data();
	data.extra.insert("meta".to_string(), json!({ "source": "lis" }));
	let snapshot = Enricher::default().enrich_at(&data, generated_at());

	assert_eq!(snapshot["order"]["sampleTime"], json!("2026-02-05 08:30"));
	assert_eq!(snapshot["order"]["reportTime"], json!("2026-02-05 10:15"));
	assert_eq!(snapshot["meta"]["generatedAt"], json!("2026-02-05 11:00"));
	assert_eq!(snapshot["meta"]["source"], json!("lis"));
	assert_eq!(snapshot["summaryCards"], json!([]));
	assert_eq!(snapshot["resistanceResults"], json!([]));
	assert_eq!(snapshot["hivResistanceResults"], json!([]));
}

#[test]
fn enrich_paints_summary_cards() {
	let mut data = standard_data();
	data.summary_cards = Some(vec![
		json!({ "title": "结核分枝杆菌", "value": "阳性", "tone": "rose", "iconKey": "bacteria" }),
		json!({ "title": "利福平", "value": "敏感", "tone": "violet", "iconUrl": "https://example.com/i.png" }),
		json!({ "value": "无" }),
	]);
	let palette = CardPalette::default();
	let snapshot = Enricher::default().enrich_at(&data, generated_at());
	let cards = &snapshot["summaryCards"];

	let (_, rose) = palette.resolve(Some("rose"));
	assert_eq!(cards[0]["tone"], json!("rose"));
	assert_eq!(cards[0]["bgColor"], json!(rose.bg));
	assert_eq!(cards[0]["borderColor"], json!(rose.border));
	assert_eq!(
		cards[0]["iconSvg"],
		json!(IconSet::default().build(Some("bacteria"), &rose.icon))
	);
	assert_eq!(cards[0]["iconUrl"], json!(""));
	assert_eq!(cards[0]["iconAlt"], json!("结核分枝杆菌"));

	assert_eq!(cards[1]["tone"], json!(DEFAULT_TONE));
	assert_eq!(cards[1]["iconUrl"], json!("https://example.com/i.png"));
	assert_eq!(cards[2]["iconAlt"], json!("图标"));
}

#[test]
fn injected_tables_change_enrichment() {
	let flags = FlagTable::default().with_entry(FlagEntry::new(
		"H",
		"升高",
		"flag-up",
		FlagLevel::Warning,
	));
	let enricher = Enricher::new(flags, CardPalette::default(), IconSet::default());
	let snapshot = enricher.enrich_at(&standard_data(), generated_at());

	assert_eq!(snapshot["results"][1]["flagLabel"], json!("升高"));
	assert_eq!(snapshot["results"][1]["flagClass"], json!("flag-up"));
}

#[test]
fn validate_reports_missing_fields() {
	let issues = validate_report(&StandardReportData::default());
	let summary: Vec<(&str, bool)> = issues
		.iter()
		.map(|issue| (issue.id.as_str(), issue.is_error()))
		.collect();

	assert_eq!(summary, vec![
		("patient.name", true),
		("order.reportNo", false),
		("order.sampleTime", false),
		("results", true),
	]);
	assert!(validate_report(&standard_data()).is_empty());
}

#[test]
fn template_normalize_fills_defaults() {
	let template = TemplateItem::normalize(&json!({ "name": "", "blocks": [] }));
	let fallback = default_template();

	assert_eq!(template.name, "未命名模板");
	assert_eq!(template.version, "v1.0");
	assert_eq!(template.mode, TemplateMode::Structured);
	assert_eq!(template.blocks, fallback.blocks);
	assert_eq!(template.html, fallback.html);
	assert_eq!(TemplateItem::normalize(&json!(null)).id, DEFAULT_TEMPLATE_ID);
}

#[test]
fn template_editing_operations() {
	let mut template = default_template();
	let compiler = Compiler::default();
	assert!(!template.is_stale(&compiler));

	let added = template.add_block(BlockType::Text, Some(0));
	assert_eq!(template.blocks[0].id, added);
	assert!(template.is_stale(&compiler));

	assert!(template.move_block(&added, "blk-results"));
	assert_eq!(template.blocks[4].id, added);
	assert_eq!(template.blocks[3].id, "blk-results");
	assert!(template.move_block_to_end(&added));
	assert_eq!(template.blocks[template.blocks.len() - 1].id, added);

	assert!(template.update_block(&added, &json!({ "text": "补充说明" })));
	assert_eq!(
		template.block(&added).map(|block| &block.kind),
		Some(&BlockKind::Text {
			text: "补充说明".to_string()
		})
	);

	let copy = template.duplicate_block(&added);
	assert!(copy.as_deref().is_some_and(|id| id != added));
	assert!(template.remove_block(&added));
	assert!(!template.remove_block(&added));
	assert!(!template.update_block("missing", &json!({})));

	template.save(&compiler);
	assert!(!template.is_stale(&compiler));
}

#[test]
fn resolve_effective_honours_the_mode() {
	let mut template = default_template();
	let compiled = compile(&template.blocks, None);
	template.set_html("<p>自定义</p>");

	assert_eq!(resolve_effective(&template, None, None), compiled);
	assert_eq!(
		resolve_effective(&template, None, Some(TemplateMode::Html)),
		"<p>自定义</p>"
	);

	template.mode = TemplateMode::Html;
	assert_eq!(resolve_effective(&template, None, None), "<p>自定义</p>");

	template.html = String::new();
	assert_eq!(resolve_effective(&template, None, None), compiled);
}

#[test]
fn duplicated_template_is_a_new_version() {
	let template = default_template();
	let copy = template.duplicate("v2.0");

	assert_ne!(copy.id, template.id);
	assert_eq!(copy.version, "v2.0");
	assert_eq!(copy.blocks, template.blocks);
	assert_eq!(template_summary(&copy)["blocks"], json!(template.blocks.len()));
}

#[test]
fn presets_are_precompiled() -> LabrepResult<()> {
	let compiler = Compiler::default();
	for preset in presets() {
		assert!(!preset.is_stale(&compiler), "stale preset {}", preset.id);
		assert_eq!(find_preset(&preset.id)?, preset);
	}

	assert_eq!(find_preset(DEFAULT_TEMPLATE_ID)?.name, "标准检验报告");
	assert!(matches!(
		find_preset("tpl-missing"),
		Err(LabrepError::UnknownPreset(_))
	));

	Ok(())
}

#[test]
fn hiv_preset_shows_literal_logo_or_placeholder() -> LabrepResult<()> {
	let preset = find_preset("tpl-hiv-001")?;

	assert!(preset.html.contains("<img src=\"{{org.logo}}\" alt=\"机构标识\""));
	assert!(preset.html.contains("{{#hivResistanceResults}}"));

	Ok(())
}

#[test]
fn config_merges_tables_over_defaults() -> LabrepResult<()> {
	let config = LabrepConfig::parse(
		r##"
[mapping]
resultArrayPath = "payload.items"

[[mapping.resultMappings]]
targetKey = "itemName"
sourceKey = "name"

[org]
name = "示例医院"

[[flags]]
code = "P"
label = "阳性"
class = "flag-positive"
level = "critical"

[palette.indigo]
bg = "#e0e7ff"
border = "#a5b4fc"
icon = "#6366f1"
"##,
	)?;

	assert_eq!(config.mapping.result_array_path, "payload.items");
	assert_eq!(config.mapping.field_mappings, default_field_mappings());
	assert_eq!(config.mapping.result_mappings, vec![ResultItemMapping::new(
		ResultField::ItemName,
		"name"
	)]);

	let flags = config.flag_table();
	assert_eq!(flags.meta("P").label, "阳性");
	assert_eq!(flags.meta("H").label, "偏高");
	assert_eq!(config.card_palette().resolve(Some("indigo")).0, "indigo");

	let mut session = config.session();
	session.apply(&json!({ "payload": { "items": [{ "name": "抗体" }] } }));
	assert_eq!(session.data().org["name"], json!("示例医院"));
	assert_eq!(session.data().results[0].item_name, json!("抗体"));

	Ok(())
}

#[test]
fn config_parse_errors_are_reported() {
	let result = LabrepConfig::parse("[mapping\n");

	assert!(matches!(result, Err(LabrepError::ConfigParse(_))));
}

#[test]
fn config_is_discovered_in_candidate_order() -> LabrepResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	assert!(LabrepConfig::load(tmp.path())?.is_none());

	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(
		tmp.path().join(".config/labrep.toml"),
		"[org]\nname = \"low\"\n",
	)?;
	std::fs::write(tmp.path().join(".labrep.toml"), "[org]\nname = \"high\"\n")?;

	let config = LabrepConfig::load(tmp.path())?.unwrap_or_default();
	assert_eq!(config.org.get("name"), Some(&json!("high")));

	Ok(())
}

#[rstest]
#[case::json("raw.json", r#"{ "patientInfo": { "name": "张三" } }"#)]
#[case::yaml("raw.yaml", "patientInfo:\n  name: 张三\n")]
#[case::toml("raw.toml", "[patientInfo]\nname = \"张三\"\n")]
fn data_files_load_by_extension(#[case] name: &str, #[case] content: &str) -> LabrepResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let path = tmp.path().join(name);
	std::fs::write(&path, content)?;

	let value = load_data_file(&path)?;
	assert_eq!(get_path(&value, "patientInfo.name"), Some(&json!("张三")));

	Ok(())
}

#[test]
fn unsupported_data_files_are_rejected() {
	let result = parse_data_file("a=1", "ini", "raw.ini");
	assert!(matches!(result, Err(LabrepError::UnsupportedDataFormat(format)) if format == "ini"));

	let result = parse_data_file("{", "json", "raw.json");
	assert!(matches!(result, Err(LabrepError::DataFile { .. })));
}

#[rstest]
#[case::json("template.json")]
#[case::toml("template.toml")]
#[case::yaml("template.yml")]
fn templates_are_written_back_in_their_own_format(#[case] name: &str) -> LabrepResult<()> {
	let tmp = tempfile::tempdir()?;
	let path = tmp.path().join(name);
	let template = default_template();
	write_data_file(&path, &template.to_value())?;

	assert_eq!(TemplateItem::normalize(&load_data_file(&path)?), template);

	Ok(())
}

#[test]
fn toml_output_leaves_out_nulls() -> LabrepResult<()> {
	let value = json!({ "name": "张三", "nickname": null, "tags": ["a", null] });
	let content = format_data_file(&value, "toml", "data.toml")?;

	assert_eq!(
		parse_data_file(&content, "toml", "data.toml")?,
		json!({ "name": "张三", "tags": ["a"] })
	);
	assert!(matches!(
		format_data_file(&value, "ini", "data.ini"),
		Err(LabrepError::UnsupportedDataFormat(_))
	));

	Ok(())
}

#[tracing_test::traced_test]
#[test]
fn unknown_block_types_are_logged() {
	let _ = TemplateBlock::normalize(&json!({ "type": "chart" }));

	assert!(logs_contain("unrecognized block type"));
}
