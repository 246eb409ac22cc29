use serde_json::Value;

use crate::block::BlockKind;
use crate::block::InfoField;
use crate::block::ResultColumn;
use crate::block::TemplateBlock;
use crate::style::escape_html;
use crate::tables::FlagTable;

const BARCODE_MARKER: &str = "<svg data-barcode></svg>";
const QR_MARKER: &str = "<img data-qr alt=\"二维码\" />";
const DEFAULT_FOOTER_NOTE: &str = "报告仅供临床参考，请结合患者情况综合判断。";

/// Decide whether `block` is rendered.
///
/// Hidden blocks are never visible. Without a data snapshot every other
/// block is visible, which is how static placeholder templates are
/// produced. With data, the block's condition decides.
pub fn is_visible(block: &TemplateBlock, data: Option<&Value>, flags: &FlagTable) -> bool {
	if block.hidden {
		return false;
	}

	match data {
		None => true,
		Some(data) => block.condition.evaluate(data, flags),
	}
}

/// Compile `blocks` into a markup template using the default flag table.
pub fn compile(blocks: &[TemplateBlock], data: Option<&Value>) -> String {
	Compiler::default().compile(blocks, data)
}

/// Turns block lists into markup templates carrying mustache-style
/// placeholders:
///
/// - `{{path}}` scalar substitution
/// - `{{#path}}...{{/path}}` repeated section
/// - `{{^path}}...{{/path}}` inverted section
/// - `{{{path}}}` unescaped substitution, only for pre-built inline graphics
///
/// Compilation is a pure function of the blocks and optional data: equal
/// inputs always give byte-identical output.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
	flags: FlagTable,
}

impl Compiler {
	pub fn new(flags: FlagTable) -> Self {
		Self { flags }
	}

	pub fn is_visible(&self, block: &TemplateBlock, data: Option<&Value>) -> bool {
		is_visible(block, data, &self.flags)
	}

	/// Render every visible block in list order inside the document wrapper.
	pub fn compile(&self, blocks: &[TemplateBlock], data: Option<&Value>) -> String {
		let mut body = String::new();
		let mut rendered = 0usize;

		for block in blocks.iter().filter(|block| self.is_visible(block, data)) {
			body.push_str(&render_block(block));
			body.push('\n');
			rendered += 1;
		}

		tracing::debug!(
			total = blocks.len(),
			rendered,
			with_data = data.is_some(),
			"compiled template blocks"
		);

		format!("<div class=\"report-sheet\">\n{body}</div>")
	}
}

/// Render a single block into its markup fragment.
pub fn render_block(block: &TemplateBlock) -> String {
	let style = block.style.to_attribute();
	let title = block.title.as_deref().filter(|title| !title.is_empty());

	match &block.kind {
		BlockKind::Header {
			show_barcode,
			show_qr,
		} => render_header(title, &style, *show_barcode, *show_qr),
		BlockKind::Info { columns, fields } => render_info(title, &style, *columns, fields),
		BlockKind::Results { columns, data_path } => {
			render_results(title, &style, columns, data_path)
		}
		BlockKind::Cards { data_path, columns } => render_cards(title, &style, data_path, *columns),
		BlockKind::Image {
			src_path,
			alt,
			width,
			height,
			radius,
			caption,
		} => {
			let dimensions = ImageDimensions {
				width: width.as_deref(),
				height: height.as_deref(),
				radius: radius.as_deref(),
			};
			render_image(title, &style, src_path, alt, &dimensions, caption.as_deref())
		}
		BlockKind::Text { text } => {
			format!(
				"<section class=\"report-section\"{style}><div class=\"report-text\">{}</div></section>",
				escape_html(text)
			)
		}
		BlockKind::Code {
			label,
			show_barcode,
			show_qr,
		} => {
			let label = label.as_deref().filter(|label| !label.is_empty());
			format!(
				"<section class=\"report-section\"{style}><div class=\"section-title\">{}</div><div \
				 class=\"report-codes horizontal\">{}</div></section>",
				escape_html(label.unwrap_or("条码信息")),
				code_markers(*show_barcode, *show_qr)
			)
		}
		BlockKind::Footer {
			note,
			show_generated_at,
		} => {
			let note = if note.is_empty() {
				DEFAULT_FOOTER_NOTE
			} else {
				note
			};
			let generated = if *show_generated_at {
				format!(
					"<div class=\"report-generated\">报告生成时间: {}</div>",
					variable("meta.generatedAt")
				)
			} else {
				String::new()
			};
			format!(
				"<footer class=\"report-footer\"{style}>{generated}<div \
				 class=\"report-note\">{}</div></footer>",
				escape_html(note)
			)
		}
	}
}

fn render_header(title: Option<&str>, style: &str, show_barcode: bool, show_qr: bool) -> String {
	let codes = if show_barcode || show_qr {
		format!(
			"<div class=\"report-codes\">{}</div>",
			code_markers(show_barcode, show_qr)
		)
	} else {
		String::new()
	};

	format!(
		"<header class=\"report-header\"{style}><div class=\"report-brand\"><div \
		 class=\"report-org\">{}</div><div class=\"report-org-sub\">{} · {}</div></div><div \
		 class=\"report-title\">{}</div>{codes}</header>",
		variable("org.name"),
		variable("org.address"),
		variable("org.phone"),
		escape_html(title.unwrap_or("检验报告")),
	)
}

fn render_info(title: Option<&str>, style: &str, columns: u32, fields: &[InfoField]) -> String {
	let mut cells = String::new();
	for field in fields {
		cells.push_str(&format!(
			"<div><span>{}</span>{}</div>",
			escape_html(&field.label),
			variable(&field.path)
		));
	}

	format!(
		"<section class=\"report-section\"{style}><div class=\"section-title\">{}</div>{}{cells}</div></section>",
		escape_html(title.unwrap_or("信息")),
		grid_open("info-grid", columns),
	)
}

fn render_results(
	title: Option<&str>,
	style: &str,
	columns: &[ResultColumn],
	data_path: &str,
) -> String {
	let data_path = section_path(data_path, crate::block::DEFAULT_RESULTS_PATH);
	let mut head = String::new();
	let mut row = String::new();

	for column in columns {
		let attribute = column_attribute(column);
		head.push_str(&format!("<th{attribute}>{}</th>", escape_html(&column.label)));
		row.push_str(&format!(
			"<td class=\"{}\"{attribute}>{}</td>",
			variable("flagClass"),
			variable(&column.key)
		));
	}

	format!(
		"<section class=\"report-section\"{style}><div class=\"section-title\">{}</div><table \
		 class=\"result-table\"><thead><tr>{head}</tr></thead><tbody>{}<tr>{row}</tr>{}</tbody></\
		 table></section>",
		escape_html(title.unwrap_or("检验结果")),
		section_open(&data_path),
		section_close(&data_path),
	)
}

fn render_cards(title: Option<&str>, style: &str, data_path: &str, columns: u32) -> String {
	let data_path = section_path(data_path, crate::block::DEFAULT_CARDS_PATH);
	let icon = format!(
		"{}<img src=\"{}\" alt=\"{}\" />{}{}{}{}",
		section_open("iconUrl"),
		variable("iconUrl"),
		variable("iconAlt"),
		section_close("iconUrl"),
		inverted_open("iconUrl"),
		raw_variable("iconSvg"),
		section_close("iconUrl"),
	);

	format!(
		"<section class=\"report-section\"{style}><div class=\"section-title\">{}</div>{}{}<div \
		 class=\"report-card\" style=\"background: {}; border-color: {};\"><div \
		 class=\"report-card-icon\">{icon}</div><div class=\"report-card-label\">{}</div><div \
		 class=\"report-card-value\">{}</div></div>{}</div></section>",
		escape_html(title.unwrap_or("结果综述")),
		grid_open("report-cards", columns),
		section_open(&data_path),
		variable("bgColor"),
		variable("borderColor"),
		variable("title"),
		variable("value"),
		section_close(&data_path),
	)
}

/// Inline dimensions applied to the `<img>` element itself.
struct ImageDimensions<'a> {
	width: Option<&'a str>,
	height: Option<&'a str>,
	radius: Option<&'a str>,
}

fn render_image(
	title: Option<&str>,
	style: &str,
	src_path: &str,
	alt: &str,
	dimensions: &ImageDimensions<'_>,
	caption: Option<&str>,
) -> String {
	let heading = title.map_or_else(String::new, |title| {
		format!("<div class=\"section-title\">{}</div>", escape_html(title))
	});

	let image = match image_source(src_path) {
		Some(src) => {
			let rules: Vec<String> = [
				("width", dimensions.width),
				("height", dimensions.height),
				("border-radius", dimensions.radius),
			]
			.into_iter()
			.filter_map(|(property, value)| {
				value.map(|value| format!("{property}:{}", escape_html(value)))
			})
			.collect();
			let image_style = style_attribute(&rules);
			let alt = if alt.is_empty() { "图片" } else { alt };
			format!(
				"<img src=\"{src}\" alt=\"{}\"{image_style} />",
				escape_html(alt)
			)
		}
		None => "<div class=\"report-image-placeholder\">暂无图片</div>".to_string(),
	};

	let caption = caption.map_or_else(String::new, |caption| {
		format!(
			"<div class=\"report-image-caption\">{}</div>",
			escape_html(caption)
		)
	});

	format!(
		"<section class=\"report-section\"{style}>{heading}<div \
		 class=\"report-image\">{image}{caption}</div></section>"
	)
}

/// Resolve an image `srcPath` once at compile time. Literal references are
/// inlined (escaped) so later substitution leaves them alone; anything else
/// is treated as a data path. Returns `None` for an empty path.
pub fn image_source(src_path: &str) -> Option<String> {
	let src_path = src_path.trim();
	if src_path.is_empty() {
		return None;
	}

	if is_literal_reference(src_path) {
		Some(escape_html(src_path))
	} else {
		Some(variable(src_path))
	}
}

/// Heuristic for values that already reference an image: `http(s)://` and
/// `data:` URIs (case-insensitive) and absolute paths starting with `/`.
/// A bare file name such as `logo.png` is not a literal reference.
pub fn is_literal_reference(value: &str) -> bool {
	let lower = value.to_ascii_lowercase();
	lower.starts_with("http://")
		|| lower.starts_with("https://")
		|| lower.starts_with("data:")
		|| value.starts_with('/')
}

fn code_markers(show_barcode: bool, show_qr: bool) -> String {
	let mut markers = String::new();
	if show_barcode {
		markers.push_str(BARCODE_MARKER);
	}
	if show_qr {
		markers.push_str(QR_MARKER);
	}
	markers
}

fn grid_open(class: &str, columns: u32) -> String {
	format!(
		"<div class=\"{class}\" style=\"grid-template-columns: repeat({}, minmax(0, 1fr));\">",
		columns.clamp(1, 4)
	)
}

fn column_attribute(column: &ResultColumn) -> String {
	let mut rules = Vec::new();
	if let Some(align) = column.align {
		rules.push(format!("text-align:{}", align.as_str()));
	}
	if let Some(width) = &column.width {
		rules.push(format!("width:{}", escape_html(width)));
	}
	style_attribute(&rules)
}

fn style_attribute(rules: &[String]) -> String {
	if rules.is_empty() {
		String::new()
	} else {
		format!(" style=\"{}\"", rules.join(";"))
	}
}

fn section_path(path: &str, fallback: &str) -> String {
	let path = path.trim();
	if path.is_empty() {
		fallback.to_string()
	} else {
		path.to_string()
	}
}

/// Strip characters that would break the placeholder grammar and escape
/// the rest.
fn placeholder_path(path: &str) -> String {
	let cleaned: String = path
		.trim()
		.chars()
		.filter(|ch| !matches!(ch, '{' | '}' | '#' | '^' | '/'))
		.collect();
	escape_html(&cleaned)
}

fn variable(path: &str) -> String {
	["{{", &placeholder_path(path), "}}"].concat()
}

fn raw_variable(path: &str) -> String {
	["{{{", &placeholder_path(path), "}}}"].concat()
}

fn section_open(path: &str) -> String {
	["{{#", &placeholder_path(path), "}}"].concat()
}

fn inverted_open(path: &str) -> String {
	["{{^", &placeholder_path(path), "}}"].concat()
}

fn section_close(path: &str) -> String {
	["{{/", &placeholder_path(path), "}}"].concat()
}
