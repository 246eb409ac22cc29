use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use labrep_cli::Commands;
use labrep_cli::LabrepCli;
use labrep_core::LabrepConfig;
use labrep_core::LabrepError;
use labrep_core::StandardReportData;
use labrep_core::TemplateItem;
use labrep_core::TemplateMode;
use labrep_core::default_template;
use labrep_core::find_preset;
use labrep_core::load_data_file;
use labrep_core::presets;
use labrep_core::validate_report;
use labrep_core::write_data_file;
use owo_colors::OwoColorize;
use serde_json::Value;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = "# labrep configuration\n\n# Where result rows live in the raw \
                             input, and how each row maps onto the standard result \
                             keys.\n[mapping]\nresultArrayPath = \"results\"\n\n# Field \
                             mappings copy one raw value onto one standard field. When \
                             omitted the built-in mappings are used.\n# \
                             [[mapping.fieldMappings]]\n# sourcePath = \"patientInfo.name\"\n# \
                             targetPath = \"patient.name\"\n\n# Organisation fields merged \
                             into every report.\n[org]\nname = \"\"\naddress = \"\"\nphone = \
                             \"\"\n\n# Extra result flag codes.\n# [[flags]]\n# code = \
                             \"P\"\n# label = \"阳性\"\n# class = \"flag-positive\"\n# level = \
                             \"critical\"\n";

fn main() {
	let args = LabrepCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	let default_level = if args.verbose { "labrep_core=debug" } else { "labrep_core=warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.init();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Map { raw }) => run_map(&args, raw),
		Some(Commands::Enrich { standard }) => run_enrich(&args, standard),
		Some(Commands::Compile {
			template,
			data,
			mode,
		}) => {
			run_compile(
				&args,
				template,
				data.as_deref(),
				mode.map(TemplateMode::from),
			)
		}
		Some(Commands::Validate { standard }) => run_validate(standard),
		Some(Commands::Presets { id }) => run_presets(id.as_deref()),
		Some(Commands::Check { template, diff }) => run_check(&args, template, *diff),
		Some(Commands::Save { template }) => run_save(&args, template),
		None => {
			eprintln!("No subcommand specified. Run `labrep --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render through miette for error codes and help text.
		match e.downcast::<LabrepError>() {
			Ok(labrep_err) => {
				let report: miette::Report = (*labrep_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &LabrepCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &LabrepCli) -> Result<LabrepConfig, LabrepError> {
	let root = resolve_root(args);
	let config = LabrepConfig::load(&root)?;
	if args.verbose {
		match LabrepConfig::resolve_path(&root) {
			Some(path) => eprintln!("Using config: {}", path.display()),
			None => eprintln!("No labrep.toml found, using built-in defaults"),
		}
	}
	Ok(config.unwrap_or_default())
}

fn load_template(path: &Path) -> Result<TemplateItem, LabrepError> {
	Ok(TemplateItem::normalize(&load_data_file(path)?))
}

fn print_json(value: &impl serde::Serialize) -> CliResult {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn run_init(args: &LabrepCli) -> CliResult {
	let root = resolve_root(args);
	let config_path = root.join("labrep.toml");
	let template_path = root.join("template.json");

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
	} else {
		std::fs::write(&config_path, SAMPLE_CONFIG)?;
		println!("Created labrep.toml");
	}

	if template_path.exists() {
		println!("Template file already exists: {}", template_path.display());
	} else {
		let template = serde_json::to_string_pretty(&default_template())?;
		std::fs::write(&template_path, format!("{template}\n"))?;
		println!("Created template file: {}", template_path.display());
		println!();
		println!("Next steps:");
		println!("  1. Edit the [mapping] section of labrep.toml to match your raw input");
		println!("  2. Run `labrep map <raw.json>` to preview the standard report data");
		println!("  3. Run `labrep compile template.json` to print the template markup");
	}

	Ok(())
}

fn run_map(args: &LabrepCli, raw: &Path) -> CliResult {
	let config = load_config(args)?;
	let mut session = config.session();

	let is_json = raw
		.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| e.eq_ignore_ascii_case("json"));
	let data = if is_json {
		let text = std::fs::read_to_string(raw).map_err(|e| {
			LabrepError::DataFile {
				path: raw.display().to_string(),
				reason: e.to_string(),
			}
		})?;
		session.apply_raw_input(&text)?
	} else {
		session.apply(&load_data_file(raw)?)
	};

	print_json(data)
}

fn run_enrich(args: &LabrepCli, standard: &Path) -> CliResult {
	let config = load_config(args)?;
	let data = StandardReportData::from_value(load_data_file(standard)?);
	let snapshot = config.enricher().enrich(&data);

	print_json(&snapshot)
}

fn run_compile(
	args: &LabrepCli,
	template: &Path,
	data: Option<&Path>,
	mode: Option<TemplateMode>,
) -> CliResult {
	let config = load_config(args)?;
	let template = load_template(template)?;
	let data: Option<Value> = data.map(load_data_file).transpose()?;
	let markup = template.resolve_effective(&config.compiler(), data.as_ref(), mode);

	println!("{markup}");
	Ok(())
}

fn run_validate(standard: &Path) -> CliResult {
	let data = StandardReportData::from_value(load_data_file(standard)?);
	let issues = validate_report(&data);

	if issues.is_empty() {
		println!("{}", colored!("Report data is complete.", green));
		return Ok(());
	}

	for issue in &issues {
		let level = if issue.is_error() {
			colored!("error", red)
		} else {
			colored!("warning", yellow)
		};
		println!("{level} {}: {}", issue.id, issue.message);
	}

	let errors = issues.iter().filter(|issue| issue.is_error()).count();
	println!(
		"\n{} error(s), {} warning(s)",
		errors,
		issues.len() - errors
	);

	if errors > 0 {
		process::exit(1);
	}

	Ok(())
}

fn run_presets(id: Option<&str>) -> CliResult {
	if let Some(id) = id {
		return print_json(&find_preset(id)?);
	}

	let mut templates = vec![default_template()];
	templates.extend(presets());
	for template in &templates {
		println!(
			"{:<18} {} {} ({} blocks)",
			colored!(template.id, bold),
			template.name,
			template.version,
			template.blocks.len()
		);
	}

	Ok(())
}

fn run_check(args: &LabrepCli, path: &Path, show_diff: bool) -> CliResult {
	let config = load_config(args)?;
	let template = load_template(path)?;
	let compiler = config.compiler();

	if !template.is_stale(&compiler) {
		println!(
			"{}",
			colored!(format!("Template `{}` is up to date.", template.id), green)
		);
		return Ok(());
	}

	eprintln!(
		"{} stored markup of `{}` does not match its blocks",
		colored!("stale:", red),
		path.display()
	);
	if show_diff {
		print_diff(&template.html, &compiler.compile(&template.blocks, None));
	}
	eprintln!("\nRun `labrep save {}` to recompile it.", path.display());
	process::exit(1);
}

fn run_save(args: &LabrepCli, path: &Path) -> CliResult {
	let config = load_config(args)?;
	let mut template = load_template(path)?;
	template.save(&config.compiler());

	write_data_file(path, &template.to_value())?;
	println!("Saved template `{}` to {}", template.id, path.display());

	Ok(())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		let line = match change.tag() {
			ChangeTag::Delete => format!("  {}", colored!(format!("-{change}"), red)),
			ChangeTag::Insert => format!("  {}", colored!(format!("+{change}"), green)),
			ChangeTag::Equal => format!("   {change}"),
		};
		if change.missing_newline() {
			eprintln!("{line}");
		} else {
			eprint!("{line}");
		}
	}
}
