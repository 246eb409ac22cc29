use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use labrep_core::TemplateMode;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Map laboratory results onto a standard report and compile report templates.",
	long_about = "labrep maps raw laboratory system payloads onto a standard report schema and \
	              compiles structured block templates into placeholder markup.\n\nQuick \
	              start:\n  labrep init               Create labrep.toml and a sample \
	              template\n  labrep map raw.json       Map raw input onto the standard \
	              schema\n  labrep compile tpl.json   Print the effective template markup\n  \
	              labrep check tpl.json     Verify stored markup matches the blocks"
)]
pub struct LabrepCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory, where `labrep.toml` is looked up.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize labrep in a project.
	///
	/// Creates a `labrep.toml` with the default field and result mappings and
	/// a `template.json` holding the standard report template. Existing files
	/// are left untouched.
	Init,
	/// Map a raw input file onto the standard report schema.
	///
	/// Uses the mappings and organisation fields from `labrep.toml` (or the
	/// built-in defaults) and prints the standard report data as JSON. Raw
	/// input may be JSON, TOML or YAML.
	Map {
		/// Raw input file.
		raw: PathBuf,
	},
	/// Enrich standard report data into a render snapshot.
	///
	/// Formats dates, derives flag labels and classes for every result row and
	/// paints summary cards using the configured tables. Prints JSON.
	Enrich {
		/// Standard report data file.
		standard: PathBuf,
	},
	/// Print the effective markup of a template.
	///
	/// Html-mode templates print their stored markup. Structured templates
	/// are compiled from their blocks; when `--data` is given, block
	/// conditions are evaluated against that snapshot.
	Compile {
		/// Template file.
		template: PathBuf,

		/// Render snapshot used to evaluate block conditions.
		#[arg(long)]
		data: Option<PathBuf>,

		/// Override the template's stored mode.
		#[arg(long, value_enum)]
		mode: Option<ModeArg>,
	},
	/// Check standard report data for missing required fields.
	///
	/// Prints every issue. Exits with a non-zero status code when any issue
	/// is an error.
	Validate {
		/// Standard report data file.
		standard: PathBuf,
	},
	/// List the bundled template presets or print one as JSON.
	Presets {
		/// Preset id to print.
		#[arg(long)]
		id: Option<String>,
	},
	/// Check that a structured template's stored markup is up to date.
	///
	/// Compares the stored `html` with a fresh compilation of the blocks and
	/// exits with a non-zero status code when they differ. Html-mode
	/// templates are always up to date.
	Check {
		/// Template file.
		template: PathBuf,

		/// Show a unified diff between the stored and the expected markup.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Recompile a structured template's markup and write it back.
	///
	/// Stamps `updatedAt` and writes the template back to the same path in
	/// the format of its extension (json, toml or yaml).
	Save {
		/// Template file.
		template: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
	/// Compile the template's blocks.
	Structured,
	/// Use the template's stored markup.
	Html,
}

impl From<ModeArg> for TemplateMode {
	fn from(mode: ModeArg) -> Self {
		match mode {
			ModeArg::Structured => Self::Structured,
			ModeArg::Html => Self::Html,
		}
	}
}
