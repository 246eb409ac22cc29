use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum LabrepError {
	#[error(transparent)]
	#[diagnostic(code(labrep::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse raw input at line {line}, column {column}: {message}")]
	#[diagnostic(
		code(labrep::raw_input_parse),
		help("fix the raw input JSON; the previously mapped report data is unchanged")
	)]
	RawInputParse {
		message: String,
		line: usize,
		column: usize,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(labrep::config_parse),
		help("check that labrep.toml is valid TOML with [mapping], [org], [[flags]], [palette] and/or [icons] sections")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(labrep::data_file))]
	DataFile { path: String, reason: String },

	#[error("failed to write data file `{path}`: {reason}")]
	#[diagnostic(code(labrep::data_serialize))]
	DataSerialize { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(labrep::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("unconvertible float value in data file `{path}`: {value}")]
	#[diagnostic(
		code(labrep::unconvertible_float),
		help("NaN and Infinity are not valid JSON numbers")
	)]
	UnconvertibleFloat { path: String, value: String },

	#[error("unknown template preset: `{0}`")]
	#[diagnostic(
		code(labrep::unknown_preset),
		help("run `labrep presets` to list the bundled template presets")
	)]
	UnknownPreset(String),
}

pub type LabrepResult<T> = Result<T, LabrepError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
