use serde::Serialize;

use crate::path::has_value;
use crate::standard::StandardReportData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
	Warning,
	Error,
}

/// A completeness problem found in report data. `id` is the path of the
/// offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
	pub id: String,
	pub level: IssueLevel,
	pub message: String,
}

impl ValidationIssue {
	fn new(id: &str, level: IssueLevel, message: &str) -> Self {
		Self {
			id: id.to_string(),
			level,
			message: message.to_string(),
		}
	}

	pub fn is_error(&self) -> bool {
		self.level == IssueLevel::Error
	}
}

/// Check report data for the fields a printable report cannot do without.
pub fn validate_report(data: &StandardReportData) -> Vec<ValidationIssue> {
	let mut issues = Vec::new();

	if !has_value(data.patient.get("name")) {
		issues.push(ValidationIssue::new(
			"patient.name",
			IssueLevel::Error,
			"patient name is missing",
		));
	}
	if !has_value(data.order.get("reportNo")) {
		issues.push(ValidationIssue::new(
			"order.reportNo",
			IssueLevel::Warning,
			"report number is missing",
		));
	}
	if !has_value(data.order.get("sampleTime")) {
		issues.push(ValidationIssue::new(
			"order.sampleTime",
			IssueLevel::Warning,
			"sample time is missing",
		));
	}
	if data.results.is_empty() {
		issues.push(ValidationIssue::new(
			"results",
			IssueLevel::Error,
			"no test results",
		));
	}

	issues
}
