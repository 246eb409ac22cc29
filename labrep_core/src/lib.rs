//! `labrep_core` is the core library for [labrep](https://github.com/ifiokjr/labrep), a laboratory report templating toolkit. It maps raw laboratory system payloads onto a standard report schema, compiles structured block templates into markup carrying mustache-style placeholders, and enriches report data into render-ready snapshots.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Raw input (JSON)
//!   → Mapping engine (field mappings + result row mappings → StandardReportData)
//!   → Enricher (formatted dates, flag labels and classes, summary card colours → RenderSnapshot)
//!   → Compiler (visible blocks → placeholder markup)
//!   → Placeholder substitution (performed by the caller's renderer)
//! ```
//!
//! ## Modules
//!
//! - [`path`]: dot-notation get/set over nested JSON trees.
//! - [`block`]: the block model with its factory and normalizer.
//! - [`compiler`]: block lists to markup templates.
//! - [`mapping`]: raw input to the standard schema, plus a mapping session that survives bad input.
//! - [`enrich`]: presentation enrichment of standard data.
//! - [`template`]: named templates with editing operations and the effective markup resolver.
//! - [`presets`]: the bundled default template and report presets.
//! - [`config`]: configuration loading from `labrep.toml` and data file parsing.
//!
//! ## Quick Start
//!
//! ```rust
//! use labrep_core::Enricher;
//! use labrep_core::MappingSession;
//! use labrep_core::default_template;
//! use serde_json::json;
//!
//! let mut session = MappingSession::default();
//! session.apply(&json!({
//! 	"patientInfo": { "name": "张三" },
//! 	"results": [{ "item": "WBC", "value": "6.5", "flag": "H" }],
//! }));
//!
//! let snapshot = Enricher::default().enrich(session.data());
//! let template = default_template();
//! let markup = template.resolve_effective(&Default::default(), Some(snapshot.as_value()), None);
//! assert!(markup.contains("{{patient.name}}"));
//! ```

pub use block::*;
pub use compiler::*;
pub use condition::*;
pub use config::*;
pub use enrich::*;
pub use error::*;
pub use mapping::*;
pub use path::*;
pub use presets::*;
pub use standard::*;
pub use style::*;
pub use tables::*;
pub use template::*;
pub use validate::*;

pub mod block;
pub mod compiler;
mod condition;
pub mod config;
pub mod enrich;
#[allow(unused_assignments)]
mod error;
pub mod mapping;
pub mod path;
pub mod presets;
mod standard;
mod style;
mod tables;
pub mod template;
mod validate;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
