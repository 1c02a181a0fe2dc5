//! # pipesync-template
//!
//! Variable files and `${...}` placeholder evaluation for pipeline configs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use pipesync_template::render_config_file;
//!
//! fn load() -> Result<(), pipesync_template::TemplateError> {
//!     let rendered = render_config_file(
//!         &PathBuf::from("ci/pipeline.yml"),
//!         &[PathBuf::from("ci/common.yml"), PathBuf::from("ci/prod.yml")],
//!     )?;
//!     println!("{} bytes, {} jobs", rendered.raw.len(), rendered.config["jobs"].as_array().map_or(0, Vec::len));
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod vars;

pub use engine::{evaluate, render_config_file, RenderedConfig};
pub use error::TemplateError;
pub use vars::Variables;
