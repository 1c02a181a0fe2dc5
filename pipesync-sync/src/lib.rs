//! # pipesync-sync
//!
//! The synchronization engine behind the three resource operations.
//!
//! - [`check`]: fetch everything, report a version if it changed
//! - [`get`]: fetch everything and write it to a directory (`in`)
//! - [`put`]: render, diff and publish local pipelines (`out`)
//!
//! All three authenticate every configured team concurrently and fan out
//! one task per pipeline through [`fanout::run_for_all`].

pub mod apply;
pub mod check;
pub mod diff;
pub mod error;
pub mod fanout;
pub mod fetch;
pub mod get;
pub mod put;
pub mod version;
pub mod writer;

pub use check::check;
pub use diff::ConfigDiffer;
pub use error::SyncError;
pub use fetch::{FetchedPipeline, TeamClients};
pub use get::get;
pub use put::put;
