//! `pipesync out <dir>`: publish pipeline configs from a directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pipesync_core::{OutRequest, RedactingWriter, Redactor};
use pipesync_sync::ConfigDiffer;

use super::{apply_target_fallback, execute, read_request, write_response, GlobalOpts};

/// Arguments for `pipesync out`.
#[derive(Args, Debug)]
pub struct OutArgs {
    /// Directory that `config_file`, `vars_files` and `pipelines_file`
    /// paths are relative to.
    pub sources: PathBuf,
}

impl OutArgs {
    pub fn run(self, global: &GlobalOpts) -> Result<()> {
        let mut request: OutRequest = read_request(std::io::stdin().lock())?;
        apply_target_fallback(&mut request.source);

        // stdout carries the response; diffs go to stderr.
        let differ = ConfigDiffer::new(Box::new(RedactingWriter::new(
            Redactor::from_source(&request.source),
            std::io::stderr(),
        )));

        let req = &request;
        let sources = self.sources.as_path();
        let differ = &differ;
        let response = execute("out", global, &request.source, move |connector| async move {
            pipesync_sync::put(req, sources, connector, differ).await
        })?;

        write_response(std::io::stdout().lock(), &response)
    }
}
