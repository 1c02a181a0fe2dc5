//! `pipesync in <dir>`: write every pipeline config into a directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pipesync_core::InRequest;

use super::{apply_target_fallback, execute, read_request, write_response, GlobalOpts};

/// Arguments for `pipesync in`.
#[derive(Args, Debug)]
pub struct InArgs {
    /// Directory to write `<team>-<pipeline>.yml` files into.
    pub destination: PathBuf,
}

impl InArgs {
    pub fn run(self, global: &GlobalOpts) -> Result<()> {
        let mut request: InRequest = read_request(std::io::stdin().lock())?;
        apply_target_fallback(&mut request.source);

        let req = &request;
        let dest = self.destination.as_path();
        let response = execute("in", global, &request.source, move |connector| async move {
            pipesync_sync::get(req, dest, connector).await
        })?;

        write_response(std::io::stdout().lock(), &response)
    }
}
