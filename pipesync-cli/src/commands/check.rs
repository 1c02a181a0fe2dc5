//! `pipesync check`: report a new version, if any.

use anyhow::Result;

use pipesync_core::CheckRequest;

use super::{apply_target_fallback, execute, read_request, write_response, GlobalOpts};

pub fn run(global: &GlobalOpts) -> Result<()> {
    let mut request: CheckRequest = read_request(std::io::stdin().lock())?;
    apply_target_fallback(&mut request.source);

    let req = &request;
    let versions = execute("check", global, &request.source, move |connector| async move {
        pipesync_sync::check(req, connector).await
    })?;

    write_response(std::io::stdout().lock(), &versions)
}
