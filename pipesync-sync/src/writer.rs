//! Materializes fetched pipelines into a directory.
//!
//! Each pipeline lands in `<team>-<pipeline>.yml` holding the raw config as
//! served by the remote. Every file is written to `<path>.pipesync.tmp` and
//! renamed into place, so a reader never sees a half-written config.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pipesync_core::{PipelineName, TeamName};

use crate::error::{io_err, SyncError};
use crate::fetch::FetchedPipeline;

/// File name for a pipeline inside the destination directory.
pub fn pipeline_file_name(team: &TeamName, pipeline: &PipelineName) -> String {
    format!("{team}-{pipeline}.yml")
}

/// Write `content` to `path` via a sibling temp file and a rename.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.pipesync.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

/// Write every pipeline into `dest`, creating it if needed.
///
/// Returns the file name used for each pipeline, in input order. The first
/// failed write aborts the call; files already written are left in place.
pub fn write_pipelines(dest: &Path, fetched: &[FetchedPipeline]) -> Result<Vec<String>, SyncError> {
    std::fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;

    // Distinct (team, name) pairs can still collide, e.g. `a-b/c` and `a/b-c`.
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut names = Vec::with_capacity(fetched.len());
    for pipeline in fetched {
        let file = pipeline_file_name(&pipeline.team, &pipeline.name);
        if let Some(first) = claimed.insert(file.clone(), pipeline.key()) {
            return Err(SyncError::FileCollision {
                first,
                second: pipeline.key(),
                file,
            });
        }
        atomic_write(&dest.join(&file), &pipeline.config.raw)?;
        names.push(file);
    }

    tracing::info!(count = names.len(), dir = %dest.display(), "wrote pipeline files");
    Ok(names)
}
