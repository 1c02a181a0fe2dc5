//! Per-run log file.
//!
//! Each run logs to a fresh `pipesync-<op>.log*` file and removes the ones
//! left behind by earlier runs of the same operation. Every line passes
//! through the password redactor before it reaches the file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

use pipesync_core::{RedactingWriter, Redactor};

/// Filter directives for the log file, e.g. `PIPESYNC_LOG=info`.
pub const LOG_ENV: &str = "PIPESYNC_LOG";

/// Keeps the subscriber installed for as long as it lives.
pub struct LogSession {
    _guard: DefaultGuard,
    pub path: PathBuf,
}

#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).flush()
    }
}

/// Hands the fmt layer a redacting writer per event.
#[derive(Clone)]
struct LogWriter {
    file: SharedFile,
    redactor: Redactor,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = RedactingWriter<SharedFile>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(self.redactor.clone(), self.file.clone())
    }
}

fn log_prefix(op: &str) -> String {
    format!("pipesync-{op}.log")
}

/// Delete earlier log files of `op` in `dir`. Failures are ignored; another
/// run may be holding or removing the same files.
fn remove_stale(dir: &Path, op: &str) {
    let prefix = log_prefix(op);
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// Create the log file for `op` and install a scoped subscriber writing to
/// it. Announces the path on stderr.
pub fn init(op: &str, log_dir: Option<&Path>, redactor: Redactor) -> Result<LogSession> {
    let dir = log_dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&dir).with_context(|| format!("cannot create log dir {}", dir.display()))?;
    remove_stale(&dir, op);

    let (file, path) = tempfile::Builder::new()
        .prefix(&log_prefix(op))
        .tempfile_in(&dir)
        .and_then(|f| f.keep().map_err(|e| e.error))
        .with_context(|| format!("cannot create log file in {}", dir.display()))?;
    eprintln!("Logging to {}", path.display());

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LogWriter {
            file: SharedFile(Arc::new(Mutex::new(file))),
            redactor,
        })
        .with_ansi(false)
        .with_target(false)
        .finish();

    Ok(LogSession {
        _guard: tracing::subscriber::set_default(subscriber),
        path,
    })
}
