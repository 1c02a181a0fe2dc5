//! Credential redaction for log and diagnostic output.

use std::io::{self, Write};

use crate::types::Source;

/// Marker substituted for every password.
pub const REDACTED_PASSWORD: &str = "***REDACTED-PASSWORD***";

/// Replaces known secrets in text with [`REDACTED_PASSWORD`].
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Collect every team password configured in `source`.
    pub fn from_source(source: &Source) -> Self {
        Self::new(source.teams.iter().map(|t| t.password.clone()))
    }

    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets.into_iter().filter(|s| !s.is_empty()).collect();
        // Longest first, so a password that contains another is scrubbed whole.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), REDACTED_PASSWORD);
            }
        }
        out
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

/// A [`Write`] sink that scrubs secrets before forwarding each write.
///
/// Writes are redacted per call; callers that may split a secret across
/// two writes should hand over whole lines.
pub struct RedactingWriter<W> {
    redactor: Redactor,
    sink: W,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(redactor: Redactor, sink: W) -> Self {
        Self { redactor, sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.sink.write_all(self.redactor.redact(&text).as_bytes())?;
        // Report the caller's byte count; the scrubbed length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Team, TeamName};

    fn source() -> Source {
        Source {
            target: "https://ci".into(),
            teams: vec![
                Team {
                    name: TeamName::from("main"),
                    username: "admin".into(),
                    password: "s3cret".into(),
                },
                Team {
                    name: TeamName::from("other"),
                    username: "bob".into(),
                    password: "s3cret-longer".into(),
                },
            ],
            ..Source::default()
        }
    }

    #[test]
    fn replaces_every_password() {
        let r = Redactor::from_source(&source());
        let out = r.redact("login -p s3cret then -p s3cret-longer");
        assert_eq!(
            out,
            format!("login -p {REDACTED_PASSWORD} then -p {REDACTED_PASSWORD}")
        );
    }

    #[test]
    fn empty_passwords_are_ignored() {
        let r = Redactor::new(vec![String::new()]);
        assert_eq!(r.redact("nothing to hide"), "nothing to hide");
    }

    #[test]
    fn writer_scrubs_before_sink() {
        let r = Redactor::from_source(&source());
        let mut w = RedactingWriter::new(r, Vec::new());
        let n = w.write(b"password=s3cret\n").unwrap();
        assert_eq!(n, "password=s3cret\n".len());
        let written = String::from_utf8(w.into_inner()).unwrap();
        assert!(!written.contains("s3cret"));
        assert!(written.contains(REDACTED_PASSWORD));
    }
}
