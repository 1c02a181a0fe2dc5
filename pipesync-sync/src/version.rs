//! Resource version resolution.
//!
//! The default is one entry per pipeline carrying the server's own version
//! token, so "has anything changed" is plain map equality. The legacy mode
//! folds every raw config into a single SHA-256 digest instead.

use sha2::{Digest, Sha256};

use pipesync_core::{Version, VersionMode};

use crate::fetch::FetchedPipeline;

/// Key of the single entry produced by [`VersionMode::Checksum`].
pub const CHECKSUM_KEY: &str = "pipelines_checksum";

/// `"<team>/<pipeline>" -> server version token`.
pub fn per_pipeline(fetched: &[FetchedPipeline]) -> Version {
    fetched
        .iter()
        .map(|p| (p.key(), p.config.version.to_string()))
        .collect()
}

/// SHA-256 hex over the raw configs, concatenated in pipeline-key order.
pub fn aggregate_checksum(fetched: &[FetchedPipeline]) -> String {
    let mut ordered: Vec<(String, &str)> = fetched
        .iter()
        .map(|p| (p.key(), p.config.raw.as_str()))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let mut h = Sha256::new();
    for (_, raw) in ordered {
        h.update(raw.as_bytes());
    }
    hex::encode(h.finalize())
}

pub fn resolve(mode: VersionMode, fetched: &[FetchedPipeline]) -> Version {
    match mode {
        VersionMode::PerPipeline => per_pipeline(fetched),
        VersionMode::Checksum => {
            Version::from([(CHECKSUM_KEY.to_string(), aggregate_checksum(fetched))])
        }
    }
}

#[cfg(test)]
mod tests {
    use pipesync_core::{ConfigVersion, PipelineConfig, PipelineName, TeamName};
    use serde_json::json;

    use super::*;

    fn fetched(team: &str, name: &str, raw: &str, version: &str) -> FetchedPipeline {
        FetchedPipeline {
            team: TeamName::from(team),
            name: PipelineName::from(name),
            config: PipelineConfig {
                config: json!({}),
                raw: raw.to_string(),
                version: ConfigVersion::from(version),
            },
        }
    }

    #[test]
    fn per_pipeline_has_one_key_per_team_and_name() {
        let set = vec![
            fetched("main", "p1", "a", "1"),
            fetched("main", "p2", "b", "4"),
            fetched("ops", "p1", "c", "9"),
        ];
        let v = per_pipeline(&set);
        assert_eq!(v.len(), 3);
        assert_eq!(v["main/p2"], "4");
        assert_eq!(v["ops/p1"], "9");
    }

    #[test]
    fn checksum_ignores_fetch_order() {
        let a = vec![fetched("main", "p1", "a", "1"), fetched("main", "p2", "b", "1")];
        let b = vec![fetched("main", "p2", "b", "1"), fetched("main", "p1", "a", "1")];
        assert_eq!(aggregate_checksum(&a), aggregate_checksum(&b));
    }

    #[test]
    fn checksum_changes_with_any_byte() {
        let a = vec![fetched("main", "p1", "jobs: []\n", "1")];
        let b = vec![fetched("main", "p1", "jobs: []\r\n", "1")];
        assert_ne!(aggregate_checksum(&a), aggregate_checksum(&b));
    }

    #[test]
    fn checksum_of_nothing_is_the_empty_digest() {
        assert_eq!(
            aggregate_checksum(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn checksum_mode_yields_single_entry() {
        let set = vec![fetched("main", "p1", "a", "1"), fetched("ops", "p2", "b", "2")];
        let v = resolve(VersionMode::Checksum, &set);
        assert_eq!(v.len(), 1);
        assert_eq!(v[CHECKSUM_KEY], aggregate_checksum(&set));
    }
}
