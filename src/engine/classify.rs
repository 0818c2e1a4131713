//! Pure per-file classification: stored record + observation + history → alerts.

#![allow(missing_docs)]

use crate::engine::alert::Alert;
use crate::fingerprint::fingerprinter::FileRecord;
use crate::store::history::{History, SeedPolicy};

/// What a check saw at a baselined path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The path does not exist (symlinks followed).
    Missing,
    Present(FileRecord),
    /// The path could not be inspected or fingerprinted.
    Unreadable(String),
}

/// Outcome for one baselined path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// In emission order: modification before spoofing.
    pub alerts: Vec<Alert>,
    pub violation: bool,
    /// State to append to history, set only when spoofing was detected.
    pub append: Option<FileRecord>,
}

/// Classify one baselined path. No side effects.
pub fn classify(
    path: &str,
    stored: &FileRecord,
    observation: &Observation,
    history: &History,
    policy: SeedPolicy,
) -> Classification {
    let mut out = Classification::default();
    match observation {
        Observation::Missing => {
            out.alerts.push(Alert::FileRemoved {
                path: path.to_string(),
                original_hash: stored.hash.clone(),
            });
        }
        Observation::Unreadable(details) => {
            out.alerts.push(Alert::ReadFailed {
                path: path.to_string(),
                details: details.clone(),
            });
        }
        Observation::Present(current) => {
            if current.hash != stored.hash {
                out.alerts.push(Alert::FileModified {
                    path: path.to_string(),
                    old_hash: stored.hash.clone(),
                    new_hash: current.hash.clone(),
                });
            }
            if history.contains_hash_with(path, &current.hash, policy, stored) {
                out.alerts.push(Alert::SpoofingSuspected {
                    path: path.to_string(),
                    hash: current.hash.clone(),
                });
                out.append = Some(current.clone());
            }
        }
    }
    out.violation = out.alerts.iter().any(Alert::is_violation);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::history::HistoryStore;
    use chrono::NaiveDate;

    fn record(hash: &str) -> FileRecord {
        FileRecord {
            hash: hash.to_string(),
            size: 3,
            modified: "m".to_string(),
            accessed: "a".to_string(),
        }
    }

    /// History for "f" holding `hashes` oldest first.
    fn history_with(hashes: &[&str]) -> History {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.json"));
        let mut history = History::new();
        let at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        for h in hashes {
            store.append(&mut history, "f", &record(h), at).unwrap();
        }
        history
    }

    #[test]
    fn missing_file_is_removed_violation_without_append() {
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Missing,
            &history_with(&["aa"]),
            SeedPolicy::Include,
        );
        assert_eq!(
            c.alerts,
            vec![Alert::FileRemoved {
                path: "f".into(),
                original_hash: "aa".into()
            }]
        );
        assert!(c.violation);
        assert!(c.append.is_none());
    }

    #[test]
    fn unchanged_file_matches_seed_entry_by_default() {
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Present(record("aa")),
            &history_with(&["aa"]),
            SeedPolicy::Include,
        );
        assert_eq!(c.alerts.len(), 1);
        assert_eq!(c.alerts[0].kind(), "spoofing_suspected");
        assert!(!c.violation);
        assert_eq!(c.append, Some(record("aa")));
    }

    #[test]
    fn unchanged_file_is_clean_when_seed_excluded() {
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Present(record("aa")),
            &history_with(&["aa"]),
            SeedPolicy::Exclude,
        );
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn rebaselined_file_is_clean_when_seed_excluded() {
        // "aa" seeded by the first baseline, "bb" by the current one.
        let c = classify(
            "f",
            &record("bb"),
            &Observation::Present(record("bb")),
            &history_with(&["aa", "bb"]),
            SeedPolicy::Exclude,
        );
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn revert_to_earlier_baseline_spoofs_when_seed_excluded() {
        let c = classify(
            "f",
            &record("bb"),
            &Observation::Present(record("aa")),
            &history_with(&["aa", "bb"]),
            SeedPolicy::Exclude,
        );
        let kinds: Vec<&str> = c.alerts.iter().map(Alert::kind).collect();
        assert_eq!(kinds, vec!["file_modified", "spoofing_suspected"]);
        assert!(c.violation);
    }

    #[test]
    fn new_content_is_modified_only() {
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Present(record("bb")),
            &history_with(&["aa"]),
            SeedPolicy::Include,
        );
        assert_eq!(
            c.alerts,
            vec![Alert::FileModified {
                path: "f".into(),
                old_hash: "aa".into(),
                new_hash: "bb".into()
            }]
        );
        assert!(c.violation);
        assert!(c.append.is_none());
    }

    #[test]
    fn modified_to_previously_seen_hash_raises_both() {
        // History: seed "aa", then "bb" recorded while spoofing was detected.
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Present(record("bb")),
            &history_with(&["aa", "bb"]),
            SeedPolicy::Exclude,
        );
        let kinds: Vec<&str> = c.alerts.iter().map(Alert::kind).collect();
        assert_eq!(kinds, vec!["file_modified", "spoofing_suspected"]);
        assert!(c.violation);
        assert_eq!(c.append, Some(record("bb")));
    }

    #[test]
    fn unreadable_is_reported_not_violation() {
        let c = classify(
            "f",
            &record("aa"),
            &Observation::Unreadable("permission denied".into()),
            &History::new(),
            SeedPolicy::Include,
        );
        assert_eq!(c.alerts[0].kind(), "read_failed");
        assert!(!c.violation);
        assert!(c.append.is_none());
    }
}
