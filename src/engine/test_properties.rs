//! Property-based tests for fingerprint and history invariants.
//!
//! Arbitrary sequences of file mutations interleaved with baselines and
//! checks must never shrink any path's history, and the digest of a file
//! must not depend on the read chunk size.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use tempfile::TempDir;

use super::monitor::{BaselineEngine, EngineConfig};
use crate::core::clock::FixedClock;
use crate::fingerprint::algorithm::HashAlgorithm;
use crate::fingerprint::fingerprinter::Fingerprinter;
use crate::logger::alert_log::MemoryAlertSink;
use crate::store::history::SeedPolicy;

#[derive(Debug, Clone)]
enum Step {
    Write { file: usize, content: Vec<u8> },
    Delete { file: usize },
    Baseline,
    Check,
}

const FILES: usize = 3;

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..FILES, prop::collection::vec(any::<u8>(), 0..16))
            .prop_map(|(file, content)| Step::Write { file, content }),
        1 => (0..FILES).prop_map(|file| Step::Delete { file }),
        1 => Just(Step::Baseline),
        3 => Just(Step::Check),
    ]
}

fn arb_policy() -> impl Strategy<Value = SeedPolicy> {
    prop_oneof![Just(SeedPolicy::Include), Just(SeedPolicy::Exclude)]
}

fn file_path(dir: &TempDir, index: usize) -> PathBuf {
    dir.path().join("watched").join(format!("f{index}.txt"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// `len_for(path)` never decreases across baselines and checks.
    #[test]
    fn history_only_grows(
        steps in prop::collection::vec(arb_step(), 1..20),
        policy in arb_policy(),
    ) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("watched")).unwrap();
        for i in 0..FILES {
            fs::write(file_path(&dir, i), format!("initial {i}")).unwrap();
        }

        let mut config = EngineConfig::new(
            dir.path().join("baseline.json"),
            dir.path().join("history.json"),
        );
        config.seed_policy = policy;
        let at = NaiveDate::from_ymd_opt(2026, 10, 14)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let mut engine = BaselineEngine::new(
            config,
            Box::new(MemoryAlertSink::new()),
            Arc::new(FixedClock(at)),
        )
        .unwrap();

        let root = dir.path().join("watched");
        engine.create_baseline(std::slice::from_ref(&root)).unwrap();
        let keys: Vec<String> = (0..FILES)
            .map(|i| file_path(&dir, i).to_string_lossy().into_owned())
            .collect();
        let lengths = |engine: &BaselineEngine| -> Vec<usize> {
            let history = engine.history_store().load().unwrap();
            keys.iter().map(|k| history.len_for(k)).collect()
        };
        let mut previous = lengths(&engine);

        for step in steps {
            match step {
                Step::Write { file, content } => fs::write(file_path(&dir, file), content).unwrap(),
                Step::Delete { file } => {
                    let _ = fs::remove_file(file_path(&dir, file));
                }
                Step::Baseline => {
                    engine.create_baseline(std::slice::from_ref(&root)).unwrap();
                }
                Step::Check => {
                    let report = engine.check_integrity().unwrap();
                    prop_assert_eq!(report.alert_count, report.alerts.len());
                }
            }
            let current = lengths(&engine);
            for (before, after) in previous.iter().zip(&current) {
                prop_assert!(after >= before, "history shrank: {:?} -> {:?}", previous, current);
            }
            previous = current;
        }
    }

    /// Chunk size never changes the digest.
    #[test]
    fn digest_is_independent_of_chunk_size(
        content in prop::collection::vec(any::<u8>(), 0..20_000),
        chunk in 1usize..9000,
        sha512 in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, &content).unwrap();

        let algorithm = if sha512 { HashAlgorithm::Sha512 } else { HashAlgorithm::Sha256 };
        let chunked = Fingerprinter::new(algorithm, chunk).fingerprint(&path).unwrap();
        prop_assert_eq!(&chunked.hash, &algorithm.digest_hex(&content));
        prop_assert_eq!(chunked.size, content.len() as u64);
    }
}
