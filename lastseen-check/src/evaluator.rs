// Freshness evaluation
//
// Resolves every pattern against one read snapshot of the store, keeps the
// most recent arrival across all of them and ages it against the clock.

use crate::pattern::TopicPattern;
use crate::threshold::Thresholds;
use crate::verdict::{Freshest, PerfData, Verdict};
use crate::CheckError;
use lastseen_core::Timestamp;
use lastseen_store::{Snapshot, Store, LAST_SEEN_TABLE};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One freshness check over a set of topic patterns
#[derive(Debug, Clone)]
pub struct FreshnessCheck {
    warning: Duration,
    critical: Duration,
    patterns: Vec<String>,
}

impl FreshnessCheck {
    pub fn new(warning: Duration, critical: Duration, patterns: Vec<String>) -> Self {
        Self {
            warning,
            critical,
            patterns,
        }
    }

    /// Open the database read-only and evaluate it. Every failure ends up as
    /// an UNKNOWN verdict.
    pub fn run(&self, db_path: &Path, now: Timestamp) -> Verdict {
        match self.try_run(db_path, now) {
            Ok(verdict) => verdict,
            Err(e) => e.into(),
        }
    }

    /// Evaluate an already opened store
    pub fn evaluate(&self, store: &Store, now: Timestamp) -> Verdict {
        let database = store
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        match self.prepare().and_then(|(t, p)| resolve(store, &database, &t, &p, now)) {
            Ok(verdict) => verdict,
            Err(e) => e.into(),
        }
    }

    fn try_run(&self, db_path: &Path, now: Timestamp) -> Result<Verdict, CheckError> {
        let (thresholds, patterns) = self.prepare()?;

        if !db_path.exists() {
            return Err(CheckError::MissingDatabase(db_path.to_path_buf()));
        }
        let store = Store::open_read_only(db_path)?;
        resolve(&store, &db_path.display().to_string(), &thresholds, &patterns, now)
    }

    /// Validate thresholds and compile patterns before touching the database
    fn prepare(&self) -> Result<(Thresholds, Vec<TopicPattern>), CheckError> {
        let thresholds = Thresholds::new(self.warning, self.critical)?;
        if self.patterns.is_empty() {
            return Err(CheckError::NoPatterns);
        }
        let patterns = self
            .patterns
            .iter()
            .map(|p| TopicPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((thresholds, patterns))
    }
}

fn resolve(
    store: &Store,
    database: &str,
    thresholds: &Thresholds,
    patterns: &[TopicPattern],
    now: Timestamp,
) -> Result<Verdict, CheckError> {
    let freshest = store.snapshot(|view| {
        if !view.has_table(LAST_SEEN_TABLE)? {
            return Err(CheckError::MissingTable {
                table: LAST_SEEN_TABLE,
                database: database.to_string(),
            });
        }
        freshest_match(view, database, patterns)
    })?;

    let age = now.saturating_duration_since(freshest.last_seen);
    let status = thresholds.classify(age);
    debug!(
        name = %freshest.name,
        age_secs = age.as_secs(),
        status = %status,
        "Freshness evaluated"
    );

    let perfdata = PerfData::new(age, thresholds.warning(), thresholds.critical());
    Ok(Verdict::from_age(status, freshest, perfdata))
}

/// Most recent arrival over all patterns. Any pattern without a single
/// recorded match fails the whole check.
fn freshest_match(
    view: &Snapshot<'_>,
    database: &str,
    patterns: &[TopicPattern],
) -> Result<Freshest, CheckError> {
    let mut entries: Option<Vec<(String, Timestamp)>> = None;
    let mut freshest: Option<Freshest> = None;

    for pattern in patterns {
        let found = match pattern {
            TopicPattern::Exact(name) => view
                .last_seen(name)?
                .map(|at| (name.clone(), at))
                .ok_or_else(|| CheckError::NoDataForTopic {
                    topic: name.clone(),
                    database: database.to_string(),
                })?,
            TopicPattern::Wildcard { .. } => {
                if entries.is_none() {
                    entries = Some(view.last_seen_entries()?);
                }
                entries
                    .iter()
                    .flatten()
                    .filter(|(name, _)| pattern.matches(name))
                    .max_by_key(|(_, at)| *at)
                    .cloned()
                    .ok_or_else(|| CheckError::NoDataForPattern {
                        pattern: pattern.as_str().to_string(),
                        database: database.to_string(),
                    })?
            }
        };

        debug!(pattern = %pattern, name = %found.0, "Pattern resolved");
        let is_newer = freshest
            .as_ref()
            .map_or(true, |current| found.1 > current.last_seen);
        if is_newer {
            freshest = Some(Freshest {
                name: found.0,
                last_seen: found.1,
            });
        }
    }

    // patterns is non-empty, so at least one entry was resolved
    freshest.ok_or(CheckError::NoPatterns)
}
