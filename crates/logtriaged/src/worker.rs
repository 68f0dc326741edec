//! Worker loop: one pass over builds, one over tests, then sleep.
//!
//! A pass runs each result through eligibility, the processed-set skip
//! check, the log cache, the classifier, normalization, derivation and
//! the publisher, strictly one result at a time. A query failure aborts
//! the pass; a single result's fetch or classification failure only
//! skips that result, leaving it unmarked so the next pass retries it.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use logtriage_core::{
    derive, normalize, CiResult, Classifier, EligibilityConfig, Envelope, ResultKind, ResultSource,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::LogCache;
use crate::spool::Spool;
use crate::tracker::ProcessedSet;

/// Counters for one pass over one result kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Results returned by the selector.
    pub selected: usize,
    /// Marked processed without classification (eligibility = false).
    pub ineligible: usize,
    /// Skipped because already marked processed.
    pub already_processed: usize,
    /// Fully processed with at least one envelope published.
    pub published: usize,
    /// Fully processed with no findings to publish.
    pub empty: usize,
    /// Fetch/classification failures, left unmarked for retry.
    pub failed: usize,
}

pub struct Worker {
    source: Arc<dyn ResultSource>,
    classifier: Arc<dyn Classifier>,
    cache: LogCache,
    tracker: ProcessedSet,
    spool: Spool,
    eligibility: EligibilityConfig,
    window: ChronoDuration,
    dry_run: bool,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn ResultSource>,
        classifier: Arc<dyn Classifier>,
        cache: LogCache,
        tracker: ProcessedSet,
        spool: Spool,
        eligibility: EligibilityConfig,
        window: ChronoDuration,
        dry_run: bool,
    ) -> Self {
        Worker {
            source,
            classifier,
            cache,
            tracker,
            spool,
            eligibility,
            window,
            dry_run,
        }
    }

    /// Run forever: builds pass, tests pass, sleep. Pass failures are
    /// logged and retried on the next cycle; there is no backoff beyond
    /// the fixed interval.
    pub async fn run(&self, interval: Duration, dry_run_interval: Duration) -> Result<()> {
        loop {
            for kind in [ResultKind::Build, ResultKind::Test] {
                match self.run_pass(kind).await {
                    Ok(stats) => {
                        info!(
                            kind = %kind,
                            selected = stats.selected,
                            published = stats.published,
                            ineligible = stats.ineligible,
                            failed = stats.failed,
                            "pass complete",
                        );
                    }
                    Err(e) => error!(kind = %kind, error = %e, "pass aborted"),
                }
            }
            let sleep = if self.dry_run {
                warn!("dry run - sleeping {}s before next pass", dry_run_interval.as_secs());
                dry_run_interval
            } else {
                interval
            };
            tokio::time::sleep(sleep).await;
        }
    }

    /// One pass over one result kind.
    pub async fn run_pass(&self, kind: ResultKind) -> Result<PassStats> {
        let mut stats = PassStats::default();
        let origins = self.eligibility.origins();
        if origins.is_empty() {
            info!(kind = %kind, "no origins configured, nothing to process");
            return Ok(stats);
        }

        let since = Utc::now() - self.window;
        let results = self.source.failed_with_logs(kind, since, &origins).await?;
        stats.selected = results.len();
        if results.is_empty() {
            info!(kind = %kind, "no unprocessed results found");
            return Ok(stats);
        }

        for result in &results {
            if !self.eligibility.is_eligible(result) {
                info!(
                    result_id = %result.id,
                    path = result.path.as_deref().unwrap_or(""),
                    "result not eligible, marking processed",
                );
                // Marking here bounds the selector's working set; the
                // result is never re-evaluated even if rules change.
                if !self.dry_run {
                    self.tracker.mark_processed(kind, &result.id)?;
                }
                stats.ineligible += 1;
                continue;
            }

            if self.tracker.is_processed(kind, &result.id)? {
                debug!(result_id = %result.id, "result already processed");
                stats.already_processed += 1;
                continue;
            }

            match self.process_one(result).await {
                Ok(published) => {
                    if published {
                        stats.published += 1;
                    } else {
                        stats.empty += 1;
                    }
                    if !self.dry_run {
                        self.tracker.mark_processed(kind, &result.id)?;
                    }
                }
                Err(e) => {
                    // Left unmarked: the next pass retries naturally.
                    error!(result_id = %result.id, error = %e, "result processing failed");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Process a single eligible, unprocessed result. Returns whether
    /// an envelope was published (or would have been, in dry-run).
    async fn process_one(&self, result: &CiResult) -> Result<bool> {
        let log_url = result
            .log_url
            .as_deref()
            .context("selected result has no log url")?;
        debug!(
            result_id = %result.id,
            origin = %result.origin,
            status = result.status.as_deref().unwrap_or(""),
            log_url,
            "processing result",
        );

        let log_path = self.cache.fetch(log_url).await?;
        let log = self.cache.read(&log_path).await?;

        let profile = self.eligibility.profile_for(result);
        let output = self.classifier.classify(&log, profile).await?;
        let normalized = normalize(&output, profile);
        if let Some(status) = normalized.proposed_status {
            info!(
                result_id = %result.id,
                proposed_status = status.as_str(),
                "classification proposes corrected status",
            );
        }

        let derivation = derive(&normalized.findings, &result.id, profile, &result.origin)?;
        if derivation.is_empty() {
            debug!(result_id = %result.id, "no findings to publish");
            return Ok(false);
        }

        let envelope = Envelope::new(derivation.issues, derivation.incidents);
        if self.dry_run {
            info!(
                result_id = %result.id,
                payload = %envelope.to_json_pretty()?,
                "dry run - not publishing",
            );
        } else {
            self.spool.publish(&envelope)?;
        }
        Ok(true)
    }
}
