//! Segment pipeline orchestration.
//!
//! One run probes the source, plans segments, drops the ones the ledger
//! already lists as uploaded, and drives the rest through
//! render -> upload -> ledger on a bounded pool. A segment's failure is
//! recorded and contained; only setup failures abort the run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use vpart_ledger::Ledger;
use vpart_media::fs_utils::remove_if_exists;
use vpart_media::{Prober, RenderStage, Renderer};
use vpart_models::{
    plan_segments, LedgerRecord, RemoteDestination, SegmentDescriptor, SegmentStatus, SourceMedia,
};
use vpart_storage::{upload_with_retry, Uploader};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ledger_writer::{LedgerHandle, LedgerWriter};
use crate::logging::{SegmentLogger, SegmentState};
use crate::metrics::{record_segment, record_skipped};

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub planned: usize,
    /// Already uploaded according to the ledger
    pub skipped: usize,
    pub uploaded: usize,
    pub upload_failed: usize,
    pub render_error: usize,
    pub finalize_error: usize,
    pub ledger_write_failures: usize,
}

impl RunSummary {
    pub fn record(&mut self, status: SegmentStatus) {
        match status {
            SegmentStatus::Uploaded => self.uploaded += 1,
            SegmentStatus::UploadFailed => self.upload_failed += 1,
            SegmentStatus::RenderError => self.render_error += 1,
            SegmentStatus::FinalizeError => self.finalize_error += 1,
        }
    }

    /// Segments that reached a terminal status this run.
    pub fn processed(&self) -> usize {
        self.uploaded + self.upload_failed + self.render_error + self.finalize_error
    }

    pub fn failed(&self) -> usize {
        self.upload_failed + self.render_error + self.finalize_error
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "planned={} skipped={} uploaded={} upload_failed={} render_error={} finalize_error={} ledger_write_failures={}",
            self.planned,
            self.skipped,
            self.uploaded,
            self.upload_failed,
            self.render_error,
            self.finalize_error,
            self.ledger_write_failures
        )
    }
}

/// State shared by every segment task of a run.
struct SegmentContext {
    media: SourceMedia,
    config: PipelineConfig,
    renderer: Arc<dyn Renderer>,
    uploader: Arc<dyn Uploader>,
    ledger: LedgerHandle,
}

/// Drives one resumable run over a source file.
pub struct Orchestrator {
    config: PipelineConfig,
    prober: Arc<dyn Prober>,
    renderer: Arc<dyn Renderer>,
    uploader: Arc<dyn Uploader>,
    ledger: Arc<dyn Ledger>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        prober: Arc<dyn Prober>,
        renderer: Arc<dyn Renderer>,
        uploader: Arc<dyn Uploader>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            config,
            prober,
            renderer,
            uploader,
            ledger,
        }
    }

    /// Execute the run to completion.
    ///
    /// Fails only if the source cannot be probed, the plan is invalid, the
    /// ledger cannot be read or remote storage rejects the access check.
    /// Nothing is rendered in those cases.
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("run", %run_id, input = %self.config.input.display());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> PipelineResult<RunSummary> {
        let duration = self.prober.probe(&self.config.input).await?;
        let media = SourceMedia::new(&self.config.input, duration);

        let plan = plan_segments(
            duration,
            self.config.segment_seconds,
            self.config.count_policy,
            &self.config.transform.label_prefix,
        )?;

        let completed = self
            .ledger
            .list_completed_labels()
            .await
            .map_err(PipelineError::LedgerRead)?;

        info!(
            duration_seconds = duration,
            planned = plan.len(),
            completed = completed.len(),
            concurrency = self.config.concurrency,
            ledger = self.ledger.name(),
            "Starting segment run"
        );

        let mut summary = RunSummary {
            planned: plan.len(),
            ..RunSummary::default()
        };

        let work = filter_work_set(plan, &completed);
        summary.skipped = summary.planned - work.len();
        record_skipped(summary.skipped);

        if work.is_empty() {
            info!("Nothing to do, every segment is already ledgered");
            return Ok(summary);
        }

        self.uploader
            .check_access()
            .await
            .map_err(PipelineError::StorageAccess)?;

        let (ledger_handle, writer) = LedgerWriter::spawn(Arc::clone(&self.ledger));
        let ctx = Arc::new(SegmentContext {
            media,
            config: self.config.clone(),
            renderer: Arc::clone(&self.renderer),
            uploader: Arc::clone(&self.uploader),
            ledger: ledger_handle,
        });

        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for segment in work {
            let ctx = Arc::clone(&ctx);
            let permits = Arc::clone(&permits);
            let logger = SegmentLogger::new(&segment);
            let span = logger.create_span();

            tasks.spawn(
                async move {
                    logger.transition(SegmentState::Planned);
                    // Held until the ledger acknowledges this segment's record
                    let _permit = permits.acquire_owned().await.ok()?;
                    Some(process_segment(&ctx, &segment, &logger).await)
                }
                .instrument(span),
            );
        }

        // Drop our handle so the writer stops once the last task finishes
        drop(ctx);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(status)) => summary.record(status),
                Ok(None) => warn!("Segment task ended without acquiring a worker slot"),
                Err(e) => error!(error = %e, "Segment task panicked"),
            }
        }

        match writer.await {
            Ok(stats) => summary.ledger_write_failures = stats.failed,
            Err(e) => error!(error = %e, "Ledger writer task failed"),
        }

        info!(%summary, "Segment run finished");
        Ok(summary)
    }
}

/// Planned segments minus those whose label is already complete, logging each skip.
pub fn filter_work_set(
    plan: Vec<SegmentDescriptor>,
    completed: &HashSet<String>,
) -> Vec<SegmentDescriptor> {
    plan.into_iter()
        .filter(|segment| {
            let done = completed.contains(&segment.label);
            if done {
                SegmentLogger::new(segment).log_skipped();
            }
            !done
        })
        .collect()
}

/// Run one segment through render, upload and ledger append.
async fn process_segment(
    ctx: &SegmentContext,
    segment: &SegmentDescriptor,
    logger: &SegmentLogger,
) -> SegmentStatus {
    let filename = segment.output_filename();
    let expected = segment.expected_length(ctx.media.duration_seconds());

    logger.transition(SegmentState::Rendering);
    let (status, record) = match ctx.renderer.render(&ctx.media, segment).await {
        Err(e) => {
            logger.log_render_failed(e.stage.as_str(), &e);
            let status = match e.stage {
                RenderStage::Transform => SegmentStatus::RenderError,
                RenderStage::Finalize => SegmentStatus::FinalizeError,
            };
            (status, LedgerRecord::new(&segment.label, filename, expected, status))
        }
        Ok(artifact) => {
            logger.transition(SegmentState::Rendered);
            logger.transition(SegmentState::Uploading);

            let destination = RemoteDestination::for_file(&ctx.config.collection, &artifact.path);
            let result = upload_with_retry(
                ctx.uploader.as_ref(),
                &ctx.config.retry,
                &artifact.path,
                &destination,
            )
            .await;

            match result {
                Ok(outcome) => {
                    logger.transition(SegmentState::Uploaded);
                    remove_if_exists(&artifact.path).await;
                    let record = LedgerRecord::new(
                        &segment.label,
                        filename,
                        artifact.duration_seconds,
                        SegmentStatus::Uploaded,
                    )
                    .with_remote(outcome.remote.url_or_id());
                    (SegmentStatus::Uploaded, record)
                }
                Err(e) => {
                    logger.log_upload_failed(e.attempts, &e);
                    if ctx.config.retain_failed_uploads {
                        info!(path = %artifact.path.display(), "Keeping artifact for the next run");
                    } else {
                        remove_if_exists(&artifact.path).await;
                    }
                    let record = LedgerRecord::new(
                        &segment.label,
                        filename,
                        artifact.duration_seconds,
                        SegmentStatus::UploadFailed,
                    );
                    (SegmentStatus::UploadFailed, record)
                }
            }
        }
    };

    record_segment(status);

    match ctx.ledger.append(record).await {
        Ok(()) => logger.log_ledgered(status),
        Err(e) => logger.log_ledger_failed(status, &e),
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpart_models::SegmentCountPolicy;

    #[test]
    fn test_resume_work_set() {
        let plan = plan_segments(200.0, 40.0, SegmentCountPolicy::Ceil, "PART-").unwrap();
        assert_eq!(plan.len(), 5);

        let completed: HashSet<String> = ["PART-1", "PART-2"].iter().map(|s| s.to_string()).collect();
        let work = filter_work_set(plan, &completed);
        let labels: Vec<&str> = work.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["PART-3", "PART-4", "PART-5"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary {
            planned: 4,
            ..RunSummary::default()
        };
        summary.record(SegmentStatus::Uploaded);
        summary.record(SegmentStatus::UploadFailed);
        summary.record(SegmentStatus::FinalizeError);
        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.failed(), 2);
        assert!(summary.to_string().contains("uploaded=1"));
    }
}
