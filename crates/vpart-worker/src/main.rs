//! Segment pipeline binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpart_ledger::{FileLedger, Ledger, SheetsLedger};
use vpart_media::{check_ffmpeg, check_ffprobe, FfmpegRenderer, FfprobeProber, Prober};
use vpart_storage::{R2Client, R2Uploader};
use vpart_worker::{LedgerBackend, Orchestrator, PipelineConfig};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vpart=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn exit_with(message: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", message, e);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    // TLS for the R2 and Sheets clients; an already-installed provider is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vpart-worker");

    let prometheus = match std::env::var("VPART_METRICS").as_deref() {
        Ok("1") | Ok("true") => match vpart_worker::metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{}", e);
                None
            }
        },
        _ => None,
    };

    if let Err(e) = check_ffmpeg() {
        exit_with("FFmpeg preflight failed", e);
    }
    if let Err(e) = check_ffprobe() {
        exit_with("FFprobe preflight failed", e);
    }

    let config = PipelineConfig::from_env().unwrap_or_else(|e| exit_with("Invalid configuration", e));
    info!(
        input = %config.input.display(),
        output_dir = %config.output_dir.display(),
        segment_seconds = config.segment_seconds,
        policy = %config.count_policy,
        concurrency = config.concurrency,
        ledger = %config.ledger,
        "Pipeline config loaded"
    );

    let prober: Arc<dyn Prober> = Arc::new(FfprobeProber::new());

    let mut renderer = FfmpegRenderer::new(
        config.transform.clone(),
        config.output_dir.clone(),
        Arc::clone(&prober),
    )
    .with_reuse_existing(config.retain_failed_uploads);
    if let Some(secs) = config.render_timeout_secs {
        renderer = renderer.with_timeout(secs);
    }

    let r2 = R2Client::from_env().unwrap_or_else(|e| exit_with("Failed to create R2 client", e));
    let uploader = R2Uploader::new(r2);

    let ledger: Arc<dyn Ledger> = match config.ledger {
        LedgerBackend::Sheets => Arc::new(
            SheetsLedger::from_env()
                .unwrap_or_else(|e| exit_with("Failed to create Sheets ledger", e)),
        ),
        LedgerBackend::File => Arc::new(FileLedger::new(config.ledger_file.clone())),
    };

    let orchestrator = Orchestrator::new(
        config,
        prober,
        Arc::new(renderer),
        Arc::new(uploader),
        ledger,
    );

    match orchestrator.run().await {
        Ok(summary) => {
            info!(
                planned = summary.planned,
                skipped = summary.skipped,
                uploaded = summary.uploaded,
                upload_failed = summary.upload_failed,
                render_error = summary.render_error,
                finalize_error = summary.finalize_error,
                ledger_write_failures = summary.ledger_write_failures,
                "Run complete"
            );
        }
        Err(e) => exit_with("Run aborted", e),
    }

    if let Some(handle) = prometheus {
        info!("Metrics snapshot:\n{}", handle.render());
    }
}
