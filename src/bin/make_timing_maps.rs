//! Timing Map Binary - HBHE channel timing monitoring
//!
//! Reads reconstructed hits from a JSONL stream, accumulates per-channel timing
//! distributions, per-depth timing profiles, occupancy maps, energy spectra and
//! phi-column correlations, then writes every map to the configured store.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin make_timing_maps -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - HBHE_ENERGY_THRESHOLD - Minimum rechit energy for the timing maps (required)
//! - HBHE_TIME_LOW / HBHE_TIME_HIGH - Value range of the timing profiles in ns (required)
//! - HBHE_TARGET_RUN - Only process this run (optional)
//! - HBHE_SOURCE_LABEL - Rechit collection to read (default: hbhereco)
//! - HBHE_INPUT_PATH - Rechit JSONL stream (default: data/rechits.jsonl)
//! - HBHE_OUTPUT_PATH - Output directory (JSONL) or database file (SQLite)
//! - HBHE_DIAGNOSTIC_ENERGY - Capture pulse shapes above this energy (optional)
//! - RUST_LOG - Logging level (optional, default: info)

use hbhe_timing::timing_core::{EventReader, HistogramWriter};
use hbhe_timing::{BackendType, TimingConfig, TimingJob};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config = TimingConfig::from_env(BackendType::from_args(&args))?;

    log::info!("🚀 Starting HBHE timing maps");
    log::info!("   Input: {}", config.input_path.display());
    log::info!("   Source label: {}", config.source_label);
    log::info!("   Output: {}", config.output_path.display());
    log::info!("   Energy threshold: {} GeV", config.energy_threshold);
    log::info!(
        "   Profile time range: [{}, {}] ns",
        config.time_range_low,
        config.time_range_high
    );
    match config.target_run_number {
        Some(run) => log::info!("   Target run: {}", run),
        None => log::info!("   Target run: all"),
    }

    let mut reader = EventReader::open(&config.input_path, config.source_label.clone()).await?;
    let mut writer = HistogramWriter::new(config.backend, config.output_path.clone())?;
    log::info!("📊 Backend: {}", writer.backend_type());

    let mut job = TimingJob::new(&config);
    job.run(&mut reader).await?;

    let summary = job.summary();
    log::info!(
        "✅ Processed {} of {} events ({} skipped by run filter)",
        summary.stats.events_processed,
        summary.stats.events_seen,
        summary.stats.events_skipped_run
    );
    log::info!(
        "   Rechits: {} ({} above threshold, {} invalid channels)",
        summary.stats.measurements,
        summary.stats.above_threshold,
        summary.stats.invalid_channels
    );
    log::info!(
        "   Timing windows: IT={} OOT1={} OOT2={}",
        summary.stats.in_time,
        summary.stats.out_of_time_1,
        summary.stats.out_of_time_2
    );
    log::info!(
        "   Phi correlations: {} within iphi 67, {} across 66/67",
        summary.stats.within_pairs,
        summary.stats.cross_pairs
    );
    if summary.malformed_lines > 0 || summary.foreign_records > 0 {
        log::warn!(
            "   Skipped {} malformed lines, {} records from other collections",
            summary.malformed_lines,
            summary.foreign_records
        );
    }

    job.write(&mut writer).await?;
    log::info!("   Channels with timing data: {}", summary.booked_channels);

    Ok(())
}
