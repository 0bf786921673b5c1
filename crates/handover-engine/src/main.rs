//! Handover Simulation CLI
//!
//! Replays precomputed orbit samples tick by tick through the handover
//! pipeline and writes decisions plus KPIs to a JSON report.
//!
//! Usage:
//!   handover-sim --samples data/orbit_samples.json \
//!                --scenes data/scenes.json --scene ntpu \
//!                --environment urban --seed 42 \
//!                --output handover_report.json

use anyhow::{bail, Result};
use clap::Parser;
use handover_engine::config::{resolve_scene, DEFAULT_SCENE_ID};
use handover_engine::data_access::{
    load_samples, HandoverDataAccess, SampleTable, SnapshotBuilder,
};
use handover_engine::engine::EngineStatus;
use handover_engine::phase::PhaseThresholds;
use handover_engine::{
    DetectorConfig, EngineConfig, Environment, HandoverDecision, HandoverError, HandoverKpis,
    HandoverPhase, HandoverResult, HandoverService, SceneConfig,
};
use link_budget::{
    LinkBudgetConfig, LinkBudgetEstimator, NoFading, RandomSource, ResidualDopplerCompensator,
    SeededGaussian,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "handover-sim",
    about = "Replay LEO orbit samples through the NTN handover decision pipeline"
)]
struct Args {
    /// Orbit samples JSON file
    #[arg(short = 's', long, default_value = "data/orbit_samples.json")]
    samples: PathBuf,

    /// Scene config JSON file (defaults are used when absent)
    #[arg(long)]
    scenes: Option<PathBuf>,

    /// Scene id
    #[arg(long, default_value = DEFAULT_SCENE_ID)]
    scene: String,

    /// Propagation environment: open, urban, mountain, heavy_rain.
    /// Overrides the scene's environment factor.
    #[arg(short, long)]
    environment: Option<Environment>,

    /// Seed for fast/shadow fading
    #[arg(long)]
    seed: Option<u64>,

    /// Disable fading entirely
    #[arg(long, conflicts_with = "seed")]
    no_fading: bool,

    /// Model residual Doppler loss (requires velocities in the samples)
    #[arg(long)]
    doppler: bool,

    /// Rotate the observer by GMST before computing look angles
    #[arg(long)]
    earth_rotation: bool,

    /// Measurement object offset (dB)
    #[arg(long, default_value_t = 0.0)]
    offset_mo: f64,

    /// Cell individual offset (dB)
    #[arg(long, default_value_t = 0.0)]
    cell_offset: f64,

    /// Output JSON report
    #[arg(short, long, default_value = "handover_report.json")]
    output: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    scene: SceneConfig,
    environment: Option<Environment>,
    thresholds: PhaseThresholds,
    satellites: usize,
    ticks: usize,
    ticks_without_data: usize,
    phase_counts: BTreeMap<HandoverPhase, usize>,
    decisions: Vec<HandoverDecision>,
    kpis: HandoverKpis,
    engine: EngineStatus,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "handover_engine=debug,link_budget=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{}", "=".repeat(60));
    info!("LEO NTN Handover Simulator");
    info!("{}", "=".repeat(60));

    let scene = resolve_scene(args.scenes.as_deref(), &args.scene)?;
    let mut site = scene.observer()?;
    if args.earth_rotation {
        site = site.with_earth_rotation();
    }

    let fading: Box<dyn RandomSource> = match (args.no_fading, args.seed) {
        (true, _) => Box::new(NoFading),
        (false, Some(seed)) => Box::new(SeededGaussian::from_seed(seed)),
        (false, None) => Box::new(SeededGaussian::from_entropy()),
    };
    let estimator = LinkBudgetEstimator::new(LinkBudgetConfig::default(), fading)?;

    let mut builder = SnapshotBuilder::new(site, args.environment.unwrap_or_default(), estimator)
        .with_offsets(args.offset_mo, args.cell_offset);
    if args.doppler {
        builder = builder.with_doppler(Box::new(ResidualDopplerCompensator::default()));
    }
    let enhanced_rf = builder.doppler_enhanced();

    let samples = load_samples(&args.samples)?;
    let table = SampleTable::new(samples, builder);
    let ticks = table.timestamps();
    let satellites = table.satellite_count();
    if ticks.is_empty() {
        bail!("No usable orbit samples in {:?}", args.samples);
    }

    let service = HandoverService::new(
        table,
        &scene,
        args.environment,
        EngineConfig::default(),
        DetectorConfig::default(),
        enhanced_rf,
    )?;

    let t = service.thresholds();
    info!(
        "Scene {}: thresholds {:.1}/{:.1}/{:.1}°, {} satellites, {} ticks",
        scene.scene_id,
        t.pre_handover_deg,
        t.execution_deg,
        t.critical_deg,
        satellites,
        ticks.len()
    );

    let mut decisions = Vec::new();
    let mut phase_counts: BTreeMap<HandoverPhase, usize> = BTreeMap::new();
    let mut ticks_without_data = 0;
    let mut pending: Option<HandoverDecision> = None;

    for &tick in &ticks {
        let snapshot = match service.data().get_visible_satellites(tick) {
            Ok(snapshot) => snapshot,
            Err(HandoverError::DataUnavailable(reason)) => {
                warn!("Tick {}: {}", tick, reason);
                ticks_without_data += 1;
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        // Previous decision succeeds if its target is still in view
        if let Some(decision) = pending.take() {
            let visible = snapshot
                .iter()
                .any(|s| Some(&s.satellite_id) == decision.target_satellite.as_ref());
            let result = if visible {
                let interruption_ms = decision.expected_interruption_ms.round() as u32;
                HandoverResult::succeeded(interruption_ms, tick)
            } else {
                HandoverResult::failed("target not visible after handover", tick)
            };
            service.record_result(decision.id(), result);
        }

        if snapshot.is_empty() {
            continue;
        }
        let outcome = service.evaluate_snapshot(tick, &snapshot)?;

        *phase_counts.entry(outcome.phase).or_insert(0) += 1;

        if outcome.decision.is_execute() {
            info!(
                "{} {:?} {} → {} ({})",
                tick,
                outcome.decision.decision_type,
                outcome.decision.source_satellite.as_deref().unwrap_or("-"),
                outcome.decision.target_satellite.as_deref().unwrap_or("-"),
                outcome.decision.reason
            );
            pending = Some(outcome.decision.clone());
            decisions.push(outcome.decision);
        }
    }

    if pending.is_some() {
        info!("Last decision left without a result");
    }

    let report = SimulationReport {
        scene,
        environment: args.environment,
        thresholds: *service.thresholds(),
        satellites,
        ticks: ticks.len(),
        ticks_without_data,
        phase_counts,
        decisions,
        kpis: service.kpis(),
        engine: service.engine_status(),
    };

    info!("\nWriting report to {:?}", args.output);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &report)?;

    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Handover decisions: {}", report.decisions.len());
    info!("Success rate: {:.1}%", report.kpis.success_rate_pct);
    info!("Avg interruption: {:.1} ms", report.kpis.avg_interruption_ms);
    info!("Grade: {:?}", report.kpis.performance_grade);
    for (phase, count) in &report.phase_counts {
        info!("  {:?}: {} ticks", phase, count);
    }

    Ok(())
}
