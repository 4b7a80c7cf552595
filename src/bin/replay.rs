use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::json;

use wheelie_tracker::{
    AccelSample, CompletedWheelie, MeasurementAxis, MemoryStore, ScreenOrientation,
    SmoothingProfile, TiltTracker, TrackerConfig,
};

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recording (*.json or *.json.gz)
    #[arg(long, conflicts_with = "dir")]
    log: Option<PathBuf>,

    /// Directory of recordings to batch replay
    #[arg(long)]
    dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "pitch")]
    axis: MeasurementAxis,

    #[arg(long, value_enum, default_value = "portrait")]
    orientation: ScreenOrientation,

    #[arg(long, value_enum, default_value = "balanced")]
    profile: SmoothingProfile,

    /// Explicit low-pass alpha (overrides profile)
    #[arg(long)]
    alpha: Option<f64>,

    /// Tare on the first sample, like the app's auto-tare after start
    #[arg(long, default_value_t = false)]
    tare_first: bool,
}

#[derive(Deserialize)]
struct Recording {
    samples: Vec<AccelSample>,
}

fn load_recording(path: &Path) -> anyhow::Result<Recording> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn run_once(path: &Path, args: &Args) -> anyhow::Result<serde_json::Value> {
    let recording = load_recording(path)?;
    let config = TrackerConfig {
        profile: args.profile,
        alpha: args.alpha,
        axis: args.axis,
        orientation: args.orientation,
        ..Default::default()
    };
    config.validate()?;

    let mut tracker = TiltTracker::new(&config, MemoryStore::new());
    let start_ms = recording.samples.first().map(|s| s.timestamp_ms).unwrap_or(0);
    let end_ms = recording.samples.last().map(|s| s.timestamp_ms).unwrap_or(start_ms);
    tracker.start(start_ms)?;

    let mut wheelies: Vec<CompletedWheelie> = Vec::new();
    let mut last_count = 0u32;
    let mut min_angle = f64::INFINITY;
    let mut max_angle = f64::NEG_INFINITY;

    for (i, sample) in recording.samples.iter().enumerate() {
        let snap = tracker.process_sample(sample);
        if i == 0 && args.tare_first {
            tracker.tare()?;
        }
        if snap.wheelie_count > last_count {
            wheelies.extend(snap.last_wheelie);
        }
        last_count = snap.wheelie_count;
        let angle = tracker.snapshot().angle_deg;
        min_angle = min_angle.min(angle);
        max_angle = max_angle.max(angle);
    }

    if let Some(w) = tracker.stop(end_ms)? {
        wheelies.push(w);
    }
    let record = tracker.new_session(end_ms);
    let (min_angle, max_angle) = if min_angle.is_finite() {
        (min_angle, max_angle)
    } else {
        (0.0, 0.0)
    };

    Ok(json!({
        "log": path.display().to_string(),
        "axis": args.axis,
        "orientation": args.orientation,
        "alpha": config.alpha(),
        "samples": recording.samples.len(),
        "span_ms": end_ms - start_ms,
        "min_angle": min_angle,
        "max_angle": max_angle,
        "wheelies": wheelies,
        "session": record,
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let mut results = Vec::new();

    if let Some(dir) = args.dir.as_ref() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !(name.ends_with(".json") || name.ends_with(".json.gz")) {
                continue;
            }
            match run_once(&path, &args) {
                Ok(res) => results.push(res),
                Err(e) => log::error!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &args)?);
    } else {
        anyhow::bail!("Provide --log or --dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
