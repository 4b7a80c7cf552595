use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Duration, Instant};

use wheelie_tracker::live_status::LiveStatus;
use wheelie_tracker::sensors::{self, AccelSample};
use wheelie_tracker::{
    HistoryStore, JsonFileStore, MeasurementAxis, ScreenOrientation, SmoothingProfile,
    TiltTracker, TrackerConfig, TrackerError,
};

#[derive(Parser, Debug)]
#[command(name = "wheelie_tracker")]
#[command(about = "Tilt angle and wheelie tracking from a phone accelerometer", long_about = None)]
struct Args {
    /// Duration in seconds (0 = until `quit` or Ctrl-C)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    axis: Option<MeasurementAxis>,

    #[arg(long, value_enum)]
    orientation: Option<ScreenOrientation>,

    #[arg(long, value_enum)]
    profile: Option<SmoothingProfile>,

    /// Explicit low-pass alpha in (0, 1]
    #[arg(long)]
    alpha: Option<f64>,

    /// Session history file
    #[arg(long)]
    history: Option<PathBuf>,

    /// Output directory for live status files
    #[arg(long, default_value = "wheelie_sessions")]
    output_dir: PathBuf,

    /// Do not tare automatically after start
    #[arg(long)]
    no_auto_tare: bool,
}

/// Console commands, one per line on stdin
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Start,
    Stop,
    Tare,
    ResetTare,
    Axis(MeasurementAxis),
    Orientation(ScreenOrientation),
    NewSession,
    History,
    ClearHistory,
    Quit,
}

enum Flow {
    Continue,
    ScheduleTare,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "tare" | "t" => Some(Command::Tare),
        "reset" | "reset-tare" => Some(Command::ResetTare),
        "pitch" => Some(Command::Axis(MeasurementAxis::Pitch)),
        "roll" => Some(Command::Axis(MeasurementAxis::Roll)),
        "portrait" => Some(Command::Orientation(ScreenOrientation::Portrait)),
        "landscape" => Some(Command::Orientation(ScreenOrientation::Landscape)),
        "new" | "new-session" => Some(Command::NewSession),
        "history" | "h" => Some(Command::History),
        "clear-history" => Some(Command::ClearHistory),
        "quit" | "q" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(cmd) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            None => log::warn!("Unknown command: {}", line.trim()),
        }
    }
}

fn load_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(axis) = args.axis {
        config.axis = axis;
    }
    if let Some(orientation) = args.orientation {
        config.orientation = orientation;
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if args.alpha.is_some() {
        config.alpha = args.alpha;
    }
    if let Some(history) = args.history.as_ref() {
        config.history_path = history.clone();
    }
    config.validate()?;
    Ok(config)
}

fn apply_command(tracker: &mut TiltTracker<JsonFileStore>, cmd: Command) -> Result<Flow> {
    let now = now_ms();
    match cmd {
        Command::Start => {
            tracker.start(now)?;
            return Ok(Flow::ScheduleTare);
        }
        Command::Stop => {
            if let Some(w) = tracker.stop(now)? {
                log::info!(
                    "Closed open wheelie: {:.1}° for {} ms",
                    w.max_angle_deg,
                    w.duration_ms
                );
            }
        }
        Command::Tare => tracker.tare()?,
        Command::ResetTare => tracker.reset_tare(),
        Command::Axis(axis) => tracker.set_axis(axis),
        Command::Orientation(orientation) => tracker.set_orientation(orientation),
        Command::NewSession => match tracker.new_session(now) {
            Some(record) => log::info!(
                "Session saved: {} wheelies, max {:.1}°, {}",
                record.wheelie_count,
                record.max_angle_deg,
                record.formatted_duration()
            ),
            None => log::info!("Session discarded (nothing past threshold)"),
        },
        Command::History => {
            for record in tracker.history().iter().rev() {
                println!(
                    "{}  {:>3} wheelies  max {:>5.1}°  {}",
                    record.formatted_date(),
                    record.wheelie_count,
                    record.max_angle_deg,
                    record.formatted_duration()
                );
            }
        }
        Command::ClearHistory => tracker.clear_history()?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Delayed tare after start. Returns a new deadline while no sample has arrived yet.
fn auto_tare<S: HistoryStore>(
    tracker: &mut TiltTracker<S>,
    retry: Duration,
) -> Option<Instant> {
    if !tracker.is_running() {
        return None;
    }
    match tracker.tare() {
        Ok(()) => None,
        Err(TrackerError::NoReading) => {
            log::debug!("No reading yet, retrying auto-tare");
            Some(Instant::now() + retry)
        }
        Err(e) => {
            log::warn!("Auto-tare: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!("Wheelie Tracker starting");
    log::info!("  Axis: {} / {}", config.axis, config.orientation);
    log::info!("  Alpha: {}", config.alpha());
    log::info!("  History: {}", config.history_path.display());
    log::info!("  Output Dir: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let store = JsonFileStore::with_cap(&config.history_path, config.history_cap);
    let mut tracker = TiltTracker::new(&config, store);
    log::info!("Loaded {} saved sessions", tracker.history().len());

    let (accel_tx, mut accel_rx) = mpsc::channel::<AccelSample>(500);
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
    let _accel_handle = tokio::spawn(sensors::accel_loop(
        accel_tx,
        Duration::from_millis(config.sample_interval_ms),
    ));
    let _cmd_handle = tokio::spawn(read_commands(cmd_tx));

    let tare_delay = Duration::from_millis(config.tare_delay_ms);
    let start = Instant::now();
    let deadline = (args.duration > 0).then(|| start + Duration::from_secs(args.duration));
    let far_future = start + Duration::from_secs(86_400 * 365);

    tracker.start(now_ms())?;
    let mut tare_at = (!args.no_auto_tare).then(|| Instant::now() + tare_delay);

    let mut status_tick = interval(Duration::from_secs(config.status_interval_secs.max(1)));
    let status_path = args.output_dir.join("live_status.json");
    let mut samples_received = 0u64;
    let mut last_count = 0u32;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(sample) = accel_rx.recv() => {
                samples_received += 1;
                let snap = tracker.process_sample(&sample);
                if snap.wheelie_count > last_count {
                    if let Some(w) = snap.last_wheelie {
                        log::info!(
                            "Wheelie #{}: max {:.1}°, {} ms",
                            snap.wheelie_count, w.max_angle_deg, w.duration_ms
                        );
                    }
                }
                last_count = snap.wheelie_count;
            }
            Some(cmd) = cmd_rx.recv() => {
                match apply_command(&mut tracker, cmd) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::ScheduleTare) => {
                        if !args.no_auto_tare {
                            tare_at = Some(Instant::now() + tare_delay);
                        }
                    }
                    Ok(Flow::Quit) => break,
                    Err(e) => log::warn!("{:?}: {}", cmd, e),
                }
                last_count = tracker.snapshot().wheelie_count;
            }
            _ = sleep_until(tare_at.unwrap_or(far_future)), if tare_at.is_some() => {
                tare_at = auto_tare(&mut tracker, tare_delay);
            }
            _ = status_tick.tick() => {
                let status = LiveStatus::new(
                    tracker.snapshot(),
                    samples_received,
                    start.elapsed().as_secs(),
                    tracker.history().len(),
                );
                if let Err(e) = status.save(&status_path) {
                    log::warn!("Failed to write {}: {}", status_path.display(), e);
                }
            }
            _ = sleep_until(deadline.unwrap_or(far_future)), if deadline.is_some() => {
                log::info!("Duration reached, stopping...");
                break;
            }
            _ = &mut ctrl_c => {
                log::info!("Interrupted, stopping...");
                break;
            }
        }
    }

    let final_snapshot = {
        let saved = tracker.suspend(now_ms());
        if let Some(record) = saved {
            log::info!(
                "Session saved: {} wheelies, max {:.1}°, {}",
                record.wheelie_count,
                record.max_angle_deg,
                record.formatted_duration()
            );
        }
        tracker.snapshot()
    };

    let final_status = LiveStatus::new(
        final_snapshot,
        samples_received,
        start.elapsed().as_secs(),
        tracker.history().len(),
    );
    final_status
        .save(&args.output_dir.join("live_status_final.json"))
        .context("writing final status")?;

    println!("\n=== Final Stats ===");
    println!("Samples received: {}", samples_received);
    println!("Saved sessions: {}", tracker.history().len());
    if let Some(last) = tracker.history().last() {
        println!(
            "Last session: {} wheelies, max {:.1}°, {}",
            last.wheelie_count,
            last.max_angle_deg,
            last.formatted_duration()
        );
    }

    Ok(())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(" TARE "), Some(Command::Tare));
        assert_eq!(parse_command("roll"), Some(Command::Axis(MeasurementAxis::Roll)));
        assert_eq!(
            parse_command("landscape"),
            Some(Command::Orientation(ScreenOrientation::Landscape))
        );
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("wheelie"), None);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "wheelie_tracker",
            "--axis",
            "roll",
            "--profile",
            "smooth",
            "--history",
            "/tmp/h.json",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.axis, MeasurementAxis::Roll);
        assert_eq!(config.alpha(), 0.05);
        assert_eq!(config.history_path, PathBuf::from("/tmp/h.json"));
    }

    #[test]
    fn test_auto_tare_waits_for_first_sample() {
        let mut tracker = TiltTracker::in_memory();
        assert!(auto_tare(&mut tracker, Duration::from_millis(300)).is_none());

        tracker.start(0).unwrap();
        assert!(auto_tare(&mut tracker, Duration::from_millis(300)).is_some());
        assert!(!tracker.snapshot().is_tared);

        tracker.process_sample(&AccelSample::new(0.0, 3.0, -9.3, 20));
        assert!(auto_tare(&mut tracker, Duration::from_millis(300)).is_none());
        let snap = tracker.snapshot();
        assert!(snap.is_tared);
        assert_eq!(snap.angle_deg, 0.0);
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let args = Args::parse_from(["wheelie_tracker", "--alpha", "2.0"]);
        assert!(load_config(&args).is_err());
    }
}
