use crate::types::GravityVec;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

/// Raw accelerometer sample as delivered by the host sensor subsystem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Wall-clock epoch milliseconds
    pub timestamp_ms: i64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self { x, y, z, timestamp_ms }
    }

    pub fn vector(&self) -> GravityVec {
        GravityVec::new(self.x, self.y, self.z)
    }

    pub fn magnitude(&self) -> f64 {
        self.vector().norm()
    }
}

/// Push accelerometer samples into `tx` at a fixed tick until the receiver closes.
///
/// Samples come from `termux-sensor` when it is installed, otherwise from a
/// synthetic riding profile. A full channel drops the sample.
pub async fn accel_loop(tx: Sender<AccelSample>, tick: Duration) {
    let mut interval = interval(tick);
    let mut sample_count = 0u64;
    let mut use_termux = true;

    loop {
        interval.tick().await;

        let sample = match use_termux.then(read_accelerometer).flatten() {
            Some(data) => data,
            None => {
                if use_termux {
                    log::warn!("[accel] termux-sensor unavailable, using synthetic samples");
                    use_termux = false;
                }
                mock_accel_data(tick)
            }
        };

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    log::debug!("[accel] {} samples", sample_count);
                }
            }
            Err(TrySendError::Closed(_)) => {
                log::info!("[accel] Channel closed after {} samples", sample_count);
                break;
            }
            Err(TrySendError::Full(_)) => {}
        }
    }
}

fn read_accelerometer() -> Option<AccelSample> {
    match Command::new("termux-sensor")
        .arg("-n")
        .arg("1")
        .arg("-s")
        .arg("accelerometer")
        .output()
    {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            parse_accel_output(&text, Utc::now().timestamp_millis())
        }
        _ => None,
    }
}

/// Parse `x=.., y=.., z=..` sensor text; all three components are required.
pub fn parse_accel_output(output: &str, timestamp_ms: i64) -> Option<AccelSample> {
    let mut x = None;
    let mut y = None;
    let mut z = None;

    for part in output.split(',') {
        let part = part.trim();
        let part = part.rsplit(' ').next().unwrap_or(part);
        if let Some(val_str) = part.strip_prefix("x=") {
            x = Some(val_str.trim().parse().ok()?);
        } else if let Some(val_str) = part.strip_prefix("y=") {
            y = Some(val_str.trim().parse().ok()?);
        } else if let Some(val_str) = part.strip_prefix("z=") {
            z = Some(val_str.trim().parse().ok()?);
        }
    }

    Some(AccelSample::new(x?, y?, z?, timestamp_ms))
}

/// Synthetic portrait-pitch ride: a 2 s, ~35° lift every 10 s on top of
/// engine vibration.
fn mock_accel_data(tick: Duration) -> AccelSample {
    use std::f64::consts::PI;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * tick.as_secs_f64();

    let phase = t % 10.0;
    let lift_deg = if (6.0..8.0).contains(&phase) {
        35.0 * ((phase - 6.0) * PI / 2.0).sin()
    } else {
        0.0
    };
    let pitch = (5.0 + lift_deg).to_radians();
    let vibration = (t * 2.0 * PI * 23.0).sin() * 0.6;
    let g = 9.81;

    AccelSample {
        x: (t * 2.0 * PI * 17.0).cos() * 0.3,
        y: g * pitch.sin() + vibration,
        z: -g * pitch.cos() + vibration * 0.5,
        timestamp_ms: Utc::now().timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_magnitude() {
        let accel = AccelSample::new(3.0, 4.0, 0.0, 0);
        assert_eq!(accel.magnitude(), 5.0);
    }

    #[test]
    fn test_parse_termux_line() {
        let text = "Accelerometer event: x=0.5, y=0.25, z=9.8, accuracy=0";
        let sample = parse_accel_output(text, 42).unwrap();
        assert_eq!(sample.x, 0.5);
        assert_eq!(sample.y, 0.25);
        assert_eq!(sample.z, 9.8);
        assert_eq!(sample.timestamp_ms, 42);
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert!(parse_accel_output("x=1.0, y=2.0", 0).is_none());
        assert!(parse_accel_output("x=1.0, y=abc, z=3.0", 0).is_none());
    }

    #[tokio::test]
    async fn test_accel_loop_stops_when_receiver_dropped() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let handle = tokio::spawn(accel_loop(tx, Duration::from_millis(1)));
        let first = rx.recv().await;
        assert!(first.is_some());
        drop(rx);
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("loop should exit")
            .unwrap();
    }
}
