//! Session console: drives a CoachSession with synthetic landmark frames.
//!
//! Lets you exercise the whole evaluation → counting → audio pipeline from a
//! terminal without a camera or a pose model. Frames are synthesized so that
//! both body sides produce the requested joint angle.

use anyhow::Result;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use talava_coach::config::Config;
use talava_coach::exercise::ExerciseKind;
use talava_coach::pose::{Joint, Landmark, LandmarkFrame};
use talava_coach::session::CoachSession;

const CONFIG_PATH: &str = "coach.toml";

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/coach_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Synthetic frames
// ---------------------------------------------------------------------------

/// Build a frame whose diagnostic chains form the given angle on both sides.
/// The mid joint sits at (x, 0.5), the lower joint straight below it, and the
/// upper joint rotated so the interior angle at the mid joint is `angle_deg`.
fn synth_frame(exercise: ExerciseKind, angle_deg: f32, min_confidence: f32) -> LandmarkFrame {
    let chains: [([Joint; 3], f32); 2] = match exercise {
        ExerciseKind::Squat => [
            ([Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle], 0.4),
            ([Joint::RightHip, Joint::RightKnee, Joint::RightAnkle], 0.6),
        ],
        ExerciseKind::Pushup | ExerciseKind::BicepCurl => [
            ([Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist], 0.4),
            ([Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist], 0.6),
        ],
    };

    let rad = angle_deg.to_radians();
    let mut detections = Vec::new();
    for ([top, mid, bottom], x) in chains {
        detections.push((top, Landmark::new(x + 0.2 * rad.sin(), 0.5 + 0.2 * rad.cos(), 0.95)));
        detections.push((mid, Landmark::new(x, 0.5, 0.95)));
        detections.push((bottom, Landmark::new(x, 0.7, 0.95)));
    }
    LandmarkFrame::from_detections(detections, min_confidence)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file()?;

    log!(logfile, "=== Talava Coach - Session Console ({}) ===", env!("GIT_VERSION"));
    log!(
        logfile,
        "[config] exercise={}, form_required={}, min_confidence={}",
        config.exercise.name(),
        config.form_required,
        config.min_confidence
    );
    println!();
    println!("Commands:");
    println!("  f <angle> [...]  - feed frames with the given joint angle(s)");
    println!("  n                - feed an empty frame (no person)");
    println!("  e <exercise>     - switch exercise (squat / pushup / bicep_curl)");
    println!("  form <on|off>    - toggle the form requirement");
    println!("  s                - print session statistics");
    println!("  r                - reset the counter");
    println!("  q                - quit");
    println!();

    let min_confidence = config.min_confidence;
    let mut session = CoachSession::new(&config);
    session.start();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "f" if parts.len() >= 2 => {
                for raw in &parts[1..] {
                    let angle: f32 = match raw.parse() {
                        Ok(a) => a,
                        Err(_) => {
                            println!("not an angle: {}", raw);
                            continue;
                        }
                    };
                    let frame = synth_frame(session.exercise(), angle, min_confidence);
                    let report = session.process_frame(&frame);
                    log!(
                        logfile,
                        "[frame] angle={:.1} phase={:?} correct={} count={}",
                        report.evaluation.primary_angle,
                        report.evaluation.phase,
                        report.evaluation.correct,
                        report.status.count
                    );
                    if report.status.rep_completed {
                        log!(logfile, "[rep] completed #{}", report.status.count);
                    }
                }
            }
            "n" => {
                let report = session.process_frame(&LandmarkFrame::empty());
                log!(
                    logfile,
                    "[frame] empty phase={:?} feedback={}",
                    report.evaluation.phase,
                    report.evaluation.feedback
                );
            }
            "e" if parts.len() == 2 => match ExerciseKind::from_str(parts[1]) {
                Ok(kind) => {
                    session.switch_exercise(kind);
                    log!(logfile, "[exercise] switched to {}", kind.name());
                }
                Err(e) => println!("{}", e),
            },
            "form" if parts.len() == 2 => match parts[1] {
                "on" => {
                    session.set_form_requirement(true);
                    log!(logfile, "[form] required");
                }
                "off" => {
                    session.set_form_requirement(false);
                    log!(logfile, "[form] not required");
                }
                other => println!("expected on|off, got {}", other),
            },
            "s" => {
                let stats = session.statistics();
                log!(logfile, "{}", serde_json::to_string_pretty(&stats)?);
            }
            "r" => {
                session.reset();
                log!(logfile, "[counter] reset");
            }
            "q" => break,
            other => {
                println!("unknown command: {}", other);
            }
        }
    }

    session.shutdown_audio();
    Ok(())
}
