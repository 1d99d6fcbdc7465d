use std::sync::mpsc;

use intersection_sim::{ControlMode, Settings, Simulation};

/// The simulated time per frame, in s.
const FRAME_SEC: f64 = 1.0 / 60.0;

/// The simulated duration of each run, in s.
const RUN_SEC: f64 = 600.0;

fn main() {
    env_logger::init();

    let base = match std::env::args().nth(1) {
        Some(path) => match load_settings(&path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("{}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => Settings {
            seed: Some(1),
            ..Default::default()
        },
    };

    println!("Simulating {:.0} s per mode...", RUN_SEC);
    for mode in [ControlMode::Fixed, ControlMode::Adaptive] {
        let settings = Settings {
            mode,
            ..base.clone()
        };
        let (tx, rx) = mpsc::channel();
        let mut sim = Simulation::new(settings);
        sim.set_completion_handler(move |event| {
            let _ = tx.send(event.total_wait);
        });

        let frames = (RUN_SEC / FRAME_SEC).round() as usize;
        for _ in 0..frames {
            sim.step(FRAME_SEC);
        }

        let waits: Vec<f64> = rx.try_iter().collect();
        let mean = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<f64>() / waits.len() as f64
        };
        let max = waits.iter().copied().fold(0.0, f64::max);
        println!(
            "{:?}: {} completed, mean wait {:.2} s, max wait {:.2} s, {} still in progress",
            mode,
            waits.len(),
            mean,
            max,
            sim.vehicle_count(),
        );
    }
}

fn load_settings(path: &str) -> Result<Settings, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(Settings::from_json(&json)?)
}
