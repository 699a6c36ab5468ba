use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CONDITIONS: [&str; 4] = ["control", "identical", "related", "unrelated"];
const SOAS: [i64; 4] = [0, 50, 100, 150];
const TRIALS_PER_PARTICIPANT: u32 = 48;

const HEADER: [&str; 13] = [
    "subject",
    "trial",
    "exclude",
    "condition",
    "soa",
    "onset_dur",
    "log_onset_dur",
    "the_dur",
    "log_the_dur",
    "object_dur",
    "log_object_dur",
    "action_dur",
    "log_action_dur",
];

/// Condition effect on naming onset, in ms.
fn priming_effect(condition: &str) -> f64 {
    match condition {
        "identical" => -40.0,
        "related" => -15.0,
        "unrelated" => 10.0,
        _ => 0.0,
    }
}

/// Uniform noise in `[-spread, spread)`.
fn noise(rng: &mut StdRng, spread: f64) -> f64 {
    rng.gen_range(-spread..spread)
}

fn duration_pair(value: f64) -> [String; 2] {
    [format!("{value:.1}"), format!("{:.4}", value.ln())]
}

fn main() {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    let mut rng = StdRng::seed_from_u64(42);
    let mut total_rows = 0usize;

    for exp in 1..=8u32 {
        let participants = if exp <= 4 { 35 } else { 39 };
        let dir = out_dir.join(format!("Exp{exp}"));
        std::fs::create_dir_all(&dir).expect("Failed to create experiment directory");
        let path = dir.join(format!("dissexp{exp}r.txt"));

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .expect("Failed to create output file");

        // Experiment 1 was exported with a stray space in the subject header.
        let mut header = HEADER.map(String::from);
        if exp == 1 {
            header[0] = "subject ".to_string();
        }
        writer.write_record(&header).expect("Failed to write header");

        for subject in 1..=participants {
            // Experiment 8 has no participant 38.
            if exp == 8 && subject == 38 {
                continue;
            }
            let speed = 520.0 + noise(&mut rng, 60.0);
            let practice = 0.8 + noise(&mut rng, 0.5);

            for trial in 1..=TRIALS_PER_PARTICIPANT {
                let condition = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
                let soa = SOAS[rng.gen_range(0..SOAS.len())];
                let exclude = u8::from(rng.gen_bool(0.08));

                let onset = speed - practice * trial as f64
                    + priming_effect(condition)
                    + noise(&mut rng, 45.0);
                let the = 110.0 + noise(&mut rng, 25.0);
                let object = 380.0 + noise(&mut rng, 70.0);
                let action = 420.0 + noise(&mut rng, 80.0);

                let mut durations: Vec<String> = [onset, the, object, action]
                    .into_iter()
                    .flat_map(duration_pair)
                    .collect();
                // Praat occasionally failed to mark a boundary.
                if rng.gen_bool(0.03) {
                    let slot = rng.gen_range(0..durations.len() / 2) * 2;
                    durations[slot] = "--undefined--".to_string();
                    durations[slot + 1] = "--undefined--".to_string();
                }

                let mut record = vec![
                    subject.to_string(),
                    trial.to_string(),
                    exclude.to_string(),
                    condition.to_string(),
                    soa.to_string(),
                ];
                record.extend(durations);
                writer.write_record(&record).expect("Failed to write row");
                total_rows += 1;
            }
        }
        writer.flush().expect("Failed to flush output file");
        println!("Wrote {}", path.display());
    }

    println!(
        "Wrote {total_rows} rows for 8 experiments under {}",
        out_dir.display()
    );
}
