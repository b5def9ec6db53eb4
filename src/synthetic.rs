use chrono::{Duration, NaiveDateTime};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{EngagementRecord, SensorReading};

const FEEDBACK_BY_LEVEL: [&[&str]; 3] = [
    &[
        "Your focus seems low. Consider improving EEG and monitoring your HeartRate.",
        "Low engagement was detected. Try managing your SkinConductance and EEG.",
        "This session felt boring.",
    ],
    &[
        "Moderate focus detected. Improving your EEG may boost engagement.",
        "You're doing okay. For better focus, monitor HeartRate and SkinConductance.",
    ],
    &[
        "Excellent engagement! Keep maintaining your EEG and HeartRate.",
        "Great job! Your EEG levels indicate strong focus.",
    ],
];

pub fn generate_synthetic_history(
    student_id: &str,
    count: usize,
    seed: u64,
    start: NaiveDateTime,
) -> Vec<EngagementRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level: i64 = rng.gen_range(0..=2);
    let mut history = Vec::with_capacity(count);

    for idx in 0..count {
        let step: f64 = rng.gen();
        if step < 0.25 {
            level = (level - 1).max(0);
        } else if step > 0.75 {
            level = (level + 1).min(2);
        }

        let reading = sample_reading(&mut rng, level);
        let timestamp = start + Duration::hours(idx as i64);
        let mut record = EngagementRecord::new(timestamp, reading, level).with_student_id(student_id);
        record.id = Some(format!("synthetic_{}", idx));

        if rng.gen::<f64>() < 0.6 {
            let options = FEEDBACK_BY_LEVEL[level as usize];
            record.feedback = Some(options[rng.gen_range(0..options.len())].to_string());
        }

        history.push(record);
    }

    history
}

fn sample_reading(rng: &mut StdRng, level: i64) -> SensorReading {
    // higher engagement skews toward calmer heart rate and stronger alpha
    let bias = level as f64 / 2.0;
    let heart_rate = rng.gen_range(45.0..95.0) - 10.0 * bias;
    let skin_conductance = rng.gen_range(0.5..12.0);
    let eeg = rng.gen_range(4.0..14.0) + 4.0 * bias;
    SensorReading::new(round2(heart_rate), round2(skin_conductance), round2(eeg))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn same_seed_same_history() {
        let first = generate_synthetic_history("S-1", 24, 7, start());
        let second = generate_synthetic_history("S-1", 24, 7, start());
        assert_eq!(first, second);
    }

    #[test]
    fn readings_are_accepted_by_the_service() {
        let history = generate_synthetic_history("S-1", 200, 11, start());
        assert_eq!(history.len(), 200);
        for record in &history {
            assert!(record.input_data.is_valid(), "{:?}", record.input_data);
            assert!((0..=2).contains(&record.predicted_engagement_level));
        }
    }

    #[test]
    fn history_is_hourly_and_ordered() {
        let history = generate_synthetic_history("S-1", 5, 3, start());
        for pair in history.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::hours(1));
        }
    }
}
