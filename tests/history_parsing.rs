use chrono::Timelike;
use focus_monitor::history::{format_record_line, load_history, parse_history_csv, parse_history_json, HistoryError};
use focus_monitor::{summarize, EngagementLevel, Severity, SuggestionRule};

const BACKEND_SAMPLE: &str = r#"[
  {
    "_id": "665f1c2ab0e4",
    "student_id": 1042,
    "timestamp": "2024-05-02T14:05:09.123456",
    "input_data": {"HeartRate": 61.2, "SkinConductance": 4.5, "EEG": 9.1},
    "predicted_engagement_level": 0,
    "feedback": "Honestly this was boring.",
    "top_features": ["EEG", "HeartRate"],
    "severities": {"EEG": "mild", "HeartRate": "normal"},
    "user_id": "should be ignored"
  },
  {
    "_id": "665f1c2ab0e5",
    "student_id": "S-7",
    "timestamp": "2024-05-02T15:10:00",
    "input_data": {"HeartRate": 70, "SkinConductance": 3, "EEG": 12},
    "predicted_engagement_level": 2.0,
    "feedback": null
  },
  {
    "timestamp": "2024-05-03T09:00:00",
    "input_data": {"HeartRate": 55, "SkinConductance": 1.5, "EEG": 6},
    "predicted_engagement_level": 4
  }
]"#;

#[test]
fn backend_payload_decodes_with_extra_fields() {
    let records = parse_history_json(BACKEND_SAMPLE).unwrap();
    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first.id.as_deref(), Some("665f1c2ab0e4"));
    assert_eq!(first.student_id.as_deref(), Some("1042"));
    assert_eq!(first.timestamp.hour(), 14);
    assert_eq!(first.input_data.heart_rate, 61.2);
    assert_eq!(first.top_features, vec!["EEG".to_string(), "HeartRate".to_string()]);
    assert_eq!(first.severities.get("EEG"), Some(&Severity::Mild));

    assert_eq!(records[1].predicted_engagement_level, 2);
    assert!(records[1].feedback.is_none());
    assert!(records[2].student_id.is_none());
    assert_eq!(records[2].level(), EngagementLevel::Unknown);
}

#[test]
fn empty_payload_is_empty_history() {
    assert!(parse_history_json("").unwrap().is_empty());
    assert!(parse_history_json("[]").unwrap().is_empty());
    assert!(matches!(parse_history_json("{\"error\": 1}"), Err(HistoryError::Json(_))));
}

#[test]
fn csv_history_preserves_order_and_optional_columns() {
    let data = "\
timestamp,HeartRate,SkinConductance,EEG,predicted_engagement_level,feedback,student_id
2024-05-02T14:00:00,60,4,9,0,boring again,S-1
2024-05-02 14:30:00,62,4.2,9.5,0,,S-1
2024-05-02T15:00:00,65,4.1,10,0,So boring,
";
    let records = parse_history_csv(data.as_bytes()).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].feedback.as_deref(), Some("boring again"));
    assert!(records[1].feedback.is_none());
    assert!(records[2].student_id.is_none());
    assert_eq!(records[1].timestamp.minute(), 30);

    let result = summarize(&records);
    assert!(result.rules.contains(&SuggestionRule::AfternoonDip));
    assert!(result.rules.contains(&SuggestionRule::NegativeFeedback));
}

#[test]
fn csv_history_without_optional_columns() {
    let data = "\
timestamp,HeartRate,SkinConductance,EEG,predicted_engagement_level
2024-05-02T09:00:00,60,4,9,1
";
    let records = parse_history_csv(data.as_bytes()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].feedback.is_none());
}

#[test]
fn csv_history_reports_bad_timestamp_line() {
    let data = "\
timestamp,HeartRate,SkinConductance,EEG,predicted_engagement_level
2024-05-02T09:00:00,60,4,9,1
yesterday,60,4,9,1
";
    match parse_history_csv(data.as_bytes()) {
        Err(HistoryError::Timestamp { line, value }) => {
            assert_eq!(line, 3);
            assert_eq!(value, "yesterday");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn load_history_dispatches_on_extension() {
    let dir = std::env::temp_dir().join(format!("focus-monitor-history-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let json_path = dir.join("history.JSON");
    std::fs::write(&json_path, BACKEND_SAMPLE).unwrap();
    assert_eq!(load_history(&json_path).unwrap().len(), 3);

    let text_path = dir.join("history.txt");
    std::fs::write(&text_path, "irrelevant").unwrap();
    assert!(matches!(
        load_history(&text_path),
        Err(HistoryError::UnsupportedFormat(ext)) if ext == "txt"
    ));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn record_line_shows_level_label_and_feedback() {
    let records = parse_history_json(BACKEND_SAMPLE).unwrap();
    let line = format_record_line(&records[0]);
    assert!(line.starts_with("2024-05-02T14:05:09.123456"));
    assert!(line.contains("Low"));
    assert!(line.ends_with("Honestly this was boring."));

    let unknown = format_record_line(&records[2]);
    assert!(unknown.contains("Unknown"));
    assert!(unknown.ends_with("| -"));
}
