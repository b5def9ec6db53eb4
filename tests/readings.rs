use focus_monitor::readings::{parse_batch, BatchError, SensorReading, EEG_RANGE, HEART_RATE_RANGE};

#[test]
fn range_bounds_are_inclusive() {
    assert!(SensorReading::new(20.0, 0.01, 1.0).is_valid());
    assert!(SensorReading::new(100.0, 20.0, 20.0).is_valid());
    assert!(!SensorReading::new(19.99, 5.0, 10.0).is_valid());
    assert!(HEART_RATE_RANGE.contains(50.0));
    assert!(!EEG_RANGE.contains(20.5));
}

#[test]
fn validation_reports_every_violation_in_order() {
    let errors = SensorReading::new(150.0, 0.0, 0.5).validate();
    assert_eq!(
        errors,
        vec![
            "HRV must be between 20 and 100 ms.".to_string(),
            "EEG Alpha Waves must be between 1 and 20 Hz.".to_string(),
            "GSR must be between 0.01 and 20 µS.".to_string(),
        ]
    );
}

#[test]
fn batch_sorts_rows_into_accepted_rejected_and_incomplete() {
    let data = "\
student_id,HeartRate,SkinConductance,EEG,timestamp
S-1,60,4,9,2024-05-02T09:00:00
S-2,150,4,9,
S-3,,4,9,
S-4,70,3,12,
";
    let batch = parse_batch(data.as_bytes()).unwrap();

    assert_eq!(batch.total(), 4);
    assert_eq!(batch.rows.len(), 2);
    assert_eq!(batch.rows[0].line, 2);
    assert_eq!(batch.rows[0].timestamp.as_deref(), Some("2024-05-02T09:00:00"));
    assert!(batch.rows[1].timestamp.is_none());
    assert_eq!(batch.rows[1].student_id, "S-4");

    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].line, 3);
    assert_eq!(batch.rejected[0].student_id, "S-2");
    assert_eq!(batch.rejected[0].errors.len(), 1);

    assert_eq!(batch.incomplete, 1);
}

#[test]
fn batch_requires_columns() {
    let data = "student_id,HeartRate,EEG\nS-1,60,9\n";
    match parse_batch(data.as_bytes()) {
        Err(BatchError::MissingColumns(missing)) => {
            assert_eq!(missing, vec!["SkinConductance".to_string()]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn missing_columns_message_lists_names() {
    let err = parse_batch("name\nx\n".as_bytes()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "CSV must contain columns: student_id, HeartRate, SkinConductance, EEG"
    );
}
