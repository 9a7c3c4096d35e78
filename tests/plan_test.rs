use scripref::errors::ScripRefError;
use scripref::plan::*;

/// Helper: a reading with only a day and reference.
fn reading(day: u32, reference: &str) -> DailyReading {
    DailyReading {
        day,
        reference: reference.to_string(),
        title: format!("Day {day}"),
        ..DailyReading::default()
    }
}

#[test]
fn test_parse_plain_json() {
    let raw = r#"{"daily_verses": [{"day": 1, "reference": "John 1:1-5, Psalms 1:1-6", "text": "", "title": "Beginning and Blessing", "explanation": ""}]}"#;
    let readings = parse_plan_content(raw).expect("valid plan");
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].day, 1);
    assert_eq!(readings[0].reference, "John 1:1-5, Psalms 1:1-6");
    assert_eq!(readings[0].title, "Beginning and Blessing");
    assert!(readings[0].text.is_empty());
}

#[test]
fn test_parse_fenced_json() {
    let raw = "```json\n{\"daily_verses\": [{\"day\": 1, \"reference\": \"John 3:16\", \"title\": \"Love\"}]}\n```";
    let readings = parse_plan_content(raw).expect("fenced plan");
    assert_eq!(readings[0].reference, "John 3:16");
    assert!(readings[0].explanation.is_empty());
}

#[test]
fn test_parse_rejects_empty_plan() {
    let err = parse_plan_content(r#"{"daily_verses": []}"#).expect_err("empty plan");
    match err {
        ScripRefError::Plan { message } => assert!(message.contains("empty")),
        other => panic!("expected a plan error, got {other:?}"),
    }
    assert!(parse_plan_content("{}").is_err(), "missing array counts as empty");
}

#[test]
fn test_parse_rejects_invalid_json() {
    let err = parse_plan_content("Here is your plan: {").expect_err("not JSON");
    assert!(matches!(err, ScripRefError::Plan { .. }));
}

#[test]
fn test_clean_plan() {
    let readings = vec![
        reading(1, "John 1:1-5, Psalms 1:1-6"),
        reading(2, "Matthew 5:1-7:29"),
        reading(3, "Psalm 23"),
    ];
    let audit = audit_plan(&readings);
    assert!(audit.is_clean(), "unexpected issues: {:?}", audit.issues);
    assert!(audit.feedback().is_empty());
}

#[test]
fn test_audit_reports_each_bad_piece() {
    let readings = vec![
        reading(1, "John 3:16, Genesis 1:"),
        reading(2, "   "),
        reading(3, "John 11:35-30"),
        reading(4, "Genesis 1:"),
    ];
    let audit = audit_plan(&readings);

    assert!(!audit.is_clean());
    let keys: Vec<&str> = audit.issues.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["Genesis 1:", "Day 2", "John 11:35-30"]);
    assert_eq!(audit.issues[1].reason, "reference field is empty");
    assert!(audit.issues[2].reason.contains("greater than end verse"));
}

#[test]
fn test_feedback_lines() {
    let audit = audit_plan(&[reading(1, ""), reading(2, "Revelation")]);
    let feedback = audit.feedback();
    let lines: Vec<&str> = feedback.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "- 'Day 1': reference field is empty");
    assert!(lines[1].starts_with("- 'Revelation': "));
    assert!(lines[1].contains("incomplete (missing chapter/verse)"));
}

#[test]
fn test_day_key_uses_position() {
    let audit = audit_plan(&[reading(7, "John 3:16"), reading(9, "")]);
    assert_eq!(audit.issues[0].key, "Day 2");
}

#[test]
fn test_reading_serde_names() {
    let json = serde_json::to_value(reading(4, "John 3:16")).unwrap();
    assert_eq!(json["day"], 4);
    assert_eq!(json["reference"], "John 3:16");
    assert!(json.get("explanation").is_none(), "empty explanation is omitted");
}
