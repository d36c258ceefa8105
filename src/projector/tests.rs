use super::*;
use serde_json::json;
use std::io::Cursor;
use tempfile::TempDir;

fn results() -> HashMap<Pair, Value> {
    let mut results = HashMap::new();
    results.insert(
        Pair::new("add snow", "in/1.png", "out/1a.png"),
        json!({"prompt_following": 8.0, "consistency": 6.0, "overall": 6.0}),
    );
    results.insert(
        Pair::new("add snow", "in/1.png", "out/1b.png"),
        json!({"prompt_following": 3.0, "consistency": 9.0, "overall": 3.0}),
    );
    results.insert(
        Pair::new("remove car", "in/2.png", "out/2a.png"),
        json!({"prompt_following": 7.0}),
    );
    results
}

const SOURCE: &str = r#"{"instruction": "add snow", "input_images": ["in/1.png"], "output_images": ["out/1a.png", "out/1b.png"]}
{"instruction": "remove car", "input_images": ["in/2.png"], "output_images": ["out/2a.png", "out/2b.png"]}
"#;

fn lines(bytes: &[u8]) -> Vec<Value> {
    std::str::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_scores_follow_output_order() {
    let results = results();
    let projector = ResultProjector::new(&results, "prompt_following");
    let mut out = Vec::new();

    let stats = projector
        .project_reader(Cursor::new(SOURCE), &mut out, None)
        .unwrap();

    let records = lines(&out);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["instruction"], json!("add snow"));
    assert_eq!(records[0]["score"], json!([8.0, 3.0]));
    assert_eq!(records[1]["score"], json!([7.0, null]));
    assert!(records[0].get("task_type").is_none());
    assert_eq!(stats.records, 2);
    assert_eq!(stats.scored, 3);
    assert_eq!(stats.missing, 1);
}

#[test]
fn test_missing_category_is_null() {
    let results = results();
    let projector = ResultProjector::new(&results, "consistency");
    let mut out = Vec::new();

    projector
        .project_reader(Cursor::new(SOURCE), &mut out, None)
        .unwrap();

    let records = lines(&out);
    assert_eq!(records[0]["score"], json!([6.0, 9.0]));
    assert_eq!(records[1]["score"], json!([null, null]));
}

#[test]
fn test_echoes_input_fields() {
    let results = results();
    let projector = ResultProjector::new(&results, "overall");
    let mut out = Vec::new();

    projector
        .project_reader(Cursor::new(SOURCE), &mut out, Some("background_change"))
        .unwrap();

    let records = lines(&out);
    assert_eq!(records[1]["task_type"], json!("background_change"));
    assert_eq!(records[1]["input_images"], json!(["in/2.png"]));
    assert_eq!(records[1]["output_images"], json!(["out/2a.png", "out/2b.png"]));
}

#[test]
fn test_malformed_lines_keep_alignment() {
    let source = format!("not json\n{SOURCE}{{\"instruction\": \"x\", \"input_images\": [], \"output_images\": []}}\n");
    let results = results();
    let projector = ResultProjector::new(&results, "overall");
    let mut out = Vec::new();

    let stats = projector
        .project_reader(Cursor::new(source), &mut out, Some("weather"))
        .unwrap();

    assert_eq!(stats.records, 2);
    assert_eq!(stats.malformed_lines, 2);
    let records = lines(&out);
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["source_line"], json!(1));
    assert_eq!(records[0]["score"], Value::Null);
    assert_eq!(records[0]["task_type"], json!("weather"));
    assert!(records[0]["error"].is_string());
    assert_eq!(records[1]["score"], json!([6.0, 3.0]));
    assert_eq!(records[3]["source_line"], json!(4));
}

#[test]
fn test_project_file_layout() {
    let dir = TempDir::new().unwrap();
    let source_dir = dir.path().join("bench").join("subject_add").join("overall");
    fs::create_dir_all(&source_dir).unwrap();
    let source = source_dir.join("part_0.jsonl");
    fs::write(&source, SOURCE).unwrap();
    let save_dir = dir.path().join("results").join("openai").join("subject_add").join("overall");

    let results = results();
    let written = ResultProjector::new(&results, "overall")
        .project_file(&source, &save_dir)
        .unwrap();

    assert_eq!(written.path, save_dir.join("part_0.jsonl"));
    let records = lines(&fs::read(&written.path).unwrap());
    assert_eq!(records[0]["task_type"], json!("subject_add"));
    assert_eq!(records[0]["score"], json!([6.0, 3.0]));
}

#[test]
fn test_project_all_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("task").join("overall").join("good.jsonl");
    fs::create_dir_all(good.parent().unwrap()).unwrap();
    fs::write(&good, SOURCE).unwrap();
    let missing = dir.path().join("task").join("overall").join("missing.jsonl");
    let also_good = dir.path().join("task").join("overall").join("also_good.jsonl");
    fs::write(&also_good, SOURCE).unwrap();
    let save_dir = dir.path().join("out");

    let results = results();
    let outcomes = ResultProjector::new(&results, "overall").project_all(
        &[good.clone(), missing.clone(), also_good.clone()],
        &save_dir,
    );

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(outcomes[1].result, Err(ProjectError::Io { .. })));
    assert_eq!(outcomes[1].source, missing);
    assert!(outcomes[2].result.is_ok());
    assert!(save_dir.join("good.jsonl").is_file());
    assert!(!save_dir.join("missing.jsonl").exists());
    assert!(save_dir.join("also_good.jsonl").is_file());
}

#[test]
fn test_task_type_of() {
    assert_eq!(
        task_type_of(Path::new("bench/color_alter/consistency/a.jsonl")),
        Some("color_alter".to_string())
    );
    assert_eq!(task_type_of(Path::new("a.jsonl")), None);
}
