use super::*;
use std::io::{Cursor, Write};
use tempfile::TempDir;

fn write_jsonl(dir: &TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).expect("create jsonl");
    for line in lines {
        writeln!(file, "{line}").expect("write line");
    }
    path
}

const BLUE_RECORD: &str =
    r#"{"instruction": "make it blue", "input_images": ["a.png"], "output_images": ["b.png"]}"#;

#[test]
fn test_record_emits_one_pair_per_output() {
    let record: PairRecord = serde_json::from_str(
        r#"{"instruction": "add a hat", "input_images": ["in.png", "ref.png"], "output_images": ["o1.png", "o2.png"], "id": 7}"#,
    )
    .unwrap();

    let pairs = record.pairs();
    assert_eq!(
        pairs,
        vec![
            Pair::new("add a hat", "in.png", "o1.png"),
            Pair::new("add a hat", "in.png", "o2.png"),
        ]
    );
    assert_eq!(record.extra.get("id"), Some(&serde_json::json!(7)));
}

#[test]
fn test_record_without_inputs_emits_nothing() {
    let record = PairRecord {
        instruction: "x".to_string(),
        input_images: vec![],
        output_images: vec!["o.png".to_string()],
        extra: Default::default(),
    };
    assert!(record.pairs().is_empty());
}

#[test]
fn test_same_pair_in_two_files_collapses() {
    let dir = TempDir::new().unwrap();
    let a = write_jsonl(&dir, "a.jsonl", &[BLUE_RECORD]);
    let b = write_jsonl(&dir, "b.jsonl", &[BLUE_RECORD]);

    let set = PairSet::load(&[a, b]);

    assert_eq!(set.len(), 1);
    assert!(set.contains(&Pair::new("make it blue", "a.png", "b.png")));
    assert_eq!(set.stats().files_read, 2);
    assert_eq!(set.stats().records, 2);
}

#[test]
fn test_shared_output_across_records_dedups() {
    let mut set = PairSet::new();
    let source = [
        r#"{"instruction": "i", "input_images": ["in.png"], "output_images": ["x.png", "y.png"]}"#,
        r#"{"instruction": "i", "input_images": ["in.png"], "output_images": ["y.png", "z.png"]}"#,
    ]
    .join("\n");

    set.read_source("memory", Cursor::new(source));

    assert_eq!(set.len(), 3);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_jsonl(
        &dir,
        "mixed.jsonl",
        &[
            BLUE_RECORD,
            "{not json",
            r#"{"instruction": "missing outputs", "input_images": ["a.png"]}"#,
            r#"{"instruction": "no inputs", "input_images": [], "output_images": ["b.png"]}"#,
            "",
            r#"{"instruction": "make it red", "input_images": ["a.png"], "output_images": ["c.png"]}"#,
        ],
    );

    let set = PairSet::load(&[path]);

    assert_eq!(set.len(), 2);
    assert_eq!(set.stats().malformed_lines, 3);
    assert_eq!(set.stats().records, 2);
}

#[test]
fn test_missing_file_does_not_abort_load() {
    let dir = TempDir::new().unwrap();
    let present = write_jsonl(&dir, "present.jsonl", &[BLUE_RECORD]);
    let missing = dir.path().join("missing.jsonl");

    let set = PairSet::load(&[missing, present]);

    assert_eq!(set.len(), 1);
    assert_eq!(set.stats().files_failed, 1);
    assert_eq!(set.stats().files_read, 1);
}

#[test]
fn test_into_vec_is_sorted() {
    let set: PairSet = [
        Pair::new("b", "in", "out"),
        Pair::new("a", "in", "out"),
        Pair::new("a", "in", "out"),
    ]
    .into_iter()
    .collect();

    let pairs = set.into_vec();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].instruction, "a");
    assert_eq!(pairs[1].instruction, "b");
}
