//! Benchmark and request fixtures.

use std::fs;
use std::path::Path;

use editgate::broker::ScoreRequest;
use editgate::pairs::Pair;
use serde_json::{Value, json};

/// One JSONL source line with a single input and the given outputs.
pub fn source_line(instruction: &str, input: &str, outputs: &[&str]) -> String {
    json!({
        "instruction": instruction,
        "input_images": [input],
        "output_images": outputs,
    })
    .to_string()
}

pub fn write_jsonl(path: &Path, lines: &[String]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

pub fn read_jsonl(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// `n` distinct pairs sharing one instruction.
pub fn numbered_pairs(n: usize) -> Vec<Pair> {
    (0..n)
        .map(|i| Pair::new("replace the sky", format!("src/{i}.png"), format!("edit/{i}.png")))
        .collect()
}

/// A request with one item per metadata entry and tiny fake images.
pub fn score_request(metas: &[Value]) -> ScoreRequest {
    let mut request = ScoreRequest::new();
    for (i, meta) in metas.iter().enumerate() {
        request.push_item(
            [format!("src-{i}").into_bytes()],
            format!("edit-{i}").as_bytes(),
            meta.clone(),
        );
    }
    request
}
