use super::*;
use crate::hashing::{cache_key, hash_pair_fields};
use crate::pairs::Pair;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn cache_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join(".cache").join("openai_gpt-4.1.jsonl")
}

fn scores(overall: f64) -> serde_json::Value {
    json!({"prompt_following": overall, "consistency": overall, "overall": overall})
}

#[test]
fn test_open_missing_log_starts_empty() {
    let dir = TempDir::new().unwrap();
    let cache = ResultCache::open(cache_path(&dir)).expect("open");

    assert!(cache.is_empty());
    assert!(cache.path().parent().unwrap().is_dir());
}

#[test]
fn test_put_then_get() {
    let dir = TempDir::new().unwrap();
    let cache = ResultCache::open(cache_path(&dir)).unwrap();
    let pair = Pair::new("make it blue", "a.png", "b.png");

    cache.put_pair(&pair, scores(7.0)).unwrap();

    assert_eq!(cache.get_pair(&pair), Some(scores(7.0)));
    assert!(cache.contains(&cache_key(&pair)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_get_missing_key() {
    let dir = TempDir::new().unwrap();
    let cache = ResultCache::open(cache_path(&dir)).unwrap();

    assert_eq!(cache.get(&hash_pair_fields("a", "b", "c")), None);
}

#[test]
fn test_put_twice_last_write_wins_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let key = hash_pair_fields("i", "in.png", "out.png");

    {
        let cache = ResultCache::open(&path).unwrap();
        cache.put(key, scores(1.0)).unwrap();
        cache.put(key, scores(9.0)).unwrap();
        assert_eq!(cache.get(&key), Some(scores(9.0)));
    }

    let reopened = ResultCache::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get(&key), Some(scores(9.0)));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 2, "log must stay append-only");
}

#[test]
fn test_log_line_format() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let key = hash_pair_fields("i", "in.png", "out.png");

    let cache = ResultCache::open(&path).unwrap();
    cache.put(key, json!({"overall": 3})).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let line: serde_json::Value = serde_json::from_str(raw.trim_end()).unwrap();
    assert_eq!(line["key"], json!(key.to_hex()));
    assert_eq!(line["result"], json!({"overall": 3}));
    assert!(raw.ends_with('\n'));
}

#[test]
fn test_replay_skips_truncated_trailing_line() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let keys: Vec<_> = (0..5)
        .map(|i| hash_pair_fields("i", "in.png", &format!("{i}.png")))
        .collect();

    {
        let cache = ResultCache::open(&path).unwrap();
        for (i, key) in keys.iter().enumerate() {
            cache.put(*key, scores(i as f64)).unwrap();
        }
        cache.put(keys[0], scores(42.0)).unwrap();
    }

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    write!(file, "{{\"key\": \"{}\", \"result\": {{\"ove", keys[1].to_hex()).unwrap();
    drop(file);

    let cache = ResultCache::open(&path).unwrap();
    assert_eq!(cache.len(), 5);
    assert_eq!(cache.get(&keys[0]), Some(scores(42.0)));
    assert_eq!(cache.get(&keys[1]), Some(scores(1.0)));
}

#[test]
fn test_append_after_torn_tail_stays_readable() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{\"key\": \"abc").unwrap();

    let key = hash_pair_fields("x", "y", "z");
    {
        let cache = ResultCache::open(&path).unwrap();
        assert!(cache.is_empty());
        cache.put(key, scores(5.0)).unwrap();
    }

    let reopened = ResultCache::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get(&key), Some(scores(5.0)));
}

#[test]
fn test_replay_skips_garbage_lines() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let key = hash_pair_fields("x", "y", "z");
    let contents = format!(
        "not json\n{{\"key\": \"zz\", \"result\": 1}}\n{{\"result\": 1}}\n\n{{\"key\": \"{}\", \"result\": 2}}\n",
        key.to_hex()
    );
    std::fs::write(&path, contents).unwrap();

    let cache = ResultCache::open(&path).unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&key), Some(json!(2)));
}

#[test]
fn test_foreign_sha256_keys_never_match_pairs() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    // sha256("add a hat|||in.png|||out.png"), as written by older tooling.
    let foreign = "ef65634d9ba838bb4bf39989ab55c8689cc2928e5df857214a65841c779919af";
    std::fs::write(
        &path,
        format!("{{\"key\": \"{foreign}\", \"result\": {{\"overall\": 4}}}}\n"),
    )
    .unwrap();

    let cache = ResultCache::open(&path).unwrap();
    let pair = Pair::new("add a hat", "in.png", "out.png");

    assert_eq!(cache.len(), 1);
    assert_ne!(cache_key(&pair).to_hex(), foreign);
    assert_eq!(cache.get_pair(&pair), None);
}

#[test]
fn test_load_reflects_external_appends() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let cache = ResultCache::open(&path).unwrap();
    let key = hash_pair_fields("x", "y", "z");

    let writer = ResultCache::open(&path).unwrap();
    writer.put(key, json!(1)).unwrap();
    assert!(cache.get(&key).is_none());

    assert_eq!(cache.load().unwrap(), 1);
    assert_eq!(cache.get(&key), Some(json!(1)));
}

#[test]
fn test_concurrent_puts_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let cache = Arc::new(ResultCache::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let key = hash_pair_fields(&format!("t{t}"), "in.png", &format!("{i}.png"));
                    cache.put(key, json!({"thread": t, "i": i, "pad": "x".repeat(200)})).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 400);
    let reopened = ResultCache::open(&path).unwrap();
    assert_eq!(reopened.len(), 400);
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 400);
}

#[test]
fn test_compact_rewrites_one_line_per_key() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let cache = ResultCache::open(&path).unwrap();
    let a = hash_pair_fields("a", "in", "out");
    let b = hash_pair_fields("b", "in", "out");

    cache.put(a, json!(1)).unwrap();
    cache.put(a, json!(2)).unwrap();
    cache.put(b, json!(3)).unwrap();

    assert_eq!(cache.compact().unwrap(), 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);

    cache.put(b, json!(4)).unwrap();
    let reopened = ResultCache::open(&path).unwrap();
    assert_eq!(reopened.get(&a), Some(json!(2)));
    assert_eq!(reopened.get(&b), Some(json!(4)));
}

#[cfg(unix)]
#[test]
fn test_put_failure_leaves_memory_untouched() {
    let dir = TempDir::new().unwrap();
    let path = cache_path(&dir);
    let cache = ResultCache::open(&path).unwrap();

    // Read-only handle: the next append fails.
    cache.replace_log_file(std::fs::File::open(&path).unwrap());

    let key = hash_pair_fields("x", "y", "z");
    let err = cache.put(key, json!(1)).unwrap_err();

    assert!(matches!(err, CacheError::Io { .. }));
    assert!(cache.get(&key).is_none());
}
