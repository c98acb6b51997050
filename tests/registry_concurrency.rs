use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde_json::json;

use persistcache::{open, registry, Cache, CacheOptions};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pcachetest-registry-{prefix}-{pid}-{t}-{id}.json"))
}

#[test]
fn concurrent_opens_of_a_new_path_share_one_session() -> Result<()> {
    let path = unique_path("race");
    let n = 8;
    let barrier = Arc::new(Barrier::new(n));

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let path = path.clone();
            let barrier = barrier.clone();
            thread::spawn(move || -> persistcache::Result<Cache> {
                barrier.wait();
                let cache = open(&path, CacheOptions::default().with_save_period_ms(60_000))?;
                cache.set(format!("t{i}"), i)?;
                Ok(cache)
            })
        })
        .collect();

    let mut caches = Vec::new();
    for h in handles {
        let cache = h.join().expect("open thread panicked")?;
        caches.push(cache);
    }
    for c in &caches[1..] {
        assert!(c.same_session(&caches[0]), "all openers must get the same session");
    }
    assert_eq!(caches[0].len(), n, "no write may be lost to a second session");

    caches[0].close()?;
    let saved: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(saved.as_object().map(|m| m.len()), Some(n));
    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn open_paths_tracks_live_sessions() -> Result<()> {
    let path = unique_path("paths");
    assert!(!registry::is_open(&path));

    let cache = open(&path, CacheOptions::default())?;
    assert!(registry::is_open(&path));
    assert!(registry::open_paths().contains(&path));

    cache.close()?;
    assert!(!registry::is_open(&path));
    assert!(!registry::open_paths().contains(&path));
    Ok(())
}

#[test]
fn open_right_after_close_sees_flushed_data() -> Result<()> {
    let path = unique_path("close-reopen");
    for round in 0..20u64 {
        let cache = open(&path, CacheOptions::default().with_save_period_ms(60_000))?;
        if round > 0 {
            assert_eq!(cache.get_json("round"), Some(json!(round - 1)));
        }
        cache.set("round", round)?;

        let closer = {
            let cache = cache.clone();
            thread::spawn(move || cache.close())
        };
        closer.join().expect("close thread panicked")?;
    }
    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn mutations_from_many_threads_are_all_saved() -> Result<()> {
    let path = unique_path("writers");
    let cache = open(&path, CacheOptions::default().with_save_period_ms(5))?;
    cache.set("list", json!([]))?;
    let list = cache.child("list").expect("list is a node");

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let list = list.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    list.push(w * 1000 + i).expect("push on a sequence");
                }
            })
        })
        .collect();
    for w in writers {
        w.join().expect("writer panicked");
    }
    cache.close()?;

    let saved: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(saved["list"].as_array().map(|a| a.len()), Some(1000));
    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn open_during_close_gets_a_fresh_session() -> Result<()> {
    let path = unique_path("closing");
    let big: Vec<u64> = (0..200_000).collect();

    for round in 0..5 {
        let closing = open(&path, CacheOptions::default().with_save_period_ms(1))?;
        // большой массив, чтобы close() застал запись фонового saver'а
        closing.set("big", json!(big))?;
        closing.set("round", round)?;

        let closer = {
            let c = closing.clone();
            thread::spawn(move || c.close())
        };
        while !closing.is_closed() {
            thread::yield_now();
        }

        let other = open(&path, CacheOptions::default().with_save_period_ms(60_000))?;
        assert!(!other.same_session(&closing), "round {round}");
        assert!(!other.is_closed());
        assert_eq!(other.get_json("round"), Some(json!(round)));

        other.set("after", round)?;
        closer.join().expect("closer thread")?;
        other.close()?;

        let saved: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
        assert_eq!(saved["after"], json!(round));
    }

    fs::remove_file(&path)?;
    Ok(())
}
