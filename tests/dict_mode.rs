use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde_json::json;

use persistcache::{open, CacheOptions};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const RESERVED_1: [&str; 7] = [
    "constructor",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
];
const RESERVED_2: [&str; 5] = [
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
    "__proto__",
];

fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pcachetest-dict-{prefix}-{pid}-{t}-{id}.json"))
}

fn reserved() -> impl Iterator<Item = &'static str> {
    RESERVED_1.iter().chain(RESERVED_2.iter()).copied()
}

#[test]
fn builtin_member_names_are_plain_keys() -> Result<()> {
    let path = unique_path("reserved");
    let dict = CacheOptions::default().with_dict(true).with_save_period_ms(60_000);

    // Новый кэш: зарезервированных ключей нет
    let cache = open(&path, dict.clone())?;
    assert!(cache.is_dict());
    cache.set("hi", "hi")?;
    cache.set("a", json!([1, 2, 3]))?;
    for rk in reserved() {
        assert!(cache.get(rk).is_none(), "{rk} must be absent");
        assert!(!cache.contains(rk));
    }
    cache.close()?;

    // Загруженный кэш: то же самое
    let cache = open(&path, dict.clone())?;
    assert_eq!(cache.get_json("hi"), Some(json!("hi")));
    assert!(cache.child("a").map(|n| n.is_sequence()).unwrap_or(false));
    for rk in reserved() {
        assert!(cache.get(rk).is_none(), "{rk} must be absent after reload");
    }

    for rk in reserved() {
        cache.set(rk, "hello")?;
        assert_eq!(cache.get_json(rk), Some(json!("hello")), "{rk}");
    }
    cache.close()?;

    let cache = open(&path, dict)?;
    for rk in reserved() {
        assert_eq!(cache.get_json(rk), Some(json!("hello")), "{rk} after reload");
    }
    cache.close()?;

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn reserved_names_work_in_nested_records_without_dict() -> Result<()> {
    let path = unique_path("nested");
    let cache = open(&path, CacheOptions::default().with_save_period_ms(60_000))?;
    cache.set("inner", json!({"__proto__": {"polluted": true}, "constructor": 1}))?;

    let inner = cache.child("inner").unwrap();
    assert_eq!(inner.get_json("constructor"), Some(json!(1)));
    assert_eq!(
        inner.get_json("__proto__"),
        Some(json!({"polluted": true}))
    );
    assert!(cache.get("polluted").is_none());
    cache.close()?;

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(raw["inner"]["__proto__"]["polluted"], json!(true));
    fs::remove_file(&path)?;
    Ok(())
}
