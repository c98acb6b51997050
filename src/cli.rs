//! cli — небольшой админ-инструмент поверх библиотеки.
//!
//! Все изменения идут через Cache::open/close, т.е. тем же путём, что и у
//! встраивающего приложения (dirty-gating, tmp+rename).

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::config::CacheOptions;
use crate::node::pointer::parse_pointer;
use crate::node::{Entry, Key, Node};
use crate::session::Cache;

#[derive(Parser, Debug)]
#[command(
    name = "persistcache",
    version,
    about = "Inspect and edit persistcache JSON files",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print the value at a JSON Pointer (whole cache by default).
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "")]
        pointer: String,
    },
    /// Set the value at a JSON Pointer. The value is parsed as JSON, or taken as a string.
    Set {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        pointer: String,
        #[arg(long)]
        value: String,
    },
    /// Delete the key or element at a JSON Pointer.
    Del {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        pointer: String,
    },
    /// List keys (or indices) of the node at a JSON Pointer.
    Keys {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "")]
        pointer: String,
    },
    /// File size, root kind, entry count and process metrics.
    Stats {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Get { path, pointer } => cmd_get(&path, &pointer),
        Cmd::Set {
            path,
            pointer,
            value,
        } => cmd_set(&path, &pointer, &value),
        Cmd::Del { path, pointer } => cmd_del(&path, &pointer),
        Cmd::Keys { path, pointer } => cmd_keys(&path, &pointer),
        Cmd::Stats { path, json } => cmd_stats(&path, json),
    }
}

fn open(path: &Path) -> Result<Cache> {
    Cache::open(path, CacheOptions::from_env())
        .with_context(|| format!("open cache {}", path.display()))
}

/// Value literal: JSON if it parses, otherwise the raw string.
pub fn parse_value_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Resolve the parent node of the last pointer token.
fn parent_of(root: &Node, pointer: &str) -> Result<(Node, Key)> {
    let mut keys = parse_pointer(pointer)?;
    let last = keys
        .pop()
        .ok_or_else(|| anyhow!("pointer must name a child, not the root"))?;
    let parent = root
        .get_path(&keys)
        .and_then(Entry::into_node)
        .ok_or_else(|| anyhow!("no object or array at parent of {pointer:?}"))?;
    Ok((parent, last))
}

fn cmd_get(path: &Path, pointer: &str) -> Result<()> {
    let cache = open(path)?;
    let found = cache.get_pointer(pointer)?.map(|e| e.to_json());
    cache.close()?;
    let v = found.ok_or_else(|| anyhow!("nothing at {pointer:?}"))?;
    println!("{}", serde_json::to_string_pretty(&v)?);
    Ok(())
}

fn cmd_set(path: &Path, pointer: &str, raw: &str) -> Result<()> {
    let cache = open(path)?;
    let (parent, key) = parent_of(&cache, pointer)?;
    parent
        .set(key, parse_value_arg(raw))
        .with_context(|| format!("set {pointer:?}"))?;
    cache.close()?;
    println!("OK");
    Ok(())
}

fn cmd_del(path: &Path, pointer: &str) -> Result<()> {
    let cache = open(path)?;
    let (parent, key) = parent_of(&cache, pointer)?;
    let removed = parent.remove(key);
    cache.close()?;
    match removed {
        Some(e) => println!("deleted {}", e.to_json()),
        None => println!("not found"),
    }
    Ok(())
}

fn cmd_keys(path: &Path, pointer: &str) -> Result<()> {
    let cache = open(path)?;
    let node = cache
        .get_pointer(pointer)?
        .and_then(Entry::into_node)
        .ok_or_else(|| anyhow!("no object or array at {pointer:?}"))?;
    let keys = node.keys();
    cache.close()?;
    for k in keys {
        match k {
            Key::Field(s) => println!("{s}"),
            Key::Index(i) => println!("{i}"),
        }
    }
    Ok(())
}

fn cmd_stats(path: &Path, as_json: bool) -> Result<()> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let cache = open(path)?;
    let kind = cache.kind().as_str();
    let entries = cache.len();
    cache.close()?;
    let m = crate::metrics::snapshot();

    if as_json {
        let out = json!({
            "path": path.display().to_string(),
            "file_bytes": size,
            "root_kind": kind,
            "entries": entries,
            "metrics": m,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("cache at {}", path.display());
        println!("  file_bytes = {}", size);
        println!("  root_kind  = {}", kind);
        println!("  entries    = {}", entries);
        println!("  saves      = {}", m.saves_written);
    }
    Ok(())
}
