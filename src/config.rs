//! Centralized configuration and builder for persistcache.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - CacheOptions::from_env() reads the PCACHE_* variables.
//! - CacheBuilder starts from env (or from defaults) and can open a cache directly.
//!
//! Defaults:
//! - save_period = 1000 ms
//! - dict = false
//! - fsync = false (rename is the durability point; fsync of the temp file is opt-in)
//! - pretty = false

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::session::Cache;

pub const DEFAULT_SAVE_PERIOD: Duration = Duration::from_millis(1000);

/// Options for a single `open()` call.
/// Ignored when the path already has a live session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    /// Interval between periodic save attempts.
    /// Env: PCACHE_SAVE_PERIOD_MS (default 1000)
    pub save_period: Duration,

    /// Dictionary mode. Records never carry inherited members, so every key
    /// (including `constructor`, `__proto__`, ...) is plain data in both modes;
    /// the flag is kept so callers can state the intent and read it back.
    /// Env: PCACHE_DICT = 0|1 (default 0)
    pub dict: bool,

    /// fsync the temp file before it is renamed over the backing file.
    /// Env: PCACHE_FSYNC (default false)
    pub fsync: bool,

    /// Write pretty-printed JSON.
    /// Env: PCACHE_PRETTY (default false)
    pub pretty: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            save_period: DEFAULT_SAVE_PERIOD,
            dict: false,
            fsync: false,
            pretty: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "on" || s == "yes"
    })
}

impl CacheOptions {
    /// Load options from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PCACHE_SAVE_PERIOD_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.save_period = Duration::from_millis(n);
            }
        }
        if let Some(on) = env_flag("PCACHE_DICT") {
            cfg.dict = on;
        }
        if let Some(on) = env_flag("PCACHE_FSYNC") {
            cfg.fsync = on;
        }
        if let Some(on) = env_flag("PCACHE_PRETTY") {
            cfg.pretty = on;
        }

        cfg
    }

    pub fn with_save_period(mut self, period: Duration) -> Self {
        self.save_period = period;
        self
    }

    pub fn with_save_period_ms(self, ms: u64) -> Self {
        self.with_save_period(Duration::from_millis(ms))
    }

    pub fn with_dict(mut self, on: bool) -> Self {
        self.dict = on;
        self
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }

    pub fn with_pretty(mut self, on: bool) -> Self {
        self.pretty = on;
        self
    }

    /// Checked by `open()` before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.save_period.is_zero() {
            return Err(CacheError::Config("save_period must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Display for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheOptions {{ save_period_ms: {}, dict: {}, fsync: {}, pretty: {} }}",
            self.save_period.as_millis(),
            self.dict,
            self.fsync,
            self.pretty,
        )
    }
}

/// Builder that produces CacheOptions or opens a cache right away.
#[derive(Clone, Debug)]
pub struct CacheBuilder {
    cfg: CacheOptions,
}

impl Default for CacheBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: CacheOptions::from_env(),
        }
    }
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: CacheOptions::default(),
        }
    }

    pub fn save_period(mut self, period: Duration) -> Self {
        self.cfg.save_period = period;
        self
    }

    pub fn save_period_ms(self, ms: u64) -> Self {
        self.save_period(Duration::from_millis(ms))
    }

    pub fn dict(mut self, on: bool) -> Self {
        self.cfg.dict = on;
        self
    }

    pub fn fsync(mut self, on: bool) -> Self {
        self.cfg.fsync = on;
        self
    }

    pub fn pretty(mut self, on: bool) -> Self {
        self.cfg.pretty = on;
        self
    }

    pub fn build(self) -> CacheOptions {
        self.cfg
    }

    pub fn open(self, path: impl AsRef<Path>) -> Result<Cache> {
        Cache::open(path, self.cfg)
    }
}
