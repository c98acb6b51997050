//! Lightweight global metrics for persistcache.
//!
//! Потокобезопасные атомарные счётчики:
//! - Sessions (open/close/reopen hits)
//! - Saves (written, skipped clean, errors, bytes)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Sessions -----
static SESSIONS_OPENED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_CLOSED: AtomicU64 = AtomicU64::new(0);
static REOPEN_HITS: AtomicU64 = AtomicU64::new(0);

// ----- Saves -----
static SAVES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SAVES_SKIPPED_CLEAN: AtomicU64 = AtomicU64::new(0);
static SAVE_ERRORS: AtomicU64 = AtomicU64::new(0);
static BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub reopen_hits: u64,

    pub saves_written: u64,
    pub saves_skipped_clean: u64,
    pub save_errors: u64,
    pub bytes_written: u64,
}

impl MetricsSnapshot {
    pub fn sessions_live(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }

    pub fn avg_save_bytes(&self) -> f64 {
        if self.saves_written == 0 {
            0.0
        } else {
            self.bytes_written as f64 / self.saves_written as f64
        }
    }
}

// ----- Recorders (Sessions) -----
pub fn record_session_opened() {
    SESSIONS_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_session_closed() {
    SESSIONS_CLOSED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reopen_hit() {
    REOPEN_HITS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Saves) -----
pub fn record_save(bytes: usize) {
    SAVES_WRITTEN.fetch_add(1, Ordering::Relaxed);
    BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_save_skipped() {
    SAVES_SKIPPED_CLEAN.fetch_add(1, Ordering::Relaxed);
}

pub fn record_save_error() {
    SAVE_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        sessions_opened: SESSIONS_OPENED.load(Ordering::Relaxed),
        sessions_closed: SESSIONS_CLOSED.load(Ordering::Relaxed),
        reopen_hits: REOPEN_HITS.load(Ordering::Relaxed),
        saves_written: SAVES_WRITTEN.load(Ordering::Relaxed),
        saves_skipped_clean: SAVES_SKIPPED_CLEAN.load(Ordering::Relaxed),
        save_errors: SAVE_ERRORS.load(Ordering::Relaxed),
        bytes_written: BYTES_WRITTEN.load(Ordering::Relaxed),
    }
}

/// Reset all counters (tests / admin tools).
pub fn reset() {
    SESSIONS_OPENED.store(0, Ordering::Relaxed);
    SESSIONS_CLOSED.store(0, Ordering::Relaxed);
    REOPEN_HITS.store(0, Ordering::Relaxed);
    SAVES_WRITTEN.store(0, Ordering::Relaxed);
    SAVES_SKIPPED_CLEAN.store(0, Ordering::Relaxed);
    SAVE_ERRORS.store(0, Ordering::Relaxed);
    BYTES_WRITTEN.store(0, Ordering::Relaxed);
}
