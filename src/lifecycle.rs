//! lifecycle — сброс всех открытых кэшей при завершении процесса.
//!
//! - install(): один раз на процесс регистрирует atexit-хук (unix), который
//!   вызывает flush_all(). Вызывается из Cache::open.
//! - flush_all(): явная точка входа для приложения — её нужно вызвать из
//!   собственного обработчика SIGINT/SIGTERM, т.к. сигналы библиотека не ловит.
//!
//! Регистрация не снимается: процесс всё равно завершается.

use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::registry;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the exit hook once per process. Returns true on the call that installed it.
pub fn install() -> bool {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return false;
    }
    install_exit_hook();
    true
}

pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

#[cfg(unix)]
fn install_exit_hook() {
    // SAFETY: flush_at_exit is a plain extern "C" fn without arguments and never unwinds.
    let rc = unsafe { libc::atexit(flush_at_exit) };
    if rc != 0 {
        warn!("atexit registration failed (rc={rc}); call lifecycle::flush_all() on shutdown");
    }
}

#[cfg(not(unix))]
fn install_exit_hook() {}

#[cfg(unix)]
extern "C" fn flush_at_exit() {
    let _ = std::panic::catch_unwind(flush_all);
}

/// close_sync() every registered session. Returns how many were closed.
pub fn flush_all() -> usize {
    let sessions = registry::live_sessions();
    let n = sessions.len();
    for s in sessions {
        if let Err(e) = s.close_sync() {
            warn!("flush on shutdown failed: {e}");
        }
    }
    n
}
