//! session/saver — фоновый поток периодического сохранения.
//!
//! Цикл: ждать save_period (прерываемо) -> save-if-dirty -> снова ждать.
//! Интервал фиксированный и отсчитывается от конца предыдущей попытки.
//! Поток держит Weak<Session>: если сессии уже нет, он просто завершается.

use log::warn;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{CacheError, Result};

use super::Session;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

pub(crate) struct Saver {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Saver {
    pub(crate) fn spawn(session: Weak<Session>, period: Duration, path: &Path) -> Result<Self> {
        let stop = Arc::new(StopSignal::default());
        let stop_thr = stop.clone();
        let handle = thread::Builder::new()
            .name("persistcache-saver".into())
            .spawn(move || run(session, period, stop_thr))
            .map_err(|e| CacheError::io(path, e))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Cancel the pending wait; the thread exits after any save in flight.
    pub(crate) fn signal(&self) {
        let mut g = self.stop.stopped.lock().unwrap_or_else(|e| e.into_inner());
        *g = true;
        drop(g);
        self.stop.cv.notify_all();
    }

    /// Signal and wait for the thread (and a save in flight) to finish.
    pub(crate) fn stop_and_join(mut self) {
        self.signal();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                warn!("persistcache saver thread panicked");
            }
        }
    }
}

fn run(session: Weak<Session>, period: Duration, stop: Arc<StopSignal>) {
    loop {
        let guard = stop.stopped.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = stop
            .cv
            .wait_timeout_while(guard, period, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        if *guard {
            break;
        }
        drop(guard);

        match session.upgrade() {
            Some(s) => s.save_in_background(),
            None => break,
        }
    }
}
