//! session — одна открытая сессия кэша и её публичный хэндл `Cache`.
//!
//! Разделение по подмодулям:
//! - open.rs  — Cache::open (реестр, загрузка файла, запуск saver)
//! - saver.rs — фоновый поток периодического сохранения
//! - io.rs    — чтение/запись файла (tmp+rename)
//!
//! Сессия владеет: путём, корневым узлом, tracker (dirty flag), saver-потоком.
//! Закрытие идемпотентно: повторный close() ничего не пишет.

mod io;
mod open;
mod saver;

use log::{debug, info, warn};
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::CacheOptions;
use crate::error::Result;
use crate::metrics;
use crate::node::tracker::Tracker;
use crate::node::Node;
use crate::registry::{self, Reservation};
use saver::Saver;

pub(crate) struct Session {
    path: PathBuf,
    options: CacheOptions,
    root: Node,
    tracker: Arc<Tracker>,
    // сериализует «снимок + запись», чтобы файлы попадали на диск по порядку
    io: Mutex<()>,
    closed: AtomicBool,
    saver: Mutex<Option<Saver>>,
}

impl Session {
    /// Save if dirty. Ok(true) if the file was written.
    pub(crate) fn save(&self) -> Result<bool> {
        let res = self.save_inner();
        if res.is_err() {
            metrics::record_save_error();
        }
        res
    }

    fn save_inner(&self) -> Result<bool> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());

        let encoded = self
            .tracker
            .snapshot_if_dirty(|| io::encode(&self.root, self.options.pretty));
        let bytes = match encoded {
            None => {
                metrics::record_save_skipped();
                return Ok(false);
            }
            Some(r) => r?,
        };

        io::write_atomic(&self.path, &bytes, self.options.fsync)?;
        metrics::record_save(bytes.len());
        debug!("saved {} bytes to {}", bytes.len(), self.path.display());
        Ok(true)
    }

    /// Periodic cycle: errors are logged and the cycle is dropped.
    pub(crate) fn save_in_background(&self) {
        if let Err(e) = self.save() {
            warn!("periodic save of {} failed: {}", self.path.display(), e);
        }
    }

    fn take_saver(&self) -> Option<Saver> {
        self.saver.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Deregister, stop the saver (waiting for a save in flight), flush.
    pub(crate) fn close(&self) -> Result<()> {
        // Путь становится Busy раньше, чем выставляется closed: open(), начатый
        // после этого, ждёт финальной записи и получает новую сессию.
        let marker = registry::begin_close(&self.path, self);
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(saver) = self.take_saver() {
            saver.stop_and_join();
        }
        self.finish_close(marker)
    }

    /// Like close(), but does not join the saver thread. Used by exit hooks.
    pub(crate) fn close_sync(&self) -> Result<()> {
        let marker = registry::begin_close(&self.path, self);
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(saver) = self.take_saver() {
            saver.signal();
        }
        self.finish_close(marker)
    }

    fn finish_close(&self, marker: Option<Reservation>) -> Result<()> {
        metrics::record_session_closed();
        let res = self.save().map(|wrote| {
            info!(
                "closed cache {} ({})",
                self.path.display(),
                if wrote { "flushed" } else { "clean" }
            );
        });
        drop(marker);
        res
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Handle to an open cache. Clones share the session; the handle derefs to
/// the root node, so reads and writes go straight through it.
#[derive(Clone)]
pub struct Cache {
    session: Arc<Session>,
}

impl Cache {
    pub fn root(&self) -> &Node {
        &self.session.root
    }

    pub fn path(&self) -> &Path {
        &self.session.path
    }

    /// Options the session was created with (a reopen does not change them).
    pub fn options(&self) -> &CacheOptions {
        &self.session.options
    }

    pub fn is_dict(&self) -> bool {
        self.session.options.dict
    }

    pub fn is_dirty(&self) -> bool {
        self.session.tracker.is_dirty()
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Same session (and therefore the same root node).
    pub fn same_session(&self, other: &Cache) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }

    /// Write now if dirty. Ok(true) if the file was written.
    pub fn save(&self) -> Result<bool> {
        self.session.save()
    }

    /// Stop periodic saving, deregister the path and flush if dirty.
    /// A second close is a no-op.
    pub fn close(&self) -> Result<()> {
        self.session.close()
    }

    /// close() for termination paths: does not wait for the saver thread.
    pub fn close_sync(&self) -> Result<()> {
        self.session.close_sync()
    }
}

impl Deref for Cache {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.session.root
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("path", &self.session.path)
            .field("dirty", &self.is_dirty())
            .field("closed", &self.is_closed())
            .finish()
    }
}
