//! session/open — открытие кэша: реестр, загрузка файла, запуск saver.

use log::{debug, info};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::lifecycle;
use crate::metrics;
use crate::node::tracker::Tracker;
use crate::node::{wrap, Node};
use crate::registry::{self, Lookup};

use super::saver::Saver;
use super::{io, Cache, Session};

impl Cache {
    /// Open (or join) the cache backed by `path`.
    ///
    /// If the path already has a live session its handle is returned and
    /// `options` are ignored. Otherwise the file is loaded (or an empty
    /// record is used when it does not exist) and periodic saving starts.
    pub fn open(path: impl AsRef<Path>, options: CacheOptions) -> Result<Cache> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CacheError::Config("path required".into()));
        }

        match registry::lookup_or_reserve(path) {
            Lookup::Live(session) => {
                metrics::record_reopen_hit();
                debug!("reopen {} -> existing session", path.display());
                Ok(Cache { session })
            }
            Lookup::Vacant(reservation) => {
                // reservation снимается в Drop, если create() вернёт ошибку
                let session = Session::create(path, options)?;
                lifecycle::install();
                reservation.fill(session.clone());
                metrics::record_session_opened();
                info!(
                    "opened cache {} (save every {} ms{})",
                    path.display(),
                    session.options.save_period.as_millis(),
                    if session.options.dict { ", dict" } else { "" }
                );
                Ok(Cache { session })
            }
        }
    }

    /// Open with `CacheOptions::from_env()`.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Cache> {
        Self::open(path, CacheOptions::from_env())
    }
}

impl Session {
    fn create(path: &Path, options: CacheOptions) -> Result<Arc<Session>> {
        options.validate()?;

        let tracker = Tracker::new();
        let root = match io::read_json(path)? {
            Some(value) => wrap::wrap_root(&tracker, value).ok_or_else(|| CacheError::BadRoot {
                path: path.to_path_buf(),
            })?,
            None => Node::empty_record(&tracker),
        };

        let period = options.save_period;
        let session = Arc::new(Session {
            path: path.to_path_buf(),
            options,
            root,
            tracker,
            io: Mutex::new(()),
            closed: AtomicBool::new(false),
            saver: Mutex::new(None),
        });

        let saver = Saver::spawn(Arc::downgrade(&session), period, path)?;
        *session.saver.lock().unwrap_or_else(|e| e.into_inner()) = Some(saver);
        Ok(session)
    }
}
