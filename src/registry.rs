//! registry — процессный реестр открытых сессий (path -> Session).
//!
//! Назначение:
//! - Не больше одной живой сессии на путь: повторный open() получает ту же сессию.
//! - Слот `Busy` — путь сейчас загружается (open) или сбрасывается (close);
//!   остальные open() по этому пути ждут на condvar, а не грузят файл второй раз.
//!
//! Обратного индекса «обёртка -> сессия» нет: хэндл `Cache` сам держит Arc<Session>.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};

use crate::session::Session;

enum Slot {
    Busy,
    Open(Arc<Session>),
}

struct Registry {
    map: HashMap<PathBuf, Slot>,
}

static REGISTRY: OnceLock<(Mutex<Registry>, Condvar)> = OnceLock::new();

fn registry() -> &'static (Mutex<Registry>, Condvar) {
    REGISTRY.get_or_init(|| {
        (
            Mutex::new(Registry {
                map: HashMap::new(),
            }),
            Condvar::new(),
        )
    })
}

fn registry_lock() -> MutexGuard<'static, Registry> {
    registry().0.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) enum Lookup {
    Live(Arc<Session>),
    Vacant(Reservation),
}

/// Marks a path `Busy` until it is filled with a session or dropped.
/// Dropping an unfilled reservation frees the path and wakes waiters.
pub(crate) struct Reservation {
    path: PathBuf,
    armed: bool,
}

impl Reservation {
    pub(crate) fn fill(mut self, session: Arc<Session>) {
        let (_, cv) = registry();
        let mut reg = registry_lock();
        reg.map.insert(self.path.clone(), Slot::Open(session));
        self.armed = false;
        drop(reg);
        cv.notify_all();
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (_, cv) = registry();
        let mut reg = registry_lock();
        if matches!(reg.map.get(&self.path), Some(Slot::Busy)) {
            reg.map.remove(&self.path);
        }
        drop(reg);
        cv.notify_all();
    }
}

/// Live session for `path`, or a reservation to create one.
/// Blocks while another thread holds the path `Busy`.
pub(crate) fn lookup_or_reserve(path: &Path) -> Lookup {
    let (_, cv) = registry();
    let mut reg = registry_lock();
    loop {
        match reg.map.get(path) {
            Some(Slot::Open(s)) => return Lookup::Live(s.clone()),
            Some(Slot::Busy) => {
                reg = cv.wait(reg).unwrap_or_else(|e| e.into_inner());
            }
            None => {
                reg.map.insert(path.to_path_buf(), Slot::Busy);
                return Lookup::Vacant(Reservation {
                    path: path.to_path_buf(),
                    armed: true,
                });
            }
        }
    }
}

/// Switch `path` from this session to `Busy` for the duration of the final
/// flush. None if the registry no longer points at `session`.
pub(crate) fn begin_close(path: &Path, session: &Session) -> Option<Reservation> {
    let mut reg = registry_lock();
    let owned = matches!(
        reg.map.get(path),
        Some(Slot::Open(s)) if std::ptr::eq(Arc::as_ptr(s), session)
    );
    if !owned {
        return None;
    }
    reg.map.insert(path.to_path_buf(), Slot::Busy);
    Some(Reservation {
        path: path.to_path_buf(),
        armed: true,
    })
}

pub(crate) fn live_sessions() -> Vec<Arc<Session>> {
    registry_lock()
        .map
        .values()
        .filter_map(|slot| match slot {
            Slot::Open(s) => Some(s.clone()),
            Slot::Busy => None,
        })
        .collect()
}

/// Paths with a live session.
pub fn open_paths() -> Vec<PathBuf> {
    registry_lock()
        .map
        .iter()
        .filter(|(_, slot)| matches!(slot, Slot::Open(_)))
        .map(|(p, _)| p.clone())
        .collect()
}

pub fn is_open(path: impl AsRef<Path>) -> bool {
    matches!(registry_lock().map.get(path.as_ref()), Some(Slot::Open(_)))
}
