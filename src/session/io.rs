//! session/io — чтение и запись файла кэша.
//!
//! Запись выполняется атомарно через tmp+rename: файл либо старый, либо новый.
//! Родительский каталог не создаётся.

use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};
use crate::node::Node;

/// Decode the backing file, or None if it does not exist.
pub(crate) fn read_json(path: &Path) -> Result<Option<Value>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| CacheError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn encode(root: &Node, pretty: bool) -> Result<Vec<u8>> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(root)?
    } else {
        serde_json::to_vec(root)?
    };
    Ok(bytes)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8], fsync: bool) -> Result<()> {
    let tmp = tmp_path(path);

    let mut f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .map_err(|e| CacheError::io(&tmp, e))?;
    let written = f.write_all(bytes).and_then(|_| {
        if fsync {
            f.sync_all()
        } else {
            Ok(())
        }
    });
    drop(f);
    if let Err(e) = written {
        // недописанный tmp не оставляем рядом с файлом кэша
        let _ = fs::remove_file(&tmp);
        return Err(CacheError::io(&tmp, e));
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CacheError::io(path, e)
    })?;
    Ok(())
}
