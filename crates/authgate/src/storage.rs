// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: a single serialized entry behind a storage trait.
//!
//! The store never interprets the entry here; it is written verbatim and
//! read back verbatim. File writes are atomic (tmp + rename).

use std::path::PathBuf;

use parking_lot::Mutex;

/// Single-entry persistent storage for the serialized session.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted entry, if any.
    fn read(&self) -> Option<String>;
    /// Replace the persisted entry.
    fn write(&self, contents: &str) -> anyhow::Result<()>;
    /// Remove the persisted entry. Removing a missing entry is a no-op.
    fn delete(&self);
}

/// Resolve the state directory for session data.
///
/// Checks `AUTHGATE_STATE_DIR`, then `$XDG_STATE_HOME/authgate`,
/// then `$HOME/.local/state/authgate`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AUTHGATE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("authgate");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/authgate");
    }
    PathBuf::from(".authgate")
}

/// File-backed storage holding the session as one JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Storage at the default location, `<state_dir>/session.json`.
    pub fn in_state_dir() -> Self {
        Self::new(state_dir().join("session.json"))
    }
}

impl SessionStorage for FileStorage {
    fn read(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    /// Save atomically (write tmp + rename).
    ///
    /// Uses a unique temp filename (PID + counter) to avoid corruption when
    /// concurrent saves race on the same `.tmp` file — a shorter write can
    /// leave trailing bytes from a longer previous write.
    fn write(&self, contents: &str) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn delete(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// In-memory storage for tests and hosts with their own persistence.
#[derive(Default)]
pub struct MemoryStorage {
    entry: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self) -> Option<String> {
        self.entry.lock().clone()
    }

    fn write(&self, contents: &str) -> anyhow::Result<()> {
        *self.entry.lock() = Some(contents.to_owned());
        Ok(())
    }

    fn delete(&self) {
        *self.entry.lock() = None;
    }
}
