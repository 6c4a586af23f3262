//! Persisted credential slots with cookie semantics: a value, a path scope and
//! an absolute expiry. Expired entries read as absent and are dropped lazily.

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};
use ulid::Ulid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("credential store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("credential store is corrupted: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("credential store lock poisoned")]
    Poisoned,
    #[error("invalid max age: {0:?}")]
    MaxAge(Duration),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub path: String,
}

impl CookieOptions {
    fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
        chrono::Duration::from_std(self.max_age)
            .ok()
            .and_then(|max_age| now.checked_add_signed(max_age))
            .ok_or(Error::MaxAge(self.max_age))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    value: String,
    path: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

type Jar = BTreeMap<String, Entry>;

/// Key-value storage for credentials shared by every session manager of an origin.
pub trait CredentialStore: Send + Sync {
    /// Returns the live value stored under `name`.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, name: &str) -> Result<Option<String>, Error>;

    /// Stores `value` under `name`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), Error>;

    /// Removes `name`. Removing a missing entry is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, name: &str) -> Result<(), Error>;
}

/// In-process store, the equivalent of a single browser profile's cookie jar.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jar: Mutex<Jar>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path an entry was stored with, if it is still live.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn path_of(&self, name: &str) -> Result<Option<String>, Error> {
        let jar = self.jar.lock().map_err(|_| Error::Poisoned)?;
        let now = Utc::now();
        Ok(jar
            .get(name)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.path.clone()))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>, Error> {
        let mut jar = self.jar.lock().map_err(|_| Error::Poisoned)?;
        Ok(read_live(&mut jar, name, Utc::now()))
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), Error> {
        let entry = Entry {
            value: value.to_string(),
            path: options.path.clone(),
            expires_at: options.expires_at(Utc::now())?,
        };
        let mut jar = self.jar.lock().map_err(|_| Error::Poisoned)?;
        jar.insert(name.to_string(), entry);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        let mut jar = self.jar.lock().map_err(|_| Error::Poisoned)?;
        jar.remove(name);
        Ok(())
    }
}

/// JSON cookie jar on disk. The file is re-read on every access so separate
/// processes pointed at the same path observe each other's changes.
///
/// Writers hold an advisory lock on `<jar>.lock` for the whole
/// read-modify-write and replace the jar by renaming a uniquely named temp
/// file, so readers always see a complete jar.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file guarding writes to the jar.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, ".lock")
    }

    fn load(&self) -> Result<Jar, Error> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Jar::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Jar::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_parent(&self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn save(&self, jar: &Jar) -> Result<(), Error> {
        let tmp = with_suffix(&self.path, &format!(".{}.tmp", Ulid::new()));

        let written = serde_json::to_vec_pretty(jar)
            .map_err(Error::from)
            .and_then(|bytes| Ok(fs::write(&tmp, bytes)?))
            .and_then(|()| Ok(fs::rename(&tmp, &self.path)?));

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        debug!(path = %self.path.display(), entries = jar.len(), "credential jar saved");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Jar) -> Result<(), Error>) -> Result<(), Error> {
        let _guard = self.write_lock.lock().map_err(|_| Error::Poisoned)?;
        self.ensure_parent()?;

        // Released when `lock` is dropped.
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock)?;

        let mut jar = self.load()?;
        apply(&mut jar)?;
        let now = Utc::now();
        jar.retain(|_, entry| entry.is_live(now));
        self.save(&jar)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

impl CredentialStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<String>, Error> {
        let mut jar = self.load()?;
        let present = jar.contains_key(name);
        let value = read_live(&mut jar, name, Utc::now());
        if value.is_none() && present {
            warn!(name, "stale credential entry ignored");
        }
        Ok(value)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), Error> {
        let expires_at = options.expires_at(Utc::now())?;
        self.update(|jar| {
            jar.insert(
                name.to_string(),
                Entry {
                    value: value.to_string(),
                    path: options.path.clone(),
                    expires_at,
                },
            );
            Ok(())
        })
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|jar| {
            jar.remove(name);
            Ok(())
        })
    }
}

/// Returns the live value for `name`, evicting it from `jar` once expired.
fn read_live(jar: &mut Jar, name: &str, now: DateTime<Utc>) -> Option<String> {
    match jar.get(name) {
        Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
        Some(_) => {
            jar.remove(name);
            None
        }
        None => None,
    }
}
