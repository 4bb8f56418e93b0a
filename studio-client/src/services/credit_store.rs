//! Per-device persistence of the remaining free generations.
//!
//! Values are kept the way browser local storage keeps them: a flat map of
//! string keys to string values, the count stored as decimal text.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Key the credit count is stored under.
pub const CREDITS_KEY: &str = "free_credits";

pub trait CreditStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored for this device yet.
    fn read(&self) -> Result<Option<i64>, StoreError>;

    /// Durable once this returns.
    fn write(&self, credits: i64) -> Result<(), StoreError>;
}

/// Reads the leading decimal integer and ignores the rest, so `"2.5"` and
/// `"2abc"` are both 2. Text with no leading digits is corrupt.
fn parse_credits(raw: &str) -> Result<i64, StoreError> {
    let text = raw.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();

    text[..sign_len + digits]
        .parse::<i64>()
        .map_err(|_| StoreError::Corrupt(format!("{}={:?}", CREDITS_KEY, raw)))
}

/// Process-local store, used in tests and for throwaway sessions.
#[derive(Default)]
pub struct MemoryCreditStore {
    value: Mutex<Option<String>>,
}

impl MemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credits(credits: i64) -> Self {
        Self::with_raw(credits.to_string())
    }

    /// Seed the raw stored text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
        }
    }

    pub fn clear(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CreditStore for MemoryCreditStore {
    fn read(&self) -> Result<Option<i64>, StoreError> {
        let value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        value.as_deref().map(parse_credits).transpose()
    }

    fn write(&self, credits: i64) -> Result<(), StoreError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(credits.to_string());
        Ok(())
    }
}

/// JSON file holding a string-to-string map, shared with any other keys a
/// device keeps there.
pub struct FileCreditStore {
    path: PathBuf,
}

impl FileCreditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }
}

impl CreditStore for FileCreditStore {
    fn read(&self) -> Result<Option<i64>, StoreError> {
        let Some(map) = self.load_map()? else {
            return Ok(None);
        };
        map.get(CREDITS_KEY).map(|raw| parse_credits(raw)).transpose()
    }

    fn write(&self, credits: i64) -> Result<(), StoreError> {
        // An unreadable file is replaced rather than blocking the write
        let mut map = match self.load_map() {
            Ok(map) => map.unwrap_or_default(),
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(%reason, "Replacing unreadable credit store");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(CREDITS_KEY.to_string(), credits.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), credits, "Persisted credits");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryCreditStore::new();
        assert_eq!(store.read().unwrap(), None);

        store.write(2).unwrap();
        assert_eq!(store.read().unwrap(), Some(2));

        store.clear();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn garbage_value_is_corrupt() {
        let store = MemoryCreditStore::with_raw("three");
        assert!(matches!(store.read(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn leading_integer_is_read_and_trailing_text_ignored() {
        assert_eq!(parse_credits("2.5").unwrap(), 2);
        assert_eq!(parse_credits("2abc").unwrap(), 2);
        assert_eq!(parse_credits(" 1 ").unwrap(), 1);
        assert_eq!(parse_credits("-3").unwrap(), -3);
        assert!(matches!(parse_credits(""), Err(StoreError::Corrupt(_))));
        assert!(matches!(parse_credits("-"), Err(StoreError::Corrupt(_))));
        assert!(matches!(parse_credits("x2"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn fractional_stored_value_does_not_reset() {
        let store = MemoryCreditStore::with_raw("2.5");
        assert_eq!(store.read().unwrap(), Some(2));
    }

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCreditStore::new(dir.path().join("storage.json"));
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme": "dark", "free_credits": "3"}"#).unwrap();

        let store = FileCreditStore::new(&path);
        assert_eq!(store.read().unwrap(), Some(3));
        store.write(2).unwrap();

        let map: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(map.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(map.get(CREDITS_KEY).map(String::as_str), Some("2"));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCreditStore::new(dir.path().join("nested/deeper/storage.json"));
        store.write(3).unwrap();
        assert_eq!(store.read().unwrap(), Some(3));
    }

    #[test]
    fn unparseable_file_is_corrupt_and_overwritable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCreditStore::new(&path);
        assert!(matches!(store.read(), Err(StoreError::Corrupt(_))));

        store.write(3).unwrap();
        assert_eq!(store.read().unwrap(), Some(3));
    }
}
