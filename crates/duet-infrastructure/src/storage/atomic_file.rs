//! Atomic document files.
//!
//! Provides a thin layer for safe concurrent access to JSON and TOML files.

use duet_core::DuetError;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// On-disk encoding of an [`AtomicFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn name(self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
        }
    }
}

/// Errors that can occur during atomic file operations.
#[derive(Debug)]
pub enum AtomicFileError {
    /// File I/O error.
    IoError(std::io::Error),
    /// Parse or serialization error, tagged with the format name.
    FormatError(&'static str, String),
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicFileError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicFileError::FormatError(format, e) => write!(f, "{} error: {}", format, e),
            AtomicFileError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicFileError {}

impl From<std::io::Error> for AtomicFileError {
    fn from(e: std::io::Error) -> Self {
        AtomicFileError::IoError(e)
    }
}

impl From<AtomicFileError> for DuetError {
    fn from(err: AtomicFileError) -> Self {
        match err {
            AtomicFileError::IoError(e) => e.into(),
            AtomicFileError::FormatError(format, message) => DuetError::Serialization {
                format: format.to_string(),
                message,
            },
            AtomicFileError::LockError(message) => DuetError::io(message),
        }
    }
}

/// A handle to a document file that is never observed half-written.
///
/// - Writes go to a temporary sibling file, are fsynced, then renamed over
///   the target.
/// - Writers serialize on an advisory lock file next to the target.
pub struct AtomicFile<T> {
    path: PathBuf,
    format: FileFormat,
    _phantom: PhantomData<T>,
}

impl<T> AtomicFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf, format: FileFormat) -> Self {
        Self {
            path,
            format,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// A missing or blank file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<T>, AtomicFileError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        self.decode(&content).map(Some)
    }

    /// Saves `data` atomically without taking the lock.
    pub fn save(&self, data: &T) -> Result<(), AtomicFileError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let encoded = self.encode(data)?;

        let tmp_path = self.get_temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(encoded.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Saves `data` atomically while holding the exclusive lock.
    pub fn replace(&self, data: &T) -> Result<(), AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;
        self.save(data)
    }

    fn encode(&self, data: &T) -> Result<String, AtomicFileError> {
        let result = match self.format {
            FileFormat::Json => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
            FileFormat::Toml => toml::to_string_pretty(data).map_err(|e| e.to_string()),
        };
        result.map_err(|e| AtomicFileError::FormatError(self.format.name(), e))
    }

    fn decode(&self, content: &str) -> Result<T, AtomicFileError> {
        let result = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        result.map_err(|e| AtomicFileError::FormatError(self.format.name(), e))
    }

    fn get_temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let invalid = |what: &str| {
            AtomicFileError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no {what}"),
            ))
        };
        let parent = self.path.parent().ok_or_else(|| invalid("parent directory"))?;
        let file_name = self.path.file_name().ok_or_else(|| invalid("file name"))?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        use fs2::FileExt;
        file.lock_exclusive()
            .map_err(|e| AtomicFileError::LockError(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlocks with the handle; removing the lock file is best effort.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn counter(count: u32) -> Counter {
        Counter {
            name: "turns".to_string(),
            count,
        }
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        for (file, format) in [("c.json", FileFormat::Json), ("c.toml", FileFormat::Toml)] {
            let atomic_file = AtomicFile::<Counter>::new(temp_dir.path().join(file), format);
            atomic_file.save(&counter(42)).unwrap();
            assert_eq!(atomic_file.load().unwrap(), Some(counter(42)));
        }
    }

    #[test]
    fn test_load_missing_or_blank_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        let atomic_file = AtomicFile::<Counter>::new(path.clone(), FileFormat::Json);
        assert!(atomic_file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(atomic_file.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = AtomicFile::<Counter>::new(path, FileFormat::Json)
            .load()
            .unwrap_err();
        assert!(matches!(err, AtomicFileError::FormatError("JSON", _)));
    }

    #[test]
    fn test_replace_leaves_no_temp_or_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("state.json");
        let atomic_file = AtomicFile::<Counter>::new(file_path.clone(), FileFormat::Json);

        atomic_file.replace(&counter(1)).unwrap();

        assert!(file_path.exists());
        assert!(!temp_dir.path().join("nested").join(".state.json.tmp").exists());
        assert!(!temp_dir.path().join("nested").join("state.lock").exists());
    }
}
