use anyhow::{Context, Result};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use famtree_core::{parse_dataset, to_json_pretty, RelationshipStore};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Loads and saves the dataset JSON file with file locking.
///
/// The content hash seen at load time is remembered; a save is refused when
/// the file on disk no longer matches it, so edits made elsewhere are never
/// silently overwritten.
pub struct DatasetFile {
    file_path: PathBuf,
    lock_file_path: PathBuf,
    loaded_hash: Option<String>,
}

impl DatasetFile {
    /// Creates a new DatasetFile instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let mut lock_name = file_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        lock_name.push(".lock");
        let lock_file_path = file_path.with_file_name(lock_name);
        Self {
            file_path,
            lock_file_path,
            loaded_hash: None,
        }
    }

    /// Returns the path to the dataset file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Acquire an exclusive lock for writing.
    /// The returned handle must be held for the duration of the write.
    fn acquire_write_lock(&self) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |file| FileExt::try_lock_exclusive(file))?;
        Ok(lock_file)
    }

    /// Acquire a shared lock for reading, if a lock file exists
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |file| FileExt::try_lock_shared(file))?;
        Ok(Some(lock_file))
    }

    fn wait_for_lock<F>(&self, lock_file: &File, try_lock: F) -> Result<()>
    where
        F: Fn(&File) -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another user may be editing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Loads the dataset and remembers its content hash
    pub fn load(&mut self) -> Result<RelationshipStore> {
        if !self.file_path.exists() {
            anyhow::bail!("Dataset file not found: {:?}", self.file_path);
        }

        let _lock = self.acquire_read_lock()?;

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read dataset: {:?}", self.file_path))?;
        let store = parse_dataset(&content)
            .with_context(|| format!("Failed to parse dataset from {:?}", self.file_path))?;

        self.loaded_hash = Some(content_hash(content.as_bytes()));
        log::debug!(
            "event=dataset_loaded path={} people={}",
            self.file_path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Saves the store, refusing if the file changed since it was loaded
    pub fn save(&mut self, store: &RelationshipStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut lock_file = self.acquire_write_lock()?;

        // Write lock holder info (optional, for debugging)
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let on_disk = if self.file_path.exists() {
            let bytes = fs::read(&self.file_path)
                .with_context(|| format!("Failed to read dataset: {:?}", self.file_path))?;
            Some(content_hash(&bytes))
        } else {
            None
        };
        if on_disk != self.loaded_hash {
            anyhow::bail!(
                "Dataset {:?} changed on disk since it was loaded; reload before saving",
                self.file_path
            );
        }

        let json = to_json_pretty(store).context("Failed to serialize dataset")?;
        fs::write(&self.file_path, &json)
            .with_context(|| format!("Failed to write dataset: {:?}", self.file_path))?;
        self.loaded_hash = Some(content_hash(json.as_bytes()));

        log::info!(
            "event=dataset_saved path={} people={}",
            self.file_path.display(),
            store.len()
        );
        // Lock is released when lock_file is dropped
        Ok(())
    }
}

/// Hex-encoded SHA-256 of the file contents
fn content_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
