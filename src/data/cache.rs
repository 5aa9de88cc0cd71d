//! Content-addressed memo of evaluations.
//!
//! Entries are keyed by the candidate fingerprint combined with a scoring
//! fingerprint (the test suite plus the evaluator settings that shape a
//! result). Every entry carries the parameters and scoring fingerprint it was
//! computed for; a lookup that finds anything else under the key is treated as a
//! corrupted store, never as a hit.

use crate::config::CacheConfig;
use crate::error::{NeurofitError, Result};
use crate::types::{Evaluation, Fingerprint, ParamMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub suite: Fingerprint,
    pub params: ParamMap,
    pub evaluation: Evaluation,
}

/// Key-value backend of the cache.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>>;

    /// Must make the entry visible to `get` only once it is fully stored.
    fn put(&self, entry: CacheEntry) -> Result<()>;

    fn exists(&self, key: &Fingerprint) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(entry.key, entry);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// JSON-lines file, loaded on open and appended to on every put.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    writer: Mutex<BufWriter<File>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut entries: HashMap<Fingerprint, CacheEntry> = HashMap::new();
        let mut torn_tail = false;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            torn_tail = !contents.is_empty() && !contents.ends_with('\n');
            for (lineno, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry: CacheEntry = match serde_json::from_str(line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        // A crash mid-append leaves a torn final line.
                        log::warn!("Skipping unreadable cache line {} in {}: {}", lineno + 1, path.display(), e);
                        continue;
                    }
                };
                if let Some(existing) = entries.get(&entry.key) {
                    if existing.params != entry.params || existing.suite != entry.suite {
                        return Err(corruption(&entry.key, &existing.params, &entry.params));
                    }
                }
                entries.insert(entry.key, entry);
            }
            log::info!("Loaded {} cached evaluations from {}", entries.len(), path.display());
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if torn_tail {
            // Terminate the fragment so the next entry starts on its own line.
            file.write_all(b"\n")?;
            file.flush()?;
        }
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        {
            let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
            writer.write_all(line.as_bytes())?;
            writer.flush()?;
        }
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(entry.key, entry);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Memoises evaluations so each (parameters, scoring) pair is computed at
/// most once per run. Concurrent callers for the same key are serialised:
/// the second blocks until the first has stored its result, then reads it.
pub struct EvaluationCache {
    store: Option<Arc<dyn CacheStore>>,
    in_flight: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EvaluationCache {
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Every lookup computes; nothing is stored.
    pub fn disabled() -> Self {
        Self {
            store: None,
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        match &config.path {
            Some(path) => Ok(Self::with_store(Arc::new(FileStore::open(path)?))),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn key(params: &ParamMap, suite: &Fingerprint) -> Fingerprint {
        Fingerprint::of_params(params).combine(suite)
    }

    pub fn get_or_compute<F>(&self, params: &ParamMap, suite: &Fingerprint, compute: F) -> Result<Evaluation>
    where
        F: FnOnce() -> Result<Evaluation>,
    {
        let Some(store) = &self.store else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute();
        };

        let key = Self::key(params, suite);
        if let Some(evaluation) = self.lookup(store.as_ref(), &key, params, suite)? {
            return Ok(evaluation);
        }

        let slot = {
            let mut in_flight = lock(&self.in_flight);
            Arc::clone(in_flight.entry(key).or_default())
        };
        let result = {
            let _guard = lock(&slot);
            match self.lookup(store.as_ref(), &key, params, suite) {
                Ok(Some(evaluation)) => Ok(evaluation),
                Err(e) => Err(e),
                Ok(None) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    compute().and_then(|evaluation| {
                        store.put(CacheEntry {
                            key,
                            suite: *suite,
                            params: params.clone(),
                            evaluation: evaluation.clone(),
                        })?;
                        Ok(evaluation)
                    })
                }
            }
        };
        lock(&self.in_flight).remove(&key);
        result
    }

    fn lookup(
        &self,
        store: &dyn CacheStore,
        key: &Fingerprint,
        params: &ParamMap,
        suite: &Fingerprint,
    ) -> Result<Option<Evaluation>> {
        match store.get(key)? {
            Some(entry) if entry.params == *params && entry.suite == *suite => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.evaluation))
            }
            Some(entry) => Err(corruption(key, &entry.params, params)),
            None => Ok(None),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.store.as_ref().map(|s| s.len()).unwrap_or(0),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn corruption(key: &Fingerprint, stored: &ParamMap, requested: &ParamMap) -> NeurofitError {
    NeurofitError::CacheCorruption {
        key: key.to_hex(),
        stored: format!("{:?}", stored),
        requested: format!("{:?}", requested),
    }
}
