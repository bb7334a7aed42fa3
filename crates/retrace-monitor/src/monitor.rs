//! Filesystem watching and automatic operation capture
//!
//! Raw watcher events flow through a debounce loop into a single
//! consumer task that owns all log writes. Per-file content is cached so
//! each change can be diffed against the last observed state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use retrace_core::{DiffEngine, Operation, OperationLog};

use crate::config::MonitorConfig;
use crate::error::MonitorError;

/// Accumulated counters for a monitoring session
#[derive(Debug, Clone)]
pub struct MonitorStats {
    /// Files currently tracked in the content cache
    pub files_watched: usize,
    /// Operations appended to the log by this session
    pub operations_logged: u64,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session last logged an operation
    pub last_activity: Option<DateTime<Utc>>,
}

impl MonitorStats {
    /// Time elapsed since the session started
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Point-in-time view of the monitor
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    /// Whether a watch session is running
    pub active: bool,
    /// Configuration the monitor was built with
    pub config: MonitorConfig,
    /// Counters for the current or most recent session
    pub stats: MonitorStats,
}

/// Last observed state of one file
#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    size: u64,
    last_seen: DateTime<Utc>,
}

#[derive(Debug)]
struct StatsState {
    operations_logged: u64,
    started_at: DateTime<Utc>,
    last_activity: Option<DateTime<Utc>>,
}

/// Shared capture state: filters, per-file cache, and the log writer
struct Capture {
    config: MonitorConfig,
    ignore: GlobSet,
    log: Arc<OperationLog>,
    diff: DiffEngine,
    cache: RwLock<HashMap<PathBuf, CacheEntry>>,
    stats: RwLock<StatsState>,
}

impl Capture {
    /// Whether a path passes the ignore globs and extension filter
    fn eligible(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.config.root) {
            Ok(relative) => relative,
            Err(_) => return false,
        };
        if self.ignore.is_match(relative) {
            return false;
        }
        if self.config.extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted.eq_ignore_ascii_case(ext))
    }

    /// Read a file's content, skipping oversize and non-text files
    async fn read_content(&self, path: &Path) -> Option<(String, u64)> {
        let metadata = fs::metadata(path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        if metadata.len() > self.config.max_file_size {
            debug!(
                "Skipping {} ({} bytes over the size cap)",
                path.display(),
                metadata.len()
            );
            return None;
        }
        let content = fs::read_to_string(path).await.ok()?;
        Some((content, metadata.len()))
    }

    fn cache_insert(&self, path: &Path, content: String, size: u64) -> Result<(), MonitorError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| MonitorError::lock("content cache write"))?;
        cache.insert(
            path.to_path_buf(),
            CacheEntry {
                content,
                size,
                last_seen: Utc::now(),
            },
        );
        Ok(())
    }

    fn cache_get(&self, path: &Path) -> Result<Option<String>, MonitorError> {
        let cache = self
            .cache
            .read()
            .map_err(|_| MonitorError::lock("content cache read"))?;
        Ok(cache.get(path).map(|entry| entry.content.clone()))
    }

    fn cache_evict(&self, path: &Path) -> Result<Option<String>, MonitorError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| MonitorError::lock("content cache write"))?;
        Ok(cache.remove(path).map(|entry| {
            debug!(
                "Evicting {} ({} bytes, last seen {})",
                path.display(),
                entry.size,
                entry.last_seen
            );
            entry.content
        }))
    }

    fn cache_len(&self) -> Result<usize, MonitorError> {
        let cache = self
            .cache
            .read()
            .map_err(|_| MonitorError::lock("content cache read"))?;
        Ok(cache.len())
    }

    async fn append_all(&self, operations: Vec<Operation>) -> Result<usize, MonitorError> {
        let logged = operations.len();
        for op in operations {
            self.log.append(op).await?;
        }
        if logged > 0 {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MonitorError::lock("stats write"))?;
            stats.operations_logged += logged as u64;
            stats.last_activity = Some(Utc::now());
        }
        Ok(logged)
    }

    /// A new file appeared: record its creation and seed the cache
    async fn handle_added(&self, path: &Path) -> Result<usize, MonitorError> {
        if !self.eligible(path) {
            return Ok(0);
        }
        // Vanished or unreadable before we got to it
        let Some((content, size)) = self.read_content(path).await else {
            return Ok(0);
        };
        let operations = self.diff.diff(path, None, Some(&content));
        let logged = self.append_all(operations).await?;
        self.cache_insert(path, content, size)?;
        Ok(logged)
    }

    /// A tracked file changed: diff against the cached content
    async fn handle_changed(&self, path: &Path) -> Result<usize, MonitorError> {
        if !self.eligible(path) {
            return Ok(0);
        }
        let Some((content, size)) = self.read_content(path).await else {
            return Ok(0);
        };
        let old = self.cache_get(path)?.unwrap_or_default();
        if old == content {
            return Ok(0);
        }
        let operations = self.diff.diff(path, Some(&old), Some(&content));
        let logged = self.append_all(operations).await?;
        self.cache_insert(path, content, size)?;
        Ok(logged)
    }

    /// A tracked file disappeared: record its deletion and evict it
    async fn handle_removed(&self, path: &Path) -> Result<usize, MonitorError> {
        if !self.eligible(path) {
            return Ok(0);
        }
        let Some(old) = self.cache_evict(path)? else {
            return Ok(0);
        };
        let operations = self.diff.diff(path, Some(&old), None);
        self.append_all(operations).await
    }

    /// Route one debounced path to the right handler based on the
    /// current filesystem and cache state
    async fn process(&self, path: &Path) -> Result<usize, MonitorError> {
        let exists = fs::try_exists(path).await.unwrap_or(false);
        let cached = self.cache_get(path)?.is_some();
        match (exists, cached) {
            (false, false) => Ok(0),
            (false, true) => self.handle_removed(path).await,
            (true, false) => self.handle_added(path).await,
            (true, true) => self.handle_changed(path).await,
        }
    }

    /// Walk the tree once and seed the cache without logging anything
    async fn initial_scan(&self) -> Result<usize, MonitorError> {
        let mut seeded = 0usize;
        for entry in WalkDir::new(&self.config.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !self.eligible(path) {
                continue;
            }
            if let Some((content, size)) = self.read_content(path).await {
                self.cache_insert(path, content, size)?;
                seeded += 1;
            }
        }
        debug!("Initial scan seeded {} files", seeded);
        Ok(seeded)
    }

    fn snapshot_stats(&self) -> Result<MonitorStats, MonitorError> {
        let stats = self
            .stats
            .read()
            .map_err(|_| MonitorError::lock("stats read"))?;
        Ok(MonitorStats {
            files_watched: self.cache_len()?,
            operations_logged: stats.operations_logged,
            started_at: stats.started_at,
            last_activity: stats.last_activity,
        })
    }

    fn reset_stats(&self) -> Result<(), MonitorError> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| MonitorError::lock("stats write"))?;
        *stats = StatsState {
            operations_logged: 0,
            started_at: Utc::now(),
            last_activity: None,
        };
        Ok(())
    }
}

/// One running watch session's handles
struct Session {
    _watcher: RecommendedWatcher,
    shutdown: oneshot::Sender<()>,
    consumer: JoinHandle<()>,
}

/// Watches a directory tree and appends captured operations to the log
pub struct ChangeMonitor {
    capture: Arc<Capture>,
    session: Option<Session>,
}

impl ChangeMonitor {
    /// Build a monitor over the given log; no watching starts yet
    pub fn new(config: MonitorConfig, log: Arc<OperationLog>) -> Result<Self, MonitorError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore {
            builder.add(Glob::new(pattern)?);
        }
        let ignore = builder.build()?;

        Ok(ChangeMonitor {
            capture: Arc::new(Capture {
                config,
                ignore,
                log,
                diff: DiffEngine::new(),
                cache: RwLock::new(HashMap::new()),
                stats: RwLock::new(StatsState {
                    operations_logged: 0,
                    started_at: Utc::now(),
                    last_activity: None,
                }),
            }),
            session: None,
        })
    }

    /// Whether a watch session is running
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start watching: seed the cache with an initial scan, then stream
    /// debounced events into the capture handlers
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.session.is_some() {
            return Err(MonitorError::AlreadyActive);
        }

        self.capture.reset_stats()?;
        let seeded = self.capture.initial_scan().await?;
        info!(
            "Watching {} ({} files tracked)",
            self.capture.config.root.display(),
            seeded
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    let _ = event_tx.send(event.paths);
                }
                Err(e) => warn!("Watcher error: {}", e),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.capture.config.root, RecursiveMode::Recursive)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let consumer = tokio::spawn(consume_events(
            Arc::clone(&self.capture),
            event_rx,
            shutdown_rx,
        ));

        self.session = Some(Session {
            _watcher: watcher,
            shutdown: shutdown_tx,
            consumer,
        });
        Ok(())
    }

    /// Stop watching and return the session's accumulated stats
    pub async fn stop(&mut self) -> Result<MonitorStats, MonitorError> {
        let session = self.session.take().ok_or(MonitorError::NotActive)?;
        // Dropping the watcher closes the event channel; the consumer
        // flushes whatever is still pending and exits
        drop(session._watcher);
        let _ = session.shutdown.send(());
        let _ = session.consumer.await;

        let stats = self.capture.snapshot_stats()?;
        info!(
            "Monitoring stopped: {} operations logged across {} files",
            stats.operations_logged, stats.files_watched
        );
        Ok(stats)
    }

    /// Active flag, configuration, and live counters
    pub fn status(&self) -> Result<MonitorStatus, MonitorError> {
        Ok(MonitorStatus {
            active: self.session.is_some(),
            config: self.capture.config.clone(),
            stats: self.capture.snapshot_stats()?,
        })
    }

    /// Capture a newly created file directly, bypassing the watcher
    pub async fn handle_added(&self, path: &Path) -> Result<usize, MonitorError> {
        self.capture.handle_added(path).await
    }

    /// Capture a modification directly, bypassing the watcher
    pub async fn handle_changed(&self, path: &Path) -> Result<usize, MonitorError> {
        self.capture.handle_changed(path).await
    }

    /// Capture a deletion directly, bypassing the watcher
    pub async fn handle_removed(&self, path: &Path) -> Result<usize, MonitorError> {
        self.capture.handle_removed(path).await
    }
}

/// Single consumer of debounced watcher events; owns all log writes
async fn consume_events(
    capture: Arc<Capture>,
    mut events: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let settle = capture.config.settle_window;
    let mut pending: HashSet<PathBuf> = HashSet::new();

    loop {
        tokio::select! {
            batch = events.recv() => match batch {
                Some(paths) => {
                    pending.extend(paths);
                }
                None => break,
            },
            _ = &mut shutdown => break,
            // The window restarts on every new event; paths are only
            // processed after the tree goes quiet
            _ = tokio::time::sleep(settle), if !pending.is_empty() => {
                flush(&capture, &mut pending).await;
            }
        }
    }
    // Deterministic shutdown: whatever settled in flight still lands
    flush(&capture, &mut pending).await;
}

async fn flush(capture: &Capture, pending: &mut HashSet<PathBuf>) {
    for path in pending.drain() {
        if let Err(e) = capture.process(&path).await {
            warn!("Failed to capture change for {}: {}", path.display(), e);
        }
    }
}
