use crate::engine::SmaliscopeEngine;
use crate::error::Result;
use crate::scanner::is_relevant_path;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl FsWatcher {
    fn new(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next event; `None` once the channel closes. Watch errors are logged
    /// and skipped.
    async fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await? {
                Ok(event) => return Some(event),
                Err(err) => tracing::warn!("Watch error: {}", err),
            }
        }
    }
}

impl SmaliscopeEngine {
    /// Apply filesystem changes under the project root as they happen.
    ///
    /// Events are batched until the configured debounce period passes
    /// without new ones. The task ends when `cancel_token` is cancelled or
    /// the engine is dropped.
    pub async fn start_watch_with_token(
        self: Arc<Self>,
        cancel_token: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let root = self.root_path().to_path_buf();
        let debounce = self.config().debounce;
        let mut watcher = FsWatcher::new(&root)?;
        let engine_weak = Arc::downgrade(&self);
        drop(self);

        Ok(tokio::spawn(async move {
            tracing::info!("Started watching {}", root.display());
            let mut pending: HashSet<PathBuf> = HashSet::new();

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        break;
                    }
                    event = watcher.next_event() => {
                        match event {
                            Some(e) => pending.extend(e.paths.into_iter().filter(|p| is_relevant_path(p))),
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                        let Some(engine) = engine_weak.upgrade() else {
                            break;
                        };
                        let paths: Vec<PathBuf> = pending.drain().collect();
                        tracing::info!("Detected changes in {} files. Updating...", paths.len());
                        let result = tokio::task::spawn_blocking(move || engine.update_files(paths)).await;
                        match result {
                            Ok(Ok(stats)) => tracing::debug!("Watch update: {}", stats),
                            Ok(Err(err)) => tracing::error!("Failed to update files: {}", err),
                            Err(err) => tracing::error!("Update task failed: {}", err),
                        }
                    }
                }
            }
            tracing::info!("File watcher task ended for {}", root.display());
        }))
    }

    /// Watch until the engine's own token is cancelled.
    pub async fn watch(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let cancel_token = self.cancel_token().clone();
        self.start_watch_with_token(cancel_token).await
    }
}
