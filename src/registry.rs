//! Process-wide holder of the current trained model.
//!
//! Readers clone an `Arc<TrainedModel>` under a read lock and score without holding it.
//! Writers build the replacement model first and take the write lock only to swap the pointer,
//! so an in-flight prediction always sees one complete model. Writers (retrain, reload) are
//! serialized by a separate mutex so two of them never interleave their store writes or
//! publish out of order; readers never touch it.
//!
//! Hot reload (dev/local only): set `DETECTOR_HOT_RELOAD=1` and the store's `classifier.json`
//! is polled every 2s; a changed mtime triggers `reload()`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::config::{ClassifierConfig, FeaturesConfig};
use crate::corpus::LabeledDocument;
use crate::error::{DetectorError, Result};
use crate::model::{ModelStore, TrainedModel};

pub const ENV_DETECTOR_HOT_RELOAD: &str = "DETECTOR_HOT_RELOAD";

#[derive(Clone, Debug)]
pub struct ModelRegistry {
    store: Option<ModelStore>,
    inner: Arc<RwLock<Option<Arc<TrainedModel>>>>,
    writer: Arc<Mutex<()>>,
}

impl ModelRegistry {
    /// Registry with no store and no model: every prediction uses the keyword rules.
    pub fn empty() -> Self {
        Self {
            store: None,
            inner: Arc::new(RwLock::new(None)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Registry seeded with an in-memory model (no backing store).
    pub fn with_model(model: TrainedModel) -> Self {
        let reg = Self::empty();
        reg.publish(model);
        reg
    }

    /// Bind to `store` and try to load it. A failed load leaves the registry empty and is
    /// returned so the caller can log the degraded mode.
    pub fn load(store: ModelStore) -> (Self, Result<()>) {
        let reg = Self {
            store: Some(store),
            ..Self::empty()
        };
        let res = reg.reload();
        (reg, res)
    }

    pub fn store(&self) -> Option<&ModelStore> {
        self.store.as_ref()
    }

    /// Snapshot of the current model, if any.
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// Swap in a fully built model.
    pub fn publish(&self, model: TrainedModel) {
        let next = Some(Arc::new(model));
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        crate::metrics::set_model_loaded(true);
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Train a fresh model, persist it to the bound store (if any), then publish it.
    /// Nothing is published if training or saving fails.
    pub fn retrain(
        &self,
        corpus: &[LabeledDocument],
        features: &FeaturesConfig,
        classifier: &ClassifierConfig,
    ) -> anyhow::Result<()> {
        let _writer = self.lock_writer();
        let model = TrainedModel::train(corpus, features, classifier)?;
        if let Some(store) = &self.store {
            store.save(&model)?;
        }
        self.publish(model);
        Ok(())
    }

    /// Re-read the store. On failure the previously published model stays in place.
    pub fn reload(&self) -> Result<()> {
        let store = self.store.as_ref().ok_or_else(|| {
            DetectorError::unavailable(PathBuf::new(), "registry has no model store")
        })?;
        let _writer = self.lock_writer();
        let res = store.load();
        let outcome = if res.is_ok() { "ok" } else { "error" };
        metrics::counter!("detector_model_reloads_total", "outcome" => outcome).increment(1);

        let model = res?;
        info!(
            dir = %store.dir().display(),
            vocabulary = model.vocabulary_len(),
            "model published"
        );
        self.publish(model);
        Ok(())
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var(ENV_DETECTOR_HOT_RELOAD)
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Poll the store's classifier artifact and reload on change.
pub fn start_hot_reload_thread(registry: ModelRegistry) {
    if !hot_reload_enabled() {
        return;
    }
    let Some(path) = registry.store().map(ModelStore::classifier_path) else {
        return;
    };
    info!(path = %path.display(), "model hot reload enabled");

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;
        loop {
            poll_store_once(&registry, &path, &mut last_mtime);
            thread::sleep(poll);
        }
    });
}

/// One watcher tick: the first readable mtime becomes the baseline, a newer one triggers
/// `reload()`. Returns true when a reload was attempted.
fn poll_store_once(
    registry: &ModelRegistry,
    path: &Path,
    last_mtime: &mut Option<SystemTime>,
) -> bool {
    let Ok(mtime) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    let changed = last_mtime.is_some_and(|prev| mtime > prev);
    *last_mtime = Some(mtime);
    if changed {
        if let Err(e) = registry.reload() {
            warn!(error = %e, "hot reload failed; keeping previous model");
        }
    }
    changed
}
