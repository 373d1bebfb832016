//! Reflection store that can be switched offline
//!
//! Wraps a real `Storage` and fails every call with `StorageError::Unavailable`
//! while offline, the way an unreachable backend would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use echoes_core::storage::Result;
use echoes_core::{NewReflection, Reflection, ReflectionStore, SettingsBlob, Storage, StorageError};

pub struct FlakyStore {
    inner: Arc<Storage>,
    offline: AtomicBool,
    failed_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<Storage>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            failed_calls: AtomicUsize::new(0),
        }
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    /// Calls rejected while offline
    pub fn failed_calls(&self) -> usize {
        self.failed_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Unavailable("store offline".into()));
        }
        Ok(())
    }
}

impl ReflectionStore for FlakyStore {
    fn create_reflection(&self, input: NewReflection) -> Result<Reflection> {
        self.check()?;
        self.inner.create_reflection(input)
    }

    fn import_reflection(&self, reflection: &Reflection) -> Result<Reflection> {
        self.check()?;
        self.inner.import_reflection(reflection)
    }

    fn list_reflections(&self, user: &str) -> Result<Vec<Reflection>> {
        self.check()?;
        self.inner.list_reflections(user)
    }

    fn get_reflection(&self, id: &str) -> Result<Option<Reflection>> {
        self.check()?;
        self.inner.get_reflection(id)
    }

    fn update_reflection(&self, id: &str, response_text: &str) -> Result<Reflection> {
        self.check()?;
        self.inner.update_reflection(id, response_text)
    }

    fn delete_reflection(&self, id: &str) -> Result<bool> {
        self.check()?;
        self.inner.delete_reflection(id)
    }

    fn read_settings(&self, user: &str) -> Result<Option<SettingsBlob>> {
        self.check()?;
        self.inner.read_settings(user)
    }

    fn write_settings(&self, user: &str, blob: &SettingsBlob) -> Result<()> {
        self.check()?;
        self.inner.write_settings(user, blob)
    }
}
