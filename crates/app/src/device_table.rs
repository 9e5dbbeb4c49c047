//! Device table — in-memory derived state per device, shared by both loops.
//!
//! The table only grows: there is no removal operation, so a missing key
//! always means "never observed". Each entry is replaced wholesale; no
//! history is retained.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use greenhouse_domain::id::DeviceId;

/// Mutex-guarded mapping from device to policy state.
///
/// Cloning yields another handle onto the same table.
pub struct DeviceTable<T> {
    entries: Arc<Mutex<HashMap<DeviceId, T>>>,
}

impl<T> Clone for DeviceTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for DeviceTable<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> DeviceTable<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically read one entry and optionally replace it.
    ///
    /// `f` receives the current value and returns the replacement, or `None`
    /// to leave the entry untouched. Returns the stored replacement.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`; the entry is left untouched.
    pub async fn update_with<E, F>(&self, device_id: &DeviceId, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(Option<&T>) -> Result<Option<T>, E>,
    {
        let mut entries = self.entries.lock().await;
        let replacement = f(entries.get(device_id))?;
        if let Some(value) = &replacement {
            entries.insert(device_id.clone(), value.clone());
        }
        Ok(replacement)
    }

    /// Replace one entry, returning the previous value.
    pub async fn insert(&self, device_id: DeviceId, value: T) -> Option<T> {
        self.entries.lock().await.insert(device_id, value)
    }

    /// Current value for one device.
    pub async fn get(&self, device_id: &DeviceId) -> Option<T> {
        self.entries.lock().await.get(device_id).cloned()
    }

    /// Copy of every entry, in unspecified order.
    pub async fn snapshot(&self) -> Vec<(DeviceId, T)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_start_empty() {
        let table: DeviceTable<f64> = DeviceTable::new();
        assert!(table.is_empty().await);
        assert_eq!(table.get(&DeviceId::new("d1")).await, None);
    }

    #[tokio::test]
    async fn should_insert_value_when_update_returns_some() {
        let table = DeviceTable::new();
        let id = DeviceId::new("d1");

        let stored = table
            .update_with::<(), _>(&id, |current| {
                assert!(current.is_none());
                Ok(Some(800.0))
            })
            .await
            .unwrap();

        assert_eq!(stored, Some(800.0));
        assert_eq!(table.get(&id).await, Some(800.0));
    }

    #[tokio::test]
    async fn should_replace_value_wholesale() {
        let table = DeviceTable::new();
        let id = DeviceId::new("d1");
        table.insert(id.clone(), 800.0).await;

        table
            .update_with::<(), _>(&id, |current| {
                assert_eq!(current, Some(&800.0));
                Ok(Some(1200.0))
            })
            .await
            .unwrap();

        assert_eq!(table.get(&id).await, Some(1200.0));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn should_leave_entry_untouched_when_update_returns_none() {
        let table = DeviceTable::new();
        let id = DeviceId::new("d1");
        table.insert(id.clone(), 800.0).await;

        let stored = table
            .update_with::<(), _>(&id, |_| Ok(None))
            .await
            .unwrap();

        assert_eq!(stored, None);
        assert_eq!(table.get(&id).await, Some(800.0));
    }

    #[tokio::test]
    async fn should_leave_entry_untouched_when_update_fails() {
        let table: DeviceTable<f64> = DeviceTable::new();
        let id = DeviceId::new("d1");

        let result = table.update_with(&id, |_| Err("bad payload")).await;

        assert_eq!(result, Err("bad payload"));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn should_share_entries_between_clones() {
        let table = DeviceTable::new();
        let other = table.clone();
        table.insert(DeviceId::new("d1"), 1.0).await;

        let mut snapshot = other.snapshot().await;
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(snapshot, vec![(DeviceId::new("d1"), 1.0)]);
    }

    #[tokio::test]
    async fn should_return_previous_value_on_insert() {
        let table = DeviceTable::new();
        let id = DeviceId::new("d1");
        assert_eq!(table.insert(id.clone(), 1.0).await, None);
        assert_eq!(table.insert(id, 2.0).await, Some(1.0));
    }
}
