//! Per-group reminder feature toggle.

use std::collections::HashMap;
use std::sync::Arc;

use riobot_storage::{BotStorage, StorageError};
use riobot_types::GroupId;
use tokio::sync::RwLock;

/// Group toggles, enabled by default. When backed by [`BotStorage`], every
/// change is written to storage before it takes effect in memory.
pub struct GroupSettings {
    enabled: RwLock<HashMap<GroupId, bool>>,
    storage: Option<Arc<BotStorage>>,
}

impl GroupSettings {
    /// Settings that reset on restart.
    pub fn in_memory() -> Self {
        Self {
            enabled: RwLock::new(HashMap::new()),
            storage: None,
        }
    }

    pub fn persistent(storage: Arc<BotStorage>) -> Self {
        Self {
            enabled: RwLock::new(HashMap::new()),
            storage: Some(storage),
        }
    }

    /// Load stored toggles. Returns how many groups were loaded.
    pub async fn load(&self) -> Result<usize, StorageError> {
        let Some(storage) = &self.storage else {
            return Ok(0);
        };
        let stored = storage.list_group_settings().await?;
        let mut enabled = self.enabled.write().await;
        for setting in &stored {
            enabled.insert(setting.group_id, setting.reminders_enabled);
        }
        Ok(stored.len())
    }

    /// Record a first reference to `group_id`, defaulting it to enabled.
    /// Returns the current state.
    pub async fn ensure(&self, group_id: GroupId) -> bool {
        *self.enabled.write().await.entry(group_id).or_insert(true)
    }

    pub async fn is_enabled(&self, group_id: GroupId) -> bool {
        self.enabled
            .read()
            .await
            .get(&group_id)
            .copied()
            .unwrap_or(true)
    }

    pub async fn set(&self, group_id: GroupId, enabled: bool) -> Result<(), StorageError> {
        if let Some(storage) = &self.storage {
            storage.set_group_enabled(group_id, enabled).await?;
        }
        self.enabled.write().await.insert(group_id, enabled);
        Ok(())
    }
}
