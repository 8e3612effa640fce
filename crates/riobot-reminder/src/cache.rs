//! In-memory reminder metadata, keyed by job id.

use std::collections::HashMap;

use riobot_types::Scope;
use tokio::sync::RwLock;

use crate::model::ReminderJob;

#[derive(Default)]
pub struct JobCache {
    jobs: RwLock<HashMap<String, ReminderJob>>,
}

impl JobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job. Returns the previous entry.
    pub async fn insert(&self, job: ReminderJob) -> Option<ReminderJob> {
        self.jobs.write().await.insert(job.id.clone(), job)
    }

    pub async fn get(&self, id: &str) -> Option<ReminderJob> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<ReminderJob> {
        self.jobs.write().await.remove(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    /// Jobs in `scope`, ordered by display time and then id.
    pub async fn list_scope(&self, scope: &Scope) -> Vec<ReminderJob> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<ReminderJob> =
            jobs.values().filter(|j| j.scope == *scope).cloned().collect();
        matching.sort_by(|a, b| {
            a.display_time
                .cmp(&b.display_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        matching
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Targets;
    use riobot_cron::DailyTrigger;

    fn job(id: &str, scope: Scope, hour: u32, minute: u32) -> ReminderJob {
        let trigger = DailyTrigger::new(hour, minute).unwrap();
        ReminderJob {
            id: id.into(),
            scope,
            trigger,
            targets: Targets::None,
            content: "内容".into(),
            creator: 1,
            display_time: trigger.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_scope_filters_and_orders() {
        let cache = JobCache::new();
        cache.insert(job("b", Scope::group(1), 9, 0)).await;
        cache.insert(job("a", Scope::group(1), 9, 0)).await;
        cache.insert(job("c", Scope::group(1), 7, 30)).await;
        cache.insert(job("d", Scope::group(2), 6, 0)).await;
        cache.insert(job("e", Scope::private(1), 6, 0)).await;

        let ids: Vec<String> = cache
            .list_scope(&Scope::group(1))
            .await
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(cache.list_scope(&Scope::private(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let cache = JobCache::new();
        assert!(cache.insert(job("a", Scope::group(1), 9, 0)).await.is_none());
        assert!(cache.insert(job("a", Scope::group(1), 10, 0)).await.is_some());
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("a").await.unwrap().display_time, "10:00");

        assert!(cache.remove("a").await.is_some());
        assert!(!cache.contains("a").await);
        assert!(cache.is_empty().await);
    }
}
