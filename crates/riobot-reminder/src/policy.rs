//! Who may manage reminders.
//!
//! Superusers may do anything. Group admins and owners may toggle the
//! feature and remove any reminder in their group. Anyone may remove a
//! reminder they created.

use std::collections::HashSet;

use riobot_types::{Scope, Sender, UserId};

#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    superusers: HashSet<UserId>,
}

impl PermissionPolicy {
    pub fn new(superusers: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            superusers: superusers.into_iter().collect(),
        }
    }

    pub fn is_superuser(&self, user_id: UserId) -> bool {
        self.superusers.contains(&user_id)
    }

    pub fn can_manage_group(&self, sender: &Sender) -> bool {
        sender.is_group_admin() || self.is_superuser(sender.user_id)
    }

    pub fn can_remove(&self, scope: &Scope, sender: &Sender, creator: UserId) -> bool {
        sender.user_id == creator
            || self.is_superuser(sender.user_id)
            || (scope.is_group() && sender.is_group_admin())
    }
}
