//! Logical JSON backups of accounts and their per-user rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::entity::{subscriptions, user_notification_settings, user_settings, users};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBackup {
    pub created_at: DateTime<Utc>,
    pub users: Vec<users::Model>,
    #[serde(default)]
    pub user_settings: Vec<user_settings::Model>,
    #[serde(default)]
    pub user_notification_settings: Vec<user_notification_settings::Model>,
    #[serde(default)]
    pub subscriptions: Vec<subscriptions::Model>,
}

impl JsonBackup {
    /// The subset of this backup whose users are absent from the database,
    /// matched by id or username.
    pub fn missing_from(&self, existing: &[users::Model]) -> JsonBackup {
        let ids: HashSet<i32> = existing.iter().map(|u| u.id).collect();
        let names: HashSet<&str> = existing.iter().map(|u| u.username.as_str()).collect();

        let users: Vec<users::Model> = self
            .users
            .iter()
            .filter(|u| !ids.contains(&u.id) && !names.contains(u.username.as_str()))
            .cloned()
            .collect();
        let restored: HashSet<i32> = users.iter().map(|u| u.id).collect();

        JsonBackup {
            created_at: self.created_at,
            user_settings: self
                .user_settings
                .iter()
                .filter(|s| restored.contains(&s.user_id))
                .cloned()
                .collect(),
            user_notification_settings: self
                .user_notification_settings
                .iter()
                .filter(|s| restored.contains(&s.user_id))
                .cloned()
                .collect(),
            subscriptions: self
                .subscriptions
                .iter()
                .filter(|s| restored.contains(&s.user_id))
                .cloned()
                .collect(),
            users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::sea_orm_active_enums::{Language, SubscriptionTier};

    fn user(id: i32, name: &str) -> users::Model {
        users::Model {
            id,
            username: name.to_string(),
            password: "hash".to_string(),
            email: None,
            full_name: None,
            subscription_level: SubscriptionTier::Free,
            subscription_expiry: None,
            language: Language::Ar,
            telegram_id: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn subscription(user_id: i32) -> subscriptions::Model {
        let now = Utc::now();
        subscriptions::Model {
            id: user_id * 10,
            user_id,
            subscription_type: SubscriptionTier::Free,
            start_date: now,
            end_date: None,
            is_active: true,
            daily_signal_limit: 5,
            payment_method: None,
            transaction_id: None,
            amount: None,
            currency: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missing_from_skips_known_ids_and_usernames() {
        let backup = JsonBackup {
            created_at: Utc::now(),
            users: vec![user(1, "a"), user(2, "b"), user(3, "c")],
            user_settings: vec![],
            user_notification_settings: vec![],
            subscriptions: vec![subscription(1), subscription(2), subscription(3)],
        };
        let existing = vec![user(1, "a"), user(9, "c")];

        let missing = backup.missing_from(&existing);
        assert_eq!(missing.users.len(), 1);
        assert_eq!(missing.users[0].username, "b");
        assert_eq!(missing.subscriptions.len(), 1);
        assert_eq!(missing.subscriptions[0].user_id, 2);
    }

    #[test]
    fn test_older_backups_without_child_tables_still_parse() {
        let json = serde_json::json!({
            "created_at": "2024-01-01T00:00:00Z",
            "users": []
        });
        let backup: JsonBackup = serde_json::from_value(json).unwrap();
        assert!(backup.subscriptions.is_empty());
    }
}
