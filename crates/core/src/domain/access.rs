use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// Durable membership record. `admins` and `users` hold unique ids; disjointness is
/// maintained by the ledger's insert rules rather than by removal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    #[serde(default)]
    pub admins: Vec<UserId>,
    #[serde(default)]
    pub users: Vec<UserId>,
}

impl AuthorizationRecord {
    pub fn seeded(initial_admins: &[UserId]) -> Self {
        let mut record = Self::default();
        for admin in initial_admins {
            if !record.admins.contains(admin) {
                record.admins.push(*admin);
            }
        }
        record
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub fn is_authorized(&self, user: UserId) -> bool {
        self.is_admin(user) || self.users.contains(&user)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAccessRequest {
    pub user_id: UserId,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_username: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PendingAccessRequest {
    /// Handle shown on admin cards, `N/A` when the requester has none.
    pub fn handle(&self) -> &str {
        self.user_username.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{AuthorizationRecord, PendingAccessRequest};
    use crate::domain::user::UserId;

    #[test]
    fn seeding_deduplicates_admins() {
        let record = AuthorizationRecord::seeded(&[UserId(1), UserId(2), UserId(1)]);
        assert_eq!(record.admins, vec![UserId(1), UserId(2)]);
        assert!(record.users.is_empty());
        assert!(record.is_authorized(UserId(2)));
        assert!(!record.is_authorized(UserId(3)));
    }

    #[test]
    fn pending_request_uses_camel_case_wire_names() {
        let request = PendingAccessRequest {
            user_id: UserId(99),
            user_name: "Sari Dewi".to_owned(),
            user_username: Some("sari".to_owned()),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).single().expect("timestamp"),
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["userId"], 99);
        assert_eq!(json["userName"], "Sari Dewi");
        assert_eq!(json["userUsername"], "sari");

        let parsed: PendingAccessRequest = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, request);
    }

    #[test]
    fn missing_handle_renders_placeholder() {
        let parsed: PendingAccessRequest = serde_json::from_str(
            r#"{"userId":5,"userName":"Andi","timestamp":"2024-01-02T03:04:05Z"}"#,
        )
        .expect("deserialize");
        assert_eq!(parsed.handle(), "N/A");
    }
}
