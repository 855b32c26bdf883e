//! Button tokens. Intake choices are owned by the flow; the admin tokens below are routed
//! to the access ledger and the status bridge.

use illustra_core::domain::request::{RequestId, RequestStatus};
use illustra_core::domain::user::UserId;
use illustra_core::flows::Choice;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionToken {
    Approve(UserId),
    Reject(UserId),
    SetStatus { id: RequestId, status: RequestStatus },
    Intake(Choice),
    Unknown(String),
}

impl ActionToken {
    pub fn parse(token: &str) -> Self {
        if let Some(user) = token.strip_prefix("approve_").and_then(|id| id.parse().ok()) {
            return Self::Approve(user);
        }
        if let Some(user) = token.strip_prefix("reject_").and_then(|id| id.parse().ok()) {
            return Self::Reject(user);
        }
        if let Some(rest) = token.strip_prefix("status_") {
            // `status_<row>_<Status>`
            if let Some((id, status)) = rest.split_once('_') {
                if let (Ok(id), Ok(status)) = (id.parse::<RequestId>(), status.parse()) {
                    return Self::SetStatus { id, status };
                }
            }
            return Self::Unknown(token.to_owned());
        }
        match Choice::parse(token) {
            Some(choice) => Self::Intake(choice),
            None => Self::Unknown(token.to_owned()),
        }
    }

    pub fn token(&self) -> String {
        match self {
            Self::Approve(user) => format!("approve_{user}"),
            Self::Reject(user) => format!("reject_{user}"),
            Self::SetStatus { id, status } => format!("status_{id}_{status}"),
            Self::Intake(choice) => choice.token(),
            Self::Unknown(token) => token.clone(),
        }
    }

    pub fn is_admin_action(&self) -> bool {
        matches!(self, Self::Approve(_) | Self::Reject(_) | Self::SetStatus { .. })
    }
}
