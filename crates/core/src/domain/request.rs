use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::user::UserId;

/// 1-based position of a row in append order. Assigned once and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u32);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<u32>().map(Self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Pending,
    Processing,
    Completed,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown request status `{0}` (expected pending|processing|completed)")]
pub struct UnknownStatus(pub String);

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [Self::Pending, Self::Processing, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
        }
    }

    /// The only transition that tells the submitting agent their request was picked up.
    pub fn notifies_agent(from: RequestStatus, to: RequestStatus) -> bool {
        matches!((from, to), (Self::Pending, Self::Processing))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownStatus(value.trim().to_owned())),
        }
    }
}

/// One persisted row: a single product of a submitted request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRow {
    pub submitted_at: DateTime<Utc>,
    pub agent_id: UserId,
    pub agent_name: String,
    pub client_name: String,
    pub client_dob: String,
    pub client_gender: String,
    pub smoking: String,
    pub product: String,
    pub amount: String,
    pub term_payment: String,
    pub notes: String,
    #[serde(default)]
    pub status: RequestStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub id: RequestId,
    pub row: RequestRow,
}
