use thiserror::Error;

use crate::access::LedgerError;
use crate::intake::{DispatchError, IntakeError};
use crate::{flows::FlowTransitionError, ports::NotifyError, ports::SheetError, ports::StoreError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<SheetError> for ApplicationError {
    fn from(value: SheetError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<NotifyError> for ApplicationError {
    fn from(value: NotifyError) -> Self {
        Self::Integration(value.to_string())
    }
}

impl From<LedgerError> for ApplicationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Store(error) => error.into(),
        }
    }
}

impl From<DispatchError> for ApplicationError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(error) => error.into(),
            DispatchError::Persistence(error) => error.into(),
            DispatchError::Notification { source, .. } => source.into(),
        }
    }
}

impl From<IntakeError> for ApplicationError {
    fn from(value: IntakeError) -> Self {
        match value {
            IntakeError::Flow(error) => DomainError::from(error).into(),
            IntakeError::Dispatch(error) => error.into(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "Permintaan tidak dapat diproses. Periksa data dan coba lagi.",
            Self::ServiceUnavailable { .. } => {
                "Layanan sedang tidak tersedia. Silakan coba lagi atau hubungi admin."
            }
            Self::Internal { .. } => "Terjadi kesalahan internal. Silakan hubungi admin.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
