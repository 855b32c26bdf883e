pub mod access;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod intake;
pub mod ports;

pub use access::{AccessLedger, InMemoryLedgerStore, LedgerError};
pub use domain::access::{AuthorizationRecord, PendingAccessRequest};
pub use domain::product::{ChoiceOption, Currency, Product, ProductCategory, ProductChoice};
pub use domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
pub use domain::user::{ChatId, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{Choice, FlowEngine, IntakeData, IntakeFlow, Session, SessionInput, SessionState};
pub use intake::{
    IntakeError, IntakeService, IntakeStep, StatusBridge, StatusChange, SubmissionDispatcher,
    SubmissionReceipt,
};
pub use ports::{
    IntakeNotifier, LedgerStore, NotifyError, RequestSheet, SheetError, StoreError,
    DEFAULT_LIST_LIMIT,
};
