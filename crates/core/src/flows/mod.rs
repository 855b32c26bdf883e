pub mod engine;
pub mod states;
pub mod validation;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, IntakeFlow};
pub use states::{
    Choice, FlowAction, Gender, InputKind, IntakeData, ProductDraft, ProductSelection, Session,
    SessionInput, SessionState, Smoking, TransitionOutcome,
};
pub use validation::{normalize_notes, validate_date_of_birth, ValidationFailure};
