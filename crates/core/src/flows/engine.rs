use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use crate::domain::product::Product;
use crate::domain::user::UserId;
use crate::flows::states::{
    Choice, FlowAction, InputKind, IntakeData, ProductSelection, Session, SessionInput,
    SessionState, TransitionOutcome,
};
use crate::flows::validation::{normalize_notes, validate_date_of_birth, ValidationFailure};

pub trait FlowDefinition {
    fn initial_state(&self) -> SessionState;
    fn transition(
        &self,
        current: SessionState,
        input: &SessionInput,
        data: &mut IntakeData,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using {input:?} input")]
    InvalidTransition { state: SessionState, input: InputKind },
    #[error("input rejected in {state:?}: {failure}")]
    Validation { state: SessionState, failure: ValidationFailure },
}

/// The illustration-request wizard.
#[derive(Clone, Debug, Default)]
pub struct IntakeFlow {
    current_year: Option<i32>,
}

impl IntakeFlow {
    /// Pins the upper bound used for date-of-birth years.
    pub fn with_current_year(year: i32) -> Self {
        Self { current_year: Some(year) }
    }

    fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }
}

impl FlowDefinition for IntakeFlow {
    fn initial_state(&self) -> SessionState {
        SessionState::AwaitingName
    }

    fn transition(
        &self,
        current: SessionState,
        input: &SessionInput,
        data: &mut IntakeData,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, input, data, self.current_year())
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    /// Opens a fresh session already waiting for the client name.
    pub fn start(
        &self,
        agent_id: UserId,
        agent_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> (Session, TransitionOutcome) {
        let mut session = Session::new(agent_id, agent_name, now);
        let to = self.flow.initial_state();
        let outcome = TransitionOutcome {
            from: session.state,
            to,
            input: InputKind::Text,
            actions: vec![FlowAction::PromptClientName],
        };
        session.state = to;
        (session, outcome)
    }

    /// Applies one input. On error the session is left untouched. Terminal targets are
    /// reported but not written back; the owner of the session decides when it ends.
    pub fn apply(
        &self,
        session: &mut Session,
        input: &SessionInput,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let outcome = self.flow.transition(session.state, input, &mut session.data)?;
        if !outcome.to.is_terminal() {
            session.state = outcome.to;
        }
        Ok(outcome)
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow::default())
    }
}

fn transition_intake(
    current: SessionState,
    input: &SessionInput,
    data: &mut IntakeData,
    current_year: i32,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        DiscardSession, OfferAnotherProduct, PresentConfirmation, PromptAmount,
        PromptCustomAmount, PromptCustomTerm, PromptDateOfBirth, PromptGender, PromptNotes,
        PromptProduct, PromptSmoking, PromptTermCurrency, PromptTermPayment, SubmitRequest,
    };
    use SessionState::{
        AwaitingCoverage, AwaitingCoverageCustom, AwaitingDob, AwaitingGender, AwaitingName,
        AwaitingNotes, AwaitingProduct, AwaitingProductDecision, AwaitingSmoking,
        AwaitingTermCurrency, AwaitingTermPayment, AwaitingTermPaymentCustom, Cancelled,
        Confirming, Idle, Submitted,
    };

    let invalid = || FlowTransitionError::InvalidTransition { state: current, input: input.kind() };
    let rejected = |failure| FlowTransitionError::Validation { state: current, failure };

    let (to, actions) = match (current, input) {
        (Idle | Submitted | Cancelled, _) => return Err(invalid()),
        (_, SessionInput::Cancel) => (Cancelled, vec![DiscardSession]),

        (AwaitingName, SessionInput::Text(text)) => {
            let name = non_empty(text).ok_or_else(|| rejected(ValidationFailure::EmptyClientName))?;
            data.client_name = name;
            (AwaitingDob, vec![PromptDateOfBirth])
        }
        (AwaitingDob, SessionInput::Text(text)) => {
            let dob = text.trim();
            validate_date_of_birth(dob, current_year).map_err(rejected)?;
            data.client_dob = dob.to_owned();
            (AwaitingGender, vec![PromptGender])
        }
        (AwaitingGender, SessionInput::Choice(Choice::Gender(gender))) => {
            data.client_gender = Some(*gender);
            (AwaitingSmoking, vec![PromptSmoking])
        }
        (AwaitingSmoking, SessionInput::Choice(Choice::Smoking(smoking))) => {
            data.smoking = Some(*smoking);
            (AwaitingProduct, vec![PromptProduct])
        }
        (AwaitingProduct, SessionInput::Choice(Choice::Product(choice))) => match choice.resolve() {
            Some(product) => {
                begin_product(data, product);
                (AwaitingCoverage, vec![PromptAmount])
            }
            None => (AwaitingTermCurrency, vec![PromptTermCurrency]),
        },
        (AwaitingTermCurrency, SessionInput::Choice(Choice::TermCurrency(currency))) => {
            let product = Product::term_life(*currency).ok_or_else(invalid)?;
            begin_product(data, product);
            (AwaitingCoverage, vec![PromptAmount])
        }
        (AwaitingCoverage, SessionInput::Choice(Choice::Amount(amount))) => {
            let product = data.current_product.product.ok_or_else(invalid)?;
            if !product.amount_options().iter().any(|option| option.value == amount) {
                return Err(invalid());
            }
            fix_amount(data, product, amount.clone())
        }
        (AwaitingCoverage, SessionInput::Choice(Choice::CustomAmount)) => {
            (AwaitingCoverageCustom, vec![PromptCustomAmount])
        }
        (AwaitingCoverageCustom, SessionInput::Text(text)) => {
            let product = data.current_product.product.ok_or_else(invalid)?;
            let amount =
                non_empty(text).ok_or_else(|| rejected(ValidationFailure::EmptyCustomAmount))?;
            fix_amount(data, product, amount)
        }
        (AwaitingTermPayment, SessionInput::Choice(Choice::TermPayment(term))) => {
            let product = data.current_product.product.ok_or_else(invalid)?;
            if !product.term_options().iter().any(|option| option.value == term) {
                return Err(invalid());
            }
            complete_product(data, term.clone()).ok_or_else(invalid)?
        }
        (AwaitingTermPayment, SessionInput::Choice(Choice::CustomTerm)) => {
            (AwaitingTermPaymentCustom, vec![PromptCustomTerm])
        }
        (AwaitingTermPaymentCustom, SessionInput::Text(text)) => {
            let term = non_empty(text).ok_or_else(|| rejected(ValidationFailure::EmptyCustomTerm))?;
            complete_product(data, term).ok_or_else(invalid)?
        }
        (AwaitingProductDecision, SessionInput::Choice(Choice::AddAnotherProduct)) => {
            data.current_product = Default::default();
            (AwaitingProduct, vec![PromptProduct])
        }
        (AwaitingProductDecision, SessionInput::Choice(Choice::ProceedToNotes)) => {
            (AwaitingNotes, vec![PromptNotes])
        }
        (AwaitingNotes, SessionInput::Text(text)) => {
            data.notes = normalize_notes(text).map_err(rejected)?;
            (Confirming, vec![PresentConfirmation])
        }
        (Confirming, SessionInput::Choice(Choice::Confirm)) => {
            if data.selected_products.is_empty() {
                return Err(invalid());
            }
            (Submitted, vec![SubmitRequest])
        }
        (Confirming, SessionInput::Choice(Choice::Reject)) => (Cancelled, vec![DiscardSession]),
        _ => return Err(invalid()),
    };

    Ok(TransitionOutcome { from: current, to, input: input.kind(), actions })
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn begin_product(data: &mut IntakeData, product: Product) {
    data.current_product.product = Some(product);
    data.current_product.amount = None;
}

fn fix_amount(
    data: &mut IntakeData,
    product: Product,
    amount: String,
) -> (SessionState, Vec<FlowAction>) {
    data.current_product.amount = Some(amount);
    match product.fixed_term() {
        Some(term) => complete_product(data, term.to_owned()).unwrap_or_else(|| {
            (SessionState::AwaitingTermPayment, vec![FlowAction::PromptTermPayment])
        }),
        None => (SessionState::AwaitingTermPayment, vec![FlowAction::PromptTermPayment]),
    }
}

/// Appends the draft as a whole entry. `None` when the draft is incomplete.
fn complete_product(
    data: &mut IntakeData,
    term_payment: String,
) -> Option<(SessionState, Vec<FlowAction>)> {
    let product = data.current_product.product?;
    let amount = data.current_product.amount.clone()?;
    data.selected_products.push(ProductSelection { product, amount, term_payment });
    data.current_product = Default::default();
    Some((SessionState::AwaitingProductDecision, vec![FlowAction::OfferAnotherProduct]))
}
