use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Currency, Product, ProductChoice};
use crate::domain::request::RequestId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AwaitingName,
    AwaitingDob,
    AwaitingGender,
    AwaitingSmoking,
    AwaitingProduct,
    AwaitingTermCurrency,
    AwaitingCoverage,
    AwaitingCoverageCustom,
    AwaitingTermPayment,
    AwaitingTermPaymentCustom,
    AwaitingProductDecision,
    AwaitingNotes,
    Confirming,
    Submitted,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Smoking {
    Yes,
    No,
}

impl Smoking {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

/// A fully specified product entry. Only these are ever appended to a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSelection {
    pub product: Product,
    pub amount: String,
    pub term_payment: String,
}

/// The product currently being configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub product: Option<Product>,
    pub amount: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeData {
    pub agent_id: UserId,
    pub agent_name: String,
    pub client_name: String,
    pub client_dob: String,
    pub client_gender: Option<Gender>,
    pub smoking: Option<Smoking>,
    pub selected_products: Vec<ProductSelection>,
    pub current_product: ProductDraft,
    pub notes: String,
    pub started_at: DateTime<Utc>,
    /// Rows already appended by a confirm whose operations alert failed.
    #[serde(default)]
    pub persisted: Option<Vec<RequestId>>,
}

impl IntakeData {
    pub fn new(agent_id: UserId, agent_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            agent_name: agent_name.into(),
            client_name: String::new(),
            client_dob: String::new(),
            client_gender: None,
            smoking: None,
            selected_products: Vec::new(),
            current_product: ProductDraft::default(),
            notes: String::new(),
            started_at,
            persisted: None,
        }
    }

    pub fn last_selection(&self) -> Option<&ProductSelection> {
        self.selected_products.last()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: SessionState,
    pub data: IntakeData,
}

impl Session {
    pub fn new(agent_id: UserId, agent_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { state: SessionState::Idle, data: IntakeData::new(agent_id, agent_name, now) }
    }
}

/// Normalized button payload understood by the intake flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Gender(Gender),
    Smoking(Smoking),
    Product(ProductChoice),
    TermCurrency(Currency),
    Amount(String),
    CustomAmount,
    TermPayment(String),
    CustomTerm,
    AddAnotherProduct,
    ProceedToNotes,
    Confirm,
    Reject,
}

impl Choice {
    /// Parses a button token. Returns `None` for anything the intake flow does not own,
    /// including admin tokens.
    pub fn parse(token: &str) -> Option<Self> {
        let fixed = match token {
            "gender_male" => Some(Self::Gender(Gender::Male)),
            "gender_female" => Some(Self::Gender(Gender::Female)),
            "smoking_yes" => Some(Self::Smoking(Smoking::Yes)),
            "smoking_no" => Some(Self::Smoking(Smoking::No)),
            "coverage_custom" => Some(Self::CustomAmount),
            "term_custom" => Some(Self::CustomTerm),
            "add_more_product" => Some(Self::AddAnotherProduct),
            "proceed_notes" => Some(Self::ProceedToNotes),
            "confirm_yes" => Some(Self::Confirm),
            "confirm_no" => Some(Self::Reject),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        if let Some(key) = token.strip_prefix("product_") {
            return ProductChoice::from_key(key).map(Self::Product);
        }
        // `term_ccy_` shares the `term_` prefix and must be checked first.
        if let Some(code) = token.strip_prefix("term_ccy_") {
            return match code {
                "USD" => Some(Self::TermCurrency(Currency::Usd)),
                "SGD" => Some(Self::TermCurrency(Currency::Sgd)),
                _ => None,
            };
        }
        if let Some(amount) = token.strip_prefix("coverage_") {
            return (!amount.is_empty()).then(|| Self::Amount(amount.to_owned()));
        }
        if let Some(term) = token.strip_prefix("term_") {
            return (!term.is_empty()).then(|| Self::TermPayment(term.to_owned()));
        }
        None
    }

    pub fn token(&self) -> String {
        match self {
            Self::Gender(Gender::Male) => "gender_male".to_owned(),
            Self::Gender(Gender::Female) => "gender_female".to_owned(),
            Self::Smoking(Smoking::Yes) => "smoking_yes".to_owned(),
            Self::Smoking(Smoking::No) => "smoking_no".to_owned(),
            Self::Product(choice) => format!("product_{}", choice.key()),
            Self::TermCurrency(currency) => format!("term_ccy_{}", currency.code()),
            Self::Amount(amount) => format!("coverage_{amount}"),
            Self::CustomAmount => "coverage_custom".to_owned(),
            Self::TermPayment(term) => format!("term_{term}"),
            Self::CustomTerm => "term_custom".to_owned(),
            Self::AddAnotherProduct => "add_more_product".to_owned(),
            Self::ProceedToNotes => "proceed_notes".to_owned(),
            Self::Confirm => "confirm_yes".to_owned(),
            Self::Reject => "confirm_no".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionInput {
    Text(String),
    Choice(Choice),
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Text,
    Choice,
    Cancel,
}

impl SessionInput {
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Text(_) => InputKind::Text,
            Self::Choice(_) => InputKind::Choice,
            Self::Cancel => InputKind::Cancel,
        }
    }
}

/// What the conversation layer should render after a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptClientName,
    PromptDateOfBirth,
    PromptGender,
    PromptSmoking,
    PromptProduct,
    PromptTermCurrency,
    PromptAmount,
    PromptCustomAmount,
    PromptTermPayment,
    PromptCustomTerm,
    OfferAnotherProduct,
    PromptNotes,
    PresentConfirmation,
    SubmitRequest,
    DiscardSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SessionState,
    pub to: SessionState,
    pub input: InputKind,
    pub actions: Vec<FlowAction>,
}

#[cfg(test)]
mod tests {
    use super::{Choice, Gender, Smoking};
    use crate::domain::product::{Currency, ProductChoice};

    #[test]
    fn choice_tokens_parse_into_typed_choices() {
        assert_eq!(Choice::parse("gender_female"), Some(Choice::Gender(Gender::Female)));
        assert_eq!(Choice::parse("smoking_no"), Some(Choice::Smoking(Smoking::No)));
        assert_eq!(Choice::parse("product_SINGLE_IDR"), Some(Choice::Product(ProductChoice::SinglePremiumIdr)));
        assert_eq!(Choice::parse("term_ccy_SGD"), Some(Choice::TermCurrency(Currency::Sgd)));
        assert_eq!(Choice::parse("coverage_$500,000"), Some(Choice::Amount("$500,000".to_owned())));
        assert_eq!(Choice::parse("term_Till 88"), Some(Choice::TermPayment("Till 88".to_owned())));
        assert_eq!(Choice::parse("term_custom"), Some(Choice::CustomTerm));
        assert_eq!(Choice::parse("confirm_no"), Some(Choice::Reject));
    }

    #[test]
    fn unknown_and_admin_tokens_are_not_intake_choices() {
        assert_eq!(Choice::parse("approve_42"), None);
        assert_eq!(Choice::parse("status_3_Processing"), None);
        assert_eq!(Choice::parse("product_CAR"), None);
        assert_eq!(Choice::parse("term_ccy_IDR"), None);
        assert_eq!(Choice::parse("coverage_"), None);
        assert_eq!(Choice::parse("garbage"), None);
    }

    #[test]
    fn tokens_are_stable_for_rendered_buttons() {
        let choice = Choice::TermPayment("20 years".to_owned());
        assert_eq!(Choice::parse(&choice.token()), Some(choice));
        assert_eq!(Choice::Product(ProductChoice::TermLife).token(), "product_TERM");
    }
}
