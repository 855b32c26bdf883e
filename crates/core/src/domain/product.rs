use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete choice offered to the agent: what the button says and the value that is
/// recorded when it is picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: &'static str,
    pub value: &'static str,
}

impl ChoiceOption {
    const fn same(value: &'static str) -> Self {
        Self { label: value, value }
    }

    const fn labelled(label: &'static str, value: &'static str) -> Self {
        Self { label, value }
    }
}

const USD_COVERAGE: &[ChoiceOption] = &[
    ChoiceOption::same("$250,000"),
    ChoiceOption::same("$500,000"),
    ChoiceOption::same("$1,000,000"),
];
const SGD_COVERAGE: &[ChoiceOption] = &[
    ChoiceOption::same("$250,000 SGD"),
    ChoiceOption::same("$500,000 SGD"),
    ChoiceOption::same("$1,000,000 SGD"),
];
const SAVINGS_PREMIUM: &[ChoiceOption] = &[
    ChoiceOption::same("$5,000/year"),
    ChoiceOption::same("$10,000/year"),
    ChoiceOption::same("$20,000/year"),
];
const SINGLE_IDR_PREMIUM: &[ChoiceOption] = &[
    ChoiceOption::same("IDR 50 juta"),
    ChoiceOption::same("IDR 100 juta"),
    ChoiceOption::same("IDR 200 juta"),
];
const SINGLE_USD_PREMIUM: &[ChoiceOption] = &[
    ChoiceOption::same("$25,000"),
    ChoiceOption::same("$50,000"),
    ChoiceOption::same("$100,000"),
];

const TERM_LIFE_TERMS: &[ChoiceOption] = &[
    ChoiceOption::same("10 years"),
    ChoiceOption::same("20 years"),
    ChoiceOption::same("30 years"),
    ChoiceOption::same("Till 85"),
    ChoiceOption::labelled("Till 88 (FWD only)", "Till 88"),
];
const IUL_TERMS: &[ChoiceOption] = &[
    ChoiceOption::same("1 year"),
    ChoiceOption::same("5 years"),
    ChoiceOption::same("10 years"),
];
const SAVINGS_TERMS: &[ChoiceOption] =
    &[ChoiceOption::same("2 years"), ChoiceOption::same("5 years")];

/// Term recorded for every single-premium product.
pub const SINGLE_PREMIUM_TERM: &str = "1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Sgd,
    Idr,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Sgd => "SGD",
            Self::Idr => "IDR",
        }
    }
}

/// Decided once per catalog entry; drives whether the amount is asked as a coverage
/// or as a premium.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Protection,
    SavingsOrSinglePremium,
}

impl ProductCategory {
    pub fn amount_label(self) -> &'static str {
        match self {
            Self::Protection => "Coverage",
            Self::SavingsOrSinglePremium => "Premium",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductFamily {
    TermLife,
    Iul,
    Savings,
    SinglePremium,
}

/// Concrete catalog variant recorded on a request row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    TermLifeUsd,
    TermLifeSgd,
    IulUsd,
    SavingsUsd,
    SinglePremiumIdr,
    SinglePremiumUsd,
}

impl Product {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::TermLifeUsd => "Term Life (USD)",
            Self::TermLifeSgd => "Term Life (SGD)",
            Self::IulUsd => "IUL (USD)",
            Self::SavingsUsd => "Savings Plan (USD)",
            Self::SinglePremiumIdr => "Single Premi Wholelife (IDR)",
            Self::SinglePremiumUsd => "Single Premi USD",
        }
    }

    pub fn family(self) -> ProductFamily {
        match self {
            Self::TermLifeUsd | Self::TermLifeSgd => ProductFamily::TermLife,
            Self::IulUsd => ProductFamily::Iul,
            Self::SavingsUsd => ProductFamily::Savings,
            Self::SinglePremiumIdr | Self::SinglePremiumUsd => ProductFamily::SinglePremium,
        }
    }

    pub fn category(self) -> ProductCategory {
        match self {
            Self::TermLifeUsd | Self::TermLifeSgd | Self::IulUsd => ProductCategory::Protection,
            Self::SavingsUsd | Self::SinglePremiumIdr | Self::SinglePremiumUsd => {
                ProductCategory::SavingsOrSinglePremium
            }
        }
    }

    pub fn currency(self) -> Currency {
        match self {
            Self::TermLifeSgd => Currency::Sgd,
            Self::SinglePremiumIdr => Currency::Idr,
            Self::TermLifeUsd | Self::IulUsd | Self::SavingsUsd | Self::SinglePremiumUsd => {
                Currency::Usd
            }
        }
    }

    /// Preset coverage (protection) or premium (savings) amounts.
    pub fn amount_options(self) -> &'static [ChoiceOption] {
        match self {
            Self::TermLifeUsd | Self::IulUsd => USD_COVERAGE,
            Self::TermLifeSgd => SGD_COVERAGE,
            Self::SavingsUsd => SAVINGS_PREMIUM,
            Self::SinglePremiumIdr => SINGLE_IDR_PREMIUM,
            Self::SinglePremiumUsd => SINGLE_USD_PREMIUM,
        }
    }

    /// Preset terms of payment; empty for products whose term is fixed.
    pub fn term_options(self) -> &'static [ChoiceOption] {
        match self.family() {
            ProductFamily::TermLife => TERM_LIFE_TERMS,
            ProductFamily::Iul => IUL_TERMS,
            ProductFamily::Savings => SAVINGS_TERMS,
            ProductFamily::SinglePremium => &[],
        }
    }

    pub fn fixed_term(self) -> Option<&'static str> {
        match self.family() {
            ProductFamily::SinglePremium => Some(SINGLE_PREMIUM_TERM),
            _ => None,
        }
    }

    pub fn term_life(currency: Currency) -> Option<Self> {
        match currency {
            Currency::Usd => Some(Self::TermLifeUsd),
            Currency::Sgd => Some(Self::TermLifeSgd),
            Currency::Idr => None,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Entry on the product menu. Term Life is a menu entry that still needs a currency
/// before it resolves to a concrete [`Product`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductChoice {
    TermLife,
    Iul,
    Savings,
    SinglePremiumIdr,
    SinglePremiumUsd,
}

impl ProductChoice {
    pub const MENU: [ProductChoice; 5] =
        [Self::TermLife, Self::Iul, Self::Savings, Self::SinglePremiumIdr, Self::SinglePremiumUsd];

    pub fn key(self) -> &'static str {
        match self {
            Self::TermLife => "TERM",
            Self::Iul => "IUL",
            Self::Savings => "SAVINGS",
            Self::SinglePremiumIdr => "SINGLE_IDR",
            Self::SinglePremiumUsd => "SINGLE_USD",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::MENU.into_iter().find(|choice| choice.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TermLife => "Term Life",
            Self::Iul => Product::IulUsd.display_name(),
            Self::Savings => Product::SavingsUsd.display_name(),
            Self::SinglePremiumIdr => Product::SinglePremiumIdr.display_name(),
            Self::SinglePremiumUsd => Product::SinglePremiumUsd.display_name(),
        }
    }

    /// `None` when the choice needs a currency first.
    pub fn resolve(self) -> Option<Product> {
        match self {
            Self::TermLife => None,
            Self::Iul => Some(Product::IulUsd),
            Self::Savings => Some(Product::SavingsUsd),
            Self::SinglePremiumIdr => Some(Product::SinglePremiumIdr),
            Self::SinglePremiumUsd => Some(Product::SinglePremiumUsd),
        }
    }
}
