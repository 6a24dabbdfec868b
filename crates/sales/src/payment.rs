use serde::{Deserialize, Serialize};

use shopkeep_core::{Money, ValueObject};

/// Declared payment method. Only cash carries an amount; nothing is reconciled
/// against a payment processor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash { paid_amount: Money },
    Pix,
    CreditCard,
    DebitCard,
    BankTransfer,
}

impl ValueObject for PaymentMethod {}

impl PaymentMethod {
    pub fn cash(paid_amount: Money) -> Self {
        Self::Cash { paid_amount }
    }

    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash { .. })
    }

    pub fn paid_amount(&self) -> Option<Money> {
        match self {
            PaymentMethod::Cash { paid_amount } => Some(*paid_amount),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash { .. } => "cash",
            PaymentMethod::Pix => "pix",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}
