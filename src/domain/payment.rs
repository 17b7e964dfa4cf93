use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// The closed set of payment methods a tab can be settled with. The method
/// is only a recorded label; no gateway is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Pix,
    DebitCard,
    CreditCard,
    FoodVoucher,
    Transfer,
}

impl PaymentMethod {
    /// Every method, in the order the listing endpoint returns them.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::Pix,
        PaymentMethod::DebitCard,
        PaymentMethod::CreditCard,
        PaymentMethod::FoodVoucher,
        PaymentMethod::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::FoodVoucher => "FOOD_VOUCHER",
            PaymentMethod::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidPaymentMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_listed_name() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(
            " credit_card ".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::CreditCard
        );
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = "BITCOIN".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidPaymentMethod(m) if m == "BITCOIN"));
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::FoodVoucher).unwrap();
        assert_eq!(json, "\"FOOD_VOUCHER\"");
    }
}
