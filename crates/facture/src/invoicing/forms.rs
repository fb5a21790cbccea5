//! Create requests accepted from the presentation layer.
//!
//! Every request is trimmed with `normalized()` before `validate()` so that
//! whitespace-only values fail the same `length(min = 1)` check as empty ones.

use std::borrow::Cow;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::domain::CompanyId;

const MAX_FRACTION_DIGITS: u32 = 2;
const MAX_WHOLE_DIGITS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewCompany {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub nif: String,
    #[serde(default)]
    pub vat_subject: bool,
    #[validate(length(min = 1))]
    pub address: String,
}

impl NewCompany {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            nif: self.nif.trim().to_string(),
            vat_subject: self.vat_subject,
            address: self.address.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewEbmsConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

impl NewEbmsConfig {
    pub fn normalized(self) -> Self {
        Self {
            base_url: self.base_url.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password,
        }
    }
}

/// Externally issued bearer token. `None` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EbmsTokenUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub token: Option<String>,
}

impl EbmsTokenUpdate {
    pub fn normalized(self) -> Self {
        Self {
            token: self
                .token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewInvoice {
    #[validate(length(min = 1, max = 50))]
    pub number: String,
    pub company: CompanyId,
    #[validate(custom(function = "validate_total_amount"))]
    pub total_amount: Decimal,
}

impl NewInvoice {
    pub fn normalized(self) -> Self {
        Self {
            number: self.number.trim().to_string(),
            company: self.company,
            total_amount: self.total_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewStockMovement {
    #[validate(length(min = 1, max = 100))]
    pub product_name: String,
    pub quantity: i64,
    #[validate(length(min = 1, max = 50))]
    pub movement_type: String,
}

impl NewStockMovement {
    pub fn normalized(self) -> Self {
        Self {
            product_name: self.product_name.trim().to_string(),
            quantity: self.quantity,
            movement_type: self.movement_type.trim().to_string(),
        }
    }
}

/// Amounts are stored with two fractional digits and at most ten digits overall.
/// The written scale counts, so `150.000` is rejected like `150.005`.
fn validate_total_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.scale() > MAX_FRACTION_DIGITS {
        return Err(ValidationError::new("max_decimal_places").with_message(Cow::Owned(
            format!("ensure that there are no more than {MAX_FRACTION_DIGITS} decimal places"),
        )));
    }

    let whole_limit = Decimal::from(10_i64.pow(MAX_WHOLE_DIGITS));
    if amount.trunc().abs() >= whole_limit {
        return Err(ValidationError::new("max_whole_digits").with_message(Cow::Owned(
            format!(
                "ensure that there are no more than {MAX_WHOLE_DIGITS} digits before the decimal point"
            ),
        )));
    }

    Ok(())
}

/// Flattens validator output into `field -> messages` for API responses.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
