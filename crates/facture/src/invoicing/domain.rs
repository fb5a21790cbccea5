use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Store-assigned surrogate key for companies.
    CompanyId
);
record_id!(
    /// Store-assigned surrogate key for invoices.
    InvoiceId
);
record_id!(EbmsConfigId);
record_id!(StockMovementId);

/// Invoiced party. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub nif: String,
    pub vat_subject: bool,
    pub address: String,
}

/// Connection settings for the EBMS endpoint.
///
/// The password is kept in plaintext because the EBMS account is provisioned
/// that way; it is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EbmsConfig {
    pub id: EbmsConfigId,
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub token: Option<String>,
}

impl fmt::Debug for EbmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EbmsConfig")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reference to a stored document, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(pub String);

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an invoice. The transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Draft,
    Confirmed,
}

impl InvoiceState {
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceState::Draft => "Draft",
            InvoiceState::Confirmed => "Confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub date: DateTime<Utc>,
    pub company_id: CompanyId,
    pub total_amount: Decimal,
    pub confirmed: bool,
    pub pdf_file: Option<DocumentRef>,
    pub ebms_response: Option<String>,
}

impl Invoice {
    pub fn state(&self) -> InvoiceState {
        if self.confirmed {
            InvoiceState::Confirmed
        } else {
            InvoiceState::Draft
        }
    }

    /// Total with exactly two fractional digits, as sent to EBMS and printed.
    pub fn amount_display(&self) -> String {
        let mut amount = self.total_amount;
        amount.rescale(2);
        amount.to_string()
    }

    /// File name handed to document storage for this invoice's PDF. The id
    /// keeps names distinct when storage folds two numbers onto one spelling.
    pub fn document_name(&self) -> String {
        format!("invoice_{}_{}.pdf", self.id, self.number)
    }
}

/// Invoice fields fixed at creation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub number: String,
    pub date: DateTime<Utc>,
    pub company_id: CompanyId,
    pub total_amount: Decimal,
}

/// Invoice joined with its owning company for detail reads.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub state: InvoiceState,
    pub company: Company,
}

impl InvoiceDetail {
    pub fn new(invoice: Invoice, company: Company) -> Self {
        Self {
            state: invoice.state(),
            invoice,
            company,
        }
    }
}

/// Inventory line attached to an invoice. Positive quantities add stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub invoice_id: InvoiceId,
    pub product_name: String,
    pub quantity: i64,
    pub movement_type: String,
}
