use super::domain::{
    Company, CompanyId, EbmsConfig, Invoice, InvoiceDraft, InvoiceId, StockMovement,
};
use super::forms::{NewCompany, NewEbmsConfig, NewStockMovement};

/// Storage abstraction for companies. Deleting a company removes its invoices.
pub trait CompanyRepository: Send + Sync {
    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError>;
    fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn list_companies(&self) -> Result<Vec<Company>, RepositoryError>;
    fn delete_company(&self, id: CompanyId) -> Result<(), RepositoryError>;
}

/// Storage abstraction for invoices.
///
/// `insert_invoice` enforces the unique invoice number. Each `update_invoice`
/// call is an independent write; callers get no multi-write transaction.
pub trait InvoiceRepository: Send + Sync {
    fn insert_invoice(&self, draft: InvoiceDraft) -> Result<Invoice, RepositoryError>;
    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    fn update_invoice(&self, invoice: &Invoice) -> Result<(), RepositoryError>;
    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError>;
    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError>;
}

pub trait EbmsConfigRepository: Send + Sync {
    fn insert_config(&self, config: NewEbmsConfig) -> Result<EbmsConfig, RepositoryError>;
    /// The record with the lowest id, if any.
    fn first_config(&self) -> Result<Option<EbmsConfig>, RepositoryError>;
    fn update_config(&self, config: &EbmsConfig) -> Result<(), RepositoryError>;
}

pub trait StockMovementRepository: Send + Sync {
    fn insert_movement(
        &self,
        invoice_id: InvoiceId,
        movement: NewStockMovement,
    ) -> Result<StockMovement, RepositoryError>;
    fn movements_for(&self, invoice_id: InvoiceId) -> Result<Vec<StockMovement>, RepositoryError>;
}

/// Everything the invoicing service needs from a single backing store.
pub trait InvoiceStore:
    CompanyRepository + InvoiceRepository + EbmsConfigRepository + StockMovementRepository
{
}

impl<T> InvoiceStore for T where
    T: CompanyRepository + InvoiceRepository + EbmsConfigRepository + StockMovementRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
