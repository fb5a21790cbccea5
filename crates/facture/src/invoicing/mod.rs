//! Companies, invoices and the confirmation workflow that reports invoices to
//! EBMS and files their PDF.

pub mod domain;
pub mod ebms;
pub mod forms;
pub mod memory;
mod pdf;
pub mod render;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    Company, CompanyId, DocumentRef, EbmsConfig, EbmsConfigId, Invoice, InvoiceDetail,
    InvoiceDraft, InvoiceId, InvoiceState, StockMovement, StockMovementId,
};
pub use ebms::{EbmsError, EbmsGateway, EbmsInvoicePayload, HttpEbmsClient};
pub use forms::{EbmsTokenUpdate, NewCompany, NewEbmsConfig, NewInvoice, NewStockMovement};
pub use memory::InMemoryStore;
pub use render::{
    DocumentRenderer, InvoiceDocumentContext, RenderError, RenderedDocument, TemplateRenderer,
    INVOICE_TEMPLATE,
};
pub use repository::{
    CompanyRepository, EbmsConfigRepository, InvoiceRepository, InvoiceStore, RepositoryError,
    StockMovementRepository,
};
pub use router::invoicing_router;
pub use service::{InvoiceDocument, InvoicingError, InvoicingService};
pub use storage::{DocumentStorage, FileSystemStorage, StorageError};
pub use workflow::{InvoiceWorkflow, WorkflowError};
