use std::sync::Arc;

use chrono::Utc;
use validator::{Validate, ValidationErrors};

use super::domain::{
    Company, EbmsConfig, Invoice, InvoiceDetail, InvoiceDraft, InvoiceId, StockMovement,
};
use super::ebms::EbmsGateway;
use super::forms::{EbmsTokenUpdate, NewCompany, NewEbmsConfig, NewInvoice, NewStockMovement};
use super::render::DocumentRenderer;
use super::repository::{InvoiceStore, RepositoryError};
use super::storage::{DocumentStorage, StorageError};
use super::workflow::{InvoiceWorkflow, WorkflowError};

/// PDF bytes plus the file name to present them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Entry point for the presentation layer: validates input, reads and
/// writes records, and hands confirmations to the workflow.
pub struct InvoicingService<S> {
    store: Arc<S>,
    workflow: InvoiceWorkflow<S>,
    storage: Arc<dyn DocumentStorage>,
}

impl<S> InvoicingService<S>
where
    S: InvoiceStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        ebms: Arc<dyn EbmsGateway>,
        renderer: Arc<dyn DocumentRenderer>,
        storage: Arc<dyn DocumentStorage>,
    ) -> Self {
        let workflow = InvoiceWorkflow::new(store.clone(), ebms, renderer, storage.clone());
        Self {
            store,
            workflow,
            storage,
        }
    }

    pub fn create_company(&self, request: NewCompany) -> Result<Company, InvoicingError> {
        let request = request.normalized();
        request.validate()?;

        let company = self.store.insert_company(request)?;
        tracing::info!(company_id = %company.id, name = %company.name, "company created");
        Ok(company)
    }

    pub fn companies(&self) -> Result<Vec<Company>, InvoicingError> {
        Ok(self.store.list_companies()?)
    }

    pub fn create_ebms_config(
        &self,
        request: NewEbmsConfig,
    ) -> Result<EbmsConfig, InvoicingError> {
        let request = request.normalized();
        request.validate()?;

        let config = self.store.insert_config(request)?;
        tracing::info!(
            config_id = %config.id,
            base_url = %config.base_url,
            "EBMS configuration created"
        );
        Ok(config)
    }

    /// The configuration used for confirmations: the first one recorded.
    pub fn ebms_config(&self) -> Result<Option<EbmsConfig>, InvoicingError> {
        Ok(self.store.first_config()?)
    }

    pub fn update_ebms_token(
        &self,
        request: EbmsTokenUpdate,
    ) -> Result<EbmsConfig, InvoicingError> {
        let request = request.normalized();
        request.validate()?;

        let mut config = self
            .store
            .first_config()?
            .ok_or(InvoicingError::ConfigurationMissing)?;
        config.token = request.token;
        self.store.update_config(&config)?;
        tracing::info!(
            config_id = %config.id,
            has_token = config.token.is_some(),
            "EBMS token updated"
        );
        Ok(config)
    }

    pub fn create_invoice(&self, request: NewInvoice) -> Result<Invoice, InvoicingError> {
        let request = request.normalized();
        request.validate()?;

        if self.store.fetch_company(request.company)?.is_none() {
            return Err(InvoicingError::UnknownCompany);
        }

        let mut total_amount = request.total_amount;
        total_amount.rescale(2);
        let draft = InvoiceDraft {
            number: request.number,
            date: Utc::now(),
            company_id: request.company,
            total_amount,
        };

        let invoice = self.store.insert_invoice(draft).map_err(|err| match err {
            // The company vanished between the check and the insert.
            RepositoryError::NotFound => InvoicingError::UnknownCompany,
            other => InvoicingError::Repository(other),
        })?;
        tracing::info!(invoice_id = %invoice.id, number = %invoice.number, "invoice created");
        Ok(invoice)
    }

    pub fn invoices(&self) -> Result<Vec<Invoice>, InvoicingError> {
        Ok(self.store.list_invoices()?)
    }

    pub fn invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceDetail, InvoicingError> {
        let invoice = self.find_invoice(invoice_id)?;
        let company = self
            .store
            .fetch_company(invoice.company_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(InvoiceDetail::new(invoice, company))
    }

    /// Confirms with the first EBMS configuration. Blocks on the EBMS call.
    pub fn confirm_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, InvoicingError> {
        let config = self.store.first_config()?;
        self.workflow
            .confirm(invoice_id, config.as_ref())
            .map_err(InvoicingError::from)
    }

    pub fn invoice_document(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<InvoiceDocument, InvoicingError> {
        let invoice = self.find_invoice(invoice_id)?;
        let reference = invoice
            .pdf_file
            .as_ref()
            .ok_or(InvoicingError::DocumentMissing(invoice_id))?;

        let bytes = match self.storage.load(reference) {
            Ok(bytes) => bytes,
            Err(StorageError::Missing(_)) => {
                return Err(InvoicingError::DocumentMissing(invoice_id))
            }
            Err(other) => return Err(other.into()),
        };
        Ok(InvoiceDocument {
            file_name: invoice.document_name(),
            bytes,
        })
    }

    pub fn record_stock_movement(
        &self,
        invoice_id: InvoiceId,
        request: NewStockMovement,
    ) -> Result<StockMovement, InvoicingError> {
        let request = request.normalized();
        request.validate()?;
        self.find_invoice(invoice_id)?;

        let movement = self.store.insert_movement(invoice_id, request)?;
        tracing::info!(
            %invoice_id,
            product = %movement.product_name,
            quantity = movement.quantity,
            "stock movement recorded"
        );
        Ok(movement)
    }

    pub fn stock_movements(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<StockMovement>, InvoicingError> {
        self.find_invoice(invoice_id)?;
        Ok(self.store.movements_for(invoice_id)?)
    }

    fn find_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, InvoicingError> {
        self.store
            .fetch_invoice(invoice_id)?
            .ok_or(InvoicingError::InvoiceNotFound(invoice_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvoicingError {
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("company does not exist")]
    UnknownCompany,
    #[error("invoice {0} not found")]
    InvoiceNotFound(InvoiceId),
    #[error("invoice {0} has no stored document")]
    DocumentMissing(InvoiceId),
    #[error("EBMS configuration missing")]
    ConfigurationMissing,
    #[error(transparent)]
    Workflow(WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<WorkflowError> for InvoicingError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(id) => InvoicingError::InvoiceNotFound(id),
            WorkflowError::ConfigurationMissing => InvoicingError::ConfigurationMissing,
            other => InvoicingError::Workflow(other),
        }
    }
}
