use std::sync::Arc;

use super::domain::{EbmsConfig, Invoice, InvoiceId};
use super::ebms::{EbmsError, EbmsGateway, EbmsInvoicePayload};
use super::render::{DocumentRenderer, InvoiceDocumentContext, INVOICE_TEMPLATE};
use super::repository::{CompanyRepository, InvoiceRepository, RepositoryError};
use super::storage::{DocumentStorage, StorageError};

/// Drives an invoice from draft to confirmed, pushing it to EBMS and
/// generating its document.
///
/// The steps are persisted one by one with no rollback: a failure part way
/// through leaves the earlier writes in place.
pub struct InvoiceWorkflow<R> {
    repository: Arc<R>,
    ebms: Arc<dyn EbmsGateway>,
    renderer: Arc<dyn DocumentRenderer>,
    storage: Arc<dyn DocumentStorage>,
}

impl<R> InvoiceWorkflow<R>
where
    R: CompanyRepository + InvoiceRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        ebms: Arc<dyn EbmsGateway>,
        renderer: Arc<dyn DocumentRenderer>,
        storage: Arc<dyn DocumentStorage>,
    ) -> Self {
        Self {
            repository,
            ebms,
            renderer,
            storage,
        }
    }

    /// Confirms an invoice. Blocks on the EBMS call.
    ///
    /// Confirming an already confirmed invoice repeats every step.
    pub fn confirm(
        &self,
        invoice_id: InvoiceId,
        config: Option<&EbmsConfig>,
    ) -> Result<Invoice, WorkflowError> {
        let mut invoice = self
            .repository
            .fetch_invoice(invoice_id)?
            .ok_or(WorkflowError::NotFound(invoice_id))?;
        let config = config.ok_or(WorkflowError::ConfigurationMissing)?;
        let company = self
            .repository
            .fetch_company(invoice.company_id)?
            .ok_or(RepositoryError::NotFound)?;

        invoice.confirmed = true;
        self.repository.update_invoice(&invoice)?;
        tracing::info!(%invoice_id, number = %invoice.number, "invoice confirmed");

        let payload = EbmsInvoicePayload::new(&invoice, &company);
        match self
            .ebms
            .submit(&config.base_url, config.token.as_deref(), &payload)
        {
            Ok(body) => {
                invoice.ebms_response = Some(body);
                self.repository.update_invoice(&invoice)?;
                tracing::info!(%invoice_id, number = %invoice.number, "EBMS response recorded");
            }
            Err(err) => {
                invoice.ebms_response = Some(err.to_string());
                self.repository.update_invoice(&invoice)?;
                tracing::error!(
                    %invoice_id,
                    number = %invoice.number,
                    error = %err,
                    "EBMS submission failed"
                );
                return Err(WorkflowError::Integration(err));
            }
        }

        let context = InvoiceDocumentContext::new(&invoice, &company);
        if let Some(bytes) = self.renderer.render(INVOICE_TEMPLATE, &context).into_bytes() {
            let reference = self.storage.save(&invoice.document_name(), &bytes)?;
            tracing::info!(%invoice_id, document = %reference, "invoice document stored");
            invoice.pdf_file = Some(reference);
        }
        self.repository.update_invoice(&invoice)?;

        Ok(invoice)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invoice {0} not found")]
    NotFound(InvoiceId),
    #[error("EBMS configuration missing")]
    ConfigurationMissing,
    #[error("EBMS integration failed: {0}")]
    Integration(#[from] EbmsError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
