use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::invoicing::domain::{
    Company, CompanyId, DocumentRef, EbmsConfig, Invoice, InvoiceDraft, InvoiceId, StockMovement,
};
use crate::invoicing::ebms::{EbmsError, EbmsGateway, EbmsInvoicePayload};
use crate::invoicing::forms::{NewCompany, NewEbmsConfig, NewInvoice, NewStockMovement};
use crate::invoicing::memory::InMemoryStore;
use crate::invoicing::render::{DocumentRenderer, InvoiceDocumentContext, RenderedDocument};
use crate::invoicing::repository::{
    CompanyRepository, EbmsConfigRepository, InvoiceRepository, RepositoryError,
    StockMovementRepository,
};
use crate::invoicing::storage::{DocumentStorage, StorageError};
use crate::invoicing::{InvoiceWorkflow, InvoicingService};

pub(super) const FAKE_PDF: &[u8] = b"%PDF-1.5 fake";

pub(super) fn acme() -> NewCompany {
    NewCompany {
        name: "Acme".to_string(),
        nif: "4000123456".to_string(),
        vat_subject: true,
        address: "Avenue du Commerce 12, Bujumbura".to_string(),
    }
}

pub(super) fn ebms_settings() -> NewEbmsConfig {
    NewEbmsConfig {
        base_url: "https://ebms.example".to_string(),
        username: "facture".to_string(),
        password: "s3cret".to_string(),
    }
}

pub(super) fn new_invoice(number: &str, company: CompanyId) -> NewInvoice {
    NewInvoice {
        number: number.to_string(),
        company,
        total_amount: Decimal::new(15000, 2),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// In-memory store that counts invoice writes.
#[derive(Debug, Default)]
pub(super) struct RecordingStore {
    inner: InMemoryStore,
    invoice_updates: AtomicUsize,
}

impl RecordingStore {
    pub(super) fn invoice_updates(&self) -> usize {
        self.invoice_updates.load(Ordering::SeqCst)
    }

    /// Seeds a company, a draft invoice and optionally an EBMS configuration with token `abc`.
    pub(super) fn seeded(number: &str, with_config: bool) -> (Arc<Self>, Invoice) {
        let store = Arc::new(Self::default());
        let company = store.insert_company(acme()).expect("company stored");
        let invoice = store
            .insert_invoice(InvoiceDraft {
                number: number.to_string(),
                date: chrono::Utc::now(),
                company_id: company.id,
                total_amount: Decimal::new(15000, 2),
            })
            .expect("invoice stored");
        if with_config {
            let mut config = store.insert_config(ebms_settings()).expect("config stored");
            config.token = Some("abc".to_string());
            store.update_config(&config).expect("token stored");
        }
        (store, invoice)
    }
}

impl CompanyRepository for RecordingStore {
    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError> {
        self.inner.insert_company(company)
    }

    fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        self.inner.fetch_company(id)
    }

    fn list_companies(&self) -> Result<Vec<Company>, RepositoryError> {
        self.inner.list_companies()
    }

    fn delete_company(&self, id: CompanyId) -> Result<(), RepositoryError> {
        self.inner.delete_company(id)
    }
}

impl InvoiceRepository for RecordingStore {
    fn insert_invoice(&self, draft: InvoiceDraft) -> Result<Invoice, RepositoryError> {
        self.inner.insert_invoice(draft)
    }

    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.inner.fetch_invoice(id)
    }

    fn update_invoice(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        self.invoice_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_invoice(invoice)
    }

    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.list_invoices()
    }

    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        self.inner.delete_invoice(id)
    }
}

impl EbmsConfigRepository for RecordingStore {
    fn insert_config(&self, config: NewEbmsConfig) -> Result<EbmsConfig, RepositoryError> {
        self.inner.insert_config(config)
    }

    fn first_config(&self) -> Result<Option<EbmsConfig>, RepositoryError> {
        self.inner.first_config()
    }

    fn update_config(&self, config: &EbmsConfig) -> Result<(), RepositoryError> {
        self.inner.update_config(config)
    }
}

impl StockMovementRepository for RecordingStore {
    fn insert_movement(
        &self,
        invoice_id: InvoiceId,
        movement: NewStockMovement,
    ) -> Result<StockMovement, RepositoryError> {
        self.inner.insert_movement(invoice_id, movement)
    }

    fn movements_for(&self, invoice_id: InvoiceId) -> Result<Vec<StockMovement>, RepositoryError> {
        self.inner.movements_for(invoice_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EbmsCall {
    pub(super) base_url: String,
    pub(super) bearer_token: Option<String>,
    pub(super) payload: EbmsInvoicePayload,
}

#[derive(Debug)]
enum EbmsBehaviour {
    Respond(String),
    Unreachable,
}

/// Scripted EBMS endpoint that records every submission.
#[derive(Debug)]
pub(super) struct FakeEbms {
    behaviour: EbmsBehaviour,
    calls: Mutex<Vec<EbmsCall>>,
}

impl FakeEbms {
    pub(super) fn responding(body: &str) -> Self {
        Self {
            behaviour: EbmsBehaviour::Respond(body.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn unreachable() -> Self {
        Self {
            behaviour: EbmsBehaviour::Unreachable,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<EbmsCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

impl EbmsGateway for FakeEbms {
    fn submit(
        &self,
        base_url: &str,
        bearer_token: Option<&str>,
        payload: &EbmsInvoicePayload,
    ) -> Result<String, EbmsError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(EbmsCall {
                base_url: base_url.to_string(),
                bearer_token: bearer_token.map(str::to_string),
                payload: payload.clone(),
            });
        match &self.behaviour {
            EbmsBehaviour::Respond(body) => Ok(body.clone()),
            EbmsBehaviour::Unreachable => {
                Err(EbmsError::Transport("connection refused".to_string()))
            }
        }
    }
}

/// Renderer returning a fixed document, or nothing at all.
#[derive(Debug)]
pub(super) struct FixedRenderer {
    document: Option<Vec<u8>>,
    renders: AtomicUsize,
}

impl FixedRenderer {
    pub(super) fn producing() -> Self {
        Self {
            document: Some(FAKE_PDF.to_vec()),
            renders: AtomicUsize::new(0),
        }
    }

    pub(super) fn absent() -> Self {
        Self {
            document: None,
            renders: AtomicUsize::new(0),
        }
    }

    pub(super) fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl DocumentRenderer for FixedRenderer {
    fn render(&self, _template: &str, _context: &InvoiceDocumentContext) -> RenderedDocument {
        self.renders.fetch_add(1, Ordering::SeqCst);
        match &self.document {
            Some(bytes) => RenderedDocument::Pdf(bytes.clone()),
            None => RenderedDocument::Absent,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub(super) fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl DocumentStorage for MemoryStorage {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<DocumentRef, StorageError> {
        let reference = format!("invoices/{name}");
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .insert(reference.clone(), bytes.to_vec());
        Ok(DocumentRef(reference))
    }

    fn load(&self, reference: &DocumentRef) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .get(&reference.0)
            .cloned()
            .ok_or_else(|| StorageError::Missing(reference.clone()))
    }
}

pub(super) struct Harness {
    pub(super) store: Arc<RecordingStore>,
    pub(super) ebms: Arc<FakeEbms>,
    pub(super) renderer: Arc<FixedRenderer>,
    pub(super) storage: Arc<MemoryStorage>,
}

impl Harness {
    pub(super) fn new(store: Arc<RecordingStore>, ebms: FakeEbms, renderer: FixedRenderer) -> Self {
        Self {
            store,
            ebms: Arc::new(ebms),
            renderer: Arc::new(renderer),
            storage: Arc::new(MemoryStorage::default()),
        }
    }

    pub(super) fn workflow(&self) -> InvoiceWorkflow<RecordingStore> {
        InvoiceWorkflow::new(
            self.store.clone(),
            self.ebms.clone(),
            self.renderer.clone(),
            self.storage.clone(),
        )
    }

    pub(super) fn service(&self) -> Arc<InvoicingService<RecordingStore>> {
        Arc::new(InvoicingService::new(
            self.store.clone(),
            self.ebms.clone(),
            self.renderer.clone(),
            self.storage.clone(),
        ))
    }
}

/// Empty store with a responding EBMS and a renderer that produces documents.
pub(super) fn empty_harness() -> Harness {
    Harness::new(
        Arc::new(RecordingStore::default()),
        FakeEbms::responding(r#"{"status":"ok"}"#),
        FixedRenderer::producing(),
    )
}
