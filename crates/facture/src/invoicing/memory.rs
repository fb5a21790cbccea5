use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Company, CompanyId, EbmsConfig, EbmsConfigId, Invoice, InvoiceDraft, InvoiceId,
    StockMovement, StockMovementId,
};
use super::forms::{NewCompany, NewEbmsConfig, NewStockMovement};
use super::repository::{
    CompanyRepository, EbmsConfigRepository, InvoiceRepository, RepositoryError,
    StockMovementRepository,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    companies: BTreeMap<CompanyId, Company>,
    configs: BTreeMap<EbmsConfigId, EbmsConfig>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    movements: BTreeMap<StockMovementId, StockMovement>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_invoice_cascade(&mut self, id: InvoiceId) {
        self.invoices.remove(&id);
        self.movements.retain(|_, movement| movement.invoice_id != id);
    }
}

/// Process-local store backing every repository trait.
///
/// Ids come from one shared sequence, mirroring a database where each table
/// has its own auto-increment but callers only rely on uniqueness.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl CompanyRepository for InMemoryStore {
    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError> {
        let mut tables = self.lock()?;
        let id = CompanyId(tables.allocate());
        let record = Company {
            id,
            name: company.name,
            nif: company.nif,
            vat_subject: company.vat_subject,
            address: company.address,
        };
        tables.companies.insert(id, record.clone());
        Ok(record)
    }

    fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.lock()?.companies.get(&id).cloned())
    }

    fn list_companies(&self) -> Result<Vec<Company>, RepositoryError> {
        Ok(self.lock()?.companies.values().cloned().collect())
    }

    fn delete_company(&self, id: CompanyId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.companies.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        let owned: Vec<InvoiceId> = tables
            .invoices
            .values()
            .filter(|invoice| invoice.company_id == id)
            .map(|invoice| invoice.id)
            .collect();
        for invoice_id in owned {
            tables.remove_invoice_cascade(invoice_id);
        }
        Ok(())
    }
}

impl InvoiceRepository for InMemoryStore {
    fn insert_invoice(&self, draft: InvoiceDraft) -> Result<Invoice, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.companies.contains_key(&draft.company_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .invoices
            .values()
            .any(|invoice| invoice.number == draft.number)
        {
            return Err(RepositoryError::Conflict(format!(
                "invoice number '{}' already exists",
                draft.number
            )));
        }

        let id = InvoiceId(tables.allocate());
        let record = Invoice {
            id,
            number: draft.number,
            date: draft.date,
            company_id: draft.company_id,
            total_amount: draft.total_amount,
            confirmed: false,
            pdf_file: None,
            ebms_response: None,
        };
        tables.invoices.insert(id, record.clone());
        Ok(record)
    }

    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.lock()?.invoices.get(&id).cloned())
    }

    fn update_invoice(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.invoices.get_mut(&invoice.id) {
            Some(stored) => {
                *stored = invoice.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        Ok(self.lock()?.invoices.values().cloned().collect())
    }

    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.invoices.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.remove_invoice_cascade(id);
        Ok(())
    }
}

impl EbmsConfigRepository for InMemoryStore {
    fn insert_config(&self, config: NewEbmsConfig) -> Result<EbmsConfig, RepositoryError> {
        let mut tables = self.lock()?;
        let id = EbmsConfigId(tables.allocate());
        let record = EbmsConfig {
            id,
            base_url: config.base_url,
            username: config.username,
            password: config.password,
            token: None,
        };
        tables.configs.insert(id, record.clone());
        Ok(record)
    }

    fn first_config(&self) -> Result<Option<EbmsConfig>, RepositoryError> {
        Ok(self.lock()?.configs.values().next().cloned())
    }

    fn update_config(&self, config: &EbmsConfig) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.configs.get_mut(&config.id) {
            Some(stored) => {
                *stored = config.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl StockMovementRepository for InMemoryStore {
    fn insert_movement(
        &self,
        invoice_id: InvoiceId,
        movement: NewStockMovement,
    ) -> Result<StockMovement, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.invoices.contains_key(&invoice_id) {
            return Err(RepositoryError::NotFound);
        }

        let id = StockMovementId(tables.allocate());
        let record = StockMovement {
            id,
            invoice_id,
            product_name: movement.product_name,
            quantity: movement.quantity,
            movement_type: movement.movement_type,
        };
        tables.movements.insert(id, record.clone());
        Ok(record)
    }

    fn movements_for(&self, invoice_id: InvoiceId) -> Result<Vec<StockMovement>, RepositoryError> {
        Ok(self
            .lock()?
            .movements
            .values()
            .filter(|movement| movement.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn acme(store: &InMemoryStore) -> Company {
        store
            .insert_company(NewCompany {
                name: "Acme".to_string(),
                nif: "4000123456".to_string(),
                vat_subject: true,
                address: "Avenue du Commerce 12".to_string(),
            })
            .expect("company stored")
    }

    fn draft(number: &str, company_id: CompanyId) -> InvoiceDraft {
        InvoiceDraft {
            number: number.to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            company_id,
            total_amount: Decimal::new(15000, 2),
        }
    }

    #[test]
    fn duplicate_invoice_number_conflicts() {
        let store = InMemoryStore::new();
        let company = acme(&store);

        store
            .insert_invoice(draft("INV-001", company.id))
            .expect("first insert");
        match store.insert_invoice(draft("INV-001", company.id)) {
            Err(RepositoryError::Conflict(message)) => assert!(message.contains("INV-001")),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.list_invoices().expect("list").len(), 1);
    }

    #[test]
    fn new_invoices_start_as_drafts() {
        let store = InMemoryStore::new();
        let company = acme(&store);
        let invoice = store
            .insert_invoice(draft("INV-002", company.id))
            .expect("insert");

        assert!(!invoice.confirmed);
        assert!(invoice.pdf_file.is_none());
        assert!(invoice.ebms_response.is_none());
    }

    #[test]
    fn deleting_company_cascades_to_invoices_and_movements() {
        let store = InMemoryStore::new();
        let acme = acme(&store);
        let other = store
            .insert_company(NewCompany {
                name: "Globex".to_string(),
                nif: "4000999999".to_string(),
                vat_subject: false,
                address: "Boulevard 3".to_string(),
            })
            .expect("second company");

        let doomed = store.insert_invoice(draft("INV-010", acme.id)).expect("insert");
        let kept = store.insert_invoice(draft("INV-011", other.id)).expect("insert");
        store
            .insert_movement(
                doomed.id,
                NewStockMovement {
                    product_name: "Cement".to_string(),
                    quantity: -4,
                    movement_type: "out".to_string(),
                },
            )
            .expect("movement stored");

        store.delete_company(acme.id).expect("delete");

        assert!(store.fetch_invoice(doomed.id).expect("fetch").is_none());
        assert!(store.movements_for(doomed.id).expect("list").is_empty());
        assert!(store.fetch_invoice(kept.id).expect("fetch").is_some());
    }

    #[test]
    fn first_config_returns_lowest_id() {
        let store = InMemoryStore::new();
        let first = store
            .insert_config(NewEbmsConfig {
                base_url: "https://ebms.example".to_string(),
                username: "first".to_string(),
                password: "pw".to_string(),
            })
            .expect("insert");
        store
            .insert_config(NewEbmsConfig {
                base_url: "https://other.example".to_string(),
                username: "second".to_string(),
                password: "pw".to_string(),
            })
            .expect("insert");

        let found = store.first_config().expect("lookup").expect("present");
        assert_eq!(found.id, first.id);
        assert_eq!(found.token, None);
    }

    #[test]
    fn update_of_unknown_invoice_is_not_found() {
        let store = InMemoryStore::new();
        let company = acme(&store);
        let mut invoice = store
            .insert_invoice(draft("INV-020", company.id))
            .expect("insert");
        store.delete_invoice(invoice.id).expect("delete");

        invoice.confirmed = true;
        assert!(matches!(
            store.update_invoice(&invoice),
            Err(RepositoryError::NotFound)
        ));
    }
}
