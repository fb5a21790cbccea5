use std::fmt::Debug;
use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

use super::domain::{Company, Invoice};
use super::pdf;
use crate::config::DocumentConfig;

/// Template rendered for every confirmed invoice.
pub const INVOICE_TEMPLATE: &str = "invoice.txt";

const BUILTIN_INVOICE_TEMPLATE: &str = include_str!("../../templates/invoice.txt");

/// Outcome of a render. Template and layout failures surface as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Absent,
}

impl RenderedDocument {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RenderedDocument::Pdf(bytes) => Some(bytes),
            RenderedDocument::Absent => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub number: String,
    pub issued_on: String,
    pub total_amount: String,
    pub status: &'static str,
}

/// Data exposed to invoice templates as `invoice` and `company`.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocumentContext {
    pub invoice: InvoiceSummary,
    pub company: Company,
}

impl InvoiceDocumentContext {
    pub fn new(invoice: &Invoice, company: &Company) -> Self {
        Self {
            invoice: InvoiceSummary {
                number: invoice.number.clone(),
                issued_on: invoice.date.format("%Y-%m-%d %H:%M UTC").to_string(),
                total_amount: invoice.amount_display(),
                status: invoice.state().label(),
            },
            company: company.clone(),
        }
    }
}

pub trait DocumentRenderer: Debug + Send + Sync {
    fn render(&self, template: &str, context: &InvoiceDocumentContext) -> RenderedDocument;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("pdf layout failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Tera templates laid out as text PDFs.
#[derive(Debug)]
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Only the template shipped with the crate.
    pub fn builtin() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(INVOICE_TEMPLATE, BUILTIN_INVOICE_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Templates found under `template_dir` shadow the built-in ones by name.
    pub fn from_config(config: &DocumentConfig) -> Result<Self, RenderError> {
        match &config.template_dir {
            Some(dir) => Self::with_overrides(dir),
            None => Self::builtin(),
        }
    }

    fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        let glob = format!("{}/**/*", dir.display());
        let mut tera = Tera::new(&glob)?;
        tera.extend(&Self::builtin()?.tera)?;
        Ok(Self { tera })
    }

    pub fn render_pdf(
        &self,
        template: &str,
        context: &InvoiceDocumentContext,
    ) -> Result<Vec<u8>, RenderError> {
        let context = Context::from_serialize(context)?;
        let text = self.tera.render(template, &context)?;
        let title = format!("Invoice {}", context_number(&context));
        Ok(pdf::text_document(&title, &text)?)
    }
}

fn context_number(context: &Context) -> String {
    context
        .get("invoice")
        .and_then(|invoice| invoice.get("number"))
        .and_then(|number| number.as_str())
        .unwrap_or_default()
        .to_string()
}

impl DocumentRenderer for TemplateRenderer {
    fn render(&self, template: &str, context: &InvoiceDocumentContext) -> RenderedDocument {
        match self.render_pdf(template, context) {
            Ok(bytes) => RenderedDocument::Pdf(bytes),
            Err(err) => {
                tracing::warn!(
                    template,
                    number = %context.invoice.number,
                    error = %err,
                    "invoice document rendering failed; continuing without a document"
                );
                RenderedDocument::Absent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoicing::domain::{CompanyId, InvoiceId};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::fs;

    fn context() -> InvoiceDocumentContext {
        let company = Company {
            id: CompanyId(1),
            name: "Acme".to_string(),
            nif: "4000123456".to_string(),
            vat_subject: false,
            address: "Avenue du Commerce 12".to_string(),
        };
        let invoice = Invoice {
            id: InvoiceId(7),
            number: "INV-001".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            company_id: company.id,
            total_amount: Decimal::new(15000, 2),
            confirmed: true,
            pdf_file: None,
            ebms_response: None,
        };
        InvoiceDocumentContext::new(&invoice, &company)
    }

    #[test]
    fn builtin_template_renders_pdf() {
        let renderer = TemplateRenderer::builtin().expect("builtin template parses");
        match renderer.render(INVOICE_TEMPLATE, &context()) {
            RenderedDocument::Pdf(bytes) => {
                let doc = lopdf::Document::load_mem(&bytes).expect("pdf parses");
                assert_eq!(doc.get_pages().len(), 1);
            }
            RenderedDocument::Absent => panic!("expected a document"),
        }
    }

    #[test]
    fn unknown_template_is_absent_not_an_error() {
        let renderer = TemplateRenderer::builtin().expect("builtin template parses");
        let rendered = renderer.render("missing.txt", &context());
        assert_eq!(rendered, RenderedDocument::Absent);
        assert!(rendered.into_bytes().is_none());
    }

    #[test]
    fn context_exposes_formatted_fields() {
        let context = context();
        assert_eq!(context.invoice.total_amount, "150.00");
        assert_eq!(context.invoice.issued_on, "2025-03-14 09:30 UTC");
        assert_eq!(context.invoice.status, "Confirmed");
    }

    #[test]
    fn template_directory_overrides_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(INVOICE_TEMPLATE),
            "{{ invoice.number }} / {{ company.undefined_field }}",
        )
        .expect("write template");

        let renderer = TemplateRenderer::from_config(&DocumentConfig {
            template_dir: Some(dir.path().to_path_buf()),
        })
        .expect("templates load");

        // The override references an unknown variable, which Tera rejects at render time.
        assert!(renderer.render_pdf(INVOICE_TEMPLATE, &context()).is_err());
        assert_eq!(
            renderer.render(INVOICE_TEMPLATE, &context()),
            RenderedDocument::Absent
        );
    }
}
