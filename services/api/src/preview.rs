use chrono::Utc;
use clap::Args;
use facture::config::AppConfig;
use facture::error::AppError;
use facture::invoicing::{
    Company, CompanyId, Invoice, InvoiceDocumentContext, InvoiceId, TemplateRenderer,
    INVOICE_TEMPLATE,
};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Where to write the rendered PDF
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Invoice number printed on the sample
    #[arg(long, default_value = "PREVIEW-001")]
    pub(crate) number: String,
    /// Billed company name
    #[arg(long, default_value = "Acme")]
    pub(crate) company: String,
    /// Total amount, e.g. 150.00
    #[arg(long, default_value = "150.00", value_parser = crate::infra::parse_amount)]
    pub(crate) amount: Decimal,
}

/// Renders a confirmed sample invoice with the configured templates, offline.
pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let renderer = TemplateRenderer::from_config(&config.documents)?;

    let (invoice, company) = sample(&args);
    let context = InvoiceDocumentContext::new(&invoice, &company);
    let bytes = renderer.render_pdf(INVOICE_TEMPLATE, &context)?;
    std::fs::write(&args.output, &bytes)?;

    println!(
        "Invoice {} for {} ({}) written to {} ({} bytes)",
        invoice.number,
        company.name,
        invoice.amount_display(),
        args.output.display(),
        bytes.len()
    );
    Ok(())
}

fn sample(args: &PreviewArgs) -> (Invoice, Company) {
    let company = Company {
        id: CompanyId(1),
        name: args.company.clone(),
        nif: "4000000000".to_string(),
        vat_subject: true,
        address: "Sample address".to_string(),
    };
    let invoice = Invoice {
        id: InvoiceId(1),
        number: args.number.clone(),
        date: Utc::now(),
        company_id: company.id,
        total_amount: args.amount,
        confirmed: true,
        pdf_file: None,
        ebms_response: None,
    };
    (invoice, company)
}
