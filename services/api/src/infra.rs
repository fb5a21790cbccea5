use facture::config::AppConfig;
use facture::error::AppError;
use facture::invoicing::{
    FileSystemStorage, HttpEbmsClient, InMemoryStore, InvoicingService, TemplateRenderer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the in-memory store, HTTP EBMS client, templates and media storage.
pub(crate) fn invoicing_service(
    config: &AppConfig,
) -> Result<Arc<InvoicingService<InMemoryStore>>, AppError> {
    let renderer = TemplateRenderer::from_config(&config.documents)?;
    Ok(Arc::new(InvoicingService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(HttpEbmsClient::new(&config.ebms)),
        Arc::new(renderer),
        Arc::new(FileSystemStorage::from_config(&config.storage)),
    )))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim())
        .map_err(|err| format!("failed to parse '{raw}' as a decimal amount ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_accepts_plain_decimals() {
        assert_eq!(parse_amount(" 150.5 "), Ok(Decimal::new(1505, 1)));
        assert!(parse_amount("abc").is_err());
    }
}
