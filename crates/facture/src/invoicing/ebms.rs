use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize, Serializer};

use super::domain::{Company, Invoice};
use crate::config::EbmsClientConfig;

const ADD_INVOICE_PATH: &str = "addInvoice";

/// Body posted to `{base_url}/addInvoice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbmsInvoicePayload {
    pub invoice_number: String,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub date: DateTime<Utc>,
    pub total_amount: String,
    pub company: EbmsCompany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbmsCompany {
    pub name: String,
    pub nif: String,
    pub vat_subject: bool,
    pub address: String,
}

impl EbmsInvoicePayload {
    pub fn new(invoice: &Invoice, company: &Company) -> Self {
        Self {
            invoice_number: invoice.number.clone(),
            date: invoice.date,
            total_amount: invoice.amount_display(),
            company: EbmsCompany {
                name: company.name.clone(),
                nif: company.nif.clone(),
                vat_subject: company.vat_subject,
                address: company.address.clone(),
            },
        }
    }
}

fn serialize_rfc3339<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Network-level failure reaching EBMS. HTTP error statuses are not errors.
#[derive(Debug, thiserror::Error)]
pub enum EbmsError {
    #[error("EBMS request could not be completed: {0}")]
    Transport(String),
}

/// Outbound EBMS submission hook so the workflow can be exercised without a network.
pub trait EbmsGateway: Debug + Send + Sync {
    /// Posts the payload and returns the response body verbatim, whatever the status.
    fn submit(
        &self,
        base_url: &str,
        bearer_token: Option<&str>,
        payload: &EbmsInvoicePayload,
    ) -> Result<String, EbmsError>;
}

/// Blocking reqwest client. Call it from a thread that may block
/// (`tokio::task::spawn_blocking` inside the server).
#[derive(Debug, Clone)]
pub struct HttpEbmsClient {
    timeout: Duration,
}

impl HttpEbmsClient {
    pub fn new(config: &EbmsClientConfig) -> Self {
        Self {
            timeout: config.timeout,
        }
    }

    pub fn endpoint(base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), ADD_INVOICE_PATH)
    }

    fn transport_error(err: reqwest::Error) -> EbmsError {
        EbmsError::Transport(err.to_string())
    }
}

impl EbmsGateway for HttpEbmsClient {
    fn submit(
        &self,
        base_url: &str,
        bearer_token: Option<&str>,
        payload: &EbmsInvoicePayload,
    ) -> Result<String, EbmsError> {
        // Built per call: a blocking client must not be dropped on an async worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(Self::transport_error)?;

        let endpoint = Self::endpoint(base_url);
        let mut request = client.post(&endpoint).json(payload);
        match bearer_token {
            Some(token) => request = request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => tracing::warn!(
                %endpoint,
                "EBMS token missing; submitting without Authorization header"
            ),
        }

        let response = request.send().map_err(Self::transport_error)?;
        let status = response.status();
        let body = response.text().map_err(Self::transport_error)?;

        tracing::info!(%endpoint, status = status.as_u16(), "EBMS responded");
        Ok(body)
    }
}
