use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use super::domain::InvoiceId;
use super::forms::{
    field_messages, EbmsTokenUpdate, NewCompany, NewEbmsConfig, NewInvoice, NewStockMovement,
};
use super::repository::{InvoiceStore, RepositoryError};
use super::service::{InvoicingError, InvoicingService};
use super::workflow::WorkflowError;

/// JSON request body whose parse failures answer with `{"error": ...}`.
pub(crate) struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// The `:invoice_id` path segment.
pub(crate) struct InvoicePath(pub InvoiceId);

#[async_trait]
impl<S> FromRequestParts<S> for InvoicePath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<u64>::from_request_parts(parts, state).await {
            Ok(Path(invoice_id)) => Ok(Self(InvoiceId(invoice_id))),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    rejection_response(rejection.status(), rejection.body_text())
}

fn path_rejection(rejection: PathRejection) -> Response {
    rejection_response(rejection.status(), rejection.body_text())
}

fn rejection_response(status: StatusCode, message: String) -> Response {
    tracing::debug!(status = status.as_u16(), %message, "request rejected");
    let payload = json!({
        "error": message,
    });
    (status, axum::Json(payload)).into_response()
}

/// HTTP surface for companies, EBMS settings, invoices and their stock movements.
pub fn invoicing_router<S>(service: Arc<InvoicingService<S>>) -> Router
where
    S: InvoiceStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/companies",
            post(create_company_handler::<S>).get(list_companies_handler::<S>),
        )
        .route(
            "/api/v1/ebms-config",
            post(create_config_handler::<S>).get(config_handler::<S>),
        )
        .route("/api/v1/ebms-config/token", put(update_token_handler::<S>))
        .route(
            "/api/v1/invoices",
            post(create_invoice_handler::<S>).get(list_invoices_handler::<S>),
        )
        .route("/api/v1/invoices/:invoice_id", get(invoice_handler::<S>))
        .route(
            "/api/v1/invoices/:invoice_id/confirm",
            post(confirm_handler::<S>),
        )
        .route(
            "/api/v1/invoices/:invoice_id/pdf",
            get(document_handler::<S>),
        )
        .route(
            "/api/v1/invoices/:invoice_id/stock-movements",
            post(record_movement_handler::<S>).get(list_movements_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn create_company_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    JsonBody(request): JsonBody<NewCompany>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.create_company(request) {
        Ok(company) => (StatusCode::CREATED, axum::Json(company)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_companies_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.companies() {
        Ok(companies) => (StatusCode::OK, axum::Json(companies)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_config_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    JsonBody(request): JsonBody<NewEbmsConfig>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.create_ebms_config(request) {
        Ok(config) => (StatusCode::CREATED, axum::Json(config)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn config_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.ebms_config() {
        Ok(Some(config)) => (StatusCode::OK, axum::Json(config)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "EBMS configuration not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_token_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    JsonBody(request): JsonBody<EbmsTokenUpdate>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.update_ebms_token(request) {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_invoice_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    JsonBody(request): JsonBody<NewInvoice>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.create_invoice(request) {
        Ok(invoice) => (StatusCode::CREATED, axum::Json(invoice)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_invoices_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.invoices() {
        Ok(invoices) => (StatusCode::OK, axum::Json(invoices)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn invoice_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    InvoicePath(invoice_id): InvoicePath,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.invoice(invoice_id) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    InvoicePath(invoice_id): InvoicePath,
) -> Response
where
    S: InvoiceStore + 'static,
{
    // The EBMS call and rendering block; keep them off the async workers.
    let outcome =
        tokio::task::spawn_blocking(move || service.confirm_invoice(invoice_id)).await;

    match outcome {
        Ok(Ok(invoice)) => (StatusCode::OK, axum::Json(invoice)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => {
            tracing::error!(%invoice_id, error = %join_error, "confirmation task aborted");
            let payload = json!({
                "error": "confirmation task aborted",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn document_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    InvoicePath(invoice_id): InvoicePath,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.invoice_document(invoice_id) {
        Ok(document) => {
            let disposition = format!("inline; filename=\"{}\"", document.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.bytes,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_movement_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    InvoicePath(invoice_id): InvoicePath,
    JsonBody(request): JsonBody<NewStockMovement>,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.record_stock_movement(invoice_id, request) {
        Ok(movement) => (StatusCode::CREATED, axum::Json(movement)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_movements_handler<S>(
    State(service): State<Arc<InvoicingService<S>>>,
    InvoicePath(invoice_id): InvoicePath,
) -> Response
where
    S: InvoiceStore + 'static,
{
    match service.stock_movements(invoice_id) {
        Ok(movements) => (StatusCode::OK, axum::Json(movements)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: InvoicingError) -> Response {
    let status = match &err {
        InvoicingError::Validation(errors) => {
            let payload = json!({
                "error": err.to_string(),
                "fields": field_messages(errors),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
        InvoicingError::UnknownCompany => StatusCode::UNPROCESSABLE_ENTITY,
        InvoicingError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        InvoicingError::InvoiceNotFound(_) | InvoicingError::DocumentMissing(_) => {
            StatusCode::NOT_FOUND
        }
        InvoicingError::ConfigurationMissing => StatusCode::PRECONDITION_FAILED,
        InvoicingError::Workflow(WorkflowError::Integration(_)) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "invoicing request failed");
    }

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
