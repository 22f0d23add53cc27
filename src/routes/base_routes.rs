use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use tracing::warn;

use crate::config::Config;
use crate::printers::SharedPrinter;

use super::ENDPOINTS;

pub const SERVICE_NAME: &str = "pos-print-service";

#[get("/health")]
pub async fn health(
    config: web::Data<Config>,
    printer: web::Data<Option<SharedPrinter>>,
) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "printerAvailable": printer.is_some(),
        "mode": config.mode.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    warn!("No route for {} {}", req.method(), req.path());
    HttpResponse::NotFound().json(serde_json::json!({
        "success": false,
        "error": "Endpoint not found",
        "availableEndpoints": ENDPOINTS
    }))
}

/// Unparseable JSON bodies get the same `{success, error}` shape as
/// every other failure.
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Invalid JSON body on {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": format!("Invalid request body: {}", err)
    }));
    InternalError::from_response(err, response).into()
}
