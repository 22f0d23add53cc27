use actix_web::{post, web, HttpResponse, Responder};
use tracing::{info, warn};

use crate::config::{Config, RunMode};
use crate::errors::AppError;
use crate::printers::SharedPrinter;
use crate::receipt::PrintPayload;
use crate::session::{self, PrintJob, PrintOutcome};

#[post("/print")]
pub async fn print_receipt(
    printer: web::Data<Option<SharedPrinter>>,
    body: web::Json<serde_json::Value>,
    config: web::Data<Config>,
) -> impl Responder {
    let request = match PrintPayload::from_json(body.into_inner()).and_then(PrintPayload::validate)
    {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected print request: {}", e);
            let err = AppError::from(e);
            return HttpResponse::build(err.status_code()).json(err.error_response());
        }
    };

    info!(
        "Print request received: {} item(s), total {}, transaction {:?}",
        request.items.len(),
        request.total,
        request.transaction_id
    );

    let job = PrintJob::receipt(&request);
    let outcome = run_job(&job, printer.get_ref()).await;
    respond(&outcome, config.mode)
}

#[post("/print/test")]
pub async fn test_print(
    printer: web::Data<Option<SharedPrinter>>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Test print request received");

    let job = PrintJob::test_page();
    let outcome = run_job(&job, printer.get_ref()).await;
    respond(&outcome, config.mode)
}

// The device lock is held for the whole session so print requests are
// served one at a time.
async fn run_job(job: &PrintJob, printer: &Option<SharedPrinter>) -> PrintOutcome {
    match printer {
        Some(shared) => {
            let mut device = shared.lock().await;
            session::execute(job, Some(&mut **device)).await
        }
        None => session::execute(job, None).await,
    }
}

fn respond(outcome: &PrintOutcome, mode: RunMode) -> HttpResponse {
    let body = outcome.response_body(mode.exposes_error_detail());
    if outcome.success {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::errors::DeviceError;
    use crate::layout::RenderCommand;
    use crate::printers::{share, PrinterDevice, SharedPrinter};
    use crate::routes;
    use actix_web::{http::StatusCode, test, web, App};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Counts device calls and can refuse to open.
    struct CountingDevice {
        calls: Arc<Mutex<Vec<&'static str>>>,
        refuse_open: bool,
    }

    #[async_trait]
    impl PrinterDevice for CountingDevice {
        async fn open(&mut self) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push("open");
            if self.refuse_open {
                return Err(DeviceError::Busy("claimed by another process".to_string()));
            }
            Ok(())
        }

        async fn emit(&mut self, _command: &RenderCommand) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push("emit");
            Ok(())
        }

        async fn close(&mut self) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push("close");
            Ok(())
        }

        fn describe(&self) -> String {
            "counting device".to_string()
        }
    }

    fn config(vars: &'static [(&'static str, &'static str)]) -> Config {
        Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    fn device(refuse_open: bool) -> (Option<SharedPrinter>, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let printer = share(Box::new(CountingDevice {
            calls: calls.clone(),
            refuse_open,
        }));
        (Some(printer), calls)
    }

    fn sample_body() -> Value {
        json!({
            "items": [
                { "name": "Item A", "qty": 2, "price": 10000 },
                { "name": "Item B", "qty": 1, "price": 15000 }
            ],
            "total": 35000,
            "storeName": "My Store",
            "transactionId": "TRX-001",
            "cashier": "John Doe"
        })
    }

    macro_rules! app {
        ($config:expr, $printer:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($config))
                    .app_data(web::Data::new($printer))
                    .configure(routes::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_print_in_mock_mode() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(sample_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["mock"], true);
        assert_eq!(body["transactionId"], "TRX-001");
        assert_eq!(body["message"], "Mock mode: Receipt would be printed");
    }

    #[actix_web::test]
    async fn test_print_on_device() {
        let (printer, calls) = device(false);
        let app = app!(config(&[]), printer);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(sample_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Receipt printed successfully");
        assert!(body.get("mock").is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.first(), Some(&"open"));
        assert_eq!(calls.last(), Some(&"close"));
    }

    #[actix_web::test]
    async fn test_print_rejects_empty_items() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(json!({ "items": [], "total": 1000 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Invalid request: items array is required and must not be empty"
        );
    }

    #[actix_web::test]
    async fn test_print_rejects_missing_total() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(json!({ "items": [{ "name": "A", "qty": 1, "price": 1 }] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid request: total is required");
    }

    #[actix_web::test]
    async fn test_print_accepts_numeric_metadata() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(json!({
                "items": [{ "name": "A", "qty": 1, "price": 1 }],
                "total": 1,
                "transactionId": 12345,
                "cashier": 7
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["transactionId"], "12345");
    }

    #[actix_web::test]
    async fn test_print_rejects_invalid_json() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post()
            .uri("/print")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_open_failure_detail_by_mode() {
        let (printer, calls) = device(true);
        let app = app!(config(&[]), printer);

        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(sample_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Failed to open printer device: Printer device busy: claimed by another process"
        );
        assert_eq!(*calls.lock().unwrap(), vec!["open"]);

        let (printer, _) = device(true);
        let app = app!(config(&[("RUN_MODE", "production")]), printer);
        let req = test::TestRequest::post()
            .uri("/print")
            .set_json(sample_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to open printer device");
    }

    #[actix_web::test]
    async fn test_test_print_route() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::post().uri("/print/test").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["mock"], true);
        assert_eq!(body["message"], "Mock mode: Test receipt would be printed");
    }

    #[actix_web::test]
    async fn test_health_reports_printer() {
        let (printer, _) = device(false);
        let app = app!(config(&[]), printer);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["printerAvailable"], true);
        assert_eq!(body["mode"], "development");
    }

    #[actix_web::test]
    async fn test_unknown_route() {
        let app = app!(config(&[]), None::<SharedPrinter>);

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Endpoint not found");
        assert_eq!(body["availableEndpoints"][1], "POST /print");
    }
}
