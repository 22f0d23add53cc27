// Route modules organization

pub mod base_routes;
pub mod printer_routes;

// Re-export all routes for convenience
pub use base_routes::*;
pub use printer_routes::*;

use actix_web::web;

/// Every route the service answers, listed in 404 responses and at startup.
pub const ENDPOINTS: [&str; 3] = ["GET /health", "POST /print", "POST /print/test"];

/// Register all handlers. Expects `web::Data<Config>` and
/// `web::Data<Option<SharedPrinter>>` to be installed by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health)
        .service(print_receipt)
        .service(test_print)
        .default_service(web::route().to(not_found));
}
