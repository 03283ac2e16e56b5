// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // JSON listings
        .route("/makers", web::get().to(handlers::makers))
        .route("/heatsinks", web::get().to(handlers::heatsinks))
        .route("/fan-configs", web::get().to(handlers::fan_configs))
        .route("/measurements", web::get().to(handlers::measurements))
        // Whole dataset as CSV
        .route("/all", web::get().to(handlers::all))
        // Remote update trigger
        .route("/update", web::post().to(handlers::update));
}
