// HTTP request handlers for the JSON/CSV API

use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::application::export::export_data;
use crate::application::{AppState, ExportError, UpdateOutcome};
use crate::infrastructure::cache::CacheError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!("Request failed: {}", self);
        HttpResponse::InternalServerError().json(MessageResponse::new("internal error"))
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

/// `{count, items}` listing body
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

impl MessageResponse {
    fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

pub const MSG_NOT_CONFIGURED: &str = "not configured";
pub const MSG_UP_TO_DATE: &str = "already up to date";
pub const MSG_ALREADY_RUNNING: &str = "already running";
pub const MSG_STARTED: &str = "process started";
pub const MSG_FAILED: &str = "failed";

pub async fn makers(state: web::Data<AppState>) -> ApiResult {
    let items = state.repository().list_makers().await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(items)))
}

/// Heatsinks sorted by case-insensitive name
pub async fn heatsinks(state: web::Data<AppState>) -> ApiResult {
    let items = state.repository().list_heatsinks().await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(items)))
}

pub async fn fan_configs(state: web::Data<AppState>) -> ApiResult {
    let items = state.repository().list_fan_configs().await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(items)))
}

pub async fn measurements(state: web::Data<AppState>) -> ApiResult {
    let items = state.repository().list_measurements().await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(items)))
}

/// The whole dataset as CSV
pub async fn all(state: web::Data<AppState>) -> ApiResult {
    let body = export_data(&state.repository(), b',').await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((header::CONTENT_DISPOSITION, "filename=\"cooler.csv\""))
        .body(body))
}

/// Start an update cycle in the background if one is due
pub async fn update(state: web::Data<AppState>) -> HttpResponse {
    if !state.config.server.allow_remote_update {
        return HttpResponse::Ok().json(MessageResponse::new(MSG_NOT_CONFIGURED));
    }

    match update_status(&state).await {
        Ok(Some(msg)) => HttpResponse::Ok().json(MessageResponse::new(msg)),
        Ok(None) => {
            let service = state.update_service();
            actix_web::rt::spawn(async move {
                match service.update_data(false).await {
                    Ok(UpdateOutcome::Completed(summary)) => {
                        tracing::info!(?summary, "Remote update finished");
                    }
                    Ok(outcome) => tracing::info!(?outcome, "Remote update did not complete"),
                    Err(e) => tracing::error!("Remote update failed: {}", e),
                }
            });
            HttpResponse::Ok().json(MessageResponse::new(MSG_STARTED))
        }
        Err(e) => {
            tracing::error!("Couldn't start update: {}", e);
            HttpResponse::InternalServerError().json(MessageResponse::new(MSG_FAILED))
        }
    }
}

/// Why no update should start, or `None` if one should
async fn update_status(state: &AppState) -> Result<Option<&'static str>, CacheError> {
    let scheduler = state.scheduler();
    if !scheduler.needs_update().await? {
        Ok(Some(MSG_UP_TO_DATE))
    } else if scheduler.is_update_running().await? {
        Ok(Some(MSG_ALREADY_RUNNING))
    } else {
        Ok(None)
    }
}
