//! Request handling for the topology endpoints

use crate::metrics::MetricsCollector;
use crate::router::Route;
use http_body_util::Full;
use hyper::{body::Bytes, header, Request, Response, StatusCode};
use serde::Serialize;
use std::time::Instant;
use topology_core::{RequestContext, TopologyError, TopologyService};
use tracing::{debug, warn};

/// State shared by every connection
pub struct AppState {
    pub service: TopologyService,
    pub metrics: MetricsCollector,
}

#[derive(Serialize)]
struct ApiError<'a> {
    error: bool,
    message: &'a str,
}

pub async fn handle_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let route = Route::resolve(req.method(), req.uri().path());
    debug!("{} {} -> {}", req.method(), req.uri().path(), route.name());

    let response = match &route {
        Route::Topology => topology(state).await,
        Route::DeleteRegistration { address } => delete_registration(state, address).await,
        Route::Health => text_response(StatusCode::OK, "OK\n"),
        Route::Metrics => match state.metrics.gather() {
            Ok(text) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(text)))
                .unwrap_or_else(|_| internal_error()),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
        Route::MethodNotAllowed => error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
        Route::NotFound => error_response(StatusCode::NOT_FOUND, "not found"),
    };

    state
        .metrics
        .observe_request(route.name(), response.status().as_u16(), started.elapsed());
    response
}

async fn topology(state: &AppState) -> Response<Full<Bytes>> {
    let info = state
        .service
        .collect_topology(&RequestContext::background())
        .await;
    state.metrics.observe_topology(&info);
    json_response(StatusCode::OK, &info)
}

async fn delete_registration(state: &AppState, address: &str) -> Response<Full<Bytes>> {
    let result = state
        .service
        .delete_registration(&RequestContext::background(), address)
        .await;
    state.metrics.observe_delete(result.is_ok());

    match result {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| internal_error()),
        Err(e) => {
            warn!("Failed to delete TiDB registration {}: {}", address, e);
            error_response(status_for(&e), &e.to_string())
        }
    }
}

/// HTTP status reported for a failed operation
pub fn status_for(err: &TopologyError) -> StatusCode {
    match err {
        TopologyError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        TopologyError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .unwrap_or_else(|_| internal_error()),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            internal_error()
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ApiError {
            error: true,
            message,
        },
    )
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

fn internal_error() -> Response<Full<Bytes>> {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n")
}
