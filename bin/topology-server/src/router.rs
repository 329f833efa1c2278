//! Router mapping HTTP requests onto topology operations

use hyper::Method;
use percent_encoding::percent_decode_str;

const TOPOLOGY_PATH: &str = "/topology";
const TIDB_REGISTRATION_PREFIX: &str = "/topology/tidb/";

/// A resolved route
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `GET /topology`
    Topology,
    /// `DELETE /topology/tidb/{address}`
    DeleteRegistration { address: String },
    Health,
    Metrics,
    MethodNotAllowed,
    NotFound,
}

impl Route {
    /// Match a request method and path; a trailing slash is optional
    pub fn resolve(method: &Method, path: &str) -> Route {
        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };

        if trimmed == TOPOLOGY_PATH {
            return Self::only(method, Method::GET, Route::Topology);
        }
        if let Some(address) = trimmed.strip_prefix(TIDB_REGISTRATION_PREFIX) {
            if address.is_empty() || address.contains('/') {
                return Route::NotFound;
            }
            // Clients commonly send the address as `10.0.0.1%3A4000`
            let address = match percent_decode_str(address).decode_utf8() {
                Ok(address) => address.into_owned(),
                Err(_) => return Route::NotFound,
            };
            return Self::only(method, Method::DELETE, Route::DeleteRegistration { address });
        }

        match trimmed {
            "/healthz" => Self::only(method, Method::GET, Route::Health),
            "/metrics" => Self::only(method, Method::GET, Route::Metrics),
            _ => Route::NotFound,
        }
    }

    /// Label used for metrics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Route::Topology => "topology",
            Route::DeleteRegistration { .. } => "delete_registration",
            Route::Health => "healthz",
            Route::Metrics => "metrics",
            Route::MethodNotAllowed => "method_not_allowed",
            Route::NotFound => "not_found",
        }
    }

    fn only(method: &Method, allowed: Method, route: Route) -> Route {
        if *method == allowed {
            route
        } else {
            Route::MethodNotAllowed
        }
    }
}
