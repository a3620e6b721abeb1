//! In-process route dispatch.
//!
//! A site-relative URL that is not a static asset may still be served by
//! the application itself. A [`RouteResolver`] finds the handler for a path
//! and invokes it with a synthetic request, without any network round-trip.

use http::{Request, Response};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RouteError {
    #[error("Invalid request URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Handler for '{path}' failed: {message}")]
    Handler { path: String, message: String },
}

/// Resolves a path against the application's routes and invokes the handler.
pub trait RouteResolver: Send + Sync {
    /// Dispatches `request` to the matching handler.
    ///
    /// Returns `Ok(None)` when no route matches the request path; a matched
    /// handler's response is returned as-is, whatever its status.
    fn dispatch(&self, request: Request<()>) -> Result<Option<Response<Vec<u8>>>, RouteError>;
}

/// Builds the minimal synthetic `GET` request used for in-process dispatch.
pub fn synthetic_request(uri: &str) -> Result<Request<()>, RouteError> {
    Request::get(uri)
        .body(())
        .map_err(|e| RouteError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        })
}
