//! An axum `Router` as the in-process route resolver.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use renderpdf_traits::{RouteError, RouteResolver};
use std::convert::Infallible;
use tokio::runtime::Handle;
use tower::ServiceExt;

/// Largest response body collected from a route.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Marks responses produced by the fallback, so "no route" can be told
/// apart from a handler that answers 404 itself.
#[derive(Debug, Clone, Copy)]
struct NoRoute;

async fn no_route() -> axum::response::Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    response.extensions_mut().insert(NoRoute);
    response
}

/// Dispatches synthetic requests through an axum [`Router`].
///
/// Dispatch blocks on the given runtime handle, so it must be called from
/// outside the runtime's worker threads, e.g. inside `spawn_blocking`.
/// The router's own fallback is replaced.
#[derive(Clone)]
pub struct AxumRouteResolver {
    router: Router,
    handle: Handle,
}

impl AxumRouteResolver {
    pub fn new(router: Router, handle: Handle) -> Self {
        Self {
            router: router.fallback(no_route),
            handle,
        }
    }

    /// Uses the runtime the caller is currently running on.
    pub fn with_current_runtime(router: Router) -> Self {
        Self::new(router, Handle::current())
    }
}

impl RouteResolver for AxumRouteResolver {
    fn dispatch(&self, request: Request<()>) -> Result<Option<Response<Vec<u8>>>, RouteError> {
        let path = request.uri().path().to_string();
        let request = request.map(|()| Body::empty());
        let router = self.router.clone();

        self.handle.block_on(async move {
            let response = router
                .oneshot(request)
                .await
                .unwrap_or_else(|never: Infallible| match never {});

            if response.extensions().get::<NoRoute>().is_some() {
                log::debug!("No axum route for '{}'", path);
                return Ok(None);
            }

            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
                .await
                .map_err(|e| RouteError::Handler {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            Ok::<_, RouteError>(Some(Response::from_parts(parts, bytes.to_vec())))
        })
    }
}
