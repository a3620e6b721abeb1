//! A small in-process route table.
//!
//! Patterns are matched segment by segment. A segment written as `{name}`
//! captures whatever is in that position (percent-decoded):
//!
//! ```ignore
//! let routes = RouteTable::new()
//!     .route("/charts/{id}", |_req, params| {
//!         Ok(Response::new(draw_chart(&params["id"]).into_bytes()))
//!     });
//! ```

use http::{Request, Response};
use log::debug;
use renderpdf_traits::{RouteError, RouteResolver};
use std::collections::HashMap;
use std::fmt;

pub type Params = HashMap<String, String>;

type Handler =
    Box<dyn Fn(&Request<()>, &Params) -> Result<Response<Vec<u8>>, RouteError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    pattern: String,
    segments: Vec<Segment>,
    handler: Handler,
}

impl Route {
    fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    let value = percent_encoding::percent_decode_str(part).decode_utf8_lossy();
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

/// Routes checked in registration order; the first match handles the request.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| &r.pattern))
            .finish()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&Request<()>, &Params) -> Result<Response<Vec<u8>>, RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.add(pattern, handler);
        self
    }

    pub fn add<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request<()>, &Params) -> Result<Response<Vec<u8>>, RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            segments: parse_pattern(pattern),
            handler: Box::new(handler),
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteResolver for RouteTable {
    fn dispatch(&self, request: Request<()>) -> Result<Option<Response<Vec<u8>>>, RouteError> {
        let path = request.uri().path();
        for route in &self.routes {
            if let Some(params) = route.matches(path) {
                debug!("'{}' matched route '{}'", path, route.pattern);
                return (route.handler)(&request, &params).map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use renderpdf_traits::synthetic_request;

    fn body(text: &str) -> Result<Response<Vec<u8>>, RouteError> {
        Ok(Response::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_literal_and_param_routes() {
        let routes = RouteTable::new()
            .route("/", |_, _| body("root"))
            .route("/reports/{id}/summary", |_, p| body(&format!("summary {}", p["id"])));

        let hit = routes
            .dispatch(synthetic_request("/reports/a%20b/summary").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(hit.body(), b"summary a b");

        let root = routes.dispatch(synthetic_request("/").unwrap()).unwrap().unwrap();
        assert_eq!(root.body(), b"root");
    }

    #[test]
    fn test_no_match_is_none() {
        let routes = RouteTable::new().route("/a/{x}", |_, _| body("a"));
        assert!(routes.dispatch(synthetic_request("/a").unwrap()).unwrap().is_none());
        assert!(routes.dispatch(synthetic_request("/a/b/c").unwrap()).unwrap().is_none());
        assert!(RouteTable::new().dispatch(synthetic_request("/").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_first_registered_route_wins() {
        let routes = RouteTable::new()
            .route("/items/new", |_, _| body("literal"))
            .route("/items/{id}", |_, _| body("param"));
        let response = routes.dispatch(synthetic_request("/items/new").unwrap()).unwrap().unwrap();
        assert_eq!(response.body(), b"literal");
    }

    #[test]
    fn test_handler_sees_query_and_status_is_kept() {
        let routes = RouteTable::new().route("/search", |req, _| {
            let mut response = Response::new(req.uri().query().unwrap_or("").as_bytes().to_vec());
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        });
        let response = routes
            .dispatch(synthetic_request("/search?q=pdf").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), b"q=pdf");
    }

    #[test]
    fn test_handler_errors_propagate() {
        let routes = RouteTable::new().route("/boom", |req, _| {
            Err(RouteError::Handler {
                path: req.uri().path().to_string(),
                message: "exploded".into(),
            })
        });
        let err = routes.dispatch(synthetic_request("/boom").unwrap()).unwrap_err();
        assert!(matches!(err, RouteError::Handler { ref path, .. } if path == "/boom"));
    }
}
