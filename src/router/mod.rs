//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Un patrón puede terminar en un segmento `{nombre}` que captura el último
//! segmento del path, por ejemplo `/api/get_results/{job_id}`. Si ningún
//! patrón coincide se retorna 404; si coincide el path pero no el método, 405.

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Parámetros capturados del path
pub type PathParams = HashMap<String, String>;

/// Un handler recibe el Request y los parámetros del path
pub type Handler = Box<dyn Fn(&Request, &PathParams) -> Response + Send + Sync>;

struct Route {
    method: Method,
    pattern: String,
    handler: Handler,
}

/// Router que mapea rutas a handlers
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use stats_server::router::Router;
    /// use stats_server::http::{Method, Request, Response};
    /// use serde_json::json;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/api/num_jobs", |_req, _params| {
    ///     Response::json(&json!({"num_jobs": 0}))
    /// });
    /// ```
    pub fn register<F>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&Request, &PathParams) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            handler: Box::new(handler),
        });
    }

    /// `"GET /api/jobs"` por cada ruta, en orden de registro
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| format!("{} {}", route.method.as_str(), route.pattern))
            .collect()
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = match_pattern(&route.pattern, path) else {
                continue;
            };
            if route.method != request.method() {
                path_matched = true;
                continue;
            }

            let mut response = (route.handler)(request, &params);
            add_common_headers(&mut response);
            return response;
        }

        let mut response = if path_matched {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed for {}", request.method().as_str(), path),
            )
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };
        add_common_headers(&mut response);
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Headers comunes a todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", "StatsServer-HTTP/1.0");
    response.add_header("Connection", "close");
}

/// Compara segmento a segmento; `{nombre}` captura un segmento no vacío
fn match_pattern(pattern: &str, path: &str) -> Option<PathParams> {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    let mut params = PathParams::new();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    if actual.is_empty() {
                        return None;
                    }
                    params.insert(name.to_string(), actual.to_string());
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}
