//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Endpoints de la API:
//! - `POST /api/<kind>` (uno por tipo de análisis)
//! - `GET /api/get_results/{job_id}`
//! - `GET /api/jobs`
//! - `GET /api/num_jobs`
//! - `GET /api/graceful_shutdown`
//! - `GET /` y `GET /index`

use crate::error::StatusError;
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::manager::JobManager;
use crate::jobs::types::{JobKind, JobParams, JobState};
use crate::router::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Registra todas las rutas de la API sobre `router`
pub fn register_routes(router: &mut Router, manager: Arc<JobManager>) {
    for kind in JobKind::ALL {
        let manager = Arc::clone(&manager);
        router.register(Method::POST, &format!("/api/{}", kind.as_str()), move |req, _| {
            submit_handler(req, &manager, kind)
        });
    }

    let m = Arc::clone(&manager);
    router.register(Method::GET, "/api/get_results/{job_id}", move |_, params| {
        let job_id = params.get("job_id").map(String::as_str).unwrap_or_default();
        results_handler(&m, job_id)
    });

    let m = Arc::clone(&manager);
    router.register(Method::GET, "/api/jobs", move |_, _| jobs_handler(&m));

    let m = Arc::clone(&manager);
    router.register(Method::GET, "/api/num_jobs", move |_, _| num_jobs_handler(&m));

    let m = Arc::clone(&manager);
    router.register(Method::GET, "/api/graceful_shutdown", move |_, _| shutdown_handler(&m));

    let mut listing = router.describe();
    listing.push("GET /".to_string());
    listing.push("GET /index".to_string());
    let page = Arc::new(index_page(&listing));
    for path in ["/", "/index"] {
        let page = Arc::clone(&page);
        router.register(Method::GET, path, move |_, _| Response::html(&page));
    }
}

/// Handler para `POST /api/<kind>` con body `{"question": ..., "state"?: ...}`
///
/// # Ejemplo de response
/// ```json
/// {"job_id": "job_id_1"}
/// ```
pub fn submit_handler(req: &Request, manager: &JobManager, kind: JobKind) -> Response {
    let params: JobParams = match serde_json::from_slice(req.body()) {
        Ok(params) => params,
        Err(e) => {
            warn!(%kind, error = %e, "invalid request body");
            return Response::error(StatusCode::BadRequest, &format!("Invalid JSON body: {e}"));
        }
    };

    let job_id = manager.submit(kind, params);
    Response::json(&json!({ "job_id": job_id }))
}

/// Handler para `GET /api/get_results/{job_id}`
pub fn results_handler(manager: &JobManager, job_id: &str) -> Response {
    info!(%job_id, "results requested");

    match manager.status(job_id) {
        Ok(JobState::Running) => Response::json(&json!({ "status": "running" })),
        Ok(JobState::Done(data)) => {
            Response::json(&json!({ "status": "done", "data": Value::Object(data) }))
        }
        Ok(JobState::Corrupt) => {
            Response::error(StatusCode::InternalServerError, "Invalid or corrupt result file")
        }
        Ok(JobState::Failed(reason)) => Response::error(StatusCode::InternalServerError, &reason),
        Err(StatusError::UnknownJob) => {
            warn!(%job_id, "Invalid job_id");
            Response::error(StatusCode::NotFound, "Invalid job_id")
        }
        Err(StatusError::Store(e)) => {
            error!(%job_id, error = %e, "cannot read result");
            Response::error(StatusCode::InternalServerError, "Unexpected error occurred")
        }
    }
}

/// Handler para `GET /api/jobs`
pub fn jobs_handler(manager: &JobManager) -> Response {
    match manager.list_jobs() {
        Ok(jobs) => Response::json(&json!({ "status": "success", "data": jobs })),
        Err(e) => {
            error!(error = %e, "cannot list jobs");
            Response::error(StatusCode::InternalServerError, "Unable to list jobs at this time")
        }
    }
}

/// Handler para `GET /api/num_jobs`
pub fn num_jobs_handler(manager: &JobManager) -> Response {
    Response::json(&json!({ "num_jobs": manager.queue_depth() }))
}

/// Handler para `GET /api/graceful_shutdown`
///
/// Bloquea este thread hasta que todos los workers terminan.
pub fn shutdown_handler(manager: &JobManager) -> Response {
    info!("graceful shutdown requested");
    manager.shutdown();
    Response::json(&json!({ "message": "Shutting down..." }))
}

fn index_page(routes: &[String]) -> String {
    let items: String = routes
        .iter()
        .map(|route| format!("<p>{route}</p>"))
        .collect();
    format!("<h1>Stats Server</h1><h2>Defined routes:</h2>{items}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{Analytics, Dataset, Record};
    use crate::jobs::manager::JobManagerConfig;
    use std::fs;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const Q: &str = "Percent of adults aged 18 years and older who have obesity";

    fn setup() -> (TempDir, Arc<JobManager>, Router) {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::from_records(vec![
            Record::new(Q, "Utah", Some(30.0)),
            Record::new(Q, "Utah", Some(40.0)),
            Record::new(Q, "Ohio", Some(20.0)),
        ]);
        let config = JobManagerConfig {
            workers: 2,
            idle_timeout: Duration::from_millis(100),
            results_dir: dir.path().join("results"),
        };
        let engine = Arc::new(Analytics::new(dataset));
        let manager = Arc::new(JobManager::start(&config, engine).unwrap());
        let mut router = Router::new();
        register_routes(&mut router, Arc::clone(&manager));
        (dir, manager, router)
    }

    fn send(router: &Router, raw: &str) -> (StatusCode, Value) {
        let response = router.route(&Request::parse(raw.as_bytes()).unwrap());
        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
        (response.status(), body)
    }

    fn post(router: &Router, path: &str, body: &str) -> (StatusCode, Value) {
        send(
            router,
            &format!("POST {path} HTTP/1.0\r\nContent-Length: {}\r\n\r\n{body}", body.len()),
        )
    }

    fn get_results(router: &Router, job_id: &str) -> (StatusCode, Value) {
        send(router, &format!("GET /api/get_results/{job_id} HTTP/1.0\r\n\r\n"))
    }

    fn poll(router: &Router, job_id: &str) -> Value {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let (_, body) = get_results(router, job_id);
            if body["status"] != "running" || Instant::now() > deadline {
                return body;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    // ==================== Submit ====================

    #[test]
    fn test_submit_and_poll_state_mean() {
        let (_dir, manager, router) = setup();

        let body = json!({"question": Q, "state": "Utah"}).to_string();
        let (status, body) = post(&router, "/api/state_mean", &body);
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({"job_id": "job_id_1"}));

        assert_eq!(poll(&router, "job_id_1"), json!({"status": "done", "data": {"Utah": 35.0}}));
        manager.shutdown();
    }

    #[test]
    fn test_submit_invalid_body() {
        let (_dir, manager, router) = setup();

        let (status, body) = post(&router, "/api/best5", "not json");
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["status"], "error");

        let (status, _) = post(&router, "/api/best5", r#"{"state": "Utah"}"#);
        assert_eq!(status, StatusCode::BadRequest);
        manager.shutdown();
    }

    #[test]
    fn test_unknown_kind_is_unknown_route() {
        let (_dir, manager, router) = setup();

        let (status, _) = post(&router, "/api/median", r#"{"question": "Q"}"#);
        assert_eq!(status, StatusCode::NotFound);
        manager.shutdown();
    }

    #[test]
    fn test_state_scoped_kinds_without_state_are_empty() {
        let (_dir, manager, router) = setup();

        for kind in ["state_mean", "state_diff_from_mean", "state_mean_by_category"] {
            let body = json!({"question": Q}).to_string();
            let (status, body) = post(&router, &format!("/api/{kind}"), &body);
            assert_eq!(status, StatusCode::Ok);
            let job_id = body["job_id"].as_str().unwrap().to_string();

            assert_eq!(poll(&router, &job_id), json!({"status": "done", "data": {}}));
        }
        manager.shutdown();
    }

    // ==================== Results ====================

    #[test]
    fn test_results_unknown_job() {
        let (_dir, manager, router) = setup();

        let (status, body) = send(&router, "GET /api/get_results/job_id_unknown HTTP/1.0\r\n\r\n");
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body, json!({"status": "error", "reason": "Invalid job_id"}));
        manager.shutdown();
    }

    #[test]
    fn test_results_corrupt_file() {
        let (_dir, manager, router) = setup();

        let (_, body) = post(&router, "/api/global_mean", &json!({"question": Q}).to_string());
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(poll(&router, &job_id)["status"], "done");

        fs::write(manager.store().path_for(&job_id), "garbage").unwrap();
        let (status, body) = get_results(&router, &job_id);
        assert_eq!(status, StatusCode::InternalServerError);
        assert_eq!(body, json!({"status": "error", "reason": "Invalid or corrupt result file"}));
        manager.shutdown();
    }

    // ==================== Listing & counters ====================

    #[test]
    fn test_jobs_and_num_jobs() {
        let (_dir, manager, router) = setup();

        fs::write(manager.store().path_for("job_id_500"), "").unwrap();
        let (status, body) = send(&router, "GET /api/jobs HTTP/1.0\r\n\r\n");
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(
            body,
            json!({"status": "success", "data": [{"job_id": "job_id_500", "status": "running"}]})
        );

        let (status, body) = send(&router, "GET /api/num_jobs HTTP/1.0\r\n\r\n");
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({"num_jobs": 0}));
        manager.shutdown();
    }

    // ==================== Shutdown & index ====================

    #[test]
    fn test_graceful_shutdown_then_submit() {
        let (_dir, manager, router) = setup();

        let (status, body) = send(&router, "GET /api/graceful_shutdown HTTP/1.0\r\n\r\n");
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({"message": "Shutting down..."}));

        let (status, body) = post(&router, "/api/global_mean", &json!({"question": Q}).to_string());
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({"job_id": "job_id_1"}));
        assert_eq!(manager.queue_depth(), 0);

        let (status, body) = send(&router, "GET /api/get_results/job_id_1 HTTP/1.0\r\n\r\n");
        assert_eq!(status, StatusCode::InternalServerError);
        assert_eq!(
            body,
            json!({"status": "error", "reason": "Shutdown in progress. Not accepting new jobs."})
        );
    }

    #[test]
    fn test_index_lists_routes() {
        let (_dir, manager, router) = setup();

        for path in ["/", "/index"] {
            let raw = format!("GET {path} HTTP/1.0\r\n\r\n");
            let response = router.route(&Request::parse(raw.as_bytes()).unwrap());
            let html = String::from_utf8(response.body().to_vec()).unwrap();
            assert!(html.contains("POST /api/state_mean_by_category"));
            assert!(html.contains("GET /api/get_results/{job_id}"));
            assert!(html.contains("<p>GET /index</p>"));
        }
        manager.shutdown();
    }
}
