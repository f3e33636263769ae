//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que atiende cada conexión en su propio thread. Lee los
//! headers hasta `\r\n\r\n`, luego el body según `Content-Length`, enruta y
//! cierra la conexión (HTTP/1.0).

use crate::config::Config;
use crate::error::ServerError;
use crate::http::request::{content_length, find_head_end};
use crate::http::{Request, Response, StatusCode};
use crate::jobs::{handlers, JobManager};
use crate::router::{add_common_headers, Router};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, info_span, warn};

/// Límite de bytes para la request line más los headers
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Parámetros por conexión
#[derive(Debug, Clone, Copy)]
struct ConnectionLimits {
    max_body_bytes: usize,
    read_timeout: Duration,
}

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    router: Arc<Router>,
    job_manager: Arc<JobManager>,
    listener: TcpListener,
    limits: ConnectionLimits,
}

impl Server {
    /// Hace bind y registra las rutas de la API
    pub fn bind(config: &Config, job_manager: Arc<JobManager>) -> Result<Self, ServerError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .map_err(|source| ServerError::Bind { address, source })?;

        let mut router = Router::new();
        handlers::register_routes(&mut router, Arc::clone(&job_manager));

        Ok(Self {
            router: Arc::new(router),
            job_manager,
            listener,
            limits: ConnectionLimits {
                max_body_bytes: config.max_body_bytes,
                read_timeout: Duration::from_millis(config.read_timeout_ms),
            },
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn job_manager(&self) -> &Arc<JobManager> {
        &self.job_manager
    }

    /// Acepta conexiones para siempre; un thread por conexión
    pub fn run(&self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "server listening (one thread per connection)");
        let counter = AtomicU64::new(0);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let limits = self.limits;
                    let request_id = request_id(counter.fetch_add(1, Ordering::Relaxed));

                    let spawned = thread::Builder::new()
                        .name(format!("conn-{}", &request_id[..8]))
                        .spawn(move || {
                            let served = handle_connection(stream, &router, limits, &request_id);
                            if let Err(e) = served {
                                warn!(%request_id, error = %e, "connection error");
                            }
                        });
                    if let Err(e) = spawned {
                        error!(error = %e, "cannot spawn connection thread");
                    }
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }

        Ok(())
    }
}

/// Id hexadecimal de 16 dígitos por conexión
fn request_id(sequence: u64) -> String {
    let mut hasher = DefaultHasher::new();
    sequence.hash(&mut hasher);
    SystemTime::now().hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    limits: ConnectionLimits,
    request_id: &str,
) -> io::Result<()> {
    let start = Instant::now();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let _span = info_span!("request", %request_id, %peer).entered();

    stream.set_read_timeout(Some(limits.read_timeout))?;

    let buffer = match read_request(&mut stream, limits.max_body_bytes)? {
        ReadOutcome::Closed => {
            debug!("connection closed before any data");
            return Ok(());
        }
        ReadOutcome::TooLarge => {
            let response = Response::error(StatusCode::PayloadTooLarge, "Request too large");
            return send(&mut stream, response, request_id, "-", start);
        }
        ReadOutcome::Complete(buffer) => buffer,
    };

    let (response, path) = match Request::parse(&buffer) {
        Ok(request) => {
            debug!(method = request.method().as_str(), path = request.path(), "request parsed");
            (router.route(&request), request.path().to_string())
        }
        Err(e) => {
            warn!(error = %e, "parse error");
            (Response::error(StatusCode::BadRequest, &format!("Invalid: {e}")), "-".to_string())
        }
    };

    send(&mut stream, response, request_id, &path, start)
}

fn send(
    stream: &mut TcpStream,
    mut response: Response,
    request_id: &str,
    path: &str,
    start: Instant,
) -> io::Result<()> {
    add_common_headers(&mut response);
    response.add_header("X-Request-Id", request_id);

    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    if response.status().is_server_error() {
        warn!(path, status = response.status().as_u16(), latency_ms, "request served");
    } else {
        info!(path, status = response.status().as_u16(), latency_ms, "request served");
    }
    Ok(())
}

enum ReadOutcome {
    Closed,
    TooLarge,
    Complete(Vec<u8>),
}

/// Lee headers y después el body según `Content-Length`
///
/// Si el cliente cierra antes de completar el body se entrega lo recibido.
fn read_request(stream: &mut impl Read, max_body_bytes: usize) -> io::Result<ReadOutcome> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(end) = find_head_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Ok(ReadOutcome::TooLarge);
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(if buffer.is_empty() {
                ReadOutcome::Closed
            } else {
                ReadOutcome::Complete(buffer)
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let body_len = content_length(&buffer[..head_end]).unwrap_or(0);
    if body_len > max_body_bytes {
        return Ok(ReadOutcome::TooLarge);
    }

    let total = head_end + 4 + body_len;
    while buffer.len() < total {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    buffer.truncate(total.min(buffer.len()));

    Ok(ReadOutcome::Complete(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use serde_json::json;
    use std::io::Cursor;
    use std::net::Shutdown;

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").expect("bind")
    }

    fn limits() -> ConnectionLimits {
        ConnectionLimits {
            max_body_bytes: 64,
            read_timeout: Duration::from_secs(5),
        }
    }

    fn echo_router() -> Router {
        let mut router = Router::new();
        router.register(Method::POST, "/echo", |req, _| {
            Response::json(&json!({"body": String::from_utf8_lossy(req.body())}))
        });
        router
    }

    /// Atiende una conexión con `handle_connection` y retorna la respuesta cruda
    fn roundtrip(payload: &[u8], close_write: bool) -> String {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &echo_router(), limits(), "0123456789abcdef").unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(payload).unwrap();
        if close_write {
            client.shutdown(Shutdown::Write).unwrap();
        }

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        server.join().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    // ==================== Reading ====================

    #[test]
    fn test_read_request_waits_for_body() {
        let mut input =
            Cursor::new(b"POST /x HTTP/1.0\r\nContent-Length: 5\r\n\r\nhelloEXTRA".to_vec());
        let ReadOutcome::Complete(buffer) = read_request(&mut input, 64).unwrap() else {
            panic!("expected complete request");
        };
        assert!(buffer.ends_with(b"\r\n\r\nhello"));
    }

    #[test]
    fn test_read_request_rejects_large_body() {
        let mut input = Cursor::new(b"POST /x HTTP/1.0\r\nContent-Length: 999\r\n\r\n".to_vec());
        assert!(matches!(read_request(&mut input, 64).unwrap(), ReadOutcome::TooLarge));
    }

    #[test]
    fn test_read_request_closed_without_data() {
        let mut input = Cursor::new(Vec::new());
        assert!(matches!(read_request(&mut input, 64).unwrap(), ReadOutcome::Closed));
    }

    // ==================== Connections ====================

    #[test]
    fn test_post_body_without_closing_write_half() {
        let text = roundtrip(b"POST /echo HTTP/1.0\r\nContent-Length: 7\r\n\r\n{\"a\":1}", false);

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("X-Request-Id: 0123456789abcdef"));
        assert!(text.contains("Connection: close"));
        assert!(text.ends_with(r#"{"body":"{\"a\":1}"}"#));
    }

    #[test]
    fn test_parse_error_returns_400() {
        let text = roundtrip(b"\x00\x01\x02\x03garbage", true);

        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Invalid:"));
    }

    #[test]
    fn test_payload_too_large_returns_413() {
        let text = roundtrip(b"POST /echo HTTP/1.0\r\nContent-Length: 100000\r\n\r\n", true);
        assert!(text.contains("413 Payload Too Large"));
    }

    #[test]
    fn test_peer_closed_immediately() {
        let text = roundtrip(b"", true);
        assert!(text.is_empty());
    }

    #[test]
    fn test_request_id_format() {
        let id = request_id(7);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
