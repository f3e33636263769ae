//! # Logging
//! src/logging.rs
//!
//! Salida doble con `tracing`:
//! - archivo `<log_file>.<fecha>` en modo append, rota a diario y conserva
//!   los últimos `max_files`; timestamps UTC, sin ANSI
//! - stdout para seguir el servidor desde la terminal
//!
//! El nivel se controla con `RUST_LOG` (por defecto `info`).

use std::fs;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard que debe vivir mientras se quiera escribir el log
///
/// Al soltarlo se vacía y cierra el writer del archivo.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Appender diario que agrega al archivo del día y poda los más viejos
fn file_appender(
    log_dir: &str,
    log_file: &str,
    max_files: usize,
) -> io::Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file)
        .max_log_files(max_files)
        .build(log_dir)
        .map_err(io::Error::other)
}

/// Inicializa el subscriber global
///
/// Crea el directorio si no existe. Los logs de sesiones anteriores se
/// conservan.
pub fn init_logging(log_dir: &str, log_file: &str, max_files: usize) -> io::Result<LoggingGuard> {
    let (non_blocking_file, file_guard) =
        tracing_appender::non_blocking(file_appender(log_dir, log_file, max_files)?);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn read_logs(dir: &Path, prefix: &str) -> String {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
            .map(|entry| fs::read_to_string(entry.path()).unwrap())
            .collect()
    }

    #[test]
    fn test_appender_appends_to_existing_log() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().to_str().unwrap();

        let mut first = file_appender(log_dir, "session.log", 5).unwrap();
        first.write_all(b"first session\n").unwrap();
        first.flush().unwrap();
        drop(first);

        let mut second = file_appender(log_dir, "session.log", 5).unwrap();
        second.write_all(b"second session\n").unwrap();
        second.flush().unwrap();

        let contents = read_logs(dir.path(), "session.log");
        assert!(contents.contains("first session"));
        assert!(contents.contains("second session"));
    }

    #[test]
    fn test_init_writes_log_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let log_dir = log_dir.to_str().unwrap();

        let guard = init_logging(log_dir, "webserver.log", 5).unwrap();
        tracing::info!(job_id = "job_id_1", "Job added to the queue");
        drop(guard);

        let contents = read_logs(Path::new(log_dir), "webserver.log");
        assert!(contents.contains("Job added to the queue"));
        assert!(contents.contains("job_id_1"));

        // El subscriber global ya está instalado
        assert!(init_logging(log_dir, "second.log", 5).is_err());
    }
}
