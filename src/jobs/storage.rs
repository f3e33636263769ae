//! # Almacén de Resultados
//! src/jobs/storage.rs
//!
//! Un archivo `<dir>/<job_id>.json` por job. Cada escritura va primero a
//! `<job_id>.json.tmp` y luego se renombra, así un lector nunca ve un
//! resultado a medias.

use crate::error::StoreError;
use crate::jobs::types::{AnalysisResult, ListedJob, ListedStatus};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const RESULT_EXT: &str = "json";

/// Lo que hay en disco para un job
#[derive(Debug, Clone, PartialEq)]
pub enum StoredResult {
    NotFound,
    /// Archivo de tamaño cero
    Empty,
    Parsed(AnalysisResult),
    /// Bytes presentes pero no es un objeto JSON
    Corrupt,
}

/// Almacén de resultados respaldado por un directorio
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Abre el almacén creando el directorio si no existe
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.{RESULT_EXT}"))
    }

    /// Persiste el resultado completo de un job
    pub fn save(&self, job_id: &str, result: &AnalysisResult) -> Result<(), StoreError> {
        self.write_atomic(job_id, result)
    }

    /// Persiste un registro de error `{"error": reason}`
    pub fn save_error(&self, job_id: &str, reason: &str) -> Result<(), StoreError> {
        self.write_atomic(job_id, &json!({ "error": reason }))
    }

    fn write_atomic<T: Serialize + ?Sized>(
        &self,
        job_id: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let final_path = self.path_for(job_id);
        let temp_path = self.dir.join(format!("{job_id}.{RESULT_EXT}.tmp"));

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
        drop(writer);

        // Renombrar (atómico en sistemas Unix)
        fs::rename(&temp_path, &final_path)?;
        Ok(())
    }

    /// Lee y clasifica el archivo de resultado
    pub fn read(&self, job_id: &str) -> Result<StoredResult, StoreError> {
        let bytes = match fs::read(self.path_for(job_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredResult::NotFound),
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(StoredResult::Empty);
        }

        Ok(match serde_json::from_slice::<AnalysisResult>(&bytes) {
            Ok(result) => StoredResult::Parsed(result),
            Err(_) => StoredResult::Corrupt,
        })
    }

    /// Enumera los `*.json` del directorio clasificándolos por tamaño
    ///
    /// No consulta el registro: un archivo vacío creado por fuera cuenta
    /// como `running`.
    pub fn list(&self) -> Result<Vec<ListedJob>, StoreError> {
        let mut jobs = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(RESULT_EXT) {
                continue;
            }
            let Some(job_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let status = if metadata.len() > 0 {
                ListedStatus::Done
            } else {
                ListedStatus::Running
            };
            jobs.push(ListedJob {
                job_id: job_id.to_string(),
                status,
            });
        }

        jobs.sort_by(|a, b| job_order(&a.job_id).cmp(&job_order(&b.job_id)));
        Ok(jobs)
    }
}

/// Orden natural: `job_id_2` antes que `job_id_10`
fn job_order(job_id: &str) -> (Option<u64>, &str) {
    let number = job_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse().ok());
    (number, job_id)
}
