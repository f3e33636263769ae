//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales para el manejo de trabajos asíncronos.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Resultado de un cálculo: objeto JSON con orden de inserción
pub type AnalysisResult = Map<String, Value>;

/// Estado del ciclo de vida de un job en el registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job en cola esperando un worker
    Pending,

    /// Job ejecutándose actualmente
    Running,

    /// Resultado persistido
    Done,

    /// Cálculo o persistencia fallidos
    Failed,
}

/// Tipo de análisis que ejecuta el job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StatesMean,
    StateMean,
    Best5,
    Worst5,
    GlobalMean,
    DiffFromMean,
    StateDiffFromMean,
    MeanByCategory,
    StateMeanByCategory,
}

impl JobKind {
    /// Todos los tipos, en el orden en que se registran las rutas
    pub const ALL: [JobKind; 9] = [
        JobKind::StatesMean,
        JobKind::StateMean,
        JobKind::Best5,
        JobKind::Worst5,
        JobKind::GlobalMean,
        JobKind::DiffFromMean,
        JobKind::StateDiffFromMean,
        JobKind::MeanByCategory,
        JobKind::StateMeanByCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::StatesMean => "states_mean",
            JobKind::StateMean => "state_mean",
            JobKind::Best5 => "best5",
            JobKind::Worst5 => "worst5",
            JobKind::GlobalMean => "global_mean",
            JobKind::DiffFromMean => "diff_from_mean",
            JobKind::StateDiffFromMean => "state_diff_from_mean",
            JobKind::MeanByCategory => "mean_by_category",
            JobKind::StateMeanByCategory => "state_mean_by_category",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Los análisis por estado necesitan el campo `state`
    pub fn needs_state(&self) -> bool {
        matches!(
            self,
            JobKind::StateMean | JobKind::StateDiffFromMean | JobKind::StateMeanByCategory
        )
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parámetros enviados en el body del POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    pub question: String,

    #[serde(default)]
    pub state: Option<String>,
}

impl JobParams {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Unidad de trabajo que viaja por la cola
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: String,
    pub params: JobParams,
}

/// Estado de un job visto por quien hace polling
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Running,
    Done(AnalysisResult),
    Failed(String),
    /// El archivo de resultado existe pero no es JSON válido
    Corrupt,
}

/// Estado de un archivo de resultado según su tamaño
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListedStatus {
    Done,
    Running,
}

/// Entrada de `GET /api/jobs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedJob {
    pub job_id: String,
    pub status: ListedStatus,
}
