//! # Motor de Análisis
//! src/analytics/engine.rs
//!
//! Funciones puras sobre el dataset. Cada tipo de job se resuelve con un
//! `match` exhaustivo sobre `JobKind`.
//!
//! Todas las medias son aritméticas sobre los valores presentes, acumuladas
//! en el orden de las filas. Los grupos se ordenan por clave.

use crate::analytics::dataset::Dataset;
use crate::error::AnalyticsError;
use crate::jobs::types::{AnalysisResult, JobKind};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Preguntas en las que un valor menor es mejor
pub const LOWER_IS_BETTER: [&str; 5] = [
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

/// Frontera entre los workers y los cálculos
pub trait Engine: Send + Sync {
    fn compute(
        &self,
        kind: JobKind,
        question: &str,
        state: Option<&str>,
    ) -> Result<AnalysisResult, AnalyticsError>;
}

/// Acumulador (suma, cantidad) para medias
#[derive(Debug, Clone, Copy, Default)]
struct MeanAcc {
    sum: f64,
    count: usize,
}

impl MeanAcc {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Motor sobre un dataset en memoria
#[derive(Debug, Clone)]
pub struct Analytics {
    dataset: Dataset,
}

impl Analytics {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn values<'a>(&'a self, question: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.dataset
            .rows_for(question)
            .filter_map(|row| row.value.map(|value| (row.location.as_str(), value)))
    }

    /// Media por estado ordenada ascendentemente (orden estable)
    fn ranked_states(&self, question: &str) -> Vec<(String, f64)> {
        let mut groups: BTreeMap<&str, MeanAcc> = BTreeMap::new();
        for (state, value) in self.values(question) {
            groups.entry(state).or_default().push(value);
        }

        let mut means: Vec<(String, f64)> = groups
            .into_iter()
            .filter_map(|(state, acc)| acc.mean().map(|mean| (state.to_string(), mean)))
            .collect();
        means.sort_by(|a, b| a.1.total_cmp(&b.1));
        means
    }

    fn global(&self, question: &str) -> Option<f64> {
        let mut acc = MeanAcc::default();
        self.values(question).for_each(|(_, value)| acc.push(value));
        acc.mean()
    }

    fn state_value(&self, question: &str, state: &str) -> Option<f64> {
        let mut acc = MeanAcc::default();
        self.values(question)
            .filter(|(location, _)| *location == state)
            .for_each(|(_, value)| acc.push(value));
        acc.mean()
    }

    /// Orden de "mejor a peor" según la pregunta
    fn best_first(&self, question: &str) -> Vec<(String, f64)> {
        let mut means = self.ranked_states(question);
        if !LOWER_IS_BETTER.contains(&question) {
            means.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        means
    }

    pub fn states_mean(&self, question: &str) -> AnalysisResult {
        to_result(self.ranked_states(question))
    }

    pub fn state_mean(&self, question: &str, state: &str) -> AnalysisResult {
        match self.state_value(question, state) {
            Some(mean) => to_result([(state.to_string(), mean)]),
            None => empty(question),
        }
    }

    pub fn best5(&self, question: &str) -> AnalysisResult {
        to_result(self.best_first(question).into_iter().take(5))
    }

    pub fn worst5(&self, question: &str) -> AnalysisResult {
        let ordered = self.best_first(question);
        let start = ordered.len().saturating_sub(5);
        to_result(ordered.into_iter().skip(start))
    }

    pub fn global_mean(&self, question: &str) -> AnalysisResult {
        match self.global(question) {
            Some(mean) => to_result([("global_mean".to_string(), mean)]),
            None => empty(question),
        }
    }

    pub fn diff_from_mean(&self, question: &str) -> AnalysisResult {
        let Some(global) = self.global(question) else {
            return empty(question);
        };
        to_result(
            self.ranked_states(question)
                .into_iter()
                .map(|(state, mean)| (state, global - mean)),
        )
    }

    pub fn state_diff_from_mean(&self, question: &str, state: &str) -> AnalysisResult {
        match (self.global(question), self.state_value(question, state)) {
            (Some(global), Some(mean)) => to_result([(state.to_string(), -(mean - global))]),
            _ => empty(question),
        }
    }

    /// Claves `('<estado>', '<categoría>', '<segmento>')`
    pub fn mean_by_category(&self, question: &str) -> AnalysisResult {
        let mut groups: BTreeMap<(&str, &str, &str), MeanAcc> = BTreeMap::new();
        for row in self.dataset.rows_for(question) {
            if let (Some(category), Some(segment), Some(value)) =
                (row.category.as_deref(), row.segment.as_deref(), row.value)
            {
                groups
                    .entry((row.location.as_str(), category, segment))
                    .or_default()
                    .push(value);
            }
        }

        if groups.is_empty() {
            return empty(question);
        }
        to_result(groups.into_iter().filter_map(|((state, category, segment), acc)| {
            acc.mean()
                .map(|mean| (format!("('{state}', '{category}', '{segment}')"), mean))
        }))
    }

    /// `{estado: {"('<categoría>', '<segmento>')": media}}`
    pub fn state_mean_by_category(&self, question: &str, state: &str) -> AnalysisResult {
        let mut groups: BTreeMap<(&str, &str), MeanAcc> = BTreeMap::new();
        for row in self.dataset.rows_for(question).filter(|row| row.location == state) {
            if let (Some(category), Some(segment), Some(value)) =
                (row.category.as_deref(), row.segment.as_deref(), row.value)
            {
                groups.entry((category, segment)).or_default().push(value);
            }
        }

        if groups.is_empty() {
            return empty(question);
        }
        let inner = to_result(groups.into_iter().filter_map(|((category, segment), acc)| {
            acc.mean().map(|mean| {
                (format!("({}, {})", py_repr(category), py_repr(segment)), mean)
            })
        }));

        let mut result = AnalysisResult::new();
        result.insert(state.to_string(), Value::Object(inner));
        result
    }
}

impl Engine for Analytics {
    fn compute(
        &self,
        kind: JobKind,
        question: &str,
        state: Option<&str>,
    ) -> Result<AnalysisResult, AnalyticsError> {
        debug!(%kind, question, state, "computing");

        // Sin estado ninguna fila coincide: resultado vacío
        let scoped = |compute: fn(&Self, &str, &str) -> AnalysisResult| match state {
            Some(state) => compute(self, question, state),
            None => empty(question),
        };

        Ok(match kind {
            JobKind::StatesMean => self.states_mean(question),
            JobKind::StateMean => scoped(Self::state_mean),
            JobKind::Best5 => self.best5(question),
            JobKind::Worst5 => self.worst5(question),
            JobKind::GlobalMean => self.global_mean(question),
            JobKind::DiffFromMean => self.diff_from_mean(question),
            JobKind::StateDiffFromMean => scoped(Self::state_diff_from_mean),
            JobKind::MeanByCategory => self.mean_by_category(question),
            JobKind::StateMeanByCategory => scoped(Self::state_mean_by_category),
        })
    }
}

fn to_result(pairs: impl IntoIterator<Item = (String, f64)>) -> AnalysisResult {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect()
}

fn empty(question: &str) -> AnalysisResult {
    warn!(question, "no data found for question");
    AnalysisResult::new()
}

/// Representación de un string al estilo `repr()` de Python
fn py_repr(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
