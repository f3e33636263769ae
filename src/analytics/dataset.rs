//! # Dataset
//! src/analytics/dataset.rs
//!
//! Carga única del CSV de nutrición/actividad/obesidad. Solo se leen las
//! columnas que usan los análisis; el resto se ignora.

use crate::error::DatasetError;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fila del dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    #[serde(rename = "Question")]
    pub question: String,

    /// Nombre del estado
    #[serde(rename = "LocationDesc")]
    pub location: String,

    /// Vacío o no numérico cuenta como ausente
    #[serde(rename = "Data_Value", deserialize_with = "csv::invalid_option")]
    pub value: Option<f64>,

    #[serde(rename = "StratificationCategory1", default)]
    pub category: Option<String>,

    #[serde(rename = "Stratification1", default)]
    pub segment: Option<String>,
}

impl Record {
    pub fn new(question: &str, location: &str, value: Option<f64>) -> Self {
        Self {
            question: question.to_string(),
            location: location.to_string(),
            value,
            category: None,
            segment: None,
        }
    }

    pub fn with_stratification(mut self, category: &str, segment: &str) -> Self {
        self.category = Some(category.to_string());
        self.segment = Some(segment.to_string());
        self
    }
}

/// Dataset inmutable compartido por todos los workers
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_reader(reader);
        let records = reader
            .deserialize()
            .collect::<Result<Vec<Record>, _>>()?;
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Filas de una pregunta que tienen valor
    pub fn rows_for<'a>(&'a self, question: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |record| record.question == question && record.value.is_some())
    }
}
