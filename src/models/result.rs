//! Assessment result model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, ValidationErrors, MAX_LENGTH};

/// Scored categories of a career assessment, in field order.
pub const RESULT_CATEGORIES: [&str; 6] = [
    "frontend",
    "backend",
    "ux_ui",
    "data_science",
    "mobile_development",
    "machine_learning",
];

/// Outcome of a career assessment test, owned by at most one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: i64,
    /// Date the test was taken
    pub date: NaiveDate,
    pub frontend: String,
    pub backend: String,
    pub ux_ui: String,
    pub data_science: String,
    pub mobile_development: String,
    pub machine_learning: String,
}

impl AssessmentResult {
    fn categories_mut(&mut self) -> [&mut String; 6] {
        [
            &mut self.frontend,
            &mut self.backend,
            &mut self.ux_ui,
            &mut self.data_science,
            &mut self.mobile_development,
            &mut self.machine_learning,
        ]
    }

    fn categories(&self) -> [&String; 6] {
        [
            &self.frontend,
            &self.backend,
            &self.ux_ui,
            &self.data_science,
            &self.mobile_development,
            &self.machine_learning,
        ]
    }
}

impl FieldSchema for AssessmentResult {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("date".into(), self.date.format("%Y-%m-%d").to_string().into());
        for (name, value) in RESULT_CATEGORIES.iter().zip(self.categories()) {
            fields.insert((*name).into(), value.clone().into());
        }
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut result = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        reader.date("date", &mut result.date);
        for (name, target) in RESULT_CATEGORIES.iter().zip(result.categories_mut()) {
            reader.required_text(name, Some(MAX_LENGTH), target);
        }
        reader.finish()?;
        Ok(result)
    }
}
