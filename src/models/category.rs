//! Category model

use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, ValidationErrors, MAX_LENGTH};

/// Article category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

impl Category {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
        }
    }
}

impl FieldSchema for Category {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("title".into(), self.title.clone().into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut category = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        reader.required_text("title", Some(MAX_LENGTH), &mut category.title);
        reader.finish()?;
        Ok(category)
    }
}
