//! Article model
//!
//! Articles are served under `/posts`. Each carries a bilingual title, an
//! optional cover image and any number of categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, Reference, ValidationErrors, MAX_LENGTH};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// English title, used for lookups by title
    pub title_en: String,
    /// Rich text body
    pub text: Option<String>,
    /// Author name
    pub author: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Category IDs
    #[serde(default)]
    pub categories: Vec<i64>,
    /// Reference path of the cover image
    pub image: Option<String>,
}

impl Default for Article {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: String::new(),
            title_en: String::new(),
            text: None,
            author: String::new(),
            created_at: now,
            updated_at: now,
            categories: Vec::new(),
            image: None,
        }
    }
}

impl FieldSchema for Article {
    const FILE_FIELD: Option<&'static str> = Some("image");

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("title_en".into(), self.title_en.clone().into());
        fields.insert("text".into(), self.text.clone().into());
        fields.insert("author".into(), self.author.clone().into());
        fields.insert("categories".into(), self.categories.clone().into());
        fields.insert("image".into(), self.image.clone().into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut article = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        reader.required_text("title", Some(MAX_LENGTH), &mut article.title);
        reader.required_text("title_en", Some(MAX_LENGTH), &mut article.title_en);
        reader.optional_text("text", None, &mut article.text);
        reader.required_text("author", Some(MAX_LENGTH), &mut article.author);
        reader.reference_list("categories", &mut article.categories);
        reader.optional_text("image", None, &mut article.image);
        reader.finish()?;
        Ok(article)
    }

    fn references(&self) -> Vec<Reference> {
        self.categories
            .iter()
            .map(|id| Reference::new("categories", "categories", *id))
            .collect()
    }
}

/// Article list filter. The first present field wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    pub article_id: Option<i64>,
    /// Articles in any of these categories
    pub category_ids: Vec<i64>,
    /// Exact match on `title_en`
    pub title: Option<String>,
}
