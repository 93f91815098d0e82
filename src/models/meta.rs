//! Page meta entries

use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, ValidationErrors};

/// Title and description for a page, keyed by its path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub id: i64,
    /// Page path, e.g. `docs/overview`
    pub key: String,
    pub title: String,
    pub description: String,
}

impl MetaEntry {
    /// Decode a key taken from a URL path segment, where `$` stands for `/`.
    pub fn decode_key(raw: &str) -> String {
        raw.replace('$', "/")
    }
}

impl FieldSchema for MetaEntry {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("key".into(), self.key.clone().into());
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("description".into(), self.description.clone().into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut entry = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        reader.required_text("key", None, &mut entry.key);
        reader.required_text("title", None, &mut entry.title);
        reader.required_text("description", None, &mut entry.description);
        reader.finish()?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_key() {
        assert_eq!(MetaEntry::decode_key("docs$overview"), "docs/overview");
        assert_eq!(MetaEntry::decode_key("a$b$c"), "a/b/c");
        assert_eq!(MetaEntry::decode_key("home"), "home");
    }
}
