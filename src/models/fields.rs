//! Field maps and schema validation
//!
//! Every writable entity exposes its state as a flat JSON field map and can be
//! rebuilt from one. Request payloads (JSON, urlencoded or multipart) are
//! normalized into the same shape, so the update merger never needs to know
//! which transport a field arrived on.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat map of field name to value.
///
/// As a request payload this is a sparse field-set: only keys the client
/// actually sent are present.
pub type FieldMap = serde_json::Map<String, Value>;

/// Maximum length for bounded text columns.
pub const MAX_LENGTH: usize = 255;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge another set of errors into this one.
    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no errors were recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A foreign key an entity holds, checked for existence before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Payload field the id came from
    pub field: &'static str,
    /// Table the id must exist in
    pub table: &'static str,
    pub id: i64,
}

impl Reference {
    pub fn new(field: &'static str, table: &'static str, id: i64) -> Self {
        Self { field, table, id }
    }
}

/// Schema of a writable entity.
pub trait FieldSchema: Sized + Clone {
    /// Field holding an uploaded file reference, if the entity has one.
    const FILE_FIELD: Option<&'static str> = None;

    /// Full snapshot of the writable fields.
    fn to_fields(&self) -> FieldMap;

    /// Build an entity from a field map.
    ///
    /// With `current` set, fields missing from the map keep the current
    /// value. Without it (creation), missing required fields are errors.
    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors>;

    /// Foreign keys that must point at existing rows.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// Reads typed values out of a field map, collecting errors per field.
pub struct FieldReader<'a> {
    fields: &'a FieldMap,
    creating: bool,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a FieldMap, creating: bool) -> Self {
        Self {
            fields,
            creating,
            errors: ValidationErrors::new(),
        }
    }

    /// Record a custom error.
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Finish reading, returning the collected errors if any.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }

    /// Look up a field. Returns `None` when it should be left untouched.
    fn lookup(&mut self, name: &str, required: bool) -> Option<&'a Value> {
        let fields: &'a FieldMap = self.fields;
        match fields.get(name) {
            Some(value) => Some(value),
            None => {
                if required && self.creating {
                    self.errors.add(name, REQUIRED);
                }
                None
            }
        }
    }

    /// Textual form of a scalar, `None` for null.
    fn scalar(&mut self, name: &str, value: &Value) -> Result<Option<String>, ()> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Array(items) if items.len() == 1 => self.scalar(name, &items[0]),
            _ => {
                self.errors.add(name, "Expected a single value.");
                Err(())
            }
        }
    }

    fn check_length(&mut self, name: &str, text: &str, max_len: Option<usize>) -> bool {
        match max_len {
            Some(max) if text.chars().count() > max => {
                self.errors.add(
                    name,
                    format!("Ensure this field has no more than {} characters.", max),
                );
                false
            }
            _ => true,
        }
    }

    /// Required, non-blank text.
    pub fn required_text(&mut self, name: &str, max_len: Option<usize>, target: &mut String) {
        let Some(value) = self.lookup(name, true) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) if text.trim().is_empty() => self.errors.add(name, NOT_BLANK),
            Ok(Some(text)) => {
                if self.check_length(name, &text, max_len) {
                    *target = text;
                }
            }
            Ok(None) => self.errors.add(name, NOT_NULL),
            Err(()) => {}
        }
    }

    /// Optional text. Null and empty strings clear the value.
    pub fn optional_text(&mut self, name: &str, max_len: Option<usize>, target: &mut Option<String>) {
        let Some(value) = self.lookup(name, false) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) if text.is_empty() => *target = None,
            Ok(Some(text)) => {
                if self.check_length(name, &text, max_len) {
                    *target = Some(text);
                }
            }
            Ok(None) => *target = None,
            Err(()) => {}
        }
    }

    /// Text that may be blank; null is stored as an empty string.
    pub fn blank_text(&mut self, name: &str, max_len: Option<usize>, target: &mut String) {
        let Some(value) = self.lookup(name, false) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) => {
                if self.check_length(name, &text, max_len) {
                    *target = text;
                }
            }
            Ok(None) => target.clear(),
            Err(()) => {}
        }
    }

    /// Required email address.
    pub fn email(&mut self, name: &str, target: &mut String) {
        let before = target.clone();
        self.required_text(name, Some(MAX_LENGTH), target);
        if *target != before && !is_valid_email(target) {
            self.errors.add(name, "Enter a valid email address.");
            *target = before;
        }
    }

    /// Optional value from a closed set.
    pub fn choice<E>(&mut self, name: &str, target: &mut Option<E>)
    where
        E: FromStr,
    {
        let Some(value) = self.lookup(name, false) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) if text.is_empty() => *target = None,
            Ok(Some(text)) => match text.parse::<E>() {
                Ok(parsed) => *target = Some(parsed),
                Err(_) => self
                    .errors
                    .add(name, format!("\"{}\" is not a valid choice.", text)),
            },
            Ok(None) => *target = None,
            Err(()) => {}
        }
    }

    /// Boolean flag.
    pub fn flag(&mut self, name: &str, target: &mut bool) {
        let Some(value) = self.lookup(name, false) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) => match parse_bool(&text) {
                Some(b) => *target = b,
                None => self.errors.add(name, "Must be a valid boolean."),
            },
            Ok(None) => self.errors.add(name, NOT_NULL),
            Err(()) => {}
        }
    }

    /// Required date in `YYYY-MM-DD` or `dd-mm-yy` form.
    pub fn date(&mut self, name: &str, target: &mut NaiveDate) {
        let Some(value) = self.lookup(name, true) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) => match parse_date(&text) {
                Some(date) => *target = date,
                None => self.errors.add(
                    name,
                    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD, DD-MM-YY.",
                ),
            },
            Ok(None) => self.errors.add(name, NOT_NULL),
            Err(()) => {}
        }
    }

    /// Required foreign key.
    pub fn reference(&mut self, name: &str, target: &mut i64) {
        let Some(value) = self.lookup(name, true) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) => match parse_id(&text) {
                Some(id) => *target = id,
                None => self.errors.add(name, incorrect_type(&text)),
            },
            Ok(None) => self.errors.add(name, NOT_NULL),
            Err(()) => {}
        }
    }

    /// Nullable foreign key. Empty strings clear it.
    pub fn optional_reference(&mut self, name: &str, target: &mut Option<i64>) {
        let Some(value) = self.lookup(name, false) else { return };
        match self.scalar(name, value) {
            Ok(Some(text)) if text.is_empty() => *target = None,
            Ok(Some(text)) => match parse_id(&text) {
                Some(id) => *target = Some(id),
                None => self.errors.add(name, incorrect_type(&text)),
            },
            Ok(None) => *target = None,
            Err(()) => {}
        }
    }

    /// List of foreign keys (many-to-many). A single scalar is a one-item list.
    pub fn reference_list(&mut self, name: &str, target: &mut Vec<i64>) {
        let Some(value) = self.lookup(name, false) else { return };
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let text = match item {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => {
                    self.errors.add(name, "Expected a list of items.");
                    return;
                }
            };
            if text.is_empty() {
                continue;
            }
            match parse_id(&text) {
                Some(id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {}
                None => {
                    self.errors.add(name, incorrect_type(&text));
                    return;
                }
            }
        }
        *target = ids;
    }
}

fn incorrect_type(text: &str) -> String {
    format!("Incorrect type. Expected pk value, received \"{}\".", text)
}

fn parse_id(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD` or `dd-mm-yy`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    match text.len() {
        10 => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
        8 => NaiveDate::parse_from_str(text, "%d-%m-%y").ok(),
        _ => None,
    }
}

/// Basic email shape check: a local part, `@`, and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
