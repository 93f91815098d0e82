//! Contact messages and mentor appointments

use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, Reference, ValidationErrors, MAX_LENGTH};

/// A message a user left through the contact form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    /// Sending user
    pub user: i64,
    pub mail: String,
    pub telegram: Option<String>,
    pub message: String,
}

impl ContactMessage {
    fn write_fields(&self, fields: &mut FieldMap) {
        fields.insert("user".into(), self.user.into());
        fields.insert("mail".into(), self.mail.clone().into());
        fields.insert("telegram".into(), self.telegram.clone().into());
        fields.insert("message".into(), self.message.clone().into());
    }

    fn read_fields(&mut self, reader: &mut FieldReader<'_>) {
        reader.reference("user", &mut self.user);
        reader.required_text("mail", Some(MAX_LENGTH), &mut self.mail);
        reader.optional_text("telegram", Some(MAX_LENGTH), &mut self.telegram);
        reader.required_text("message", None, &mut self.message);
    }
}

impl FieldSchema for ContactMessage {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        self.write_fields(&mut fields);
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut contact = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        contact.read_fields(&mut reader);
        reader.finish()?;
        Ok(contact)
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("user", "users", self.user)]
    }
}

/// A user's request to meet a mentor.
///
/// Extends a [`ContactMessage`]; both share the same id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentorAppointment {
    #[serde(flatten)]
    pub contact: ContactMessage,
    pub mentor: i64,
    pub description: String,
}

impl MentorAppointment {
    pub fn id(&self) -> i64 {
        self.contact.id
    }
}

impl FieldSchema for MentorAppointment {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        self.contact.write_fields(&mut fields);
        fields.insert("mentor".into(), self.mentor.into());
        fields.insert("description".into(), self.description.clone().into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut appointment = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        appointment.contact.read_fields(&mut reader);
        reader.reference("mentor", &mut appointment.mentor);
        reader.required_text("description", None, &mut appointment.description);
        reader.finish()?;
        Ok(appointment)
    }

    fn references(&self) -> Vec<Reference> {
        let mut references = self.contact.references();
        references.push(Reference::new("mentor", "mentors", self.mentor));
        references
    }
}
