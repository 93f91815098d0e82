//! Principals
//!
//! Regular users and mentors live in separate tables with independent
//! username namespaces. Both implement [`Identity`], which is all the
//! authenticator needs to know about them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fields::{FieldMap, FieldReader, MAX_LENGTH};
use super::{Mentor, RegularUser};

/// Which identity table a principal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Mentor,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Mentor => write!(f, "mentor"),
        }
    }
}

impl FromStr for PrincipalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(PrincipalKind::User),
            "mentor" => Ok(PrincipalKind::Mentor),
            _ => Err(anyhow::anyhow!("Invalid principal kind: {}", s)),
        }
    }
}

/// Common surface of both identity records.
pub trait Identity {
    const KIND: PrincipalKind;

    fn id(&self) -> i64;
    fn username(&self) -> &str;
    fn password_hash(&self) -> &str;
    fn is_active(&self) -> bool;
}

/// An authenticated identity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Principal {
    User(RegularUser),
    Mentor(Mentor),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Mentor(_) => PrincipalKind::Mentor,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Principal::User(user) => user.id,
            Principal::Mentor(mentor) => mentor.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Principal::User(user) => &user.username,
            Principal::Mentor(mentor) => &mentor.username,
        }
    }
}

impl From<RegularUser> for Principal {
    fn from(user: RegularUser) -> Self {
        Principal::User(user)
    }
}

impl From<Mentor> for Principal {
    fn from(mentor: Mentor) -> Self {
        Principal::Mentor(mentor)
    }
}

/// Contact and display fields shared by users and mentors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    /// Stored as an empty string when not given
    #[serde(default)]
    pub patronymic: String,
    /// Reference path of the uploaded photo
    pub photo: Option<String>,
    pub telegram: Option<String>,
    pub about_me: Option<String>,
}

impl Profile {
    pub(crate) fn write_fields(&self, fields: &mut FieldMap) {
        fields.insert("email".into(), self.email.clone().into());
        fields.insert("name".into(), self.name.clone().into());
        fields.insert("surname".into(), self.surname.clone().into());
        fields.insert("patronymic".into(), self.patronymic.clone().into());
        fields.insert("photo".into(), self.photo.clone().into());
        fields.insert("telegram".into(), self.telegram.clone().into());
        fields.insert("about_me".into(), self.about_me.clone().into());
    }

    pub(crate) fn read_fields(&mut self, reader: &mut FieldReader<'_>) {
        reader.email("email", &mut self.email);
        reader.optional_text("name", Some(MAX_LENGTH), &mut self.name);
        reader.optional_text("surname", Some(MAX_LENGTH), &mut self.surname);
        reader.blank_text("patronymic", Some(MAX_LENGTH), &mut self.patronymic);
        reader.optional_text("photo", None, &mut self.photo);
        reader.optional_text("telegram", Some(MAX_LENGTH), &mut self.telegram);
        reader.optional_text("about_me", None, &mut self.about_me);
    }

}

/// Read the username field shared by both identity kinds.
pub(crate) fn read_username(reader: &mut FieldReader<'_>, target: &mut String) {
    let before = target.clone();
    reader.required_text("username", Some(150), target);
    if *target != before && !is_valid_username(target) {
        reader.error(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        *target = before;
    }
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_kind_round_trip() {
        assert_eq!(PrincipalKind::User.to_string(), "user");
        assert_eq!(PrincipalKind::from_str("MENTOR").unwrap(), PrincipalKind::Mentor);
        assert!(PrincipalKind::from_str("admin").is_err());
    }

    #[test]
    fn test_username_characters() {
        assert!(is_valid_username("alice.b+1@x_y-z"));
        assert!(!is_valid_username("alice smith"));
        assert!(!is_valid_username("alice/bob"));
    }

    #[test]
    fn test_principal_serializes_with_type_tag() {
        let user = RegularUser::new("alice".into(), "hash".into(), Profile::default());
        let value = serde_json::to_value(Principal::from(user)).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["username"], "alice");
        assert!(value.get("password_hash").is_none());
    }
}
