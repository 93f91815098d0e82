//! Mentor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fields::{FieldMap, FieldReader, FieldSchema, ValidationErrors};
use super::principal::{read_username, Identity, PrincipalKind, Profile};

/// A mentor account. Separate table and username namespace from users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentor {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(flatten)]
    pub profile: Profile,
    /// Topic the mentor helps with
    pub status: Option<MentorStatus>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl Mentor {
    /// Create a new active mentor. The password must already be hashed.
    pub fn new(username: String, password_hash: String, profile: Profile) -> Self {
        Self {
            id: 0,
            username,
            password_hash,
            profile,
            status: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }
}

impl Default for Mentor {
    fn default() -> Self {
        Self::new(String::new(), String::new(), Profile::default())
    }
}

impl Identity for Mentor {
    const KIND: PrincipalKind = PrincipalKind::Mentor;

    fn id(&self) -> i64 {
        self.id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl FieldSchema for Mentor {
    const FILE_FIELD: Option<&'static str> = Some("photo");

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("username".into(), self.username.clone().into());
        self.profile.write_fields(&mut fields);
        fields.insert(
            "status".into(),
            self.status.map(|s| s.to_string()).into(),
        );
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut mentor = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        read_username(&mut reader, &mut mentor.username);
        mentor.profile.read_fields(&mut reader);
        reader.choice("status", &mut mentor.status);
        reader.finish()?;
        Ok(mentor)
    }
}

/// Mentoring topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorStatus {
    CareerStart,
    TransitionToAnotherArea,
    Resume,
    Motivation,
    ChoosingProfessionalPath,
    Interview,
}

impl fmt::Display for MentorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MentorStatus::CareerStart => "career_start",
            MentorStatus::TransitionToAnotherArea => "transition_to_another_area",
            MentorStatus::Resume => "resume",
            MentorStatus::Motivation => "motivation",
            MentorStatus::ChoosingProfessionalPath => "choosing_professional_path",
            MentorStatus::Interview => "interview",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for MentorStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "career_start" => Ok(MentorStatus::CareerStart),
            "transition_to_another_area" => Ok(MentorStatus::TransitionToAnotherArea),
            "resume" => Ok(MentorStatus::Resume),
            "motivation" => Ok(MentorStatus::Motivation),
            "choosing_professional_path" => Ok(MentorStatus::ChoosingProfessionalPath),
            "interview" => Ok(MentorStatus::Interview),
            _ => Err(anyhow::anyhow!("Invalid mentor status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trip() {
        for status in [
            MentorStatus::CareerStart,
            MentorStatus::TransitionToAnotherArea,
            MentorStatus::Resume,
            MentorStatus::Motivation,
            MentorStatus::ChoosingProfessionalPath,
            MentorStatus::Interview,
        ] {
            assert_eq!(MentorStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_user_status_is_not_a_mentor_status() {
        let fields = json!({
            "username": "bob",
            "email": "bob@example.com",
            "status": "working",
        });
        let errors = Mentor::from_fields(fields.as_object().unwrap(), None).unwrap_err();
        assert!(errors.get("status").is_some());
    }

    #[test]
    fn test_serialized_mentor_has_flat_profile() {
        let mut mentor = Mentor::new(
            "bob".into(),
            "hash".into(),
            Profile {
                email: "bob@example.com".into(),
                ..Default::default()
            },
        );
        mentor.status = Some(MentorStatus::Interview);

        let value = serde_json::to_value(&mentor).unwrap();
        assert_eq!(value["email"], "bob@example.com");
        assert_eq!(value["status"], "interview");
        assert!(value.get("password_hash").is_none());
        assert!(value.get("profile").is_none());
    }
}
