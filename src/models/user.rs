//! Regular user model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fields::{FieldMap, FieldReader, FieldSchema, Reference, ValidationErrors};
use super::principal::{read_username, Identity, PrincipalKind, Profile};

/// A registered platform user (mentee).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularUser {
    pub id: i64,
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub status: Option<UserStatus>,
    /// Owned assessment result
    pub result: Option<i64>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl RegularUser {
    /// Create a new active user.
    ///
    /// The password must already be hashed.
    pub fn new(username: String, password_hash: String, profile: Profile) -> Self {
        Self {
            id: 0,
            username,
            password_hash,
            profile,
            status: None,
            result: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }
}

impl Default for RegularUser {
    fn default() -> Self {
        Self::new(String::new(), String::new(), Profile::default())
    }
}

impl Identity for RegularUser {
    const KIND: PrincipalKind = PrincipalKind::User;

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

impl FieldSchema for RegularUser {
    const FILE_FIELD: Option<&'static str> = Some("photo");

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("username".into(), self.username.clone().into());
        self.profile.write_fields(&mut fields);
        fields.insert(
            "status".into(),
            self.status.map(|s| s.to_string()).into(),
        );
        fields.insert("result".into(), self.result.into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut user = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        read_username(&mut reader, &mut user.username);
        user.profile.read_fields(&mut reader);
        reader.choice("status", &mut user.status);
        reader.optional_reference("result", &mut user.result);
        reader.finish()?;
        Ok(user)
    }

    fn references(&self) -> Vec<Reference> {
        self.result
            .map(|id| Reference::new("result", "results", id))
            .into_iter()
            .collect()
    }
}

/// What a user is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Working,
    Studying,
    LookingForJob,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Working => write!(f, "working"),
            UserStatus::Studying => write!(f, "studying"),
            UserStatus::LookingForJob => write!(f, "looking_for_job"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(UserStatus::Working),
            "studying" => Ok(UserStatus::Studying),
            "looking_for_job" => Ok(UserStatus::LookingForJob),
            _ => Err(anyhow::anyhow!("Invalid user status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_user_is_active() {
        let user = RegularUser::new("alice".into(), "hash".into(), Profile::default());
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert_eq!(user.id, 0);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [UserStatus::Working, UserStatus::Studying, UserStatus::LookingForJob] {
            assert_eq!(UserStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert!(UserStatus::from_str("resume").is_err());
    }

    #[test]
    fn test_from_fields_creates_user() {
        let fields = json!({
            "username": "alice",
            "email": "alice@example.com",
            "status": "studying",
            "result": "3",
        });
        let user = RegularUser::from_fields(fields.as_object().unwrap(), None).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.profile.email, "alice@example.com");
        assert_eq!(user.profile.patronymic, "");
        assert_eq!(user.status, Some(UserStatus::Studying));
        assert_eq!(user.result, Some(3));
        assert_eq!(user.references(), vec![Reference::new("result", "results", 3)]);
    }

    #[test]
    fn test_from_fields_reports_every_bad_field() {
        let fields = json!({"username": "bad name", "status": "resume"});
        let errors = RegularUser::from_fields(fields.as_object().unwrap(), None).unwrap_err();

        let failing: Vec<&str> = errors.fields().collect();
        assert_eq!(failing, vec!["email", "status", "username"]);
    }

    #[test]
    fn test_snapshot_has_no_password() {
        let user = RegularUser::new("alice".into(), "secret-hash".into(), Profile::default());
        let fields = user.to_fields();
        assert!(!fields.contains_key("password"));
        assert!(!fields.contains_key("password_hash"));
        assert_eq!(fields["photo"], serde_json::Value::Null);
    }
}
