//! Event model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, FieldReader, FieldSchema, ValidationErrors, MAX_LENGTH};

/// Output format for event dates.
pub const EVENT_DATE_FORMAT: &str = "%d-%m-%y";

/// Snapshot format for merges; keeps the century.
const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A scheduled platform event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(with = "event_date")]
    pub date: NaiveDate,
    pub title: String,
    /// Rich text description
    pub description: String,
    pub photo: Option<String>,
}

impl FieldSchema for Event {
    const FILE_FIELD: Option<&'static str> = Some("photo");

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(
            "date".into(),
            self.date.format(SNAPSHOT_DATE_FORMAT).to_string().into(),
        );
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("description".into(), self.description.clone().into());
        fields.insert("photo".into(), self.photo.clone().into());
        fields
    }

    fn from_fields(fields: &FieldMap, current: Option<&Self>) -> Result<Self, ValidationErrors> {
        let mut event = current.cloned().unwrap_or_default();
        let mut reader = FieldReader::new(fields, current.is_none());
        reader.date("date", &mut event.date);
        reader.required_text("title", Some(MAX_LENGTH), &mut event.title);
        reader.required_text("description", None, &mut event.description);
        reader.optional_text("photo", None, &mut event.photo);
        reader.finish()?;
        Ok(event)
    }
}

/// `dd-mm-yy` on the way out; either accepted format on the way in.
mod event_date {
    use super::EVENT_DATE_FORMAT;
    use crate::models::fields::parse_date;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(EVENT_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_date(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid event date: {}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::merge::merge_update;
    use serde_json::json;

    #[test]
    fn test_date_renders_short_form() {
        let event = Event {
            id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            title: "Meetup".into(),
            description: "<p>Talks</p>".into(),
            photo: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["date"], "05-03-24");

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_from_fields_accepts_both_date_forms() {
        for date in ["2024-03-05", "05-03-24"] {
            let fields = json!({"date": date, "title": "Meetup", "description": "Talks"});
            let event = Event::from_fields(fields.as_object().unwrap(), None).unwrap();
            assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        }
    }

    #[test]
    fn test_snapshot_survives_merge_round_trip() {
        let event = Event {
            id: 1,
            date: NaiveDate::from_ymd_opt(2031, 12, 31).unwrap(),
            title: "Demo day".into(),
            description: "Projects".into(),
            photo: Some("/media/a.png".into()),
        };
        let rebuilt = Event::from_fields(&event.to_fields(), Some(&event)).unwrap();
        assert_eq!(rebuilt, event);
    }

    #[test]
    fn test_update_without_date_keeps_far_future_date() {
        let event = Event {
            id: 1,
            date: NaiveDate::from_ymd_opt(2075, 6, 1).unwrap(),
            title: "Far".into(),
            description: "Reunion".into(),
            photo: None,
        };
        let update = json!({"title": "Far v2"});
        let updated = merge_update(&event, update.as_object().unwrap()).unwrap();
        assert_eq!(updated.date, NaiveDate::from_ymd_opt(2075, 6, 1).unwrap());
        assert_eq!(updated.title, "Far v2");
    }

    #[test]
    fn test_update_without_date_keeps_old_date() {
        let event = Event {
            id: 1,
            date: NaiveDate::from_ymd_opt(1950, 1, 20).unwrap(),
            title: "Archive".into(),
            description: "Old talk".into(),
            photo: None,
        };
        let update = json!({"description": "Restored"});
        let updated = merge_update(&event, update.as_object().unwrap()).unwrap();
        assert_eq!(updated.date, event.date);
    }
}
