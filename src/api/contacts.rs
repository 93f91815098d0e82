//! Contact message and mentor appointment endpoints

use crate::api::middleware::{ApiError, AppState};
use crate::api::resources::{query_id, ResourceApi};
use crate::models::{ContactMessage, IdFilter, MentorAppointment};
use crate::services::resource::ResourceService;

pub struct Contacts;

impl ResourceApi for Contacts {
    type Entity = ContactMessage;
    type Filter = IdFilter;

    const COLLECTION: &'static str = "/contacts";
    const ITEM: &'static str = "/contacts/{id}";

    fn service(state: &AppState) -> &ResourceService<ContactMessage, IdFilter> {
        &state.contacts
    }

    fn filter(query: &[(String, String)]) -> Result<IdFilter, ApiError> {
        Ok(IdFilter {
            id: query_id(query, "contact_id")?,
        })
    }
}

/// Appointments share their id with the parent contact message.
pub struct Appointments;

impl ResourceApi for Appointments {
    type Entity = MentorAppointment;
    type Filter = IdFilter;

    const COLLECTION: &'static str = "/appointments";
    const ITEM: &'static str = "/appointments/{id}";

    fn service(state: &AppState) -> &ResourceService<MentorAppointment, IdFilter> {
        &state.appointments
    }

    fn filter(query: &[(String, String)]) -> Result<IdFilter, ApiError> {
        Ok(IdFilter {
            id: query_id(query, "appointment_id")?,
        })
    }
}
