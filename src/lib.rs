//! Mentora - backend for a mentorship platform
//!
//! Users and mentors register and log in through an ordered chain of
//! authentication backends. Articles, events, categories, contact messages,
//! mentor appointments, assessment results and page meta entries are exposed
//! as JSON CRUD resources with partial updates.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
