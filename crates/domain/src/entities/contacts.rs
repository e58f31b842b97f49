use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::contacts;
use crate::value_objects::enums::{contact_phases::ContactPhase, contact_types::ContactType};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = contacts)]
pub struct ContactEntity {
    pub id: Uuid,
    pub type_: String,
    pub phase: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ContactEntity {
    /// Unknown phase strings are read as `Raw` so a bad row never looks deliverable.
    pub fn phase(&self) -> ContactPhase {
        ContactPhase::from_str(&self.phase).unwrap_or_default()
    }

    pub fn contact_type(&self) -> Option<ContactType> {
        ContactType::from_str(&self.type_)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contacts)]
pub struct InsertContactEntity {
    pub type_: String,
    pub phase: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
