use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{contacts::ContactEntity, user_records::UserRecordEntity};
use crate::value_objects::enums::{contact_phases::ContactPhase, contact_types::ContactType};

pub const DEFAULT_CONTACT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactModel {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub contact_type: ContactType,
    pub phase: ContactPhase,
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

impl TryFrom<ContactEntity> for ContactModel {
    type Error = anyhow::Error;

    fn try_from(value: ContactEntity) -> Result<Self, Self::Error> {
        let contact_type = value
            .contact_type()
            .ok_or_else(|| anyhow!("contact {} has unknown type {:?}", value.id, value.type_))?;
        let phase = ContactPhase::from_str(&value.phase)
            .ok_or_else(|| anyhow!("contact {} has unknown phase {:?}", value.id, value.phase))?;

        Ok(Self {
            id: value.id,
            contact_type,
            phase,
            name: value.name,
            email: value.email,
            phone: value.phone,
            company: value.company,
            address: value.address,
            city: value.city,
            state: value.state,
            zip_code: value.zip_code,
            country: value.country,
            website: value.website,
            source: value.source,
            created_at: value.created_at,
            updated_at: value.updated_at,
            delivered_at: value.delivered_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertContactModel {
    #[serde(rename = "type")]
    pub contact_type: ContactType,
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
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePhaseModel {
    pub phase: ContactPhase,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
    pub contact_type: Option<ContactType>,
    pub phase: Option<ContactPhase>,
    pub limit: i64,
    pub offset: i64,
}

impl ContactFilter {
    pub fn new(
        contact_type: Option<ContactType>,
        phase: Option<ContactPhase>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        Self {
            contact_type,
            phase,
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(DEFAULT_CONTACT_PAGE_SIZE),
            offset: offset.filter(|o| *o >= 0).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecordModel {
    pub contact_id: Uuid,
    pub phase: Option<ContactPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecordModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contact_id: Uuid,
    pub phase: ContactPhase,
    pub delivered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecordEntity> for UserRecordModel {
    fn from(value: UserRecordEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            contact_id: value.contact_id,
            phase: ContactPhase::from_str(&value.phase).unwrap_or(ContactPhase::Delivered),
            delivered_at: value.delivered_at,
            created_at: value.created_at,
        }
    }
}

/// A contact as seen by the user who claimed it: `delivered_at` is the claim time of
/// the user's record, not the contact's own stamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserLeadModel {
    #[serde(flatten)]
    pub contact: ContactModel,
    pub record_id: Uuid,
}

impl UserLeadModel {
    pub fn new(mut contact: ContactModel, record: &UserRecordEntity) -> Self {
        contact.delivered_at = Some(record.delivered_at);
        Self {
            contact,
            record_id: record.id,
        }
    }
}
