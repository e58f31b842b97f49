use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::payments;
use crate::value_objects::enums::{payment_methods::PaymentMethod, payment_statuses::PaymentStatus};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub transaction_id: Option<String>,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_str(&self.status)
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_str(&self.method)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub transaction_id: Option<String>,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// NewPaymentEntity is the application-facing alias for inserting rows into `payments`.
pub type NewPaymentEntity = InsertPaymentEntity;
