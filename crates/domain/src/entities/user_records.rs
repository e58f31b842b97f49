use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::user_records;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = user_records)]
pub struct UserRecordEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contact_id: Uuid,
    pub phase: String,
    pub delivered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_records)]
pub struct InsertUserRecordEntity {
    pub user_id: Uuid,
    pub contact_id: Uuid,
    pub phase: String,
    pub delivered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
