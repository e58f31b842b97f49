use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::validation_histories;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = validation_histories)]
pub struct ValidationHistoryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub type_: String,
    pub file_path: String,
    pub total: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = validation_histories)]
pub struct InsertValidationHistoryEntity {
    pub user_id: Uuid,
    pub type_: String,
    pub file_path: String,
    pub total: i32,
    pub created_at: DateTime<Utc>,
}
