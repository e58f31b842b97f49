use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::entities::contacts::{ContactEntity, InsertContactEntity};
use crate::value_objects::contacts::ContactFilter;
use crate::value_objects::enums::{contact_phases::ContactPhase, contact_types::ContactType};

#[async_trait]
#[automock]
pub trait ContactRepository {
    async fn create(&self, insert_contact_entity: InsertContactEntity) -> Result<ContactEntity>;
    async fn find_by_id(&self, contact_id: Uuid) -> Result<Option<ContactEntity>>;
    async fn list(&self, filter: ContactFilter) -> Result<Vec<ContactEntity>>;
    async fn sample_random(
        &self,
        contact_type: ContactType,
        phase: ContactPhase,
    ) -> Result<Option<ContactEntity>>;
    /// Returns `None` when the id does not resolve.
    async fn transition_phase(
        &self,
        contact_id: Uuid,
        target: ContactPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactEntity>>;
    async fn list_delivered_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ContactEntity>>;
    /// Moves the contact to CLEANED only while it is still DELIVERED before `cutoff`.
    /// `None` when it vanished or was moved in the meantime.
    async fn reset_stale_delivery(
        &self,
        contact_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactEntity>>;
}
