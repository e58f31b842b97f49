use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

use domain::{
    entities::{
        contacts::{ContactEntity, InsertContactEntity},
        user_records::InsertUserRecordEntity,
    },
    repositories::{contacts::ContactRepository, user_records::UserRecordRepository},
    value_objects::{
        contacts::{
            ContactFilter, ContactModel, InsertContactModel, StoreRecordModel, UserLeadModel,
            UserRecordModel,
        },
        enums::{contact_phases::ContactPhase, contact_types::ContactType},
    },
};

use crate::errors::{UseCaseError, UseCaseResult};

pub struct ContactUseCase<C, U>
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    contact_repo: Arc<C>,
    user_record_repo: Arc<U>,
}

impl<C, U> ContactUseCase<C, U>
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    pub fn new(contact_repo: Arc<C>, user_record_repo: Arc<U>) -> Self {
        Self {
            contact_repo,
            user_record_repo,
        }
    }

    pub async fn create_contact(&self, model: InsertContactModel) -> UseCaseResult<ContactModel> {
        let name = model.name.trim().to_string();
        if name.is_empty() {
            return Err(UseCaseError::BadRequest("Contact name is required".to_string()));
        }

        let now = Utc::now();
        let insert_contact_entity = InsertContactEntity {
            type_: model.contact_type.to_string(),
            phase: ContactPhase::Raw.to_string(),
            name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            address: model.address,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
            country: model.country,
            website: model.website,
            source: model.source,
            created_at: now,
            updated_at: now,
        };

        let contact = self
            .contact_repo
            .create(insert_contact_entity)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "contacts: failed to create contact");
                UseCaseError::Internal(err)
            })?;

        info!(contact_id = %contact.id, contact_type = %contact.type_, "contacts: contact created");
        Self::to_model(contact)
    }

    pub async fn list_contacts(&self, filter: ContactFilter) -> UseCaseResult<Vec<ContactModel>> {
        let contacts = self.contact_repo.list(filter).await.map_err(|err| {
            error!(db_error = ?err, "contacts: failed to list contacts");
            UseCaseError::Internal(err)
        })?;

        contacts.into_iter().map(Self::to_model).collect()
    }

    /// Picks one contact of the given type and phase at random. An empty pool is not an error.
    pub async fn sample_random(
        &self,
        contact_type: ContactType,
        phase: ContactPhase,
    ) -> UseCaseResult<Option<ContactModel>> {
        let contact = self
            .contact_repo
            .sample_random(contact_type, phase)
            .await
            .map_err(|err| {
                error!(
                    %contact_type,
                    %phase,
                    db_error = ?err,
                    "contacts: failed to sample random contact"
                );
                UseCaseError::Internal(err)
            })?;

        match contact {
            Some(contact) => Ok(Some(Self::to_model(contact)?)),
            None => {
                info!(%contact_type, %phase, "contacts: no contact available for sampling");
                Ok(None)
            }
        }
    }

    pub async fn transition_phase(
        &self,
        contact_id: Uuid,
        target: ContactPhase,
    ) -> UseCaseResult<ContactModel> {
        let contact = self
            .contact_repo
            .transition_phase(contact_id, target, Utc::now())
            .await
            .map_err(|err| {
                error!(
                    %contact_id,
                    %target,
                    db_error = ?err,
                    "contacts: failed to transition contact phase"
                );
                UseCaseError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%contact_id, %target, "contacts: phase transition on unknown contact");
                UseCaseError::NotFound(format!("Contact {contact_id} not found"))
            })?;

        info!(%contact_id, %target, "contacts: phase transitioned");
        Self::to_model(contact)
    }

    /// Records that `user_id` claimed a contact. Claiming in DELIVERED moves the contact
    /// into DELIVERED first.
    pub async fn store_record(
        &self,
        user_id: Uuid,
        model: StoreRecordModel,
    ) -> UseCaseResult<UserRecordModel> {
        let phase = model.phase.unwrap_or(ContactPhase::Delivered);
        let contact_id = model.contact_id;

        if phase == ContactPhase::Delivered {
            self.transition_phase(contact_id, ContactPhase::Delivered)
                .await?;
        } else {
            self.contact_repo
                .find_by_id(contact_id)
                .await
                .map_err(UseCaseError::Internal)?
                .ok_or_else(|| UseCaseError::NotFound(format!("Contact {contact_id} not found")))?;
        }

        let now = Utc::now();
        let record = self
            .user_record_repo
            .create(InsertUserRecordEntity {
                user_id,
                contact_id,
                phase: phase.to_string(),
                delivered_at: now,
                created_at: now,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %contact_id,
                    db_error = ?err,
                    "contacts: failed to store user record"
                );
                UseCaseError::Internal(err)
            })?;

        info!(%user_id, %contact_id, record_id = %record.id, "contacts: user record stored");
        Ok(UserRecordModel::from(record))
    }

    pub async fn list_user_records(&self, user_id: Uuid) -> UseCaseResult<Vec<UserRecordModel>> {
        let records = self
            .user_record_repo
            .list_by_user(user_id)
            .await
            .map_err(UseCaseError::Internal)?;

        Ok(records.into_iter().map(UserRecordModel::from).collect())
    }

    /// The user's claimed contacts, one entry per record. Records whose contact has
    /// disappeared are skipped.
    pub async fn list_user_leads(&self, user_id: Uuid) -> UseCaseResult<Vec<UserLeadModel>> {
        let records = self
            .user_record_repo
            .list_by_user(user_id)
            .await
            .map_err(UseCaseError::Internal)?;

        let contacts = join_all(
            records
                .iter()
                .map(|record| self.contact_repo.find_by_id(record.contact_id)),
        )
        .await;

        let mut leads = Vec::with_capacity(records.len());
        for (record, contact) in records.iter().zip(contacts) {
            let contact = contact.map_err(|err| {
                error!(%user_id, contact_id = %record.contact_id, db_error = ?err, "contacts: failed to load lead");
                UseCaseError::Internal(err)
            })?;

            if let Some(contact) = contact {
                leads.push(UserLeadModel::new(Self::to_model(contact)?, record));
            }
        }

        Ok(leads)
    }

    fn to_model(contact: ContactEntity) -> UseCaseResult<ContactModel> {
        ContactModel::try_from(contact).map_err(UseCaseError::Internal)
    }
}
