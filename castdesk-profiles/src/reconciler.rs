//! Profile reconciliation
//!
//! Keeps a subject's flat profile row and its namespaced questionnaire
//! document consistent across create, update and read:
//! - writes are split by [`partition`] and merged field by field, never
//!   replacing untouched columns, fields or namespaces
//! - a create for a subject that already has a row becomes an update, so a
//!   double submit never splits one subject across two rows
//! - reads promote the relevant namespace's answers onto the returned
//!   profile for consumers that expect flat fields
//!
//! Every merge into an existing row is one atomic read-modify-write through
//! [`ProfileStore::modify`], so overlapping writes to one subject never drop
//! each other's fields. The create-time existence check is best-effort. The
//! datastore's unique key on the subject remains the final guard; a racing
//! insert surfaces as [`castdesk_common::Error::AlreadyExists`].

use castdesk_common::db::ProfileStore;
use castdesk_common::models::{NamespaceResponses, RESERVED_KEYS};
use castdesk_common::{FieldValue, FlatField, ProfileRecord, QuestionnaireDocument, Result};
use chrono::Utc;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

use crate::fieldsets::FieldRegistry;
use crate::observe::{Observer, Operation, Outcome, TracingObserver};
use crate::partition::{partition, Partition, Payload};

/// Profile as returned to readers
///
/// The stored record plus the answers of its overlay namespace promoted to
/// top-level fields. Serializes as one flat JSON object; a promoted answer
/// never shadows a profile column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    record: ProfileRecord,
    #[serde(flatten)]
    promoted: NamespaceResponses,
    #[serde(skip)]
    overlay_namespace: String,
}

impl ProfileView {
    fn compose(record: ProfileRecord, overlay_namespace: &str) -> Self {
        let promoted: NamespaceResponses = record
            .questionnaire_responses
            .namespace(overlay_namespace)
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(key, _)| {
                        FlatField::from_key(key).is_none() && !RESERVED_KEYS.contains(&key.as_str())
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            record,
            promoted,
            overlay_namespace: overlay_namespace.to_string(),
        }
    }

    /// Promoted questionnaire answer for `field`
    pub fn field(&self, field: &str) -> Option<&FieldValue> {
        self.promoted.get(field)
    }

    pub fn promoted(&self) -> &NamespaceResponses {
        &self.promoted
    }

    pub fn overlay_namespace(&self) -> &str {
        &self.overlay_namespace
    }

    pub fn into_record(self) -> ProfileRecord {
        self.record
    }
}

impl Deref for ProfileView {
    type Target = ProfileRecord;

    fn deref(&self) -> &ProfileRecord {
        &self.record
    }
}

pub struct ProfileReconciler {
    store: Arc<dyn ProfileStore>,
    registry: Arc<FieldRegistry>,
    observer: Arc<dyn Observer>,
}

impl ProfileReconciler {
    pub fn new(store: Arc<dyn ProfileStore>, registry: Arc<FieldRegistry>) -> Self {
        Self {
            store,
            registry,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Read-model for `subject_id`, or `None` for a subject with no profile
    pub async fn get_profile(&self, subject_id: &str) -> Result<Option<ProfileView>> {
        let result = self.store.fetch(subject_id).await.map(|record| {
            record.map(|record| {
                let overlay = self
                    .registry
                    .active_namespace(&[Some(record.talent_domain.as_str())])
                    .to_string();
                ProfileView::compose(record, &overlay)
            })
        });

        let outcome = match &result {
            Ok(Some(_)) => Outcome::Found,
            Ok(None) => Outcome::Missing,
            Err(e) => Outcome::from_error(e),
        };
        self.observe(Operation::GetProfile, outcome, subject_id);
        result
    }

    /// Stored record without any promoted fields
    pub async fn raw_profile(&self, subject_id: &str) -> Result<Option<ProfileRecord>> {
        self.store.fetch(subject_id).await
    }

    /// Create the profile for `subject_id`, or merge into it if one exists
    pub async fn create_profile(&self, subject_id: &str, payload: &Payload) -> Result<ProfileRecord> {
        let result = self.create_or_redirect(subject_id, payload).await;
        self.finish(Operation::CreateProfile, subject_id, result)
    }

    /// Merge `payload` into the existing profile
    ///
    /// Fields absent from the payload keep their stored values. Fails with
    /// [`castdesk_common::Error::NotFound`] when the subject has no profile.
    pub async fn update_profile(&self, subject_id: &str, payload: &Payload) -> Result<ProfileRecord> {
        let result = self.update_existing(subject_id, payload).await;
        self.finish(Operation::UpdateProfile, subject_id, result)
    }

    /// Merge questionnaire `responses` into the subject's profile, creating
    /// the profile with default columns if it does not exist yet
    pub async fn save_questionnaire_responses(
        &self,
        subject_id: &str,
        responses: QuestionnaireDocument,
    ) -> Result<()> {
        let result = self
            .ensure(subject_id, responses)
            .await
            .map(|(record, created)| (record, if created { Outcome::Created } else { Outcome::Updated }));
        self.finish(Operation::SaveQuestionnaireResponses, subject_id, result)
            .map(|_| ())
    }

    /// Guarantee a profile exists for `subject_id` holding `initial`
    ///
    /// The only path that creates a profile implicitly. An existing profile
    /// has `initial` merged into its questionnaire document; otherwise a new
    /// one is inserted with default columns and `initial` as its document.
    /// Returns the persisted record and whether it was created.
    pub async fn ensure_profile(
        &self,
        subject_id: &str,
        initial: QuestionnaireDocument,
    ) -> Result<(ProfileRecord, bool)> {
        let result = self.ensure(subject_id, initial).await;
        let outcome = match &result {
            Ok((_, true)) => Outcome::Created,
            Ok((_, false)) => Outcome::Updated,
            Err(e) => Outcome::from_error(e),
        };
        self.observe(Operation::EnsureProfile, outcome, subject_id);
        result
    }

    /// Stored questionnaire document, or an empty one for an unknown subject
    pub async fn get_questionnaire_responses(&self, subject_id: &str) -> Result<QuestionnaireDocument> {
        let result = self.store.fetch(subject_id).await;
        let outcome = match &result {
            Ok(Some(_)) => Outcome::Found,
            Ok(None) => Outcome::Missing,
            Err(e) => Outcome::from_error(e),
        };
        self.observe(Operation::GetQuestionnaireResponses, outcome, subject_id);

        Ok(result?
            .map(|record| record.questionnaire_responses)
            .unwrap_or_default())
    }

    async fn update_existing(
        &self,
        subject_id: &str,
        payload: &Payload,
    ) -> Result<(ProfileRecord, Outcome)> {
        let record = self.merge_payload(subject_id, payload).await?;
        Ok((record, Outcome::Updated))
    }

    async fn create_or_redirect(
        &self,
        subject_id: &str,
        payload: &Payload,
    ) -> Result<(ProfileRecord, Outcome)> {
        if self.store.fetch(subject_id).await?.is_some() {
            info!(subject_id, "Profile already exists, merging create into update");
            let record = self.merge_payload(subject_id, payload).await?;
            return Ok((record, Outcome::Redirected));
        }

        let parts = partition(&self.registry, subject_id, payload, None)?;
        let record = self.new_record(subject_id, parts);
        self.store.insert(&record).await?;
        Ok((record, Outcome::Created))
    }

    /// Build a fresh record from a partitioned create payload
    ///
    /// The active namespace and any other registered namespace the payload
    /// touches start with every field at its empty value.
    fn new_record(&self, subject_id: &str, parts: Partition) -> ProfileRecord {
        let mut record = ProfileRecord::new(subject_id, parts.active_namespace.clone());
        for (field, value) in parts.flat {
            record.set_flat(field, value);
        }

        let mut touched: Vec<String> = parts.questionnaire.namespaces().map(str::to_string).collect();
        touched.push(parts.active_namespace.clone());

        let mut document = QuestionnaireDocument::new();
        for namespace in &touched {
            if let Some(set) = self.registry.field_set(namespace) {
                document.namespace_mut(namespace).extend(set.defaults());
            }
        }
        document.merge(parts.questionnaire);

        record.questionnaire_responses = document;
        record
    }

    /// Merge `payload` into the stored row in one atomic read-modify-write
    async fn merge_payload(&self, subject_id: &str, payload: &Payload) -> Result<ProfileRecord> {
        let registry = &self.registry;
        self.store
            .modify(
                subject_id,
                Box::new(move |record: &mut ProfileRecord| -> Result<()> {
                    let stored_domain = Some(record.talent_domain.as_str());
                    let parts = partition(registry, subject_id, payload, stored_domain)?;
                    for (field, value) in parts.flat {
                        record.set_flat(field, value);
                    }
                    record.questionnaire_responses.merge(parts.questionnaire);
                    record.updated_at = Utc::now();
                    Ok(())
                }),
            )
            .await
    }

    async fn ensure(
        &self,
        subject_id: &str,
        responses: QuestionnaireDocument,
    ) -> Result<(ProfileRecord, bool)> {
        if self.store.fetch(subject_id).await?.is_some() {
            let record = self
                .store
                .modify(
                    subject_id,
                    Box::new(move |record: &mut ProfileRecord| -> Result<()> {
                        record.questionnaire_responses.merge(responses);
                        record.updated_at = Utc::now();
                        Ok(())
                    }),
                )
                .await?;
            return Ok((record, false));
        }

        let mut record = ProfileRecord::new(subject_id, self.registry.default_namespace());
        record.questionnaire_responses = responses;
        self.store.insert(&record).await?;
        info!(subject_id, "Created profile from questionnaire responses");
        Ok((record, true))
    }

    fn finish(
        &self,
        operation: Operation,
        subject_id: &str,
        result: Result<(ProfileRecord, Outcome)>,
    ) -> Result<ProfileRecord> {
        match result {
            Ok((record, outcome)) => {
                self.observe(operation, outcome, subject_id);
                Ok(record)
            }
            Err(e) => {
                self.observe(operation, Outcome::from_error(&e), subject_id);
                Err(e)
            }
        }
    }

    fn observe(&self, operation: Operation, outcome: Outcome, subject_id: &str) {
        self.observer.record(operation, outcome, subject_id);
    }
}
