//! Query scope injector.
//!
//! `ScopedCollection` wraps a typed MongoDB collection so that every query
//! a handler can issue against tenant data carries the caller's
//! establishment constraint, and every decision lands in the access audit
//! log. Handlers never touch the raw collection for tenant data.

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{AccessAction, AccessLogEntry};
use crate::services::audit::AccessAuditService;
use crate::services::error::ServiceError;

use super::context::{AuthContext, ScopedResource};

/// Proof that a fetched record passed `validate_access`.
///
/// By-id lookups cannot be filtered query-side, so the record must be
/// validated after the fetch. The only constructor is the injector's
/// `find_by_id`, which runs the check first - code that skips the check
/// has no way to obtain the inner record.
#[derive(Debug)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::ops::Deref for Verified<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// Prepend an establishment `$match` stage to an aggregation pipeline
/// unless the caller is unrestricted/unassigned or the pipeline's first
/// stage already constrains by establishment. Idempotent: scoping an
/// already-scoped pipeline never double-filters or silently narrows an
/// intentionally broader query.
pub fn scope_pipeline(ctx: &AuthContext, pipeline: Vec<Document>) -> Vec<Document> {
    if ctx.can_access_all() {
        return pipeline;
    }
    let Some(eid) = ctx.establishment_id() else {
        return pipeline;
    };

    let already_scoped = pipeline
        .first()
        .and_then(|stage| stage.get_document("$match").ok())
        .map(|m| m.contains_key("establishment_id"))
        .unwrap_or(false);
    if already_scoped {
        return pipeline;
    }

    let mut scoped = Vec::with_capacity(pipeline.len() + 1);
    scoped.push(doc! { "$match": { "establishment_id": eid } });
    scoped.extend(pipeline);
    scoped
}

/// A tenant-data collection bound to one request's authorization context.
#[derive(Clone)]
pub struct ScopedCollection<T> {
    collection: Collection<T>,
    ctx: AuthContext,
    audit: AccessAuditService,
}

impl<T> ScopedCollection<T>
where
    T: ScopedResource + Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>, ctx: AuthContext, audit: AccessAuditService) -> Self {
        Self {
            collection,
            ctx,
            audit,
        }
    }

    pub fn context(&self) -> &AuthContext {
        &self.ctx
    }

    fn record_decision(
        &self,
        action: AccessAction,
        resource_id: impl Into<String>,
        resource_establishment_id: Option<String>,
        allowed: bool,
        reason: Option<String>,
    ) {
        self.audit.log_async(AccessLogEntry::decision(
            &self.ctx,
            action,
            T::RESOURCE_TYPE,
            resource_id,
            resource_establishment_id,
            allowed,
            reason,
        ));
    }

    /// Find all records matching `filter`, within the caller's scope.
    pub async fn find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let mut cursor = self.collection.find(scoped, options).await?;
        let mut records = Vec::new();
        while let Some(record) = cursor.try_next().await? {
            records.push(record);
        }
        self.record_decision(
            AccessAction::Read,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(records)
    }

    /// Find one record matching `filter`, within the caller's scope.
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let record = self.collection.find_one(scoped, None).await?;
        self.record_decision(
            AccessAction::Read,
            record
                .as_ref()
                .map(|r| r.resource_id())
                .unwrap_or_else(|| AccessLogEntry::COLLECTION_SCOPE.to_string()),
            record
                .as_ref()
                .and_then(|r| r.establishment_id())
                .map(|s| s.to_string()),
            true,
            None,
        );
        Ok(record)
    }

    /// Count records matching `filter`, within the caller's scope.
    pub async fn count(&self, filter: Document) -> Result<u64, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let count = self.collection.count_documents(scoped, None).await?;
        self.record_decision(
            AccessAction::Read,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(count)
    }

    /// Fetch a single record by id and validate the caller may see it.
    ///
    /// A by-id lookup carries no compound predicate, so the ownership
    /// check runs on the fetched record; the result is handed back as a
    /// `Verified` proof. A denial is audited and surfaced as an error.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Verified<T>>, ServiceError> {
        let record = self.collection.find_one(doc! { "_id": id }, None).await?;
        let Some(record) = record else {
            return Ok(None);
        };

        match self.ctx.validate_access(&record) {
            Ok(()) => {
                self.record_decision(
                    AccessAction::Read,
                    record.resource_id(),
                    record.establishment_id().map(|s| s.to_string()),
                    true,
                    None,
                );
                Ok(Some(Verified::new(record)))
            }
            Err(denial) => {
                self.record_decision(
                    AccessAction::Read,
                    record.resource_id(),
                    record.establishment_id().map(|s| s.to_string()),
                    false,
                    Some(denial.reason()),
                );
                Err(denial.into())
            }
        }
    }

    /// Insert a record after validating it belongs to the caller's
    /// establishment. The denial path is audited with the record that was
    /// rejected.
    pub async fn insert_one(&self, record: &T) -> Result<(), ServiceError> {
        match self.ctx.validate_access(record) {
            Ok(()) => {
                self.collection.insert_one(record, None).await?;
                self.record_decision(
                    AccessAction::Create,
                    record.resource_id(),
                    record.establishment_id().map(|s| s.to_string()),
                    true,
                    None,
                );
                Ok(())
            }
            Err(denial) => {
                self.record_decision(
                    AccessAction::Create,
                    record.resource_id(),
                    record.establishment_id().map(|s| s.to_string()),
                    false,
                    Some(denial.reason()),
                );
                Err(denial.into())
            }
        }
    }

    /// Update the first record matching `filter`, within the caller's
    /// scope. Returns the number of matched records.
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<u64, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let result = self.collection.update_one(scoped, update, None).await?;
        self.record_decision(
            AccessAction::Update,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(result.matched_count)
    }

    /// Update all records matching `filter`, within the caller's scope.
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<u64, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let result = self.collection.update_many(scoped, update, None).await?;
        self.record_decision(
            AccessAction::Update,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(result.matched_count)
    }

    /// Delete the first record matching `filter`, within the caller's
    /// scope. Returns the number of deleted records.
    pub async fn delete_one(&self, filter: Document) -> Result<u64, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let result = self.collection.delete_one(scoped, None).await?;
        self.record_decision(
            AccessAction::Delete,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(result.deleted_count)
    }

    /// Delete all records matching `filter`, within the caller's scope.
    pub async fn delete_many(&self, filter: Document) -> Result<u64, ServiceError> {
        let scoped = self.ctx.apply_filter(filter);
        let result = self.collection.delete_many(scoped, None).await?;
        self.record_decision(
            AccessAction::Delete,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(result.deleted_count)
    }

    /// Run an aggregation pipeline with the establishment `$match` stage
    /// injected ahead of it when the caller is scoped.
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, ServiceError> {
        let scoped = scope_pipeline(&self.ctx, pipeline);
        let mut cursor = self.collection.aggregate(scoped, None).await?;
        let mut results = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            results.push(document);
        }
        self.record_decision(
            AccessAction::Read,
            AccessLogEntry::COLLECTION_SCOPE,
            self.ctx.establishment_id().map(|s| s.to_string()),
            true,
            None,
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{Principal, Role};

    fn ctx(role: Role, eid: Option<&str>) -> AuthContext {
        AuthContext::new(Principal::new("u1", role, eid.map(|s| s.to_string())))
    }

    fn group_stage() -> Document {
        doc! { "$group": { "_id": "$status", "total": { "$sum": "$amount_cents" } } }
    }

    #[test]
    fn test_scoped_pipeline_gets_match_prepended() {
        let scoped = scope_pipeline(&ctx(Role::Staff, Some("E1")), vec![group_stage()]);
        assert_eq!(scoped.len(), 2);
        assert_eq!(
            scoped[0],
            doc! { "$match": { "establishment_id": "E1" } }
        );
    }

    #[test]
    fn test_pipeline_scoping_is_idempotent() {
        let ctx = ctx(Role::Staff, Some("E1"));
        let once = scope_pipeline(&ctx, vec![group_stage()]);
        let twice = scope_pipeline(&ctx, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_existing_establishment_match_is_left_alone() {
        // An intentionally broader admin-authored constraint must not be
        // narrowed or doubled.
        let pre_scoped = vec![
            doc! { "$match": { "establishment_id": { "$in": ["E1", "E2"] } } },
            group_stage(),
        ];
        let scoped = scope_pipeline(&ctx(Role::Manager, Some("E1")), pre_scoped.clone());
        assert_eq!(scoped, pre_scoped);
    }

    #[test]
    fn test_unrestricted_pipeline_passes_through() {
        let pipeline = vec![group_stage()];
        let scoped = scope_pipeline(&ctx(Role::Admin, None), pipeline.clone());
        assert_eq!(scoped, pipeline);
    }

    #[test]
    fn test_unassigned_scoped_pipeline_passes_through() {
        let pipeline = vec![group_stage()];
        let scoped = scope_pipeline(&ctx(Role::Manager, None), pipeline.clone());
        assert_eq!(scoped, pipeline);
    }

    #[test]
    fn test_leading_match_without_establishment_still_gets_scoped() {
        let pipeline = vec![doc! { "$match": { "status": "issued" } }, group_stage()];
        let scoped = scope_pipeline(&ctx(Role::Staff, Some("E1")), pipeline);
        assert_eq!(scoped.len(), 3);
        assert_eq!(
            scoped[0],
            doc! { "$match": { "establishment_id": "E1" } }
        );
        assert_eq!(scoped[1], doc! { "$match": { "status": "issued" } });
    }

    #[test]
    fn test_verified_exposes_record_read_only_until_unwrapped() {
        let verified = Verified::new(42u32);
        assert_eq!(*verified, 42);
        assert_eq!(verified.into_inner(), 42);
    }
}
