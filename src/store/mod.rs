pub mod mongo;

#[cfg(test)]
pub mod memory;

use mongodb::bson::oid::ObjectId;

use crate::models::{Bid, Contact, Project, Rating, Reputation};

pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project is no longer open")]
    StaleProject,
    #[error("bid is no longer pending")]
    StaleBid,
    #[error("duplicate record")]
    Duplicate,
    #[error("conflicting concurrent write")]
    Conflict,
    #[error("database error: {0}")]
    Database(String),
}

/// Everything the award transaction durably applied, returned so the caller
/// can fan out notifications after the commit.
#[derive(Debug)]
pub struct AwardCommit {
    pub winning_bid: Bid,
    pub rejected_bids: Vec<Bid>,
}

/// Persistence seam for the award and rating paths. The production
/// implementation is MongoDB; the services are written against this trait so
/// they can run against an in-memory double under test.
#[rocket::async_trait]
pub trait MarketStore: Send + Sync {
    async fn project(&self, id: ObjectId) -> Result<Option<Project>, StoreError>;

    async fn bid(&self, id: ObjectId) -> Result<Option<Bid>, StoreError>;

    async fn bids_for_project(&self, project_id: ObjectId) -> Result<Vec<Bid>, StoreError>;

    /// Atomically accept the winning bid, mark the project awarded to the
    /// bid's contractor and reject every other still-pending bid. The status
    /// preconditions are re-checked inside the transaction boundary; a lost
    /// race surfaces as `StaleProject`/`StaleBid` and leaves nothing applied.
    async fn commit_award(
        &self,
        project_id: ObjectId,
        winning_bid_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<AwardCommit, StoreError>;

    /// Compare-and-set a single bid from pending to rejected. Returns the
    /// bid when it was flipped, `None` when it was no longer pending.
    async fn reject_pending_bid(&self, bid_id: ObjectId) -> Result<Option<Bid>, StoreError>;

    /// Insert a rating. The (project, contractor) unique index makes a
    /// duplicate insert fail closed with `StoreError::Duplicate`.
    async fn insert_rating(&self, rating: &Rating) -> Result<ObjectId, StoreError>;

    async fn rating_exists(
        &self,
        project_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<bool, StoreError>;

    async fn ratings_for_contractor(
        &self,
        contractor_id: ObjectId,
    ) -> Result<Vec<Rating>, StoreError>;

    async fn completed_project_count(&self, contractor_id: ObjectId) -> Result<i32, StoreError>;

    async fn update_reputation(
        &self,
        contractor_id: ObjectId,
        reputation: &Reputation,
    ) -> Result<(), StoreError>;

    async fn mark_project_rated(&self, project_id: ObjectId) -> Result<(), StoreError>;

    async fn contact(&self, user_id: ObjectId) -> Result<Option<Contact>, StoreError>;
}
