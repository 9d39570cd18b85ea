use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, ClientSession, Collection, Database};

use crate::models::{Bid, BidStatus, Contact, Profile, Project, Rating, Reputation};
use super::{AwardCommit, MarketStore, StoreError};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        MongoStore { client, db }
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection("projects")
    }

    fn bids(&self) -> Collection<Bid> {
        self.db.collection("bids")
    }

    fn ratings(&self) -> Collection<Rating> {
        self.db.collection("ratings")
    }

    async fn apply_award(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
        winning_bid_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<AwardCommit, StoreError> {
        let now = DateTime::now();
        let bids = self.bids();

        // Status-guarded updates: a concurrent award that got here first
        // leaves these filters matching nothing.
        let accepted = bids
            .update_one_with_session(
                doc! { "_id": winning_bid_id, "project_id": project_id, "status": "pending" },
                doc! { "$set": { "status": "accepted", "updated_at": now } },
                None,
                session,
            )
            .await?;
        if accepted.matched_count == 0 {
            return Err(StoreError::StaleBid);
        }

        let awarded = self
            .projects()
            .update_one_with_session(
                doc! { "_id": project_id, "status": "open" },
                doc! { "$set": { "status": "awarded", "awarded_to": contractor_id, "updated_at": now } },
                None,
                session,
            )
            .await?;
        if awarded.matched_count == 0 {
            return Err(StoreError::StaleProject);
        }

        // Collect the remaining pending siblings before flipping them so the
        // caller can notify their contractors after the commit.
        let mut cursor = bids
            .find_with_session(
                doc! { "project_id": project_id, "status": "pending" },
                None,
                session,
            )
            .await?;
        let mut rejected = Vec::new();
        while let Some(bid) = cursor.next(session).await {
            rejected.push(bid?);
        }

        if !rejected.is_empty() {
            let ids: Vec<ObjectId> = rejected.iter().filter_map(|b| b.id).collect();
            bids.update_many_with_session(
                doc! { "_id": { "$in": ids } },
                doc! { "$set": { "status": "rejected", "updated_at": now } },
                None,
                session,
            )
            .await?;
        }

        // The transaction must leave exactly one accepted bid and no pending
        // ones; anything else means an interleaving we cannot commit.
        let accepted_count = bids
            .count_documents_with_session(
                doc! { "project_id": project_id, "status": "accepted" },
                None,
                session,
            )
            .await?;
        let pending_count = bids
            .count_documents_with_session(
                doc! { "project_id": project_id, "status": "pending" },
                None,
                session,
            )
            .await?;
        if accepted_count != 1 || pending_count != 0 {
            return Err(StoreError::Conflict);
        }

        let winning_bid = bids
            .find_one_with_session(doc! { "_id": winning_bid_id }, None, session)
            .await?
            .ok_or(StoreError::Conflict)?;

        let rejected_bids = rejected
            .into_iter()
            .map(|mut bid| {
                bid.status = BidStatus::Rejected;
                bid.updated_at = now;
                bid
            })
            .collect();

        Ok(AwardCommit { winning_bid, rejected_bids })
    }
}

#[rocket::async_trait]
impl MarketStore for MongoStore {
    async fn project(&self, id: ObjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.projects().find_one(doc! { "_id": id }, None).await?)
    }

    async fn bid(&self, id: ObjectId) -> Result<Option<Bid>, StoreError> {
        Ok(self.bids().find_one(doc! { "_id": id }, None).await?)
    }

    async fn bids_for_project(&self, project_id: ObjectId) -> Result<Vec<Bid>, StoreError> {
        let mut cursor = self
            .bids()
            .find(doc! { "project_id": project_id }, None)
            .await?;
        let mut bids = Vec::new();
        while cursor.advance().await? {
            bids.push(cursor.deserialize_current().map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(bids)
    }

    async fn commit_award(
        &self,
        project_id: ObjectId,
        winning_bid_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<AwardCommit, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self
            .apply_award(&mut session, project_id, winning_bid_id, contractor_id)
            .await
        {
            Ok(commit) => {
                session.commit_transaction().await?;
                Ok(commit)
            }
            Err(e) => {
                let _ = session.abort_transaction().await;
                Err(e)
            }
        }
    }

    async fn reject_pending_bid(&self, bid_id: ObjectId) -> Result<Option<Bid>, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let bid = self
            .bids()
            .find_one_and_update(
                doc! { "_id": bid_id, "status": "pending" },
                doc! { "$set": { "status": "rejected", "updated_at": DateTime::now() } },
                options,
            )
            .await?;
        Ok(bid)
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<ObjectId, StoreError> {
        let result = self.ratings().insert_one(rating, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Database("rating insert returned no id".to_string()))
    }

    async fn rating_exists(
        &self,
        project_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<bool, StoreError> {
        let existing = self
            .ratings()
            .find_one(
                doc! { "project_id": project_id, "contractor_id": contractor_id },
                None,
            )
            .await?;
        Ok(existing.is_some())
    }

    async fn ratings_for_contractor(
        &self,
        contractor_id: ObjectId,
    ) -> Result<Vec<Rating>, StoreError> {
        let mut cursor = self
            .ratings()
            .find(doc! { "contractor_id": contractor_id }, None)
            .await?;
        let mut ratings = Vec::new();
        while cursor.advance().await? {
            ratings.push(cursor.deserialize_current().map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(ratings)
    }

    async fn completed_project_count(&self, contractor_id: ObjectId) -> Result<i32, StoreError> {
        let count = self
            .projects()
            .count_documents(
                doc! { "awarded_to": contractor_id, "status": "completed" },
                None,
            )
            .await?;
        Ok(count as i32)
    }

    async fn update_reputation(
        &self,
        contractor_id: ObjectId,
        reputation: &Reputation,
    ) -> Result<(), StoreError> {
        self.db
            .collection::<crate::models::ContractorProfile>("contractor_profiles")
            .update_one(
                doc! { "user_id": contractor_id },
                doc! { "$set": {
                    "rating": reputation.average_rating,
                    "rating_count": reputation.rating_count,
                    "quality_rating": reputation.quality_rating,
                    "communication_rating": reputation.communication_rating,
                    "timeline_rating": reputation.timeline_rating,
                    "budget_rating": reputation.budget_rating,
                    "completed_projects": reputation.completed_projects,
                    "updated_at": DateTime::now()
                } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn mark_project_rated(&self, project_id: ObjectId) -> Result<(), StoreError> {
        self.projects()
            .update_one(
                doc! { "_id": project_id },
                doc! { "$set": { "is_rated": true, "updated_at": DateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn contact(&self, user_id: ObjectId) -> Result<Option<Contact>, StoreError> {
        let profile = self
            .db
            .collection::<Profile>("profiles")
            .find_one(doc! { "_id": user_id }, None)
            .await?;
        Ok(profile.as_ref().map(Contact::from))
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
            || e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
        {
            return StoreError::Conflict;
        }
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = &*e.kind {
            if write_error.code == DUPLICATE_KEY {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(e.to_string())
    }
}
