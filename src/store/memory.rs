//! In-memory implementation of `MarketStore` used by the service tests.
//! A single lock around the whole state makes `commit_award` naturally
//! indivisible, mirroring the transactional guarantee of the Mongo store.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use tokio::sync::Mutex;

use crate::models::{Bid, BidStatus, Contact, Project, ProjectStatus, Rating, Reputation};
use super::{AwardCommit, MarketStore, StoreError};

#[derive(Default)]
struct Inner {
    projects: HashMap<ObjectId, Project>,
    bids: HashMap<ObjectId, Bid>,
    ratings: Vec<Rating>,
    reputations: HashMap<ObjectId, Reputation>,
    contacts: HashMap<ObjectId, Contact>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_project(&self, project: Project) {
        let id = project.id.unwrap();
        self.inner.lock().await.projects.insert(id, project);
    }

    pub async fn put_bid(&self, bid: Bid) {
        let id = bid.id.unwrap();
        self.inner.lock().await.bids.insert(id, bid);
    }

    pub async fn put_contact(&self, user_id: ObjectId, contact: Contact) {
        self.inner.lock().await.contacts.insert(user_id, contact);
    }

    pub async fn reputation(&self, contractor_id: ObjectId) -> Option<Reputation> {
        self.inner.lock().await.reputations.get(&contractor_id).cloned()
    }
}

#[rocket::async_trait]
impl MarketStore for MemoryStore {
    async fn project(&self, id: ObjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.inner.lock().await.projects.get(&id).cloned())
    }

    async fn bid(&self, id: ObjectId) -> Result<Option<Bid>, StoreError> {
        Ok(self.inner.lock().await.bids.get(&id).cloned())
    }

    async fn bids_for_project(&self, project_id: ObjectId) -> Result<Vec<Bid>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bids
            .values()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn commit_award(
        &self,
        project_id: ObjectId,
        winning_bid_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<AwardCommit, StoreError> {
        let mut inner = self.inner.lock().await;

        match inner.bids.get(&winning_bid_id) {
            Some(bid) if bid.project_id == project_id && bid.status == BidStatus::Pending => {}
            _ => return Err(StoreError::StaleBid),
        }
        match inner.projects.get(&project_id) {
            Some(project) if project.status == ProjectStatus::Open => {}
            _ => return Err(StoreError::StaleProject),
        }

        let winning_bid = {
            let bid = inner.bids.get_mut(&winning_bid_id).unwrap();
            bid.status = BidStatus::Accepted;
            bid.clone()
        };

        let project = inner.projects.get_mut(&project_id).unwrap();
        project.status = ProjectStatus::Awarded;
        project.awarded_to = Some(contractor_id);

        let mut rejected_bids = Vec::new();
        for bid in inner.bids.values_mut() {
            if bid.project_id == project_id
                && bid.id != Some(winning_bid_id)
                && bid.status == BidStatus::Pending
            {
                bid.status = BidStatus::Rejected;
                rejected_bids.push(bid.clone());
            }
        }

        Ok(AwardCommit { winning_bid, rejected_bids })
    }

    async fn reject_pending_bid(&self, bid_id: ObjectId) -> Result<Option<Bid>, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.bids.get_mut(&bid_id) {
            Some(bid) if bid.status == BidStatus::Pending => {
                bid.status = BidStatus::Rejected;
                Ok(Some(bid.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<ObjectId, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .ratings
            .iter()
            .any(|r| r.project_id == rating.project_id && r.contractor_id == rating.contractor_id)
        {
            return Err(StoreError::Duplicate);
        }
        let id = ObjectId::new();
        let mut stored = rating.clone();
        stored.id = Some(id);
        inner.ratings.push(stored);
        Ok(id)
    }

    async fn rating_exists(
        &self,
        project_id: ObjectId,
        contractor_id: ObjectId,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ratings
            .iter()
            .any(|r| r.project_id == project_id && r.contractor_id == contractor_id))
    }

    async fn ratings_for_contractor(
        &self,
        contractor_id: ObjectId,
    ) -> Result<Vec<Rating>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.contractor_id == contractor_id)
            .cloned()
            .collect())
    }

    async fn completed_project_count(&self, contractor_id: ObjectId) -> Result<i32, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .projects
            .values()
            .filter(|p| {
                p.awarded_to == Some(contractor_id) && p.status == ProjectStatus::Completed
            })
            .count() as i32)
    }

    async fn update_reputation(
        &self,
        contractor_id: ObjectId,
        reputation: &Reputation,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .reputations
            .insert(contractor_id, reputation.clone());
        Ok(())
    }

    async fn mark_project_rated(&self, project_id: ObjectId) -> Result<(), StoreError> {
        if let Some(project) = self.inner.lock().await.projects.get_mut(&project_id) {
            project.is_rated = true;
        }
        Ok(())
    }

    async fn contact(&self, user_id: ObjectId) -> Result<Option<Contact>, StoreError> {
        Ok(self.inner.lock().await.contacts.get(&user_id).cloned())
    }
}
