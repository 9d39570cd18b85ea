use std::sync::Arc;

use log::{info, warn};
use mongodb::bson::oid::ObjectId;

use crate::models::{Bid, BidStatus, Project, ProjectStatus};
use crate::services::notify::{BidNote, Notifier};
use crate::store::{AwardCommit, MarketStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AwardError {
    #[error("project not found")]
    ProjectNotFound,
    #[error("project is not open for bidding")]
    ProjectNotOpen,
    #[error("bid not found")]
    BidNotFound,
    #[error("bid is not pending")]
    BidNotPending,
    #[error("a conflicting write was detected; re-read the project and retry")]
    PersistenceConflict,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for AwardError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StaleProject => AwardError::ProjectNotOpen,
            StoreError::StaleBid => AwardError::BidNotPending,
            StoreError::Conflict | StoreError::Duplicate => AwardError::PersistenceConflict,
            StoreError::Database(msg) => AwardError::Storage(msg),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RejectError {
    #[error("bid not found")]
    BidNotFound,
    #[error("bid is not pending")]
    BidNotPending,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for RejectError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StaleBid => RejectError::BidNotPending,
            other => RejectError::Storage(other.to_string()),
        }
    }
}

/// What an award durably changed: the accepted bid and the siblings that
/// were flipped to rejected alongside it.
#[derive(Debug)]
pub struct AwardOutcome {
    pub project_id: ObjectId,
    pub winning_bid: Bid,
    pub rejected_bids: Vec<Bid>,
}

pub struct AwardService {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
}

impl AwardService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        AwardService { store, notifier }
    }

    /// Award a project to one of its pending bids.
    ///
    /// The accept/award/reject-siblings sequence is applied as a single
    /// store transaction; when two awards race, exactly one commits and the
    /// other returns `ProjectNotOpen`, `BidNotPending` or
    /// `PersistenceConflict` with nothing applied. Notifications go out
    /// after the commit and cannot change the result.
    pub async fn award_bid(
        &self,
        project_id: ObjectId,
        winning_bid_id: ObjectId,
    ) -> Result<AwardOutcome, AwardError> {
        let project = self
            .store
            .project(project_id)
            .await?
            .ok_or(AwardError::ProjectNotFound)?;
        if project.status != ProjectStatus::Open {
            return Err(AwardError::ProjectNotOpen);
        }

        let bid = self
            .store
            .bid(winning_bid_id)
            .await?
            .ok_or(AwardError::BidNotFound)?;
        if bid.project_id != project_id {
            return Err(AwardError::BidNotFound);
        }
        if bid.status != BidStatus::Pending {
            return Err(AwardError::BidNotPending);
        }

        let commit = self
            .store
            .commit_award(project_id, winning_bid_id, bid.contractor_id)
            .await?;

        info!(
            "Project {} awarded to contractor {} ({} sibling bids rejected)",
            project_id,
            bid.contractor_id,
            commit.rejected_bids.len()
        );

        self.notify_award(&project, &commit).await;

        Ok(AwardOutcome {
            project_id,
            winning_bid: commit.winning_bid,
            rejected_bids: commit.rejected_bids,
        })
    }

    /// Reject a single pending bid without touching the project.
    pub async fn reject_bid(&self, bid_id: ObjectId) -> Result<(), RejectError> {
        let bid = self
            .store
            .bid(bid_id)
            .await?
            .ok_or(RejectError::BidNotFound)?;
        if bid.status != BidStatus::Pending {
            return Err(RejectError::BidNotPending);
        }

        let Some(bid) = self.store.reject_pending_bid(bid_id).await? else {
            return Err(RejectError::BidNotPending);
        };

        if let Ok(Some(project)) = self.store.project(bid.project_id).await {
            self.notify_rejected(&project, &bid, "the builder").await;
        }

        Ok(())
    }

    async fn notify_award(&self, project: &Project, commit: &AwardCommit) {
        let builder_name = match self.store.contact(project.builder_id).await {
            Ok(Some(contact)) => contact.company_name.unwrap_or(contact.full_name),
            _ => "the builder".to_string(),
        };

        match self.store.contact(commit.winning_bid.contractor_id).await {
            Ok(Some(contact)) => {
                let note = BidNote {
                    to: contact,
                    project_id: hex_id(project),
                    project_title: project.title.clone(),
                    quoted_price: commit.winning_bid.quoted_price,
                    counterparty: builder_name.clone(),
                };
                if let Err(e) = self.notifier.bid_accepted(&note).await {
                    warn!("Failed to send bid-accepted notification: {}", e);
                }
            }
            Ok(None) => warn!(
                "No contact found for winning contractor {}",
                commit.winning_bid.contractor_id
            ),
            Err(e) => warn!("Could not look up winning contractor contact: {}", e),
        }

        for bid in &commit.rejected_bids {
            self.notify_rejected(project, bid, &builder_name).await;
        }
    }

    async fn notify_rejected(&self, project: &Project, bid: &Bid, builder_name: &str) {
        match self.store.contact(bid.contractor_id).await {
            Ok(Some(contact)) => {
                let note = BidNote {
                    to: contact,
                    project_id: hex_id(project),
                    project_title: project.title.clone(),
                    quoted_price: bid.quoted_price,
                    counterparty: builder_name.to_string(),
                };
                if let Err(e) = self.notifier.bid_rejected(&note).await {
                    warn!("Failed to send bid-rejected notification: {}", e);
                }
            }
            Ok(None) => warn!("No contact found for contractor {}", bid.contractor_id),
            Err(e) => warn!("Could not look up contractor contact: {}", e),
        }
    }
}

fn hex_id(project: &Project) -> String {
    project.id.map(|id| id.to_hex()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;
    use crate::services::testing::{
        contact, pending_bid, open_project, FailingNotifier, RecordingNotifier,
    };
    use crate::store::memory::MemoryStore;

    fn service_with(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>) -> AwardService {
        AwardService::new(store, notifier)
    }

    #[tokio::test]
    async fn award_accepts_winner_and_rejects_pending_siblings() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let project = open_project();
        let project_id = project.id.unwrap();
        let b1 = pending_bid(project_id, 100.0);
        let b2 = pending_bid(project_id, 120.0);
        let mut b3 = pending_bid(project_id, 140.0);
        b3.status = BidStatus::Rejected;

        store.put_project(project).await;
        for bid in [&b1, &b2, &b3] {
            store.put_bid(bid.clone()).await;
            store
                .put_contact(bid.contractor_id, contact("contractor"))
                .await;
        }

        let service = service_with(store.clone(), notifier.clone());
        let outcome = service.award_bid(project_id, b1.id.unwrap()).await.unwrap();

        assert_eq!(outcome.winning_bid.id, b1.id);
        assert_eq!(outcome.rejected_bids.len(), 1);
        assert_eq!(outcome.rejected_bids[0].id, b2.id);

        let project = store.project(project_id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Awarded);
        assert_eq!(project.awarded_to, Some(b1.contractor_id));

        let bids = store.bids_for_project(project_id).await.unwrap();
        let accepted: Vec<_> = bids
            .iter()
            .filter(|b| b.status == BidStatus::Accepted)
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, b1.id);
        assert!(bids.iter().all(|b| b.status != BidStatus::Pending));

        // One acceptance, one rejection; the already-rejected bid is not
        // re-notified.
        let events = notifier.events().await;
        assert_eq!(
            events.iter().filter(|e| e.starts_with("accepted")).count(),
            1
        );
        assert_eq!(
            events.iter().filter(|e| e.starts_with("rejected")).count(),
            1
        );
    }

    #[tokio::test]
    async fn second_award_fails_without_mutation() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let b1 = pending_bid(project_id, 100.0);
        let b2 = pending_bid(project_id, 120.0);
        store.put_project(project).await;
        store.put_bid(b1.clone()).await;
        store.put_bid(b2.clone()).await;

        let service =
            service_with(store.clone(), Arc::new(RecordingNotifier::default()));
        service.award_bid(project_id, b1.id.unwrap()).await.unwrap();

        let err = service
            .award_bid(project_id, b2.id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::ProjectNotOpen));

        // Re-awarding the same winner is not a silent success either.
        let err = service
            .award_bid(project_id, b1.id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::ProjectNotOpen));

        let project = store.project(project_id).await.unwrap().unwrap();
        assert_eq!(project.awarded_to, Some(b1.contractor_id));
        let stored_b2 = store.bid(b2.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored_b2.status, BidStatus::Rejected);
    }

    #[tokio::test]
    async fn award_validates_project_and_bid() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let other_project = open_project();
        let foreign_bid = pending_bid(other_project.id.unwrap(), 90.0);
        store.put_project(project).await;
        store.put_project(other_project).await;
        store.put_bid(foreign_bid.clone()).await;

        let service =
            service_with(store.clone(), Arc::new(RecordingNotifier::default()));

        let err = service
            .award_bid(ObjectId::new(), ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::ProjectNotFound));

        let err = service
            .award_bid(project_id, ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::BidNotFound));

        // A bid belonging to a different project is not found for this one.
        let err = service
            .award_bid(project_id, foreign_bid.id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::BidNotFound));
    }

    #[tokio::test]
    async fn award_fails_on_non_pending_bid() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let mut bid = pending_bid(project_id, 100.0);
        bid.status = BidStatus::Rejected;
        store.put_project(project).await;
        store.put_bid(bid.clone()).await;

        let service =
            service_with(store.clone(), Arc::new(RecordingNotifier::default()));
        let err = service
            .award_bid(project_id, bid.id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AwardError::BidNotPending));
    }

    #[tokio::test]
    async fn concurrent_awards_have_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let b1 = pending_bid(project_id, 100.0);
        let b2 = pending_bid(project_id, 120.0);
        store.put_project(project).await;
        store.put_bid(b1.clone()).await;
        store.put_bid(b2.clone()).await;

        let service =
            Arc::new(service_with(store.clone(), Arc::new(RecordingNotifier::default())));

        let first = {
            let service = service.clone();
            let bid_id = b1.id.unwrap();
            tokio::spawn(async move { service.award_bid(project_id, bid_id).await })
        };
        let second = {
            let service = service.clone();
            let bid_id = b2.id.unwrap();
            tokio::spawn(async move { service.award_bid(project_id, bid_id).await })
        };

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        assert_eq!(
            first.is_ok() as u8 + second.is_ok() as u8,
            1,
            "exactly one concurrent award must win"
        );
        for result in [first, second] {
            if let Err(e) = result {
                assert!(matches!(
                    e,
                    AwardError::ProjectNotOpen
                        | AwardError::BidNotPending
                        | AwardError::PersistenceConflict
                ));
            }
        }

        let bids = store.bids_for_project(project_id).await.unwrap();
        let accepted = bids
            .iter()
            .filter(|b| b.status == BidStatus::Accepted)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(
            bids.iter().filter(|b| b.status == BidStatus::Pending).count(),
            0
        );
    }

    #[tokio::test]
    async fn notifier_failure_does_not_change_award_result() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let bid = pending_bid(project_id, 100.0);
        store.put_project(project).await;
        store.put_bid(bid.clone()).await;
        store.put_contact(bid.contractor_id, contact("winner")).await;

        let service = service_with(store.clone(), Arc::new(FailingNotifier));
        let outcome = service.award_bid(project_id, bid.id.unwrap()).await;
        assert!(outcome.is_ok());

        let project = store.project(project_id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Awarded);
    }

    #[tokio::test]
    async fn reject_bid_flips_only_pending_bids() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        let bid = pending_bid(project_id, 100.0);
        store.put_project(project).await;
        store.put_bid(bid.clone()).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let service = service_with(store.clone(), notifier.clone());

        service.reject_bid(bid.id.unwrap()).await.unwrap();
        let stored = store.bid(bid.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.status, BidStatus::Rejected);

        let err = service.reject_bid(bid.id.unwrap()).await.unwrap_err();
        assert!(matches!(err, RejectError::BidNotPending));

        let err = service.reject_bid(ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, RejectError::BidNotFound));
    }
}
