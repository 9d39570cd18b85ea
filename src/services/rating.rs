use std::sync::Arc;

use log::{error, info, warn};
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::models::{ProjectStatus, Rating, Reputation};
use crate::services::notify::{Notifier, RatingNote};
use crate::store::{MarketStore, StoreError};
use crate::utils::validation::valid_score;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("project is not eligible for rating")]
    ProjectNotEligible,
    #[error("this project has already been rated")]
    DuplicateRating,
    #[error("scores must be integers between 1 and 5")]
    InvalidScore,
    #[error("a conflicting write was detected; re-read and retry")]
    PersistenceConflict,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for RatingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => RatingError::DuplicateRating,
            StoreError::Conflict => RatingError::PersistenceConflict,
            other => RatingError::Storage(other.to_string()),
        }
    }
}

/// Caller-supplied rating input. Dimension scores left as `None` are filled
/// from the overall score once, at submission time.
#[derive(Debug, Clone)]
pub struct RatingSubmission {
    pub project_id: ObjectId,
    pub contractor_id: ObjectId,
    pub builder_id: ObjectId,
    pub rating: i32,
    pub quality_rating: Option<i32>,
    pub communication_rating: Option<i32>,
    pub timeline_rating: Option<i32>,
    pub budget_rating: Option<i32>,
    pub review_title: Option<String>,
    pub review_text: String,
    pub would_hire_again: bool,
}

pub struct RatingService {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
}

impl RatingService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        RatingService { store, notifier }
    }

    /// Record a rating for the contractor a project was awarded to, then
    /// recompute that contractor's reputation from all of their ratings.
    ///
    /// Eligibility is checked here, never trusted from the client; the
    /// (project, contractor) uniqueness constraint in the store is the final
    /// guard against a racing duplicate insert.
    pub async fn submit_rating(&self, submission: RatingSubmission) -> Result<Rating, RatingError> {
        if !valid_score(submission.rating) {
            return Err(RatingError::InvalidScore);
        }
        for dimension in [
            submission.quality_rating,
            submission.communication_rating,
            submission.timeline_rating,
            submission.budget_rating,
        ]
        .into_iter()
        .flatten()
        {
            if !valid_score(dimension) {
                return Err(RatingError::InvalidScore);
            }
        }

        let project = self
            .store
            .project(submission.project_id)
            .await?
            .ok_or(RatingError::ProjectNotEligible)?;
        if !matches!(
            project.status,
            ProjectStatus::Awarded | ProjectStatus::Completed
        ) {
            return Err(RatingError::ProjectNotEligible);
        }
        if project.awarded_to != Some(submission.contractor_id) {
            return Err(RatingError::ProjectNotEligible);
        }

        if self
            .store
            .rating_exists(submission.project_id, submission.contractor_id)
            .await?
        {
            return Err(RatingError::DuplicateRating);
        }

        let mut rating = Rating {
            id: None,
            project_id: submission.project_id,
            contractor_id: submission.contractor_id,
            builder_id: submission.builder_id,
            rating: submission.rating,
            quality_rating: submission.quality_rating.unwrap_or(submission.rating),
            communication_rating: submission
                .communication_rating
                .unwrap_or(submission.rating),
            timeline_rating: submission.timeline_rating.unwrap_or(submission.rating),
            budget_rating: submission.budget_rating.unwrap_or(submission.rating),
            review_title: submission.review_title,
            review_text: submission.review_text,
            would_hire_again: submission.would_hire_again,
            created_at: DateTime::now(),
        };
        rating.id = Some(self.store.insert_rating(&rating).await?);

        info!(
            "Rating recorded for contractor {} on project {} ({}/5)",
            submission.contractor_id, submission.project_id, submission.rating
        );

        // The reputation fields are a derived cache; a failed refresh is
        // logged and repaired by the next recompute, not surfaced to the
        // caller whose rating is already committed.
        if let Err(e) = self.refresh_reputation(submission.contractor_id).await {
            error!(
                "Failed to refresh reputation for contractor {}: {}",
                submission.contractor_id, e
            );
        }
        if let Err(e) = self.store.mark_project_rated(submission.project_id).await {
            error!(
                "Failed to mark project {} as rated: {}",
                submission.project_id, e
            );
        }

        self.notify_rating(&project.title, &rating).await;

        Ok(rating)
    }

    async fn refresh_reputation(&self, contractor_id: ObjectId) -> Result<(), StoreError> {
        let ratings = self.store.ratings_for_contractor(contractor_id).await?;
        let completed = self.store.completed_project_count(contractor_id).await?;
        let reputation = compute_reputation(&ratings, completed);
        self.store
            .update_reputation(contractor_id, &reputation)
            .await
    }

    async fn notify_rating(&self, project_title: &str, rating: &Rating) {
        match self.store.contact(rating.contractor_id).await {
            Ok(Some(contact)) => {
                let note = RatingNote {
                    to: contact,
                    project_title: project_title.to_string(),
                    rating: rating.rating,
                };
                if let Err(e) = self.notifier.rating_received(&note).await {
                    warn!("Failed to send rating-received notification: {}", e);
                }
            }
            Ok(None) => warn!("No contact found for contractor {}", rating.contractor_id),
            Err(e) => warn!("Could not look up contractor contact: {}", e),
        }
    }
}

/// Full recompute over every rating the contractor has. Deliberately not
/// incremental: rating volume per contractor is small and a fresh scan
/// cannot drift.
pub fn compute_reputation(ratings: &[Rating], completed_projects: i32) -> Reputation {
    let count = ratings.len() as i32;
    if count == 0 {
        return Reputation {
            average_rating: 0.0,
            rating_count: 0,
            quality_rating: 0.0,
            communication_rating: 0.0,
            timeline_rating: 0.0,
            budget_rating: 0.0,
            completed_projects,
        };
    }

    let avg = |extract: fn(&Rating) -> i32| {
        ratings.iter().map(extract).sum::<i32>() as f64 / count as f64
    };

    Reputation {
        average_rating: avg(|r| r.rating),
        rating_count: count,
        quality_rating: avg(|r| r.quality_rating),
        communication_rating: avg(|r| r.communication_rating),
        timeline_rating: avg(|r| r.timeline_rating),
        budget_rating: avg(|r| r.budget_rating),
        completed_projects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        awarded_project, contact, open_project, FailingNotifier, RecordingNotifier,
    };
    use crate::store::memory::MemoryStore;

    fn submission(project_id: ObjectId, contractor_id: ObjectId, score: i32) -> RatingSubmission {
        RatingSubmission {
            project_id,
            contractor_id,
            builder_id: ObjectId::new(),
            rating: score,
            quality_rating: None,
            communication_rating: None,
            timeline_rating: None,
            budget_rating: None,
            review_title: None,
            review_text: "Solid work throughout.".to_string(),
            would_hire_again: true,
        }
    }

    fn service(store: Arc<MemoryStore>) -> RatingService {
        RatingService::new(store, Arc::new(RecordingNotifier::default()))
    }

    #[tokio::test]
    async fn rejects_open_project() {
        let store = Arc::new(MemoryStore::new());
        let project = open_project();
        let project_id = project.id.unwrap();
        store.put_project(project).await;

        let err = service(store)
            .submit_rating(submission(project_id, ObjectId::new(), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::ProjectNotEligible));
    }

    #[tokio::test]
    async fn rejects_wrong_contractor_and_missing_project() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let project = awarded_project(contractor_id);
        let project_id = project.id.unwrap();
        store.put_project(project).await;

        let service = service(store);
        let err = service
            .submit_rating(submission(project_id, ObjectId::new(), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::ProjectNotEligible));

        let err = service
            .submit_rating(submission(ObjectId::new(), contractor_id, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::ProjectNotEligible));
    }

    #[tokio::test]
    async fn rejects_out_of_range_scores() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let project = awarded_project(contractor_id);
        let project_id = project.id.unwrap();
        store.put_project(project).await;

        let service = service(store);
        for score in [0, 6, -1] {
            let err = service
                .submit_rating(submission(project_id, contractor_id, score))
                .await
                .unwrap_err();
            assert!(matches!(err, RatingError::InvalidScore));
        }

        let mut sub = submission(project_id, contractor_id, 4);
        sub.quality_rating = Some(7);
        let err = service.submit_rating(sub).await.unwrap_err();
        assert!(matches!(err, RatingError::InvalidScore));
    }

    #[tokio::test]
    async fn rejects_duplicate_even_with_different_scores() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let project = awarded_project(contractor_id);
        let project_id = project.id.unwrap();
        store.put_project(project).await;

        let service = service(store);
        service
            .submit_rating(submission(project_id, contractor_id, 5))
            .await
            .unwrap();
        let err = service
            .submit_rating(submission(project_id, contractor_id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::DuplicateRating));
    }

    #[tokio::test]
    async fn fills_dimension_scores_from_overall_and_marks_project_rated() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let project = awarded_project(contractor_id);
        let project_id = project.id.unwrap();
        store.put_project(project).await;

        let mut sub = submission(project_id, contractor_id, 4);
        sub.communication_rating = Some(2);
        let rating = service(store.clone()).submit_rating(sub).await.unwrap();

        assert_eq!(rating.quality_rating, 4);
        assert_eq!(rating.communication_rating, 2);
        assert_eq!(rating.timeline_rating, 4);
        assert_eq!(rating.budget_rating, 4);

        let project = store.project(project_id).await.unwrap().unwrap();
        assert!(project.is_rated);
    }

    #[tokio::test]
    async fn reputation_is_recomputed_exactly_from_all_ratings() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let service = service(store.clone());

        for score in [5, 4, 3] {
            let mut project = awarded_project(contractor_id);
            if score == 3 {
                project.status = ProjectStatus::Completed;
            }
            let project_id = project.id.unwrap();
            store.put_project(project).await;
            service
                .submit_rating(submission(project_id, contractor_id, score))
                .await
                .unwrap();
        }

        let reputation = store.reputation(contractor_id).await.unwrap();
        assert_eq!(reputation.average_rating, 4.0);
        assert_eq!(reputation.rating_count, 3);
        assert_eq!(reputation.quality_rating, 4.0);
        assert_eq!(reputation.completed_projects, 1);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_change_rating_result() {
        let store = Arc::new(MemoryStore::new());
        let contractor_id = ObjectId::new();
        let project = awarded_project(contractor_id);
        let project_id = project.id.unwrap();
        store.put_project(project).await;
        store.put_contact(contractor_id, contact("rated")).await;

        let service = RatingService::new(store.clone(), Arc::new(FailingNotifier));
        let result = service
            .submit_rating(submission(project_id, contractor_id, 5))
            .await;
        assert!(result.is_ok());
        assert!(store
            .rating_exists(project_id, contractor_id)
            .await
            .unwrap());
    }

    #[test]
    fn empty_rating_set_yields_zeroed_reputation() {
        let reputation = compute_reputation(&[], 2);
        assert_eq!(reputation.average_rating, 0.0);
        assert_eq!(reputation.rating_count, 0);
        assert_eq!(reputation.completed_projects, 2);
    }
}
