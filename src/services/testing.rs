//! Fixtures and notifier stubs shared by the service tests.

use mongodb::bson::{oid::ObjectId, DateTime};
use tokio::sync::Mutex;

use crate::models::{Bid, BidStatus, Contact, Project, ProjectStatus};
use crate::services::notify::{BidNote, Notifier, NotifyError, RatingNote};

pub fn open_project() -> Project {
    Project {
        id: Some(ObjectId::new()),
        builder_id: ObjectId::new(),
        title: "Two-storey residential build".to_string(),
        description: "Full construction of a two-storey house.".to_string(),
        project_type: "residential".to_string(),
        location: "Andheri West".to_string(),
        city: "Mumbai".to_string(),
        budget_min: 500_000.0,
        budget_max: 900_000.0,
        bidding_deadline: DateTime::from_millis(DateTime::now().timestamp_millis() + 86_400_000),
        start_date: None,
        duration_days: Some(120),
        required_specializations: vec!["civil".to_string()],
        status: ProjectStatus::Open,
        awarded_to: None,
        is_rated: false,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    }
}

pub fn awarded_project(contractor_id: ObjectId) -> Project {
    let mut project = open_project();
    project.status = ProjectStatus::Awarded;
    project.awarded_to = Some(contractor_id);
    project
}

pub fn pending_bid(project_id: ObjectId, quoted_price: f64) -> Bid {
    Bid {
        id: Some(ObjectId::new()),
        project_id,
        contractor_id: ObjectId::new(),
        quoted_price,
        estimated_duration: 90,
        proposal: "We can deliver this on time and on budget.".to_string(),
        status: BidStatus::Pending,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    }
}

pub fn contact(name: &str) -> Contact {
    Contact {
        email: format!("{}@example.com", name),
        full_name: name.to_string(),
        company_name: None,
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }

    async fn record(&self, kind: &str, email: &str) {
        self.events.lock().await.push(format!("{}:{}", kind, email));
    }
}

#[rocket::async_trait]
impl Notifier for RecordingNotifier {
    async fn bid_received(&self, note: &BidNote) -> Result<(), NotifyError> {
        self.record("received", &note.to.email).await;
        Ok(())
    }

    async fn bid_accepted(&self, note: &BidNote) -> Result<(), NotifyError> {
        self.record("accepted", &note.to.email).await;
        Ok(())
    }

    async fn bid_rejected(&self, note: &BidNote) -> Result<(), NotifyError> {
        self.record("rejected", &note.to.email).await;
        Ok(())
    }

    async fn rating_received(&self, note: &RatingNote) -> Result<(), NotifyError> {
        self.record("rating", &note.to.email).await;
        Ok(())
    }
}

pub struct FailingNotifier;

#[rocket::async_trait]
impl Notifier for FailingNotifier {
    async fn bid_received(&self, _note: &BidNote) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unavailable".to_string()))
    }

    async fn bid_accepted(&self, _note: &BidNote) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unavailable".to_string()))
    }

    async fn bid_rejected(&self, _note: &BidNote) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unavailable".to_string()))
    }

    async fn rating_received(&self, _note: &RatingNote) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unavailable".to_string()))
    }
}
