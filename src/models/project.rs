use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Open,
    Awarded,
    Completed,
    Cancelled,
}

/// A construction tender posted by a builder. `awarded_to` is set exactly
/// when the status moves to awarded and stays set through completion.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub builder_id: ObjectId,
    pub title: String,
    pub description: String,
    pub project_type: String,
    pub location: String,
    pub city: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub bidding_deadline: DateTime,
    pub start_date: Option<DateTime>,
    pub duration_days: Option<i32>,
    pub required_specializations: Vec<String>,
    pub status: ProjectStatus,
    pub awarded_to: Option<ObjectId>,
    pub is_rated: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateProjectDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub project_type: String,
    pub location: String,
    pub city: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub bidding_deadline: chrono::DateTime<chrono::Utc>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_days: Option<i32>,
    pub required_specializations: Vec<String>,
}

#[derive(Debug, FromForm, Deserialize, JsonSchema)]
pub struct ProjectListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub builder_id: String,
    pub title: String,
    pub description: String,
    pub project_type: String,
    pub location: String,
    pub city: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub bidding_deadline: String,
    pub start_date: Option<String>,
    pub duration_days: Option<i32>,
    pub required_specializations: Vec<String>,
    pub status: ProjectStatus,
    pub awarded_to: Option<String>,
    pub is_rated: bool,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        ProjectResponse {
            id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
            builder_id: project.builder_id.to_hex(),
            title: project.title,
            description: project.description,
            project_type: project.project_type,
            location: project.location,
            city: project.city,
            budget_min: project.budget_min,
            budget_max: project.budget_max,
            bidding_deadline: rfc3339(project.bidding_deadline),
            start_date: project.start_date.map(rfc3339),
            duration_days: project.duration_days,
            required_specializations: project.required_specializations,
            status: project.status,
            awarded_to: project.awarded_to.map(|id| id.to_hex()),
            is_rated: project.is_rated,
            created_at: rfc3339(project.created_at),
        }
    }
}

pub(crate) fn rfc3339(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}
