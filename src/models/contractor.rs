use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractorProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub specializations: Vec<String>,
    pub experience_years: Option<i32>,
    pub team_size: Option<i32>,
    pub service_locations: Vec<String>,
    pub bio: Option<String>,

    // Reputation fields below are a derived cache, written only by the
    // rating aggregation path. Everything else treats them as read-only.
    pub rating: f64,
    pub rating_count: i32,
    pub quality_rating: f64,
    pub communication_rating: f64,
    pub timeline_rating: f64,
    pub budget_rating: f64,
    pub completed_projects: i32,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Recomputed-from-scratch reputation statistics for a contractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Reputation {
    pub average_rating: f64,
    pub rating_count: i32,
    pub quality_rating: f64,
    pub communication_rating: f64,
    pub timeline_rating: f64,
    pub budget_rating: f64,
    pub completed_projects: i32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateContractorProfileDto {
    pub specializations: Vec<String>,
    pub experience_years: Option<i32>,
    pub team_size: Option<i32>,
    pub service_locations: Vec<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateContractorProfileDto {
    pub specializations: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub team_size: Option<i32>,
    pub service_locations: Option<Vec<String>>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ContractorProfileResponse {
    pub id: String,
    pub user_id: String,
    pub specializations: Vec<String>,
    pub experience_years: Option<i32>,
    pub team_size: Option<i32>,
    pub service_locations: Vec<String>,
    pub bio: Option<String>,
    pub rating: f64,
    pub rating_count: i32,
    pub quality_rating: f64,
    pub communication_rating: f64,
    pub timeline_rating: f64,
    pub budget_rating: f64,
    pub completed_projects: i32,
}

impl From<ContractorProfile> for ContractorProfileResponse {
    fn from(profile: ContractorProfile) -> Self {
        ContractorProfileResponse {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: profile.user_id.to_hex(),
            specializations: profile.specializations,
            experience_years: profile.experience_years,
            team_size: profile.team_size,
            service_locations: profile.service_locations,
            bio: profile.bio,
            rating: profile.rating,
            rating_count: profile.rating_count,
            quality_rating: profile.quality_rating,
            communication_rating: profile.communication_rating,
            timeline_rating: profile.timeline_rating,
            budget_rating: profile.budget_rating,
            completed_projects: profile.completed_projects,
        }
    }
}
