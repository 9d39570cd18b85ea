use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use super::project::rfc3339;

/// A builder's one-time rating of the contractor a project was awarded to.
/// Immutable once written; uniqueness per (project, contractor) is enforced
/// by a unique index.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rating {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub contractor_id: ObjectId,
    pub builder_id: ObjectId,
    pub rating: i32, // 1-5
    pub quality_rating: i32,
    pub communication_rating: i32,
    pub timeline_rating: i32,
    pub budget_rating: i32,
    pub review_title: Option<String>,
    pub review_text: String,
    pub would_hire_again: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmitRatingDto {
    pub project_id: String,
    pub contractor_id: String,
    pub rating: i32,
    // Dimension scores fall back to the overall rating when omitted.
    pub quality_rating: Option<i32>,
    pub communication_rating: Option<i32>,
    pub timeline_rating: Option<i32>,
    pub budget_rating: Option<i32>,
    pub review_title: Option<String>,
    pub review_text: String,
    pub would_hire_again: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RatingResponse {
    pub id: String,
    pub project_id: String,
    pub contractor_id: String,
    pub builder_id: String,
    pub rating: i32,
    pub quality_rating: i32,
    pub communication_rating: i32,
    pub timeline_rating: i32,
    pub budget_rating: i32,
    pub review_title: Option<String>,
    pub review_text: String,
    pub would_hire_again: bool,
    pub created_at: String,
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        RatingResponse {
            id: rating.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: rating.project_id.to_hex(),
            contractor_id: rating.contractor_id.to_hex(),
            builder_id: rating.builder_id.to_hex(),
            rating: rating.rating,
            quality_rating: rating.quality_rating,
            communication_rating: rating.communication_rating,
            timeline_rating: rating.timeline_rating,
            budget_rating: rating.budget_rating,
            review_title: rating.review_title,
            review_text: rating.review_text,
            would_hire_again: rating.would_hire_again,
            created_at: rfc3339(rating.created_at),
        }
    }
}
