use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use super::project::rfc3339;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A contractor's priced proposal against a project. A contractor holds at
/// most one bid per project (enforced by a unique index); re-submitting
/// replaces the pending row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bid {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub contractor_id: ObjectId,
    pub quoted_price: f64,
    pub estimated_duration: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct SubmitBidDto {
    pub project_id: String,
    pub quoted_price: f64,
    #[validate(range(min = 1, message = "Estimated duration must be at least one day"))]
    pub estimated_duration: i32,
    #[validate(length(min = 1, message = "A proposal is required"))]
    pub proposal: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BidResponse {
    pub id: String,
    pub project_id: String,
    pub contractor_id: String,
    pub quoted_price: f64,
    pub estimated_duration: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: String,
}

impl From<Bid> for BidResponse {
    fn from(bid: Bid) -> Self {
        BidResponse {
            id: bid.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: bid.project_id.to_hex(),
            contractor_id: bid.contractor_id.to_hex(),
            quoted_price: bid.quoted_price,
            estimated_duration: bid.estimated_duration,
            proposal: bid.proposal,
            status: bid.status,
            created_at: rfc3339(bid.created_at),
        }
    }
}
