use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{Project, Rating, RatingResponse, SubmitRatingDto, UserRole};
use crate::services::rating::{RatingError, RatingSubmission};
use crate::services::CoreServices;
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Rating")]
#[post("/rating/create", data = "<dto>")]
pub async fn submit_rating(
    db: &State<DbConn>,
    services: &State<CoreServices>,
    auth: AuthGuard,
    dto: Json<SubmitRatingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != UserRole::Builder {
        return Err(ApiError::forbidden("Only builders can rate contractors"));
    }
    if dto.review_text.trim().is_empty() {
        return Err(ApiError::bad_request("A review is required"));
    }

    let project_id = ObjectId::parse_str(&dto.project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;
    let contractor_id = ObjectId::parse_str(&dto.contractor_id)
        .map_err(|_| ApiError::bad_request("Invalid contractor ID"))?;

    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": project_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.builder_id != auth.user_id {
        return Err(ApiError::forbidden("Not authorized to rate this project"));
    }

    let rating = services
        .rating
        .submit_rating(RatingSubmission {
            project_id,
            contractor_id,
            builder_id: auth.user_id,
            rating: dto.rating,
            quality_rating: dto.quality_rating,
            communication_rating: dto.communication_rating,
            timeline_rating: dto.timeline_rating,
            budget_rating: dto.budget_rating,
            review_title: dto.review_title.clone(),
            review_text: dto.review_text.clone(),
            would_hire_again: dto.would_hire_again.unwrap_or(true),
        })
        .await
        .map_err(|e| match e {
            RatingError::InvalidScore | RatingError::ProjectNotEligible => {
                ApiError::bad_request(e.to_string())
            }
            RatingError::DuplicateRating | RatingError::PersistenceConflict => {
                ApiError::conflict(e.to_string())
            }
            RatingError::Storage(_) => ApiError::internal_error(e.to_string()),
        })?;

    Ok(Json(ApiResponse::success_with_message(
        "Rating submitted successfully".to_string(),
        serde_json::json!({ "rating": RatingResponse::from(rating) }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ContractorRatingsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Rating")]
#[get("/rating/contractor/<contractor_id>?<query..>")]
pub async fn get_contractor_ratings(
    db: &State<DbConn>,
    contractor_id: String,
    query: ContractorRatingsQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let object_id = ObjectId::parse_str(&contractor_id)
        .map_err(|_| ApiError::bad_request("Invalid contractor ID"))?;

    let filter = doc! { "contractor_id": object_id };

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db
        .collection::<Rating>("ratings")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut ratings = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let rating = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        ratings.push(RatingResponse::from(rating));
    }

    let total = db
        .collection::<Rating>("ratings")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "ratings": ratings,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}
