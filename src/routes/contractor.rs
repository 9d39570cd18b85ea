use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    ContractorProfile, ContractorProfileResponse, CreateContractorProfileDto,
    UpdateContractorProfileDto, UserRole,
};
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Contractor")]
#[post("/contractor/profile", data = "<dto>")]
pub async fn create_contractor_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateContractorProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != UserRole::Contractor {
        return Err(ApiError::forbidden("Only contractors can create a contractor profile"));
    }

    let profiles = db.collection::<ContractorProfile>("contractor_profiles");
    let existing = profiles
        .find_one(doc! { "user_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Contractor profile already exists"));
    }

    let now = DateTime::now();
    let profile = ContractorProfile {
        id: None,
        user_id: auth.user_id,
        specializations: dto.specializations.clone(),
        experience_years: dto.experience_years,
        team_size: dto.team_size,
        service_locations: dto.service_locations.clone(),
        bio: dto.bio.clone(),
        rating: 0.0,
        rating_count: 0,
        quality_rating: 0.0,
        communication_rating: 0.0,
        timeline_rating: 0.0,
        budget_rating: 0.0,
        completed_projects: 0,
        created_at: now,
        updated_at: now,
    };

    let result = profiles
        .insert_one(&profile, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create profile: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Contractor profile created".to_string(),
        serde_json::json!({
            "profile_id": result.inserted_id.as_object_id()
                .ok_or_else(|| ApiError::internal_error("Invalid profile ID"))?
                .to_hex()
        }),
    )))
}

#[openapi(tag = "Contractor")]
#[get("/contractor/profile")]
pub async fn get_contractor_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let profile = db
        .collection::<ContractorProfile>("contractor_profiles")
        .find_one(doc! { "user_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Contractor profile not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "profile": ContractorProfileResponse::from(profile)
    }))))
}

#[openapi(tag = "Contractor")]
#[get("/contractor/<user_id>")]
pub async fn get_contractor_profile_by_id(
    db: &State<DbConn>,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid contractor ID"))?;

    let profile = db
        .collection::<ContractorProfile>("contractor_profiles")
        .find_one(doc! { "user_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Contractor profile not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "profile": ContractorProfileResponse::from(profile)
    }))))
}

#[openapi(tag = "Contractor")]
#[put("/contractor/profile", data = "<dto>")]
pub async fn update_contractor_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<UpdateContractorProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    // The reputation fields are owned by the rating path and cannot be set
    // through this endpoint.
    let mut update = doc! { "updated_at": DateTime::now() };
    if let Some(specializations) = &dto.specializations {
        update.insert("specializations", specializations);
    }
    if let Some(experience_years) = dto.experience_years {
        update.insert("experience_years", experience_years);
    }
    if let Some(team_size) = dto.team_size {
        update.insert("team_size", team_size);
    }
    if let Some(service_locations) = &dto.service_locations {
        update.insert("service_locations", service_locations);
    }
    if let Some(bio) = &dto.bio {
        update.insert("bio", bio);
    }

    let result = db
        .collection::<ContractorProfile>("contractor_profiles")
        .update_one(
            doc! { "user_id": auth.user_id },
            doc! { "$set": update },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update profile: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Contractor profile not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Profile updated successfully"
    }))))
}
