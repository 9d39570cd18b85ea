use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use validator::Validate;

use crate::db::DbConn;
use crate::models::{LoginDto, Profile, ProfileResponse, RefreshTokenDto, SignupDto};
use crate::services::JwtService;
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Auth")]
#[post("/auth/signup", data = "<dto>")]
pub async fn signup(
    db: &State<DbConn>,
    dto: Json<SignupDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !crate::utils::validation::validate_phone(&dto.phone) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }

    let existing = db
        .collection::<Profile>("profiles")
        .find_one(doc! { "email": &dto.email }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("An account with this email already exists"));
    }

    let password_hash = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Failed to hash password: {}", e)))?;

    let now = DateTime::now();
    let mut profile = Profile {
        id: None,
        email: dto.email.clone(),
        password_hash,
        full_name: dto.full_name.clone(),
        company_name: dto.company_name.clone(),
        phone: dto.phone.clone(),
        role: dto.role,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Profile>("profiles")
        .insert_one(&profile, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create account: {}", e)))?;
    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid profile ID"))?;
    profile.id = Some(user_id);

    let access_token = JwtService::generate_access_token(&user_id, profile.role)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))?;
    let refresh_token = JwtService::generate_refresh_token(&user_id, profile.role)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Account created successfully".to_string(),
        serde_json::json!({
            "user": ProfileResponse::from(profile),
            "access_token": access_token,
            "refresh_token": refresh_token
        }),
    )))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let profile = db
        .collection::<Profile>("profiles")
        .find_one(doc! { "email": &dto.email }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let valid = bcrypt::verify(&dto.password, &profile.password_hash)
        .map_err(|e| ApiError::internal_error(format!("Failed to verify password: {}", e)))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let user_id = profile
        .id
        .ok_or_else(|| ApiError::internal_error("Profile has no ID"))?;
    let access_token = JwtService::generate_access_token(&user_id, profile.role)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))?;
    let refresh_token = JwtService::generate_refresh_token(&user_id, profile.role)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "user": ProfileResponse::from(profile),
        "access_token": access_token,
        "refresh_token": refresh_token
    }))))
}

#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<dto>")]
pub async fn refresh_token(
    dto: Json<RefreshTokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let claims = JwtService::verify_token(&dto.refresh_token, true)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid token subject"))?;

    let access_token = JwtService::generate_access_token(&user_id, claims.role)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "access_token": access_token
    }))))
}
