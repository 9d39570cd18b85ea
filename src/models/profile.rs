use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Builder,
    Contractor,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub phone: String,
    pub role: UserRole,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// The denormalized recipient data handed to the notification port.
#[derive(Debug, Clone)]
pub struct Contact {
    pub email: String,
    pub full_name: String,
    pub company_name: Option<String>,
}

impl From<&Profile> for Contact {
    fn from(profile: &Profile) -> Self {
        Contact {
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            company_name: profile.company_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct SignupDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub company_name: Option<String>,
    pub phone: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefreshTokenDto {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub phone: String,
    pub role: UserRole,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        ProfileResponse {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: profile.email,
            full_name: profile.full_name,
            company_name: profile.company_name,
            phone: profile.phone,
            role: profile.role,
        }
    }
}
