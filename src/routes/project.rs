use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use validator::Validate;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    CreateProjectDto, Project, ProjectListQuery, ProjectResponse, ProjectStatus, UserRole,
};
use crate::services::award::AwardError;
use crate::services::CoreServices;
use crate::utils::{ApiResponse, ApiError};

fn award_error(e: AwardError) -> ApiError {
    match e {
        AwardError::ProjectNotFound | AwardError::BidNotFound => ApiError::not_found(e.to_string()),
        AwardError::ProjectNotOpen
        | AwardError::BidNotPending
        | AwardError::PersistenceConflict => ApiError::conflict(e.to_string()),
        AwardError::Storage(_) => ApiError::internal_error(e.to_string()),
    }
}

#[openapi(tag = "Project")]
#[post("/project/create", data = "<dto>")]
pub async fn create_project(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateProjectDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != UserRole::Builder {
        return Err(ApiError::forbidden("Only builders can post projects"));
    }
    dto.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if dto.budget_min < 0.0 || dto.budget_min > dto.budget_max {
        return Err(ApiError::bad_request("Budget range is invalid"));
    }

    let deadline = DateTime::from_millis(dto.bidding_deadline.timestamp_millis());
    if deadline <= DateTime::now() {
        return Err(ApiError::bad_request("Bidding deadline must be in the future"));
    }

    let now = DateTime::now();
    let mut project = Project {
        id: None,
        builder_id: auth.user_id,
        title: dto.title.clone(),
        description: dto.description.clone(),
        project_type: dto.project_type.clone(),
        location: dto.location.clone(),
        city: dto.city.clone(),
        budget_min: dto.budget_min,
        budget_max: dto.budget_max,
        bidding_deadline: deadline,
        start_date: dto
            .start_date
            .map(|d| DateTime::from_millis(d.timestamp_millis())),
        duration_days: dto.duration_days,
        required_specializations: dto.required_specializations.clone(),
        status: ProjectStatus::Open,
        awarded_to: None,
        is_rated: false,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Project>("projects")
        .insert_one(&project, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create project: {}", e)))?;
    project.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Project posted successfully".to_string(),
        serde_json::json!({ "project": ProjectResponse::from(project) }),
    )))
}

#[openapi(tag = "Project")]
#[get("/project/<project_id>")]
pub async fn get_project(
    db: &State<DbConn>,
    project_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;

    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "project": ProjectResponse::from(project)
    }))))
}

#[openapi(tag = "Project")]
#[get("/project/mine?<query..>")]
pub async fn get_my_projects(
    db: &State<DbConn>,
    auth: AuthGuard,
    query: ProjectListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    list_projects(db, doc! { "builder_id": auth.user_id }, query).await
}

#[openapi(tag = "Project")]
#[get("/project/open?<query..>")]
pub async fn get_open_projects(
    db: &State<DbConn>,
    query: ProjectListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut filter = doc! { "status": "open", "bidding_deadline": { "$gt": DateTime::now() } };
    if let Some(city) = &query.city {
        filter.insert("city", city);
    }
    list_projects(db, filter, query).await
}

async fn list_projects(
    db: &State<DbConn>,
    filter: mongodb::bson::Document,
    query: ProjectListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db
        .collection::<Project>("projects")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut projects = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let project = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        projects.push(ProjectResponse::from(project));
    }

    let total = db
        .collection::<Project>("projects")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "projects": projects,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Project")]
#[post("/project/<project_id>/award/<bid_id>")]
pub async fn award_bid(
    db: &State<DbConn>,
    services: &State<CoreServices>,
    auth: AuthGuard,
    project_id: String,
    bid_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let project_oid = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;
    let bid_oid =
        ObjectId::parse_str(&bid_id).map_err(|_| ApiError::bad_request("Invalid bid ID"))?;

    // Only the posting builder may award; the transition itself is guarded
    // inside the award service.
    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": project_oid }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.builder_id != auth.user_id {
        return Err(ApiError::forbidden("Not authorized to award this project"));
    }

    let outcome = services
        .award
        .award_bid(project_oid, bid_oid)
        .await
        .map_err(award_error)?;

    Ok(Json(ApiResponse::success_with_message(
        "Bid accepted and project awarded".to_string(),
        serde_json::json!({
            "project_id": outcome.project_id.to_hex(),
            "awarded_to": outcome.winning_bid.contractor_id.to_hex(),
            "winning_bid": crate::models::BidResponse::from(outcome.winning_bid),
            "rejected_bids": outcome.rejected_bids.len() as i64,
        }),
    )))
}

#[openapi(tag = "Project")]
#[post("/project/<project_id>/complete")]
pub async fn complete_project(
    db: &State<DbConn>,
    auth: AuthGuard,
    project_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;

    let result = db
        .collection::<Project>("projects")
        .update_one(
            doc! { "_id": object_id, "builder_id": auth.user_id, "status": "awarded" },
            doc! { "$set": { "status": "completed", "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::conflict(
            "Only your own awarded projects can be marked completed",
        ));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Project marked as completed"
    }))))
}

#[openapi(tag = "Project")]
#[post("/project/<project_id>/cancel")]
pub async fn cancel_project(
    db: &State<DbConn>,
    auth: AuthGuard,
    project_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;

    let result = db
        .collection::<Project>("projects")
        .update_one(
            doc! { "_id": object_id, "builder_id": auth.user_id, "status": "open" },
            doc! { "$set": { "status": "cancelled", "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::conflict("Only your own open projects can be cancelled"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Project cancelled"
    }))))
}
