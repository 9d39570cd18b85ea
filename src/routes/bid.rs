use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use log::warn;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use validator::Validate;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    Bid, BidResponse, BidStatus, Contact, Profile, Project, ProjectStatus, SubmitBidDto, UserRole,
};
use crate::services::award::RejectError;
use crate::services::notify::BidNote;
use crate::services::CoreServices;
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Bid")]
#[post("/bid/submit", data = "<dto>")]
pub async fn submit_bid(
    db: &State<DbConn>,
    services: &State<CoreServices>,
    auth: AuthGuard,
    dto: Json<SubmitBidDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != UserRole::Contractor {
        return Err(ApiError::forbidden("Only contractors can submit bids"));
    }
    dto.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if dto.quoted_price <= 0.0 {
        return Err(ApiError::bad_request("Quoted price must be positive"));
    }

    let project_id = ObjectId::parse_str(&dto.project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;

    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": project_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.status != ProjectStatus::Open {
        return Err(ApiError::bad_request("Bidding is closed for this project"));
    }
    if project.bidding_deadline <= DateTime::now() {
        return Err(ApiError::bad_request("The bidding deadline has passed"));
    }

    let bids = db.collection::<Bid>("bids");
    let existing = bids
        .find_one(
            doc! { "project_id": project_id, "contractor_id": auth.user_id },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let now = DateTime::now();
    let (bid_id, message) = match existing {
        // One active bid per contractor per project: a re-submission
        // replaces the pending row instead of creating a second one.
        Some(bid) if bid.status == BidStatus::Pending => {
            let bid_id = bid.id.ok_or_else(|| ApiError::internal_error("Bid has no ID"))?;
            bids.update_one(
                doc! { "_id": bid_id },
                doc! { "$set": {
                    "quoted_price": dto.quoted_price,
                    "estimated_duration": dto.estimated_duration,
                    "proposal": &dto.proposal,
                    "updated_at": now
                } },
                None,
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to update bid: {}", e)))?;
            (bid_id, "Bid updated successfully")
        }
        Some(_) => {
            return Err(ApiError::conflict(
                "Your bid on this project has already been decided",
            ));
        }
        None => {
            let bid = Bid {
                id: None,
                project_id,
                contractor_id: auth.user_id,
                quoted_price: dto.quoted_price,
                estimated_duration: dto.estimated_duration,
                proposal: dto.proposal.clone(),
                status: BidStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            let result = bids
                .insert_one(&bid, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Failed to submit bid: {}", e)))?;
            let bid_id = result
                .inserted_id
                .as_object_id()
                .ok_or_else(|| ApiError::internal_error("Invalid bid ID"))?;
            (bid_id, "Bid submitted successfully")
        }
    };

    notify_builder(db, services, &project, auth.user_id, dto.quoted_price).await;

    Ok(Json(ApiResponse::success_with_message(
        message.to_string(),
        serde_json::json!({ "bid_id": bid_id.to_hex() }),
    )))
}

/// Best-effort bid-received email to the project's builder.
async fn notify_builder(
    db: &State<DbConn>,
    services: &State<CoreServices>,
    project: &Project,
    contractor_id: ObjectId,
    quoted_price: f64,
) {
    let profiles = db.collection::<Profile>("profiles");
    let builder = match profiles.find_one(doc! { "_id": project.builder_id }, None).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!("No profile found for builder {}", project.builder_id);
            return;
        }
        Err(e) => {
            warn!("Could not look up builder profile: {}", e);
            return;
        }
    };
    let contractor_name = match profiles.find_one(doc! { "_id": contractor_id }, None).await {
        Ok(Some(profile)) => profile.company_name.unwrap_or(profile.full_name),
        _ => "A contractor".to_string(),
    };

    let note = BidNote {
        to: Contact::from(&builder),
        project_id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
        project_title: project.title.clone(),
        quoted_price,
        counterparty: contractor_name,
    };
    if let Err(e) = services.notifier.bid_received(&note).await {
        warn!("Failed to send bid-received notification: {}", e);
    }
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct BidListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Bid")]
#[get("/bid/project/<project_id>?<query..>")]
pub async fn get_project_bids(
    db: &State<DbConn>,
    auth: AuthGuard,
    project_id: String,
    query: BidListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::bad_request("Invalid project ID"))?;

    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.builder_id != auth.user_id {
        return Err(ApiError::forbidden("Not authorized to view these bids"));
    }

    list_bids(db, doc! { "project_id": object_id }, query).await
}

#[openapi(tag = "Bid")]
#[get("/bid/mine?<query..>")]
pub async fn get_my_bids(
    db: &State<DbConn>,
    auth: AuthGuard,
    query: BidListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    list_bids(db, doc! { "contractor_id": auth.user_id }, query).await
}

async fn list_bids(
    db: &State<DbConn>,
    filter: mongodb::bson::Document,
    query: BidListQuery,
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
        .collection::<Bid>("bids")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut bids = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let bid = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        bids.push(BidResponse::from(bid));
    }

    let total = db
        .collection::<Bid>("bids")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "bids": bids,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Bid")]
#[post("/bid/<bid_id>/reject")]
pub async fn reject_bid(
    db: &State<DbConn>,
    services: &State<CoreServices>,
    auth: AuthGuard,
    bid_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&bid_id).map_err(|_| ApiError::bad_request("Invalid bid ID"))?;

    let bid = db
        .collection::<Bid>("bids")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Bid not found"))?;

    let project = db
        .collection::<Project>("projects")
        .find_one(doc! { "_id": bid.project_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.builder_id != auth.user_id {
        return Err(ApiError::forbidden("Not authorized to reject this bid"));
    }

    services
        .award
        .reject_bid(object_id)
        .await
        .map_err(|e| match e {
            RejectError::BidNotFound => ApiError::not_found(e.to_string()),
            RejectError::BidNotPending => ApiError::conflict(e.to_string()),
            RejectError::Storage(_) => ApiError::internal_error(e.to_string()),
        })?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Bid rejected"
    }))))
}
