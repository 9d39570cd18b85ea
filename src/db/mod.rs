use std::sync::Arc;

use log::{error, info};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use rocket::fairing::AdHoc;

use crate::models::{Bid, Profile, Rating};
use crate::services::{CoreServices, EmailNotifier};
use crate::store::MongoStore;

pub fn init() -> AdHoc {
    AdHoc::on_ignite("MongoDB", |rocket| async {
        match connect().await {
            Ok((client, database)) => {
                info!("✓ MongoDB connected successfully");
                if let Err(e) = ensure_indexes(&database).await {
                    error!("✗ Failed to create indexes: {}", e);
                }
                let store = Arc::new(MongoStore::new(client, database.clone()));
                let services = CoreServices::new(store, Arc::new(EmailNotifier));
                rocket.manage(database).manage(services)
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                rocket
            }
        }
    })
}

async fn connect() -> Result<(Client, Database), mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    let database = client.database("buildconnect");
    Ok((client, database))
}

async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<Profile>("profiles")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;

    // One bid per contractor per project; re-submission updates in place.
    db.collection::<Bid>("bids")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "project_id": 1, "contractor_id": 1 })
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;

    // Duplicate ratings for the same award fail closed on insert.
    db.collection::<Rating>("ratings")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "project_id": 1, "contractor_id": 1 })
                .options(unique)
                .build(),
            None,
        )
        .await?;

    Ok(())
}

pub type DbConn = Database;
