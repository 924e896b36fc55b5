//! User lookups for the auth gate
//!
//! Collection: `users` (managed by the login service)

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use super::MongoDb;
use crate::auth::UserStore;

#[async_trait]
impl UserStore for MongoDb {
    async fn is_active(&self, user_id: &str) -> anyhow::Result<bool> {
        let Ok(oid) = ObjectId::parse_str(user_id) else {
            tracing::debug!("Token references malformed user id {}", user_id);
            return Ok(false);
        };

        let user = self
            .db
            .collection::<Document>("users")
            .find_one(doc! { "_id": oid }, None)
            .await?;

        Ok(user.as_ref().map(is_active_document).unwrap_or(false))
    }
}

/// Users without an `isActive` flag predate the field and count as active
fn is_active_document(user: &Document) -> bool {
    match user.get("isActive") {
        None | Some(Bson::Null) => true,
        Some(Bson::Boolean(active)) => *active,
        Some(other) => {
            tracing::warn!("Unexpected isActive value {:?}, treating user as inactive", other);
            false
        }
    }
}
