//! Command journal
//!
//! Collection: `system_logs`
//! One document per command the device accepted.

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson;
use serde::{Deserialize, Serialize};

use super::MongoDb;
use crate::commands::CommandJournal;
use crate::models::{Command, Identity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogDoc {
    /// "mode_change" | "brightness_change"
    pub action: String,
    pub value: serde_json::Value,
    pub username: String,
    pub user_id: String,
    pub created_at: String,
}

impl SystemLogDoc {
    pub fn for_command(command: &Command, issuer: &Identity) -> Self {
        Self {
            action: command.action().to_string(),
            value: command.value(),
            username: issuer.username.clone(),
            user_id: issuer.id.clone(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait]
impl CommandJournal for MongoDb {
    async fn record(&self, command: &Command, issuer: &Identity) -> anyhow::Result<()> {
        let entry = SystemLogDoc::for_command(command, issuer);
        let document = bson::to_document(&entry)?;

        self.db
            .collection::<bson::Document>("system_logs")
            .insert_one(document, None)
            .await?;

        Ok(())
    }
}
