//! MongoDB integration - user lookups and the command journal

mod system_logs;
mod users;

use mongodb::{Client, Database};

use crate::config::Config;

/// MongoDB database wrapper
#[derive(Clone)]
pub struct MongoDb {
    db: Database,
}

impl MongoDb {
    /// Connect to MongoDB database
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let url = config
            .database
            .mongodb_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("MongoDB URL not configured"))?;

        tracing::info!("Connecting to MongoDB...");

        let client = Client::with_uri_str(url).await?;
        let db = client.database(&config.database.name);

        // Verify connection
        db.run_command(mongodb::bson::doc! { "ping": 1 }, None)
            .await?;

        tracing::info!("MongoDB connected successfully ({})", config.database.name);

        Ok(Self { db })
    }
}
