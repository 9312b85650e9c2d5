//! QMS Metrics Database Module
//! MongoDB client bootstrap with explicit timeouts and no driver retries

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::config::MongoConfig;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid MongoDB connection string: {0}")]
    InvalidUri(mongodb::error::Error),
    #[error("Failed to create MongoDB client: {0}")]
    ClientError(mongodb::error::Error),
    #[error("MongoDB server unreachable: {0}")]
    Unreachable(mongodb::error::Error),
}

/// Handle on one MongoDB database, shared by every metrics request
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    /// Build the client and confirm the server answers a `ping`
    pub async fn connect(config: &MongoConfig) -> Result<Self, DatabaseError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(DatabaseError::InvalidUri)?;

        options.app_name = Some(config.app_name.clone());
        options.connect_timeout = Some(Duration::from_millis(config.connect_timeout_ms));
        options.server_selection_timeout =
            Some(Duration::from_millis(config.server_selection_timeout_ms));
        // A failed admin command is terminal for the request that issued it.
        options.retry_reads = Some(false);
        options.retry_writes = Some(false);

        let client = Client::with_options(options).map_err(DatabaseError::ClientError)?;
        let db = Self {
            client,
            name: config.database.clone(),
        };

        db.ping().await?;
        info!(database = %db.name, "connected to MongoDB");
        Ok(db)
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DatabaseError::Unreachable)?;
        debug!("ping ok");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inspected database
    pub fn handle(&self) -> mongodb::Database {
        self.client.database(&self.name)
    }

    /// The `admin` database, target of server-wide commands
    pub fn admin(&self) -> mongodb::Database {
        self.client.database("admin")
    }
}
