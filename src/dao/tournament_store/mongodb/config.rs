use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "tourney_desk";
const PING_ATTEMPTS: u32 = 5;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Parsed client options plus the database holding the tournament collections.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| "tourney-desk".to_owned());

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Build a client and wait until the database answers a ping.
    pub(super) async fn open(&self) -> MongoResult<(Client, Database)> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database_name);

        let mut delay = FIRST_PING_DELAY;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok((client, database)),
                Err(source) if attempts >= PING_ATTEMPTS => {
                    return Err(MongoDaoError::InitialPing { attempts, source });
                }
                Err(err) => {
                    debug!(attempts, database = %self.database_name, error = %err, "MongoDB ping failed; retrying");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_PING_DELAY);
                }
            }
        }
    }
}
