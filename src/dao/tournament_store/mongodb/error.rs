use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to advance id sequence `{sequence}`")]
    Sequence {
        sequence: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to {action} in `{collection}`")]
    Query {
        action: &'static str,
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("stored record `{record}` is invalid: {message}")]
    Decode { record: String, message: String },
}

impl MongoDaoError {
    pub fn query(action: &'static str, collection: &'static str) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Query {
            action,
            collection,
            source,
        }
    }
}
