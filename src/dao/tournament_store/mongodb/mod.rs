mod config;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoTournamentStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Decode { record, message } => StorageError::corrupted(record, message),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
