//! Flyer images stored in the configured directory.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    dto::{
        flyer::{FlyerDeleted, FlyerDto},
        format_optional_time,
    },
    error::ServiceError,
    services::events,
    state::SharedState,
};

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Image bytes with their content type.
pub struct FlyerFile {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

fn content_type(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, mime)| *mime)
}

/// Check that `filename` is a plain, visible image name.
fn check_name(filename: &str) -> Result<&'static str, ServiceError> {
    let invalid = |reason: &str| ServiceError::InvalidInput(format!("invalid flyer name: {reason}"));
    if filename.is_empty() || filename.contains(['/', '\\', '\0']) {
        return Err(invalid("must be a plain file name"));
    }
    if filename.contains("..") {
        return Err(invalid("must not contain `..`"));
    }
    if filename.starts_with('.') {
        return Err(invalid("hidden files are not served"));
    }
    content_type(filename).ok_or_else(|| invalid("unsupported image type"))
}

fn io_error(err: std::io::Error, filename: &str) -> ServiceError {
    if err.kind() == ErrorKind::NotFound {
        ServiceError::NotFound(format!("flyer `{filename}`"))
    } else {
        ServiceError::Internal(format!("flyer `{filename}`: {err}"))
    }
}

/// Canonical path of `filename`, refusing anything that resolves outside `dir`.
async fn resolve(dir: &Path, filename: &str) -> Result<(PathBuf, &'static str), ServiceError> {
    let mime = check_name(filename)?;
    let root = fs::canonicalize(dir)
        .await
        .map_err(|err| io_error(err, filename))?;
    let path = fs::canonicalize(root.join(filename))
        .await
        .map_err(|err| io_error(err, filename))?;
    if !path.starts_with(&root) {
        warn!(filename, "flyer path escapes the flyer directory");
        return Err(ServiceError::InvalidInput(
            "invalid flyer name: outside the flyer directory".into(),
        ));
    }
    Ok((path, mime))
}

/// Images in the flyer directory, sorted by name. A missing directory lists nothing.
pub async fn list(state: &SharedState) -> Result<Vec<FlyerDto>, ServiceError> {
    let dir = state.config().flyers_dir();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(ServiceError::Internal(format!("flyer directory: {err}"))),
    };

    let mut flyers = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ServiceError::Internal(format!("flyer directory: {err}")))?
    {
        let Ok(filename) = entry.file_name().into_string() else {
            continue;
        };
        if check_name(&filename).is_err() {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        flyers.push(FlyerDto {
            url: format!("/api/flyers/preview/{filename}"),
            size: metadata.len(),
            modified_at: format_optional_time(metadata.modified().ok()),
            filename,
        });
    }
    flyers.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(flyers)
}

pub async fn read(state: &SharedState, filename: &str) -> Result<FlyerFile, ServiceError> {
    let (path, content_type) = resolve(state.config().flyers_dir(), filename).await?;
    let bytes = fs::read(&path)
        .await
        .map_err(|err| io_error(err, filename))?;
    Ok(FlyerFile {
        content_type,
        bytes,
    })
}

pub async fn delete(state: &SharedState, filename: &str) -> Result<FlyerDeleted, ServiceError> {
    let (path, _) = resolve(state.config().flyers_dir(), filename).await?;
    fs::remove_file(&path)
        .await
        .map_err(|err| io_error(err, filename))?;
    info!(filename, "flyer deleted");
    events::broadcast_flyer_deleted(state, filename);
    Ok(FlyerDeleted {
        filename: filename.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tourney-desk-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn names_are_checked() {
        assert_eq!(check_name("finals.PNG").unwrap(), "image/png");
        assert!(check_name("../secret.png").is_err());
        assert!(check_name("nested/flyer.png").is_err());
        assert!(check_name(".hidden.png").is_err());
        assert!(check_name("notes.txt").is_err());
        assert!(check_name("noextension").is_err());
    }

    #[tokio::test]
    async fn lists_reads_and_deletes_images() {
        let dir = temp_dir("flyers");
        std::fs::write(dir.join("finals.png"), b"png").unwrap();
        std::fs::write(dir.join("notes.txt"), b"txt").unwrap();
        let state = AppState::new(AppConfig::default().with_flyers_dir(&dir), None);

        let flyers = list(&state).await.unwrap();
        assert_eq!(flyers.len(), 1);
        assert_eq!(flyers[0].filename, "finals.png");
        assert_eq!(flyers[0].size, 3);

        let file = read(&state, "finals.png").await.unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.bytes, b"png");

        delete(&state, "finals.png").await.unwrap();
        assert!(matches!(
            read(&state, "finals.png").await,
            Err(ServiceError::NotFound(_))
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let state = AppState::new(
            AppConfig::default().with_flyers_dir("/nonexistent/tourney-desk-flyers"),
            None,
        );
        assert!(list(&state).await.unwrap().is_empty());
    }
}
