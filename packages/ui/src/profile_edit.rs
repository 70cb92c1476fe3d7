//! Saving the edit-profile screen.
//!
//! Avatar and background uploads run concurrently and fail independently: a
//! failed upload only keeps its own field unchanged, and the text fields plus
//! any successful upload are still saved.

use api::models::{Profile, ProfileUpdate};
use api::{ApiError, Backend, HomeeApi, UploadKind};

use crate::error::FlowError;
use crate::validation::{validate_name, validate_username};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Changes made on the edit screen; `None` means untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileEdits {
    pub username: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<ImageUpload>,
    pub background: Option<ImageUpload>,
}

#[derive(Debug, Default)]
pub struct ProfileSaveReport {
    /// The saved row, or `None` when nothing was left to write.
    pub profile: Option<Profile>,
    pub avatar_error: Option<ApiError>,
    pub background_error: Option<ApiError>,
}

impl ProfileSaveReport {
    pub fn is_complete(&self) -> bool {
        self.avatar_error.is_none() && self.background_error.is_none()
    }
}

async fn upload<B: Backend>(
    api: &HomeeApi<B>,
    kind: UploadKind,
    user_id: &str,
    image: Option<ImageUpload>,
) -> Option<Result<String, ApiError>> {
    let image = image?;
    Some(
        api.upload_image(kind, user_id, image.bytes, &image.content_type)
            .await,
    )
}

/// Validate, upload both images at once, then write one profile update.
pub async fn save_profile_edits<B: Backend>(
    api: &HomeeApi<B>,
    user_id: &str,
    edits: ProfileEdits,
) -> Result<ProfileSaveReport, FlowError> {
    let username = edits.username.map(|u| u.trim().to_string());
    let name = edits.name.map(|n| n.trim().to_string());
    if let Some(username) = &username {
        validate_username(username)?;
        if !api.username_available(username, Some(user_id)).await? {
            return Err(FlowError::UsernameTaken);
        }
    }
    if let Some(name) = &name {
        validate_name(name)?;
    }

    let (avatar, background) = futures::join!(
        upload(api, UploadKind::Avatar, user_id, edits.avatar),
        upload(api, UploadKind::Background, user_id, edits.background),
    );

    let mut report = ProfileSaveReport::default();
    let mut update = ProfileUpdate {
        username,
        name,
        bio: edits.bio,
        ..ProfileUpdate::default()
    };
    match avatar {
        Some(Ok(url)) => update.avatar_url = Some(url),
        Some(Err(e)) => {
            tracing::warn!("Avatar upload failed: {}", e);
            report.avatar_error = Some(e);
        }
        None => {}
    }
    match background {
        Some(Ok(url)) => update.background_url = Some(url),
        Some(Err(e)) => {
            tracing::warn!("Background upload failed: {}", e);
            report.background_error = Some(e);
        }
        None => {}
    }

    if !update.is_empty() {
        report.profile = Some(api.update_profile(user_id, &update).await?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::MemoryBackend;
    use serde_json::json;

    fn setup() -> (MemoryBackend, HomeeApi<MemoryBackend>) {
        let backend = MemoryBackend::new();
        backend
            .seed(
                "users",
                &[
                    json!({"id": "u1", "email": "ana@example.com", "username": "ana"}),
                    json!({"id": "u2", "email": "ben@example.com", "username": "ben"}),
                ],
            )
            .unwrap();
        (backend.clone(), HomeeApi::new(backend, "images"))
    }

    fn png() -> Option<ImageUpload> {
        Some(ImageUpload {
            bytes: vec![0x89, 0x50],
            content_type: "image/png".to_string(),
        })
    }

    #[tokio::test]
    async fn test_saves_text_and_both_images() {
        let (backend, api) = setup();
        let edits = ProfileEdits {
            name: Some("Ana B".to_string()),
            bio: Some("hi".to_string()),
            avatar: png(),
            background: png(),
            ..ProfileEdits::default()
        };

        let report = save_profile_edits(&api, "u1", edits).await.unwrap();

        assert!(report.is_complete());
        let profile = report.profile.unwrap();
        assert_eq!(profile.display_name(), "Ana B");
        assert!(profile.has_avatar());
        assert!(profile.background_url.is_some());
        assert_eq!(backend.calls().upload, 2);
        assert_eq!(backend.calls().update, 1);
    }

    #[tokio::test]
    async fn test_one_failed_upload_keeps_the_other() {
        let (backend, api) = setup();
        backend.fail_uploads_under("backgrounds/");
        let edits = ProfileEdits {
            avatar: png(),
            background: png(),
            ..ProfileEdits::default()
        };

        let report = save_profile_edits(&api, "u1", edits).await.unwrap();

        assert!(report.avatar_error.is_none());
        assert!(report.background_error.is_some());
        let profile = report.profile.unwrap();
        assert!(profile.has_avatar());
        assert!(profile.background_url.is_none());
    }

    #[tokio::test]
    async fn test_all_uploads_failed_writes_nothing() {
        let (backend, api) = setup();
        backend.fail_uploads_under("avatars/");
        let edits = ProfileEdits {
            avatar: png(),
            ..ProfileEdits::default()
        };

        let report = save_profile_edits(&api, "u1", edits).await.unwrap();

        assert!(report.profile.is_none());
        assert!(report.avatar_error.is_some());
        assert_eq!(backend.calls().update, 0);
    }

    #[tokio::test]
    async fn test_invalid_or_taken_username_uploads_nothing() {
        let (backend, api) = setup();
        let edits = ProfileEdits {
            username: Some("Bad Name".to_string()),
            avatar: png(),
            ..ProfileEdits::default()
        };
        assert!(matches!(
            save_profile_edits(&api, "u1", edits).await,
            Err(FlowError::Validation(_))
        ));

        let edits = ProfileEdits {
            username: Some("ben".to_string()),
            avatar: png(),
            ..ProfileEdits::default()
        };
        assert!(matches!(
            save_profile_edits(&api, "u1", edits).await,
            Err(FlowError::UsernameTaken)
        ));
        assert_eq!(backend.calls().upload, 0);
    }
}
