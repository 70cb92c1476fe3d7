//! Connecting with another user by scanning their QR code.

use api::models::Profile;
use api::{parse_profile_link, Backend, HomeeApi};

use crate::error::FlowError;

/// Resolve a scanned profile link and add that user as a friend of `me`.
pub async fn connect_via_link<B: Backend>(
    api: &HomeeApi<B>,
    me: &str,
    url: &str,
    domain: &str,
) -> Result<Profile, FlowError> {
    let handle = parse_profile_link(url, domain)?;
    let profile = api
        .resolve_profile_handle(&handle)
        .await?
        .ok_or(FlowError::ProfileNotFound)?;
    if profile.id == me {
        return Err(FlowError::SelfConnection);
    }

    if api.add_friend(me, &profile.id).await? {
        tracing::info!("Connected {} with {}", me, profile.id);
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{profile_link, MemoryBackend, ProfileHandle};
    use serde_json::json;

    const DOMAIN: &str = "homee.app";
    const BEN_ID: &str = "6f1c2d3e-4a5b-4c6d-8e7f-9a0b1c2d3e4f";

    fn setup() -> (MemoryBackend, HomeeApi<MemoryBackend>) {
        let backend = MemoryBackend::new();
        backend
            .seed(
                "users",
                &[
                    json!({"id": "me", "email": "ana@example.com", "username": "ana"}),
                    json!({"id": BEN_ID, "email": "ben@example.com", "username": "ben"}),
                ],
            )
            .unwrap();
        (backend.clone(), HomeeApi::new(backend, "images"))
    }

    #[tokio::test]
    async fn test_connect_by_username_and_by_id() {
        let (backend, api) = setup();

        let link = profile_link(DOMAIN, &ProfileHandle::Username("ben".to_string()));
        let ben = connect_via_link(&api, "me", &link, DOMAIN).await.unwrap();
        assert_eq!(ben.id, BEN_ID);

        let again = connect_via_link(&api, "me", "https://homee.app/profile/Ben", DOMAIN)
            .await
            .unwrap();
        assert_eq!(again.id, BEN_ID);

        let link = profile_link(DOMAIN, &ProfileHandle::Id(BEN_ID.to_string()));
        connect_via_link(&api, "me", &link, DOMAIN).await.unwrap();

        // Scanning twice does not duplicate the friendship
        assert_eq!(backend.rows("friends").len(), 1);
        assert_eq!(api.friends_of("me").await.unwrap(), vec![ben]);
    }

    #[tokio::test]
    async fn test_rejects_bad_links_and_self() {
        let (backend, api) = setup();

        let result = connect_via_link(&api, "me", "https://other.app/profile/ben", DOMAIN).await;
        assert!(matches!(result, Err(FlowError::Link(_))));
        assert_eq!(backend.calls().select, 0);

        let result =
            connect_via_link(&api, "me", "https://homee.app/profile/nobody", DOMAIN).await;
        assert!(matches!(result, Err(FlowError::ProfileNotFound)));

        let result = connect_via_link(&api, "me", "https://homee.app/profile/ana", DOMAIN).await;
        assert!(matches!(result, Err(FlowError::SelfConnection)));
        assert!(backend.rows("friends").is_empty());
    }
}
