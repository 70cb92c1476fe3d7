//! # Typed data access
//!
//! [`HomeeApi`] wraps a [`Backend`] with the handful of typed operations the
//! screens need, so that collection names, column names and join logic live in
//! one place instead of being repeated per screen.
//!
//! ## Collections
//!
//! | Collection | Operations |
//! |------------|------------|
//! | `users` | [`profile_by_email`](HomeeApi::profile_by_email), [`profile_by_id`](HomeeApi::profile_by_id), [`profile_by_username`](HomeeApi::profile_by_username), [`create_profile`](HomeeApi::create_profile), [`update_profile`](HomeeApi::update_profile), [`username_available`](HomeeApi::username_available) |
//! | `groups`, `group_members` | [`groups_for_user`](HomeeApi::groups_for_user), [`group`](HomeeApi::group), [`create_group`](HomeeApi::create_group), [`join_group`](HomeeApi::join_group), [`leave_group`](HomeeApi::leave_group), [`group_members`](HomeeApi::group_members) |
//! | `albums`, `images` | [`albums_in_group`](HomeeApi::albums_in_group), [`create_album`](HomeeApi::create_album), [`images_in_album`](HomeeApi::images_in_album), [`add_image`](HomeeApi::add_image) |
//! | `friends` | [`friends_of`](HomeeApi::friends_of), [`add_friend`](HomeeApi::add_friend), [`remove_friend`](HomeeApi::remove_friend) |
//!
//! Blob uploads go through [`upload_image`](HomeeApi::upload_image), which picks
//! a unique object path per [`UploadKind`] and returns the public URL.
//!
//! "Not found" is an `Ok(None)`, never an error: callers branch on it.

use store::{dedupe_groups, Group, GroupMember};

use crate::backend::Backend;
use crate::error::ApiError;
use crate::link::ProfileHandle;
use crate::models::{
    Album, Friend, Image, NewAlbum, NewGroup, NewGroupMember, NewImage, NewProfile, Profile,
    ProfileUpdate, Session,
};
use crate::query::{Direction, Query};

const USERS: &str = "users";
const GROUPS: &str = "groups";
const GROUP_MEMBERS: &str = "group_members";
const ALBUMS: &str = "albums";
const IMAGES: &str = "images";
const FRIENDS: &str = "friends";

/// What an uploaded image is for; decides its folder in the bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    Avatar,
    Background,
    GroupCover,
    AlbumImage,
}

impl UploadKind {
    fn folder(self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::Background => "backgrounds",
            UploadKind::GroupCover => "groups",
            UploadKind::AlbumImage => "albums",
        }
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Typed operations over a [`Backend`].
#[derive(Clone, Debug)]
pub struct HomeeApi<B> {
    backend: B,
    bucket: String,
}

impl<B: Backend> HomeeApi<B> {
    pub fn new(backend: B, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // Auth

    pub async fn send_otp(&self, email: &str, create_user: bool) -> Result<(), ApiError> {
        self.backend.send_otp(email, create_user).await
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ApiError> {
        self.backend.verify_otp(email, code).await
    }

    pub async fn session(&self) -> Option<Session> {
        self.backend.session().await
    }

    /// Session from a previous launch, refreshed if it had expired.
    pub async fn restore_session(&self) -> Option<Session> {
        self.backend.restore_session().await
    }

    pub async fn sign_out(&self) -> Result<(), ApiError> {
        self.backend.sign_out().await
    }

    // Profiles

    async fn first<T: serde::de::DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<Option<T>, ApiError> {
        let rows: Vec<T> = self.backend.select(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, ApiError> {
        self.first(Query::table(USERS).eq("email", email)).await
    }

    pub async fn profile_by_id(&self, id: &str) -> Result<Option<Profile>, ApiError> {
        self.first(Query::table(USERS).eq("id", id)).await
    }

    pub async fn profile_by_username(&self, username: &str) -> Result<Option<Profile>, ApiError> {
        self.first(Query::table(USERS).eq("username", username)).await
    }

    /// Look up the profile a deep link points at.
    pub async fn resolve_profile_handle(
        &self,
        handle: &ProfileHandle,
    ) -> Result<Option<Profile>, ApiError> {
        match handle {
            ProfileHandle::Id(id) => self.profile_by_id(id).await,
            ProfileHandle::Username(username) => self.profile_by_username(username).await,
        }
    }

    /// Whether `username` is free, or already belongs to `current_user`.
    pub async fn username_available(
        &self,
        username: &str,
        current_user: Option<&str>,
    ) -> Result<bool, ApiError> {
        Ok(match self.profile_by_username(username).await? {
            Some(existing) => Some(existing.id.as_str()) == current_user,
            None => true,
        })
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, ApiError> {
        let rows: Vec<Profile> = self.backend.insert(USERS, profile).await?;
        rows.into_iter().next().ok_or(ApiError::NotFound("profile"))
    }

    pub async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, ApiError> {
        let rows: Vec<Profile> = self
            .backend
            .update(&Query::table(USERS).eq("id", id), update)
            .await?;
        rows.into_iter().next().ok_or(ApiError::NotFound("profile"))
    }

    // Groups

    /// Groups the user created or joined, each exactly once.
    pub async fn groups_for_user(&self, user_id: &str) -> Result<Vec<Group>, ApiError> {
        let created: Vec<Group> = self
            .backend
            .select(&Query::table(GROUPS).eq("creator_id", user_id))
            .await?;
        let memberships: Vec<GroupMember> = self
            .backend
            .select(&Query::table(GROUP_MEMBERS).eq("user_id", user_id))
            .await?;

        let joined_ids: Vec<String> = memberships
            .into_iter()
            .map(|m| m.group_id)
            .filter(|id| !created.iter().any(|g| &g.id == id))
            .collect();
        let joined: Vec<Group> = if joined_ids.is_empty() {
            Vec::new()
        } else {
            self.backend
                .select(&Query::table(GROUPS).in_list("id", joined_ids))
                .await?
        };

        Ok(dedupe_groups(created.into_iter().chain(joined)))
    }

    pub async fn group(&self, id: &str) -> Result<Option<Group>, ApiError> {
        self.first(Query::table(GROUPS).eq("id", id)).await
    }

    /// Create a group and make its creator the first member.
    pub async fn create_group(&self, group: &NewGroup) -> Result<Group, ApiError> {
        let rows: Vec<Group> = self.backend.insert(GROUPS, group).await?;
        let created = rows.into_iter().next().ok_or(ApiError::NotFound("group"))?;
        self.join_group(&created.id, &created.creator_id).await?;
        tracing::info!("Created group {}", created.id);
        Ok(created)
    }

    /// Add a membership row unless one already exists.
    pub async fn join_group(&self, group_id: &str, user_id: &str) -> Result<(), ApiError> {
        let existing: Option<GroupMember> = self
            .first(
                Query::table(GROUP_MEMBERS)
                    .eq("group_id", group_id)
                    .eq("user_id", user_id),
            )
            .await?;
        if existing.is_none() {
            let _: Vec<GroupMember> = self
                .backend
                .insert(GROUP_MEMBERS, &NewGroupMember { group_id, user_id })
                .await?;
        }
        Ok(())
    }

    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.backend
            .delete(
                &Query::table(GROUP_MEMBERS)
                    .eq("group_id", group_id)
                    .eq("user_id", user_id),
            )
            .await
    }

    pub async fn group_members(&self, group_id: &str) -> Result<Vec<Profile>, ApiError> {
        let members: Vec<GroupMember> = self
            .backend
            .select(&Query::table(GROUP_MEMBERS).eq("group_id", group_id))
            .await?;
        self.profiles_by_ids(members.into_iter().map(|m| m.user_id).collect())
            .await
    }

    // Albums and images

    pub async fn albums_in_group(&self, group_id: &str) -> Result<Vec<Album>, ApiError> {
        self.backend
            .select(
                &Query::table(ALBUMS)
                    .eq("group_id", group_id)
                    .order("created_at", Direction::Desc),
            )
            .await
    }

    pub async fn create_album(&self, album: &NewAlbum) -> Result<Album, ApiError> {
        let rows: Vec<Album> = self.backend.insert(ALBUMS, album).await?;
        rows.into_iter().next().ok_or(ApiError::NotFound("album"))
    }

    pub async fn images_in_album(&self, album_id: &str) -> Result<Vec<Image>, ApiError> {
        self.backend
            .select(
                &Query::table(IMAGES)
                    .eq("album_id", album_id)
                    .order("created_at", Direction::Desc),
            )
            .await
    }

    pub async fn add_image(&self, album_id: &str, url: &str) -> Result<Image, ApiError> {
        let image = NewImage {
            url: url.to_string(),
            album_id: album_id.to_string(),
        };
        let rows: Vec<Image> = self.backend.insert(IMAGES, &image).await?;
        rows.into_iter().next().ok_or(ApiError::NotFound("image"))
    }

    /// Upload image bytes under a fresh path and return their public URL.
    pub async fn upload_image(
        &self,
        kind: UploadKind,
        owner_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ApiError> {
        let path = format!(
            "{}/{owner_id}/{}.{}",
            kind.folder(),
            uuid::Uuid::new_v4(),
            extension_for(content_type)
        );
        self.backend
            .upload(&self.bucket, &path, bytes, content_type)
            .await?;
        Ok(self.backend.public_url(&self.bucket, &path))
    }

    // Friends

    async fn profiles_by_ids(&self, ids: Vec<String>) -> Result<Vec<Profile>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.backend
            .select(&Query::table(USERS).in_list("id", ids))
            .await
    }

    pub async fn friends_of(&self, user_id: &str) -> Result<Vec<Profile>, ApiError> {
        let rows: Vec<Friend> = self
            .backend
            .select(
                &Query::table(FRIENDS)
                    .eq("user_id", user_id)
                    .order("created_at", Direction::Desc),
            )
            .await?;
        self.profiles_by_ids(rows.into_iter().map(|f| f.friend_id).collect())
            .await
    }

    /// Record `friend_id` as a friend of `user_id`. Returns `false` when the
    /// row already existed or both ids are the same user.
    pub async fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<bool, ApiError> {
        if user_id == friend_id {
            return Ok(false);
        }
        let existing: Option<Friend> = self
            .first(
                Query::table(FRIENDS)
                    .eq("user_id", user_id)
                    .eq("friend_id", friend_id),
            )
            .await?;
        if existing.is_some() {
            return Ok(false);
        }
        let row = Friend {
            user_id: user_id.to_string(),
            friend_id: friend_id.to_string(),
            created_at: None,
        };
        let _: Vec<Friend> = self.backend.insert(FRIENDS, &row).await?;
        Ok(true)
    }

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ApiError> {
        self.backend
            .delete(
                &Query::table(FRIENDS)
                    .eq("user_id", user_id)
                    .eq("friend_id", friend_id),
            )
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    pub(crate) fn api() -> (MemoryBackend, HomeeApi<MemoryBackend>) {
        let backend = MemoryBackend::new();
        (backend.clone(), HomeeApi::new(backend, "images"))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    pub(crate) fn group_row(id: &str, creator: &str, members: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Group {id}"),
            "is_public": false,
            "member_count": members,
            "created_at": at(0),
            "creator_id": creator,
        })
    }

    fn profile_row(id: &str, username: &str) -> serde_json::Value {
        json!({
            "id": id,
            "email": format!("{username}@example.com"),
            "username": username,
        })
    }

    #[tokio::test]
    async fn test_groups_for_user_merges_created_and_joined() {
        let (backend, api) = api();
        backend
            .seed(
                "groups",
                &[
                    group_row("g1", "me", 2),
                    group_row("g2", "other", 5),
                    group_row("g3", "other", 1),
                ],
            )
            .unwrap();
        backend
            .seed(
                "group_members",
                &[
                    json!({"group_id": "g1", "user_id": "me"}),
                    json!({"group_id": "g2", "user_id": "me"}),
                    json!({"group_id": "g3", "user_id": "someone"}),
                ],
            )
            .unwrap();

        let groups = api.groups_for_user("me").await.unwrap();
        let mut ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["g1", "g2"]);
    }

    #[tokio::test]
    async fn test_groups_for_user_without_memberships() {
        let (backend, api) = api();
        backend.seed("groups", &[group_row("g1", "me", 1)]).unwrap();
        assert_eq!(api.groups_for_user("me").await.unwrap().len(), 1);
        // created + memberships, no third query when nothing was joined
        assert_eq!(backend.calls().select, 2);
    }

    #[tokio::test]
    async fn test_create_group_adds_creator_membership() {
        let (backend, api) = api();
        let group = api
            .create_group(&NewGroup {
                title: "Family".to_string(),
                image_url: None,
                is_public: false,
                creator_id: "me".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(group.title, "Family");
        let members = backend.rows("group_members");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["group_id"], group.id.as_str());
        assert_eq!(members[0]["user_id"], "me");

        // Joining again does not duplicate the row
        api.join_group(&group.id, "me").await.unwrap();
        assert_eq!(backend.rows("group_members").len(), 1);

        api.leave_group(&group.id, "me").await.unwrap();
        assert!(backend.rows("group_members").is_empty());
    }

    #[tokio::test]
    async fn test_profile_lookups() {
        let (backend, api) = api();
        backend
            .seed("users", &[profile_row("u1", "ana"), profile_row("u2", "ben")])
            .unwrap();

        assert_eq!(api.profile_by_id("u2").await.unwrap().unwrap().username, "ben");
        assert_eq!(
            api.profile_by_email("ana@example.com").await.unwrap().unwrap().id,
            "u1"
        );
        assert!(api.profile_by_username("cleo").await.unwrap().is_none());

        assert!(api.username_available("cleo", None).await.unwrap());
        assert!(!api.username_available("ana", Some("u2")).await.unwrap());
        assert!(api.username_available("ana", Some("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_and_update_profile() {
        let (_, api) = api();
        let profile = api
            .create_profile(&NewProfile {
                id: "u1".to_string(),
                email: "ana@example.com".to_string(),
                username: "ana".to_string(),
                name: "Ana".to_string(),
            })
            .await
            .unwrap();
        assert!(!profile.has_avatar());

        let updated = api
            .update_profile(
                "u1",
                &ProfileUpdate {
                    avatar_url: Some("https://cdn/a.png".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.has_avatar());
        assert_eq!(updated.display_name(), "Ana");
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let (_, api) = api();
        let err = api
            .update_profile("nobody", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_albums_and_images() {
        let (backend, api) = api();
        let album = api
            .create_album(&NewAlbum {
                title: "Summer".to_string(),
                bio: None,
                group_id: "g1".to_string(),
                creator_id: "me".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(api.albums_in_group("g1").await.unwrap(), vec![album.clone()]);

        let url = api
            .upload_image(UploadKind::AlbumImage, &album.id, vec![9, 9], "image/jpeg")
            .await
            .unwrap();
        assert!(url.starts_with(&format!("memory://storage/images/albums/{}/", album.id)));
        assert!(url.ends_with(".jpg"));

        let image = api.add_image(&album.id, &url).await.unwrap();
        assert_eq!(api.images_in_album(&album.id).await.unwrap(), vec![image]);
        assert_eq!(backend.calls().upload, 1);
    }

    #[tokio::test]
    async fn test_friends() {
        let (backend, api) = api();
        backend
            .seed("users", &[profile_row("u1", "ana"), profile_row("u2", "ben")])
            .unwrap();

        assert!(api.friends_of("u1").await.unwrap().is_empty());
        assert!(api.add_friend("u1", "u2").await.unwrap());
        assert!(!api.add_friend("u1", "u2").await.unwrap());
        assert!(!api.add_friend("u1", "u1").await.unwrap());
        assert_eq!(backend.rows("friends").len(), 1);

        let friends = api.friends_of("u1").await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "ben");

        api.remove_friend("u1", "u2").await.unwrap();
        assert!(api.friends_of("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_profile_handle() {
        let (backend, api) = api();
        backend.seed("users", &[profile_row("u1", "ana")]).unwrap();

        let by_id = api
            .resolve_profile_handle(&ProfileHandle::Id("u1".to_string()))
            .await
            .unwrap();
        let by_name = api
            .resolve_profile_handle(&ProfileHandle::Username("ana".to_string()))
            .await
            .unwrap();
        assert_eq!(by_id, by_name);
        assert!(by_id.is_some());
    }
}
