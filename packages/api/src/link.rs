//! Profile deep links, the payload encoded in a user's QR code.
//!
//! A link has the shape `https://<domain>/profile/<handle>` where the handle is
//! either the user's id (UUID) or their username.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// What the trailing segment of a profile link refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileHandle {
    Id(String),
    Username(String),
}

impl ProfileHandle {
    /// Usernames are stored lowercase, so both kinds of handle are
    /// case-folded.
    pub fn from_segment(segment: &str) -> Self {
        if UUID_RE.is_match(segment) {
            ProfileHandle::Id(segment.to_lowercase())
        } else {
            ProfileHandle::Username(segment.to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProfileHandle::Id(id) => id,
            ProfileHandle::Username(username) => username,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("not a profile link: {0}")]
    NotAProfileLink(String),
}

pub fn profile_link(domain: &str, handle: &ProfileHandle) -> String {
    format!("https://{domain}/profile/{}", handle.as_str())
}

/// Parse a scanned QR payload. Surrounding whitespace and a trailing slash
/// are accepted; any other host or path shape is rejected.
pub fn parse_profile_link(url: &str, domain: &str) -> Result<ProfileHandle, LinkError> {
    let pattern = format!(
        r"^https://{}/profile/([A-Za-z0-9_.-]+)/?$",
        regex::escape(domain)
    );
    // An escaped domain always yields a valid pattern.
    let re = Regex::new(&pattern).map_err(|_| LinkError::NotAProfileLink(url.to_string()))?;

    let url = url.trim();
    let segment = re
        .captures(url)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| LinkError::NotAProfileLink(url.to_string()))?;
    Ok(ProfileHandle::from_segment(segment.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "homee.app";
    const ID: &str = "3f2b8c1e-9a4d-4e6f-8b2a-1c3d5e7f9a0b";

    #[test]
    fn test_link_roundtrip_for_id_and_username() {
        let id = ProfileHandle::Id(ID.to_string());
        let link = profile_link(DOMAIN, &id);
        assert_eq!(link, format!("https://homee.app/profile/{ID}"));
        assert_eq!(parse_profile_link(&link, DOMAIN).unwrap(), id);

        let name = ProfileHandle::Username("ana.b".to_string());
        let link = profile_link(DOMAIN, &name);
        assert_eq!(parse_profile_link(&link, DOMAIN).unwrap(), name);
    }

    #[test]
    fn test_parse_tolerates_trailing_slash_and_whitespace() {
        let parsed = parse_profile_link("  https://homee.app/profile/ana/\n", DOMAIN).unwrap();
        assert_eq!(parsed, ProfileHandle::Username("ana".to_string()));
    }

    #[test]
    fn test_parse_rejects_foreign_links() {
        for url in [
            "http://homee.app/profile/ana",
            "https://evil.app/profile/ana",
            "https://homeeXapp/profile/ana",
            "https://homee.app/groups/ana",
            "https://homee.app/profile/",
            "https://homee.app/profile/ana/extra",
            "not a url",
        ] {
            assert!(parse_profile_link(url, DOMAIN).is_err(), "{url}");
        }
    }

    #[test]
    fn test_mixed_case_username_is_lowercased() {
        let parsed = parse_profile_link("https://homee.app/profile/Ana.B", DOMAIN).unwrap();
        assert_eq!(parsed, ProfileHandle::Username("ana.b".to_string()));
    }

    #[test]
    fn test_uppercase_uuid_is_normalized() {
        let parsed =
            parse_profile_link(&format!("https://homee.app/profile/{}", ID.to_uppercase()), DOMAIN)
                .unwrap();
        assert_eq!(parsed, ProfileHandle::Id(ID.to_string()));
    }
}
