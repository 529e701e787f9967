//! Object key layout
//!
//! Keys look like `{prefix}/{image|video}/{uuid}.{ext}`. The URL returned
//! to callers is the base URL joined with the key, so the key can be
//! recovered from a stored URL for deletion.

use domain_claims::attachment::AttachmentType;
use uuid::Uuid;

/// File extension for a sniffed MIME type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let ext = match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/avif" => "avif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/3gpp" => "3gp",
        "video/x-msvideo" => "avi",
        "video/webm" => "webm",
        _ => return None,
    };
    Some(ext)
}

/// Builds a fresh, collision-free key for an upload
pub fn object_key(prefix: &str, kind: AttachmentType, content_type: &str) -> String {
    let mut key = String::new();
    let prefix = prefix.trim_matches('/');
    if !prefix.is_empty() {
        key.push_str(prefix);
        key.push('/');
    }
    key.push_str(kind.as_str());
    key.push('/');
    key.push_str(&Uuid::now_v7().to_string());
    if let Some(ext) = extension_for(content_type) {
        key.push('.');
        key.push_str(ext);
    }
    key
}

pub fn object_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

/// Recovers the object key from a URL produced by [`object_url`]
///
/// Returns `None` for URLs outside the configured base.
pub fn key_from_url<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    let key = url
        .strip_prefix(base_url.trim_end_matches('/'))?
        .strip_prefix('/')?;
    let key = key.split(['?', '#']).next().unwrap_or(key);
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:9000/warranty-claims";

    #[test]
    fn test_object_key_layout() {
        let key = object_key("claims/", AttachmentType::Video, "video/quicktime");
        assert!(key.starts_with("claims/video/"));
        assert!(key.ends_with(".mov"));
    }

    #[test]
    fn test_object_key_without_prefix_or_extension() {
        let key = object_key("", AttachmentType::Image, "application/octet-stream");
        assert!(key.starts_with("image/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_url_round_trip() {
        let key = "claims/image/0192f0c4-1c1e-7cc3-9a4e-3c5c7b6f4a10.png";
        let url = object_url(BASE, key);
        assert_eq!(key_from_url(BASE, &url), Some(key));
    }

    #[test]
    fn test_key_from_foreign_url() {
        assert_eq!(key_from_url(BASE, "https://elsewhere.com/claims/a.png"), None);
        assert_eq!(key_from_url(BASE, "http://localhost:9000/warranty-claims/"), None);
        assert_eq!(key_from_url(BASE, "http://localhost:9000/warranty-claims/../secret"), None);
    }

    #[test]
    fn test_key_from_url_drops_query() {
        let url = format!("{}/claims/image/x.jpg?X-Amz-Signature=abc", BASE);
        assert_eq!(key_from_url(BASE, &url), Some("claims/image/x.jpg"));
    }
}
