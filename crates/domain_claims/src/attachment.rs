//! Claim attachments and media signature detection
//!
//! Evidence files are classified by their leading bytes, never by file name
//! or client-supplied content type. Anything that is not a recognised image
//! or video container is rejected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AttachmentId, ClaimId};
use crate::error::ClaimError;

/// Kind of evidence stored for a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Video,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Video => "video",
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(AttachmentType::Image),
            "video" => Ok(AttachmentType::Video),
            _ => Err(ClaimError::invalid_input(format!("unknown attachment type '{}'", s))),
        }
    }
}

/// Metadata of a stored evidence file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAttachment {
    pub id: AttachmentId,
    pub claim_id: ClaimId,
    pub attachment_type: AttachmentType,
    /// Location returned by the object store
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimAttachment {
    pub fn new(claim_id: ClaimId, attachment_type: AttachmentType, url: impl Into<String>) -> Self {
        Self {
            id: AttachmentId::new_v7(),
            claim_id,
            attachment_type,
            url: url.into(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// An uploaded file as received from the caller
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    /// Original file name, informational only
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(file_name: Option<String>, content: Vec<u8>) -> Self {
        Self { file_name, content }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Stored objects whose metadata was removed in a unit of work
///
/// The object store is not transactional, so the objects may only be removed
/// once that unit of work has committed; see
/// [`ClaimAttachmentManager::discard_objects`](crate::services::ClaimAttachmentManager::discard_objects).
#[must_use = "stored objects stay in the bucket until they are discarded after commit"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanedObjects {
    urls: Vec<String>,
}

impl OrphanedObjects {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Result of signature detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedMedia {
    pub kind: AttachmentType,
    pub mime: &'static str,
}

/// Fixed byte pattern identifying a media container
#[derive(Debug, Clone)]
pub struct MediaSignature {
    pub offset: usize,
    pub bytes: &'static [u8],
    /// Second pattern that must also match, for RIFF style containers
    pub secondary: Option<(usize, &'static [u8])>,
    pub kind: AttachmentType,
    pub mime: &'static str,
    pub description: &'static str,
}

fn bytes_at(data: &[u8], offset: usize, bytes: &[u8]) -> bool {
    data.len() >= offset + bytes.len() && &data[offset..offset + bytes.len()] == bytes
}

impl MediaSignature {
    pub fn matches(&self, data: &[u8]) -> bool {
        if !bytes_at(data, self.offset, self.bytes) {
            return false;
        }
        match self.secondary {
            Some((offset, bytes)) => bytes_at(data, offset, bytes),
            None => true,
        }
    }
}

/// Known image and video signatures
pub static MEDIA_SIGNATURES: &[MediaSignature] = &[
    MediaSignature {
        offset: 0,
        bytes: &[0xFF, 0xD8, 0xFF],
        secondary: None,
        kind: AttachmentType::Image,
        mime: "image/jpeg",
        description: "JPEG image",
    },
    MediaSignature {
        offset: 0,
        bytes: &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
        secondary: None,
        kind: AttachmentType::Image,
        mime: "image/png",
        description: "PNG image",
    },
    MediaSignature {
        offset: 0,
        bytes: b"GIF87a",
        secondary: None,
        kind: AttachmentType::Image,
        mime: "image/gif",
        description: "GIF image (87a)",
    },
    MediaSignature {
        offset: 0,
        bytes: b"GIF89a",
        secondary: None,
        kind: AttachmentType::Image,
        mime: "image/gif",
        description: "GIF image (89a)",
    },
    MediaSignature {
        offset: 0,
        bytes: b"RIFF",
        secondary: Some((8, b"WEBP" as &[u8])),
        kind: AttachmentType::Image,
        mime: "image/webp",
        description: "WebP image",
    },
    MediaSignature {
        offset: 0,
        bytes: b"RIFF",
        secondary: Some((8, b"AVI " as &[u8])),
        kind: AttachmentType::Video,
        mime: "video/x-msvideo",
        description: "AVI video",
    },
    MediaSignature {
        offset: 0,
        bytes: &[0x1A, 0x45, 0xDF, 0xA3],
        secondary: None,
        kind: AttachmentType::Video,
        mime: "video/webm",
        description: "WebM / Matroska video",
    },
];

/// ISO base media file brands found after the `ftyp` box marker
static FTYP_BRANDS: &[(&[u8], AttachmentType, &str)] = &[
    (b"heic", AttachmentType::Image, "image/heic"),
    (b"heix", AttachmentType::Image, "image/heic"),
    (b"hevc", AttachmentType::Image, "image/heic"),
    (b"heim", AttachmentType::Image, "image/heic"),
    (b"heis", AttachmentType::Image, "image/heic"),
    (b"mif1", AttachmentType::Image, "image/heif"),
    (b"msf1", AttachmentType::Image, "image/heif"),
    (b"avif", AttachmentType::Image, "image/avif"),
    (b"qt  ", AttachmentType::Video, "video/quicktime"),
    (b"3g", AttachmentType::Video, "video/3gpp"),
];

/// Fallback for `ftyp` containers with an unlisted brand (isom, mp41, M4V, ...)
const FTYP_DEFAULT_MIME: &str = "video/mp4";

fn sniff_ftyp(data: &[u8]) -> Option<DetectedMedia> {
    if !bytes_at(data, 4, b"ftyp") || data.len() < 12 {
        return None;
    }
    let brand = &data[8..12];
    let detected = FTYP_BRANDS
        .iter()
        .find(|(prefix, _, _)| brand.starts_with(prefix))
        .map(|&(_, kind, mime)| DetectedMedia { kind, mime })
        .unwrap_or(DetectedMedia {
            kind: AttachmentType::Video,
            mime: FTYP_DEFAULT_MIME,
        });
    Some(detected)
}

/// DIB header sizes: OS/2 core, INFO, V2/V3, V4, V5
const BMP_DIB_HEADER_SIZES: [u32; 5] = [12, 40, 56, 108, 124];

/// `BM` alone is too weak; the reserved words must be zero and the DIB
/// header size one of the known ones
fn sniff_bmp(data: &[u8]) -> Option<DetectedMedia> {
    if !bytes_at(data, 0, b"BM") || !bytes_at(data, 6, &[0, 0, 0, 0]) || data.len() < 18 {
        return None;
    }
    let dib_size = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
    BMP_DIB_HEADER_SIZES.contains(&dib_size).then_some(DetectedMedia {
        kind: AttachmentType::Image,
        mime: "image/bmp",
    })
}

/// Classifies `data` as an image or a video by its leading bytes
pub fn sniff(data: &[u8]) -> Option<DetectedMedia> {
    MEDIA_SIGNATURES
        .iter()
        .find(|signature| signature.matches(data))
        .map(|signature| DetectedMedia {
            kind: signature.kind,
            mime: signature.mime,
        })
        .or_else(|| sniff_bmp(data))
        .or_else(|| sniff_ftyp(data))
}
