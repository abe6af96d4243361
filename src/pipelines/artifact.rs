// SPDX-License-Identifier: MPL-2.0

//! Finished capture results handed to the gallery

use crate::media::thumbnail::Thumbnail;
use chrono::{DateTime, Local};
use std::sync::Arc;
use uuid::Uuid;

/// Artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Photo,
    Video,
}

impl ArtifactKind {
    /// File extension used when the artifact is written to disk
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Photo => "jpg",
            ArtifactKind::Video => super::video::muxer::FILE_EXTENSION,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ArtifactKind::Photo => "image/jpeg",
            ArtifactKind::Video => super::video::muxer::MIME_TYPE,
        }
    }
}

/// One captured photo or recorded video
///
/// Immutable once created; the gallery only appends or clears.
#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    pub id: Uuid,
    pub kind: ArtifactKind,
    /// Encoded bytes (JPEG, or a WebM recording)
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Absent when derivation failed; the artifact is still kept
    pub thumbnail: Option<Thumbnail>,
    pub timestamp: DateTime<Local>,
}

impl CapturedArtifact {
    pub fn new(
        kind: ArtifactKind,
        data: Vec<u8>,
        (width, height): (u32, u32),
        thumbnail: Option<Thumbnail>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            data: Arc::from(data),
            width,
            height,
            thumbnail,
            timestamp: Local::now(),
        }
    }

    pub fn is_photo(&self) -> bool {
        self.kind == ArtifactKind::Photo
    }

    /// Timestamped file name, e.g. `photo_20240101_120000_123.jpg`
    pub fn file_name(&self) -> String {
        let prefix = match self.kind {
            ArtifactKind::Photo => "photo",
            ArtifactKind::Video => "video",
        };
        format!(
            "{}_{}.{}",
            prefix,
            self.timestamp.format("%Y%m%d_%H%M%S_%3f"),
            self.kind.extension()
        )
    }
}
