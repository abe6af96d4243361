// SPDX-License-Identifier: MPL-2.0

//! Gallery sinks for captured photos and videos
//!
//! The capture arbiter only appends. The gallery keeps items newest first
//! and can be cleared in bulk; items are never modified in place.

use crate::errors::{AppError, AppResult};
use crate::media::thumbnail::{self, Thumbnail};
use crate::pipelines::artifact::{ArtifactKind, CapturedArtifact};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Destination for finished artifacts
pub trait GallerySink: Send + Sync {
    /// Add an artifact at the front of the gallery
    fn append(&self, artifact: CapturedArtifact) -> BoxFuture<'_, AppResult<()>>;

    /// Remove every item
    fn clear(&self) -> BoxFuture<'_, AppResult<()>>;

    /// All items, newest first
    fn items(&self) -> Vec<CapturedArtifact>;

    fn len(&self) -> usize {
        self.items().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent photo, for the gallery button
    fn latest_photo(&self) -> Option<CapturedArtifact> {
        self.items().into_iter().find(|a| a.is_photo())
    }
}

/// Newest-first list shared by both gallery implementations
#[derive(Debug, Default)]
struct ItemList(Mutex<Vec<CapturedArtifact>>);

impl ItemList {
    fn push_front(&self, artifact: CapturedArtifact) -> AppResult<()> {
        let mut items = self
            .0
            .lock()
            .map_err(|_| AppError::Storage("gallery lock poisoned".to_string()))?;
        items.insert(0, artifact);
        Ok(())
    }

    fn clear(&self) -> AppResult<Vec<CapturedArtifact>> {
        let mut items = self
            .0
            .lock()
            .map_err(|_| AppError::Storage("gallery lock poisoned".to_string()))?;
        Ok(std::mem::take(&mut *items))
    }

    fn snapshot(&self) -> Vec<CapturedArtifact> {
        self.0.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.0.lock().map(|items| items.len()).unwrap_or(0)
    }
}

/// Gallery kept in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryGallery {
    items: Arc<ItemList>,
}

impl MemoryGallery {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GallerySink for MemoryGallery {
    fn append(&self, artifact: CapturedArtifact) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            debug!(id = %artifact.id, kind = ?artifact.kind, "Gallery append");
            self.items.push_front(artifact)
        })
    }

    fn clear(&self) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            let removed = self.items.clear()?;
            info!(count = removed.len(), "Gallery cleared");
            Ok(())
        })
    }

    fn items(&self) -> Vec<CapturedArtifact> {
        self.items.snapshot()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Default photo directory (Pictures, falling back to home)
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// Default video directory (Videos, falling back to home)
pub fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// Gallery writing each artifact to disk
///
/// Photos go to `photos_dir`, videos to `videos_dir`. The session's items are
/// also kept in memory for enumeration.
#[derive(Debug, Clone)]
pub struct DirectoryGallery {
    photos_dir: PathBuf,
    videos_dir: PathBuf,
    items: Arc<ItemList>,
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl DirectoryGallery {
    pub fn new(photos_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            photos_dir: photos_dir.into(),
            videos_dir: videos_dir.into(),
            items: Arc::default(),
            paths: Arc::default(),
        }
    }

    /// Gallery in the user's Pictures and Videos folders
    pub fn default_location() -> Self {
        Self::new(default_photo_dir(), default_video_dir())
    }

    pub fn photos_dir(&self) -> &Path {
        &self.photos_dir
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Files written this session, newest first
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn dir_for(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Photo => &self.photos_dir,
            ArtifactKind::Video => &self.videos_dir,
        }
    }
}

impl GallerySink for DirectoryGallery {
    fn append(&self, artifact: CapturedArtifact) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            let dir = self.dir_for(artifact.kind).to_path_buf();
            let path = dir.join(artifact.file_name());

            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &artifact.data[..]).await?;
            info!(path = %path.display(), size = artifact.data.len(), "Saved to gallery");

            if let Ok(mut paths) = self.paths.lock() {
                paths.insert(0, path);
            }
            self.items.push_front(artifact)
        })
    }

    fn clear(&self) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            self.items.clear()?;
            let paths = self
                .paths
                .lock()
                .map(|mut p| std::mem::take(&mut *p))
                .unwrap_or_default();
            for path in &paths {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove gallery file");
                }
            }
            info!(count = paths.len(), "Gallery cleared");
            Ok(())
        })
    }

    fn items(&self) -> Vec<CapturedArtifact> {
        self.items.snapshot()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Load a thumbnail of the newest photo in `photos_dir`
///
/// Scans for JPEG and PNG files and picks the most recently modified one.
pub async fn load_latest_thumbnail(photos_dir: PathBuf) -> Option<Thumbnail> {
    let mut entries = tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&photos_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(ext) = path.extension() {
                    let ext_str = ext.to_string_lossy();
                    if ext_str.eq_ignore_ascii_case("jpg") || ext_str.eq_ignore_ascii_case("png") {
                        files.push(entry);
                    }
                }
            }
        }
        files
    })
    .await
    .ok()?;

    // Sort by modification time (newest first)
    entries.sort_by_key(|e| {
        e.metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(std::cmp::Reverse)
    });

    let latest_path = entries.first()?.path();
    debug!(path = ?latest_path, "Loading latest thumbnail");

    let bytes = tokio::fs::read(&latest_path).await.ok()?;
    tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&bytes).ok()?.to_rgba8();
        thumbnail::create_thumbnail(&image).ok()
    })
    .await
    .ok()?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::jpeg;

    fn photo(tag: u8) -> CapturedArtifact {
        CapturedArtifact::new(ArtifactKind::Photo, vec![tag], (1, 1), None)
    }

    fn video() -> CapturedArtifact {
        CapturedArtifact::new(ArtifactKind::Video, vec![9], (1, 1), None)
    }

    #[tokio::test]
    async fn test_memory_gallery_newest_first() {
        let gallery = MemoryGallery::new();
        gallery.append(photo(1)).await.unwrap();
        gallery.append(photo(2)).await.unwrap();
        gallery.append(video()).await.unwrap();

        let items = gallery.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].kind, ArtifactKind::Video);
        assert_eq!(&items[1].data[..], &[2]);
        assert_eq!(&gallery.latest_photo().unwrap().data[..], &[2]);

        gallery.clear().await.unwrap();
        assert!(gallery.is_empty());
    }

    #[tokio::test]
    async fn test_directory_gallery_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = DirectoryGallery::new(dir.path().join("Pictures"), dir.path().join("Videos"));

        gallery.append(photo(7)).await.unwrap();
        gallery.append(video()).await.unwrap();

        let paths = gallery.written_paths();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].starts_with(dir.path().join("Videos")));
        assert!(paths[1].extension().is_some_and(|e| e == "jpg"));
        assert_eq!(std::fs::read(&paths[1]).unwrap(), vec![7]);

        gallery.clear().await.unwrap();
        assert!(!paths[1].exists());
        assert!(gallery.is_empty());
    }

    #[tokio::test]
    async fn test_latest_thumbnail_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let image = image::RgbaImage::from_pixel(200, 100, image::Rgba([1, 2, 3, 255]));
        let bytes = jpeg::encode_rgba(&image, 90).unwrap();
        std::fs::write(dir.path().join("photo.jpg"), bytes).unwrap();

        let thumb = load_latest_thumbnail(dir.path().to_path_buf()).await.unwrap();
        assert_eq!((thumb.width, thumb.height), (100, 50));
    }

    #[tokio::test]
    async fn test_latest_thumbnail_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_latest_thumbnail(dir.path().to_path_buf()).await.is_none());
    }
}
