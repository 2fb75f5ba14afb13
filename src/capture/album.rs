use super::{CaptureFailure, PhotoArtifact, PhotoSink, SavedPhoto};
use std::io;
use std::path::{Path, PathBuf};

/// Saves capture photos into a named album directory
#[derive(Debug, Clone)]
pub struct AlbumPhotoSink {
    album_dir: PathBuf,
}

impl AlbumPhotoSink {
    pub fn new(root: impl AsRef<Path>, album: &str) -> Self {
        Self {
            album_dir: root.as_ref().join(album),
        }
    }

    pub fn album_dir(&self) -> &Path {
        &self.album_dir
    }
}

fn io_failure(err: io::Error) -> CaptureFailure {
    match err.kind() {
        io::ErrorKind::PermissionDenied => CaptureFailure::PermissionDenied,
        _ => CaptureFailure::SaveFailed(err.to_string()),
    }
}

#[async_trait::async_trait]
impl PhotoSink for AlbumPhotoSink {
    async fn save(&self, photo: &PhotoArtifact) -> Result<SavedPhoto, CaptureFailure> {
        tokio::fs::create_dir_all(&self.album_dir)
            .await
            .map_err(io_failure)?;

        let destination = self.album_dir.join(&photo.file_name);
        tokio::fs::copy(&photo.path, &destination)
            .await
            .map_err(io_failure)?;

        log::debug!(
            "Copied {} into album {}",
            photo.path.display(),
            self.album_dir.display()
        );
        Ok(SavedPhoto::new(destination))
    }
}
