use std::path::{Path, PathBuf};
use tokio::fs;

use crate::traits::{StorageError, StorageResult};

/// Logical bucket inside working storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Videos,
    Thumbnails,
    Audio,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Videos => write!(f, "videos"),
            Bucket::Thumbnails => write!(f, "thumbnails"),
            Bucket::Audio => write!(f, "audio"),
        }
    }
}

/// Local filesystem working storage
///
/// Raw uploads and working files live in the videos bucket, cover images in
/// the thumbnails bucket, and audio extracted for transcription in the audio
/// bucket. Stages read and replace files in place.
#[derive(Clone, Debug)]
pub struct WorkingStorage {
    videos_dir: PathBuf,
    thumbnails_dir: PathBuf,
    audio_dir: PathBuf,
}

impl WorkingStorage {
    /// Create the bucket directories if needed.
    pub async fn new(
        videos_dir: impl Into<PathBuf>,
        thumbnails_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let storage = WorkingStorage {
            videos_dir: videos_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
            audio_dir: audio_dir.into(),
        };

        for dir in [
            &storage.videos_dir,
            &storage.thumbnails_dir,
            &storage.audio_dir,
        ] {
            fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(storage)
    }

    fn bucket_dir(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::Videos => &self.videos_dir,
            Bucket::Thumbnails => &self.thumbnails_dir,
            Bucket::Audio => &self.audio_dir,
        }
    }

    /// Resolve a file name inside a bucket.
    ///
    /// Names must be a single path component; anything that could resolve
    /// outside the bucket is rejected.
    pub fn path(&self, bucket: Bucket, file_name: &str) -> StorageResult<PathBuf> {
        if file_name.is_empty()
            || file_name.contains("..")
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a plain file name",
                file_name
            )));
        }
        Ok(self.bucket_dir(bucket).join(file_name))
    }

    pub fn video_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        self.path(Bucket::Videos, file_name)
    }

    pub fn audio_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        self.path(Bucket::Audio, file_name)
    }

    pub fn thumbnail_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        self.path(Bucket::Thumbnails, file_name)
    }

    pub async fn exists(&self, bucket: Bucket, file_name: &str) -> StorageResult<bool> {
        let path = self.path(bucket, file_name)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Delete a file. Returns `false` when it was already gone.
    pub async fn remove(&self, bucket: Bucket, file_name: &str) -> StorageResult<bool> {
        let path = self.path(bucket, file_name)?;
        remove_if_exists(&path).await
    }

    /// Swap `temp` into `target`: the old target is deleted first, then the
    /// temp file is moved into its place.
    pub async fn replace(&self, temp: &Path, target: &Path) -> StorageResult<()> {
        if !fs::try_exists(temp).await? {
            return Err(StorageError::NotFound(temp.display().to_string()));
        }
        remove_if_exists(target).await?;
        fs::rename(temp, target).await?;
        tracing::debug!(
            from = %temp.display(),
            to = %target.display(),
            "Replaced working file"
        );
        Ok(())
    }
}

/// Delete `path`, treating an already missing file as success.
pub async fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::IoError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage_in(dir: &Path) -> WorkingStorage {
        WorkingStorage::new(
            dir.join("Videos"),
            dir.join("Thumbnails"),
            dir.join("Audios"),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_new_creates_buckets() {
        let dir = tempdir().unwrap();
        let _storage = storage_in(dir.path()).await;

        assert!(dir.path().join("Videos").is_dir());
        assert!(dir.path().join("Thumbnails").is_dir());
        assert!(dir.path().join("Audios").is_dir());
    }

    #[tokio::test]
    async fn test_paths_stay_inside_bucket() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        let path = storage.video_path("abc_720p.mp4").unwrap();
        assert_eq!(path, dir.path().join("Videos").join("abc_720p.mp4"));
        assert_eq!(
            storage.audio_path("abc.mp3").unwrap(),
            dir.path().join("Audios").join("abc.mp3")
        );

        for bad in ["", "../etc/passwd", "nested/file.mp4", "..", "a\\b"] {
            assert!(
                matches!(storage.video_path(bad), Err(StorageError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_remove_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        assert!(!storage.remove(Bucket::Audio, "missing.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_existing() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;
        let path = storage.thumbnail_path("cover.png").unwrap();
        fs::write(&path, b"png").await.unwrap();

        assert!(storage.exists(Bucket::Thumbnails, "cover.png").await.unwrap());
        assert!(storage.remove(Bucket::Thumbnails, "cover.png").await.unwrap());
        assert!(!storage.exists(Bucket::Thumbnails, "cover.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_moves_temp_over_target() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;
        let target = storage.video_path("clip.mp4").unwrap();
        let temp = storage.video_path("clip_edited.mp4").unwrap();
        fs::write(&target, b"old").await.unwrap();
        fs::write(&temp, b"new").await.unwrap();

        storage.replace(&temp, &target).await.unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), b"new");
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_replace_without_temp_keeps_target() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;
        let target = storage.video_path("clip.mp4").unwrap();
        fs::write(&target, b"old").await.unwrap();

        let result = storage
            .replace(&storage.video_path("clip_edited.mp4").unwrap(), &target)
            .await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(fs::read(&target).await.unwrap(), b"old");
    }
}
