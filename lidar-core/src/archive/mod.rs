//! Read-only access to completed scan files.
//!
//! Artifacts are whatever the processing script leaves in the archive
//! directory; nothing is indexed, every call reads the directory afresh.

mod disk;

pub use disk::DiskUsageSnapshot;

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tracing::{debug, warn};

use crate::error::{Result, ScanError};

pub const DEFAULT_SCAN_EXTENSION: &str = "pcd";

/// A completed scan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanArtifact {
    pub name: String,
    pub size: u64,
    /// Serialized as unix seconds.
    #[serde(rename = "date", with = "chrono::serde::ts_seconds")]
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScanArchive {
    root: PathBuf,
    extension: String,
    suffix: String,
}

impl ScanArchive {
    /// `extension` may be given with or without its leading dot.
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_string();
        let suffix = format!(".{extension}");
        Self {
            root: root.into(),
            extension,
            suffix,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Create the archive directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn disk_usage(&self) -> Result<DiskUsageSnapshot> {
        Ok(DiskUsageSnapshot::for_path(&self.root)?)
    }

    fn is_scan_file(&self, name: &str) -> bool {
        name.ends_with(&self.suffix)
    }

    /// Scan files in the archive, sorted by name.
    pub async fn list(&self) -> Result<Vec<ScanArtifact>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut artifacts = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned)
            else {
                warn!(
                    path = %entry.path().display(),
                    "skipping non UTF-8 file name"
                );
                continue;
            };
            if !self.is_scan_file(&name) {
                continue;
            }

            // Files can disappear while the processing script is working.
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            artifacts.push(ScanArtifact {
                name,
                size: metadata.len(),
                modified: DateTime::<Utc>::from(metadata.modified()?),
            });
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = artifacts.len(), "listed scan artifacts");
        Ok(artifacts)
    }

    /// Open an artifact for streaming.
    ///
    /// Only plain file names directly inside the archive resolve; anything
    /// with separators or parent components is reported as not found.
    pub async fn open(&self, name: &str) -> Result<(File, ScanArtifact)> {
        let path = self.resolve(name)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::not_found(name));
            }
            Err(err) => return Err(err.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ScanError::not_found(name));
        }

        let artifact = ScanArtifact {
            name: name.to_string(),
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        };
        Ok((file, artifact))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('\0') || name.contains('\\') {
            return Err(ScanError::not_found(name));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => {
                Ok(self.root.join(part))
            }
            _ => Err(ScanError::not_found(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn archive_with(files: &[(&str, usize)]) -> (ScanArchive, TempDir) {
        let dir = TempDir::new().unwrap();
        for (name, size) in files {
            std::fs::write(dir.path().join(name), vec![7u8; *size]).unwrap();
        }
        (ScanArchive::new(dir.path(), "pcd"), dir)
    }

    #[tokio::test]
    async fn lists_only_recognized_extension() {
        let (archive, _dir) = archive_with(&[("a.pcd", 1024), ("b.txt", 10)]);

        let artifacts = archive.list().await.unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "a.pcd");
        assert_eq!(artifacts[0].size, 1024);
    }

    #[tokio::test]
    async fn listing_is_sorted_and_skips_directories() {
        let (archive, dir) =
            archive_with(&[("z.pcd", 1), ("m.pcd", 2), ("a.pcd.bak", 3)]);
        std::fs::create_dir(dir.path().join("nested.pcd")).unwrap();

        let names: Vec<_> = archive
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|artifact| artifact.name)
            .collect();

        assert_eq!(names, vec!["m.pcd", "z.pcd"]);
    }

    #[tokio::test]
    async fn extension_accepts_leading_dot() {
        let (_, dir) = archive_with(&[("a.ply", 5), ("b.pcd", 5)]);
        let archive = ScanArchive::new(dir.path(), ".ply");

        assert_eq!(archive.extension(), "ply");
        let artifacts = archive.list().await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "a.ply");
    }

    #[tokio::test]
    async fn open_reads_artifact_contents() {
        let (archive, _dir) = archive_with(&[("room.pcd", 64)]);

        let (mut file, artifact) = archive.open("room.pcd").await.unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();

        assert_eq!(artifact.size, 64);
        assert_eq!(contents, vec![7u8; 64]);
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let (archive, _dir) = archive_with(&[]);
        assert!(matches!(
            archive.open("ghost.pcd").await,
            Err(ScanError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_rejects_traversal() {
        let outer = TempDir::new().unwrap();
        std::fs::write(outer.path().join("secret.pcd"), b"secret").unwrap();
        let root = outer.path().join("archive");
        std::fs::create_dir(&root).unwrap();
        let archive = ScanArchive::new(&root, "pcd");

        for name in [
            "../secret.pcd",
            "../../etc/passwd",
            "/etc/passwd",
            "..",
            ".",
            "",
            "sub/file.pcd",
            "..\\secret.pcd",
        ] {
            assert!(
                matches!(
                    archive.open(name).await,
                    Err(ScanError::NotFound(_))
                ),
                "{name:?} should not resolve"
            );
        }
    }

    #[test]
    fn artifact_serializes_date_as_unix_seconds() {
        let artifact = ScanArtifact {
            name: "a.pcd".into(),
            size: 3,
            modified: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "a.pcd", "size": 3, "date": 1_700_000_000})
        );
    }

    #[test]
    fn ensure_exists_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("scans");
        let archive = ScanArchive::new(&root, "pcd");

        archive.ensure_exists().unwrap();
        assert!(root.is_dir());
    }
}
