use std::{io, path::Path};

use serde::{Deserialize, Serialize};

/// Capacity of the filesystem holding the scan archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsageSnapshot {
    /// Bytes available to unprivileged writers.
    pub free: u64,
    pub total: u64,
    /// Bytes in use, counting blocks reserved for root as free.
    pub used: u64,
    pub percent_used: f64,
}

impl DiskUsageSnapshot {
    pub fn for_path(path: &Path) -> io::Result<Self> {
        let stats = fs2::statvfs(path)?;
        Ok(Self::from_stats(
            stats.total_space(),
            stats.free_space(),
            stats.available_space(),
        ))
    }

    /// `free_blocks` includes root-reserved space, `available` does not.
    pub fn from_stats(total: u64, free_blocks: u64, available: u64) -> Self {
        let used = total.saturating_sub(free_blocks);
        let percent_used = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };

        Self {
            free: available,
            total,
            used,
            percent_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_excludes_all_free_blocks() {
        let snapshot = DiskUsageSnapshot::from_stats(1000, 300, 250);
        assert_eq!(snapshot.free, 250);
        assert_eq!(snapshot.used, 700);
        assert_eq!(snapshot.total, 1000);
        assert!((snapshot.percent_used - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_filesystem_reports_zero_percent() {
        let snapshot = DiskUsageSnapshot::from_stats(0, 0, 0);
        assert_eq!(snapshot.percent_used, 0.0);
    }

    #[test]
    fn real_directory_has_consistent_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = DiskUsageSnapshot::for_path(dir.path()).unwrap();
        assert!(snapshot.total > 0);
        assert!(snapshot.used <= snapshot.total);
        assert!(snapshot.free <= snapshot.total);
        assert!((0.0..=100.0).contains(&snapshot.percent_used));
    }
}
