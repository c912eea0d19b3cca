//! JSON-lines partition store
//!
//! Each partition lives in `PAGE_<label>.jsonl`, one record per line. Files
//! are written to a temp name and renamed into place, so a reader sees either
//! the previous output or the complete new one.

use crate::records::{DirectoryRecord, Partition};
use crate::storage::traits::{PartitionSink, PartitionSource, StorageError, StorageResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "PAGE_";
const FILE_EXTENSION: &str = "jsonl";

/// Directory of per-partition JSON-lines files
pub struct JsonLinesStore {
    dir: PathBuf,
}

impl JsonLinesStore {
    /// Opens (and creates if needed) the store directory
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a partition's output
    pub fn partition_path(&self, partition: &Partition) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", FILE_PREFIX, partition.label(), FILE_EXTENSION))
    }

    fn write_lines(path: &Path, records: &[DirectoryRecord]) -> StorageResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

impl PartitionSink for JsonLinesStore {
    fn write_partition(
        &mut self,
        partition: &Partition,
        records: &[DirectoryRecord],
    ) -> StorageResult<()> {
        let path = self.partition_path(partition);
        let temp = path.with_extension("jsonl.tmp");

        if let Err(e) = Self::write_lines(&temp, records) {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
        std::fs::rename(&temp, &path)?;

        tracing::debug!(
            partition = %partition,
            records = records.len(),
            path = %path.display(),
            "Partition written"
        );
        Ok(())
    }
}

impl PartitionSource for JsonLinesStore {
    fn list_partitions(&self) -> StorageResult<Vec<Partition>> {
        let mut partitions = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let label = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(FILE_PREFIX));
            if let Some(label) = label.filter(|l| !l.is_empty()) {
                partitions.push(Partition::new(label));
            }
        }

        partitions.sort();
        Ok(partitions)
    }

    fn read_partition(&self, partition: &Partition) -> StorageResult<Vec<DirectoryRecord>> {
        let path = self.partition_path(partition);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::PartitionNotFound(partition.label().to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: DirectoryRecord = serde_json::from_str(&line).map_err(|e| {
                StorageError::Serialization(format!(
                    "{} line {}: {}",
                    path.display(),
                    line_no + 1,
                    e
                ))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}
