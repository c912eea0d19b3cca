//! Record types shared by the crawler, fetcher and enrichment stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One row of the directory as produced by a `RecordExtractor`
///
/// `name` is the identity key within a partition. Every other field is
/// independently optional: a missing or unparsable cell is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub name: String,
    #[serde(rename = "imageRef", default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl DirectoryRecord {
    /// Creates a record carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_ref: None,
            college: None,
            department: None,
            rank: None,
            phone: None,
            email: None,
        }
    }

    /// Sets the image reference
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Label of one independently crawled slice of the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition(String);

impl Partition {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// The default key space: one partition per letter A-Z
    pub fn alphabet() -> Vec<Partition> {
        ('A'..='Z').map(|c| Partition(c.to_string())).collect()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directory record tagged with the partition it was crawled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedRecord {
    pub partition: Partition,
    pub record: DirectoryRecord,
}

/// A resource reference materialized on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// The reference the artifact was requested with
    pub source_ref: String,

    /// Where the artifact lives in the cache directory
    pub local_path: PathBuf,

    /// True when the call was served from the cache without a network request
    pub cached: bool,

    /// Number of network attempts made by this call (0 on a cache hit)
    pub attempts: u32,
}

impl FetchedArtifact {
    /// The derived filename of the artifact
    pub fn file_name(&self) -> Option<&str> {
        self.local_path.file_name().and_then(|n| n.to_str())
    }
}

/// Demographic attributes predicted from a portrait
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDemographics {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub race: Option<String>,
}

/// A directory record joined with its artifact and predicted attributes
///
/// Every enrichment field is present in the struct; each is independently
/// `None` when its source was unavailable or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: DirectoryRecord,
    #[serde(rename = "directoryPartition")]
    pub directory_partition: String,
    #[serde(rename = "imagePath")]
    pub image_path: Option<String>,
    pub name_gender: Option<String>,
    pub name_ethnicity: Option<String>,
    pub image_age: Option<u32>,
    pub image_gender: Option<String>,
    pub image_ethnicity: Option<String>,
}
