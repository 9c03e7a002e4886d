//! Embedded bird datasets.
//!
//! Two fixed JSON arrays ship inside the binary: the canonical dataset
//! (`v1`) and a smaller canary variant (`v2`) used to simulate a new release
//! during demos. Records never change after load. A parse failure means the
//! packaged data is corrupt, so loading fails and the service refuses to
//! start.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use aviary_common::envelope::BirdResponse;
use aviary_common::{AviaryError, Result};

/// Canonical dataset, served as `v1`.
const BIRDS_JSON: &[u8] = include_bytes!("../data/birds.json");

/// Canary dataset, served as `v2`.
const CANARIES_JSON: &[u8] = include_bytes!("../data/canaries.json");

/// Which embedded dataset a process serves. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatasetVersion {
    #[default]
    V1,
    V2,
}

impl DatasetVersion {
    /// The version tag reported in response metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetVersion::V1 => "v1",
            DatasetVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVersion {
    type Err = AviaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" => Ok(DatasetVersion::V1),
            "v2" => Ok(DatasetVersion::V2),
            other => Err(AviaryError::InvalidConfig(format!(
                "unsupported version {:?}; only v1 and v2 are supported",
                other
            ))),
        }
    }
}

/// One record as embedded in the dataset files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BirdRecord {
    pub title: String,
    pub thumbnail: Thumbnail,
    pub extract_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    pub source: String,
}

impl BirdRecord {
    /// Builds the wire response for this record.
    pub fn to_response(&self) -> BirdResponse {
        BirdResponse {
            name: self.title.clone(),
            image_url: self.thumbnail.source.clone(),
            extract: self.extract_html.clone(),
        }
    }
}

/// Decodes the embedded dataset for `version`.
///
/// Fails when the embedded JSON does not parse or the array is empty; both
/// mean the packaged data is defective and startup must abort.
pub fn load(version: DatasetVersion) -> Result<Vec<BirdRecord>> {
    let (name, data) = match version {
        DatasetVersion::V1 => ("birds.json", BIRDS_JSON),
        DatasetVersion::V2 => ("canaries.json", CANARIES_JSON),
    };
    let records: Vec<BirdRecord> = serde_json::from_slice(data)
        .map_err(|err| AviaryError::Dataset(format!("unable to parse {}: {}", name, err)))?;
    if records.is_empty() {
        return Err(AviaryError::Dataset(format!(
            "{} contains no records",
            name
        )));
    }
    Ok(records)
}
