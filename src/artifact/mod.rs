//! Index artifact construction
//!
//! A completed Binary becomes an NZB document listing every part and its
//! segments, plus the file counts the promoter's policies look at.

pub mod files;
mod store;

pub use files::{FileKind, classify, filename};
pub use store::{ArtifactStore, FsArtifactStore, StoredArtifact};

use nntp_rs::{Nzb, NzbFile, NzbSegment};
use std::collections::HashMap;

use crate::db::{BinarySummary, PartWithSegments};
use crate::{Error, Result};

/// A built index document and what it contains
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifact {
    /// The NZB document
    pub nzb: Nzb,
    /// RAR volumes
    pub archives: u32,
    /// zip/7z volumes
    pub containers: u32,
    /// Info and readme files
    pub infos: u32,
    /// PAR2 index files
    pub repair_index: u32,
    /// PAR2 recovery volumes
    pub repair_volumes: u32,
    /// Files listed in the document
    pub file_count: u32,
    /// Σ segment bytes
    pub size: u64,
}

impl IndexArtifact {
    /// Archive and container volumes, the quantity the minimum-archive policy counts
    pub fn archive_count(&self) -> u32 {
        self.archives + self.containers
    }

    /// Every repair-set member
    pub fn repair_count(&self) -> u32 {
        self.repair_index + self.repair_volumes
    }

    /// Serialized NZB XML
    pub fn to_xml(&self) -> String {
        self.nzb.to_xml()
    }
}

/// Build the artifact for a Binary from its stored parts
///
/// Fails when there is nothing to reference: no parts, or no part with any
/// segment.
pub fn build(binary: &BinarySummary, parts: &[PartWithSegments]) -> Result<IndexArtifact> {
    let mut artifact = IndexArtifact {
        nzb: Nzb {
            meta: HashMap::from([("name".to_string(), binary.name.clone())]),
            files: Vec::with_capacity(parts.len()),
        },
        archives: 0,
        containers: 0,
        infos: 0,
        repair_index: 0,
        repair_volumes: 0,
        file_count: 0,
        size: 0,
    };

    for entry in parts {
        if entry.segments.is_empty() {
            continue;
        }

        match classify(filename(&entry.part.subject)) {
            FileKind::Archive => artifact.archives += 1,
            FileKind::Container => artifact.containers += 1,
            FileKind::Info => artifact.infos += 1,
            FileKind::RepairIndex => artifact.repair_index += 1,
            FileKind::RepairVolume => artifact.repair_volumes += 1,
            FileKind::Other => {}
        }

        let segments: Vec<NzbSegment> = entry
            .segments
            .iter()
            .map(|segment| NzbSegment {
                bytes: segment.bytes.max(0) as u64,
                number: segment.number.max(0) as u32,
                message_id: segment
                    .message_id
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            })
            .collect();

        artifact.size += segments.iter().map(|s| s.bytes).sum::<u64>();
        artifact.file_count += 1;
        artifact.nzb.files.push(NzbFile {
            poster: entry.part.poster.clone(),
            date: entry.part.posted,
            subject: entry.part.subject.clone(),
            groups: vec![entry.part.group_name.clone()],
            segments,
        });
    }

    if artifact.nzb.files.is_empty() {
        return Err(Error::Artifact(format!(
            "binary '{}' has no segments to reference",
            binary.name
        )));
    }

    Ok(artifact)
}
