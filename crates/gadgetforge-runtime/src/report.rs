//! End-of-run report

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Result of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Artifact written
    Written {
        /// Artifact length
        bytes: usize,
        /// Hex SHA-256 of the artifact
        sha256: String,
    },
    /// Job failed; nothing written
    Failed {
        /// Error description
        error: String,
    },
}

impl JobStatus {
    /// Status for a written artifact
    pub fn written(bytes: &[u8]) -> Self {
        JobStatus::Written {
            bytes: bytes.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    /// Gadget name
    pub gadget: String,
    /// Verb or category
    pub label: String,
    /// Artifact file name
    pub filename: String,
    /// Outcome
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    /// Whether the artifact was written
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Written { .. })
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Output directory
    pub output_dir: PathBuf,
    /// Per-job outcomes, in plan order
    pub outcomes: Vec<JobOutcome>,
    /// Transform pairs skipped by the exclusion table
    pub excluded: usize,
    /// Gadgets whose single-shot path is switched off
    pub disabled: Vec<String>,
}

impl RunReport {
    /// Number of artifacts written
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed jobs
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Outcome for an artifact name
    pub fn outcome(&self, filename: &str) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.filename == filename)
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
