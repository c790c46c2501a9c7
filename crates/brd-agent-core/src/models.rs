//! Core data models used throughout BRD Agent.
//!
//! These types represent the documents, chunks, vector records, and analysis
//! jobs/results that flow through the extraction and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::insights::Insights;

/// How the source content entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Plain-text file read from disk (CLI path).
    File,
    /// Pasted text snippet.
    Text,
    /// Meeting URL resolved to a transcript.
    Url,
}

/// A submitted communication awaiting (or referenced by) analysis.
///
/// Immutable once stored. `content` is truncated to the configured cap at
/// submission time, before chunking or prompting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_name: String,
    /// Communication channel tag (e.g. `"email"`, `"slack"`, `"meeting"`).
    pub channel: String,
    pub kind: InputKind,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A contiguous character window of a document's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Starting character index within the source document.
    pub offset: usize,
}

/// A chunk paired with its embedding vector.
///
/// Stored in insertion order inside the owning [`AnalysisResult`]; ranking
/// relies on that order for tie-breaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Lifecycle state of an analysis job. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete,
}

/// Progress record for one orchestration run.
///
/// `completed_steps` is append-only and only ever mutated by the
/// orchestrator through the store. Once `status` is `Complete` no field
/// changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: String,
    pub status: JobStatus,
    /// The fixed step plan, set at creation.
    pub steps: Vec<String>,
    pub completed_steps: Vec<String>,
    /// 0–100. Progress-derived while processing; superseded by the
    /// insights' own score when the job finishes.
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisJob {
    /// Create a fresh job in `Processing` state with the given step plan.
    pub fn new(id: impl Into<String>, steps: &[&str]) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Processing,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            completed_steps: Vec::new(),
            confidence: 0,
            result_id: None,
            created_at: Utc::now(),
        }
    }
}

/// The persisted output of one analysis run. Write-once, read-heavy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub kind: InputKind,
    pub insights: Insights,
    /// Per-chunk embeddings kept for retrieval-augmented chat.
    pub records: Vec<VectorRecord>,
    /// Narrative requirements document rendered from the insights.
    pub narrative: String,
    pub created_at: DateTime<Utc>,
}

/// Lightweight listing row for an [`AnalysisResult`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub id: String,
    pub file_name: String,
    pub kind: InputKind,
    pub confidence_score: u8,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            kind: self.kind,
            confidence_score: self.insights.confidence_score,
            created_at: self.created_at,
        }
    }
}
