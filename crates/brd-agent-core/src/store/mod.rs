//! Storage abstraction for BRD Agent.
//!
//! The [`Store`] trait defines every persistence operation the analysis
//! pipeline and chat responder need, so backends are pluggable: the
//! in-memory store here, or a future durable implementation keyed by the
//! same ids. Stores are constructor-injected into the orchestrator and
//! responder rather than reached through globals.
//!
//! Write discipline: jobs and results are mutated only by the orchestrator.
//! Readers (status polling, chat) never write, and a job's
//! `completed_steps` list is append-only via [`record_step`](Store::record_step).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AnalysisJob, AnalysisResult, Document, ResultSummary};

/// Abstract storage backend.
///
/// All operations are async (via `async-trait`); the in-memory
/// implementation returns immediately-ready futures.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put_document`](Store::put_document) | Store a submitted document |
/// | [`get_document`](Store::get_document) | Fetch a document by id |
/// | [`create_job`](Store::create_job) | Register a new analysis job |
/// | [`get_job`](Store::get_job) | Fetch a job by id |
/// | [`record_step`](Store::record_step) | Append a completed step and update confidence |
/// | [`finish_job`](Store::finish_job) | Transition a job to its terminal state |
/// | [`put_result`](Store::put_result) | Store a completed analysis result |
/// | [`get_result`](Store::get_result) | Fetch a result by id |
/// | [`list_results`](Store::list_results) | List result summaries, newest first |
#[async_trait]
pub trait Store: Send + Sync {
    /// Store a submitted document. Documents are immutable once stored.
    async fn put_document(&self, doc: &Document) -> Result<()>;

    /// Fetch a document by id.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Register a new analysis job in `Processing` state.
    async fn create_job(&self, job: &AnalysisJob) -> Result<()>;

    /// Fetch a job by id.
    async fn get_job(&self, id: &str) -> Result<Option<AnalysisJob>>;

    /// Append a completed step to a job and set its progress-derived
    /// confidence. Errors if the job is unknown or already complete.
    async fn record_step(&self, job_id: &str, step: &str, confidence: u8) -> Result<()>;

    /// Mark a job `Complete` with its result id and final confidence.
    /// Errors if the job is unknown; a second call on a completed job is
    /// rejected so the terminal state never changes.
    async fn finish_job(&self, job_id: &str, result_id: &str, confidence: u8) -> Result<()>;

    /// Store a completed analysis result. Results are write-once.
    async fn put_result(&self, result: &AnalysisResult) -> Result<()>;

    /// Fetch a full result by id.
    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>>;

    /// List result summaries, newest first.
    async fn list_results(&self) -> Result<Vec<ResultSummary>>;
}
