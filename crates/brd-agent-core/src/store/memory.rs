//! In-memory [`Store`] implementation.
//!
//! `HashMap`s behind `std::sync::RwLock` for thread safety. This is the
//! production store for the single-process deployment model (durability
//! across restarts is out of scope) and the default store in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{AnalysisJob, AnalysisResult, Document, JobStatus, ResultSummary};

use super::Store;

/// In-memory store guarding each collection with its own lock.
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    jobs: RwLock<HashMap<String, AnalysisJob>>,
    results: RwLock<HashMap<String, AnalysisResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_document(&self, doc: &Document) -> Result<()> {
        self.docs
            .write()
            .unwrap()
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    async fn create_job(&self, job: &AnalysisJob) -> Result<()> {
        self.jobs
            .write()
            .unwrap()
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<AnalysisJob>> {
        Ok(self.jobs.read().unwrap().get(id).cloned())
    }

    async fn record_step(&self, job_id: &str, step: &str, confidence: u8) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        let job = match jobs.get_mut(job_id) {
            Some(j) => j,
            None => bail!("job {} not found", job_id),
        };
        if job.status == JobStatus::Complete {
            bail!("job {} is already complete", job_id);
        }
        job.completed_steps.push(step.to_string());
        job.confidence = confidence;
        Ok(())
    }

    async fn finish_job(&self, job_id: &str, result_id: &str, confidence: u8) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        let job = match jobs.get_mut(job_id) {
            Some(j) => j,
            None => bail!("job {} not found", job_id),
        };
        if job.status == JobStatus::Complete {
            bail!("job {} is already complete", job_id);
        }
        job.status = JobStatus::Complete;
        job.result_id = Some(result_id.to_string());
        job.confidence = confidence;
        Ok(())
    }

    async fn put_result(&self, result: &AnalysisResult) -> Result<()> {
        self.results
            .write()
            .unwrap()
            .insert(result.id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.results.read().unwrap().get(id).cloned())
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>> {
        let mut summaries: Vec<ResultSummary> = self
            .results
            .read()
            .unwrap()
            .values()
            .map(|r| r.summary())
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}
