//! Analysis orchestration.
//!
//! Coordinates the full pipeline for one submitted document: paced progress
//! steps → chunking → per-chunk embedding → structured insight extraction →
//! narrative rendering → persistence. Every failure path still terminates
//! in a `Complete` job: embedding failures shrink the vector set, and
//! generation failures substitute deterministic fallback content.
//!
//! One orchestration run exists per submission; resubmitting the same
//! document creates an independent job and result.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use brd_agent_core::chunk::chunk_text;
use brd_agent_core::insights::{fallback_insights, parse_insights, render_narrative, Insights};
use brd_agent_core::models::{AnalysisJob, AnalysisResult, Document, InputKind, VectorRecord};
use brd_agent_core::store::Store;

use crate::config::AnalysisConfig;
use crate::embedding::Embedder;
use crate::generation::Generator;
use crate::progress::{AnalysisEvent, AnalysisProgress};

/// The fixed six-phase step plan reported while a job runs.
pub const ANALYSIS_STEPS: [&str; 6] = [
    "Ingesting Communication",
    "Reconstructing Context",
    "Filtering Noise",
    "Extracting Requirements",
    "Mapping Stakeholders",
    "Generating BRD",
];

/// Progress-derived confidence tops out here; a successful model response
/// supersedes it with the model's own score.
const PROGRESS_CONFIDENCE_CEILING: f64 = 92.0;

/// Runs analysis jobs against injected store and model adapters.
#[derive(Clone)]
pub struct Analyzer {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    settings: AnalysisConfig,
    progress: Arc<dyn AnalysisProgress>,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: AnalysisConfig,
        progress: Arc<dyn AnalysisProgress>,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            settings,
            progress,
        }
    }

    /// Start an analysis job for `doc` and return its id immediately.
    ///
    /// The pipeline runs on a spawned task; callers poll the job via the
    /// store. The task never leaves the job stuck in `Processing` — any
    /// upstream failure routes to fallback content and a terminal
    /// `Complete`.
    pub async fn submit(&self, doc: &Document) -> Result<String> {
        let job = AnalysisJob::new(Uuid::new_v4().to_string(), &ANALYSIS_STEPS);
        let job_id = job.id.clone();
        self.store.create_job(&job).await?;

        let this = self.clone();
        let doc = doc.clone();
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run_analysis(&task_job_id, &doc).await {
                eprintln!("Warning: analysis {} aborted: {}", task_job_id, e);
            }
        });

        Ok(job_id)
    }

    /// Run the pipeline inline and wait for it. Returns `(job_id, result_id)`.
    ///
    /// Used by the one-shot CLI path; the server uses [`submit`](Self::submit).
    pub async fn analyze_now(&self, doc: &Document) -> Result<(String, String)> {
        let job = AnalysisJob::new(Uuid::new_v4().to_string(), &ANALYSIS_STEPS);
        let job_id = job.id.clone();
        self.store.create_job(&job).await?;
        let result_id = self.run_analysis(&job_id, doc).await?;
        Ok((job_id, result_id))
    }

    /// The pipeline body. Only store failures propagate; model failures are
    /// absorbed into fallbacks.
    async fn run_analysis(&self, job_id: &str, doc: &Document) -> Result<String> {
        self.pace_steps(job_id).await?;

        let records = self.embed_document(job_id, &doc.content).await;
        let insights = self.extract_insights(job_id, doc).await;
        let narrative = self.render_document(job_id, &insights).await;

        let result = AnalysisResult {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            file_name: doc.file_name.clone(),
            kind: doc.kind,
            insights,
            records,
            narrative,
            created_at: chrono::Utc::now(),
        };
        let confidence = result.insights.confidence_score;
        let result_id = result.id.clone();

        self.store.put_result(&result).await?;
        self.store.finish_job(job_id, &result_id, confidence).await?;
        self.progress.report(AnalysisEvent::Completed {
            job_id: job_id.to_string(),
            result_id: result_id.clone(),
            confidence,
        });

        Ok(result_id)
    }

    /// Walk the six-phase plan at the configured pace, deriving interim
    /// confidence from completed/total. The delay suspends this task only;
    /// polling and chat stay responsive.
    async fn pace_steps(&self, job_id: &str) -> Result<()> {
        let total = ANALYSIS_STEPS.len();
        for (i, step) in ANALYSIS_STEPS.iter().enumerate() {
            if self.settings.step_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.settings.step_delay_ms))
                    .await;
            }
            let confidence =
                ((i + 1) as f64 / total as f64 * PROGRESS_CONFIDENCE_CEILING).round() as u8;
            self.store.record_step(job_id, step, confidence).await?;
            self.progress.report(AnalysisEvent::StepCompleted {
                job_id: job_id.to_string(),
                step: step.to_string(),
                completed: i + 1,
                total,
            });
        }
        Ok(())
    }

    /// Chunk the content and embed each chunk. Blank chunks are skipped
    /// before calling the adapter; a failed chunk is skipped (not retried
    /// within this job) so the pass degrades partially instead of failing.
    async fn embed_document(&self, job_id: &str, content: &str) -> Vec<VectorRecord> {
        let chunks = chunk_text(
            content,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        );

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for chunk in chunks {
            if chunk.text.trim().is_empty() {
                continue;
            }
            match self.embedder.embed(&chunk.text).await {
                Ok(embedding) => records.push(VectorRecord { chunk, embedding }),
                Err(e) => {
                    eprintln!(
                        "Warning: embedding failed for chunk at offset {}: {}",
                        chunk.offset, e
                    );
                    skipped += 1;
                }
            }
        }

        self.progress.report(AnalysisEvent::Embedded {
            job_id: job_id.to_string(),
            embedded: records.len(),
            skipped,
        });

        records
    }

    /// Ask the model for structured insights; any call or parse failure
    /// substitutes the deterministic fallback set.
    async fn extract_insights(&self, job_id: &str, doc: &Document) -> Insights {
        let prompt = extraction_prompt(doc);
        match self.generator.generate(&prompt).await {
            Ok(raw) => match parse_insights(&raw) {
                Ok(insights) => insights,
                Err(e) => {
                    eprintln!("Warning: could not parse insight response: {}", e);
                    self.progress.report(AnalysisEvent::FellBack {
                        job_id: job_id.to_string(),
                        stage: "insight extraction",
                    });
                    fallback_insights()
                }
            },
            Err(e) => {
                eprintln!("Warning: insight generation failed: {}", e);
                self.progress.report(AnalysisEvent::FellBack {
                    job_id: job_id.to_string(),
                    stage: "insight extraction",
                });
                fallback_insights()
            }
        }
    }

    /// Second, independent model call rendering the insights into prose;
    /// its failure path is the pure template renderer.
    async fn render_document(&self, job_id: &str, insights: &Insights) -> String {
        let prompt = narrative_prompt(insights);
        match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Warning: narrative generation failed: {}", e);
                self.progress.report(AnalysisEvent::FellBack {
                    job_id: job_id.to_string(),
                    stage: "narrative rendering",
                });
                render_narrative(insights)
            }
        }
    }
}

/// Normalize submitted content into a [`Document`], truncating to the
/// configured cap (character-safe).
pub fn build_document(
    file_name: impl Into<String>,
    channel: impl Into<String>,
    kind: InputKind,
    content: &str,
    max_chars: usize,
) -> Document {
    let truncated: String = content.chars().take(max_chars).collect();
    Document {
        id: Uuid::new_v4().to_string(),
        file_name: file_name.into(),
        channel: channel.into(),
        kind,
        content: truncated,
        uploaded_at: chrono::Utc::now(),
    }
}

/// Resolve a meeting URL to a transcript.
///
/// TODO: wire a real meeting-platform transcript fetcher; this stub mirrors
/// the placeholder transcript the product ships with today.
pub fn transcript_for_url(url: &str) -> String {
    format!(
        "[Transcript fetched from {}]\n\n\
         Meeting Started.\n\
         Host: Welcome everyone to the architecture review.\n\
         Attendee: We need to ensure we discuss the new backend requirements today.\n\
         Host: Yes, primarily we need real-time data ingestion and RAG capabilities.\n\
         Attendee: Priority is high for the RAG feature. We also need to guarantee \
         99.9% uptime as a non-functional requirement.",
        url
    )
}

/// The structured-extraction request. Instructs the model to return JSON
/// matching the [`Insights`] wire shape, with stable per-category id
/// prefixes.
fn extraction_prompt(doc: &Document) -> String {
    let content = if doc.content.is_empty() {
        "Sample communication about project requirements"
    } else {
        &doc.content
    };

    format!(
        r#"You are a Business Requirements Document expert. Analyze the following communication and extract structured requirements.

Communication Source: {channel}
File: {file_name}
Content: {content}

Generate a JSON response with exactly this structure:
{{
  "functionalRequirements": [
    {{"id": "FR-01", "requirement": "...", "priority": "High|Medium|Low", "source": "..."}},
    ... (generate 8-10 items)
  ],
  "nonFunctionalRequirements": [
    {{"id": "NFR-01", "requirement": "...", "priority": "High|Medium|Low", "source": "..."}},
    ... (generate 5 items)
  ],
  "keyDecisions": [
    {{"id": "KD-01", "decision": "...", "madeBy": "...", "date": "..."}},
    ... (generate 4 items)
  ],
  "stakeholders": [
    {{"name": "...", "role": "...", "interest": "High|Medium|Low"}},
    ... (generate 4 items)
  ],
  "timeline": [
    {{"milestone": "...", "date": "...", "status": "Completed|In Progress|Planned"}},
    ... (generate 4 items)
  ],
  "confidenceScore": 92,
  "projectName": "Project Alpha",
  "executiveSummary": "...",
  "businessObjectives": ["...", "...", "..."]
}}

Return ONLY the JSON, no markdown."#,
        channel = doc.channel,
        file_name = doc.file_name,
        content = content,
    )
}

/// The narrative request rendering insights into a professional document.
fn narrative_prompt(insights: &Insights) -> String {
    let insights_json =
        serde_json::to_string_pretty(insights).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Create a professional Business Requirements Document based on:
{insights_json}

Format as a clean, professional document with sections:
1. Executive Summary
2. Business Objectives
3. Functional Requirements
4. Non-Functional Requirements
5. Stakeholder Map
6. Timeline
7. Risk Assessment

Keep it professional and concise."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_document_truncates_on_char_boundary() {
        let content = "é".repeat(20);
        let doc = build_document("a.txt", "email", InputKind::Text, &content, 10);
        assert_eq!(doc.content.chars().count(), 10);
    }

    #[test]
    fn test_extraction_prompt_includes_document() {
        let doc = build_document(
            "minutes.txt",
            "slack",
            InputKind::Text,
            "We need exports.",
            15_000,
        );
        let prompt = extraction_prompt(&doc);
        assert!(prompt.contains("Communication Source: slack"));
        assert!(prompt.contains("File: minutes.txt"));
        assert!(prompt.contains("We need exports."));
        assert!(prompt.contains("\"confidenceScore\""));
    }

    #[test]
    fn test_extraction_prompt_empty_content_placeholder() {
        let doc = build_document("x.txt", "email", InputKind::Text, "", 100);
        let prompt = extraction_prompt(&doc);
        assert!(prompt.contains("Sample communication about project requirements"));
    }

    #[test]
    fn test_step_plan_has_six_phases() {
        assert_eq!(ANALYSIS_STEPS.len(), 6);
        assert_eq!(ANALYSIS_STEPS[0], "Ingesting Communication");
        assert_eq!(ANALYSIS_STEPS[5], "Generating BRD");
    }
}
