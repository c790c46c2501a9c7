//! Analysis progress reporting.
//!
//! Reports observable progress while an analysis job runs so CLI users see
//! which phase is active and how the embedding pass went. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event from the orchestrator's step loop.
#[derive(Clone, Debug)]
pub enum AnalysisEvent {
    /// A paced pipeline step finished.
    StepCompleted {
        job_id: String,
        step: String,
        completed: usize,
        total: usize,
    },
    /// The embedding pass finished.
    Embedded {
        job_id: String,
        embedded: usize,
        skipped: usize,
    },
    /// A generation stage degraded to its deterministic fallback.
    FellBack { job_id: String, stage: &'static str },
    /// The job reached its terminal state.
    Completed {
        job_id: String,
        result_id: String,
        confidence: u8,
    },
}

/// Reports analysis progress. Implementations write to stderr (human or JSON).
pub trait AnalysisProgress: Send + Sync {
    /// Emit a progress event. Called from the orchestrator task.
    fn report(&self, event: AnalysisEvent);
}

/// Human-friendly progress on stderr:
/// `analyze 3f2a…  step 4/6  Extracting Requirements`.
pub struct StderrProgress;

impl AnalysisProgress for StderrProgress {
    fn report(&self, event: AnalysisEvent) {
        let line = match &event {
            AnalysisEvent::StepCompleted {
                job_id,
                step,
                completed,
                total,
            } => format!("analyze {}  step {}/{}  {}\n", job_id, completed, total, step),
            AnalysisEvent::Embedded {
                job_id,
                embedded,
                skipped,
            } => format!(
                "analyze {}  embedded {} chunks ({} skipped)\n",
                job_id, embedded, skipped
            ),
            AnalysisEvent::FellBack { job_id, stage } => {
                format!("analyze {}  {} fell back to canned content\n", job_id, stage)
            }
            AnalysisEvent::Completed {
                job_id,
                result_id,
                confidence,
            } => format!(
                "analyze {}  complete  result {}  confidence {}\n",
                job_id, result_id, confidence
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl AnalysisProgress for JsonProgress {
    fn report(&self, event: AnalysisEvent) {
        let obj = match &event {
            AnalysisEvent::StepCompleted {
                job_id,
                step,
                completed,
                total,
            } => serde_json::json!({
                "event": "step",
                "job": job_id,
                "step": step,
                "completed": completed,
                "total": total
            }),
            AnalysisEvent::Embedded {
                job_id,
                embedded,
                skipped,
            } => serde_json::json!({
                "event": "embedded",
                "job": job_id,
                "embedded": embedded,
                "skipped": skipped
            }),
            AnalysisEvent::FellBack { job_id, stage } => serde_json::json!({
                "event": "fallback",
                "job": job_id,
                "stage": stage
            }),
            AnalysisEvent::Completed {
                job_id,
                result_id,
                confidence,
            } => serde_json::json!({
                "event": "complete",
                "job": job_id,
                "result": result_id,
                "confidence": confidence
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled (the server default).
pub struct NoProgress;

impl AnalysisProgress for NoProgress {
    fn report(&self, _event: AnalysisEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> std::sync::Arc<dyn AnalysisProgress> {
        match self {
            ProgressMode::Off => std::sync::Arc::new(NoProgress),
            ProgressMode::Human => std::sync::Arc::new(StderrProgress),
            ProgressMode::Json => std::sync::Arc::new(JsonProgress),
        }
    }
}
