//! # BRD Agent
//!
//! An AI-assisted pipeline that turns unstructured project communications
//! (pasted text, plain-text files, meeting transcripts) into structured
//! business requirements, with an embedding-based retrieval layer for
//! grounded follow-up chat over the source document.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────────────┐   ┌───────────┐
//! │ Submission │──▶│ Analysis pipeline │──▶│  Store    │
//! │ text/url   │   │ chunk·embed·LLM   │   │ in-memory │
//! └────────────┘   └───────────────────┘   └─────┬─────┘
//!                                                │
//!                             ┌──────────────────┤
//!                             ▼                  ▼
//!                        ┌─────────┐       ┌──────────┐
//!                        │   CLI   │       │   HTTP   │
//!                        │  (brd)  │       │  (JSON)  │
//!                        └─────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`generation`] | Generative-model provider abstraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`analyze`] | Analysis orchestration |
//! | [`chat`] | Retrieval-augmented chat |
//! | [`progress`] | Analysis progress reporting |
//! | [`server`] | JSON HTTP server |
//!
//! Pure logic (models, chunking, ranking, insight parsing, the store
//! trait) lives in the `brd-agent-core` crate.

pub mod analyze;
pub mod chat;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod progress;
pub mod server;
