//! # opsmate
//!
//! A platform operations assistant: intent-routed actions and
//! retrieval-augmented answers over an ingested runbook corpus.
//!
//! opsmate has two cooperating subsystems. The dialogue machine
//! classifies each user turn into an operational intent (restart, status,
//! logs, notify) and dispatches to an action executor, looping back to
//! classification for the next turn. Free-form questions instead take the
//! retrieval path: documents are chunked, embedded, and indexed ahead of
//! time, then the top-k nearest chunks condition a single generation
//! call.
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐
//! │ Documents │──▶│   Pipeline   │──▶│  SQLite   │
//! │ pdf/docx/ │   │ chunk+embed  │   │  vectors  │
//! │ xlsx/json │   └──────────────┘   └─────┬─────┘
//! └───────────┘                            │ top-k
//!                                          ▼
//!   user turn ──▶ classify ──▶ action ┐  retrieve ──▶ generate
//!                     ▲               │
//!                     └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! opsmate init                    # create database
//! opsmate ingest ./runbooks       # chunk, embed, and index documents
//! opsmate retrieve "rollback"     # inspect top-k chunks
//! opsmate ask "how do I roll back a deploy?"
//! opsmate chat                    # interactive assistant
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`agent`] | Intent routing and the dialogue machine |
//! | [`actions`] | Action executor contract and mocks |
//! | [`extract`] | Format-specific text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Generation provider abstraction |
//! | [`index`] | Vector index trait and in-memory backend |
//! | [`db`] | SQLite-backed vector index |
//! | [`ingest`] | Ingestion pipeline |
//! | [`retrieve`] | Top-k retrieval and response synthesis |
//! | [`chat`] | Interactive chat loop |

pub mod actions;
pub mod agent;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod retrieve;
