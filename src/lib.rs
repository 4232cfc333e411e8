//! Personal work-memory and time-tracking daemon, exposed as an MCP server.
//!
//! Mosaic records work sessions, meetings, people, projects, clients, notes,
//! and reminders for a single user, and answers questions about them through
//! a structured query DSL. A conversational client drives it over MCP stdio.
//!
//! # Architecture
//!
//! - **Storage**: SQLite via `rusqlite` — eleven entity tables with enforced
//!   foreign keys (RESTRICT on the billing-critical edges)
//! - **Time accounting**: half-hour duration rounding ([`rounding`]),
//!   meeting→work-session generation ([`store::meetings`]), and
//!   privacy-filtered timecards ([`timecard`])
//! - **Query engine**: a typed DSL with relationship-path traversal,
//!   compiled to SQL against a static relationship graph ([`query`])
//! - **Reminders**: a periodic scheduler ([`scheduler`]) driving an HTTP
//!   notification bridge with retry ([`notify`])
//! - **Transport**: MCP over stdio via `rmcp` ([`server`], [`tools`])
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and migrations
//! - [`store`] — The entity store: typed records and CRUD per entity
//! - [`query`] — Structured query DSL: AST, validation, compilation, privacy
//! - [`scheduler`] / [`notify`] — Due-reminder scanning and bridge delivery

pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod query;
pub mod recurrence;
pub mod rounding;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod timecard;
pub mod tools;
