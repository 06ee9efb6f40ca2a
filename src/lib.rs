//! # fusion-query
//!
//! Natural-language query backend over two marketing data sources: a
//! web-analytics reporting API and a technical SEO audit spreadsheet.
//!
//! A question is classified by intent and either answered by one
//! specialist or decomposed by a planner into ordered tasks whose answers
//! an aggregator fuses. Every model-generated query is checked against
//! allow-lists before any source is called, and audit figures are computed
//! locally so the final text carries exact numbers.
//!
//! ## Modules
//!
//! - [`core`]: structured queries, validation, normalization, reduction
//! - [`sources`]: analytics and audit source adapters
//! - [`agent`]: providers, retry, router, planner, specialists, aggregator
//! - [`cli`]: command-line interface
//! - `server`: HTTP endpoint (feature `server`)

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
#[cfg(feature = "server")]
pub mod server;
pub mod sources;

pub use agent::{Orchestrator, QueryOutcome, QueryRequest};
pub use error::{AgentError, Error, Result};
