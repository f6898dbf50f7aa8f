//! # phronesis
//!
//! Autonomous decision core for a long-running personal coaching agent:
//! a bounded cognitive loop over registered capabilities, and a belief
//! memory with similarity retrieval and a compare-merge protocol.
//!
//! ## Architecture
//!
//! - **Belief memory** (`belief`): confidence- and utility-weighted
//!   statements with an active/archived/superseded lifecycle, cosine
//!   retrieval, and oracle-driven merge resolution
//! - **Capabilities** (`action`): trait-based actions with runtime
//!   registration, failure-isolating execution, and deterministic quality
//!   scoring
//! - **Cognitive loop** (`cycle`): select → execute → observe with an
//!   evaluator-optimizer sub-loop for iteratively produced content
//! - **Graduated autonomy** (`autonomy`, `outbox`): low-impact changes
//!   self-apply; everything else queues for a human decision
//! - **Oracles** (`oracle`): narrow reasoning/embedding collaborator
//!   contracts with an Ollama-backed implementation
//!
//! ## Library usage
//!
//! ```no_run
//! use phronesis::agent::Agent;
//! use phronesis::config::CoreConfig;
//! use phronesis::oracle::{OllamaConfig, OllamaOracle};
//!
//! let mut reasoning = OllamaOracle::new(OllamaConfig::default());
//! reasoning.probe();
//! let mut embedding = OllamaOracle::new(OllamaConfig::default());
//! embedding.probe();
//!
//! let mut agent = Agent::new(
//!     CoreConfig::default(),
//!     Box::new(reasoning),
//!     Box::new(embedding),
//! );
//! let outcome = agent.run_cycle(Default::default());
//! println!("cycle ended after {} rounds", outcome.rounds);
//! ```

pub mod action;
pub mod agent;
pub mod autonomy;
pub mod belief;
pub(crate) mod clock;
pub mod config;
pub mod cycle;
pub mod episode;
pub mod error;
pub mod oracle;
pub mod outbox;
