//! # treesync-core
//!
//! Incremental tree synchronization: maintains a hierarchical view over a flat collection of
//! records, for display in a tabular UI.
//!
//! ## Overview
//!
//! A [`engine::TreeEngine`] owns one tree. Callers feed it a full record set
//! ([`engine::TreeEngine::set_rows`]) or a delta ([`engine::TreeEngine::apply_transaction`]),
//! and after every run they get back a consistent, identity-stable tree, the minimal set of
//! nodes whose subtree changed, and diagnostics for everything that was wrong with the input.
//!
//! ### Key Features
//!
//! - **Three addressing schemes**: nested children, per-record data paths (with synthetic
//!   filler groups), and parent-id references
//! - **Minimal mutation**: children arrays are rewritten only where a slot actually changed;
//!   unchanged subtrees are never visited
//! - **Identity-stable**: nodes survive reloads, so expansion and selection survive too
//! - **Error tolerance**: duplicate identities and paths, unresolved parents and parent cycles
//!   are recovered inside the run and reported, never raised
//! - **Change notifications**: [`event::TreeEvent`]s over an optional `mpsc` channel
//!
//! ## Architecture
//!
//! - **[`node`]**, **[`arena`]**, **[`tree`]**: the node model, stored in a generational arena
//! - **[`strategy`]**: the [`strategy::AddressingStrategy`] seam and its three implementations
//! - **[`sync`]**: the two-pass synchronizer (attach, then traverse)
//! - **[`cycle`]**: re-roots rows caught in parent cycles
//! - **[`changes`]**: the change path handed to renderers
//! - **[`selection`]**: tri-state selection cascade
//! - **[`config`]**, **[`json`]**: TOML configuration and accessors for JSON records
//!
//! ## Quick Start
//!
//! ```rust
//! use treesync_core::{config::TreeConfig, engine::TreeEngine, strategy::Addressing};
//!
//! #[derive(Debug, Clone)]
//! struct Store {
//!     region: &'static str,
//!     state: &'static str,
//!     name: &'static str,
//! }
//!
//! let addressing = Addressing::data_path(|s: &Store| {
//!     Some(vec![s.region.to_string(), s.state.to_string(), s.name.to_string()])
//! });
//! let mut engine = TreeEngine::new(addressing, TreeConfig::default());
//! let report = engine.set_rows(
//!     vec![
//!         Store { region: "East", state: "NY", name: "StoreA" },
//!         Store { region: "East", state: "NY", name: "StoreB" },
//!     ],
//!     false,
//! );
//! assert!(report.diagnostics.is_empty());
//!
//! let root = engine.root();
//! let east = engine.children(root).unwrap()[0];
//! assert_eq!(engine.node(east).unwrap().key(), "East");
//! assert_eq!(engine.leaf_descendants(east).unwrap().len(), 2);
//! assert!(engine.check_invariants().is_empty());
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `treesync` inspection CLI

pub mod arena;
pub mod changes;
pub mod config;
pub mod cycle;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod event;
pub mod json;
pub mod node;
pub mod selection;
pub mod strategy;
pub mod sync;
#[cfg(test)]
mod tests;
pub mod tree;

pub use error::*;
