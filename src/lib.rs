//! # Finishline
//!
//! An ingestion and consistency pipeline for historical race results.
//!
//! Finishline validates and normalizes tabular race-result exports, bulk
//! loads them into an OpenSearch-compatible document store, removes
//! duplicate records, and recomputes per-year summary statistics into a
//! separate aggregate collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌────────────┐
//! │ CSV      │──▶│ Validator  │──▶│ Bulk Loader │──▶│ raw index   │
//! │ source   │   │ +timefmt   │   │ (batched)   │   └─────┬──────┘
//! └──────────┘   └───────────┘   └────────────┘         │
//!                                          ┌────────────▼──────────┐
//!                                          │ Duplicate Resolver     │
//!                                          └────────────┬──────────┘
//!                                          ┌────────────▼──────────┐
//!                                          │ Aggregator → agg index │
//!                                          └───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! finl validate                 # source CSV -> validated CSV
//! finl load                     # validated CSV -> raw index
//! finl dedupe                   # remove duplicate documents
//! finl aggregate                # recompute per-year aggregates
//! finl rebuild                  # the whole pipeline, idempotently
//! finl stats                    # document counts per index
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Records, uniqueness keys, aggregates |
//! | [`timefmt`] | Finish-time codec |
//! | [`validate`] | Schema validation and normalization |
//! | [`store`] | Document-store abstraction (HTTP + in-memory) |
//! | [`load`] | Batched bulk loading with retry |
//! | [`dedupe`] | Duplicate detection and removal |
//! | [`aggregate`] | Per-year statistics and publication |
//! | [`rebuild`] | End-to-end rebuild orchestration |
//! | [`stats`] | Collection count overview |

pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod dedupe;
pub mod load;
pub mod models;
pub mod progress;
pub mod rebuild;
pub mod stats;
pub mod store;
pub mod timefmt;
pub mod validate;
