//! # kegdb
//!
//! An embedded, file-backed key/value store organized into named buckets,
//! each bucket holding schema-typed JSON records addressed by a derived key:
//! - Fixed-width on-disk index mapping keys to payload locations
//! - Append-only data file with optional compression and encryption
//! - Tombstone deletion and two-file compaction
//! - Read/write cache with pluggable eviction
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Store (engine)                          │
//! │            CRUD · paging · filtering · compaction            │
//! └──────┬──────────────┬───────────────┬────────────────┬──────┘
//!        │              │               │                │
//!        ▼              ▼               ▼                ▼
//! ┌────────────┐ ┌────────────┐ ┌─────────────┐ ┌─────────────┐
//! │  Registry  │ │   Cache    │ │    Index    │ │ Data Store  │
//! │bucket.list │ │ (LRU/map)  │ │ <name>.list │ │ <name>.data │
//! └──────┬─────┘ └────────────┘ └─────────────┘ └──────┬──────┘
//!        │                                             │
//!        └──────────────────┬──────────────────────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │ Codec Pipeline  │
//!                  │ schema → json → │
//!                  │ zstd → AES-CBC  │
//!                  └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod codec;
pub mod index;
pub mod data;
pub mod cache;
pub mod bucket;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KegError, Result};
pub use config::{CacheOptions, CipherAlgorithm, Config, ConfigBuilder};
pub use engine::{FilteredPage, ItemPage, ListOptions, Order, Store};
pub use schema::{FieldDef, FieldType, Schema};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kegdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
