//! Two-tier memory and workflow checkpointing for the Swarmflow framework.
//!
//! The short-term tier is a bounded TTL cache for in-flight task context;
//! the long-term tier is a durable, similarity-searchable store of findings
//! and past decisions. Checkpoints snapshot whole-workflow state so a run
//! can be recovered after a crash.
//!
//! # Main types
//!
//! - [`ShortTermMemory`] — Bounded key/value cache with TTL expiry and
//!   LRU eviction by access time.
//! - [`LongTermMemory`] — Vector-similarity store with disk persistence.
//! - [`VectorStore`] — Trait for vector backends; [`InMemoryVectorStore`]
//!   is the brute-force cosine reference implementation.
//! - [`EmbeddingProvider`] — Trait for text embeddings; [`HashEmbedding`]
//!   is the deterministic local stand-in.
//! - [`CheckpointManager`] — Durable snapshot/restore of workflow state.
//! - [`MemoryManager`] — Facade unifying the three tiers.

/// Workflow checkpoint records and their manager.
pub mod checkpoint;
/// Embedding provider trait and local hash-based implementation.
pub mod embedding;
/// Durable vector-similarity memory.
pub mod long_term;
/// Unified memory facade.
pub mod manager;
/// Bounded TTL + LRU cache for task context.
pub mod short_term;
/// Vector store trait and brute-force reference implementation.
pub mod vector;

pub use checkpoint::{Checkpoint, CheckpointInfo, CheckpointManager};
pub use embedding::{EmbeddingProvider, HashEmbedding};
pub use long_term::LongTermMemory;
pub use manager::MemoryManager;
pub use short_term::{MemoryEntry, MemoryStats, ShortTermMemory};
pub use vector::{InMemoryVectorStore, ScoredHit, VectorRecord, VectorStore};
