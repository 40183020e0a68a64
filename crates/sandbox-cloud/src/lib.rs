//! Sandbox lifecycle core
//!
//! This crate manages per-branch preview environments, each backed by one
//! object-storage bucket configured as a static website.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  sandbox CLI                     │
//! │        (create / deploy / remove / info / ls)    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                sandbox-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          SandboxController                │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────┐ ┌────────────────┐   │
//! │  │  naming  │ │ observe  │ │ transfer engine│   │
//! │  └──────────┘ └──────────┘ └────────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │     trait StorageProvider { ... }         │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ sandbox-cloud │
//!           │     -aws      │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod observe;
pub mod provider;
pub mod transfer;

#[cfg(test)]
mod mock;

// Re-exports
pub use action::{Step, StepReport};
pub use error::{Result, SandboxError};
pub use lifecycle::{
    CreateOutcome, InfoMode, SandboxController, SandboxGroups, SandboxInfo, SandboxListing,
    SandboxTarget, UNKNOWN_GROUP,
};
pub use naming::{CanonicalName, MAX_NAME_LEN, slugify};
pub use observe::{Observer, RemoteState, SandboxEntry};
pub use provider::{
    BucketSummary, CannedAcl, INDEX_DOCUMENT, ObjectFailure, ObjectPage, PROJECT_TAG,
    StorageProvider, TagSet, WebsiteConfig, public_read_policy,
};
pub use transfer::{
    NoOpSink, ProgressSink, SyncDirection, TransferEngine, TransferEvent, TransferOptions,
    TransferSummary, sink_fn,
};
