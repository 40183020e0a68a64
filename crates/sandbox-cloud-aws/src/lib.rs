//! AWS provider for sandbox
//!
//! Implements [`sandbox_cloud::StorageProvider`] on top of Amazon S3 so a
//! sandbox becomes one S3 bucket with static website hosting enabled.
//!
//! # Requirements
//!
//! - AWS credentials resolvable by the default chain (environment,
//!   `~/.aws/credentials`, SSO, instance metadata)
//! - Permission to create buckets, lift their public access block, and
//!   manage their policy, website, and tagging configuration
//!
//! # Example
//!
//! ```ignore
//! use sandbox_cloud::SandboxController;
//! use sandbox_cloud_aws::S3Provider;
//!
//! let provider = S3Provider::from_env(Some("eu-west-3".to_string())).await;
//! let controller = SandboxController::new(provider);
//! let groups = controller.list().await?;
//! ```

pub mod client;
pub mod content_type;

pub use client::{DEFAULT_REGION, S3Provider, website_host};
