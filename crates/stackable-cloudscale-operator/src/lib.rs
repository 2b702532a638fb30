//! Kubernetes operator provisioning buckets on cloudscale.ch object storage.
//!
//! Users request buckets with [`crd::Bucket`] claims. The [`binding`] module
//! binds every claim to an [`crd::S3Bucket`] created from an
//! [`crd::S3BucketClass`], and the [`managed`] module drives each S3Bucket
//! through its lifecycle on cloudscale and publishes its credentials.

pub mod binding;
pub mod cli;
pub mod client;
pub mod cloudscale;
pub mod connection;
pub mod controller;
pub mod crd;
pub mod finalizer;
pub mod label_selector;
pub mod logging;
pub mod managed;
pub mod namespace;
pub mod naming;
pub mod status;

// External re-exports
pub use k8s_openapi;
pub use kube;
pub use schemars;
