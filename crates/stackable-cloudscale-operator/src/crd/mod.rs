//! Custom resources served by the cloudscale operator.
//!
//! * [`Bucket`] is the namespaced claim end users create.
//! * [`S3BucketClass`] is the cluster-scoped template claims are bound to.
//! * [`S3Bucket`] is the managed resource representing one provisioned bucket.
//! * [`Provider`] points at the credentials used to talk to cloudscale.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod bucket_claim;
mod provider;
mod s3_bucket;

pub use bucket_claim::*;
pub use provider::*;
pub use s3_bucket::*;

/// The API group shared by all resources of this operator.
pub const GROUP: &str = "cloudscale.stackable.tech";

/// Annotation marking an [`S3BucketClass`] as the default class for claims
/// which neither reference nor select a class.
pub const DEFAULT_CLASS_ANNOTATION: &str = "cloudscale.stackable.tech/is-default-class";

/// Annotation overriding the externally visible name of an [`S3Bucket`].
pub const EXTERNAL_NAME_ANNOTATION: &str = "cloudscale.stackable.tech/external-name";

/// Decides what happens to the external bucket once its claim is gone.
#[derive(
    strum::Display,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[strum(serialize_all = "PascalCase")]
pub enum ReclaimPolicy {
    /// Keep the external bucket and object user.
    #[default]
    Retain,

    /// Delete the external bucket and object user.
    Delete,
}

/// Tracks whether a resource may be, or already is, bound to a claim.
#[derive(
    strum::Display,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[strum(serialize_all = "PascalCase")]
pub enum BindingPhase {
    /// Not ready to be bound yet.
    #[default]
    Unbindable,

    /// Ready to be bound to a claim.
    Unbound,

    /// Bound to a claim.
    Bound,

    /// Was bound to a claim which has since been deleted.
    Released,
}

impl BindingPhase {
    /// The phase a resource moves into once it is ready to serve a claim.
    ///
    /// A resource which is already bound stays bound.
    pub fn bindable(self) -> Self {
        match self {
            Self::Bound => Self::Bound,
            _ => Self::Unbound,
        }
    }
}

/// Reference to another Kubernetes object by name and, for namespaced
/// objects, namespace.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Where a connection secret should be written to.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

/// Selects a single key of a Secret.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

/// Canned ACLs cloudscale object storage accepts when creating a bucket.
#[derive(
    strum::Display,
    strum::EnumString,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CannedAcl {
    /// Applied when neither the class nor the claim picks an ACL.
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}
