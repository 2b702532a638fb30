use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    crd::{BindingPhase, ObjectReference},
    status::{Condition, HasConditions},
};

/// A request for a bucket, decoupled from how and where it is provisioned.
///
/// A claim is bound to an [`S3Bucket`](crate::crd::S3Bucket), which is either
/// referenced directly via `resourceRef` or provisioned from an
/// [`S3BucketClass`](crate::crd::S3BucketClass). The class is referenced via
/// `classRef`, picked among the classes matching `classSelector`, or defaulted.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "cloudscale.stackable.tech",
    version = "v1alpha1",
    kind = "Bucket",
    plural = "buckets",
    status = "BucketStatus",
    derive = "PartialEq",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    ),
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    /// Name format of the bucket. The first `%s` is replaced with the UID of
    /// the provisioned S3Bucket. Defaults to the name format of the class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// One of `private`, `public-read`, `public-read-write` or `authenticated-read`.
    /// Any other value is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_acl: Option<String>,

    /// Selects the class to provision the bucket from by its labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_ref: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<ObjectReference>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    #[serde(default)]
    pub binding_phase: BindingPhase,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl HasConditions for BucketStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}
