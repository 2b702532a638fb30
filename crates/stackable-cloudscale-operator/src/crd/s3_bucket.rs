use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    crd::{
        BindingPhase, CannedAcl, DEFAULT_CLASS_ANNOTATION, EXTERNAL_NAME_ANNOTATION,
        ObjectReference, ReclaimPolicy, SecretReference,
    },
    naming::derive_name,
    status::{Condition, HasConditions},
};

/// Bucket parameters shared between [`S3Bucket`] and the template of an [`S3BucketClass`].
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketParameters {
    /// Name of the external bucket. The first `%s` is replaced with the UID of
    /// the S3Bucket. Omit this field to use the UID alone as the name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_format: String,

    /// Tags added to the object user owning the bucket.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// A built-in ACL applied when the bucket is created. Defaults to `private`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canned_acl: Option<CannedAcl>,

    /// Region of the bucket, for example `lpg` or `rma`.
    pub region: String,
}

/// A bucket on cloudscale object storage together with the object user owning it.
#[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "cloudscale.stackable.tech",
    version = "v1alpha1",
    kind = "S3Bucket",
    plural = "s3buckets",
    shortname = "s3b",
    status = "S3BucketStatus",
    derive = "PartialEq",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    ),
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketSpec {
    pub for_provider: S3BucketParameters,

    /// The [`Provider`](crate::crd::Provider) holding the cloudscale API token.
    pub provider_ref: ObjectReference,

    #[serde(default)]
    pub reclaim_policy: ReclaimPolicy,

    /// Where to publish the bucket credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,

    /// The claim this bucket is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_ref: Option<ObjectReference>,

    /// The class this bucket was configured from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_ref: Option<ObjectReference>,
}

#[derive(
    strum::Display,
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum S3BucketPhase {
    Creating,
    Online,
    Deleting,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<S3BucketPhase>,

    #[serde(default)]
    pub at_provider: S3BucketObservation,

    #[serde(default)]
    pub binding_phase: BindingPhase,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl HasConditions for S3BucketStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

impl S3Bucket {
    /// The name of the bucket on cloudscale.
    ///
    /// An explicit external name annotation wins, otherwise the name is derived
    /// from the UID and the configured name format. Returns [`None`] as long as
    /// the object has not been persisted and therefore has no UID.
    pub fn external_name(&self) -> Option<String> {
        if let Some(name) = self.annotations().get(EXTERNAL_NAME_ANNOTATION) {
            return Some(name.clone());
        }
        let uid = self.uid()?;
        Some(derive_name(&self.spec.for_provider.name_format, &uid))
    }

    /// The identifier of the object user last observed or created for this bucket.
    pub fn object_user_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.object_user_id.as_deref())
    }

    pub fn phase(&self) -> Option<S3BucketPhase> {
        self.status.as_ref().and_then(|status| status.phase)
    }

    pub fn binding_phase(&self) -> BindingPhase {
        self.status
            .as_ref()
            .map(|status| status.binding_phase)
            .unwrap_or_default()
    }

    pub fn status_mut(&mut self) -> &mut S3BucketStatus {
        self.status.get_or_insert_with(S3BucketStatus::default)
    }
}

/// Template for dynamically provisioned [`S3Bucket`]s.
#[derive(Clone, CustomResource, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "cloudscale.stackable.tech",
    version = "v1alpha1",
    kind = "S3BucketClass",
    plural = "s3bucketclasses",
    derive = "PartialEq",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketClassSpec {
    pub for_provider: S3BucketParameters,

    /// The [`Provider`](crate::crd::Provider) copied into every bucket of this class.
    pub provider_ref: ObjectReference,

    /// Defaults to `Retain` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reclaim_policy: Option<ReclaimPolicy>,

    /// Namespace connection secrets of buckets of this class are written to.
    /// Defaults to the namespace of the claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secrets_to_namespace: Option<String>,
}

impl S3BucketClass {
    /// Whether this class is annotated as the default class.
    pub fn is_default(&self) -> bool {
        self.annotations()
            .get(DEFAULT_CLASS_ANNOTATION)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}
