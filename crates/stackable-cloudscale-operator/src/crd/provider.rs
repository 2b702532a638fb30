use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::SecretKeySelector;

/// Credentials for the cloudscale API, shared by all buckets referencing this provider.
#[derive(Clone, CustomResource, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "cloudscale.stackable.tech",
    version = "v1alpha1",
    kind = "Provider",
    plural = "providers",
    derive = "PartialEq",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// A Secret key containing a cloudscale API token with write access.
    pub credentials_secret_ref: SecretKeySelector,
}
