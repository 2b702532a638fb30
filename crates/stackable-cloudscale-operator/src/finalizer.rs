use std::fmt::Debug;

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::{Client, Result};

/// Checks whether our own finalizer is in the list of finalizers for the provided object.
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .iter()
        .flatten()
        .any(|f| f == finalizer)
}

/// Checks whether the provided object has a deletion timestamp set.
/// If that is the case the object is in the process of being deleted pending the handling of all finalizers.
pub fn has_deletion_stamp<T: Resource>(resource: &T) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

/// Returns the finalizers of `resource` with `finalizer` added or removed.
fn finalizers_with<T: Resource>(resource: &T, finalizer: &str, present: bool) -> Vec<String> {
    let mut finalizers: Vec<String> = resource
        .meta()
        .finalizers
        .iter()
        .flatten()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    if present {
        finalizers.push(finalizer.to_owned());
    }
    finalizers
}

/// Adds the passed finalizer to the list of finalizers for the resource and
/// updates the resource in Kubernetes.
pub async fn add_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<T>
where
    T: Clone
        + Debug
        + DeserializeOwned
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    // A merge patch replaces lists as a whole, so the full list is sent.
    let patch = json!({
        "metadata": {
            "finalizers": finalizers_with(resource, finalizer, true)
        }
    });
    client.merge_patch(resource, &patch).await
}

/// Removes our finalizer from a resource object.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<T>
where
    T: Clone
        + Debug
        + DeserializeOwned
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    let patch = json!({
        "metadata": {
            "finalizers": finalizers_with(resource, finalizer, false)
        }
    });
    client.merge_patch(resource, &patch).await
}
