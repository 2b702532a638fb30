use std::fmt::Debug;

use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::{
    Api, Resource, ResourceExt,
    api::{ListParams, Patch, PatchParams},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use snafu::{OptionExt, ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to get resource {name:?}"))]
    GetResource { source: kube::Error, name: String },

    #[snafu(display("failed to list resources"))]
    ListResources { source: kube::Error },

    #[snafu(display("failed to apply patch to resource {name:?}"))]
    ApplyPatch { source: kube::Error, name: String },

    #[snafu(display("failed to merge patch resource {name:?}"))]
    MergePatch { source: kube::Error, name: String },

    #[snafu(display("failed to patch status of resource {name:?}"))]
    PatchStatus { source: kube::Error, name: String },

    #[snafu(display("resource {name:?} has no namespace"))]
    ObjectHasNoNamespace { name: String },
}

/// This `Client` can be used to access Kubernetes.
/// It wraps an underlying [`kube::Client`] and provides some common functionality.
#[derive(Clone)]
pub struct Client {
    client: kube::Client,
    patch_params: PatchParams,
    apply_patch_params: PatchParams,
}

impl Client {
    pub fn new(client: kube::Client, field_manager: &str) -> Self {
        Self {
            client,
            patch_params: PatchParams {
                field_manager: Some(field_manager.to_owned()),
                ..PatchParams::default()
            },
            apply_patch_params: PatchParams::apply(field_manager).force(),
        }
    }

    /// Returns a [`kube::Client`] that can be freely used.
    /// It does not need to be cloned before first use.
    pub fn as_kube_client(&self) -> kube::Client {
        self.client.clone()
    }

    /// Retrieves a single instance of the requested namespaced resource type with the given name.
    pub async fn get<T>(&self, resource_name: &str, namespace: &str) -> Result<T>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        self.get_namespaced_api(namespace)
            .get(resource_name)
            .await
            .context(GetResourceSnafu {
                name: resource_name,
            })
    }

    /// Retrieves a single instance of the requested cluster-scoped resource type.
    pub async fn get_cluster<T>(&self, resource_name: &str) -> Result<T>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        self.get_all_api()
            .get(resource_name)
            .await
            .context(GetResourceSnafu {
                name: resource_name,
            })
    }

    /// Retrieves all instances of the requested cluster-scoped resource type.
    pub async fn list_cluster<T>(&self) -> Result<Vec<T>>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        self.list_cluster_with_params(&ListParams::default()).await
    }

    /// Retrieves all instances of the requested cluster-scoped resource type
    /// whose labels match `label_query`, as produced by
    /// [`LabelSelectorExt::to_query_string`](crate::label_selector::LabelSelectorExt::to_query_string).
    pub async fn list_cluster_with_label_selector<T>(&self, label_query: &str) -> Result<Vec<T>>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        self.list_cluster_with_params(&ListParams::default().labels(label_query))
            .await
    }

    async fn list_cluster_with_params<T>(&self, params: &ListParams) -> Result<Vec<T>>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        Ok(self
            .get_all_api()
            .list(params)
            .await
            .context(ListResourcesSnafu)?
            .items)
    }

    /// Patches a resource using the `APPLY` patch strategy.
    /// This will _create_ or _update_ existing resources.
    pub async fn apply_patch<T>(&self, resource: &T) -> Result<T>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Serialize
            + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        let name = resource.name_any();
        self.namespaced_api_of(resource)?
            .patch(&name, &self.apply_patch_params, &Patch::Apply(resource))
            .await
            .context(ApplyPatchSnafu { name })
    }

    /// Patches a resource using the `MERGE` patch strategy.
    /// This will fail for objects that do not exist yet.
    pub async fn merge_patch<T, P>(&self, resource: &T, patch: &P) -> Result<T>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
        P: Debug + Serialize,
    {
        let name = resource.name_any();
        self.namespaced_api_of(resource)?
            .patch(&name, &self.patch_params, &Patch::Merge(patch))
            .await
            .context(MergePatchSnafu { name })
    }

    /// Replaces the status of a resource using the `MERGE` patch strategy.
    pub async fn merge_patch_status<T, S>(&self, resource: &T, status: &S) -> Result<T>
    where
        T: Clone
            + Debug
            + DeserializeOwned
            + Resource<DynamicType = (), Scope = NamespaceResourceScope>,
        S: Debug + Serialize,
    {
        let name = resource.name_any();
        self.namespaced_api_of(resource)?
            .patch_status(
                &name,
                &self.patch_params,
                &Patch::Merge(json!({ "status": status })),
            )
            .await
            .context(PatchStatusSnafu { name })
    }

    fn namespaced_api_of<T>(&self, resource: &T) -> Result<Api<T>>
    where
        T: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        let namespace = resource.namespace().context(ObjectHasNoNamespaceSnafu {
            name: resource.name_any(),
        })?;
        Ok(self.get_namespaced_api(&namespace))
    }

    pub fn get_all_api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = ()>,
    {
        Api::all(self.client.clone())
    }

    pub fn get_namespaced_api<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}
