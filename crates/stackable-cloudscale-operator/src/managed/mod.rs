//! Generic reconciler for managed resources.
//!
//! A managed resource represents exactly one resource outside of Kubernetes.
//! Each reconcile pass connects to the provider, observes the external
//! resource and then creates, updates or deletes it. Connection details
//! reported by the external client are published to the connection secret of
//! the managed resource.
//!
//! The reconciler is parameterized over the resource kind, so every instance
//! is wired to exactly one kind at compile time.

use std::{error::Error as StdError, fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt, runtime::controller::Action};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};
use tracing::Span;

use crate::{
    client::{self, Client},
    connection::{self, ConnectionDetails, publish_connection_details},
    crd::{ReclaimPolicy, SecretReference},
    finalizer::{add_finalizer, has_deletion_stamp, has_finalizer, remove_finalizer},
    logging::controller::ReconcilerError,
    status::{Condition, HasConditions},
};

pub mod bucket;

pub const FINALIZER: &str = "finalizer.managedresource.cloudscale.stackable.tech";

/// A Kubernetes resource managed by a [`ManagedReconciler`].
pub trait Managed:
    Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Send
    + Sync
    + 'static
{
    type Status: HasConditions + Debug + Serialize + Send + Sync;

    fn reclaim_policy(&self) -> ReclaimPolicy;

    fn write_connection_secret_to_ref(&self) -> Option<&SecretReference>;

    fn managed_status(&self) -> Option<&Self::Status>;

    fn managed_status_mut(&mut self) -> &mut Self::Status;
}

/// What an [`ExternalClient`] found out about the external resource.
#[derive(Debug, Default, PartialEq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Default, PartialEq)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Default, PartialEq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Produces an [`ExternalClient`] for a managed resource, usually by resolving
/// the provider credentials the resource refers to.
#[async_trait]
pub trait ExternalConnecter<K: Managed>: Send + Sync {
    type Error: StdError + Send + Sync + 'static;
    type External: ExternalClient<K, Error = Self::Error>;

    async fn connect(&self, resource: &K) -> Result<Self::External, Self::Error>;
}

/// Operations on the external resource represented by a managed resource.
///
/// Implementations may update the status of the passed resource. The
/// reconciler persists the status after every pass.
#[async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    async fn observe(&self, resource: &mut K) -> Result<ExternalObservation, Self::Error>;

    async fn create(&self, resource: &mut K) -> Result<ExternalCreation, Self::Error>;

    async fn update(&self, resource: &mut K) -> Result<ExternalUpdate, Self::Error>;

    /// Must succeed if the external resource is already gone.
    async fn delete(&self, resource: &mut K) -> Result<(), Self::Error>;
}

#[derive(Debug, Snafu)]
pub enum Error<E>
where
    E: StdError + 'static,
{
    #[snafu(display("cannot connect to provider"))]
    Connect { source: E },

    #[snafu(display("cannot observe external resource"))]
    Observe { source: E },

    #[snafu(display("cannot create external resource"))]
    Create { source: E },

    #[snafu(display("cannot update external resource"))]
    Update { source: E },

    #[snafu(display("cannot delete external resource"))]
    Delete { source: E },

    #[snafu(display("cannot add finalizer"))]
    AddFinalizer { source: client::Error },

    #[snafu(display("cannot remove finalizer"))]
    RemoveFinalizer { source: client::Error },

    #[snafu(display("cannot publish connection details"))]
    PublishConnectionDetails { source: connection::Error },

    #[snafu(display("cannot update status"))]
    UpdateStatus { source: client::Error },
}

impl<E> Error<E>
where
    E: StdError + 'static,
{
    /// The error reported by the provider connection or the external client.
    pub fn external_source(&self) -> Option<&E> {
        match self {
            Self::Connect { source }
            | Self::Observe { source }
            | Self::Create { source }
            | Self::Update { source }
            | Self::Delete { source } => Some(source),
            _ => None,
        }
    }
}

impl<E> ReconcilerError for Error<E>
where
    E: StdError + 'static,
{
    fn category(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "Connect",
            Self::Observe { .. } => "Observe",
            Self::Create { .. } => "Create",
            Self::Update { .. } => "Update",
            Self::Delete { .. } => "Delete",
            Self::AddFinalizer { .. } => "AddFinalizer",
            Self::RemoveFinalizer { .. } => "RemoveFinalizer",
            Self::PublishConnectionDetails { .. } => "PublishConnectionDetails",
            Self::UpdateStatus { .. } => "UpdateStatus",
        }
    }
}

/// Result of driving the external resource through one pass.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The external resource exists and matches the desired state.
    Synced {
        connection_details: ConnectionDetails,
    },

    /// The managed resource is being deleted and the external resource was
    /// deleted or released according to the reclaim policy.
    Released,
}

/// Whether the deletion of `resource` leaves the external resource alone, so
/// that it can be released without connecting to the provider.
pub fn is_retained_on_deletion<K: Managed>(resource: &K) -> bool {
    has_deletion_stamp(resource) && resource.reclaim_policy() == ReclaimPolicy::Retain
}

/// Records in the status that the managed resource is going away.
pub fn mark_released<K: Managed>(resource: &mut K) {
    resource
        .managed_status_mut()
        .set_condition(Condition::deleting());
}

/// Observes the external resource and creates, updates or deletes it.
///
/// Calls are strictly ordered: observe always comes first and at most one of
/// create, update or delete follows.
///
/// With the `Delete` reclaim policy delete is called even if the observation
/// found nothing, since a previous pass may have removed only part of the
/// external resource.
pub async fn reconcile_external<K, X>(
    external: &X,
    resource: &mut K,
) -> Result<Outcome, Error<X::Error>>
where
    K: Managed,
    X: ExternalClient<K>,
{
    let observation = external.observe(resource).await.context(ObserveSnafu)?;

    if has_deletion_stamp(resource) {
        if resource.reclaim_policy() == ReclaimPolicy::Delete {
            external.delete(resource).await.context(DeleteSnafu)?;
        }
        return Ok(Outcome::Released);
    }

    if !observation.resource_exists {
        let creation = external.create(resource).await.context(CreateSnafu)?;
        return Ok(Outcome::Synced {
            connection_details: creation.connection_details,
        });
    }

    let mut connection_details = observation.connection_details;
    if !observation.resource_up_to_date {
        let update = external.update(resource).await.context(UpdateSnafu)?;
        connection_details.extend(update.connection_details);
    }
    Ok(Outcome::Synced { connection_details })
}

/// Drives managed resources of kind `K` using the external clients produced by `C`.
pub struct ManagedReconciler<C> {
    client: Client,
    connecter: C,
    requeue_after: Duration,
    span: Span,
}

impl<C> ManagedReconciler<C> {
    pub fn new(client: Client, connecter: C, requeue_after: Duration, span: Span) -> Self {
        Self {
            client,
            connecter,
            requeue_after,
            span,
        }
    }

    pub async fn reconcile<K>(
        &self,
        resource: Arc<K>,
    ) -> Result<Action, Error<<C as ExternalConnecter<K>>::Error>>
    where
        K: Managed,
        C: ExternalConnecter<K>,
    {
        let mut resource = Arc::unwrap_or_clone(resource);
        let deleting = has_deletion_stamp(&resource);

        if deleting && !has_finalizer(&resource, FINALIZER) {
            return Ok(Action::await_change());
        }
        if !deleting && !has_finalizer(&resource, FINALIZER) {
            resource = add_finalizer(&self.client, &resource, FINALIZER)
                .await
                .context(AddFinalizerSnafu)?;
        }

        if is_retained_on_deletion(&resource) {
            return self.release(resource).await;
        }

        let result = match self.connecter.connect(&resource).await {
            Ok(external) => reconcile_external(&external, &mut resource).await,
            Err(source) => Err(Error::Connect { source }),
        };

        match result {
            Ok(Outcome::Released) => self.release(resource).await,
            Ok(Outcome::Synced { connection_details }) => {
                if let Some(secret_ref) = resource.write_connection_secret_to_ref()
                    && !connection_details.is_empty()
                {
                    let namespace = resource.namespace();
                    let owner = resource
                        .controller_owner_ref(&())
                        .zip(namespace.as_deref());
                    publish_connection_details(
                        &self.client,
                        secret_ref,
                        owner,
                        &connection_details,
                    )
                    .await
                    .context(PublishConnectionDetailsSnafu)?;
                }
                resource
                    .managed_status_mut()
                    .set_condition(Condition::reconcile_success());
                self.update_status(&resource)
                    .await
                    .context(UpdateStatusSnafu)?;
                Ok(Action::requeue(self.requeue_after))
            }
            Err(error) => {
                resource
                    .managed_status_mut()
                    .set_condition(Condition::reconcile_error(&error));
                if let Err(status_error) = self.update_status(&resource).await {
                    tracing::warn!(
                        parent: &self.span,
                        error = &status_error as &dyn StdError,
                        "failed to record reconcile error in status"
                    );
                }
                Err(error)
            }
        }
    }

    /// Persists the `Deleting` condition and lets the managed resource go.
    async fn release<K, E>(&self, mut resource: K) -> Result<Action, Error<E>>
    where
        K: Managed,
        E: StdError + 'static,
    {
        tracing::info!(
            parent: &self.span,
            resource = %resource.name_any(),
            reclaim_policy = %resource.reclaim_policy(),
            "external resource released"
        );
        mark_released(&mut resource);
        self.update_status(&resource)
            .await
            .context(UpdateStatusSnafu)?;
        remove_finalizer(&self.client, &resource, FINALIZER)
            .await
            .context(RemoveFinalizerSnafu)?;
        Ok(Action::await_change())
    }

    async fn update_status<K: Managed>(&self, resource: &K) -> client::Result<()> {
        if let Some(status) = resource.managed_status() {
            self.client.merge_patch_status(resource, status).await?;
        }
        Ok(())
    }
}
