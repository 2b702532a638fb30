//! Reporting of claim and S3Bucket reconciliation results.

use std::error::Error;

use kube::{
    Resource,
    core::DynamicObject,
    runtime::{
        controller::{self, Action},
        reflector::ObjectRef,
    },
};

use crate::{client::Client, logging::k8s_events::publish_controller_error_as_k8s_event};

/// Error of a reconciler whose failures are shown to users as Kubernetes events.
pub trait ReconcilerError: Error {
    /// `PascalCase` name of the failed step, used as the event reason.
    fn category(&self) -> &'static str;

    /// The related object the reconciler failed on, for example the
    /// [`S3BucketClass`] a claim references.
    ///
    /// [`S3BucketClass`]: `crate::crd::S3BucketClass`
    fn secondary_object(&self) -> Option<ObjectRef<DynamicObject>> {
        None
    }
}

/// Logs the result of one reconciliation.
///
/// Reconciler failures are additionally published as `Warning` events on the
/// reconciled object. Failures of the controller machinery itself are only
/// logged.
pub fn report_controller_reconciled<K, ReconcileErr, QueueErr>(
    client: &Client,
    controller_name: &str,
    result: &Result<(ObjectRef<K>, Action), controller::Error<ReconcileErr, QueueErr>>,
) where
    K: Resource,
    ReconcileErr: ReconcilerError,
    QueueErr: Error,
{
    match result {
        Ok((object, action)) => tracing::info!(
            controller.name = controller_name,
            %object,
            ?action,
            "Reconciled object"
        ),
        Err(error @ controller::Error::ReconcilerFailed(reconcile_error, object)) => {
            tracing::error!(
                controller.name = controller_name,
                %object,
                category = reconcile_error.category(),
                error = error as &dyn Error,
                "Failed to reconcile object",
            );
            publish_controller_error_as_k8s_event(client, controller_name, error);
        }
        Err(error) => tracing::warn!(
            controller.name = controller_name,
            error = error as &dyn Error,
            "Controller failed to schedule reconciliation",
        ),
    }
}
