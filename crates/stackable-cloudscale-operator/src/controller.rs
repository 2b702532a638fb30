//! Wiring of the claim and S3Bucket controllers.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::{Controller, controller::Action, watcher};

use crate::{
    binding::{self, ClaimBinder},
    client::Client,
    crd::{Bucket, S3Bucket},
    logging::controller::report_controller_reconciled,
    managed::{self, ManagedReconciler, bucket::BucketConnecter},
    namespace::WatchNamespace,
};

pub const OPERATOR_NAME: &str = "cloudscale.stackable.tech";
pub const CLAIM_CONTROLLER_NAME: &str = "bucket";
pub const BUCKET_CONTROLLER_NAME: &str = "s3bucket";

/// Delay before a failed reconciliation is retried.
const ERROR_REQUEUE: Duration = Duration::from_secs(10);

type BucketError = managed::Error<managed::bucket::Error>;

pub struct Ctx {
    binder: ClaimBinder,
    buckets: ManagedReconciler<BucketConnecter>,
}

impl Ctx {
    pub fn new(binder: ClaimBinder, buckets: ManagedReconciler<BucketConnecter>) -> Self {
        Self { binder, buckets }
    }
}

/// Runs both controllers until the process receives a shutdown signal.
pub async fn run(client: Client, watch_namespace: &WatchNamespace, ctx: Ctx) {
    let ctx = Arc::new(ctx);
    let claim_controller_name = format!("{CLAIM_CONTROLLER_NAME}.{OPERATOR_NAME}");
    let bucket_controller_name = format!("{BUCKET_CONTROLLER_NAME}.{OPERATOR_NAME}");

    let claims = Controller::new(
        watch_namespace.get_api::<Bucket>(&client),
        watcher::Config::default(),
    )
    .owns(
        watch_namespace.get_api::<S3Bucket>(&client),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile_claim, claim_error_policy, Arc::clone(&ctx))
    .for_each(|result| {
        report_controller_reconciled(&client, &claim_controller_name, &result);
        future::ready(())
    });

    let buckets = Controller::new(
        watch_namespace.get_api::<S3Bucket>(&client),
        watcher::Config::default(),
    )
    .owns(
        watch_namespace.get_api::<Secret>(&client),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile_bucket, bucket_error_policy, ctx)
    .for_each(|result| {
        report_controller_reconciled(&client, &bucket_controller_name, &result);
        future::ready(())
    });

    future::join(claims, buckets).await;
}

async fn reconcile_claim(claim: Arc<Bucket>, ctx: Arc<Ctx>) -> Result<Action, binding::Error> {
    ctx.binder.reconcile(claim).await
}

fn claim_error_policy(_claim: Arc<Bucket>, error: &binding::Error, _ctx: Arc<Ctx>) -> Action {
    retry_claim(error)
}

/// Binding configuration errors are only retried once something changes.
fn retry_claim(error: &binding::Error) -> Action {
    match error {
        binding::Error::InvalidClassSelector { .. }
        | binding::Error::SelectDefaultClass { .. }
        | binding::Error::Configure { .. } => Action::await_change(),
        _ => Action::requeue(ERROR_REQUEUE),
    }
}

async fn reconcile_bucket(bucket: Arc<S3Bucket>, ctx: Arc<Ctx>) -> Result<Action, BucketError> {
    ctx.buckets.reconcile(bucket).await
}

fn bucket_error_policy(_bucket: Arc<S3Bucket>, error: &BucketError, _ctx: Arc<Ctx>) -> Action {
    retry_bucket(error)
}

/// An external resource in an unexpected state waits for manual intervention.
fn retry_bucket(error: &BucketError) -> Action {
    if error
        .external_source()
        .is_some_and(managed::bucket::Error::is_unexpected_state)
    {
        Action::await_change()
    } else {
        Action::requeue(ERROR_REQUEUE)
    }
}
