//! Binding of [`Bucket`] claims to [`S3Bucket`]s.
//!
//! Every claim is in exactly one [`BindingStage`] at a time:
//!
//! * A claim selecting classes by label is scheduled to a random matching class.
//! * A claim without any class information is defaulted to the default class.
//! * A claim referencing a class gets an [`S3Bucket`] configured from it.
//! * A claim referencing only an [`S3Bucket`] is bound to it as is.
//!
//! Scheduling and defaulting only set the class reference of the claim. The
//! resulting change triggers another pass, which then configures the bucket.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::{
    ResourceExt,
    core::DynamicObject,
    runtime::{controller::Action, reflector::ObjectRef},
};
use rand::rngs::StdRng;
use serde_json::{Value, json};
use snafu::{OptionExt, ResultExt, Snafu};
use strum::{EnumDiscriminants, IntoStaticStr};
use tracing::Span;

use crate::{
    client::{self, Client},
    crd::{
        BindingPhase, Bucket, BucketStatus, ObjectReference, S3Bucket, S3BucketClass,
        SecretReference,
    },
    label_selector::{LabelSelectorExt, SelectorError},
    logging::controller::ReconcilerError,
    status::{Condition, ConditionType, HasConditions},
};

pub mod configuration;
pub mod defaulting;
pub mod scheduling;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("failed to list S3BucketClasses"))]
    ListClasses { source: client::Error },

    #[snafu(display("claim has an invalid class selector"))]
    InvalidClassSelector { source: SelectorError },

    #[snafu(display("failed to select default S3BucketClass"))]
    SelectDefaultClass { source: defaulting::Error },

    #[snafu(display("failed to get S3BucketClass {class:?}"))]
    GetClass { source: client::Error, class: String },

    #[snafu(display("failed to configure S3Bucket"))]
    Configure { source: configuration::Error },

    #[snafu(display("failed to apply S3Bucket"))]
    ApplyBucket { source: client::Error },

    #[snafu(display("failed to get S3Bucket {bucket:?}"))]
    GetBucket {
        source: client::Error,
        bucket: String,
        namespace: String,
    },

    #[snafu(display("claim has no namespace"))]
    ClaimHasNoNamespace,

    #[snafu(display("S3Bucket {bucket:?} is already claimed by {claim:?}"))]
    BucketClaimedByOther {
        bucket: String,
        namespace: String,
        claim: String,
    },

    #[snafu(display("failed to claim S3Bucket {bucket:?}"))]
    ClaimBucket { source: client::Error, bucket: String },

    #[snafu(display("failed to update claim"))]
    UpdateClaim { source: client::Error },

    #[snafu(display("failed to mark S3Bucket as bound"))]
    UpdateBucketStatus { source: client::Error },

    #[snafu(display("failed to update claim status"))]
    UpdateClaimStatus { source: client::Error },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }

    fn secondary_object(&self) -> Option<ObjectRef<DynamicObject>> {
        match self {
            Self::GetClass { class, .. } => Some(ObjectRef::<S3BucketClass>::new(class).erase()),
            Self::GetBucket {
                bucket, namespace, ..
            }
            | Self::BucketClaimedByOther {
                bucket, namespace, ..
            } => Some(ObjectRef::<S3Bucket>::new(bucket).within(namespace).erase()),
            _ => None,
        }
    }
}

/// The binding step a claim is currently in.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingStage {
    Scheduling { selector: LabelSelector },
    Defaulting,
    Configuration { class_ref: ObjectReference },
    StaticBinding { resource_ref: ObjectReference },
}

impl BindingStage {
    pub fn of(claim: &Bucket) -> Self {
        let spec = &claim.spec;
        match (&spec.class_ref, &spec.resource_ref, &spec.class_selector) {
            (Some(class_ref), _, _) => Self::Configuration {
                class_ref: class_ref.clone(),
            },
            (None, Some(resource_ref), _) => Self::StaticBinding {
                resource_ref: resource_ref.clone(),
            },
            (None, None, Some(selector)) => Self::Scheduling {
                selector: selector.clone(),
            },
            (None, None, None) => Self::Defaulting,
        }
    }
}

/// Whether the `claimRef` of `bucket` points to `claim`.
///
/// A reference without namespace points into the namespace of the bucket.
pub fn is_claimed_by(bucket: &S3Bucket, claim: &Bucket) -> bool {
    bucket.spec.claim_ref.as_ref().is_some_and(|claim_ref| {
        claim_ref.name == claim.name_any()
            && claim_ref.namespace.as_ref().or(bucket.metadata.namespace.as_ref())
                == claim.metadata.namespace.as_ref()
    })
}

/// Merge patch which claims a statically referenced `bucket` for `claim`.
///
/// Returns [`None`] if the bucket already belongs to the claim. The patch
/// carries the resource version of `bucket`, so only one of several claims
/// racing for the same bucket wins.
pub fn static_claim_patch(claim: &Bucket, bucket: &S3Bucket) -> Result<Option<Value>> {
    if is_claimed_by(bucket, claim) {
        return Ok(None);
    }
    if let Some(claim_ref) = &bucket.spec.claim_ref {
        return BucketClaimedByOtherSnafu {
            bucket: bucket.name_any(),
            namespace: bucket.namespace().unwrap_or_default(),
            claim: claim_ref.name.clone(),
        }
        .fail();
    }

    let claim_name = claim.name_any();
    let uid = claim.uid().ok_or_else(|| Error::Configure {
        source: configuration::Error::MissingClaimUid {
            name: claim_name.clone(),
        },
    })?;
    let namespace = claim.namespace().context(ClaimHasNoNamespaceSnafu)?;

    let claim_ref = ObjectReference {
        name: claim_name,
        namespace: Some(namespace.clone()),
    };
    let secret_ref = SecretReference {
        name: uid,
        namespace,
    };
    Ok(Some(json!({
        "metadata": { "resourceVersion": bucket.resource_version() },
        "spec": {
            "claimRef": claim_ref,
            "writeConnectionSecretToRef": secret_ref,
        },
    })))
}

/// Status of a claim bound to `bucket`.
///
/// The claim counts as bound once the bucket belongs to it and is bindable
/// or already bound. It mirrors the readiness of the bucket.
pub fn bound_claim_status(
    claim: &Bucket,
    current: Option<&BucketStatus>,
    bucket: &S3Bucket,
) -> BucketStatus {
    let mut status = current.cloned().unwrap_or_default();
    if is_claimed_by(bucket, claim)
        && matches!(
            bucket.binding_phase(),
            BindingPhase::Unbound | BindingPhase::Bound
        )
    {
        status.binding_phase = BindingPhase::Bound;
    }
    if let Some(ready) = bucket
        .status
        .as_ref()
        .and_then(|bucket_status| bucket_status.condition(ConditionType::Ready))
    {
        status.set_condition(ready.clone());
    }
    status
}

/// Reconciles [`Bucket`] claims.
pub struct ClaimBinder {
    client: Client,
    rng: Mutex<StdRng>,
    requeue_after: Duration,
    span: Span,
}

impl ClaimBinder {
    pub fn new(client: Client, rng: StdRng, requeue_after: Duration, span: Span) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
            requeue_after,
            span,
        }
    }

    /// Advances the claim by one binding stage.
    ///
    /// Failures are recorded as `Synced` condition on the claim.
    pub async fn reconcile(&self, claim: Arc<Bucket>) -> Result<Action> {
        let result = self.advance(&claim).await;
        if let Err(error) = &result {
            let mut status = claim.status.clone().unwrap_or_default();
            status.set_condition(Condition::reconcile_error(error));
            if let Err(status_error) = self
                .client
                .merge_patch_status(claim.as_ref(), &status)
                .await
            {
                tracing::warn!(
                    parent: &self.span,
                    claim = %claim.name_any(),
                    error = &status_error as &dyn std::error::Error,
                    "failed to record binding error in claim status"
                );
            }
        }
        result
    }

    async fn advance(&self, claim: &Bucket) -> Result<Action> {
        if claim.metadata.deletion_timestamp.is_some() {
            // The S3Bucket is owned by the claim and removed by the garbage collector.
            return Ok(Action::await_change());
        }

        match BindingStage::of(claim) {
            BindingStage::Scheduling { selector } => self.schedule(claim, &selector).await,
            BindingStage::Defaulting => self.default_class(claim).await,
            BindingStage::Configuration { class_ref } => {
                let bucket = self.configure(claim, &class_ref.name).await?;
                self.bind(claim, &bucket).await
            }
            BindingStage::StaticBinding { resource_ref } => {
                let namespace = resource_ref
                    .namespace
                    .or_else(|| claim.namespace())
                    .context(ClaimHasNoNamespaceSnafu)?;
                let bucket = self
                    .client
                    .get::<S3Bucket>(&resource_ref.name, &namespace)
                    .await
                    .context(GetBucketSnafu {
                        bucket: &resource_ref.name,
                        namespace: &namespace,
                    })?;
                let bucket = self.claim_static_bucket(claim, bucket).await?;
                self.bind(claim, &bucket).await
            }
        }
    }

    async fn schedule(&self, claim: &Bucket, selector: &LabelSelector) -> Result<Action> {
        let label_query = selector
            .to_query_string()
            .context(InvalidClassSelectorSnafu)?;
        let candidates = self
            .client
            .list_cluster_with_label_selector::<S3BucketClass>(&label_query)
            .await
            .context(ListClassesSnafu)?;

        let scheduled = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            scheduling::schedule(&candidates, &mut *rng).map(|class| class.name_any())
        };

        match scheduled {
            Some(class) => self.set_class_ref(claim, &class).await,
            None => {
                tracing::info!(
                    parent: &self.span,
                    claim = %claim.name_any(),
                    "no S3BucketClass matches the class selector"
                );
                Ok(Action::requeue(self.requeue_after))
            }
        }
    }

    async fn default_class(&self, claim: &Bucket) -> Result<Action> {
        let classes = self
            .client
            .list_cluster::<S3BucketClass>()
            .await
            .context(ListClassesSnafu)?;
        let class = defaulting::select_default_class(&classes)
            .context(SelectDefaultClassSnafu)?
            .name_any();
        self.set_class_ref(claim, &class).await
    }

    async fn set_class_ref(&self, claim: &Bucket, class: &str) -> Result<Action> {
        tracing::info!(
            parent: &self.span,
            claim = %claim.name_any(),
            class,
            "binding claim to S3BucketClass"
        );
        self.client
            .merge_patch(claim, &json!({ "spec": { "classRef": { "name": class } } }))
            .await
            .context(UpdateClaimSnafu)?;
        Ok(Action::await_change())
    }

    async fn configure(&self, claim: &Bucket, class: &str) -> Result<S3Bucket> {
        let class = self
            .client
            .get_cluster::<S3BucketClass>(class)
            .await
            .context(GetClassSnafu { class })?;
        let desired = configuration::configure(claim, &class).context(ConfigureSnafu)?;
        let bucket = self
            .client
            .apply_patch(&desired)
            .await
            .context(ApplyBucketSnafu)?;

        if claim.spec.resource_ref.is_none() {
            let resource_ref = ObjectReference {
                name: bucket.name_any(),
                namespace: bucket.namespace(),
            };
            self.client
                .merge_patch(claim, &json!({ "spec": { "resourceRef": resource_ref } }))
                .await
                .context(UpdateClaimSnafu)?;
        }
        Ok(bucket)
    }

    async fn claim_static_bucket(&self, claim: &Bucket, bucket: S3Bucket) -> Result<S3Bucket> {
        let Some(patch) = static_claim_patch(claim, &bucket)? else {
            return Ok(bucket);
        };
        tracing::info!(
            parent: &self.span,
            claim = %claim.name_any(),
            bucket = %bucket.name_any(),
            "claiming statically referenced S3Bucket"
        );
        self.client
            .merge_patch(&bucket, &patch)
            .await
            .context(ClaimBucketSnafu {
                bucket: bucket.name_any(),
            })
    }

    async fn bind(&self, claim: &Bucket, bucket: &S3Bucket) -> Result<Action> {
        if is_claimed_by(bucket, claim) && bucket.binding_phase() == BindingPhase::Unbound {
            self.client
                .merge_patch_status(bucket, &json!({ "bindingPhase": BindingPhase::Bound }))
                .await
                .context(UpdateBucketStatusSnafu)?;
        }

        let mut status = bound_claim_status(claim, claim.status.as_ref(), bucket);
        status.set_condition(Condition::reconcile_success());
        let bound = status.binding_phase == BindingPhase::Bound;
        if claim.status.as_ref() != Some(&status) {
            self.client
                .merge_patch_status(claim, &status)
                .await
                .context(UpdateClaimStatusSnafu)?;
        }

        if bound {
            Ok(Action::await_change())
        } else {
            Ok(Action::requeue(self.requeue_after))
        }
    }
}
