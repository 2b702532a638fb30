use kube::{Resource, ResourceExt};
use snafu::{OptionExt, Snafu};

use crate::crd::{
    Bucket, CannedAcl, ObjectReference, S3Bucket, S3BucketClass, S3BucketSpec, SecretReference,
};

/// Prefix of S3Buckets provisioned for claims, followed by the claim UID.
pub const BUCKET_NAME_PREFIX: &str = "bucket-";

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("claim {name:?} has no UID"))]
    MissingClaimUid { name: String },

    #[snafu(display("claim {name:?} has no namespace"))]
    MissingClaimNamespace { name: String },
}

/// Translates the predefined ACL of a claim into a canned ACL.
///
/// Unknown values yield [`None`], which leaves the ACL of the class untouched.
pub fn translate_acl(predefined_acl: Option<&str>) -> Option<CannedAcl> {
    predefined_acl?.parse().ok()
}

/// Name of the S3Bucket a claim is bound to.
pub fn bucket_name(claim: &Bucket) -> Result<String, Error> {
    if let Some(resource_ref) = &claim.spec.resource_ref {
        return Ok(resource_ref.name.clone());
    }
    let uid = claim.uid().context(MissingClaimUidSnafu {
        name: claim.name_any(),
    })?;
    Ok(format!("{BUCKET_NAME_PREFIX}{uid}"))
}

/// Builds the S3Bucket for `claim` from the template of `class`.
///
/// The S3Bucket lives in the namespace of the claim and is owned by it. Its
/// connection secret is named after the claim UID and written to the
/// namespace configured in the class, or the claim namespace otherwise.
pub fn configure(claim: &Bucket, class: &S3BucketClass) -> Result<S3Bucket, Error> {
    let claim_name = claim.name_any();
    let uid = claim.uid().context(MissingClaimUidSnafu {
        name: &claim_name,
    })?;
    let namespace = claim.namespace().context(MissingClaimNamespaceSnafu {
        name: &claim_name,
    })?;

    let mut for_provider = class.spec.for_provider.clone();
    if let Some(name) = &claim.spec.name {
        for_provider.name_format = name.clone();
    }
    if let Some(acl) = translate_acl(claim.spec.predefined_acl.as_deref()) {
        for_provider.canned_acl = Some(acl);
    }

    let secret_namespace = class
        .spec
        .write_connection_secrets_to_namespace
        .clone()
        .unwrap_or_else(|| namespace.clone());

    let spec = S3BucketSpec {
        for_provider,
        provider_ref: class.spec.provider_ref.clone(),
        reclaim_policy: class.spec.reclaim_policy.unwrap_or_default(),
        write_connection_secret_to_ref: Some(SecretReference {
            name: uid,
            namespace: secret_namespace,
        }),
        claim_ref: Some(ObjectReference {
            name: claim_name,
            namespace: Some(namespace.clone()),
        }),
        class_ref: Some(ObjectReference {
            name: class.name_any(),
            namespace: None,
        }),
    };

    let mut bucket = S3Bucket::new(&bucket_name(claim)?, spec);
    bucket.metadata.namespace = Some(namespace);
    bucket.metadata.owner_references = claim.controller_owner_ref(&()).map(|owner| vec![owner]);
    Ok(bucket)
}
