//! Buckets on the S3 API of cloudscale object storage.

use async_trait::async_trait;
use s3::{
    Bucket,
    bucket_ops::{BucketConfiguration, CannedBucketAcl},
    creds::Credentials,
    error::S3Error,
    region::Region,
};
use snafu::ResultExt;

use crate::{
    cloudscale::{Error, Keys, Result, S3CredentialsSnafu, S3RequestSnafu, endpoint},
    crd::CannedAcl,
};

const BUCKET_ALREADY_OWNED_BY_YOU: &str = "BucketAlreadyOwnedByYou";

/// Bucket operations, authenticated with the keys of the owning object user.
#[async_trait]
pub trait Buckets: Send + Sync {
    /// Creates the bucket. A bucket which already exists and belongs to the
    /// same object user counts as created.
    async fn create(&self, name: &str, region: &str, keys: &Keys, acl: CannedAcl) -> Result<()>;

    /// Succeeds if the bucket exists and is accessible with `keys`.
    async fn head(&self, name: &str, region: &str, keys: &Keys) -> Result<()>;

    async fn delete(&self, name: &str, region: &str, keys: &Keys) -> Result<()>;
}

/// [`Buckets`] backed by the S3 API, using path style requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct S3Buckets;

#[async_trait]
impl Buckets for S3Buckets {
    async fn create(&self, name: &str, region_name: &str, keys: &Keys, acl: CannedAcl) -> Result<()> {
        let config = BucketConfiguration::new(
            Some(canned_bucket_acl(acl)),
            false,
            None,
            None,
            None,
            None,
            None,
            None,
        );
        let result =
            Bucket::create_with_path_style(name, region(region_name), credentials(keys)?, config)
                .await
                .map(drop);
        created_or_owned(result, name)
    }

    async fn head(&self, name: &str, region_name: &str, keys: &Keys) -> Result<()> {
        // HEAD on the bucket root is a HeadBucket request in path style.
        bucket(name, region_name, keys, "look up")?
            .head_object("/")
            .await
            .context(S3RequestSnafu {
                action: "look up",
                bucket: name,
            })?;
        Ok(())
    }

    async fn delete(&self, name: &str, region_name: &str, keys: &Keys) -> Result<()> {
        bucket(name, region_name, keys, "delete")?
            .delete()
            .await
            .context(S3RequestSnafu {
                action: "delete",
                bucket: name,
            })?;
        Ok(())
    }
}

pub(super) fn is_not_found(error: &S3Error) -> bool {
    matches!(error, S3Error::HttpFailWithBody(404, _))
}

/// Treats a conflict because the caller already owns the bucket as success.
fn created_or_owned(result: Result<(), S3Error>, name: &str) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(S3Error::HttpFailWithBody(409, body)) if body.contains(BUCKET_ALREADY_OWNED_BY_YOU) => {
            tracing::debug!(bucket = name, "bucket already exists");
            Ok(())
        }
        Err(source) => Err(Error::S3Request {
            source,
            action: "create",
            bucket: name.to_owned(),
        }),
    }
}

fn region(region: &str) -> Region {
    Region::Custom {
        region: region.to_owned(),
        endpoint: endpoint(region),
    }
}

fn credentials(keys: &Keys) -> Result<Credentials> {
    Credentials::new(
        Some(&keys.access_key),
        Some(&keys.secret_key),
        None,
        None,
        None,
    )
    .context(S3CredentialsSnafu)
}

fn canned_bucket_acl(acl: CannedAcl) -> CannedBucketAcl {
    match acl {
        CannedAcl::Private => CannedBucketAcl::Private,
        CannedAcl::PublicRead => CannedBucketAcl::PublicRead,
        CannedAcl::PublicReadWrite => CannedBucketAcl::PublicReadWrite,
        CannedAcl::AuthenticatedRead => CannedBucketAcl::AuthenticatedRead,
    }
}

fn bucket(
    name: &str,
    region_name: &str,
    keys: &Keys,
    action: &'static str,
) -> Result<Box<Bucket>> {
    let bucket = Bucket::new(name, region(region_name), credentials(keys)?)
        .context(S3RequestSnafu { action, bucket: name })?;
    Ok(bucket.with_path_style())
}
