//! Client for cloudscale object storage.
//!
//! A bucket is always owned by a dedicated object user named after the bucket.
//! The object user is managed through the cloudscale REST API, the bucket
//! itself through the S3 API using the keys of its object user.
//!
//! All operations are safe to repeat. Use [`Error::is_not_found`] to detect
//! a missing object user or bucket.

use std::collections::BTreeMap;

use async_trait::async_trait;
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::crd::CannedAcl;

pub mod buckets;
pub mod objects_users;

#[cfg(test)]
pub(crate) mod fake;

pub use buckets::{Buckets, S3Buckets};
pub use objects_users::{ObjectsUser, ObjectsUserRequest, ObjectsUsers, ObjectsUsersApi};

/// Endpoint of the S3 API without the region.
pub const S3_ENDPOINT_FORMAT: &str = "https://objects.{region}.cloudscale.ch";

pub const DEFAULT_API_URL: &str = "https://api.cloudscale.ch/v1/";

const ACCESS_KEY: &str = "access_key";
const SECRET_KEY: &str = "secret_key";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("object user {display_name:?} was not found"))]
    ObjectUserNotFound { display_name: String },

    #[snafu(display("bucket {bucket:?} was not found"))]
    BucketNotFound { bucket: String },

    #[snafu(display("cloudscale API responded with status {status}: {message}"))]
    ApiResponse { status: u16, message: String },

    #[snafu(display("failed to build cloudscale API URL for {path:?}"))]
    BuildUrl {
        source: url::ParseError,
        path: String,
    },

    #[snafu(display("failed to send request to the cloudscale API"))]
    SendRequest { source: reqwest::Error },

    #[snafu(display("failed to decode cloudscale API response"))]
    DecodeResponse { source: reqwest::Error },

    #[snafu(display(
        "object user {user_id:?} has {count} key pairs with access and secret key, expected exactly one"
    ))]
    UnexpectedKeys { user_id: String, count: usize },

    #[snafu(display("invalid S3 credentials for object user"))]
    S3Credentials {
        source: s3::creds::error::CredentialsError,
    },

    #[snafu(display("failed to {action} bucket {bucket:?}"))]
    S3Request {
        source: s3::error::S3Error,
        action: &'static str,
        bucket: String,
    },
}

impl Error {
    /// Whether the error signals that the object user or the bucket does not
    /// exist, no matter which of the two APIs reported it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ObjectUserNotFound { .. } | Self::BucketNotFound { .. } => true,
            Self::ApiResponse { status, .. } => *status == 404,
            Self::S3Request { source, .. } => buckets::is_not_found(source),
            _ => false,
        }
    }

    /// Whether the object user is in a state this operator never leaves it
    /// in. Such errors need manual intervention and are not retried.
    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, Self::UnexpectedKeys { .. })
    }
}

/// Returns the S3 endpoint of a region.
pub fn endpoint(region: &str) -> String {
    S3_ENDPOINT_FORMAT.replace("{region}", region)
}

/// The S3 key pair of an object user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Keys {
    pub access_key: String,
    pub secret_key: String,
}

/// Returns the single key pair of an object user.
///
/// Object users created by this operator have exactly one key pair. Anything
/// else means someone tampered with the user and is reported as an error
/// which is not a "not found" error.
pub fn get_keys(user: &ObjectsUser) -> Result<Keys> {
    let key_pairs: Vec<Keys> = user
        .keys
        .iter()
        .filter_map(|key| {
            Some(Keys {
                access_key: key.get(ACCESS_KEY)?.clone(),
                secret_key: key.get(SECRET_KEY)?.clone(),
            })
        })
        .collect();

    match <[Keys; 1]>::try_from(key_pairs) {
        Ok([keys]) if user.keys.len() == 1 => Ok(keys),
        _ => UnexpectedKeysSnafu {
            user_id: user.id.clone(),
            count: user.keys.len(),
        }
        .fail(),
    }
}

/// Manages buckets together with the object users owning them.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Creates the object user and the bucket, or updates the tags of an
    /// existing object user and makes sure the bucket exists.
    ///
    /// The object user is looked up by `user_id` if known and by the bucket
    /// name otherwise.
    async fn create_or_update(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        region: &str,
        canned_acl: Option<CannedAcl>,
        tags: &BTreeMap<String, String>,
    ) -> Result<ObjectsUser>;

    /// Returns the object user owning the bucket if both exist.
    async fn get_info(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        region: &str,
    ) -> Result<ObjectsUser>;

    /// Deletes the bucket and then its object user.
    async fn delete(&self, user_id: Option<&str>, bucket_name: &str, region: &str) -> Result<()>;
}

/// [`ObjectStorage`] backed by the cloudscale APIs.
#[derive(Clone)]
pub struct Client<U = ObjectsUsersApi, B = S3Buckets> {
    users: U,
    buckets: B,
}

impl Client {
    pub fn new(http: reqwest::Client, api_url: Url, token: String) -> Self {
        Self::with_apis(ObjectsUsersApi::new(http, api_url, token), S3Buckets)
    }
}

impl<U: ObjectsUsers, B: Buckets> Client<U, B> {
    pub fn with_apis(users: U, buckets: B) -> Self {
        Self { users, buckets }
    }

    async fn existing_user(&self, user_id: Option<&str>, bucket_name: &str) -> Result<ObjectsUser> {
        let user_id = match user_id {
            Some(user_id) => user_id.to_owned(),
            None => self.lookup_user_by_name(bucket_name).await?.id,
        };
        self.users.get(&user_id).await
    }

    /// Scans all object users for a matching display name.
    async fn lookup_user_by_name(&self, display_name: &str) -> Result<ObjectsUser> {
        self.users
            .list()
            .await?
            .into_iter()
            .find(|user| user.display_name == display_name)
            .ok_or_else(|| Error::ObjectUserNotFound {
                display_name: display_name.to_owned(),
            })
    }
}

#[async_trait]
impl<U: ObjectsUsers, B: Buckets> ObjectStorage for Client<U, B> {
    async fn create_or_update(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        region: &str,
        canned_acl: Option<CannedAcl>,
        tags: &BTreeMap<String, String>,
    ) -> Result<ObjectsUser> {
        let request = ObjectsUserRequest {
            display_name: bucket_name,
            tags,
        };

        let user = match self.existing_user(user_id, bucket_name).await {
            Ok(existing) => {
                tracing::debug!(user.id = %existing.id, "updating existing object user");
                self.users.update(&existing.id, &request).await?;
                self.users.get(&existing.id).await?
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!(bucket = bucket_name, "creating object user");
                self.users.create(&request).await?
            }
            Err(error) => return Err(error),
        };

        let keys = get_keys(&user)?;
        self.buckets
            .create(bucket_name, region, &keys, canned_acl.unwrap_or_default())
            .await?;
        Ok(user)
    }

    async fn get_info(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        region: &str,
    ) -> Result<ObjectsUser> {
        let user = self.existing_user(user_id, bucket_name).await?;
        let keys = get_keys(&user)?;
        self.buckets.head(bucket_name, region, &keys).await?;
        Ok(user)
    }

    async fn delete(&self, user_id: Option<&str>, bucket_name: &str, region: &str) -> Result<()> {
        let user = self.existing_user(user_id, bucket_name).await?;
        let keys = get_keys(&user)?;
        match self.buckets.delete(bucket_name, region, &keys).await {
            // The object user still has to go even if the bucket is gone already.
            Err(error) if error.is_not_found() => {
                tracing::debug!(bucket = bucket_name, "bucket is already gone");
            }
            result => result?,
        }
        self.users.delete(&user.id).await
    }
}

pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path).context(BuildUrlSnafu { path })
}
