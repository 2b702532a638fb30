//! Lifecycle of [`S3Bucket`]s on cloudscale object storage.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::Span;
use url::Url;

use crate::{
    client::{self, Client},
    cloudscale::{self, ObjectStorage, endpoint, get_keys},
    connection::connection_details,
    crd::{
        Provider, ReclaimPolicy, S3Bucket, S3BucketPhase, S3BucketStatus, SecretKeySelector,
        SecretReference,
    },
    managed::{
        ExternalClient, ExternalConnecter, ExternalCreation, ExternalObservation, ExternalUpdate,
        Managed,
    },
    status::{Condition, HasConditions},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot get Provider"))]
    GetProvider { source: client::Error },

    #[snafu(display("cannot get Provider secret {secret}"))]
    GetProviderSecret {
        source: client::Error,
        secret: String,
    },

    #[snafu(display("Provider secret {secret} has no key {key:?}"))]
    MissingProviderToken { secret: String, key: String },

    #[snafu(display("Provider secret {secret} contains an invalid token"))]
    InvalidProviderToken {
        source: std::string::FromUtf8Error,
        secret: String,
    },

    #[snafu(display("bucket name cannot be derived before the S3Bucket has a UID"))]
    MissingUid,

    #[snafu(display("cannot get bucket"))]
    GetBucket { source: cloudscale::Error },

    #[snafu(display("cannot create bucket"))]
    CreateBucket { source: cloudscale::Error },

    #[snafu(display("cannot update bucket"))]
    UpdateBucket { source: cloudscale::Error },

    #[snafu(display("cannot delete bucket"))]
    DeleteBucket { source: cloudscale::Error },

    #[snafu(display("object user is in an unexpected state"))]
    UnexpectedState { source: cloudscale::Error },
}

impl Error {
    /// Whether the external resource needs manual intervention before
    /// reconciling it again makes sense.
    pub fn is_unexpected_state(&self) -> bool {
        match self {
            Self::UnexpectedState { .. } => true,
            Self::GetBucket { source }
            | Self::CreateBucket { source }
            | Self::UpdateBucket { source }
            | Self::DeleteBucket { source } => source.is_unexpected_state(),
            _ => false,
        }
    }
}

impl Managed for S3Bucket {
    type Status = S3BucketStatus;

    fn reclaim_policy(&self) -> ReclaimPolicy {
        self.spec.reclaim_policy
    }

    fn write_connection_secret_to_ref(&self) -> Option<&SecretReference> {
        self.spec.write_connection_secret_to_ref.as_ref()
    }

    fn managed_status(&self) -> Option<&S3BucketStatus> {
        self.status.as_ref()
    }

    fn managed_status_mut(&mut self) -> &mut S3BucketStatus {
        self.status_mut()
    }
}

/// Reads the cloudscale API token from the provider secret.
pub fn resolve_provider_token(secret: &Secret, selector: &SecretKeySelector) -> Result<String> {
    let secret_name = format!("{}/{}", selector.namespace, selector.name);
    let token = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&selector.key))
        .context(MissingProviderTokenSnafu {
            secret: &secret_name,
            key: &selector.key,
        })?;
    let token = String::from_utf8(token.0.clone()).context(InvalidProviderTokenSnafu {
        secret: secret_name,
    })?;
    Ok(token.trim().to_owned())
}

/// Connects [`S3Bucket`]s to cloudscale using the token of their [`Provider`].
pub struct BucketConnecter {
    client: Client,
    http: reqwest::Client,
    api_url: Url,
    span: Span,
}

impl BucketConnecter {
    pub fn new(client: Client, http: reqwest::Client, api_url: Url, span: Span) -> Self {
        Self {
            client,
            http,
            api_url,
            span,
        }
    }
}

#[async_trait]
impl ExternalConnecter<S3Bucket> for BucketConnecter {
    type Error = Error;
    type External = BucketExternal<cloudscale::Client>;

    async fn connect(&self, bucket: &S3Bucket) -> Result<Self::External> {
        let provider = self
            .client
            .get_cluster::<Provider>(&bucket.spec.provider_ref.name)
            .await
            .context(GetProviderSnafu)?;

        let selector = &provider.spec.credentials_secret_ref;
        let secret = self
            .client
            .get::<Secret>(&selector.name, &selector.namespace)
            .await
            .context(GetProviderSecretSnafu {
                secret: format!("{}/{}", selector.namespace, selector.name),
            })?;
        let token = resolve_provider_token(&secret, selector)?;

        let storage = cloudscale::Client::new(self.http.clone(), self.api_url.clone(), token);
        Ok(BucketExternal::new(Arc::new(storage), self.span.clone()))
    }
}

/// Drives one [`S3Bucket`] through its lifecycle using an [`ObjectStorage`].
pub struct BucketExternal<S> {
    storage: Arc<S>,
    span: Span,
}

impl<S: ObjectStorage> BucketExternal<S> {
    pub fn new(storage: Arc<S>, span: Span) -> Self {
        Self { storage, span }
    }
}

#[async_trait]
impl<S: ObjectStorage> ExternalClient<S3Bucket> for BucketExternal<S> {
    type Error = Error;

    async fn observe(&self, bucket: &mut S3Bucket) -> Result<ExternalObservation> {
        let bucket_name = bucket.external_name().context(MissingUidSnafu)?;
        let region = bucket.spec.for_provider.region.clone();
        tracing::info!(parent: &self.span, bucket = %bucket.name_any(), "Observe");

        let user = match self
            .storage
            .get_info(bucket.object_user_id(), &bucket_name, &region)
            .await
        {
            Ok(user) => user,
            Err(error) if error.is_not_found() => {
                return Ok(ExternalObservation::default());
            }
            Err(error) => return Err(error).context(GetBucketSnafu),
        };
        let resource_up_to_date = user.tags == bucket.spec.for_provider.tags;
        let keys = get_keys(&user).context(UnexpectedStateSnafu)?;

        let status = bucket.status_mut();
        match status.phase {
            Some(S3BucketPhase::Online) => {
                status.set_condition(Condition::available());
                status.binding_phase = status.binding_phase.bindable();
            }
            Some(S3BucketPhase::Creating) | None => status.set_condition(Condition::creating()),
            Some(S3BucketPhase::Deleting) => status.set_condition(Condition::deleting()),
        }

        status.at_provider.object_user_id = Some(user.id);
        status.at_provider.bucket_name = Some(bucket_name.clone());
        if status.phase != Some(S3BucketPhase::Deleting) {
            status.phase = Some(S3BucketPhase::Online);
        }

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date,
            connection_details: connection_details(&keys, &endpoint(&region), &bucket_name),
        })
    }

    async fn create(&self, bucket: &mut S3Bucket) -> Result<ExternalCreation> {
        let bucket_name = bucket.external_name().context(MissingUidSnafu)?;
        tracing::info!(parent: &self.span, bucket = %bucket.name_any(), "Create");

        let status = bucket.status_mut();
        status.phase = Some(S3BucketPhase::Creating);
        status.set_condition(Condition::creating());

        let params = &bucket.spec.for_provider;
        let user = self
            .storage
            .create_or_update(
                bucket.object_user_id(),
                &bucket_name,
                &params.region,
                params.canned_acl,
                &params.tags,
            )
            .await
            .context(CreateBucketSnafu)?;
        let keys = get_keys(&user).context(UnexpectedStateSnafu)?;
        let endpoint = endpoint(&params.region);

        let at_provider = &mut bucket.status_mut().at_provider;
        at_provider.object_user_id = Some(user.id);
        at_provider.bucket_name = Some(bucket_name.clone());

        Ok(ExternalCreation {
            connection_details: connection_details(&keys, &endpoint, &bucket_name),
        })
    }

    async fn update(&self, bucket: &mut S3Bucket) -> Result<ExternalUpdate> {
        let bucket_name = bucket.external_name().context(MissingUidSnafu)?;
        tracing::info!(parent: &self.span, bucket = %bucket.name_any(), "Update");

        let params = &bucket.spec.for_provider;
        let user = self
            .storage
            .create_or_update(
                bucket.object_user_id(),
                &bucket_name,
                &params.region,
                params.canned_acl,
                &params.tags,
            )
            .await
            .context(UpdateBucketSnafu)?;
        bucket.status_mut().at_provider.object_user_id = Some(user.id);
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, bucket: &mut S3Bucket) -> Result<()> {
        let bucket_name = bucket.external_name().context(MissingUidSnafu)?;
        tracing::info!(parent: &self.span, bucket = %bucket.name_any(), "Delete");

        let status = bucket.status_mut();
        status.phase = Some(S3BucketPhase::Deleting);
        status.set_condition(Condition::deleting());

        match self
            .storage
            .delete(
                bucket.object_user_id(),
                &bucket_name,
                &bucket.spec.for_provider.region,
            )
            .await
        {
            Err(error) if error.is_not_found() => {
                tracing::debug!(parent: &self.span, bucket = %bucket_name, "bucket is already gone");
                Ok(())
            }
            result => result.context(DeleteBucketSnafu),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use jiff::Timestamp;
    use k8s_openapi::{ByteString, apimachinery::pkg::apis::meta::v1::Time};
    use rstest::rstest;

    use super::*;
    use crate::{
        binding::{configuration::configure, defaulting::select_default_class},
        cloudscale::fake::FakeObjectStorage,
        connection::{BUCKET_NAME_KEY, ENDPOINT_KEY, PASSWORD_KEY, USERNAME_KEY},
        crd::{BindingPhase, Bucket, CannedAcl, S3BucketClass},
        managed::{Outcome, reconcile_external},
        status::{ConditionReason, ConditionType},
    };

    const UID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn s3_bucket(tags: &[(&str, &str)]) -> S3Bucket {
        let mut bucket: S3Bucket = serde_yaml::from_str(&format!(
            r#"
            apiVersion: cloudscale.stackable.tech/v1alpha1
            kind: S3Bucket
            metadata:
              name: my-bucket
              namespace: default
              uid: {UID}
            spec:
              forProvider:
                nameFormat: backups-%s
                region: rma
              providerRef:
                name: cloudscale
              reclaimPolicy: Delete
            "#
        ))
        .expect("invalid test input");
        bucket.spec.for_provider.tags = tags
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        bucket
    }

    fn external(storage: &Arc<FakeObjectStorage>) -> BucketExternal<FakeObjectStorage> {
        BucketExternal::new(Arc::clone(storage), Span::none())
    }

    fn ready_reason(bucket: &S3Bucket) -> Option<ConditionReason> {
        bucket
            .status
            .as_ref()?
            .condition(ConditionType::Ready)
            .map(|condition| condition.reason)
    }

    #[rstest]
    #[case(b"secret-token".to_vec(), "secret-token")]
    #[case(b"  secret-token\n".to_vec(), "secret-token")]
    fn provider_token_is_read_from_secret(#[case] raw: Vec<u8>, #[case] expected: &str) {
        let secret = Secret {
            data: Some(BTreeMap::from([("token".to_owned(), ByteString(raw))])),
            ..Secret::default()
        };
        let selector = SecretKeySelector {
            name: "cloudscale".to_owned(),
            namespace: "operators".to_owned(),
            key: "token".to_owned(),
        };
        assert_eq!(resolve_provider_token(&secret, &selector).unwrap(), expected);
    }

    #[test]
    fn provider_secret_without_token() {
        let secret = Secret::default();
        let selector = SecretKeySelector {
            name: "cloudscale".to_owned(),
            namespace: "operators".to_owned(),
            key: "token".to_owned(),
        };
        let error = resolve_provider_token(&secret, &selector).unwrap_err();
        assert!(matches!(error, Error::MissingProviderToken { .. }));
        assert_eq!(
            error.to_string(),
            "Provider secret operators/cloudscale has no key \"token\""
        );
    }

    #[tokio::test]
    async fn absent_bucket_is_observed_as_missing() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);

        let observation = external(&storage).observe(&mut bucket).await.unwrap();

        assert_eq!(observation, ExternalObservation::default());
        assert_eq!(bucket.status, None);
    }

    #[tokio::test]
    async fn bucket_without_uid_is_rejected() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        bucket.metadata.uid = None;

        let error = external(&storage).observe(&mut bucket).await.unwrap_err();
        assert!(matches!(error, Error::MissingUid));
    }

    #[tokio::test]
    async fn create_provisions_user_and_bucket() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[("team", "storage")]);
        let bucket_name = format!("backups-{UID}");

        let creation = external(&storage).create(&mut bucket).await.unwrap();

        let details = creation.connection_details;
        assert_eq!(details[ENDPOINT_KEY], "https://objects.rma.cloudscale.ch");
        assert_eq!(details[BUCKET_NAME_KEY], bucket_name);
        assert_eq!(details[USERNAME_KEY], "AK-user-0");
        assert_eq!(details[PASSWORD_KEY], "SK-user-0");

        let status = bucket.status.as_ref().unwrap();
        assert_eq!(status.phase, Some(S3BucketPhase::Creating));
        assert_eq!(status.at_provider.object_user_id.as_deref(), Some("user-0"));
        assert_eq!(status.at_provider.bucket_name.as_deref(), Some(bucket_name.as_str()));
        assert_eq!(ready_reason(&bucket), Some(ConditionReason::Creating));

        let fake_bucket = storage.bucket(&bucket_name).unwrap();
        assert_eq!(fake_bucket.region, "rma");
        assert_eq!(fake_bucket.canned_acl, CannedAcl::Private);
        assert_eq!(fake_bucket.user_id, "user-0");
        assert_eq!(
            storage.user("user-0").unwrap().tags,
            BTreeMap::from([("team".to_owned(), "storage".to_owned())])
        );
    }

    #[tokio::test]
    async fn repeated_create_reuses_object_user() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);

        external.create(&mut bucket).await.unwrap();
        bucket.status = None;
        external.create(&mut bucket).await.unwrap();

        assert_eq!(storage.user_count(), 1);
        assert_eq!(bucket.object_user_id(), Some("user-0"));
    }

    #[tokio::test]
    async fn bucket_becomes_bindable_once_online() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();

        let observation = external.observe(&mut bucket).await.unwrap();
        assert!(observation.resource_exists);
        assert!(observation.resource_up_to_date);
        assert_eq!(bucket.phase(), Some(S3BucketPhase::Online));
        assert_eq!(ready_reason(&bucket), Some(ConditionReason::Creating));
        assert_eq!(bucket.binding_phase(), BindingPhase::Unbindable);

        external.observe(&mut bucket).await.unwrap();
        assert_eq!(ready_reason(&bucket), Some(ConditionReason::Available));
        assert_eq!(bucket.binding_phase(), BindingPhase::Unbound);
    }

    #[tokio::test]
    async fn bound_bucket_stays_bound() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();
        external.observe(&mut bucket).await.unwrap();
        bucket.status_mut().binding_phase = BindingPhase::Bound;

        external.observe(&mut bucket).await.unwrap();
        assert_eq!(bucket.binding_phase(), BindingPhase::Bound);
    }

    #[tokio::test]
    async fn changed_tags_are_detected_and_updated() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[("team", "storage")]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();

        bucket.spec.for_provider.tags.insert("env".to_owned(), "prod".to_owned());
        let observation = external.observe(&mut bucket).await.unwrap();
        assert!(!observation.resource_up_to_date);

        external.update(&mut bucket).await.unwrap();
        assert_eq!(
            storage.user("user-0").unwrap().tags,
            bucket.spec.for_provider.tags
        );
        assert!(external.observe(&mut bucket).await.unwrap().resource_up_to_date);
        assert_eq!(storage.user_count(), 1);
    }

    #[tokio::test]
    async fn failing_provider_leaves_status_untouched() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();
        let status_before = bucket.status.clone();

        storage.fail_with(Some(500));
        let error = external.observe(&mut bucket).await.unwrap_err();

        assert!(matches!(error, Error::GetBucket { .. }));
        assert_eq!(bucket.status, status_before);
    }

    #[tokio::test]
    async fn ambiguous_keys_are_reported_without_touching_status() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();
        external.observe(&mut bucket).await.unwrap();
        let status_before = bucket.status.clone();

        storage.add_key("user-0");
        let error = external.observe(&mut bucket).await.unwrap_err();

        assert!(matches!(error, Error::UnexpectedState { .. }));
        assert!(error.is_unexpected_state());
        assert_eq!(bucket.status, status_before);
        assert_eq!(bucket.binding_phase(), BindingPhase::Unbindable);
    }

    #[rstest]
    #[case(
        Error::CreateBucket { source: cloudscale::Error::UnexpectedKeys { user_id: "u".to_owned(), count: 0 } },
        true
    )]
    #[case(
        Error::GetBucket { source: cloudscale::Error::ApiResponse { status: 500, message: "Oops".to_owned() } },
        false
    )]
    #[case(Error::MissingUid, false)]
    fn unexpected_state_classification(#[case] error: Error, #[case] expected: bool) {
        assert_eq!(error.is_unexpected_state(), expected);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_bucket() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();

        external.delete(&mut bucket).await.unwrap();
        assert_eq!(storage.user_count(), 0);
        assert_eq!(bucket.phase(), Some(S3BucketPhase::Deleting));
        assert_eq!(ready_reason(&bucket), Some(ConditionReason::Deleting));

        let second = storage
            .delete(bucket.object_user_id(), &format!("backups-{UID}"), "rma")
            .await
            .unwrap_err();
        assert!(second.is_not_found());
        external.delete(&mut bucket).await.unwrap();
    }

    #[tokio::test]
    async fn object_user_is_deleted_after_bucket_is_gone() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();
        storage.remove_bucket(&format!("backups-{UID}"));
        bucket.metadata.deletion_timestamp = Some(Time(Timestamp::UNIX_EPOCH));

        let outcome = reconcile_external(&external, &mut bucket).await.unwrap();

        assert_eq!(outcome, Outcome::Released);
        assert_eq!(storage.user_count(), 0);
    }

    #[tokio::test]
    async fn failing_delete_is_reported() {
        let storage = Arc::new(FakeObjectStorage::default());
        let mut bucket = s3_bucket(&[]);
        let external = external(&storage);
        external.create(&mut bucket).await.unwrap();

        storage.fail_with(Some(503));
        let error = external.delete(&mut bucket).await.unwrap_err();
        assert!(matches!(error, Error::DeleteBucket { .. }));
    }

    #[tokio::test]
    async fn claim_is_provisioned_from_default_class() {
        let claim: Bucket = serde_yaml::from_str(
            r#"
            apiVersion: cloudscale.stackable.tech/v1alpha1
            kind: Bucket
            metadata:
              name: backups
              namespace: team-a
              uid: 3c5d2f7e-1a2b-4c3d-8e9f-0a1b2c3d4e5f
            spec: {}
            "#,
        )
        .expect("invalid test input");
        let classes: Vec<S3BucketClass> = serde_yaml::from_str(
            r#"
            - apiVersion: cloudscale.stackable.tech/v1alpha1
              kind: S3BucketClass
              metadata:
                name: standard
                annotations:
                  cloudscale.stackable.tech/is-default-class: "true"
              spec:
                forProvider:
                  region: lpg
                providerRef:
                  name: cloudscale
            - apiVersion: cloudscale.stackable.tech/v1alpha1
              kind: S3BucketClass
              metadata:
                name: archive
              spec:
                forProvider:
                  region: rma
                providerRef:
                  name: cloudscale
                reclaimPolicy: Delete
            "#,
        )
        .expect("invalid test input");

        let class = select_default_class(&classes).unwrap();
        let mut bucket = configure(&claim, class).unwrap();
        assert_eq!(bucket.spec.reclaim_policy, ReclaimPolicy::Retain);
        // The API server assigns a UID once the S3Bucket is applied.
        bucket.metadata.uid = Some("9b2d4e6f-8a0c-4e1f-a3b5-c7d9e1f3a5b7".to_owned());

        let storage = Arc::new(FakeObjectStorage::default());
        let external = external(&storage);
        let outcome = reconcile_external(&external, &mut bucket).await.unwrap();
        assert_eq!(bucket.spec.for_provider.region, "lpg");
        assert_eq!(bucket.phase(), Some(S3BucketPhase::Creating));

        let Outcome::Synced { connection_details } = outcome else {
            panic!("expected the bucket to be synced");
        };
        assert_eq!(
            connection_details[ENDPOINT_KEY],
            "https://objects.lpg.cloudscale.ch"
        );
        assert_eq!(
            connection_details[BUCKET_NAME_KEY],
            "9b2d4e6f-8a0c-4e1f-a3b5-c7d9e1f3a5b7"
        );

        reconcile_external(&external, &mut bucket).await.unwrap();
        assert_eq!(bucket.phase(), Some(S3BucketPhase::Online));
        reconcile_external(&external, &mut bucket).await.unwrap();
        assert_eq!(bucket.binding_phase(), BindingPhase::Unbound);
        assert_eq!(storage.user_count(), 1);
        assert_eq!(
            storage
                .bucket("9b2d4e6f-8a0c-4e1f-a3b5-c7d9e1f3a5b7")
                .unwrap()
                .canned_acl,
            CannedAcl::Private
        );
    }

    #[rstest]
    #[case(Some("public-read"), CannedAcl::PublicRead)]
    #[case(Some("authenticated-read"), CannedAcl::AuthenticatedRead)]
    #[case(Some("log-delivery-write"), CannedAcl::PublicReadWrite)]
    #[case(None, CannedAcl::PublicReadWrite)]
    #[tokio::test]
    async fn predefined_acl_of_claim_reaches_bucket(
        #[case] predefined_acl: Option<&str>,
        #[case] expected: CannedAcl,
    ) {
        let mut claim: Bucket = serde_yaml::from_str(
            r#"
            apiVersion: cloudscale.stackable.tech/v1alpha1
            kind: Bucket
            metadata:
              name: assets
              namespace: web
              uid: 7a1e2b3c-4d5e-4f60-8a9b-0c1d2e3f4a5b
            spec:
              classRef:
                name: public
            "#,
        )
        .expect("invalid test input");
        claim.spec.predefined_acl = predefined_acl.map(str::to_owned);
        let class: S3BucketClass = serde_yaml::from_str(
            r#"
            apiVersion: cloudscale.stackable.tech/v1alpha1
            kind: S3BucketClass
            metadata:
              name: public
            spec:
              forProvider:
                region: rma
                cannedAcl: public-read-write
              providerRef:
                name: cloudscale
            "#,
        )
        .expect("invalid test input");

        let mut bucket = configure(&claim, &class).unwrap();
        bucket.metadata.uid = Some("e4f5a6b7-c8d9-4e0f-a1b2-c3d4e5f6a7b8".to_owned());
        let storage = Arc::new(FakeObjectStorage::default());
        reconcile_external(&external(&storage), &mut bucket)
            .await
            .unwrap();

        let fake_bucket = storage
            .bucket("e4f5a6b7-c8d9-4e0f-a1b2-c3d4e5f6a7b8")
            .unwrap();
        assert_eq!(fake_bucket.canned_acl, expected);
    }
}
