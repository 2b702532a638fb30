//! Credentials of a provisioned bucket, published as a Secret for consumers.

use std::collections::BTreeMap;

use k8s_openapi::{
    ByteString,
    api::core::v1::Secret,
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference},
};
use snafu::{ResultExt, Snafu};

use crate::{client::Client, cloudscale::Keys, crd::SecretReference};

pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const ENDPOINT_KEY: &str = "endpoint";
pub const BUCKET_NAME_KEY: &str = "bucketname";

/// Flat key/value bundle written to a connection secret.
pub type ConnectionDetails = BTreeMap<String, String>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to apply connection secret {secret:?}"))]
    ApplySecret {
        source: crate::client::Error,
        secret: String,
    },
}

/// Derives the connection details of a bucket.
pub fn connection_details(keys: &Keys, endpoint: &str, bucket_name: &str) -> ConnectionDetails {
    [
        (USERNAME_KEY, keys.access_key.as_str()),
        (PASSWORD_KEY, keys.secret_key.as_str()),
        (ENDPOINT_KEY, endpoint),
        (BUCKET_NAME_KEY, bucket_name),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect()
}

/// Builds the connection secret.
///
/// The owner reference is only set if it lives in the same namespace as the
/// secret. Kubernetes does not support owners in other namespaces.
pub fn build_connection_secret(
    secret_ref: &SecretReference,
    owner: Option<(OwnerReference, &str)>,
    details: &ConnectionDetails,
) -> Secret {
    let owner_references = owner
        .filter(|(_, owner_namespace)| *owner_namespace == secret_ref.namespace)
        .map(|(owner_ref, _)| vec![owner_ref]);

    Secret {
        metadata: ObjectMeta {
            name: Some(secret_ref.name.clone()),
            namespace: Some(secret_ref.namespace.clone()),
            owner_references,
            ..ObjectMeta::default()
        },
        data: Some(
            details
                .iter()
                .map(|(key, value)| (key.clone(), ByteString(value.clone().into_bytes())))
                .collect(),
        ),
        ..Secret::default()
    }
}

/// Writes the connection details to the referenced secret, creating it if needed.
pub async fn publish_connection_details(
    client: &Client,
    secret_ref: &SecretReference,
    owner: Option<(OwnerReference, &str)>,
    details: &ConnectionDetails,
) -> Result<(), Error> {
    let secret = build_connection_secret(secret_ref, owner, details);
    client
        .apply_patch(&secret)
        .await
        .context(ApplySecretSnafu {
            secret: format!("{}/{}", secret_ref.namespace, secret_ref.name),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Keys {
        Keys {
            access_key: "0ZTAIBKSGYBRHQ09G11W".to_owned(),
            secret_key: "bn2ufcwbIa0A".to_owned(),
        }
    }

    fn secret_ref() -> SecretReference {
        SecretReference {
            name: "8e3c7b0e-claim-uid".to_owned(),
            namespace: "team-a".to_owned(),
        }
    }

    fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "cloudscale.stackable.tech/v1alpha1".to_owned(),
            kind: "S3Bucket".to_owned(),
            name: "bucket-8e3c7b0e".to_owned(),
            uid: "d1b7".to_owned(),
            controller: Some(true),
            ..OwnerReference::default()
        }
    }

    #[test]
    fn details_use_fixed_keys() {
        let details = connection_details(&keys(), "https://objects.lpg.cloudscale.ch", "my-bucket");

        assert_eq!(
            details,
            BTreeMap::from([
                ("bucketname".to_owned(), "my-bucket".to_owned()),
                (
                    "endpoint".to_owned(),
                    "https://objects.lpg.cloudscale.ch".to_owned()
                ),
                ("password".to_owned(), "bn2ufcwbIa0A".to_owned()),
                ("username".to_owned(), "0ZTAIBKSGYBRHQ09G11W".to_owned()),
            ])
        );
    }

    #[test]
    fn secret_in_owner_namespace_is_owned() {
        let details = connection_details(&keys(), "https://objects.rma.cloudscale.ch", "b");
        let secret = build_connection_secret(&secret_ref(), Some((owner(), "team-a")), &details);

        assert_eq!(secret.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(secret.metadata.owner_references.map(|o| o.len()), Some(1));
        let data = secret.data.unwrap();
        assert_eq!(data[USERNAME_KEY], ByteString(b"0ZTAIBKSGYBRHQ09G11W".to_vec()));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn secret_in_other_namespace_is_not_owned() {
        let details = connection_details(&keys(), "https://objects.rma.cloudscale.ch", "b");
        let secret =
            build_connection_secret(&secret_ref(), Some((owner(), "operators")), &details);

        assert_eq!(secret.metadata.owner_references, None);
    }
}
