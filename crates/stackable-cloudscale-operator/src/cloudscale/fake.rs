//! In-memory [`ObjectStorage`] used by tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    cloudscale::{Error, ObjectStorage, ObjectsUser, Result},
    crd::CannedAcl,
};

#[derive(Clone, Debug)]
pub struct FakeBucket {
    pub region: String,
    pub canned_acl: CannedAcl,
    pub user_id: String,
}

#[derive(Default)]
struct State {
    users: HashMap<String, ObjectsUser>,
    buckets: HashMap<String, FakeBucket>,
    fail_with: Option<u16>,
}

/// Stores object users and buckets in memory.
///
/// [`FakeObjectStorage::fail_with`] makes every following call fail with an
/// API error of the given status.
#[derive(Default)]
pub struct FakeObjectStorage {
    state: Mutex<State>,
    next_id: AtomicUsize,
}

impl FakeObjectStorage {
    pub fn fail_with(&self, status: Option<u16>) {
        self.state.lock().unwrap().fail_with = status;
    }

    pub fn user(&self, id: &str) -> Option<ObjectsUser> {
        self.state.lock().unwrap().users.get(id).cloned()
    }

    pub fn bucket(&self, name: &str) -> Option<FakeBucket> {
        self.state.lock().unwrap().buckets.get(name).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    /// Removes only the bucket, as a delete failing halfway would.
    pub fn remove_bucket(&self, name: &str) {
        self.state.lock().unwrap().buckets.remove(name);
    }

    /// Adds a key pair to an existing user, which makes its keys ambiguous.
    pub fn add_key(&self, id: &str) {
        if let Some(user) = self.state.lock().unwrap().users.get_mut(id) {
            user.keys.push(key_pair("extra"));
        }
    }

    fn check(state: &State) -> Result<()> {
        match state.fail_with {
            Some(status) => Err(Error::ApiResponse {
                status,
                message: "injected failure".to_owned(),
            }),
            None => Ok(()),
        }
    }
}

fn key_pair(seed: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("access_key".to_owned(), format!("AK-{seed}")),
        ("secret_key".to_owned(), format!("SK-{seed}")),
    ])
}

fn find_user<'a>(
    state: &'a State,
    user_id: Option<&str>,
    bucket_name: &str,
) -> Result<&'a ObjectsUser> {
    let found = match user_id {
        Some(id) => state.users.get(id),
        None => state.users.values().find(|u| u.display_name == bucket_name),
    };
    found.ok_or_else(|| Error::ObjectUserNotFound {
        display_name: bucket_name.to_owned(),
    })
}

#[async_trait]
impl ObjectStorage for FakeObjectStorage {
    async fn create_or_update(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        region: &str,
        canned_acl: Option<CannedAcl>,
        tags: &BTreeMap<String, String>,
    ) -> Result<ObjectsUser> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state)?;

        let existing = find_user(&state, user_id, bucket_name)
            .ok()
            .map(|user| user.id.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
                state.users.insert(id.clone(), ObjectsUser {
                    id: id.clone(),
                    display_name: bucket_name.to_owned(),
                    keys: vec![key_pair(&id)],
                    tags: BTreeMap::new(),
                });
                id
            }
        };

        let user = state.users.get_mut(&id).unwrap();
        user.tags = tags.clone();
        let user = user.clone();

        state
            .buckets
            .entry(bucket_name.to_owned())
            .or_insert_with(|| FakeBucket {
                region: region.to_owned(),
                canned_acl: canned_acl.unwrap_or_default(),
                user_id: id,
            });
        Ok(user)
    }

    async fn get_info(
        &self,
        user_id: Option<&str>,
        bucket_name: &str,
        _region: &str,
    ) -> Result<ObjectsUser> {
        let state = self.state.lock().unwrap();
        Self::check(&state)?;

        let user = find_user(&state, user_id, bucket_name)?.clone();
        if !state.buckets.contains_key(bucket_name) {
            return Err(Error::BucketNotFound {
                bucket: bucket_name.to_owned(),
            });
        }
        Ok(user)
    }

    async fn delete(&self, user_id: Option<&str>, bucket_name: &str, _region: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state)?;

        let id = find_user(&state, user_id, bucket_name)?.id.clone();
        state.buckets.remove(bucket_name);
        state.users.remove(&id);
        Ok(())
    }
}
