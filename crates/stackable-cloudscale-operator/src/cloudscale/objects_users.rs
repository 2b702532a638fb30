//! The `objects-users` endpoints of the cloudscale REST API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::ResultExt;
use url::Url;

use crate::cloudscale::{DecodeResponseSnafu, Error, Result, SendRequestSnafu, join_url};

const OBJECTS_USERS_PATH: &str = "objects-users";

/// An object user as returned by the cloudscale API.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ObjectsUser {
    pub id: String,

    pub display_name: String,

    /// Every entry holds an `access_key` and a `secret_key`.
    #[serde(default)]
    pub keys: Vec<BTreeMap<String, String>>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Body of create and update requests.
#[derive(Debug, Serialize)]
pub struct ObjectsUserRequest<'a> {
    pub display_name: &'a str,
    pub tags: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Object user management of the cloudscale API.
#[async_trait]
pub trait ObjectsUsers: Send + Sync {
    async fn list(&self) -> Result<Vec<ObjectsUser>>;

    async fn get(&self, id: &str) -> Result<ObjectsUser>;

    async fn create(&self, user: &ObjectsUserRequest<'_>) -> Result<ObjectsUser>;

    /// Replaces display name and tags. The API answers with an empty body.
    async fn update(&self, id: &str, user: &ObjectsUserRequest<'_>) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// [`ObjectsUsers`] talking to the cloudscale REST API with a bearer token.
#[derive(Clone)]
pub struct ObjectsUsersApi {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ObjectsUsersApi {
    pub fn new(http: reqwest::Client, base_url: Url, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = join_url(&self.base_url, path)?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }
}

#[async_trait]
impl ObjectsUsers for ObjectsUsersApi {
    async fn list(&self) -> Result<Vec<ObjectsUser>> {
        let request = self.request(Method::GET, OBJECTS_USERS_PATH)?;
        decode(send(request).await?).await
    }

    async fn get(&self, id: &str) -> Result<ObjectsUser> {
        let request = self.request(Method::GET, &user_path(id))?;
        decode(send(request).await?).await
    }

    async fn create(&self, user: &ObjectsUserRequest<'_>) -> Result<ObjectsUser> {
        let request = self.request(Method::POST, OBJECTS_USERS_PATH)?.json(user);
        decode(send(request).await?).await
    }

    async fn update(&self, id: &str, user: &ObjectsUserRequest<'_>) -> Result<()> {
        let request = self.request(Method::PATCH, &user_path(id))?.json(user);
        send(request).await.map(drop)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, &user_path(id))?;
        send(request).await.map(drop)
    }
}

fn user_path(id: &str) -> String {
    format!("{OBJECTS_USERS_PATH}/{id}")
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.context(SendRequestSnafu)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json().await.context(DecodeResponseSnafu)
}

/// Maps an unsuccessful response to an [`Error::ApiResponse`], preferring the
/// `detail` field of the body as message.
fn api_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.detail)
        .unwrap_or_else(|_| body.to_owned());
    Error::ApiResponse {
        status: status.as_u16(),
        message,
    }
}
