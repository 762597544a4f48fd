//! Client for the hosted backend: PostgREST collections under `/rest/v1`,
//! object storage under `/storage/v1` and auth under `/auth/v1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::model::{Credentials, LikeKey, NewAccount, NewPlace, NewReport, PlaceRecord, UserId};

const PLACES_SELECT: &str = "*,profiles(display_name),place_likes(user_id)";

pub struct RemoteGateway {
    client: reqwest::Client,
    api_url: String,
    anon_key: String,
    bucket: String,
    session: RwLock<Option<AuthSession>>,
}

#[derive(Clone, Debug)]
struct AuthSession {
    access_token: String,
    user_id: UserId,
}

/// Error body returned by PostgREST, storage and auth endpoints.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

impl RemoteGateway {
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<RemoteGateway, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(RemoteGateway {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            bucket: bucket.into(),
            session: RwLock::new(None),
        })
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.api_url, self.bucket, file_name
        )
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        };

        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}")).await
    }
}

/// Turns a non-success response into [GatewayError::Rejected], keeping the backend's error code.
async fn check(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    let code = match body.code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => status.as_u16().to_string(),
    };
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    warn!(%status, %code, %message, "Gateway rejected request");
    Err(GatewayError::rejected(code, message))
}

fn user_id_from(value: &Value) -> Option<UserId> {
    value["user"]["id"]
        .as_str()
        .or_else(|| value["id"].as_str())
        .map(UserId::from)
}

#[async_trait]
impl Gateway for RemoteGateway {
    fn backend_tag(&self) -> &'static str {
        "remote"
    }

    async fn fetch_places(&self) -> Result<Vec<PlaceRecord>, GatewayError> {
        let response = self
            .rest(Method::GET, "places")
            .await
            .query(&[("select", PLACES_SELECT), ("order", "created_at.desc")])
            .send()
            .await?;

        let bytes = check(response).await?.bytes().await?;
        let records: Vec<PlaceRecord> = serde_json::from_slice(&bytes)?;
        debug!(count = records.len(), "Fetched place records");
        Ok(records)
    }

    async fn insert_place(&self, place: &NewPlace) -> Result<(), GatewayError> {
        let response = self
            .rest(Method::POST, "places")
            .await
            .header("Prefer", "return=minimal")
            .json(place)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn insert_like(&self, like: &LikeKey) -> Result<(), GatewayError> {
        let response = self
            .rest(Method::POST, "place_likes")
            .await
            .header("Prefer", "return=minimal")
            .json(like)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn delete_like(&self, like: &LikeKey) -> Result<(), GatewayError> {
        let response = self
            .rest(Method::DELETE, "place_likes")
            .await
            .query(&[
                ("place_id", format!("eq.{}", like.place_id)),
                ("user_id", format!("eq.{}", like.user_id)),
            ])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn insert_report(&self, report: &NewReport) -> Result<(), GatewayError> {
        let response = self
            .rest(Method::POST, "place_reports")
            .await
            .header("Prefer", "return=minimal")
            .json(report)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let path = format!("/storage/v1/object/{}/{}", self.bucket, file_name);
        let response = self
            .request(Method::POST, &path)
            .await
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        check(response).await?;
        Ok(self.public_url(file_name))
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<UserId, GatewayError> {
        let response = self
            .request(Method::POST, "/auth/v1/signup")
            .await
            .json(&json!({
                "email": account.credentials.email.trim(),
                "password": account.credentials.password,
                "data": { "display_name": account.display_name.trim() },
            }))
            .send()
            .await?;

        let body: Value = check(response).await?.json().await?;
        user_id_from(&body)
            .ok_or_else(|| GatewayError::rejected("malformed_response", "sign up returned no user"))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, GatewayError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.api_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": credentials.email.trim(),
                "password": credentials.password,
            }))
            .send()
            .await?;

        let token: TokenResponse = check(response).await?.json().await?;
        let user_id = UserId::from(token.user.id);

        *self.session.write().await = Some(AuthSession {
            access_token: token.access_token,
            user_id: user_id.clone(),
        });

        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        if self.session.read().await.is_none() {
            return Ok(());
        }

        let response = self.request(Method::POST, "/auth/v1/logout").await.send().await;
        // the local session is dropped even if the backend could not be reached
        *self.session.write().await = None;

        check(response?).await?;
        Ok(())
    }

    async fn current_viewer(&self) -> Result<Option<UserId>, GatewayError> {
        let session = match self.session.read().await.clone() {
            Some(session) => session,
            None => return Ok(None),
        };

        let response = self.request(Method::GET, "/auth/v1/user").await.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            *self.session.write().await = None;
            return Ok(None);
        }

        let body: Value = check(response).await?.json().await?;
        Ok(user_id_from(&body).or(Some(session.user_id)))
    }
}
