use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::services::auth::Principal;

/// Filter/order/limit parameters for one table operation, rendered as
/// PostgREST query parameters (`col=eq.val`, `order=col.desc`, `limit=n`).
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.as_ref())));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.asc"));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.desc"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Thin client for the hosted database service: phone/OTP auth endpoints
/// plus PostgREST-style table operations. The anon key rides along on every
/// request; a bearer token is attached once a session exists. Token refresh
/// and expiry are the backend SDK's concern, not modelled here.
pub struct RestClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<String>>,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .map_err(|source| {
                AppError::http_with_context(source, "failed to build HTTP client")
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            session: Mutex::new(None),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.base_url)
    }

    fn session_token(&self) -> Option<String> {
        match self.session.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session(&self, token: Option<String>) {
        match self.session.lock() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session_token().is_some()
    }

    pub fn sign_out(&self) {
        self.store_session(None);
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.session_token().unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send_checked(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> AppResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| AppError::http_with_context(source, context))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::backend(
            status.as_u16(),
            extract_error_message(&body),
        ))
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: TableQuery,
    ) -> AppResult<Vec<T>> {
        let builder = self
            .with_auth(self.http.get(self.rest_url(table)))
            .query(&query.to_params());
        let response = self
            .send_checked(builder, &format!("select from {table}"))
            .await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| {
                AppError::http_with_context(source, format!("decode rows from {table}"))
            })
    }

    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: TableQuery,
    ) -> AppResult<Option<T>> {
        let mut rows = self.select::<T>(table, query.limit(1)).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub async fn insert<B, T>(&self, table: &str, row: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .with_auth(self.http.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(row);
        let response = self
            .send_checked(builder, &format!("insert into {table}"))
            .await?;
        let mut rows = response.json::<Vec<T>>().await.map_err(|source| {
            AppError::http_with_context(source, format!("decode inserted row from {table}"))
        })?;
        if rows.is_empty() {
            return Err(AppError::backend(500, format!("{table}: insert returned no row")));
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn update<B, T>(
        &self,
        table: &str,
        query: TableQuery,
        patch: &B,
    ) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .with_auth(self.http.patch(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(&query.to_params())
            .json(patch);
        let response = self
            .send_checked(builder, &format!("update {table}"))
            .await?;
        let mut rows = response.json::<Vec<T>>().await.map_err(|source| {
            AppError::http_with_context(source, format!("decode updated row from {table}"))
        })?;
        if rows.is_empty() {
            return Err(AppError::backend(404, format!("{table}: no row matched update")));
        }
        Ok(rows.swap_remove(0))
    }

    /// Requests a one-time code for the phone number.
    pub async fn request_otp(&self, phone: &str) -> AppResult<()> {
        let builder = self
            .with_auth(self.http.post(self.auth_url("otp")))
            .json(&json!({ "phone": phone }));
        self.send_checked(builder, "request one-time code").await?;
        Ok(())
    }

    /// Exchanges a one-time code for a session and returns the principal.
    pub async fn verify_otp(&self, phone: &str, token: &str) -> AppResult<Principal> {
        #[derive(serde::Deserialize)]
        struct VerifyResponse {
            access_token: String,
            user: Principal,
        }

        let builder = self
            .with_auth(self.http.post(self.auth_url("verify")))
            .json(&json!({ "phone": phone, "token": token, "type": "sms" }));
        let response = self.send_checked(builder, "verify one-time code").await?;
        let verified = response.json::<VerifyResponse>().await.map_err(|source| {
            AppError::http_with_context(source, "decode verify response")
        })?;

        self.store_session(Some(verified.access_token));
        Ok(verified.user)
    }

    /// Returns the authenticated principal, or `None` without a session or
    /// when the backend no longer honours the stored token.
    pub async fn current_user(&self) -> AppResult<Option<Principal>> {
        if !self.has_session() {
            return Ok(None);
        }

        let builder = self.with_auth(self.http.get(self.auth_url("user")));
        let response = builder.send().await.map_err(|source| {
            AppError::http_with_context(source, "fetch authenticated user")
        })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            self.sign_out();
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(
                status.as_u16(),
                extract_error_message(&body),
            ));
        }

        let principal = response.json::<Principal>().await.map_err(|source| {
            AppError::http_with_context(source, "decode authenticated user")
        })?;
        Ok(Some(principal))
    }
}

fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error detail".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
