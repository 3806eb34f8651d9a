use crate::backend::traits::Backend;
use crate::backend::types::{Direction, Filter, ReadRequest};
use crate::config::Config;
use crate::error::BackendError;
use crate::session::{Identity, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Client for a hosted PostgREST-style backend (REST under `/rest/v1`, auth under `/auth/v1`)
pub struct PostgrestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl PostgrestBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("estate-browser/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: None,
        })
    }

    /// Send subsequent requests on behalf of a signed-in user
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder, bearer: &str) -> RequestBuilder {
        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    fn as_user(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.authorized(builder, bearer)
    }

    /// Fetch the identity behind an access token
    pub async fn current_user(&self, access_token: &str) -> Result<Identity, BackendError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        debug!("Fetching auth user from {}", url);

        let response = send(self.authorized(self.client.get(&url), access_token)).await?;
        let user: Value = decode_json(response).await?;
        Identity::from_auth_user(&user)
    }

    /// Revoke an access token
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        send(self.authorized(self.client.post(&url), access_token)).await?;
        info!("Signed out");
        Ok(())
    }

    /// URL that starts the provider's sign-in flow in a browser
    pub fn authorize_url(
        &self,
        provider: Provider,
        redirect_to: Option<&str>,
    ) -> Result<Url, BackendError> {
        let mut params = vec![("provider", provider.as_str())];
        if let Some(redirect) = redirect_to {
            params.push(("redirect_to", redirect));
        }
        Url::parse_with_params(&format!("{}/auth/v1/authorize", self.base_url), &params)
            .map_err(|e| BackendError::Decode(format!("invalid backend url: {e}")))
    }
}

#[async_trait]
impl Backend for PostgrestBackend {
    async fn select(&self, request: &ReadRequest) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(&request.table);
        let pairs = query_pairs(request);
        debug!("GET {} {:?}", url, pairs);

        let response = send(self.as_user(self.client.get(&url).query(&pairs))).await?;
        let rows: Vec<Value> = decode_json(response).await?;

        debug!("{} returned {} rows", request.table, rows.len());
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table);
        debug!("POST {}", url);

        let builder = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = send(self.as_user(builder)).await?;
        let rows: Vec<Value> = decode_json(response).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {table} returned no row")))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table);
        let pairs = filter_pairs(filters);
        debug!("PATCH {} {:?}", url, pairs);

        let builder = self
            .client
            .patch(&url)
            .query(&pairs)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = send(self.as_user(builder)).await?;
        decode_json(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, BackendError> {
        let url = self.table_url(table);
        let pairs = filter_pairs(filters);
        debug!("DELETE {} {:?}", url, pairs);

        let builder = self
            .client
            .delete(&url)
            .query(&pairs)
            .header("Prefer", "return=representation");
        let response = send(self.as_user(builder)).await?;
        let rows: Vec<Value> = decode_json(response).await?;
        Ok(rows.len())
    }

    fn backend_name(&self) -> &'static str {
        "PostgREST"
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder.send().await.map_err(|e| {
        warn!("Backend request failed: {}", e);
        BackendError::Unreachable(e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = rejection_message(body);

    warn!("Backend returned status {}: {}", status, message);
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// The `message` of a JSON error body, or the body itself
fn rejection_message(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body)
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Query-string pairs for a read: `select`, one pair per filter, `order`, `limit`
pub fn query_pairs(request: &ReadRequest) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), request.columns.clone())];
    pairs.extend(filter_pairs(&request.filters));

    if let Some(order) = &request.order {
        let direction = match order.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = request.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }

    pairs
}

pub fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value } => (column.clone(), format!("eq.{}", plain(value))),
            Filter::Gte { column, value } => (column.clone(), format!("gte.{}", plain(value))),
            Filter::Lte { column, value } => (column.clone(), format!("lte.{}", plain(value))),
            Filter::In { column, values } => {
                let items: Vec<String> = values.iter().map(|v| quoted(&plain(v))).collect();
                (column.clone(), format!("in.({})", items.join(",")))
            }
            Filter::ContainsAny { columns, term } => {
                let pattern = quoted(&format!("*{}*", escape_like(term)));
                let clauses: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{column}.ilike.{pattern}"))
                    .collect();
                ("or".to_string(), format!("({})", clauses.join(",")))
            }
        })
        .collect()
}

/// `%` and `_` are wildcards to `ilike`; the term must match literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Values inside `in.(...)` and `or=(...)` lists must be quoted when they
/// contain list or operator syntax.
fn quoted(value: &str) -> String {
    let reserved = |c: char| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\');
    if value.chars().any(reserved) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::Order;
    use std::time::Duration;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    fn backend() -> PostgrestBackend {
        let config = Config {
            backend_url: "https://demo.example.co/".to_string(),
            anon_key: "anon".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(5),
            recent_limit: 10,
        };
        PostgrestBackend::new(&config).unwrap()
    }

    #[test]
    fn encodes_filters_order_and_limit() {
        let request = ReadRequest::from_table("properties")
            .filter(Filter::gte("price", 150000.0))
            .filter(Filter::lte("price", 300000.0))
            .filter(Filter::eq("bedrooms", 2))
            .filter(Filter::eq("property_type", "Villa"))
            .order_by(Order::descending("created_at"))
            .limit(10);

        assert_eq!(
            query_pairs(&request),
            vec![
                pair("select", "*"),
                pair("price", "gte.150000.0"),
                pair("price", "lte.300000.0"),
                pair("bedrooms", "eq.2"),
                pair("property_type", "eq.Villa"),
                pair("order", "created_at.desc"),
                pair("limit", "10"),
            ]
        );
    }

    #[test]
    fn term_becomes_or_of_ilike_clauses() {
        let filters = [Filter::contains_any(&["title", "location"], "oak")];
        assert_eq!(
            filter_pairs(&filters),
            vec![pair("or", "(title.ilike.*oak*,location.ilike.*oak*)")]
        );
    }

    #[test]
    fn reserved_characters_in_term_are_quoted() {
        let filters = [Filter::contains_any(&["title"], "Main St, \"Unit\" 4")];
        assert_eq!(
            filter_pairs(&filters),
            vec![pair("or", r#"(title.ilike."*Main St, \"Unit\" 4*")"#)]
        );
    }

    #[test]
    fn like_wildcards_in_term_match_literally() {
        let underscore = [Filter::contains_any(&["title"], "a_c")];
        assert_eq!(
            filter_pairs(&underscore),
            vec![pair("or", r#"(title.ilike."*a\\_c*")"#)]
        );

        let percent = [Filter::contains_any(&["title"], "100%")];
        assert_eq!(
            filter_pairs(&percent),
            vec![pair("or", r#"(title.ilike."*100\\%*")"#)]
        );
    }

    #[test]
    fn rejection_message_prefers_json_message_field() {
        let body = r#"{"code":"PGRST116","details":null,"hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert_eq!(
            rejection_message(body.to_string()),
            "JSON object requested, multiple (or no) rows returned"
        );
    }

    #[test]
    fn rejection_message_falls_back_to_raw_body() {
        assert_eq!(
            rejection_message("upstream connect error".to_string()),
            "upstream connect error"
        );
        assert_eq!(rejection_message(r#"{"error":"nope"}"#.to_string()), r#"{"error":"nope"}"#);
        assert_eq!(rejection_message(String::new()), "");
    }

    #[test]
    fn membership_lists_quote_ids_with_dots() {
        let filters = [Filter::is_in("id", ["a1", "b.2"])];
        assert_eq!(filter_pairs(&filters), vec![pair("id", r#"in.(a1,"b.2")"#)]);
    }

    #[test]
    fn builds_provider_authorize_url() {
        let url = backend()
            .authorize_url(Provider::Google, Some("http://localhost:3000/profile"))
            .unwrap();
        assert_eq!(url.path(), "/auth/v1/authorize");
        assert_eq!(
            url.query(),
            Some("provider=google&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fprofile")
        );
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        assert_eq!(
            backend().table_url("favorites"),
            "https://demo.example.co/rest/v1/favorites"
        );
    }
}
