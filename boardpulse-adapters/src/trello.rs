//! Trello adapter using the REST API.
//!
//! Assembles a [`Snapshot`] from six kinds of read-only requests, issued in
//! this order: board info, lists, members, open cards, labels, then one
//! action-history request per card.
//!
//! ## Failure handling
//!
//! - Any of the five board-level requests failing aborts the snapshot with a
//!   [`FetchError`] naming the endpoint.
//! - A card's action-history request failing is tolerated: the card keeps an
//!   empty history, a warning is logged, and the snapshot still succeeds.
//! - Nothing is retried.
//!
//! Per-card requests run with bounded concurrency. Each one is awaited and
//! handled on its own, so a failing card never cancels its siblings.
//!
//! ## Example
//!
//! ```rust,no_run
//! use boardpulse_adapters::trello::TrelloClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TrelloClient::builder()
//!         .credentials("api-key", "token")
//!         .board_id("pOy2Ba0G")
//!         .concurrency(8)
//!         .build()?;
//!
//!     let snapshot = client.fetch_snapshot().await?;
//!
//!     for card in &snapshot.cards {
//!         println!("{}: {} actions", card.name, card.actions.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use boardpulse_types::{
    Action, Board, BoardList, Card, Label, Member, SchemaVersion, Snapshot, Timestamp,
};

use crate::{ConfigurationError, FetchError};

/// Public Trello REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";

/// Per-card action requests allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BOARD_FIELDS: &str = "name,desc,url";
const LIST_FIELDS: &str = "name,closed,pos";
const MEMBER_FIELDS: &str = "fullName,username";
const CARD_FIELDS: &str =
    "name,desc,due,dueComplete,idList,idMembers,labels,dateLastActivity,closed";
const ACTION_FILTER: &str = "createCard,copyCard,updateCard:idList,updateCard:closed";
const ACTION_FIELDS: &str = "type,date,data";
/// Largest page the actions endpoint serves.
const ACTION_LIMIT: &str = "1000";

/// Issues one GET request and returns the decoded JSON body.
///
/// `endpoint` is a path relative to the API root (e.g. `/boards/abc/lists`).
/// Implementations add authentication themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, FetchError>;
}

/// Stands in for credentials in `Debug` output.
const REDACTED: &str = "<redacted>";

/// HTTP transport authenticating with `key` and `token` query parameters.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    token: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &REDACTED)
            .field("token", &REDACTED)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint, "GET");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("token", self.token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Auth {
                endpoint: endpoint.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::from_reqwest(endpoint, e))
    }
}

/// Read-only client for one Trello board.
#[derive(Debug, Clone)]
pub struct TrelloClient<T = HttpTransport> {
    transport: T,
    board_id: String,
    concurrency: usize,
    include_closed: bool,
}

impl TrelloClient<HttpTransport> {
    /// Create a new builder for configuring the client.
    pub fn builder() -> TrelloClientBuilder {
        TrelloClientBuilder::default()
    }
}

impl<T: Transport> TrelloClient<T> {
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Fetch the whole board into a snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let board = self.board_info().await?;
        let lists = self.lists().await?;
        let members = self.members().await?;
        let mut cards = self.cards().await?;
        let labels = self.labels().await?;

        let missing = self.attach_actions(&mut cards).await;

        info!(
            board = %board.name,
            lists = lists.len(),
            members = members.len(),
            cards = cards.len(),
            labels = labels.len(),
            missing_histories = missing,
            "fetched board snapshot"
        );

        Ok(Snapshot {
            version: SchemaVersion::current(),
            fetched_at: Timestamp::now_utc(),
            board,
            lists,
            members,
            labels,
            cards,
        })
    }

    /// Fetch board info and describe the result.
    pub async fn test_connection(&self) -> Result<String, FetchError> {
        let board = self.board_info().await?;
        Ok(format!("Connected to board '{}'", board.name))
    }

    pub async fn board_info(&self) -> Result<Board, FetchError> {
        let endpoint = format!("/boards/{}", self.board_id);
        self.fetch(&endpoint, &[("fields", BOARD_FIELDS)]).await
    }

    pub async fn lists(&self) -> Result<Vec<BoardList>, FetchError> {
        let endpoint = format!("/boards/{}/lists", self.board_id);
        self.fetch(&endpoint, &[("fields", LIST_FIELDS)]).await
    }

    pub async fn members(&self) -> Result<Vec<Member>, FetchError> {
        let endpoint = format!("/boards/{}/members", self.board_id);
        self.fetch(&endpoint, &[("fields", MEMBER_FIELDS)]).await
    }

    /// Open cards, or every card when `include_closed` is set.
    pub async fn cards(&self) -> Result<Vec<Card>, FetchError> {
        let endpoint = format!("/boards/{}/cards", self.board_id);
        let filter = if self.include_closed { "all" } else { "open" };
        self.fetch(&endpoint, &[("fields", CARD_FIELDS), ("filter", filter)])
            .await
    }

    pub async fn labels(&self) -> Result<Vec<Label>, FetchError> {
        let endpoint = format!("/boards/{}/labels", self.board_id);
        self.fetch(&endpoint, &[("fields", "name,color")]).await
    }

    pub async fn card_actions(&self, card_id: &str) -> Result<Vec<Action>, FetchError> {
        let endpoint = format!("/cards/{}/actions", card_id);
        self.fetch(
            &endpoint,
            &[
                ("filter", ACTION_FILTER),
                ("fields", ACTION_FIELDS),
                ("limit", ACTION_LIMIT),
            ],
        )
        .await
    }

    /// Attach each card's history; returns how many could not be fetched.
    async fn attach_actions(&self, cards: &mut [Card]) -> usize {
        let ids: Vec<String> = cards.iter().map(|c| c.id.clone()).collect();

        let histories: Vec<Option<Vec<Action>>> = stream::iter(ids.iter())
            .map(|id| self.card_actions_or_warn(id))
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        let mut missing = 0;
        for (card, history) in cards.iter_mut().zip(histories) {
            match history {
                Some(actions) => card.actions = actions,
                None => {
                    card.actions = Vec::new();
                    missing += 1;
                }
            }
        }
        missing
    }

    async fn card_actions_or_warn(&self, card_id: &str) -> Option<Vec<Action>> {
        match self.card_actions(card_id).await {
            Ok(actions) => Some(actions),
            Err(e) => {
                warn!(
                    card_id,
                    error = %e,
                    "could not fetch card actions; dates fall back to last activity"
                );
                None
            }
        }
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<R, FetchError> {
        let body = self.transport.get(endpoint, query).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Parse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

/// Builder for TrelloClient.
#[derive(Default)]
pub struct TrelloClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    token: Option<String>,
    board_id: Option<String>,
    timeout: Option<Duration>,
    concurrency: Option<usize>,
    include_closed: bool,
}

impl fmt::Debug for TrelloClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("board_id", &self.board_id)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .field("include_closed", &self.include_closed)
            .finish()
    }
}

impl TrelloClientBuilder {
    /// Set the API root (default: "https://api.trello.com/1").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the API key and token.
    pub fn credentials(mut self, api_key: impl Into<String>, token: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.token = Some(token.into());
        self
    }

    pub fn board_id(mut self, board_id: impl Into<String>) -> Self {
        self.board_id = Some(board_id.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Per-card requests in flight at once (default: 8). `1` keeps them
    /// strictly sequential.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Also fetch archived cards (default: open cards only).
    pub fn include_closed(mut self, include_closed: bool) -> Self {
        self.include_closed = include_closed;
        self
    }

    /// Build a client talking HTTP to the Trello API.
    pub fn build(self) -> Result<TrelloClient<HttpTransport>, ConfigurationError> {
        let api_key = required("api_key", self.api_key.as_deref())?;
        let token = required("token", self.token.as_deref())?;
        // Checked here too so a missing board id is reported before the
        // HTTP client is built.
        required("board_id", self.board_id.as_deref())?;

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| ConfigurationError::invalid("http_client", e.to_string()))?;

        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let transport = HttpTransport {
            client,
            base_url,
            api_key,
            token,
        };

        self.build_with_transport(transport)
    }

    /// Build a client over a custom transport. Only the board id is
    /// required; credentials are the transport's concern.
    pub fn build_with_transport<T: Transport>(
        self,
        transport: T,
    ) -> Result<TrelloClient<T>, ConfigurationError> {
        let board_id = required("board_id", self.board_id.as_deref())?;
        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ConfigurationError::invalid(
                "concurrency",
                "must be at least 1",
            ));
        }

        Ok(TrelloClient {
            transport,
            board_id,
            concurrency,
            include_closed: self.include_closed,
        })
    }
}

fn required(key: &str, value: Option<&str>) -> Result<String, ConfigurationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigurationError::missing(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    /// Serves canned bodies; endpoints without one answer HTTP 500.
    #[derive(Debug, Default)]
    struct StaticTransport {
        bodies: HashMap<String, Value>,
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StaticTransport {
        fn with(mut self, endpoint: &str, body: Value) -> Self {
            self.bodies.insert(endpoint.to_string(), body);
            self
        }

        fn endpoints(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(e, _)| e.clone())
                .collect()
        }

        fn query_for(&self, endpoint: &str, key: &str) -> Option<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(e, _)| e == endpoint)
                .and_then(|(_, q)| q.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push((
                endpoint.to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            self.bodies
                .get(endpoint)
                .cloned()
                .ok_or_else(|| FetchError::Http {
                    endpoint: endpoint.to_string(),
                    status: 500,
                })
        }
    }

    fn board_transport() -> StaticTransport {
        StaticTransport::default()
            .with(
                "/boards/b1",
                json!({
                    "id": "b1", "name": "Platform", "desc": "",
                    "url": "https://trello.com/b/b1"
                }),
            )
            .with(
                "/boards/b1/lists",
                json!([
                    {"id": "l1", "name": "Doing", "closed": false, "pos": 1.0},
                    {"id": "l2", "name": "Done", "closed": false, "pos": 2.0}
                ]),
            )
            .with(
                "/boards/b1/members",
                json!([{"id": "m1", "fullName": "Ana Souza", "username": "ana"}]),
            )
            .with(
                "/boards/b1/cards",
                json!([
                    {"id": "c1", "name": "First", "idList": "l2", "idMembers": ["m1"], "labels": [],
                     "dateLastActivity": "2024-01-05T10:00:00.000Z", "closed": false},
                    {"id": "c2", "name": "Second", "idList": "l1", "idMembers": [], "labels": [],
                     "dateLastActivity": "2024-01-06T10:00:00.000Z", "closed": false}
                ]),
            )
            .with("/boards/b1/labels", json!([{"id": "lb1", "name": "bug", "color": "red"}]))
            .with(
                "/cards/c1/actions",
                json!([
                    {"id": "a2", "type": "updateCard", "date": "2024-01-05T10:00:00.000Z",
                     "data": {"listBefore": {"id": "l1", "name": "Doing"},
                              "listAfter": {"id": "l2", "name": "Done"}}},
                    {"id": "a1", "type": "createCard",
                     "date": "2024-01-01T10:00:00.000Z", "data": {}}
                ]),
            )
            .with("/cards/c2/actions", json!([]))
    }

    fn client(transport: StaticTransport) -> TrelloClient<StaticTransport> {
        TrelloClientBuilder::default()
            .board_id("b1")
            .build_with_transport(transport)
            .unwrap()
    }

    #[test]
    fn test_builder_requires_credentials() {
        let err = TrelloClient::builder().board_id("b1").build().unwrap_err();
        assert_eq!(err, ConfigurationError::missing("api_key"));

        let err = TrelloClient::builder()
            .credentials("key", "  ")
            .board_id("b1")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::missing("token"));

        let err = TrelloClient::builder()
            .credentials("key", "token")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::missing("board_id"));
    }

    #[test]
    fn test_builder_defaults() {
        let client = TrelloClient::builder()
            .credentials("key", "token")
            .board_id("b1")
            .build()
            .unwrap();

        assert_eq!(client.board_id(), "b1");
        assert_eq!(client.concurrency, DEFAULT_CONCURRENCY);
        assert!(!client.include_closed);
        assert_eq!(client.transport.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_custom() {
        let client = TrelloClient::builder()
            .base_url("http://localhost:8080/1/")
            .credentials("key", "token")
            .board_id("b9")
            .concurrency(2)
            .include_closed(true)
            .build()
            .unwrap();

        assert_eq!(client.transport.base_url, "http://localhost:8080/1");
        assert_eq!(client.transport.api_key, "key");
        assert_eq!(client.concurrency, 2);
        assert!(client.include_closed);
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let builder = TrelloClient::builder()
            .credentials("secret-key", "secret-token")
            .board_id("b1");
        let rendered = format!("{:?}", builder);
        assert!(rendered.contains("b1"));
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("secret-token"));

        let client = builder.build().unwrap();
        let rendered = format!("{:?}", client);
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = TrelloClientBuilder::default()
            .board_id("b1")
            .concurrency(0)
            .build_with_transport(StaticTransport::default())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_assembles_board() {
        let client = client(board_transport());
        let snapshot = client.fetch_snapshot().await.unwrap();

        assert_eq!(snapshot.board.name, "Platform");
        assert_eq!(snapshot.lists.len(), 2);
        assert_eq!(snapshot.members[0].full_name, "Ana Souza");
        assert_eq!(snapshot.labels.len(), 1);
        assert_eq!(snapshot.cards.len(), 2);
        assert_eq!(snapshot.cards[0].actions.len(), 2);
        assert!(snapshot.cards[1].actions.is_empty());

        let endpoints = client.transport.endpoints();
        assert_eq!(
            &endpoints[..5],
            &[
                "/boards/b1",
                "/boards/b1/lists",
                "/boards/b1/members",
                "/boards/b1/cards",
                "/boards/b1/labels",
            ]
        );
        assert_eq!(endpoints.len(), 7);
    }

    #[tokio::test]
    async fn test_card_filter_and_action_query() {
        let client = client(board_transport());
        client.fetch_snapshot().await.unwrap();

        assert_eq!(
            client.transport.query_for("/boards/b1/cards", "filter").as_deref(),
            Some("open")
        );
        assert_eq!(
            client.transport.query_for("/cards/c1/actions", "filter").as_deref(),
            Some(ACTION_FILTER)
        );

        let all = TrelloClientBuilder::default()
            .board_id("b1")
            .include_closed(true)
            .build_with_transport(board_transport())
            .unwrap();
        all.fetch_snapshot().await.unwrap();
        assert_eq!(
            all.transport.query_for("/boards/b1/cards", "filter").as_deref(),
            Some("all")
        );
    }

    #[tokio::test]
    async fn test_card_action_failure_is_not_fatal() {
        let mut transport = board_transport();
        transport.bodies.remove("/cards/c1/actions");

        let client = client(transport);
        let snapshot = client.fetch_snapshot().await.unwrap();

        assert!(snapshot.cards[0].actions.is_empty());
        assert!(snapshot.cards[0].date_last_activity.is_some());
        assert_eq!(snapshot.cards[1].id, "c2");
    }

    #[tokio::test]
    async fn test_unparseable_history_is_not_fatal() {
        let transport = board_transport().with("/cards/c2/actions", json!({"unexpected": true}));

        let snapshot = client(transport).fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.cards[0].actions.len(), 2);
        assert!(snapshot.cards[1].actions.is_empty());
    }

    #[tokio::test]
    async fn test_board_level_failure_is_fatal() {
        let mut transport = board_transport();
        transport.bodies.remove("/boards/b1/members");

        let client = client(transport);
        let err = client.fetch_snapshot().await.unwrap_err();

        assert_eq!(err.endpoint(), "/boards/b1/members");
        assert!(err.to_string().contains("/boards/b1/members"));
        // Nothing after the failing request is attempted.
        assert_eq!(client.transport.endpoints().len(), 3);
    }

    #[tokio::test]
    async fn test_parse_failure_names_endpoint() {
        let transport = board_transport().with("/boards/b1/labels", json!({"not": "a list"}));

        let err = client(transport).fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
        assert_eq!(err.endpoint(), "/boards/b1/labels");
    }

    #[test]
    fn test_sequential_matches_concurrent() {
        let sequential = TrelloClientBuilder::default()
            .board_id("b1")
            .concurrency(1)
            .build_with_transport(board_transport())
            .unwrap();

        let a = tokio_test::block_on(sequential.fetch_snapshot()).unwrap();
        let b = tokio_test::block_on(client(board_transport()).fetch_snapshot()).unwrap();

        assert_eq!(a.cards, b.cards);
    }

    #[tokio::test]
    async fn test_connection_message() {
        let message = client(board_transport()).test_connection().await.unwrap();
        assert_eq!(message, "Connected to board 'Platform'");

        let err = client(StaticTransport::default())
            .test_connection()
            .await
            .unwrap_err();
        assert_eq!(err.endpoint(), "/boards/b1");
    }

    #[tokio::test]
    async fn test_http_transport_unreachable_names_endpoint() {
        let client = TrelloClient::builder()
            .base_url("http://127.0.0.1:9")
            .credentials("key", "secret-token")
            .board_id("b1")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = client.board_info().await.unwrap_err();
        assert_eq!(err.endpoint(), "/boards/b1");
        assert!(!err.to_string().contains("secret-token"));
    }
}
