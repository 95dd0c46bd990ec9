//! Remote collection store: the canonical entity list for one resource.
//!
//! ## Fetch semantics
//!
//! - Every fetch replaces the collection wholesale on success.
//! - On failure the previous collection is kept and the error is recorded
//!   (it is never raised past the store).
//! - Multi-source resources fetch all sources concurrently with all-settled
//!   semantics: a failing source is logged and recorded, the others still load.
//!   Results are concatenated in source order and de-duplicated by id
//!   (first seen wins).
//!
//! ## Ordering
//!
//! Each fetch takes a monotonically increasing sequence number. A response is
//! applied only if its sequence number is still the latest issued; slower,
//! older responses are discarded instead of overwriting newer data.
//!
//! ## Loading flag
//!
//! `is_loading()` is true while any fetch is in flight. The in-flight counter
//! is decremented by a drop guard, so the flag clears on every exit path.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use serde_json::Value;

use cashper_core::{Entity, EntityId, StatusPolicy};

use crate::backend::Backend;
use crate::descriptor::SourceSpec;
use crate::error::ClientError;

/// Envelope keys tried when a list endpoint wraps its array in an object.
const ENVELOPE_KEYS: &[&str] = &["data", "items", "applications", "results"];

/// Server-side filter/pagination parameters for a list fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl FetchParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(status) = &self.status {
            query.push(("status".to_string(), status.clone()));
        }
        if let Some(category) = &self.category {
            query.push(("type".to_string(), category.clone()));
        }
        if let Some(skip) = self.skip {
            query.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

/// What happened to one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The collection was replaced with `loaded` entities.
    Applied { loaded: usize },
    /// A newer fetch was issued meanwhile; this response was discarded.
    Stale,
    /// Nothing could be loaded; the previous collection is intact.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub sequence: u64,
    pub outcome: FetchOutcome,
    /// `(source name, error)` for every source that failed.
    pub failed_sources: Vec<(String, String)>,
    /// Records dropped because they could not be decoded or repeated an id.
    pub skipped: usize,
}

impl FetchReport {
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Applied { .. })
    }
}

#[derive(Debug)]
struct StoreState<T> {
    items: Vec<T>,
    error: Option<String>,
    last_params: FetchParams,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the fetched entities of one resource plus loading/error state.
pub struct RemoteCollectionStore<T> {
    backend: Arc<dyn Backend>,
    sources: Vec<SourceSpec>,
    status_policy: StatusPolicy,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    state: Mutex<StoreState<T>>,
}

impl<T: Entity> RemoteCollectionStore<T> {
    pub fn new(backend: Arc<dyn Backend>, sources: Vec<SourceSpec>, status_policy: StatusPolicy) -> Self {
        Self {
            backend,
            sources,
            status_policy,
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(StoreState {
                items: Vec::new(),
                error: None,
                last_params: FetchParams::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState<T>> {
        // A panic while holding the lock cannot leave the list half-written
        // (every write is a single assignment), so poisoning is ignored.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fetch every source and replace the collection.
    pub async fn fetch(&self, params: FetchParams) -> FetchReport {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::enter(&self.in_flight);
        self.state().last_params = params.clone();

        let query = params.to_query();
        tracing::debug!(sequence, sources = self.sources.len(), "fetching collection");

        let results = join_all(self.sources.iter().map(|source| {
            let query = query.clone();
            async move {
                let body = self.backend.get_json(&source.list_endpoint, &query).await?;
                unwrap_list(body, source.list_key.as_deref())
            }
        }))
        .await;

        let mut failed_sources = Vec::new();
        let mut raw = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(values) => raw.push((source, values)),
                Err(err) => {
                    tracing::warn!(source = %source.name, "source fetch failed: {err}");
                    failed_sources.push((source.name.clone(), err.user_message()));
                }
            }
        }

        if raw.is_empty() && !failed_sources.is_empty() {
            let error = failed_sources
                .iter()
                .map(|(name, e)| format!("{name}: {e}"))
                .collect::<Vec<_>>()
                .join("; ");
            if self.is_latest(sequence) {
                self.state().error = Some(error.clone());
            }
            return FetchReport {
                sequence,
                outcome: FetchOutcome::Failed { error },
                failed_sources,
                skipped: 0,
            };
        }

        let (items, skipped) = self.merge(raw);

        let mut state = self.state();
        if !self.is_latest(sequence) {
            tracing::warn!(sequence, "discarding out-of-order fetch response");
            return FetchReport {
                sequence,
                outcome: FetchOutcome::Stale,
                failed_sources,
                skipped,
            };
        }

        let loaded = items.len();
        state.items = items;
        state.error = if failed_sources.is_empty() {
            None
        } else {
            Some(format!(
                "some sources failed to load: {}",
                failed_sources
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        };
        tracing::info!(sequence, loaded, skipped, "collection loaded");

        FetchReport {
            sequence,
            outcome: FetchOutcome::Applied { loaded },
            failed_sources,
            skipped,
        }
    }

    /// Re-run the last fetch with the same parameters.
    pub async fn refresh(&self) -> FetchReport {
        let params = self.state().last_params.clone();
        self.fetch(params).await
    }

    fn is_latest(&self, sequence: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == sequence
    }

    /// Decode, normalize, tag and de-duplicate records in source order.
    fn merge(&self, raw: Vec<(&SourceSpec, Vec<Value>)>) -> (Vec<T>, usize) {
        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut items = Vec::new();
        let mut skipped = 0;

        for (source, values) in raw {
            for value in values {
                let mut entity: T = match serde_json::from_value(value) {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::warn!(source = %source.name, "skipping undecodable record: {err}");
                        skipped += 1;
                        continue;
                    }
                };
                if !seen.insert(entity.id().clone()) {
                    tracing::debug!(id = %entity.id(), "duplicate id; keeping first occurrence");
                    skipped += 1;
                    continue;
                }
                entity.tag_source(&source.name);
                normalize_status(&self.status_policy, &mut entity);
                items.push(entity);
            }
        }
        (items, skipped)
    }

    /// Optimistically set one entity's status in memory. Returns the updated copy.
    pub fn patch_status(&self, id: &EntityId, status: &str) -> Option<T> {
        let mut state = self.state();
        let entity = state.items.iter_mut().find(|e| e.id() == id)?;
        entity.set_status(status);
        Some(entity.clone())
    }

    pub fn get(&self, id: &EntityId) -> Option<T> {
        self.state().items.iter().find(|e| e.id() == id).cloned()
    }

    pub fn items(&self) -> Vec<T> {
        self.state().items.clone()
    }

    /// Run `f` against the current items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state().items)
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn last_params(&self) -> FetchParams {
        self.state().last_params.clone()
    }

    pub fn status_policy(&self) -> &StatusPolicy {
        &self.status_policy
    }
}

/// Apply the resource's status policy to a freshly decoded entity.
pub fn normalize_status<T: Entity>(policy: &StatusPolicy, entity: &mut T) {
    let normalized = policy.normalize(entity.status());
    if !normalized.recognized {
        tracing::warn!(
            id = %entity.id(),
            status = %normalized.status,
            "status outside the resource's allowed set"
        );
    }
    if entity.status() != Some(normalized.status.as_str()) {
        entity.set_status(&normalized.status);
    }
}

/// Extract the record array from a bare array or a wrapping object.
pub fn unwrap_list(body: Value, key: Option<&str>) -> Result<Vec<Value>, ClientError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => {
            let found = key
                .and_then(|k| obj.remove(k))
                .or_else(|| ENVELOPE_KEYS.iter().find_map(|k| obj.remove(*k)));
            match found {
                Some(Value::Array(items)) => Ok(items),
                Some(other) => unwrap_list(other, None),
                None => Err(ClientError::Parse(format!(
                    "list response has no {} field",
                    key.map(|k| format!("'{k}'"))
                        .unwrap_or_else(|| "recognized list".to_string())
                ))),
            }
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ClientError::Parse(format!(
            "expected a list response, got {other}"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-process backend shared by the unit tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::backend::{Backend, Method};
    use crate::error::ClientError;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Json(Value),
        Status(u16, String),
        NetworkDown,
        Bytes(Vec<u8>),
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Call {
        pub method: &'static str,
        pub path: String,
        pub query: Vec<(String, String)>,
        pub body: Option<Value>,
    }

    /// Replies are queued per path; the last reply for a path repeats.
    #[derive(Debug, Default)]
    pub struct ScriptedBackend {
        replies: Mutex<HashMap<String, Vec<(Duration, Reply)>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, path: &str, reply: Reply) -> &Self {
            self.reply_after(path, Duration::ZERO, reply)
        }

        pub fn reply_after(&self, path: &str, delay: Duration, reply: Reply) -> &Self {
            self.replies
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push((delay, reply));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, method: &str) -> usize {
            self.calls().iter().filter(|c| c.method == method).count()
        }

        async fn next(&self, call: Call) -> Result<Reply, ClientError> {
            let path = call.path.clone();
            self.calls.lock().unwrap().push(call);
            let (delay, reply) = {
                let mut replies = self.replies.lock().unwrap();
                let queue = replies
                    .get_mut(&path)
                    .ok_or_else(|| ClientError::from_response(404, "{\"detail\":\"Not Found\"}"))?;
                if queue.len() > 1 {
                    queue.remove(0)
                } else {
                    queue[0].clone()
                }
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Status(401, _) => Err(cashper_auth::AuthError::Unauthorized.into()),
                Reply::Status(status, body) => Err(ClientError::from_response(status, &body)),
                Reply::NetworkDown => Err(ClientError::Network("connection refused".to_string())),
                other => Ok(other),
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
            let call = Call {
                method: "GET",
                path: path.to_string(),
                query: query.to_vec(),
                body: None,
            };
            match self.next(call).await? {
                Reply::Json(v) => Ok(v),
                _ => Err(ClientError::Parse("expected JSON".to_string())),
            }
        }

        async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value, ClientError> {
            let call = Call {
                method: method.as_str(),
                path: path.to_string(),
                query: Vec::new(),
                body: Some(body.clone()),
            };
            match self.next(call).await? {
                Reply::Json(v) => Ok(v),
                _ => Ok(Value::Null),
            }
        }

        async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
            let call = Call {
                method: "GET",
                path: path.to_string(),
                query: Vec::new(),
                body: None,
            };
            match self.next(call).await? {
                Reply::Bytes(b) => Ok(b),
                Reply::Json(v) => Ok(v.to_string().into_bytes()),
                _ => Ok(Vec::new()),
            }
        }
    }
}
