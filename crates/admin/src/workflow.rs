//! Status transition state machine.
//!
//! `Idle → Submitting → (Success | Failure) → Idle`. Every status change of a
//! resource goes through one workflow instance, which is the only code path
//! that mutates entities in the store.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use cashper_core::{Entity, EntityId};

use crate::backend::Backend;
use crate::descriptor::ResourceDescriptor;
use crate::detail::DetailSelection;
use crate::notify::{Notification, Notifier};
use crate::store::RemoteCollectionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Submitting,
    Success,
    Failure,
}

/// One requested status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCommand {
    pub id: Uuid,
    pub entity_id: EntityId,
    pub from: Option<String>,
    pub to: String,
    pub source: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl StatusCommand {
    pub fn new<T: Entity>(entity: &T, to: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_id: entity.id().clone(),
            from: entity.status().map(str::to_string),
            to: to.into(),
            source: entity.source().map(str::to_string),
            issued_at: Utc::now(),
        }
    }

    /// Request body sent to the status endpoint.
    pub fn body(&self) -> Value {
        json!({ "status": self.to })
    }
}

/// One button of the status action row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusAction {
    pub status: String,
    pub current: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome<T> {
    /// Target equals the current status; nothing was sent.
    Unchanged,
    /// Another transition is in progress; the request was dropped.
    Ignored,
    /// Target is not an allowed status for this resource; nothing was sent.
    Invalid { reason: String },
    /// The server accepted the change. `entity` is the patched copy when it was in the store.
    Applied {
        command: StatusCommand,
        entity: Option<T>,
        response: Value,
    },
    /// The server (or the network) refused the change; no local state was touched.
    Failed { command: StatusCommand, reason: String },
}

impl<T> TransitionOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// Resets the phase to `Idle` however the transition ends, cancellation included.
struct PhaseGuard<'a>(&'a Mutex<WorkflowPhase>);

impl PhaseGuard<'_> {
    fn set(&self, phase: WorkflowPhase) {
        *lock(self.0) = phase;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = WorkflowPhase::Idle;
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct StatusTransitionWorkflow<T> {
    backend: Arc<dyn Backend>,
    store: Arc<RemoteCollectionStore<T>>,
    detail: Arc<Mutex<DetailSelection<T>>>,
    notifier: Arc<dyn Notifier>,
    descriptor: Arc<ResourceDescriptor<T>>,
    close_delay: Duration,
    phase: Mutex<WorkflowPhase>,
}

impl<T: Entity> StatusTransitionWorkflow<T> {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<RemoteCollectionStore<T>>,
        detail: Arc<Mutex<DetailSelection<T>>>,
        notifier: Arc<dyn Notifier>,
        descriptor: Arc<ResourceDescriptor<T>>,
        close_delay: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            detail,
            notifier,
            descriptor,
            close_delay,
            phase: Mutex::new(WorkflowPhase::Idle),
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        *lock(&self.phase)
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != WorkflowPhase::Idle
    }

    /// The action row for `entity`: every allowed status, the current one
    /// disabled, all of them disabled while a transition is running.
    pub fn actions(&self, entity: &T) -> Vec<StatusAction> {
        let policy = &self.descriptor.status_policy;
        let busy = self.is_busy();
        policy
            .allowed()
            .iter()
            .map(|status| {
                let current = entity
                    .status()
                    .map(|s| policy.same(s, status))
                    .unwrap_or(false);
                StatusAction {
                    status: status.clone(),
                    current,
                    enabled: !busy && !current,
                }
            })
            .collect()
    }

    /// Take the Idle → Submitting edge, or `None` when already busy.
    fn begin(&self) -> Option<PhaseGuard<'_>> {
        let mut phase = lock(&self.phase);
        if *phase != WorkflowPhase::Idle {
            return None;
        }
        *phase = WorkflowPhase::Submitting;
        Some(PhaseGuard(&self.phase))
    }

    /// Change `entity`'s status to `target`.
    pub async fn transition(&self, entity: &T, target: &str) -> TransitionOutcome<T> {
        let policy = &self.descriptor.status_policy;
        let target = match policy.validate_target(target) {
            Ok(t) => t,
            Err(err) => {
                let reason = err.to_string();
                self.notifier.notify(Notification::error(reason.clone()));
                return TransitionOutcome::Invalid { reason };
            }
        };
        if entity.status().map(|s| policy.same(s, &target)).unwrap_or(false) {
            tracing::debug!(id = %entity.id(), status = %target, "status unchanged; not submitting");
            return TransitionOutcome::Unchanged;
        }

        let Some(guard) = self.begin() else {
            tracing::debug!(id = %entity.id(), "transition already in progress; ignoring");
            return TransitionOutcome::Ignored;
        };

        let command = StatusCommand::new(entity, target);
        let path = self.descriptor.status_path(entity);
        tracing::info!(
            command = %command.id,
            id = %command.entity_id,
            from = ?command.from,
            to = %command.to,
            %path,
            "submitting status change"
        );

        let response = match self
            .backend
            .send_json(self.descriptor.status_method, &path, &command.body())
            .await
        {
            Ok(response) => response,
            Err(err) => {
                guard.set(WorkflowPhase::Failure);
                let reason = err.user_message();
                tracing::error!(command = %command.id, id = %command.entity_id, "status change failed: {err}");
                self.notifier
                    .notify(Notification::error(format!("Failed to update status: {reason}")));
                return TransitionOutcome::Failed { command, reason };
            }
        };

        guard.set(WorkflowPhase::Success);
        let patched = self.store.patch_status(&command.entity_id, &command.to);
        {
            let mut detail = lock(&self.detail);
            match &patched {
                Some(updated) => detail.replace_if_showing(updated),
                None => {
                    let mut updated = entity.clone();
                    updated.set_status(&command.to);
                    detail.replace_if_showing(&updated);
                }
            }
        }

        let report = self.store.refresh().await;
        if !report.is_applied() {
            tracing::warn!(command = %command.id, outcome = ?report.outcome, "refresh after status change did not apply");
        } else if let Some(fresh) = self.store.get(&command.entity_id) {
            lock(&self.detail).replace_if_showing(&fresh);
        }

        self.notifier.notify(Notification::success(format!(
            "{} {} status updated to {}",
            self.descriptor.name, command.entity_id, command.to
        )));

        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        lock(&self.detail).close_if(&command.entity_id);
        drop(guard);

        TransitionOutcome::Applied {
            entity: self.store.get(&command.entity_id).or(patched),
            command,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SourceSpec;
    use crate::notify::{NotificationLevel, NotificationLog};
    use crate::store::FetchParams;
    use crate::store::testing::{Reply, ScriptedBackend};
    use cashper_core::Record;

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        store: Arc<RemoteCollectionStore<Record>>,
        detail: Arc<Mutex<DetailSelection<Record>>>,
        log: Arc<NotificationLog>,
        workflow: StatusTransitionWorkflow<Record>,
    }

    async fn fixture(backend: ScriptedBackend) -> Fixture {
        fixture_with_delay(backend, Duration::from_millis(5)).await
    }

    async fn fixture_with_delay(backend: ScriptedBackend, close_delay: Duration) -> Fixture {
        let backend = Arc::new(backend);
        let descriptor = Arc::new(ResourceDescriptor::<Record>::new(
            "Loans",
            SourceSpec::new("loans", "/api/loans/all"),
            "/api/loans/{id}/status",
        ));
        let store = Arc::new(RemoteCollectionStore::new(
            backend.clone(),
            descriptor.sources.clone(),
            descriptor.status_policy.clone(),
        ));
        store.fetch(FetchParams::default()).await;
        let detail = Arc::new(Mutex::new(DetailSelection::new()));
        let log = Arc::new(NotificationLog::new());
        let workflow = StatusTransitionWorkflow::new(
            backend.clone(),
            store.clone(),
            detail.clone(),
            log.clone(),
            descriptor,
            close_delay,
        );
        Fixture {
            backend,
            store,
            detail,
            log,
            workflow,
        }
    }

    fn loans(status: &str) -> Reply {
        Reply::Json(json!([
            {"id": 1, "status": status},
            {"id": 2, "status": "Pending"}
        ]))
    }

    #[tokio::test]
    async fn server_error_leaves_everything_in_place() {
        let backend = ScriptedBackend::new();
        backend
            .reply("/api/loans/all", loans("Pending"))
            .reply(
                "/api/loans/1/status",
                Reply::Status(500, "{\"detail\":\"Internal Server Error\"}".into()),
            );
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();
        f.detail.lock().unwrap().open(entity.clone());
        let before = f.store.items();

        let outcome = f.workflow.transition(&entity, "Approved").await;

        assert!(matches!(outcome, TransitionOutcome::Failed { ref reason, .. } if reason == "Internal Server Error"));
        assert_eq!(f.store.items(), before);
        assert!(f.detail.lock().unwrap().is_showing(&EntityId::Number(1)));
        let note = f.log.last().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert!(note.message.contains("Internal Server Error"));
        assert_eq!(f.workflow.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn same_status_is_not_submitted() {
        let backend = ScriptedBackend::new();
        backend.reply("/api/loans/all", loans("Pending"));
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();

        let outcome = f.workflow.transition(&entity, " Pending ").await;

        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert_eq!(f.backend.calls_to("PUT"), 0);
    }

    #[tokio::test]
    async fn unknown_target_is_rejected_locally() {
        let backend = ScriptedBackend::new();
        backend.reply("/api/loans/all", loans("Pending"));
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();

        let outcome = f.workflow.transition(&entity, "Archived").await;

        assert!(matches!(outcome, TransitionOutcome::Invalid { .. }));
        assert_eq!(f.backend.calls_to("PUT"), 0);
        assert_eq!(f.log.last().unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn detail_shows_new_status_until_close_delay_elapses() {
        let backend = ScriptedBackend::new();
        backend
            .reply("/api/loans/all", loans("Pending"))
            .reply("/api/loans/all", loans("Approved"))
            .reply("/api/loans/1/status", Reply::Json(json!({"message": "ok"})));
        let f = fixture_with_delay(backend, Duration::from_millis(150)).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();
        f.detail.lock().unwrap().open(entity.clone());

        let (outcome, during) = tokio::join!(f.workflow.transition(&entity, "Approved"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let detail = f.detail.lock().unwrap();
            (
                detail.is_visible(),
                detail.selected().and_then(|e| e.status().map(str::to_string)),
                f.workflow.phase(),
            )
        });

        assert_eq!(during, (true, Some("Approved".to_string()), WorkflowPhase::Success));
        assert!(matches!(outcome, TransitionOutcome::Applied { .. }));
        assert!(!f.detail.lock().unwrap().is_visible());
        assert_eq!(f.workflow.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn success_patches_refreshes_notifies_and_closes() {
        let backend = ScriptedBackend::new();
        backend
            .reply("/api/loans/all", loans("Pending"))
            .reply("/api/loans/all", loans("Approved"))
            .reply("/api/loans/1/status", Reply::Json(json!({"message": "ok"})));
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();
        f.detail.lock().unwrap().open(entity.clone());

        let outcome = f.workflow.transition(&entity, "Approved").await;

        let TransitionOutcome::Applied { command, entity, .. } = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(command.from.as_deref(), Some("Pending"));
        assert_eq!(entity.unwrap().status(), Some("Approved"));
        assert_eq!(
            f.store.get(&EntityId::Number(1)).unwrap().status(),
            Some("Approved")
        );
        assert!(!f.detail.lock().unwrap().is_visible());
        assert_eq!(f.log.last().unwrap().level, NotificationLevel::Success);
        assert_eq!(f.workflow.phase(), WorkflowPhase::Idle);

        let put = f
            .backend
            .calls()
            .into_iter()
            .find(|c| c.method == "PUT")
            .unwrap();
        assert_eq!(put.path, "/api/loans/1/status");
        assert_eq!(put.body, Some(json!({"status": "Approved"})));
        // initial fetch + refresh
        assert_eq!(f.backend.calls().iter().filter(|c| c.path == "/api/loans/all").count(), 2);
    }

    #[tokio::test]
    async fn second_submit_while_busy_is_ignored() {
        let backend = ScriptedBackend::new();
        backend
            .reply("/api/loans/all", loans("Pending"))
            .reply_after(
                "/api/loans/1/status",
                Duration::from_millis(50),
                Reply::Json(Value::Null),
            );
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();

        let (first, second) = tokio::join!(f.workflow.transition(&entity, "Approved"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(f.workflow.actions(&entity).iter().all(|a| !a.enabled));
            f.workflow.transition(&entity, "Rejected").await
        });

        assert!(first.is_applied());
        assert_eq!(second, TransitionOutcome::Ignored);
        assert_eq!(f.backend.calls_to("PUT"), 1);
    }

    #[tokio::test]
    async fn actions_disable_current_status() {
        let backend = ScriptedBackend::new();
        backend.reply("/api/loans/all", loans("Approved"));
        let f = fixture(backend).await;
        let entity = f.store.get(&EntityId::Number(1)).unwrap();

        let actions = f.workflow.actions(&entity);
        let enabled: Vec<_> = actions
            .iter()
            .filter(|a| a.enabled)
            .map(|a| a.status.as_str())
            .collect();
        assert_eq!(enabled, vec!["Pending", "Rejected"]);
        assert!(actions.iter().any(|a| a.current && a.status == "Approved"));
    }
}
