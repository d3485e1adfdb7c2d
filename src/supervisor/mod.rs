//! Supervisor - the reconciliation engine.
//!
//! The supervisor continuously brings observed reality into alignment with
//! the desired state in the service catalog. Each pass reloads the catalog,
//! asks the process observer for live matches per definition, and issues
//! start/stop actions through the launcher. Definitions are reconciled
//! independently; a failure for one service never aborts the pass for the
//! others, and nothing here is allowed to terminate the loop.

pub mod launcher;
pub mod ledger;
pub mod observer;

pub use launcher::{LaunchedProcess, ProcessLauncher, ShellLauncher};
pub use ledger::StartLedger;
pub use observer::{invocation_matches, ObservedProcess, ProcessObserver, SystemObserver};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::catalog::{Catalog, CatalogStore, DefinitionPatch, ServiceDefinition, ServiceMode};
use crate::error::{CircoError, Result};
use crate::notifier::{EventBroadcaster, EventKind};

/// Action requested on a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceAction::Start => write!(f, "start"),
            ServiceAction::Stop => write!(f, "stop"),
        }
    }
}

/// Structured result of an explicit start/stop request. Launch and
/// terminate failures surface here rather than as raised faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// The service name.
    pub service: String,
    /// The action performed.
    pub action: ServiceAction,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Process ids involved (launched or signalled).
    pub pids: Vec<u32>,
    /// Optional message (e.g., "already running" or error details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    fn success(service: impl Into<String>, action: ServiceAction, pids: Vec<u32>) -> Self {
        Self {
            service: service.into(),
            action,
            success: true,
            pids,
            message: None,
        }
    }

    fn success_with_message(
        service: impl Into<String>,
        action: ServiceAction,
        pids: Vec<u32>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            action,
            success: true,
            pids,
            message: Some(message.into()),
        }
    }

    fn failure(
        service: impl Into<String>,
        action: ServiceAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            action,
            success: false,
            pids: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// Reported state of one service, cross-referenced against live processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStateView {
    /// Whether at least one matching process is alive.
    pub running: bool,
    /// Pids of matching processes.
    pub process_ids: Vec<u32>,
    /// Most recent supervised launch among the live pids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_started: Option<DateTime<Utc>>,
    /// Desired run state.
    pub mode: ServiceMode,
    /// Singleton policy flag.
    pub singleton: bool,
}

/// The reconciliation engine.
pub struct Supervisor {
    catalog: CatalogStore,
    observer: Box<dyn ProcessObserver>,
    launcher: Box<dyn ProcessLauncher>,
    ledger: Mutex<StartLedger>,
    notifier: Arc<dyn EventBroadcaster>,
    audit: Arc<AuditLog>,
    interval: Duration,
}

impl Supervisor {
    pub fn new(
        catalog: CatalogStore,
        observer: Box<dyn ProcessObserver>,
        launcher: Box<dyn ProcessLauncher>,
        notifier: Arc<dyn EventBroadcaster>,
        audit: Arc<AuditLog>,
        interval: Duration,
    ) -> Self {
        Self {
            catalog,
            observer,
            launcher,
            ledger: Mutex::new(StartLedger::new()),
            notifier,
            audit,
            interval,
        }
    }

    /// Runs the reconciliation loop until the process exits.
    pub async fn run(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "Supervisor loop started");
        loop {
            self.reconcile_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One reconciliation pass: reload the catalog and align every
    /// definition independently.
    pub async fn reconcile_once(&self) {
        let catalog = match self.catalog.load() {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "Catalog reload failed, skipping pass");
                return;
            }
        };

        for (name, def) in &catalog {
            if def.is_inert() {
                continue;
            }
            self.reconcile_service(name, def).await;
        }
    }

    /// Aligns a single definition. Errors are contained here.
    async fn reconcile_service(&self, name: &str, def: &ServiceDefinition) {
        // An unreadable process table reads as "nothing observed". The
        // conservative bias is toward availability: a spurious restart is
        // preferred over a missed one.
        let matches = match self.observer.matching(&def.command) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(service = name, error = %e, "Observation failed, assuming no matches");
                Vec::new()
            }
        };

        match def.mode {
            ServiceMode::Stopped => {
                // Stopped overrides auto_restart: suppress regardless.
                for process in &matches {
                    match self.launcher.terminate(process.pid) {
                        Ok(()) => {
                            self.audit
                                .record(&format!("Stopped {} (pid {})", name, process.pid));
                        }
                        Err(e) => {
                            warn!(service = name, pid = process.pid, error = %e,
                                "Termination failed");
                        }
                    }
                }
            }
            ServiceMode::Auto => {
                if !matches.is_empty() {
                    debug!(service = name, pids = matches.len(), "Already satisfied");
                    return;
                }
                if !def.auto_restart {
                    return;
                }

                // Note: singleton is not consulted here. The restart path
                // launches purely on "no match observed"; singleton gates
                // only explicit start requests.
                match self.launch_and_record(name, def, &matches) {
                    Ok(launched) => {
                        info!(service = name, pid = launched.pid, "Restarted service");
                        self.notifier.broadcast(EventKind::Startup).await;
                    }
                    Err(e) => {
                        warn!(service = name, error = %e, "Restart failed");
                    }
                }
            }
        }
    }

    /// Launches a definition's command and records it in the start ledger.
    fn launch_and_record(
        &self,
        name: &str,
        def: &ServiceDefinition,
        observed: &[ObservedProcess],
    ) -> Result<LaunchedProcess> {
        let launched = self.launcher.launch(&def.command)?;

        let live_pids: Vec<u32> = observed.iter().map(|p| p.pid).collect();
        self.ledger
            .lock()
            .expect("ledger lock poisoned")
            .record(name, launched.pid, launched.started_at, &live_pids);

        self.audit
            .record(&format!("Started {} (pid {})", name, launched.pid));
        Ok(launched)
    }

    /// Explicit start request. Singleton definitions refuse to launch while
    /// a matching process is already observed; launch failures come back as
    /// a structured failure result.
    pub async fn request_start(&self, name: &str) -> Result<OperationResult> {
        let def = self.lookup(name)?;

        if def.is_inert() {
            return Ok(OperationResult::failure(
                name,
                ServiceAction::Start,
                "service has no launch command",
            ));
        }

        let matches = match self.observer.matching(&def.command) {
            Ok(matches) => matches,
            Err(e) => {
                return Ok(OperationResult::failure(
                    name,
                    ServiceAction::Start,
                    e.to_string(),
                ))
            }
        };

        if def.singleton && !matches.is_empty() {
            let pids = matches.iter().map(|p| p.pid).collect();
            return Ok(OperationResult::success_with_message(
                name,
                ServiceAction::Start,
                pids,
                "already running",
            ));
        }

        match self.launch_and_record(name, &def, &matches) {
            Ok(launched) => {
                self.notifier.broadcast(EventKind::Startup).await;
                Ok(OperationResult::success(
                    name,
                    ServiceAction::Start,
                    vec![launched.pid],
                ))
            }
            Err(e) => Ok(OperationResult::failure(
                name,
                ServiceAction::Start,
                e.to_string(),
            )),
        }
    }

    /// Explicit stop request: terminates every matching process.
    pub async fn request_stop(&self, name: &str) -> Result<OperationResult> {
        let def = self.lookup(name)?;

        if def.is_inert() {
            return Ok(OperationResult::failure(
                name,
                ServiceAction::Stop,
                "service has no launch command",
            ));
        }

        let matches = match self.observer.matching(&def.command) {
            Ok(matches) => matches,
            Err(e) => {
                return Ok(OperationResult::failure(
                    name,
                    ServiceAction::Stop,
                    e.to_string(),
                ))
            }
        };

        if matches.is_empty() {
            return Ok(OperationResult::success_with_message(
                name,
                ServiceAction::Stop,
                Vec::new(),
                "no matching processes",
            ));
        }

        let mut stopped = Vec::new();
        let mut failures = Vec::new();
        for process in &matches {
            match self.launcher.terminate(process.pid) {
                Ok(()) => {
                    self.audit
                        .record(&format!("Stopped {} (pid {})", name, process.pid));
                    stopped.push(process.pid);
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(OperationResult::success(name, ServiceAction::Stop, stopped))
        } else {
            Ok(OperationResult {
                service: name.to_string(),
                action: ServiceAction::Stop,
                success: false,
                pids: stopped,
                message: Some(failures.join("; ")),
            })
        }
    }

    /// Partial definition update. Unknown names are created from defaults;
    /// a transition to `stopped` terminates matching processes immediately,
    /// in addition to periodic enforcement.
    pub async fn update_definition(
        &self,
        name: &str,
        patch: &DefinitionPatch,
    ) -> Result<ServiceDefinition> {
        let mut catalog = self.catalog.load()?;
        let def = catalog.entry(name.to_string()).or_default();
        patch.apply(def);
        let updated = def.clone();
        self.catalog.save(&catalog)?;

        self.audit.record(&format!(
            "Updated {} (mode {}, singleton {}, auto_restart {})",
            name, updated.mode, updated.singleton, updated.auto_restart
        ));

        if updated.mode == ServiceMode::Stopped && !updated.is_inert() {
            if let Ok(matches) = self.observer.matching(&updated.command) {
                for process in &matches {
                    if let Err(e) = self.launcher.terminate(process.pid) {
                        warn!(service = name, pid = process.pid, error = %e,
                            "Immediate termination failed");
                    } else {
                        self.audit
                            .record(&format!("Stopped {} (pid {})", name, process.pid));
                    }
                }
            }
        }

        Ok(updated)
    }

    /// Snapshot of every catalog entry's observed state.
    pub fn service_states(&self) -> Result<BTreeMap<String, ServiceStateView>> {
        let catalog = self.catalog.load()?;
        let ledger = self.ledger.lock().expect("ledger lock poisoned");

        let mut states = BTreeMap::new();
        for (name, def) in &catalog {
            let pids: Vec<u32> = if def.is_inert() {
                Vec::new()
            } else {
                self.observer
                    .matching(&def.command)
                    .map(|matches| matches.iter().map(|p| p.pid).collect())
                    .unwrap_or_default()
            };

            states.insert(
                name.clone(),
                ServiceStateView {
                    running: !pids.is_empty(),
                    last_started: ledger.last_started(name, &pids),
                    process_ids: pids,
                    mode: def.mode,
                    singleton: def.singleton,
                },
            );
        }
        Ok(states)
    }

    /// Returns the current catalog snapshot.
    pub fn catalog_snapshot(&self) -> Result<Catalog> {
        self.catalog.load()
    }

    fn lookup(&self, name: &str) -> Result<ServiceDefinition> {
        self.catalog
            .load()?
            .get(name)
            .cloned()
            .ok_or_else(|| CircoError::ServiceNotFound {
                service: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Observer serving canned responses per command.
    #[derive(Default)]
    struct FakeObserver {
        responses: Mutex<HashMap<String, Vec<ObservedProcess>>>,
    }

    impl FakeObserver {
        fn set(&self, command: &str, pids: &[u32]) {
            let processes = pids
                .iter()
                .map(|pid| ObservedProcess {
                    pid: *pid,
                    invocation: command.to_string(),
                })
                .collect();
            self.responses
                .lock()
                .unwrap()
                .insert(command.to_string(), processes);
        }
    }

    impl ProcessObserver for FakeObserver {
        fn matching(&self, command: &str) -> Result<Vec<ObservedProcess>> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(command)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Launcher that records calls instead of touching the OS.
    #[derive(Default)]
    struct FakeLauncher {
        launched: Mutex<Vec<String>>,
        terminated: Mutex<Vec<u32>>,
        next_pid: AtomicU32,
        fail_commands: Mutex<Vec<String>>,
    }

    impl FakeLauncher {
        fn launches(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }

        fn terminations(&self) -> Vec<u32> {
            self.terminated.lock().unwrap().clone()
        }

        fn fail_for(&self, command: &str) {
            self.fail_commands.lock().unwrap().push(command.to_string());
        }
    }

    impl ProcessLauncher for FakeLauncher {
        fn launch(&self, command: &str) -> Result<LaunchedProcess> {
            if self.fail_commands.lock().unwrap().iter().any(|c| c == command) {
                return Err(CircoError::launch(command, "interpreter unavailable"));
            }
            self.launched.lock().unwrap().push(command.to_string());
            let pid = 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
            Ok(LaunchedProcess {
                pid,
                started_at: Utc::now(),
            })
        }

        fn terminate(&self, pid: u32) -> Result<()> {
            self.terminated.lock().unwrap().push(pid);
            Ok(())
        }
    }

    /// Broadcaster that records events instead of touching the network.
    #[derive(Default)]
    struct FakeBroadcaster {
        events: Mutex<Vec<EventKind>>,
    }

    impl FakeBroadcaster {
        fn events(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventBroadcaster for FakeBroadcaster {
        async fn broadcast(&self, event: EventKind) -> usize {
            self.events.lock().unwrap().push(event);
            0
        }
    }

    struct Fixture {
        supervisor: Supervisor,
        observer: Arc<FakeObserver>,
        launcher: Arc<FakeLauncher>,
        notifier: Arc<FakeBroadcaster>,
        store: CatalogStore,
        _dir: TempDir,
    }

    /// Trait-object forwarding so the fixture can keep handles to fakes.
    struct ObserverHandle(Arc<FakeObserver>);
    impl ProcessObserver for ObserverHandle {
        fn matching(&self, command: &str) -> Result<Vec<ObservedProcess>> {
            self.0.matching(command)
        }
    }

    struct LauncherHandle(Arc<FakeLauncher>);
    impl ProcessLauncher for LauncherHandle {
        fn launch(&self, command: &str) -> Result<LaunchedProcess> {
            self.0.launch(command)
        }
        fn terminate(&self, pid: u32) -> Result<()> {
            self.0.terminate(pid)
        }
    }

    fn fixture(catalog: Catalog) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("services.json"));
        store.save(&catalog).unwrap();

        let observer = Arc::new(FakeObserver::default());
        let launcher = Arc::new(FakeLauncher::default());
        let notifier = Arc::new(FakeBroadcaster::default());

        let supervisor = Supervisor::new(
            store.clone(),
            Box::new(ObserverHandle(observer.clone())),
            Box::new(LauncherHandle(launcher.clone())),
            notifier.clone(),
            Arc::new(AuditLog::new(dir.path().join("circo.log"))),
            Duration::from_secs(5),
        );

        Fixture {
            supervisor,
            observer,
            launcher,
            notifier,
            store,
            _dir: dir,
        }
    }

    fn definition(command: &str) -> ServiceDefinition {
        ServiceDefinition {
            command: command.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reconcile_launches_missing_service() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;

        assert_eq!(fx.launcher.launches(), vec!["/bin/sleep 100"]);
        assert_eq!(fx.supervisor.ledger.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_under_stable_environment() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;
        assert_eq!(fx.launcher.launches().len(), 1);

        // The launched process is now visible to the observer.
        fx.observer.set("/bin/sleep 100", &[1000]);
        fx.supervisor.reconcile_once().await;

        assert_eq!(fx.launcher.launches().len(), 1);
    }

    #[tokio::test]
    async fn test_supervised_launch_broadcasts_startup() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;
        assert_eq!(fx.notifier.events(), vec![EventKind::Startup]);

        // A satisfied pass emits nothing further.
        fx.observer.set("/bin/sleep 100", &[1000]);
        fx.supervisor.reconcile_once().await;
        assert_eq!(fx.notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_skips_inert_definition() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition(""));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;

        assert!(fx.launcher.launches().is_empty());
        assert!(fx.launcher.terminations().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_respects_auto_restart_flag() {
        let mut catalog = Catalog::new();
        let mut def = definition("/bin/sleep 100");
        def.auto_restart = false;
        catalog.insert("demo".to_string(), def);
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;

        assert!(fx.launcher.launches().is_empty());
    }

    #[tokio::test]
    async fn test_stopped_mode_terminates_and_never_launches() {
        let mut catalog = Catalog::new();
        let mut def = definition("/bin/sleep 100");
        def.mode = ServiceMode::Stopped;
        // auto_restart=true must not matter: stopped is higher priority.
        def.auto_restart = true;
        catalog.insert("demo".to_string(), def);
        let fx = fixture(catalog);
        fx.observer.set("/bin/sleep 100", &[42, 43]);

        fx.supervisor.reconcile_once().await;

        assert!(fx.launcher.launches().is_empty());
        assert_eq!(fx.launcher.terminations(), vec![42, 43]);
    }

    #[tokio::test]
    async fn test_launch_failure_does_not_abort_pass() {
        let mut catalog = Catalog::new();
        catalog.insert("broken".to_string(), definition("/bin/broken"));
        catalog.insert("working".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);
        fx.launcher.fail_for("/bin/broken");

        fx.supervisor.reconcile_once().await;

        assert_eq!(fx.launcher.launches(), vec!["/bin/sleep 100"]);
        // Only the successful launch announces itself.
        assert_eq!(fx.notifier.events(), vec![EventKind::Startup]);
    }

    #[tokio::test]
    async fn test_request_start_gated_by_singleton() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);
        fx.observer.set("/bin/sleep 100", &[42]);

        let result = fx.supervisor.request_start("demo").await.unwrap();

        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("already running"));
        assert_eq!(result.pids, vec![42]);
        assert!(fx.launcher.launches().is_empty());
    }

    #[tokio::test]
    async fn test_request_start_non_singleton_always_launches() {
        let mut catalog = Catalog::new();
        let mut def = definition("/usr/bin/worker");
        def.singleton = false;
        catalog.insert("workers".to_string(), def);
        let fx = fixture(catalog);
        fx.observer.set("/usr/bin/worker", &[42]);

        let result = fx.supervisor.request_start("workers").await.unwrap();

        assert!(result.success);
        assert!(result.message.is_none());
        assert_eq!(fx.launcher.launches(), vec!["/usr/bin/worker"]);
    }

    #[tokio::test]
    async fn test_request_start_unknown_service() {
        let fx = fixture(Catalog::new());
        let result = fx.supervisor.request_start("ghost").await;
        assert!(matches!(result, Err(CircoError::ServiceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_request_start_inert_service() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition(""));
        let fx = fixture(catalog);

        let result = fx.supervisor.request_start("demo").await.unwrap();

        assert!(!result.success);
        assert!(fx.launcher.launches().is_empty());
    }

    #[tokio::test]
    async fn test_request_start_launch_failure_is_structured() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/broken"));
        let fx = fixture(catalog);
        fx.launcher.fail_for("/bin/broken");

        let result = fx.supervisor.request_start("demo").await.unwrap();

        assert!(!result.success);
        assert!(result.message.unwrap().contains("interpreter unavailable"));
    }

    #[tokio::test]
    async fn test_request_stop_terminates_matches() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);
        fx.observer.set("/bin/sleep 100", &[42, 43]);

        let result = fx.supervisor.request_stop("demo").await.unwrap();

        assert!(result.success);
        assert_eq!(result.pids, vec![42, 43]);
        assert_eq!(fx.launcher.terminations(), vec![42, 43]);
    }

    #[tokio::test]
    async fn test_request_stop_without_matches() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        let result = fx.supervisor.request_stop("demo").await.unwrap();

        assert!(result.success);
        assert!(result.pids.is_empty());
        assert_eq!(result.message.as_deref(), Some("no matching processes"));
    }

    #[tokio::test]
    async fn test_update_definition_to_stopped_terminates_immediately() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);
        fx.observer.set("/bin/sleep 100", &[42]);

        let patch = DefinitionPatch {
            mode: Some(ServiceMode::Stopped),
            ..Default::default()
        };
        let updated = fx.supervisor.update_definition("demo", &patch).await.unwrap();

        assert_eq!(updated.mode, ServiceMode::Stopped);
        // Termination happens synchronously with the update, not on the
        // next tick.
        assert_eq!(fx.launcher.terminations(), vec![42]);

        // The edit is durable.
        let reloaded = fx.store.load().unwrap();
        assert_eq!(reloaded.get("demo").unwrap().mode, ServiceMode::Stopped);
    }

    #[tokio::test]
    async fn test_update_definition_creates_unknown_service() {
        let fx = fixture(Catalog::new());

        let patch = DefinitionPatch {
            command: Some("/usr/bin/mpd".to_string()),
            ..Default::default()
        };
        let created = fx.supervisor.update_definition("mpd", &patch).await.unwrap();

        assert_eq!(created.command, "/usr/bin/mpd");
        assert!(created.singleton);
        assert_eq!(created.mode, ServiceMode::Auto);

        let reloaded = fx.store.load().unwrap();
        assert!(reloaded.contains_key("mpd"));
    }

    #[tokio::test]
    async fn test_service_states_cross_references_ledger() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;
        fx.observer.set("/bin/sleep 100", &[1000]);

        let states = fx.supervisor.service_states().unwrap();
        let state = states.get("demo").unwrap();

        assert!(state.running);
        assert_eq!(state.process_ids, vec![1000]);
        assert!(state.last_started.is_some());
        assert_eq!(state.mode, ServiceMode::Auto);
        assert!(state.singleton);
    }

    #[tokio::test]
    async fn test_service_states_hides_stale_ledger_entries() {
        let mut catalog = Catalog::new();
        catalog.insert("demo".to_string(), definition("/bin/sleep 100"));
        let fx = fixture(catalog);

        fx.supervisor.reconcile_once().await;
        // The launched process died; nothing matches now.

        let states = fx.supervisor.service_states().unwrap();
        let state = states.get("demo").unwrap();

        assert!(!state.running);
        assert!(state.process_ids.is_empty());
        assert!(state.last_started.is_none());
    }

    #[tokio::test]
    async fn test_catalog_edit_picked_up_next_pass() {
        let fx = fixture(Catalog::new());

        fx.supervisor.reconcile_once().await;
        assert!(fx.launcher.launches().is_empty());

        // External edit between ticks.
        let mut catalog = Catalog::new();
        catalog.insert("late".to_string(), definition("/bin/sleep 7"));
        fx.store.save(&catalog).unwrap();

        fx.supervisor.reconcile_once().await;
        assert_eq!(fx.launcher.launches(), vec!["/bin/sleep 7"]);
    }
}
