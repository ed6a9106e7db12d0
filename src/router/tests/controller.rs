use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::config::{Config, RouterConfig};
use crate::error::{AppError, AppResult};
use crate::event::{DomainEvent, NavSource, TripEvent};
use crate::pages::{Page, PageContext, PageKind, PageSignal};
use crate::router::{
    FinishAction, Lifecycle, LoadingIndicator, NavOutcome, PageFactory, RouteController,
    RouteMatch, RouteTable, default_protected_prefixes,
};
use crate::testkit::{FakeAuthService, services_with_auth};

/// Per-pattern instrumentation handed out by [`ProbeFactory`].
#[derive(Clone, Default)]
struct ProbeHooks {
    inits: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
    fail_init: bool,
}

struct ProbePage {
    kind: PageKind,
    hooks: ProbeHooks,
}

#[async_trait]
impl Page for ProbePage {
    fn kind(&self) -> PageKind {
        self.kind
    }

    async fn init(&mut self, _ctx: &PageContext) -> AppResult<()> {
        self.hooks.inits.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.hooks.gate {
            gate.notified().await;
        }
        if self.hooks.fail_init {
            return Err(AppError::invalid_argument("init refused"));
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.hooks.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&self, _frame: &mut Frame<'_>, _area: Rect) {}

    async fn handle_key(&mut self, _ctx: &PageContext, _key: KeyEvent) -> AppResult<PageSignal> {
        Ok(PageSignal::Ignored)
    }

    fn on_trip_event(&mut self, _event: &TripEvent) -> bool {
        false
    }
}

#[derive(Default)]
struct ProbeFactory {
    hooks: Mutex<HashMap<String, ProbeHooks>>,
    last_route: Mutex<Option<RouteMatch>>,
}

impl ProbeFactory {
    fn hooks_for(&self, pattern: &str) -> ProbeHooks {
        let mut hooks = self.hooks.lock().expect("hook table should lock");
        hooks.entry(pattern.to_string()).or_default().clone()
    }

    fn gated(&self, pattern: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let mut hooks = self.hooks.lock().expect("hook table should lock");
        hooks.entry(pattern.to_string()).or_default().gate = Some(Arc::clone(&gate));
        gate
    }

    fn failing(&self, pattern: &str) {
        let mut hooks = self.hooks.lock().expect("hook table should lock");
        hooks.entry(pattern.to_string()).or_default().fail_init = true;
    }

    fn last_route(&self) -> Option<RouteMatch> {
        self.last_route
            .lock()
            .expect("route cell should lock")
            .clone()
    }
}

impl PageFactory for ProbeFactory {
    fn create(&self, kind: PageKind, route: &RouteMatch) -> Box<dyn Page> {
        *self.last_route.lock().expect("route cell should lock") = Some(route.clone());
        Box::new(ProbePage {
            kind,
            hooks: self.hooks_for(&route.pattern),
        })
    }
}

#[derive(Default)]
struct CountingIndicator {
    shows: AtomicUsize,
    hides: AtomicUsize,
}

impl LoadingIndicator for CountingIndicator {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    controller: RouteController,
    ctx: PageContext,
    events: UnboundedReceiver<DomainEvent>,
    _trips: tokio::sync::mpsc::UnboundedReceiver<TripEvent>,
    indicator: Arc<CountingIndicator>,
    auth: Arc<FakeAuthService>,
}

fn harness(table: RouteTable, auth: FakeAuthService, init_timeout_ms: u64) -> (Harness, Arc<ProbeFactory>) {
    let factory = Arc::new(ProbeFactory::default());
    let indicator = Arc::new(CountingIndicator::default());
    let auth = Arc::new(auth);
    let controller = RouteController::new(
        table,
        default_protected_prefixes(),
        Arc::clone(&factory) as Arc<dyn PageFactory>,
        Arc::clone(&indicator) as Arc<dyn LoadingIndicator>,
        &RouterConfig {
            page_init_timeout_ms: init_timeout_ms,
            history_capacity: 16,
        },
    )
    .expect("controller should build");

    let (events_tx, events_rx) = unbounded_channel();
    let (trip_tx, trip_rx) = unbounded_channel();
    let ctx = PageContext::new(
        services_with_auth(Arc::clone(&auth) as Arc<dyn crate::services::AuthService>),
        Arc::new(Config::default()),
        events_tx,
        trip_tx,
    );

    (
        Harness {
            controller,
            ctx,
            events: events_rx,
            _trips: trip_rx,
            indicator,
            auth,
        },
        factory,
    )
}

fn three_route_table() -> RouteTable {
    let mut table = RouteTable::new();
    table
        .register("/", PageKind::Auth)
        .expect("root should register");
    table
        .register("/a", PageKind::CustomerHome)
        .expect("/a should register");
    table
        .register("/b", PageKind::DriverDashboard)
        .expect("/b should register");
    table
}

fn app_table() -> RouteTable {
    crate::router::default_route_table().expect("default table should build")
}

async fn next_done(events: &mut UnboundedReceiver<DomainEvent>) -> (u64, NavOutcome) {
    loop {
        match events.recv().await.expect("domain event should arrive") {
            DomainEvent::NavigationDone {
                generation,
                outcome,
            } => return (generation, outcome),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn literal_route_mounts_and_toggles_the_indicator() {
    let (mut h, _factory) = harness(app_table(), FakeAuthService::signed_out(), 5_000);

    let generation = h.controller.begin("/auth", NavSource::Programmatic, &h.ctx);
    assert_eq!(h.controller.lifecycle(), Lifecycle::Loading);
    assert_eq!(h.indicator.shows.load(Ordering::SeqCst), 1);

    let (done_generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(done_generation, generation);
    assert_eq!(h.controller.finish(done_generation, outcome), FinishAction::Mounted);

    assert_eq!(h.controller.lifecycle(), Lifecycle::Mounted);
    assert_eq!(h.controller.current_path(), Some("/auth"));
    assert_eq!(h.controller.page().map(|p| p.kind()), Some(PageKind::Auth));
    assert_eq!(h.indicator.hides.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn protected_path_without_principal_redirects_before_init() {
    let (mut h, factory) = harness(app_table(), FakeAuthService::signed_out(), 5_000);
    let dashboard = factory.hooks_for("/driver/dashboard");

    h.controller
        .begin("/driver/dashboard", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    let action = h.controller.finish(generation, outcome);

    assert_eq!(action, FinishAction::Redirect("/".to_string()));
    assert_eq!(h.controller.lifecycle(), Lifecycle::Idle);
    // The destination page never got as far as construction or init.
    assert_eq!(dashboard.inits.load(Ordering::SeqCst), 0);
    assert!(factory.last_route().is_none());

    h.controller.begin("/", NavSource::Corrective, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);
    assert_eq!(h.controller.page().map(|p| p.kind()), Some(PageKind::Auth));
}

#[tokio::test]
async fn gate_consults_the_auth_collaborator() {
    let (mut h, _factory) = harness(
        app_table(),
        FakeAuthService::signed_in("u-1", crate::services::auth::Role::Customer),
        5_000,
    );

    h.controller.begin("/customer", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);
    assert_eq!(
        h.controller.page().map(|p| p.kind()),
        Some(PageKind::CustomerHome)
    );
    assert_eq!(h.auth.lookup_count(), 1);
}

#[tokio::test]
async fn tracking_route_reaches_the_page_with_its_parameter() {
    let (mut h, factory) = harness(
        app_table(),
        FakeAuthService::signed_in("u-1", crate::services::auth::Role::Customer),
        5_000,
    );

    h.controller
        .begin("/tracking/42", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);

    assert_eq!(
        h.controller.page().map(|p| p.kind()),
        Some(PageKind::Tracking)
    );
    let route = factory.last_route().expect("factory should see the route");
    assert_eq!(route.pattern, "/tracking/:id");
    assert_eq!(route.param("id"), Some("42"));
}

#[tokio::test]
async fn unmatched_path_mounts_the_fallback_page() {
    let (mut h, _factory) = harness(app_table(), FakeAuthService::signed_out(), 5_000);

    h.controller
        .begin("/nowhere/at/all", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);
    assert_eq!(h.controller.page().map(|p| p.kind()), Some(PageKind::Auth));
    assert_eq!(h.controller.current_path(), Some("/nowhere/at/all"));
}

#[tokio::test]
async fn cleanup_runs_before_the_next_page_mounts() {
    let (mut h, factory) = harness(three_route_table(), FakeAuthService::signed_out(), 5_000);
    let first = factory.hooks_for("/a");

    h.controller.begin("/a", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    h.controller.finish(generation, outcome);
    assert_eq!(first.cleanups.load(Ordering::SeqCst), 0);

    // The old page is cleaned up during begin, before /b even constructs.
    h.controller.begin("/b", NavSource::Programmatic, &h.ctx);
    assert_eq!(first.cleanups.load(Ordering::SeqCst), 1);

    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);
    assert_eq!(
        h.controller.page().map(|p| p.kind()),
        Some(PageKind::DriverDashboard)
    );
}

#[tokio::test]
async fn superseded_navigation_loses_and_releases_its_page() {
    let (mut h, factory) = harness(three_route_table(), FakeAuthService::signed_out(), 5_000);
    let gate_a = factory.gated("/a");
    let gate_b = factory.gated("/b");
    let hooks_a = factory.hooks_for("/a");
    let hooks_b = factory.hooks_for("/b");

    let first = h.controller.begin("/a", NavSource::Programmatic, &h.ctx);
    let second = h.controller.begin("/b", NavSource::Programmatic, &h.ctx);
    assert_ne!(first, second);

    // Let the superseded navigation finish first.
    gate_a.notify_one();
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(generation, first);
    assert_eq!(
        h.controller.finish(generation, outcome),
        FinishAction::Superseded
    );
    // Its fully initialized page was released, not mounted.
    assert_eq!(hooks_a.inits.load(Ordering::SeqCst), 1);
    assert_eq!(hooks_a.cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.lifecycle(), Lifecycle::Loading);

    gate_b.notify_one();
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(generation, second);
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Mounted);
    assert_eq!(
        h.controller.page().map(|p| p.kind()),
        Some(PageKind::DriverDashboard)
    );
    assert_eq!(hooks_b.cleanups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_init_redirects_once_and_a_failed_corrective_halts() {
    let (mut h, factory) = harness(three_route_table(), FakeAuthService::signed_out(), 5_000);
    factory.failing("/a");
    factory.failing("/");

    h.controller.begin("/a", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    let action = h.controller.finish(generation, outcome);
    assert_eq!(action, FinishAction::Redirect("/".to_string()));
    assert_eq!(h.controller.lifecycle(), Lifecycle::Idle);

    // The corrective navigation fails too: no second redirect.
    h.controller.begin("/", NavSource::Corrective, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert_eq!(h.controller.finish(generation, outcome), FinishAction::Halted);
    assert_eq!(h.controller.lifecycle(), Lifecycle::Idle);
    assert!(h.controller.page().is_none());
}

#[tokio::test(start_paused = true)]
async fn init_timeout_counts_as_a_failure() {
    let (mut h, factory) = harness(three_route_table(), FakeAuthService::signed_out(), 25);
    let _gate = factory.gated("/a");
    let hooks = factory.hooks_for("/a");

    h.controller.begin("/a", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    assert!(matches!(
        &outcome,
        NavOutcome::Failed(AppError::PageInitTimeout { .. })
    ));
    // The timed-out page still released its resources.
    assert_eq!(hooks.cleanups.load(Ordering::SeqCst), 1);

    let action = h.controller.finish(generation, outcome);
    assert_eq!(action, FinishAction::Redirect("/".to_string()));
}

#[tokio::test]
async fn history_traversal_replays_without_pushing() {
    let (mut h, _factory) = harness(three_route_table(), FakeAuthService::signed_out(), 5_000);

    for path in ["/a", "/b"] {
        h.controller.begin(path, NavSource::Programmatic, &h.ctx);
        let (generation, outcome) = next_done(&mut h.events).await;
        h.controller.finish(generation, outcome);
    }
    assert_eq!(h.controller.history().back_len(), 1);

    h.controller.begin_back(&h.ctx).expect("back target should exist");
    let (generation, outcome) = next_done(&mut h.events).await;
    h.controller.finish(generation, outcome);
    assert_eq!(h.controller.current_path(), Some("/a"));
    assert_eq!(h.controller.history().forward_len(), 1);

    h.controller
        .begin_forward(&h.ctx)
        .expect("forward target should exist");
    let (generation, outcome) = next_done(&mut h.events).await;
    h.controller.finish(generation, outcome);
    assert_eq!(h.controller.current_path(), Some("/b"));

    // A fresh navigation burns the forward branch.
    h.controller.begin("/a", NavSource::Programmatic, &h.ctx);
    let (generation, outcome) = next_done(&mut h.events).await;
    h.controller.finish(generation, outcome);
    assert_eq!(h.controller.history().forward_len(), 0);
}
