use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::RouterConfig;
use crate::error::{AppError, AppResult};
use crate::event::NavSource;
use crate::pages::{Page, PageContext, PageKind};

use super::history::HistoryState;
use super::matcher::RouteMatch;
use super::table::RouteTable;

/// The designated fallback pattern and the unauthenticated entry path.
pub const ROOT_PATH: &str = "/";

/// Path prefixes that require an authenticated principal.
pub fn default_protected_prefixes() -> Vec<String> {
    vec!["/customer".to_string(), "/driver".to_string()]
}

/// Lifecycle of the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No page mounted.
    Idle,
    /// Previous page cleaned up; gate check and init in flight.
    Loading,
    /// Current page initialized and receiving input.
    Mounted,
}

/// Collaborator toggled unconditionally around every transition.
pub trait LoadingIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Produces the page value for a resolved route.
pub trait PageFactory: Send + Sync {
    fn create(&self, kind: PageKind, route: &RouteMatch) -> Box<dyn Page>;
}

/// Completion of a navigation drive, tagged with its generation by the
/// caller. A stale completion must release the page it carries.
pub(crate) enum NavOutcome {
    Mounted(Box<dyn Page>),
    Unauthenticated,
    Failed(AppError),
}

impl fmt::Debug for NavOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mounted(page) => write!(f, "Mounted({:?})", page.kind()),
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

/// What the caller must do after [`RouteController::finish`].
#[derive(Debug, PartialEq, Eq)]
pub enum FinishAction {
    /// New page is live; redraw.
    Mounted,
    /// Transition failed or was gated; issue a corrective navigation.
    Redirect(String),
    /// A corrective transition failed too; stay idle, surface the failure.
    Halted,
    /// A superseded completion; nothing to do.
    Superseded,
}

struct PendingNav {
    generation: u64,
    path: String,
    source: NavSource,
}

/// Owns the route table, the auth gate, and the single mounted page.
///
/// Constructed once at startup and driven by the event loop; never a
/// process-wide singleton. Navigations run in two halves: [`begin`] performs
/// the synchronous portion (cleanup, history, gate/init dispatch) and spawns
/// the asynchronous drive; [`finish`] applies the completion if and only if
/// its generation is still current, so a superseded navigation's completion
/// is a no-op that releases its own resources.
///
/// [`begin`]: RouteController::begin
/// [`finish`]: RouteController::finish
pub struct RouteController {
    table: RouteTable,
    protected_prefixes: Vec<String>,
    factory: Arc<dyn PageFactory>,
    indicator: Arc<dyn LoadingIndicator>,
    history: HistoryState,
    lifecycle: Lifecycle,
    current: Option<Box<dyn Page>>,
    current_path: Option<String>,
    pending: Option<PendingNav>,
    generation: u64,
    init_timeout: Duration,
}

impl RouteController {
    pub fn new(
        table: RouteTable,
        protected_prefixes: Vec<String>,
        factory: Arc<dyn PageFactory>,
        indicator: Arc<dyn LoadingIndicator>,
        router_config: &RouterConfig,
    ) -> AppResult<Self> {
        if table.page_for(ROOT_PATH).is_none() {
            return Err(AppError::invalid_argument(
                "route table must register the root fallback pattern",
            ));
        }

        Ok(Self {
            table,
            protected_prefixes,
            factory,
            indicator,
            history: HistoryState::new(router_config.history_capacity),
            lifecycle: Lifecycle::Idle,
            current: None,
            current_path: None,
            pending: None,
            generation: 0,
            init_timeout: Duration::from_millis(router_config.page_init_timeout_ms),
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn page(&self) -> Option<&dyn Page> {
        self.current.as_deref()
    }

    pub fn page_mut(&mut self) -> Option<&mut (dyn Page + 'static)> {
        self.current.as_deref_mut()
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Starts a transition to `path`.
    ///
    /// The previous page's cleanup runs here, before the new page exists.
    /// Returns the generation tag of the spawned drive; a later `begin`
    /// supersedes it.
    pub fn begin(&mut self, path: &str, source: NavSource, ctx: &PageContext) -> u64 {
        if source != NavSource::History {
            self.history.record(path);
        }

        if let Some(mut page) = self.current.take() {
            page.cleanup();
        }

        self.current_path = Some(path.to_string());
        self.lifecycle = Lifecycle::Loading;
        self.indicator.show();

        self.generation += 1;
        let generation = self.generation;
        self.pending = Some(PendingNav {
            generation,
            path: path.to_string(),
            source,
        });

        let matched = self.table.match_path(path);
        // The fallback route is validated at construction.
        let kind = self.table.page_for(&matched.pattern).unwrap_or(PageKind::Auth);
        let gated = self.is_protected(path);
        debug!(path, pattern = %matched.pattern, generation, gated, "navigation started");

        let factory = Arc::clone(&self.factory);
        let init_timeout = self.init_timeout;
        let ctx = ctx.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            let outcome = drive(&factory, matched, kind, gated, init_timeout, &path, &ctx).await;
            ctx.send_navigation_done(generation, outcome);
        });

        generation
    }

    /// Replays the previous history entry, if any. Traversal does not push.
    pub fn begin_back(&mut self, ctx: &PageContext) -> Option<u64> {
        let path = self.history.go_back()?;
        Some(self.begin(&path, NavSource::History, ctx))
    }

    /// Replays the next history entry, if any. Traversal does not push.
    pub fn begin_forward(&mut self, ctx: &PageContext) -> Option<u64> {
        let path = self.history.go_forward()?;
        Some(self.begin(&path, NavSource::History, ctx))
    }

    /// Applies a drive completion.
    ///
    /// A completion whose generation is stale releases its page and changes
    /// nothing else — the navigation that superseded it owns the surface.
    pub fn finish(&mut self, generation: u64, outcome: NavOutcome) -> FinishAction {
        if generation != self.generation || self.pending.is_none() {
            if let NavOutcome::Mounted(mut page) = outcome {
                page.cleanup();
            }
            debug!(generation, "superseded navigation discarded");
            return FinishAction::Superseded;
        }

        let Some(pending) = self.pending.take() else {
            return FinishAction::Superseded;
        };
        self.indicator.hide();

        match outcome {
            NavOutcome::Mounted(page) => {
                debug!(path = %pending.path, "page mounted");
                self.current = Some(page);
                self.lifecycle = Lifecycle::Mounted;
                FinishAction::Mounted
            }
            NavOutcome::Unauthenticated => {
                warn!(path = %pending.path, "protected path without principal, redirecting");
                self.lifecycle = Lifecycle::Idle;
                FinishAction::Redirect(ROOT_PATH.to_string())
            }
            NavOutcome::Failed(err) => {
                error!(path = %pending.path, "navigation failed: {err}");
                self.lifecycle = Lifecycle::Idle;
                if pending.source == NavSource::Corrective {
                    // One corrective redirect only; never loop on failure.
                    FinishAction::Halted
                } else {
                    FinishAction::Redirect(ROOT_PATH.to_string())
                }
            }
        }
    }
}

/// The asynchronous half of a navigation: gate check, page construction,
/// bounded initialization. Runs in a spawned task; the caller decides with
/// the generation tag whether the outcome still applies.
async fn drive(
    factory: &Arc<dyn PageFactory>,
    matched: RouteMatch,
    kind: PageKind,
    gated: bool,
    init_timeout: Duration,
    path: &str,
    ctx: &PageContext,
) -> NavOutcome {
    if gated {
        match ctx.services.auth.current_principal().await {
            Ok(Some(_)) => {}
            Ok(None) => return NavOutcome::Unauthenticated,
            Err(err) => return NavOutcome::Failed(err),
        }
    }

    let mut page = factory.create(kind, &matched);
    match tokio::time::timeout(init_timeout, page.init(ctx)).await {
        Ok(Ok(())) => NavOutcome::Mounted(page),
        Ok(Err(err)) => {
            page.cleanup();
            NavOutcome::Failed(AppError::page_init(path, err))
        }
        Err(_) => {
            page.cleanup();
            NavOutcome::Failed(AppError::page_init_timeout(
                path,
                init_timeout.as_millis() as u64,
            ))
        }
    }
}
