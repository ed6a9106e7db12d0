mod auth;
mod customer_home;
mod driver_dashboard;
mod tracking;

use std::sync::Arc;

use async_trait::async_trait;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;

use crate::config::Config;
use crate::error::AppResult;
use crate::event::{DomainEvent, SessionEvent, TripEvent};
use crate::router::{NavOutcome, PageFactory, RouteMatch};
use crate::services::Services;

pub use auth::AuthPage;
pub use customer_home::CustomerHomePage;
pub use driver_dashboard::DriverDashboardPage;
pub use tracking::TrackingPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Auth,
    CustomerHome,
    DriverDashboard,
    Tracking,
}

impl PageKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Auth => "Sign in",
            Self::CustomerHome => "Book a ride",
            Self::DriverDashboard => "Driver dashboard",
            Self::Tracking => "Trip tracking",
        }
    }
}

/// What a page wants the event loop to do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    Ignored,
    Redraw,
    Navigate(String),
    SignOut,
}

/// Everything a page may reach during its lifetime. Cheap to clone; the
/// navigation drive carries one into its spawned task.
#[derive(Clone)]
pub struct PageContext {
    pub services: Services,
    pub config: Arc<Config>,
    pub(crate) events: UnboundedSender<DomainEvent>,
    pub(crate) trip_events: UnboundedSender<TripEvent>,
}

impl PageContext {
    pub(crate) fn new(
        services: Services,
        config: Arc<Config>,
        events: UnboundedSender<DomainEvent>,
        trip_events: UnboundedSender<TripEvent>,
    ) -> Self {
        Self {
            services,
            config,
            events,
            trip_events,
        }
    }

    /// Sender for change-feed subscriptions owned by the page.
    pub fn trip_sender(&self) -> UnboundedSender<TripEvent> {
        self.trip_events.clone()
    }

    pub fn notify_session(&self, event: SessionEvent) {
        let _ = self.events.send(DomainEvent::Session(event));
    }

    pub(crate) fn send_navigation_done(&self, generation: u64, outcome: NavOutcome) {
        let _ = self
            .events
            .send(DomainEvent::NavigationDone { generation, outcome });
    }
}

/// The page capability contract.
///
/// `init` performs asynchronous setup (fetches, subscriptions) before the
/// page is mounted; `cleanup` releases resources synchronously and must be
/// safe to call on a page that never finished initializing.
#[async_trait]
pub trait Page: Send {
    fn kind(&self) -> PageKind;

    async fn init(&mut self, ctx: &PageContext) -> AppResult<()>;

    fn cleanup(&mut self) {}

    fn render(&self, frame: &mut Frame<'_>, area: Rect);

    async fn handle_key(&mut self, ctx: &PageContext, key: KeyEvent) -> AppResult<PageSignal>;

    /// Change-feed delivery; returns true when the page needs a redraw.
    fn on_trip_event(&mut self, event: &TripEvent) -> bool {
        let _ = event;
        false
    }
}

/// Maps resolved routes onto concrete page values.
pub struct DefaultPageFactory;

impl PageFactory for DefaultPageFactory {
    fn create(&self, kind: PageKind, route: &RouteMatch) -> Box<dyn Page> {
        match kind {
            PageKind::Auth => Box::new(AuthPage::new()),
            PageKind::CustomerHome => Box::new(CustomerHomePage::new()),
            PageKind::DriverDashboard => Box::new(DriverDashboardPage::new(
                route.pattern == "/driver/register",
            )),
            PageKind::Tracking => Box::new(TrackingPage::new(
                route.param("id").unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Label + value + software caret for a focused text field.
pub(crate) fn input_line<'a>(label: &'a str, input: &'a Input, focused: bool) -> Line<'a> {
    let mut spans = vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::raw(input.value()),
    ];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

pub(crate) fn notice_line(notice: &Option<String>) -> Line<'_> {
    match notice {
        Some(text) => Line::from(Span::styled(
            text.as_str(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(""),
    }
}

pub(crate) fn hint_line(hint: &str) -> Line<'_> {
    Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
}
