use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

use crate::error::AppResult;
use crate::event::{DomainEvent, NavSource, SessionEvent, TripEvent};
use crate::pages::{PageContext, PageSignal};
use crate::router::{FinishAction, ROOT_PATH};
use crate::ui::{draw_chrome, draw_loading_overlay, draw_toast_overlay, split_layout};

use super::core::{App, startup_path};
use super::event_bus::EventBusRuntime;
use super::state::ToastKind;
use super::terminal_session::{TerminalSession, TerminalSurface};

enum LoopControl {
    Continue,
    Quit,
}

impl App {
    /// Enters the terminal session and runs until the user quits. With no
    /// explicit initial path, startup routing picks one from the session.
    pub async fn run(&mut self, initial_path: Option<String>) -> AppResult<()> {
        let mut session = TerminalSession::enter()?;
        let result = self.run_inner(&mut session, initial_path).await;
        let restored = session.restore();
        result?;
        restored?;
        Ok(())
    }

    async fn run_inner(
        &mut self,
        session: &mut TerminalSession,
        initial_path: Option<String>,
    ) -> AppResult<()> {
        let (events_tx, mut events_rx, mut bus) = EventBusRuntime::spawn();
        let (trip_tx, mut trip_rx) = unbounded_channel::<TripEvent>();
        let ctx = PageContext::new(
            self.services.clone(),
            Arc::clone(&self.config),
            events_tx,
            trip_tx,
        );

        self.state.principal = self
            .services
            .auth
            .current_principal()
            .await
            .ok()
            .flatten();
        let start = match initial_path {
            Some(path) => path,
            None => startup_path(&self.services).await,
        };
        self.controller.begin(&start, NavSource::Programmatic, &ctx);

        let mut redraw_tick =
            time::interval(Duration::from_millis(self.config.ui.redraw_interval_ms));
        redraw_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let toast_ttl = Duration::from_millis(self.config.ui.toast_ttl_ms);
        let mut needs_redraw = true;

        loop {
            if needs_redraw {
                self.draw(session)?;
                needs_redraw = false;
            }

            tokio::select! {
                maybe_event = events_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    match self.handle_domain_event(event, &ctx).await {
                        LoopControl::Quit => break,
                        LoopControl::Continue => needs_redraw = true,
                    }
                }
                maybe_trip = trip_rx.recv() => {
                    if let Some(trip_event) = maybe_trip
                        && let Some(page) = self.controller.page_mut()
                        && page.on_trip_event(&trip_event)
                    {
                        needs_redraw = true;
                    }
                }
                _ = redraw_tick.tick() => {
                    self.state.expire_toast(toast_ttl);
                    needs_redraw = true;
                }
            }
        }

        bus.shutdown();
        Ok(())
    }

    fn draw(&self, session: &mut TerminalSession) -> AppResult<()> {
        session.draw(|frame| {
            let layout = split_layout(frame.area());

            match self.controller.page() {
                Some(page) => page.render(frame, layout.body),
                None => frame.render_widget(Paragraph::new(""), layout.body),
            }

            draw_chrome(
                frame,
                layout,
                &self.state,
                self.controller.page().map(|page| page.kind().title()),
                self.controller.current_path(),
                self.controller.lifecycle(),
            );

            if self.loading.is_visible() {
                draw_loading_overlay(frame, layout.body);
            }
            if let Some(toast) = &self.state.toast {
                draw_toast_overlay(frame, layout.body, toast);
            }
        })?;
        Ok(())
    }

    async fn handle_domain_event(&mut self, event: DomainEvent, ctx: &PageContext) -> LoopControl {
        match event {
            DomainEvent::Input(Event::Key(key))
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) =>
            {
                self.handle_key(key, ctx).await
            }
            DomainEvent::Input(_) => LoopControl::Continue,
            DomainEvent::InputError(message) => {
                self.state
                    .show_toast(format!("input error: {message}"), ToastKind::Error);
                LoopControl::Continue
            }
            DomainEvent::NavigationDone {
                generation,
                outcome,
            } => {
                match self.controller.finish(generation, outcome) {
                    FinishAction::Mounted | FinishAction::Superseded => {}
                    FinishAction::Redirect(path) => {
                        self.controller.begin(&path, NavSource::Corrective, ctx);
                    }
                    FinishAction::Halted => {
                        self.state
                            .show_toast("navigation failed; please try again", ToastKind::Error);
                    }
                }
                LoopControl::Continue
            }
            DomainEvent::Session(SessionEvent::SignedIn { principal }) => {
                self.state.principal = Some(principal);
                self.state.show_toast("Welcome back!", ToastKind::Success);
                LoopControl::Continue
            }
            DomainEvent::Session(SessionEvent::SignedOut) => {
                self.state.principal = None;
                self.state
                    .show_toast("You have been logged out", ToastKind::Info);
                self.controller.begin(ROOT_PATH, NavSource::Programmatic, ctx);
                LoopControl::Continue
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent, ctx: &PageContext) -> LoopControl {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return LoopControl::Quit;
        }

        if key.modifiers.contains(KeyModifiers::ALT) {
            match key.code {
                KeyCode::Left => {
                    if self.controller.begin_back(ctx).is_none() {
                        self.state.show_toast("nothing to go back to", ToastKind::Info);
                    }
                    return LoopControl::Continue;
                }
                KeyCode::Right => {
                    if self.controller.begin_forward(ctx).is_none() {
                        self.state.show_toast("nothing to go forward to", ToastKind::Info);
                    }
                    return LoopControl::Continue;
                }
                _ => {}
            }
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('o') {
            if self.state.principal.is_some() {
                if let Err(err) = self.services.auth.sign_out().await {
                    warn!("sign out failed: {err}");
                }
                ctx.notify_session(SessionEvent::SignedOut);
            }
            return LoopControl::Continue;
        }

        let signal = match self.controller.page_mut() {
            Some(page) => page.handle_key(ctx, key).await,
            None => return LoopControl::Continue,
        };

        match signal {
            Ok(PageSignal::Navigate(path)) => {
                self.controller.begin(&path, NavSource::Programmatic, ctx);
            }
            Ok(PageSignal::SignOut) => {
                if let Err(err) = self.services.auth.sign_out().await {
                    warn!("sign out failed: {err}");
                }
                ctx.notify_session(SessionEvent::SignedOut);
            }
            Ok(PageSignal::Redraw | PageSignal::Ignored) => {}
            Err(err) => {
                warn!("page action failed: {err}");
                self.state
                    .show_toast(format!("action failed: {err}"), ToastKind::Error);
            }
        }
        LoopControl::Continue
    }
}
