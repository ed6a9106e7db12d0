use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::backend::Subscription;
use crate::error::{AppError, AppResult};
use crate::event::TripEvent;
use crate::services::auth::Role;
use crate::services::trip::{Trip, TripStatus};

use super::{Page, PageContext, PageKind, PageSignal, hint_line, notice_line};

const STATUS_LADDER: [TripStatus; 6] = [
    TripStatus::Requested,
    TripStatus::Accepted,
    TripStatus::EnRoute,
    TripStatus::Arrived,
    TripStatus::InProgress,
    TripStatus::Completed,
];

fn ladder_index(status: TripStatus) -> Option<usize> {
    STATUS_LADDER.iter().position(|&step| step == status)
}

/// Live view of a single trip. The change-feed subscription acquired in
/// `init` is the page's scoped resource; `cleanup` releases it before the
/// next page mounts.
pub struct TrackingPage {
    trip_id: String,
    trip: Option<Trip>,
    viewer: Option<(String, Role)>,
    subscription: Option<Subscription>,
    notice: Option<String>,
}

impl TrackingPage {
    pub fn new(trip_id: String) -> Self {
        Self {
            trip_id,
            trip: None,
            viewer: None,
            subscription: None,
            notice: None,
        }
    }

    fn viewer_is_customer(&self) -> bool {
        match (&self.viewer, &self.trip) {
            (Some((id, _)), Some(trip)) => trip.customer_id == *id,
            _ => false,
        }
    }

    fn viewer_is_driver(&self) -> bool {
        match (&self.viewer, &self.trip) {
            (Some((id, _)), Some(trip)) => trip.driver_id.as_deref() == Some(id.as_str()),
            _ => false,
        }
    }

    async fn cancel(&mut self, ctx: &PageContext) {
        let Some(trip) = &self.trip else { return };
        if !self.viewer_is_customer() {
            self.notice = Some("only the customer can cancel this trip".to_string());
            return;
        }
        if !trip.status.is_cancellable() {
            self.notice = Some(format!("a {} trip cannot be cancelled", trip.status.as_str()));
            return;
        }

        match ctx
            .services
            .trips
            .cancel(&self.trip_id, "cancelled by customer")
            .await
        {
            Ok(cancelled) => {
                self.trip = Some(cancelled);
                self.notice = Some("trip cancelled".to_string());
            }
            Err(err) => self.notice = Some(format!("could not cancel: {err}")),
        }
    }

    async fn advance(&mut self, ctx: &PageContext) {
        let Some(trip) = &self.trip else { return };
        if !self.viewer_is_driver() {
            self.notice = Some("only the assigned driver can advance the trip".to_string());
            return;
        }
        let Some(next) = trip.status.next_for_driver() else {
            self.notice = Some("nothing left to advance".to_string());
            return;
        };

        match ctx.services.trips.update_status(&self.trip_id, next).await {
            Ok(updated) => {
                self.notice = Some(format!("trip is now {}", updated.status.as_str()));
                self.trip = Some(updated);
            }
            Err(err) => self.notice = Some(format!("could not update: {err}")),
        }
    }

    async fn reload(&mut self, ctx: &PageContext) {
        match ctx.services.trips.trip_by_id(&self.trip_id).await {
            Ok(trip) => {
                self.trip = Some(trip);
                self.notice = None;
            }
            Err(err) => self.notice = Some(format!("could not reload: {err}")),
        }
    }
}

#[async_trait]
impl Page for TrackingPage {
    fn kind(&self) -> PageKind {
        PageKind::Tracking
    }

    async fn init(&mut self, ctx: &PageContext) -> AppResult<()> {
        if self.trip_id.trim().is_empty() {
            return Err(AppError::invalid_argument("a trip id is required"));
        }

        let trip = ctx.services.trips.trip_by_id(&self.trip_id).await?;

        if let Some(principal) = ctx.services.auth.current_principal().await? {
            let role = ctx
                .services
                .auth
                .profile(&principal.id)
                .await?
                .map(|profile| profile.role)
                .unwrap_or(Role::Customer);
            self.viewer = Some((principal.id, role));
        }

        self.subscription = Some(
            ctx.services
                .trips
                .subscribe_trip(&self.trip_id, ctx.trip_sender()),
        );
        self.trip = Some(trip);
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(format!(" Trip {} ", self.trip_id))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(trip) = &self.trip else {
            frame.render_widget(Paragraph::new("Loading trip..."), inner);
            return;
        };

        let mut lines = vec![
            Line::from(format!(
                "{} → {}",
                trip.pickup_location, trip.dropoff_location
            )),
            Line::from(format!(
                "Ride: {}   Distance: {:.1} km   Estimated fare: {:.2}",
                trip.ride_type.as_str(),
                trip.distance.unwrap_or(0.0),
                trip.estimated_cost.unwrap_or(0.0)
            )),
            Line::from(""),
        ];

        if trip.status == TripStatus::Cancelled {
            lines.push(Line::from(Span::styled(
                format!(
                    "Cancelled: {}",
                    trip.cancellation_reason.as_deref().unwrap_or("no reason given")
                ),
                Style::default().fg(Color::Red),
            )));
        } else {
            let reached = ladder_index(trip.status).unwrap_or(0);
            let mut spans = Vec::new();
            for (idx, step) in STATUS_LADDER.iter().enumerate() {
                let style = if idx <= reached {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if idx > 0 {
                    spans.push(Span::styled(" ── ", Style::default().fg(Color::DarkGray)));
                }
                spans.push(Span::styled(step.as_str(), style));
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(""));
        lines.push(notice_line(&self.notice));
        lines.push(hint_line(
            "c: cancel (customer)   s: advance (driver)   r: reload",
        ));
        frame.render_widget(Paragraph::new(lines), inner);
    }

    async fn handle_key(&mut self, ctx: &PageContext, key: KeyEvent) -> AppResult<PageSignal> {
        if key.modifiers != KeyModifiers::NONE {
            return Ok(PageSignal::Ignored);
        }
        match key.code {
            KeyCode::Char('c') => {
                self.cancel(ctx).await;
                Ok(PageSignal::Redraw)
            }
            KeyCode::Char('s') => {
                self.advance(ctx).await;
                Ok(PageSignal::Redraw)
            }
            KeyCode::Char('r') => {
                self.reload(ctx).await;
                Ok(PageSignal::Redraw)
            }
            _ => Ok(PageSignal::Ignored),
        }
    }

    fn on_trip_event(&mut self, event: &TripEvent) -> bool {
        match event {
            TripEvent::Updated(trip) if trip.id == self.trip_id => {
                self.trip = Some(trip.clone());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TrackingPage, ladder_index};
    use crate::services::trip::TripStatus;

    #[test]
    fn ladder_orders_the_active_statuses() {
        assert_eq!(ladder_index(TripStatus::Requested), Some(0));
        assert_eq!(ladder_index(TripStatus::Completed), Some(5));
        assert_eq!(ladder_index(TripStatus::Cancelled), None);
    }

    #[test]
    fn page_starts_without_trip_or_subscription() {
        let page = TrackingPage::new("42".to_string());
        assert!(page.trip.is_none());
        assert!(page.subscription.is_none());
        assert_eq!(page.trip_id, "42");
    }
}
