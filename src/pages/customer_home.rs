use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::error::{AppError, AppResult};
use crate::services::trip::{NewTrip, RideType, Trip, estimate_fare};

use super::{Page, PageContext, PageKind, PageSignal, hint_line, input_line, notice_line};

const DISTANCE_STEP_KM: f64 = 0.5;
const MIN_DISTANCE_KM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookingField {
    Pickup,
    Dropoff,
}

/// Booking form plus the customer's recent trips.
pub struct CustomerHomePage {
    customer_id: String,
    pickup: Input,
    dropoff: Input,
    focus: BookingField,
    ride_type: RideType,
    distance_km: f64,
    recent: Vec<Trip>,
    notice: Option<String>,
}

impl CustomerHomePage {
    pub fn new() -> Self {
        Self {
            customer_id: String::new(),
            pickup: Input::default(),
            dropoff: Input::default(),
            focus: BookingField::Pickup,
            ride_type: RideType::Economy,
            distance_km: 5.0,
            recent: Vec::new(),
            notice: None,
        }
    }

    async fn book(&mut self, ctx: &PageContext) -> PageSignal {
        let pickup = self.pickup.value().trim().to_string();
        let dropoff = self.dropoff.value().trim().to_string();
        if pickup.is_empty() || dropoff.is_empty() {
            self.notice = Some("pickup and dropoff are both required".to_string());
            return PageSignal::Redraw;
        }

        let request = NewTrip::requested(
            self.customer_id.clone(),
            pickup,
            dropoff,
            self.ride_type,
            self.distance_km,
        );
        match ctx.services.trips.create(&request).await {
            Ok(trip) => PageSignal::Navigate(format!("/tracking/{}", trip.id)),
            Err(err) => {
                self.notice = Some(format!("booking failed: {err}"));
                PageSignal::Redraw
            }
        }
    }

    async fn refresh(&mut self, ctx: &PageContext) {
        match ctx.services.trips.trips_for_customer(&self.customer_id).await {
            Ok(trips) => {
                self.recent = trips;
                self.notice = None;
            }
            Err(err) => self.notice = Some(format!("could not load trips: {err}")),
        }
    }
}

#[async_trait]
impl Page for CustomerHomePage {
    fn kind(&self) -> PageKind {
        PageKind::CustomerHome
    }

    async fn init(&mut self, ctx: &PageContext) -> AppResult<()> {
        let principal = ctx
            .services
            .auth
            .current_principal()
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        self.customer_id = principal.id;
        self.recent = ctx
            .services
            .trips
            .trips_for_customer(&self.customer_id)
            .await?;
        Ok(())
    }

    fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(1)])
            .split(area);

        let form = Block::default()
            .title(" Book a ride ")
            .borders(Borders::ALL);
        let form_inner = form.inner(chunks[0]);
        frame.render_widget(form, chunks[0]);

        let fare = estimate_fare(self.ride_type, self.distance_km);
        let lines = vec![
            input_line("Pickup: ", &self.pickup, self.focus == BookingField::Pickup),
            input_line("Dropoff:", &self.dropoff, self.focus == BookingField::Dropoff),
            Line::from(format!(
                "Ride type: {}   Distance: {:.1} km   Estimated fare: {:.2}",
                self.ride_type.as_str(),
                self.distance_km,
                fare
            )),
            notice_line(&self.notice),
            hint_line("Tab: switch field   Ctrl+T: ride type   PgUp/PgDn: distance   Enter: book"),
        ];
        frame.render_widget(Paragraph::new(lines), form_inner);

        let history = Block::default()
            .title(" Recent trips ")
            .borders(Borders::ALL);
        let history_inner = history.inner(chunks[1]);
        frame.render_widget(history, chunks[1]);

        let mut rows: Vec<Line> = Vec::new();
        if self.recent.is_empty() {
            rows.push(Line::from("No trips yet."));
        }
        for trip in self.recent.iter().take(history_inner.height as usize) {
            rows.push(Line::from(format!(
                "{}  {} → {}  [{}]",
                trip.created_at.as_deref().unwrap_or("-"),
                trip.pickup_location,
                trip.dropoff_location,
                trip.status.as_str()
            )));
        }
        frame.render_widget(Paragraph::new(rows), history_inner);
    }

    async fn handle_key(&mut self, ctx: &PageContext, key: KeyEvent) -> AppResult<PageSignal> {
        match key.code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    BookingField::Pickup => BookingField::Dropoff,
                    BookingField::Dropoff => BookingField::Pickup,
                };
                Ok(PageSignal::Redraw)
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.ride_type = self.ride_type.cycle();
                Ok(PageSignal::Redraw)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh(ctx).await;
                Ok(PageSignal::Redraw)
            }
            KeyCode::PageUp => {
                self.distance_km += DISTANCE_STEP_KM;
                Ok(PageSignal::Redraw)
            }
            KeyCode::PageDown => {
                self.distance_km = (self.distance_km - DISTANCE_STEP_KM).max(MIN_DISTANCE_KM);
                Ok(PageSignal::Redraw)
            }
            KeyCode::Enter => Ok(self.book(ctx).await),
            _ => {
                let field = match self.focus {
                    BookingField::Pickup => &mut self.pickup,
                    BookingField::Dropoff => &mut self.dropoff,
                };
                if field.handle_event(&Event::Key(key)).is_some() {
                    Ok(PageSignal::Redraw)
                } else {
                    Ok(PageSignal::Ignored)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerHomePage, MIN_DISTANCE_KM};

    #[test]
    fn distance_defaults_above_the_minimum() {
        let page = CustomerHomePage::new();
        assert!(page.distance_km >= MIN_DISTANCE_KM);
        assert!(page.recent.is_empty());
    }
}
