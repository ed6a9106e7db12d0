use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::backend::Subscription;
use crate::error::{AppError, AppResult};
use crate::event::TripEvent;
use crate::services::auth::{Role, UserProfile};
use crate::services::trip::{Trip, TripStats};
use crate::services::vehicle::{NewVehicle, Vehicle};

use super::{Page, PageContext, PageKind, PageSignal, hint_line, input_line, notice_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterField {
    Make,
    Model,
    Plate,
}

impl RegisterField {
    fn next(self) -> Self {
        match self {
            Self::Make => Self::Model,
            Self::Model => Self::Plate,
            Self::Plate => Self::Make,
        }
    }
}

/// Driver home: open requests with a live feed, online toggle and trip
/// statistics; the register route swaps the request list for the vehicle
/// registration form.
pub struct DriverDashboardPage {
    register_view: bool,
    driver_id: String,
    profile: Option<UserProfile>,
    vehicles: Vec<Vehicle>,
    available: Vec<Trip>,
    stats: Option<TripStats>,
    selected: usize,
    feed: Option<Subscription>,
    make: Input,
    model: Input,
    plate: Input,
    reg_focus: RegisterField,
    notice: Option<String>,
}

impl DriverDashboardPage {
    pub fn new(register_view: bool) -> Self {
        Self {
            register_view,
            driver_id: String::new(),
            profile: None,
            vehicles: Vec::new(),
            available: Vec::new(),
            stats: None,
            selected: 0,
            feed: None,
            make: Input::default(),
            model: Input::default(),
            plate: Input::default(),
            reg_focus: RegisterField::Make,
            notice: None,
        }
    }

    async fn toggle_online(&mut self, ctx: &PageContext) {
        let online = self.profile.as_ref().is_some_and(|p| p.is_online);
        match ctx.services.auth.set_online(&self.driver_id, !online).await {
            Ok(profile) => {
                self.notice = Some(if profile.is_online {
                    "you are online and visible to customers".to_string()
                } else {
                    "you are offline".to_string()
                });
                self.profile = Some(profile);
            }
            Err(err) => self.notice = Some(format!("could not update status: {err}")),
        }
    }

    async fn refresh_available(&mut self, ctx: &PageContext) {
        match ctx.services.trips.available().await {
            Ok(trips) => {
                self.available = trips;
                self.clamp_selection();
            }
            Err(err) => self.notice = Some(format!("could not load requests: {err}")),
        }
    }

    async fn accept_selected(&mut self, ctx: &PageContext) -> PageSignal {
        let Some(trip) = self.available.get(self.selected) else {
            self.notice = Some("no request selected".to_string());
            return PageSignal::Redraw;
        };

        match ctx.services.trips.accept(&trip.id, &self.driver_id).await {
            Ok(accepted) => PageSignal::Navigate(format!("/tracking/{}", accepted.id)),
            Err(err) => {
                self.notice = Some(format!("could not accept request: {err}"));
                PageSignal::Redraw
            }
        }
    }

    async fn register_vehicle(&mut self, ctx: &PageContext) {
        let make = self.make.value().trim().to_string();
        let model = self.model.value().trim().to_string();
        let plate = self.plate.value().trim().to_string();
        if make.is_empty() || model.is_empty() || plate.is_empty() {
            self.notice = Some("make, model and plate are all required".to_string());
            return;
        }

        let vehicle = NewVehicle::pending(self.driver_id.clone(), make, model, plate);
        match ctx.services.vehicles.register(&vehicle).await {
            Ok(registered) => {
                self.notice = Some(format!(
                    "vehicle {} registered, pending verification",
                    registered.plate_number
                ));
                self.make = Input::default();
                self.model = Input::default();
                self.plate = Input::default();
                if let Ok(vehicles) = ctx
                    .services
                    .vehicles
                    .vehicles_for_driver(&self.driver_id)
                    .await
                {
                    self.vehicles = vehicles;
                }
            }
            Err(err) => self.notice = Some(format!("registration failed: {err}")),
        }
    }

    fn clamp_selection(&mut self) {
        if self.available.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.available.len() {
            self.selected = self.available.len() - 1;
        }
    }

    fn render_dashboard(&self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let summary = Block::default()
            .title(" Driver dashboard ")
            .borders(Borders::ALL);
        let summary_inner = summary.inner(chunks[0]);
        frame.render_widget(summary, chunks[0]);

        let online = self.profile.as_ref().is_some_and(|p| p.is_online);
        let stats = self.stats.clone().unwrap_or_default();
        let lines = vec![
            Line::from(format!(
                "Status: {}   Vehicles: {}   Completed: {}   Revenue: {:.2}   Distance: {:.1} km",
                if online { "online" } else { "offline" },
                self.vehicles.len(),
                stats.total_trips,
                stats.total_revenue,
                stats.total_distance
            )),
            notice_line(&self.notice),
        ];
        frame.render_widget(Paragraph::new(lines), summary_inner);

        let list = Block::default()
            .title(" Open requests ")
            .borders(Borders::ALL);
        let list_inner = list.inner(chunks[1]);
        frame.render_widget(list, chunks[1]);

        let mut rows: Vec<Line> = Vec::new();
        if self.available.is_empty() {
            rows.push(Line::from("No open requests."));
        }
        for (idx, trip) in self
            .available
            .iter()
            .take((list_inner.height as usize).saturating_sub(1))
            .enumerate()
        {
            let marker = if idx == self.selected { "┃ " } else { "  " };
            rows.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::White)),
                Span::raw(format!(
                    "{} → {}  {:.1} km  est {:.2}  [{}]",
                    trip.pickup_location,
                    trip.dropoff_location,
                    trip.distance.unwrap_or(0.0),
                    trip.estimated_cost.unwrap_or(0.0),
                    trip.ride_type.as_str()
                )),
            ]));
        }
        rows.push(hint_line("↑/↓: select   Enter: accept   o: toggle online   r: refresh"));
        frame.render_widget(Paragraph::new(rows), list_inner);
    }

    fn render_register(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(" Register a vehicle ")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = vec![
            input_line("Make: ", &self.make, self.reg_focus == RegisterField::Make),
            input_line("Model:", &self.model, self.reg_focus == RegisterField::Model),
            input_line("Plate:", &self.plate, self.reg_focus == RegisterField::Plate),
            notice_line(&self.notice),
            hint_line("Tab: next field   Enter: register"),
            Line::from(""),
        ];
        if self.vehicles.is_empty() {
            lines.push(Line::from("No vehicles registered yet."));
        }
        for vehicle in &self.vehicles {
            lines.push(Line::from(format!(
                "{} {}  {}  [{}]",
                vehicle.make, vehicle.model, vehicle.plate_number, vehicle.status
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[async_trait]
impl Page for DriverDashboardPage {
    fn kind(&self) -> PageKind {
        PageKind::DriverDashboard
    }

    async fn init(&mut self, ctx: &PageContext) -> AppResult<()> {
        let principal = ctx
            .services
            .auth
            .current_principal()
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        self.driver_id = principal.id;

        self.profile = ctx.services.auth.profile(&self.driver_id).await?;
        self.vehicles = ctx
            .services
            .vehicles
            .vehicles_for_driver(&self.driver_id)
            .await?;
        self.stats = Some(
            ctx.services
                .trips
                .statistics(&self.driver_id, Role::Driver)
                .await?,
        );

        if !self.register_view {
            self.available = ctx.services.trips.available().await?;
            self.feed = Some(
                ctx.services
                    .trips
                    .subscribe_available(ctx.trip_sender()),
            );
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.unsubscribe();
        }
    }

    fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        if self.register_view {
            self.render_register(frame, area);
        } else {
            self.render_dashboard(frame, area);
        }
    }

    async fn handle_key(&mut self, ctx: &PageContext, key: KeyEvent) -> AppResult<PageSignal> {
        if self.register_view {
            return match key.code {
                KeyCode::Tab => {
                    self.reg_focus = self.reg_focus.next();
                    Ok(PageSignal::Redraw)
                }
                KeyCode::Enter => {
                    self.register_vehicle(ctx).await;
                    Ok(PageSignal::Redraw)
                }
                _ => {
                    let field = match self.reg_focus {
                        RegisterField::Make => &mut self.make,
                        RegisterField::Model => &mut self.model,
                        RegisterField::Plate => &mut self.plate,
                    };
                    if field.handle_event(&Event::Key(key)).is_some() {
                        Ok(PageSignal::Redraw)
                    } else {
                        Ok(PageSignal::Ignored)
                    }
                }
            };
        }

        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                Ok(PageSignal::Redraw)
            }
            KeyCode::Down => {
                self.selected = self.selected.saturating_add(1);
                self.clamp_selection();
                Ok(PageSignal::Redraw)
            }
            KeyCode::Enter => Ok(self.accept_selected(ctx).await),
            KeyCode::Char('o') if key.modifiers == KeyModifiers::NONE => {
                self.toggle_online(ctx).await;
                Ok(PageSignal::Redraw)
            }
            KeyCode::Char('r') if key.modifiers == KeyModifiers::NONE => {
                self.refresh_available(ctx).await;
                Ok(PageSignal::Redraw)
            }
            _ => Ok(PageSignal::Ignored),
        }
    }

    fn on_trip_event(&mut self, event: &TripEvent) -> bool {
        match event {
            TripEvent::Available(trips) if !self.register_view => {
                self.available = trips.clone();
                self.clamp_selection();
                true
            }
            _ => false,
        }
    }
}
