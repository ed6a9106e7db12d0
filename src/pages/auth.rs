use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::error::AppResult;
use crate::event::SessionEvent;
use crate::services::auth::{NewUserProfile, Role};

use super::{Page, PageContext, PageKind, PageSignal, hint_line, input_line, notice_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStep {
    Phone,
    Code,
}

/// Phone/OTP sign-in. A first-time sign-in also creates the user profile
/// with the role selected on this page.
pub struct AuthPage {
    step: AuthStep,
    phone: Input,
    code: Input,
    role: Role,
    notice: Option<String>,
}

impl AuthPage {
    pub fn new() -> Self {
        Self {
            step: AuthStep::Phone,
            phone: Input::default(),
            code: Input::default(),
            role: Role::Customer,
            notice: None,
        }
    }

    async fn submit_phone(&mut self, ctx: &PageContext) -> PageSignal {
        let phone = self.phone.value().trim().to_string();
        if phone.is_empty() {
            self.notice = Some("enter a phone number first".to_string());
            return PageSignal::Redraw;
        }

        match ctx.services.auth.sign_in_with_phone(&phone).await {
            Ok(()) => {
                self.step = AuthStep::Code;
                self.notice = Some(format!("one-time code sent to {phone}"));
            }
            Err(err) => self.notice = Some(format!("could not send code: {err}")),
        }
        PageSignal::Redraw
    }

    async fn submit_code(&mut self, ctx: &PageContext) -> AppResult<PageSignal> {
        let phone = self.phone.value().trim().to_string();
        let code = self.code.value().trim().to_string();
        if code.is_empty() {
            self.notice = Some("enter the code you received".to_string());
            return Ok(PageSignal::Redraw);
        }

        let principal = match ctx.services.auth.verify_otp(&phone, &code).await {
            Ok(principal) => principal,
            Err(err) => {
                self.notice = Some(format!("verification failed: {err}"));
                return Ok(PageSignal::Redraw);
            }
        };

        let role = match ctx.services.auth.profile(&principal.id).await? {
            Some(profile) => profile.role,
            None => {
                let profile = NewUserProfile::active(
                    principal.id.clone(),
                    phone,
                    self.role,
                    String::new(),
                );
                ctx.services.auth.create_profile(&profile).await?.role
            }
        };

        ctx.notify_session(SessionEvent::SignedIn { principal });
        let destination = match role {
            Role::Driver => "/driver/dashboard",
            Role::Customer => "/customer",
        };
        Ok(PageSignal::Navigate(destination.to_string()))
    }
}

#[async_trait]
impl Page for AuthPage {
    fn kind(&self) -> PageKind {
        PageKind::Auth
    }

    async fn init(&mut self, _ctx: &PageContext) -> AppResult<()> {
        Ok(())
    }

    fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(" Sign in ")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = vec![
            Line::from("Sign in with your phone number."),
            Line::from(""),
            input_line("Phone:", &self.phone, self.step == AuthStep::Phone),
        ];
        if self.step == AuthStep::Code {
            lines.push(input_line("Code: ", &self.code, true));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "Account role if this phone is new: {}",
            self.role.as_str()
        )));
        lines.push(notice_line(&self.notice));
        lines.push(hint_line(match self.step {
            AuthStep::Phone => "Enter: request code   ↑/↓: switch role",
            AuthStep::Code => "Enter: verify   Esc: change number   ↑/↓: switch role",
        }));

        frame.render_widget(Paragraph::new(lines), inner);
    }

    async fn handle_key(&mut self, ctx: &PageContext, key: KeyEvent) -> AppResult<PageSignal> {
        match key.code {
            KeyCode::Enter => match self.step {
                AuthStep::Phone => Ok(self.submit_phone(ctx).await),
                AuthStep::Code => self.submit_code(ctx).await,
            },
            KeyCode::Esc if self.step == AuthStep::Code => {
                self.step = AuthStep::Phone;
                self.code = Input::default();
                self.notice = None;
                Ok(PageSignal::Redraw)
            }
            KeyCode::Up | KeyCode::Down => {
                self.role = match self.role {
                    Role::Customer => Role::Driver,
                    Role::Driver => Role::Customer,
                };
                Ok(PageSignal::Redraw)
            }
            _ => {
                let field = match self.step {
                    AuthStep::Phone => &mut self.phone,
                    AuthStep::Code => &mut self.code,
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
    use super::{AuthPage, AuthStep};
    use crate::services::auth::Role;

    #[test]
    fn starts_on_the_phone_step_as_customer() {
        let page = AuthPage::new();
        assert_eq!(page.step, AuthStep::Phone);
        assert_eq!(page.role, Role::Customer);
        assert!(page.phone.value().is_empty());
    }
}
