use ratatui::Frame;
use ratatui::style::Style;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthChar;

use crate::app::AppState;
use crate::router::Lifecycle;

use super::layout::UiLayout;

pub fn draw_chrome(
    frame: &mut Frame<'_>,
    layout: UiLayout,
    state: &AppState,
    title: Option<&str>,
    path: Option<&str>,
    lifecycle: Lifecycle,
) {
    let principal = state
        .principal
        .as_ref()
        .map(|p| p.phone.clone().unwrap_or_else(|| p.id.clone()))
        .unwrap_or_else(|| "signed out".to_string());
    let lifecycle = match lifecycle {
        Lifecycle::Idle => "idle",
        Lifecycle::Loading => "loading",
        Lifecycle::Mounted => "ready",
    };

    let status_text = truncate_to_width(
        &format!(
            "hail | {} | {} | {} | {} | Ctrl+C quit, Alt+←/→ history, Ctrl+O sign out",
            title.unwrap_or("-"),
            path.unwrap_or("-"),
            principal,
            lifecycle
        ),
        layout.status.width as usize,
    );

    frame.render_widget(
        Paragraph::new(status_text).style(Style::default()),
        layout.status,
    );
}

/// Cuts at a display-cell boundary rather than a char count, so wide glyphs
/// in location names cannot overflow the bar.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out
}
