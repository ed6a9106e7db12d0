use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::{Toast, ToastKind};

use super::layout::centered_rect;

pub fn draw_loading_overlay(frame: &mut Frame<'_>, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let popup_width = area.width.min(30);
    let popup_height = area.height.min(3);
    let popup = centered_rect(area, popup_width, popup_height);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title("Loading")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let message = Paragraph::new("Loading...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(message, inner);
}

pub fn draw_toast_overlay(frame: &mut Frame<'_>, area: Rect, toast: &Toast) {
    if area.width < 4 || area.height < 3 {
        return;
    }

    let width = (toast.text.len() as u16 + 4).min(area.width);
    let popup = Rect::new(area.x + area.width - width, area.y, width, 3);
    frame.render_widget(Clear, popup);

    let color = match toast.kind {
        ToastKind::Info => Color::Blue,
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    if inner.width == 0 || inner.height == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(toast.text.as_str()).alignment(Alignment::Center),
        inner,
    );
}
