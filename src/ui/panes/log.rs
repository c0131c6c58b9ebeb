//! Event log pane rendering

use super::utils::{border_style, clamp_scroll, visible_height};
use crate::snapshot::{EventLog, LogLevel};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the event log pane
pub fn render_log_pane(
    frame: &mut Frame,
    area: Rect,
    log: Option<&EventLog>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Event Log ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let lines = log.map(|log| log.lines.as_slice()).unwrap_or_default();

    if lines.is_empty() {
        let paragraph = Paragraph::new("(no events)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let all_items: Vec<ListItem> = lines
        .iter()
        .map(|line| {
            let (color, marker) = match line.level {
                LogLevel::Info => (DEFAULT_THEME.fg, "  "),
                LogLevel::Warn => (DEFAULT_THEME.warning, "! "),
                LogLevel::Error => (DEFAULT_THEME.error, "✗ "),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:4} ", line.location.line),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(marker, Style::default().fg(color)),
                Span::styled(line.text.as_str(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let visible_height = visible_height(area);
    clamp_scroll(scroll_offset, all_items.len(), visible_height);

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
