//! Bindings pane: names assigned by the script and what they point at

use super::utils::{border_style, clamp_scroll, visible_height};
use crate::memory::Hex;
use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding},
    Frame,
};

/// Render the bindings pane
///
/// Each row is `name = address`, followed by the size and state of the block
/// at that address, or `NULL` when the allocation failed.
pub fn render_bindings_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Bindings ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused))
        .padding(Padding::new(1, 0, 0, 0));

    let mut bindings: Vec<_> = snapshot
        .map(|s| s.bindings.iter().collect())
        .unwrap_or_default();
    bindings.sort_by(|a, b| a.0.cmp(b.0));

    if bindings.is_empty() {
        let list = List::new(vec![
            ListItem::new("(no bindings)").style(Style::default().fg(DEFAULT_THEME.comment))
        ])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    let name_width = bindings.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let all_items: Vec<ListItem> = bindings
        .into_iter()
        .map(|(name, &address)| {
            let mut spans = vec![
                Span::styled(
                    format!("{:<width$}", name, width = name_width),
                    Style::default().fg(DEFAULT_THEME.name),
                ),
                Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
            ];

            let heap_block = snapshot.and_then(|s| s.blocks.get(address));
            match heap_block {
                _ if address == 0 => {
                    spans.push(Span::styled("NULL", Style::default().fg(DEFAULT_THEME.error)));
                }
                Some(heap_block) => {
                    spans.push(Span::styled(
                        Hex(address).to_string(),
                        Style::default().fg(DEFAULT_THEME.fg),
                    ));
                    let (state, color) = if heap_block.occupied {
                        ("used", DEFAULT_THEME.success)
                    } else {
                        ("freed", DEFAULT_THEME.warning)
                    };
                    spans.push(Span::styled(
                        format!("  {} B ", heap_block.size),
                        Style::default().fg(DEFAULT_THEME.primary),
                    ));
                    spans.push(Span::styled(state, Style::default().fg(color)));
                }
                None => {
                    spans.push(Span::styled(
                        Hex(address).to_string(),
                        Style::default().fg(DEFAULT_THEME.fg),
                    ));
                    spans.push(Span::styled(
                        "  (no block)",
                        Style::default().fg(DEFAULT_THEME.comment),
                    ));
                }
            }

            ListItem::new(Line::from(spans))
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
