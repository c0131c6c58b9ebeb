//! Heap pane rendering with the block table and hex dumps
//!
//! # Features
//!
//! - Every block in address order, occupied or free
//! - Chain links shown as `-> 0xADDR` on the block that owns them
//! - Names bound to a block's address, from the replay's bindings
//! - Hex dump of each block's bytes as of the snapshot
//! - A one-line summary of the heap statistics at the top
//!
//! Free blocks stay visible: the allocator never forgets a block, and the
//! dump shows what a later `malloc` would hand back.

use super::utils::{border_style, clamp_scroll, hex_dump, visible_height};
use crate::memory::Hex;
use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the heap pane
#[derive(Default)]
pub struct HeapScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    is_focused: bool,
    scroll_state: &mut HeapScrollState,
) {
    let block = Block::default()
        .title(" Guest Heap ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let mut all_items = Vec::new();

    match snapshot {
        None => all_items.push(
            ListItem::new("(no snapshot)").style(Style::default().fg(DEFAULT_THEME.comment)),
        ),
        Some(snapshot) => {
            let stats = &snapshot.stats;
            all_items.push(ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} block(s)", stats.blocks),
                    Style::default().fg(DEFAULT_THEME.primary),
                ),
                Span::styled(" | ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(
                    format!("{} B used", stats.occupied_bytes),
                    Style::default().fg(DEFAULT_THEME.success),
                ),
                Span::styled(" | ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(
                    format!("{} B free", stats.free_bytes),
                    Style::default().fg(DEFAULT_THEME.free_block),
                ),
                Span::styled(" | ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(
                    format!("cursor {} / end {}", Hex(stats.bump_cursor), Hex(stats.heap_end)),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
            ])));

            if snapshot.blocks.is_empty() {
                all_items.push(
                    ListItem::new("(no blocks)").style(Style::default().fg(DEFAULT_THEME.comment)),
                );
            }

            // Room for "  0xADDR: " plus three columns per byte
            let available_width = area.width.saturating_sub(16) as usize;
            let bytes_per_line = (available_width / 3).clamp(1, 16);

            for heap_block in snapshot.blocks.iter() {
                all_items.push(ListItem::new(""));

                let (state, state_style) = if heap_block.occupied {
                    ("used", Style::default().fg(DEFAULT_THEME.success))
                } else {
                    ("free", Style::default().fg(DEFAULT_THEME.free_block))
                };

                let mut header = vec![
                    Span::styled(
                        Hex(heap_block.address).to_string(),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ),
                    Span::raw(" | "),
                    Span::styled(
                        format!("{} bytes", heap_block.size),
                        Style::default().fg(DEFAULT_THEME.primary),
                    ),
                    Span::raw(" | "),
                    Span::styled(state, state_style.add_modifier(Modifier::BOLD)),
                ];

                if let Some(next) = heap_block.chain_next {
                    header.push(Span::styled(
                        format!(" -> {}", Hex(next)),
                        Style::default().fg(DEFAULT_THEME.chain_link),
                    ));
                }

                let names = snapshot.names_for(heap_block.address);
                if !names.is_empty() {
                    header.push(Span::raw("  "));
                    header.push(Span::styled(
                        names.join(", "),
                        Style::default().fg(DEFAULT_THEME.name),
                    ));
                }

                all_items.push(ListItem::new(Line::from(header)));

                let dump_style = if heap_block.occupied {
                    Style::default().fg(DEFAULT_THEME.fg)
                } else {
                    Style::default().fg(DEFAULT_THEME.comment)
                };
                for row in hex_dump(
                    heap_block.address,
                    snapshot.block_bytes(heap_block),
                    bytes_per_line,
                ) {
                    all_items.push(ListItem::new(row).style(dump_style));
                }
            }
        }
    }

    let total_items = all_items.len();
    let visible_height = visible_height(area);

    // Follow new blocks; otherwise keep the user's position
    if total_items > scroll_state.prev_item_count {
        scroll_state.offset = total_items.saturating_sub(visible_height);
    } else {
        clamp_scroll(&mut scroll_state.offset, total_items, visible_height);
    }
    scroll_state.prev_item_count = total_items;

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    let list = List::new(visible_items).block(block);
    frame.render_widget(list, area);
}
