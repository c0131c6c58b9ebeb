//! Helpers shared by the panes

use crate::memory::Address;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
};

pub(crate) fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Rows inside a bordered pane, at least 1
pub(crate) fn visible_height(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

/// Clamp `offset` so the last page of `total_items` stays filled
pub(crate) fn clamp_scroll(offset: &mut usize, total_items: usize, visible_height: usize) {
    if total_items > visible_height {
        *offset = (*offset).min(total_items - visible_height);
    } else {
        *offset = 0;
    }
}

/// Hex dump rows of `bytes` starting at `address`, `bytes_per_line` per row
pub(crate) fn hex_dump(address: Address, bytes: &[u8], bytes_per_line: usize) -> Vec<String> {
    let bytes_per_line = bytes_per_line.max(1);
    bytes
        .chunks(bytes_per_line)
        .enumerate()
        .map(|(row, chunk)| {
            let row_address = address as u64 + (row * bytes_per_line) as u64;
            let mut line = format!("  0x{:08x}: ", row_address);
            for byte in chunk {
                line.push_str(&format!("{:02x} ", byte));
            }
            line
        })
        .collect()
}
