//! Main TUI application state and logic

use crate::replay::{Replay, ReplayError};
use crate::ui::panes::{
    render_bindings_pane, render_heap_pane, render_log_pane, render_source_pane,
    render_status_bar, HeapScrollState, SourceScrollState, StatusRenderData,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Log,
    Bindings,
    Heap,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> log -> bindings -> heap)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Log,
            FocusedPane::Log => FocusedPane::Bindings,
            FocusedPane::Bindings => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Heap,
            FocusedPane::Log => FocusedPane::Source,
            FocusedPane::Bindings => FocusedPane::Log,
            FocusedPane::Heap => FocusedPane::Bindings,
        }
    }
}

/// The main application state
pub struct App {
    /// The finished replay being inspected
    pub replay: Replay,

    /// The script text, for the source pane
    pub source: String,

    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub bindings_scroll: usize,
    pub heap_scroll: HeapScrollState,
    pub log_scroll: usize,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    pub fn new(replay: Replay, source: String) -> Self {
        let status_message = match replay.error() {
            Some(err) => format!("Replay stopped: {}", err),
            None => String::from("Ready!"),
        };

        App {
            replay,
            source,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::new(),
            bindings_scroll: 0,
            heap_scroll: HeapScrollState::default(),
            log_scroll: usize::MAX,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(500) {
                if self.replay.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.log_scroll = usize::MAX;
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// The replay stopped with an error and the failing statement is on screen
    fn showing_error(&self) -> bool {
        self.replay.error().is_some()
            && self.replay.history_position() + 1 == self.replay.total_snapshots()
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // 4 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Log (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        // Right column: Bindings (top) | Heap (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
            .split(columns[1]);

        let is_error = self.showing_error();
        let snapshot = self.replay.current();

        render_source_pane(
            frame,
            left_rows[0],
            &self.source,
            self.replay.current_location().line,
            is_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        render_log_pane(
            frame,
            left_rows[1],
            snapshot.map(|s| &s.log),
            self.focused_pane == FocusedPane::Log,
            &mut self.log_scroll,
        );

        render_bindings_pane(
            frame,
            right_rows[0],
            snapshot,
            self.focused_pane == FocusedPane::Bindings,
            &mut self.bindings_scroll,
        );

        render_heap_pane(
            frame,
            right_rows[1],
            snapshot,
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                current_step: self.replay.history_position(),
                total_steps: self.replay.total_snapshots(),
                has_error: self.replay.error().is_some(),
                is_playing: self.is_playing,
            },
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let mut stepped = 0;
                for _ in 0..n {
                    if self.replay.step_forward().is_err() {
                        break;
                    }
                    stepped += 1;
                }
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.log_scroll = usize::MAX;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                let result = self.replay.step_backward();
                self.report_step(result, "Stepped backward", "Cannot step backward");
            }
            KeyCode::Right => {
                self.is_playing = false;
                let result = self.replay.step_forward();
                self.report_step(result, "Stepped forward", "Cannot step forward");
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Bindings => {
                    self.bindings_scroll = self.bindings_scroll.saturating_sub(1);
                }
                FocusedPane::Heap => {
                    self.heap_scroll.offset = self.heap_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Log => {
                    self.log_scroll = self.log_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Bindings => {
                    self.bindings_scroll = self.bindings_scroll.saturating_add(1);
                }
                FocusedPane::Heap => {
                    self.heap_scroll.offset = self.heap_scroll.offset.saturating_add(1);
                }
                FocusedPane::Log => {
                    self.log_scroll = self.log_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                // Toggle auto-play (200ms debounce against key repeat)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or(Instant::now());
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                let _ = self.replay.jump_to_end();
                self.status_message = match self.replay.error() {
                    Some(err) => format!("Jumped to end: {}", err),
                    None => "Jumped to end".to_string(),
                };
                self.log_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                let _ = self.replay.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
                self.log_scroll = usize::MAX;
            }
            _ => {}
        }
    }

    fn report_step(&mut self, result: Result<(), ReplayError>, done: &str, refused: &str) {
        match result {
            Ok(()) => {
                self.status_message = done.to_string();
                self.log_scroll = usize::MAX;
            }
            Err(ReplayError::History { message }) => {
                self.status_message = format!("{}: {}", refused, message);
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
            }
        }
    }
}
