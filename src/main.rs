// guestheap: replay a heap trace script and inspect the guest heap

use std::fs;
use std::io;
use std::process;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use guestheap::config::{Options, USAGE};
use guestheap::memory::{Hex, LinearMemory};
use guestheap::replay::Replay;
use guestheap::script::Parser;
use guestheap::ui::App;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    init_logging(options.verbose);

    let script_path = &options.script_path;
    if !script_path.exists() {
        eprintln!("Error: File '{}' not found", script_path.display());
        process::exit(1);
    }

    let source = fs::read_to_string(script_path)?;

    eprintln!("Parsing {}...", script_path.display());
    let script = match Parser::new(&source).and_then(|mut parser| parser.parse_script()) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };
    eprintln!("Parsed successfully. Found {} statement(s).", script.len());

    let memory = LinearMemory::new(options.region);
    let mut replay = Replay::new(script, memory, options.snapshot_limit)?;

    eprintln!("Replaying...");
    match replay.run() {
        Ok(()) => {
            eprintln!("Replay completed successfully.");
            eprintln!("Total snapshots: {}", replay.total_snapshots());
        }
        Err(e) => {
            eprintln!("Replay error: {}", e);
            if !options.summary {
                eprintln!("Entering TUI with partial history...");
            }
        }
    }

    if options.summary {
        print_summary(&replay);
        return Ok(());
    }

    if let Err(e) = replay.rewind_to_start() {
        eprintln!("Warning: Failed to rewind to start: {}", e);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(replay, source);
    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` when set
fn init_logging(verbose: bool) {
    let default = if verbose {
        "guestheap=debug"
    } else {
        "guestheap=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(replay: &Replay) {
    let heap = replay.heap();
    let stats = heap.stats();

    println!("{:<12} {:>10}  {:<5} chain", "address", "size", "state");
    for block in heap.space().blocks().iter() {
        let chain = block
            .chain_next
            .map(|next| Hex(next).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>10}  {:<5} {}",
            Hex(block.address).to_string(),
            block.size,
            if block.occupied { "used" } else { "free" },
            chain
        );
    }
    println!();
    println!(
        "blocks: {} ({} used), used: {} B, free: {} B",
        stats.blocks, stats.occupied_blocks, stats.occupied_bytes, stats.free_bytes
    );
    println!(
        "cursor: {}, heap end: {}, headroom: {} B",
        Hex(stats.bump_cursor),
        Hex(stats.heap_end),
        stats.headroom
    );
    let (used, limit) = replay.snapshot_memory();
    println!(
        "history: {} snapshot(s), {} of {} B",
        replay.total_snapshots(),
        used,
        limit
    );

    let mut names: Vec<_> = replay.bindings().iter().collect();
    names.sort();
    if !names.is_empty() {
        println!();
        for (name, address) in names {
            println!("{} = {}", name, Hex(*address));
        }
    }

    for line in replay.log().lines.iter() {
        if line.level != guestheap::snapshot::LogLevel::Info {
            eprintln!("line {}: {}", line.location.line, line.text);
        }
    }
}
