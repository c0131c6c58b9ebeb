// Integration tests for trace script replay

use guestheap::errors::{HeapError, HostError};
use guestheap::memory::{LinearMemory, RegionConfig};
use guestheap::replay::{Replay, ReplayError};
use guestheap::script::parse_script;
use guestheap::snapshot::LogLevel;

const SNAPSHOT_LIMIT: usize = 1024 * 1024 * 100; // 100MB

fn replay(source: &str) -> Replay {
    replay_with(source, RegionConfig::default())
}

fn replay_with(source: &str, config: RegionConfig) -> Replay {
    let script = parse_script(source).expect("Parsing failed");
    Replay::new(script, LinearMemory::new(config), SNAPSHOT_LIMIT).expect("Bind failed")
}

fn tiny_config() -> RegionConfig {
    RegionConfig {
        page_size: 64,
        initial_pages: 1,
        max_pages: 1,
        heap_base: 8,
    }
}

#[test]
fn test_simple_script() {
    let source = r#"
        p = malloc 10
        write p 1 2 3
        q = realloc p 32
        free q
        free null
    "#;

    let mut replay = replay(source);
    let result = replay.run();
    assert!(result.is_ok(), "Replay failed: {:?}", result);

    // Initial snapshot plus one per statement
    assert_eq!(replay.total_snapshots(), 6);
    assert!(replay.is_finished());
    assert_eq!(replay.bindings()["p"], 1024);
    assert_eq!(replay.bindings()["q"], 1040);

    let heap = replay.heap();
    assert_eq!(heap.stats().blocks, 2);
    assert_eq!(heap.stats().occupied_blocks, 0);
    assert_eq!(heap.read(1040, 3).unwrap(), &[1, 2, 3]);

    assert_eq!(replay.log().count(LogLevel::Warn), 1);
    assert_eq!(replay.log().count(LogLevel::Error), 0);
    assert_eq!(replay.log().get_output()[0], "p = malloc 10 -> 0x00000400");
}

#[test]
fn test_snapshots_capture_each_step() {
    let source = "p = malloc 4\nwrite p 9 9\nfree p\n";

    let mut replay = replay(source);
    replay.run().unwrap();
    replay.rewind_to_start().unwrap();

    let initial = replay.current().unwrap();
    assert_eq!(initial.statement_index, None);
    assert!(initial.blocks.is_empty());
    assert!(initial.bindings.is_empty());

    replay.step_forward().unwrap();
    let after_malloc = replay.current().unwrap();
    assert_eq!(after_malloc.statement_index, Some(0));
    assert_eq!(after_malloc.last_result, Some(1024));
    assert_eq!(after_malloc.source_location.line, 1);
    assert_eq!(after_malloc.names_for(1024), vec!["p"]);

    replay.step_forward().unwrap();
    let after_write = replay.current().unwrap();
    let block = after_write.blocks.get(1024).unwrap();
    assert_eq!(&after_write.block_bytes(block)[..3], &[9, 9, 0]);
    assert!(block.occupied);

    replay.step_forward().unwrap();
    let after_free = replay.current().unwrap();
    assert!(!after_free.blocks.get(1024).unwrap().occupied);
    // Earlier snapshots are unaffected
    replay.step_backward().unwrap();
    assert!(replay.current().unwrap().blocks.get(1024).unwrap().occupied);
}

#[test]
fn test_history_navigation_bounds() {
    let mut replay = replay("p = malloc 8\nfree p\n");
    replay.run().unwrap();

    assert_eq!(replay.history_position(), 2);
    assert!(matches!(
        replay.step_forward(),
        Err(ReplayError::History { .. })
    ));

    replay.rewind_to_start().unwrap();
    assert!(matches!(
        replay.step_backward(),
        Err(ReplayError::History { .. })
    ));

    replay.jump_to_end().unwrap();
    assert_eq!(replay.history_position(), 2);
    assert_eq!(replay.current_location().line, 2);
}

#[test]
fn test_run_twice_is_rejected() {
    let mut replay = replay("p = malloc 8\n");
    replay.run().unwrap();

    assert!(matches!(replay.run(), Err(ReplayError::History { .. })));
    assert_eq!(replay.total_snapshots(), 2);
}

#[test]
fn test_undefined_name_stops_replay() {
    let source = "p = malloc 8\nfree q\np = malloc 8\n";

    let mut replay = replay(source);
    let result = replay.run();

    match result {
        Err(ReplayError::UndefinedName { name, location }) => {
            assert_eq!(name, "q");
            assert_eq!(location.line, 2);
        }
        other => panic!("Expected undefined name error, got {:?}", other),
    }

    // Partial history up to and including the failing statement
    assert_eq!(replay.total_snapshots(), 3);
    assert!(replay.error().is_some());
    assert_eq!(replay.heap().stats().blocks, 1);
    assert_eq!(replay.log().count(LogLevel::Error), 1);
}

#[test]
fn test_exhaustion_binds_null() {
    let source = "p = malloc 1000\nfree p\nq = malloc 16\n";

    let mut replay = replay_with(source, tiny_config());
    replay.run().unwrap();

    assert_eq!(replay.bindings()["p"], 0);
    assert_eq!(replay.bindings()["q"], 8);

    let output = replay.log().get_output();
    assert_eq!(output[0], "p = malloc 1000 -> NULL");
    assert!(output[1].starts_with("exhausted:"), "got {:?}", output[1]);
    assert!(output[3].starts_with("null-free:"), "got {:?}", output[3]);
    assert_eq!(replay.log().count(LogLevel::Error), 1);
    assert_eq!(replay.log().count(LogLevel::Warn), 1);
}

#[test]
fn test_linked_pair_reuse_in_script() {
    let source = r#"
        a = malloc 8
        b = malloc 8
        link a b
        free a
        c = malloc 16
    "#;

    let mut replay = replay(source);
    replay.run().unwrap();

    assert_eq!(replay.bindings()["c"], replay.bindings()["a"]);
    assert_eq!(replay.heap().stats().occupied_blocks, 2);
    assert_eq!(replay.heap().space().bump_cursor(), 1040);
}

#[test]
fn test_link_rejects_gap() {
    let source = "a = malloc 8\nb = malloc 8\nc = malloc 8\nlink a c\n";

    let mut replay = replay(source);

    assert_eq!(
        replay.run(),
        Err(ReplayError::Heap {
            source: HeapError::NotAdjacent {
                first: 1024,
                first_end: 1032,
                second: 1040
            },
            location: replay.script().statements[3].location,
        })
    );
}

#[test]
fn test_write_out_of_bounds() {
    let mut replay = replay_with("write 60 1 2 3 4 5\n", tiny_config());

    assert!(matches!(
        replay.run(),
        Err(ReplayError::Heap {
            source: HeapError::OutOfBounds { .. },
            ..
        })
    ));
}

#[test]
fn test_realloc_null_allocates() {
    let mut replay = replay_with("p = realloc null 12\n", tiny_config());
    replay.run().unwrap();

    assert_eq!(replay.bindings()["p"], 8);
    assert_eq!(replay.heap().space().blocks().get(8).unwrap().size, 16);
}

#[test]
fn test_bind_rejects_null_heap_base() {
    let script = parse_script("p = malloc 8\n").unwrap();
    let config = RegionConfig {
        heap_base: 0,
        ..RegionConfig::default()
    };

    let result = Replay::new(script, LinearMemory::new(config), SNAPSHOT_LIMIT);

    assert!(matches!(
        result,
        Err(ReplayError::Bind {
            source: HeapError::NullHeapBase
        })
    ));
}

#[test]
fn test_snapshot_limit() {
    let script = parse_script("p = malloc 8\nq = malloc 8\n").unwrap();
    let mut replay = Replay::new(script, LinearMemory::new(tiny_config()), 1).unwrap();

    assert!(matches!(
        replay.run(),
        Err(ReplayError::SnapshotLimitExceeded(_))
    ));
    assert!(replay.is_finished());
    assert!(matches!(
        replay.error(),
        Some(ReplayError::SnapshotLimitExceeded(_))
    ));
    assert!(matches!(replay.run(), Err(ReplayError::History { .. })));
}

#[test]
fn test_snapshot_limit_mid_replay_is_recorded() {
    let source = "p = malloc 8\nq = malloc 8\nfree p\n";

    // Room for the initial snapshot only
    let initial = {
        let mut replay = replay_with("", tiny_config());
        replay.run().unwrap();
        replay.snapshot_memory().0
    };
    let script = parse_script(source).unwrap();
    let mut replay = Replay::new(script, LinearMemory::new(tiny_config()), initial).unwrap();

    let result = replay.run();

    assert!(matches!(result, Err(ReplayError::SnapshotLimitExceeded(_))));
    assert_eq!(replay.error(), result.err().as_ref());
    assert!(replay.is_finished());
    assert_eq!(replay.total_snapshots(), 1);
    assert_eq!(replay.snapshot_memory(), (initial, initial));
}

#[test]
fn test_statement_error_survives_full_history() {
    let source = "p = malloc 8\nfree q\n";

    // Room for the initial snapshot and the first statement
    let limit = {
        let mut replay = replay_with("p = malloc 8\n", tiny_config());
        replay.run().unwrap();
        replay.snapshot_memory().0
    };
    let script = parse_script(source).unwrap();
    let mut replay = Replay::new(script, LinearMemory::new(tiny_config()), limit).unwrap();

    let result = replay.run();

    assert!(matches!(result, Err(ReplayError::UndefinedName { .. })));
    assert!(matches!(
        replay.error(),
        Some(ReplayError::UndefinedName { .. })
    ));
    assert!(replay.is_finished());
    assert_eq!(replay.total_snapshots(), 2);
    assert_eq!(replay.log().count(LogLevel::Error), 1);
}

#[test]
fn test_host_error_variant_displays_location() {
    let err = ReplayError::Host {
        source: HostError::UnknownImport("calloc".to_string()),
        location: Default::default(),
    };
    assert!(err.to_string().contains("calloc"));
    assert!(err.location().is_some());
}
