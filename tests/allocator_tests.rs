// Integration tests for the allocator core and the guest boundary

use guestheap::errors::{GrowError, HeapError, HostError};
use guestheap::host::{bind, HostFunctions};
use guestheap::memory::{AllocationSpace, Diagnostic, LinearMemory, Region, RegionConfig};

/// How a [`TestRegion`] responds to `grow`
#[derive(Debug, Clone, Copy)]
enum Growth {
    /// Add this many bytes
    Bytes(u32),
    /// Fail every time
    Refuse,
    /// Report success without moving `heap_end`
    Stall,
}

/// A region with a hand-picked heap base and growth behaviour
#[derive(Debug, Clone)]
struct TestRegion {
    data: Vec<u8>,
    heap_base: u32,
    heap_end: u32,
    growth: Growth,
    grow_calls: usize,
}

impl TestRegion {
    fn new(heap_base: u32, size: u32, growth: Growth) -> Self {
        TestRegion {
            data: vec![0; size as usize],
            heap_base,
            heap_end: size,
            growth,
            grow_calls: 0,
        }
    }
}

impl Region for TestRegion {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn heap_base(&self) -> u32 {
        self.heap_base
    }

    fn heap_end(&self) -> u32 {
        self.heap_end
    }

    fn grow(&mut self) -> Result<(), GrowError> {
        self.grow_calls += 1;
        match self.growth {
            Growth::Bytes(n) => {
                let new_len = self.data.len() + n as usize;
                self.data.resize(new_len, 0);
                self.heap_end = new_len as u32;
                Ok(())
            }
            Growth::Refuse => Err(GrowError::Refused("host out of memory".to_string())),
            Growth::Stall => Ok(()),
        }
    }
}

fn small_memory() -> LinearMemory {
    LinearMemory::new(RegionConfig {
        page_size: 64,
        initial_pages: 1,
        max_pages: 4,
        heap_base: 8,
    })
}

// ========== Allocator core ==========

#[test]
fn test_malloc_rounds_up_from_heap_base_zero() {
    let mut space = AllocationSpace::new(TestRegion::new(0, 64, Growth::Bytes(64))).unwrap();

    assert_eq!(space.malloc(10), Some(0));
    assert_eq!(space.bump_cursor(), 16);
    assert_eq!(space.blocks().get(0).unwrap().size, 16);
}

#[test]
fn test_freed_block_is_reused_without_growth() {
    let mut space = AllocationSpace::new(TestRegion::new(0, 64, Growth::Bytes(64))).unwrap();

    assert_eq!(space.malloc(8), Some(0));
    space.free(0);
    assert_eq!(space.malloc(8), Some(0));

    assert_eq!(space.bump_cursor(), 8);
    assert_eq!(space.blocks().len(), 1);
    assert_eq!(space.region().grow_calls, 0);
}

#[test]
fn test_growth_until_request_fits() {
    let mut memory = small_memory();
    memory.set_heap_end(58);
    let mut space = AllocationSpace::new(memory).unwrap();
    assert_eq!(space.headroom(), 50);

    assert_eq!(space.malloc(100), Some(8));

    assert_eq!(space.bump_cursor(), 112);
    assert!(space.region().heap_end() >= 112);
    assert_eq!(space.region().pages(), 2);
    assert_eq!(space.blocks().get(8).unwrap().size, 104);
}

#[test]
fn test_growth_takes_several_steps() {
    let mut space = AllocationSpace::new(TestRegion::new(8, 16, Growth::Bytes(16))).unwrap();

    assert_eq!(space.malloc(60), Some(8));
    // 8 + 64 = 72 needs the end to move from 16 to at least 72
    assert_eq!(space.region().grow_calls, 4);
    assert_eq!(space.region().heap_end(), 80);
}

#[test]
fn test_realloc_shrink_copies_prefix() {
    let mut heap = bind(small_memory()).unwrap();
    let p = heap.malloc(16);
    let data: Vec<u8> = (1..=16).collect();
    heap.write(p, &data).unwrap();

    let q = heap.realloc(p, 4);

    assert_ne!(q, 0);
    assert_ne!(q, p);
    assert_eq!(heap.read(q, 4).unwrap(), &[1, 2, 3, 4]);
    assert!(!heap.space().blocks().get(p).unwrap().occupied);
    assert!(heap.space().blocks().get(q).unwrap().occupied);
}

#[test]
fn test_realloc_grow_keeps_contents() {
    let mut heap = bind(small_memory()).unwrap();
    let p = heap.malloc(8);
    heap.write(p, &[9, 8, 7, 6, 5, 4, 3, 2]).unwrap();

    let q = heap.realloc(p, 32);

    assert_eq!(q, 16);
    assert_eq!(heap.read(q, 8).unwrap(), &[9, 8, 7, 6, 5, 4, 3, 2]);
}

#[test]
fn test_refused_growth_is_exhaustion() {
    let mut space = AllocationSpace::new(TestRegion::new(8, 64, Growth::Refuse)).unwrap();

    assert_eq!(space.malloc(1 << 20), None);

    assert!(space.blocks().is_empty());
    assert_eq!(space.bump_cursor(), 8);
    assert_eq!(
        space.take_diagnostics(),
        vec![Diagnostic::Exhausted {
            requested: 1 << 20,
            available: 56,
            cause: GrowError::Refused("host out of memory".to_string()),
        }]
    );
}

#[test]
fn test_stalled_growth_does_not_loop() {
    let mut space = AllocationSpace::new(TestRegion::new(8, 64, Growth::Stall)).unwrap();

    assert_eq!(space.malloc(128), None);

    assert_eq!(space.region().grow_calls, 1);
    assert!(matches!(
        space.diagnostics(),
        [Diagnostic::Exhausted {
            cause: GrowError::Stalled { heap_end: 64 },
            ..
        }]
    ));
}

#[test]
fn test_max_pages_is_exhaustion() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();

    assert_eq!(space.malloc(1000), None);
    assert!(matches!(
        space.diagnostics(),
        [Diagnostic::Exhausted {
            requested: 1000,
            cause: GrowError::LimitReached {
                pages: 4,
                max_pages: 4
            },
            ..
        }]
    ));
    // Smaller requests still succeed afterwards
    assert_eq!(space.malloc(16), Some(8));
}

#[test]
fn test_size_overflow_is_exhaustion() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();

    assert_eq!(space.malloc(u32::MAX), None);
    assert!(matches!(
        space.diagnostics(),
        [Diagnostic::Exhausted {
            cause: GrowError::AddressSpace,
            ..
        }]
    ));
}

#[test]
fn test_malloc_zero_gets_a_block() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();

    let a = space.malloc(0).unwrap();
    let b = space.malloc(0).unwrap();

    assert_ne!(a, b);
    assert_eq!(space.blocks().get(a).unwrap().size, 8);
}

#[test]
fn test_addresses_aligned_and_disjoint() {
    let mut space = AllocationSpace::new(TestRegion::new(16, 64, Growth::Bytes(256))).unwrap();

    let sizes = [1, 7, 8, 9, 15, 16, 17, 100, 3, 64];
    let mut live = Vec::new();
    for &size in &sizes {
        let address = space.malloc(size).unwrap();
        assert_eq!(address % 8, 0);
        live.push((address, space.blocks().get(address).unwrap().size));
    }

    space.free(live[2].0);
    space.free(live[5].0);
    for &size in &[8, 16, 40] {
        let address = space.malloc(size).unwrap();
        live.retain(|&(a, _)| a != address);
        live.push((address, space.blocks().get(address).unwrap().size));
    }
    live.retain(|&(a, _)| space.blocks().get(a).unwrap().occupied);

    for (i, &(a, a_size)) in live.iter().enumerate() {
        assert!(a >= 16);
        assert!(a + a_size <= space.bump_cursor());
        for &(b, b_size) in &live[i + 1..] {
            assert!(a + a_size <= b || b + b_size <= a, "{} and {} overlap", a, b);
        }
    }
}

#[test]
fn test_exact_fit_takes_first_free_block() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let _b = space.malloc(16).unwrap();
    let c = space.malloc(8).unwrap();

    space.free(c);
    space.free(a);

    assert_eq!(space.malloc(8), Some(a));
    assert_eq!(space.malloc(8), Some(c));
}

#[test]
fn test_adjacent_free_blocks_are_not_coalesced() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let b = space.malloc(8).unwrap();
    space.free(a);
    space.free(b);

    let c = space.malloc(16).unwrap();

    assert_eq!(c, 24);
    assert_eq!(space.stats().free_bytes, 16);
}

// ========== Chains ==========

#[test]
fn test_free_walks_chain() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let b = space.malloc(8).unwrap();
    space.link(a, b).unwrap();

    space.free(a);

    assert!(!space.blocks().get(a).unwrap().occupied);
    assert!(!space.blocks().get(b).unwrap().occupied);
    assert!(space.diagnostics().is_empty());
}

#[test]
fn test_chained_pair_is_reused() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let b = space.malloc(8).unwrap();
    space.link(a, b).unwrap();
    space.free(a);
    let cursor = space.bump_cursor();

    assert_eq!(space.malloc(16), Some(a));

    assert_eq!(space.bump_cursor(), cursor);
    assert!(space.blocks().get(a).unwrap().occupied);
    assert!(space.blocks().get(b).unwrap().occupied);
    assert_eq!(space.blocks().get(b).unwrap().chain_next, None);

    // Freeing the head releases both again
    space.free(a);
    assert_eq!(space.stats().occupied_blocks, 0);
}

#[test]
fn test_stale_chain_is_cleared() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let b = space.malloc(16).unwrap();
    space.link(a, b).unwrap();
    space.free(a);
    // Exact fit takes b, leaving a chained into an occupied block
    assert_eq!(space.malloc(16), Some(b));

    let c = space.malloc(24).unwrap();

    assert_eq!(c, space.bump_cursor() - 24);
    assert_eq!(space.blocks().get(a).unwrap().chain_next, None);
    assert_eq!(
        space.take_diagnostics(),
        vec![Diagnostic::StaleChain { address: a, next: b }]
    );
}

#[test]
fn test_free_into_freed_continuation_warns() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let b = space.malloc(8).unwrap();
    space.link(a, b).unwrap();
    space.free(b);

    space.free(a);

    assert!(!space.blocks().get(a).unwrap().occupied);
    assert_eq!(
        space.take_diagnostics(),
        vec![Diagnostic::ChainCorruption { address: a, next: b }]
    );
}

#[test]
fn test_realloc_reads_across_chain() {
    let mut heap = bind(small_memory()).unwrap();
    let a = heap.malloc(8);
    let b = heap.malloc(8);
    heap.link(a, b).unwrap();
    let data: Vec<u8> = (10..26).collect();
    heap.write(a, &data).unwrap();

    assert_eq!(heap.space().read_allocation(a).unwrap(), data);
    assert_eq!(heap.space().chain_size(a), Some(16));

    // The freed pair is the first fit for 16 bytes
    let q = heap.realloc(a, 16);
    assert_eq!(q, a);
    assert_eq!(heap.read(q, 16).unwrap(), data.as_slice());
}

#[test]
fn test_link_requires_adjacency() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    let _b = space.malloc(8).unwrap();
    let c = space.malloc(8).unwrap();

    assert_eq!(
        space.link(a, c),
        Err(HeapError::NotAdjacent {
            first: a,
            first_end: a + 8,
            second: c
        })
    );
    assert_eq!(
        space.link(c, a),
        Err(HeapError::NotAdjacent {
            first: c,
            first_end: c + 8,
            second: a
        })
    );
}

#[test]
fn test_free_unknown_address_is_noop() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(16).unwrap();

    space.free(a + 8);

    assert!(space.blocks().get(a).unwrap().occupied);
    assert_eq!(
        space.take_diagnostics(),
        vec![Diagnostic::UnknownAddress { address: a + 8 }]
    );
}

#[test]
fn test_realloc_unknown_address_allocates_fresh() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(16).unwrap();

    // Interior pointer into a live block
    let b = space.realloc(a + 8, 8).unwrap();

    assert_eq!(b, a + 16);
    assert_eq!(space.blocks().len(), 2);
    assert!(space.blocks().get(a).unwrap().occupied);
    assert!(space.blocks().get(b).unwrap().occupied);
    assert!(space.take_diagnostics().is_empty());
}

#[test]
fn test_double_free_is_harmless() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(16).unwrap();

    space.free(a);
    space.free(a);

    assert_eq!(space.stats().occupied_blocks, 0);
    assert!(space.diagnostics().is_empty());
}

#[test]
fn test_stats() {
    let mut space = AllocationSpace::new(small_memory()).unwrap();
    let a = space.malloc(8).unwrap();
    space.malloc(24).unwrap();
    space.free(a);

    let stats = space.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.occupied_blocks, 1);
    assert_eq!(stats.occupied_bytes, 24);
    assert_eq!(stats.free_bytes, 8);
    assert_eq!(stats.bump_cursor, 40);
    assert_eq!(stats.heap_end, 64);
    assert_eq!(stats.headroom, 24);
}

// ========== Guest boundary ==========

#[test]
fn test_bind_rejects_bad_heap_base() {
    assert_eq!(
        bind(TestRegion::new(0, 64, Growth::Refuse)).err(),
        Some(HeapError::NullHeapBase)
    );
    assert_eq!(
        bind(TestRegion::new(12, 64, Growth::Refuse)).err(),
        Some(HeapError::MisalignedHeapBase { heap_base: 12 })
    );
    assert!(AllocationSpace::new(TestRegion::new(4, 64, Growth::Refuse)).is_err());
}

#[test]
fn test_guest_sees_zero_on_exhaustion() {
    let mut heap = bind(small_memory()).unwrap();

    assert_eq!(heap.malloc(4096), 0);

    let diagnostics = heap.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_error());
}

#[test]
fn test_realloc_failure_releases_original() {
    let mut heap = bind(small_memory()).unwrap();
    let p = heap.malloc(16);

    assert_eq!(heap.realloc(p, 1000), 0);

    assert!(!heap.space().blocks().get(p).unwrap().occupied);
}

#[test]
fn test_null_handling() {
    let mut heap = bind(small_memory()).unwrap();

    heap.free(0);
    assert_eq!(heap.take_diagnostics(), vec![Diagnostic::NullFree]);

    let p = heap.realloc(0, 10);
    assert_eq!(p, 8);
    assert_eq!(heap.space().blocks().get(p).unwrap().size, 16);
}

#[test]
fn test_binds_are_independent() {
    let mut first = bind(small_memory()).unwrap();
    let mut second = bind(small_memory()).unwrap();

    let a = first.malloc(16);
    let b = second.malloc(16);

    assert_eq!(a, b);
    first.free(a);
    assert!(second.space().blocks().get(b).unwrap().occupied);
    assert_eq!(second.stats().occupied_blocks, 1);
}

#[test]
fn test_host_reads_and_writes_are_bounds_checked() {
    let mut heap = bind(small_memory()).unwrap();

    assert_eq!(
        heap.write(60, &[1, 2, 3, 4, 5]),
        Err(HeapError::OutOfBounds {
            address: 60,
            len: 5,
            size: 64
        })
    );
    assert!(heap.read(u32::MAX, 2).is_err());
    heap.write(60, &[1, 2, 3, 4]).unwrap();
    assert_eq!(heap.read(60, 4).unwrap(), &[1, 2, 3, 4]);
}

#[test]
fn test_foreign_function_table() {
    let mut heap = bind(small_memory()).unwrap();

    let p = heap.call("malloc", &[10]).unwrap();
    assert_eq!(p, Some(8));
    let q = heap.call("realloc", &[8, 20]).unwrap();
    assert_eq!(q, Some(24));
    assert_eq!(heap.call("free", &[24]).unwrap(), None);
    assert_eq!(
        heap.call("calloc", &[1, 8]),
        Err(HostError::UnknownImport("calloc".to_string()))
    );
}

#[test]
fn test_memory_imports() {
    let mut heap = bind(small_memory()).unwrap();
    let src = heap.malloc(8);
    let dst = heap.malloc(8);

    heap.call("memset", &[src, b'x' as u32, 7]).unwrap();
    assert_eq!(heap.call("strlen", &[src]).unwrap(), Some(7));

    assert_eq!(heap.call("memcpy", &[dst, src, 8]).unwrap(), Some(dst));
    assert_eq!(heap.read(dst, 8).unwrap(), b"xxxxxxx\0");

    // Overlapping ranges copy as if through a temporary
    heap.write(src, b"abcdef\0\0").unwrap();
    heap.memcpy(src + 1, src, 6).unwrap();
    assert_eq!(heap.read(src, 8).unwrap(), b"aabcdef\0");
}

#[test]
fn test_memory_imports_reject_null_and_out_of_bounds() {
    let mut heap = bind(small_memory()).unwrap();
    let p = heap.malloc(8);
    heap.write(p, &[7; 8]).unwrap();

    assert!(matches!(
        heap.call("memcpy", &[0, p, 8]),
        Err(HostError::NullPointer { operand: "destination", .. })
    ));
    assert!(matches!(
        heap.call("memcpy", &[p, 0, 8]),
        Err(HostError::NullPointer { operand: "source", .. })
    ));

    // A 64-byte region: every range crossing byte 64 fails without writing
    assert_eq!(
        heap.call("memcpy", &[p, 60, 8]),
        Err(HostError::Memory(HeapError::OutOfBounds {
            address: 60,
            len: 8,
            size: 64
        }))
    );
    assert_eq!(
        heap.call("memset", &[60, 0, 8]),
        Err(HostError::Memory(HeapError::OutOfBounds {
            address: 60,
            len: 8,
            size: 64
        }))
    );
    assert_eq!(heap.read(p, 8).unwrap(), &[7; 8]);

    // No terminator before the end of the region
    heap.write(56, &[1; 8]).unwrap();
    assert_eq!(
        heap.strlen(56),
        Err(HeapError::OutOfBounds {
            address: 56,
            len: 9,
            size: 64
        })
    );
    assert!(heap.strlen(64).is_err());
}

#[test]
fn test_into_region_returns_memory() {
    let mut heap = bind(small_memory()).unwrap();
    let p = heap.malloc(4);
    heap.write(p, &[0xaa; 4]).unwrap();

    let memory = heap.into_region();
    assert_eq!(&memory.bytes()[8..12], &[0xaa; 4]);
}
