use helion::{RegisterBatcher, RegisterRange, MAX_REGISTERS_PER_REQUEST};

#[test]
fn hybrid_profile_layout_batches_into_three_reads() {
    // load 84..96, PV 109..120, grid 160..176, battery 177..192
    let mut addresses: Vec<u16> = (84..=96).collect();
    addresses.extend(109..=120);
    addresses.extend(160..=176);
    addresses.extend(177..=192);

    let ranges = RegisterBatcher::default().batch(&addresses);
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges[0], RegisterRange::new(84, 13));
    assert_eq!(ranges[1], RegisterRange::new(109, 12));
    // grid and battery are contiguous and merge into one read
    assert_eq!(ranges[2], RegisterRange::new(160, 33));
}

#[test]
fn coverage_invariant_over_scattered_input() {
    let addresses: Vec<u16> = vec![
        7, 7, 3, 90, 91, 92, 1000, 1001, 1013, 1024, 4000, 65535, 65500, 200, 212, 224, 236,
        248, 260,
    ];
    for max_gap in [0u16, 1, 5, 10, 25] {
        let batcher = RegisterBatcher::new(125, max_gap);
        let ranges = batcher.batch(&addresses);

        let mut unique = addresses.clone();
        unique.sort_unstable();
        unique.dedup();

        // every input address is covered by exactly one range
        for address in &unique {
            assert_eq!(
                ranges.iter().filter(|r| r.contains(*address)).count(),
                1,
                "address {} with max_gap {}",
                address,
                max_gap
            );
        }
        // ranges are ascending, sized within protocol bounds
        for range in &ranges {
            assert!(range.count >= 1);
            assert!(range.count <= MAX_REGISTERS_PER_REQUEST);
        }
        for pair in ranges.windows(2) {
            assert!(pair[0].end_address() < pair[1].start_address);
        }
    }
}

#[test]
fn zero_gap_merges_only_adjacent_addresses() {
    let batcher = RegisterBatcher::new(125, 0);
    let ranges = batcher.batch(&[10, 11, 13]);
    assert_eq!(
        ranges,
        vec![RegisterRange::new(10, 2), RegisterRange::new(13, 1)]
    );
}

#[test]
fn requested_ceiling_above_protocol_limit_is_capped() {
    let batcher = RegisterBatcher::new(1000, 10);
    let addresses: Vec<u16> = (0..200).collect();
    let ranges = batcher.batch(&addresses);
    assert!(ranges.iter().all(|r| r.count <= MAX_REGISTERS_PER_REQUEST));
    assert_eq!(ranges.len(), 2);
}
