#![no_main]

//! Counter sequences: a counter never goes negative and activity matches
//! the running sum.

use cellmap_core::{CounterSpec, Counters};
use libfuzzer_sys::fuzz_target;

const SPECS: [CounterSpec; 3] = [
    CounterSpec::SELECT_COUNT,
    CounterSpec::HIGHLIGHT_COUNT,
    CounterSpec::new("search"),
];

fuzz_target!(|ops: Vec<(u8, i8)>| {
    let mut counters = Counters::new();
    let mut sums = [0i64; 3];
    for (which, delta) in ops {
        let idx = which as usize % SPECS.len();
        let delta = i32::from(delta);
        match counters.change(SPECS[idx], delta) {
            Some(value) => {
                sums[idx] += i64::from(delta);
                assert_eq!(i64::from(value), sums[idx]);
            }
            None => assert!(sums[idx] + i64::from(delta) < 0),
        }
        for (spec, sum) in SPECS.iter().zip(sums) {
            assert_eq!(counters.is_active(*spec), sum > 0);
        }
        assert_eq!(counters.is_empty(), sums.iter().all(|s| *s == 0));
    }
});
