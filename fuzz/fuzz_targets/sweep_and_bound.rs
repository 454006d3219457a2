#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = fortune_voronoi::arbitrary::sweep_and_bound(&mut Unstructured::new(data));
});
