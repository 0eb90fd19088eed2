//! Marking checked rounds in a circular bitset.
//!
//! Run with: cargo run --example known_rounds

use roundkit::builder::WindowBuilder;

fn main() {
    println!("=== BitRangeBuffer ===\n");

    // 128 rounds → 2 blocks
    let mut checked = WindowBuilder::new(128).build_bits();
    checked.set_range(0, 40);
    checked.set(64);
    checked.set(100);
    println!("checked:\n   {checked}");

    // Rounds 128..=159 reuse the slots of rounds 0..=31
    checked.clear_range(128, 159);
    println!("after the window moved past round 159:\n   {checked}");
    println!("   round 35 checked? {}", checked.get(35));
    println!("   round 160 checked? {}", checked.get(160));

    // Which of rounds 30..=70 have been checked, with neutral padding
    let slice = checked.copy(30, 70);
    println!("copy of rounds 30..=70 ({} blocks):\n   {slice}", slice.num_blocks());

    // Every round in `mask` must also be in `checked`
    let mut mask = WindowBuilder::new(128).build_bits();
    mask.set_range(60, 70);
    let verdict = checked.implies(&mask);
    let missing: Vec<u64> = (60..=70).filter(|&r| !verdict.get(r)).collect();
    println!("rounds in 60..=70 not yet checked: {missing:?}");

    let grown = checked.extend(4);
    println!("extended to {} bits, {} set", grown.capacity_bits(), grown.count_ones());
}
