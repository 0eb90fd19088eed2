//! Tracking round results that arrive out of order.
//!
//! Run with: cargo run --example round_ring

use roundkit::ds::MonotonicRingBuffer;
use roundkit::error::WindowError;

#[derive(Debug, Clone)]
struct RoundInfo {
    id: u64,
    state: &'static str,
}

fn round_id(info: &RoundInfo) -> u64 {
    info.id
}

/// Later states replace earlier ones; placeholders are always filled.
fn newer_state(existing: Option<&RoundInfo>, new: &RoundInfo) -> bool {
    match existing {
        None => true,
        Some(old) => old.state != "completed" && new.state == "completed",
    }
}

fn main() {
    println!("=== MonotonicRingBuffer ===\n");

    let rounds = MonotonicRingBuffer::new(5, round_id);
    rounds.push(RoundInfo {
        id: 100,
        state: "completed",
    });

    let arrivals = [
        RoundInfo { id: 103, state: "realtime" },
        RoundInfo { id: 101, state: "completed" },
        RoundInfo { id: 103, state: "completed" },
        RoundInfo { id: 101, state: "realtime" },
        RoundInfo { id: 99, state: "completed" },
        RoundInfo { id: 107, state: "queued" },
    ];

    for info in arrivals {
        let id = info.id;
        match rounds.upsert_by_id(info, newer_state) {
            Ok(()) => println!("   round {id}: stored"),
            Err(WindowError::RejectedByPolicy { .. }) => {
                println!("   round {id}: kept existing state")
            },
            Err(err) => println!("   round {id}: dropped ({err})"),
        }
    }

    println!("\nWindow (oldest → newest):");
    for (id, info) in rounds.to_vec() {
        match info {
            Some(info) => println!("   {id}: {}", info.state),
            None => println!("   {id}: <unknown>"),
        }
    }

    match rounds.get_by_key(110) {
        Ok(_) => {},
        Err(err) => println!("\nLookup of round 110: {err}"),
    }
}
