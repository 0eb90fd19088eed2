// ==============================================
// WINDOW INVARIANT TESTS (integration)
// ==============================================
//
// Behavior that spans the builder, both buffers and the error types.

use roundkit::builder::WindowBuilder;
use roundkit::ds::{BitRangeBuffer, RoundRing};
use roundkit::error::WindowError;

// ==============================================
// Shared horizon
// ==============================================

mod shared_horizon {
    use super::*;

    #[test]
    fn ring_and_bits_cover_same_rounds() {
        let builder = WindowBuilder::new(128);
        let ring = builder.build_ring(|round: &u64| *round);
        let mut checked = builder.build_bits();

        for round in 0..128u64 {
            ring.push(round);
            if round % 3 == 0 {
                checked.set(round);
            }
        }

        assert_eq!(checked.capacity_bits(), 128);
        assert_eq!(ring.len(), 128);
        for round in 0..128u64 {
            assert_eq!(ring.get_by_key(round), Ok(Some(round)));
            assert_eq!(checked.get(round), round % 3 == 0);
        }
    }

    #[test]
    fn bits_wrap_where_ring_evicts() {
        let builder = WindowBuilder::new(64);
        let mut checked = builder.build_bits();

        checked.set(5);
        // round 69 shares the slot of round 5 once the window has moved on
        assert!(checked.get(69));
        checked.clear(69);
        assert!(!checked.get(5));
    }
}

// ==============================================
// Checked-round tracking
// ==============================================
//
// A consumer marks rounds as checked, clears the slots of rounds that leave
// the window, and combines masks with `implies`.

mod checked_rounds {
    use super::*;

    #[test]
    fn sliding_clear_keeps_window_consistent() {
        let mut checked = BitRangeBuffer::new(2);
        checked.set_range(0, 127);
        assert_eq!(checked.count_ones(), 128);

        // rounds 128..=159 reuse the slots of 0..=31
        checked.clear_range(128, 159);
        assert_eq!(checked.count_ones(), 96);
        for pos in 0..32 {
            assert!(!checked.get(pos));
        }
        for pos in 32..128 {
            assert!(checked.get(pos));
        }
    }

    #[test]
    fn wraparound_clear_spans_the_logical_end() {
        let mut checked = BitRangeBuffer::from_blocks(vec![u64::MAX; 2]);
        checked.clear_range(120, 7);

        assert_eq!(checked.count_ones(), 128 - 16);
        assert_eq!(checked.blocks()[0], u64::MAX >> 8);
        assert_eq!(checked.blocks()[1], u64::MAX << 8);
    }

    #[test]
    fn implies_against_copied_window() {
        let mut seen = BitRangeBuffer::new(2);
        seen.set_range(10, 20);

        let mut checked = BitRangeBuffer::new(2);
        checked.set_range(10, 15);

        // every seen round checked? only where the mask has a 1
        let ok = checked.implies(&seen);
        assert!(ok.get(12));
        assert!(!ok.get(18));
        assert!(ok.get(100));

        let extended = ok.extend(4);
        assert_eq!(extended.num_blocks(), 4);
        assert_eq!(&extended.blocks()[..2], ok.blocks());
        assert_eq!(&extended.blocks()[2..], &[0, 0]);
    }

    #[test]
    fn try_implies_rejects_mismatched_horizons() {
        let a = WindowBuilder::new(64).build_bits();
        let b = WindowBuilder::new(65).build_bits();
        let err = a.try_implies(&b).unwrap_err();
        assert!(err.to_string().starts_with("invariant violation"));
    }
}

// ==============================================
// Ring window semantics
// ==============================================

mod ring_window {
    use super::*;

    fn identity(round: &u64) -> u64 {
        *round
    }

    fn ring(capacity: usize) -> RoundRing<u64, fn(&u64) -> u64> {
        RoundRing::new(capacity, identity as fn(&u64) -> u64)
    }

    #[test]
    fn errors_name_the_offending_key() {
        let mut ring = ring(3);
        assert_eq!(ring.get_by_key(1), Err(WindowError::Empty));

        for round in 10..13 {
            ring.push(round);
        }
        let err = ring.upsert_by_id(9, |_, _| true).unwrap_err();
        assert_eq!(err.key(), Some(9));

        let err = ring.upsert_by_id(11, |_, _| false).unwrap_err();
        assert_eq!(err, WindowError::RejectedByPolicy { key: 11 });
        assert_eq!(err.key(), Some(11));
    }

    #[test]
    fn huge_gap_keeps_only_the_tail() {
        let mut ring = ring(4);
        ring.push(0);
        ring.upsert_by_id(1_000_000, |_, _| true).unwrap();

        let window = ring.to_vec();
        assert_eq!(
            window,
            vec![
                (999_997, None),
                (999_998, None),
                (999_999, None),
                (1_000_000, Some(1_000_000)),
            ]
        );
    }

    #[test]
    fn placeholder_can_be_filled_later() {
        let mut ring = ring(8);
        ring.push(1);
        ring.upsert_by_id(4, |_, _| true).unwrap();
        assert_eq!(ring.get_by_key(2), Ok(None));

        ring.upsert_by_id(2, |existing, _| existing.is_none()).unwrap();
        assert_eq!(ring.get_by_key(2), Ok(Some(&2)));
        assert_eq!(ring.get_by_key(3), Ok(None));
        assert_eq!(ring.get(), Some(&4));
    }

    #[test]
    fn physical_index_matches_iteration_order() {
        let mut ring = ring(5);
        for round in 0..7 {
            ring.push(round);
        }
        let keys: Vec<u64> = ring.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![2, 3, 4, 5, 6]);
        // oldest is two slots past the start after two evictions
        assert_eq!(ring.physical_index(0), Some(2));
        assert_eq!(ring.physical_index(-1), Some(1));
        assert_eq!(ring.physical_index(-5), ring.physical_index(0));
    }
}
