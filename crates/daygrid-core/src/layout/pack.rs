//! Column packing for overlapping events on a single day's axis.
//!
//! Greedy "earliest compatible column" assignment: events are taken in
//! ascending display-start order and dropped into the leftmost column whose
//! last occupant has already ended. The pass is fully deterministic, so the
//! same event set always lands in the same columns across re-renders.

/// An event reduced to its clipped on-axis interval, minutes since
/// midnight, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisInterval {
    pub start_min: i64,
    pub end_min: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packing {
    /// Column index per input interval, aligned with the input slice.
    pub columns: Vec<usize>,
    pub column_count: usize,
}

pub fn pack(intervals: &[AxisInterval]) -> Packing {
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    // Stable sort keeps declaration order among equal starts, which is the
    // tie-break that pins earlier-declared events to the leftmost columns.
    order.sort_by_key(|&idx| intervals[idx].start_min);

    let mut columns = vec![0_usize; intervals.len()];
    let mut column_ends: Vec<i64> = Vec::new();

    for idx in order {
        let interval = intervals[idx];
        let slot = column_ends
            .iter()
            .position(|&last_end| last_end <= interval.start_min);

        match slot {
            Some(col) => {
                column_ends[col] = interval.end_min;
                columns[idx] = col;
            }
            None => {
                column_ends.push(interval.end_min);
                columns[idx] = column_ends.len() - 1;
            }
        }
    }

    Packing {
        columns,
        column_count: column_ends.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::{AxisInterval, Packing, pack};

    fn iv(start_min: i64, end_min: i64) -> AxisInterval {
        AxisInterval { start_min, end_min }
    }

    /// Brute-force chromatic number of the interval overlap graph: the
    /// maximum number of intervals alive at any single minute.
    fn min_columns(intervals: &[AxisInterval]) -> usize {
        let mut best = 0;
        for probe in intervals {
            let alive = intervals
                .iter()
                .filter(|other| other.start_min <= probe.start_min && probe.start_min < other.end_min)
                .count();
            best = best.max(alive);
        }
        best
    }

    fn assert_no_column_overlap(intervals: &[AxisInterval], packing: &Packing) {
        for a in 0..intervals.len() {
            for b in (a + 1)..intervals.len() {
                if packing.columns[a] != packing.columns[b] {
                    continue;
                }
                let overlap = intervals[a].start_min < intervals[b].end_min
                    && intervals[b].start_min < intervals[a].end_min;
                assert!(!overlap, "intervals {a} and {b} share a column but overlap");
            }
        }
    }

    #[test]
    fn empty_input_yields_zero_columns() {
        assert_eq!(pack(&[]), Packing::default());
    }

    #[test]
    fn overlapping_pair_takes_two_columns() {
        // 10:00-11:30 and 10:30-12:00.
        let intervals = [iv(600, 690), iv(630, 720)];
        let packing = pack(&intervals);

        assert_eq!(packing.column_count, 2);
        assert_eq!(packing.columns, vec![0, 1]);
    }

    #[test]
    fn touching_events_share_a_column() {
        // 09:00-10:00 and 10:00-11:00 touch but do not overlap.
        let intervals = [iv(540, 600), iv(600, 660)];
        let packing = pack(&intervals);

        assert_eq!(packing.column_count, 1);
        assert_eq!(packing.columns, vec![0, 0]);
    }

    #[test]
    fn later_event_reuses_the_leftmost_free_column() {
        let intervals = [iv(540, 660), iv(570, 600), iv(615, 690)];
        let packing = pack(&intervals);

        assert_eq!(packing.columns, vec![0, 1, 1]);
        assert_eq!(packing.column_count, 2);
    }

    #[test]
    fn unsorted_input_is_packed_by_start_order() {
        let intervals = [iv(630, 720), iv(600, 690)];
        let packing = pack(&intervals);

        // The earlier-starting interval wins column 0 even though it was
        // declared second.
        assert_eq!(packing.columns, vec![1, 0]);
        assert_eq!(packing.column_count, 2);
    }

    #[test]
    fn column_count_matches_brute_force_minimum() {
        let fixtures: Vec<Vec<AxisInterval>> = vec![
            vec![],
            vec![iv(0, 60)],
            vec![iv(0, 120), iv(30, 90), iv(60, 180), iv(200, 260)],
            vec![iv(540, 600), iv(540, 600), iv(540, 600)],
            vec![iv(0, 1439), iv(60, 120), iv(60, 120), iv(120, 180)],
            vec![iv(600, 690), iv(630, 720), iv(540, 600), iv(600, 660)],
        ];

        for intervals in fixtures {
            let packing = pack(&intervals);
            assert_eq!(
                packing.column_count,
                min_columns(&intervals),
                "greedy packing must use the minimum column count for {intervals:?}"
            );
            assert_no_column_overlap(&intervals, &packing);
        }
    }

    #[test]
    fn same_input_always_yields_same_assignment() {
        let intervals = [iv(540, 660), iv(540, 660), iv(540, 660), iv(660, 720)];
        let first = pack(&intervals);
        for _ in 0..10 {
            assert_eq!(pack(&intervals), first);
        }
    }
}
