use chrono::NaiveTime;

/// Whether `[a_start, a_end)` and `[b_start, b_end)` share any instant.
///
/// Back-to-back slots (`a_end == b_start`) do not overlap.
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn t(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    #[rstest]
    #[case::back_to_back((9, 0), (10, 0), (10, 0), (11, 0), false)]
    #[case::starts_during((9, 0), (10, 30), (10, 0), (11, 0), true)]
    #[case::ends_during((10, 30), (11, 30), (10, 0), (11, 0), true)]
    #[case::contains((8, 0), (12, 0), (10, 0), (11, 0), true)]
    #[case::identical((10, 0), (11, 0), (10, 0), (11, 0), true)]
    #[case::disjoint((7, 0), (8, 0), (10, 0), (11, 0), false)]
    fn detects_conflicts_in_both_orders(
        #[case] a_start: (u32, u32),
        #[case] a_end: (u32, u32),
        #[case] b_start: (u32, u32),
        #[case] b_end: (u32, u32),
        #[case] expected: bool,
    ) {
        let (a0, a1) = (t(a_start.0, a_start.1), t(a_end.0, a_end.1));
        let (b0, b1) = (t(b_start.0, b_start.1), t(b_end.0, b_end.1));
        assert_eq!(overlaps(a0, a1, b0, b1), expected);
        assert_eq!(overlaps(b0, b1, a0, a1), expected);
    }

    #[test]
    fn symmetric_over_a_grid_of_slots() {
        let slots: Vec<NaiveTime> = (7..=12).flat_map(|h| [t(h, 0), t(h, 30)]).collect();
        for a0 in &slots {
            for a1 in slots.iter().filter(|x| *x > a0) {
                for b0 in &slots {
                    for b1 in slots.iter().filter(|x| *x > b0) {
                        assert_eq!(overlaps(*a0, *a1, *b0, *b1), overlaps(*b0, *b1, *a0, *a1));
                    }
                }
            }
        }
    }
}
