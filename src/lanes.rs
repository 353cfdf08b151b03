//! Greedy interval packing of bands into non-overlapping display lanes.

use crate::data_source::RenderBand;
use crate::error::{LocusViewError, Result};
use std::collections::HashMap;

/// Lane assignment for one set of bands.
#[derive(Clone, Debug, Default)]
pub struct LaneLayout {
    number_lanes: usize,
    lane_of: HashMap<String, usize>,
}

impl LaneLayout {
    #[inline(always)]
    pub fn number_lanes(&self) -> usize {
        self.number_lanes
    }

    /// Lane of a band that was part of the packed set. Asking for a band the
    /// packer never saw is a caller bug and fails loudly.
    pub fn lane_of(&self, band_id: &str) -> Result<usize> {
        self.lane_of.get(band_id).copied().ok_or_else(|| {
            LocusViewError::contract(format!("band '{band_id}' has no lane assignment"))
        })
    }
}

/// Assigns each band the lowest-indexed lane it fits into without overlap.
///
/// Classical greedy interval-graph coloring: sorted by ascending start (stable,
/// ties keep input order), a band goes into the first lane whose current end is
/// `<= band.start`, else opens a new lane. Optimal in lane count for interval
/// graphs.
pub fn pack_lanes(bands: &[RenderBand]) -> LaneLayout {
    let mut order: Vec<&RenderBand> = bands.iter().collect();
    order.sort_by_key(|band| band.start);

    let mut lane_ends: Vec<u64> = Vec::new();
    let mut lane_of = HashMap::with_capacity(bands.len());
    for band in order {
        let lane = match lane_ends.iter().position(|end| *end <= band.start) {
            Some(lane) => lane,
            None => {
                lane_ends.push(0);
                lane_ends.len() - 1
            }
        };
        lane_ends[lane] = band.end;
        let _previous = lane_of.insert(band.id.to_owned(), lane);
    }

    LaneLayout {
        number_lanes: lane_ends.len(),
        lane_of,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(id: &str, start: u64, end: u64) -> RenderBand {
        RenderBand {
            id: id.to_string(),
            start,
            end,
            ..Default::default()
        }
    }

    #[test]
    fn test_three_band_scenario() {
        let bands = vec![band("a", 10, 50), band("b", 20, 30), band("c", 60, 70)];
        let layout = pack_lanes(&bands);
        assert_eq!(layout.number_lanes(), 2);
        assert_eq!(layout.lane_of("a").unwrap(), 0);
        assert_eq!(layout.lane_of("b").unwrap(), 1);
        assert_eq!(layout.lane_of("c").unwrap(), 0);
    }

    #[test]
    fn test_unknown_band_is_contract_violation() {
        let layout = pack_lanes(&[band("a", 0, 10)]);
        let err = layout.lane_of("ghost").unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_empty_input() {
        let layout = pack_lanes(&[]);
        assert_eq!(layout.number_lanes(), 0);
    }

    #[test]
    fn test_touching_bands_share_a_lane() {
        // end == next start is no overlap for lane purposes
        let bands = vec![band("a", 0, 10), band("b", 10, 20)];
        let layout = pack_lanes(&bands);
        assert_eq!(layout.number_lanes(), 1);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let bands = vec![band("c", 60, 70), band("b", 20, 30), band("a", 10, 50)];
        let layout = pack_lanes(&bands);
        assert_eq!(layout.number_lanes(), 2);
        assert_eq!(layout.lane_of("c").unwrap(), 0);
        assert_eq!(layout.lane_of("b").unwrap(), 1);
    }

    /// Maximum number of bands simultaneously overlapping any point, counted
    /// the slow way.
    fn brute_force_max_overlap(bands: &[RenderBand]) -> usize {
        let mut max = 0;
        for probe in bands {
            for point in [probe.start, probe.end.saturating_sub(1)] {
                let count = bands
                    .iter()
                    .filter(|b| b.start <= point && point < b.end)
                    .count();
                max = max.max(count);
            }
        }
        max
    }

    #[test]
    fn test_lane_count_matches_max_overlap() {
        // Deterministic LCG so failures reproduce.
        let mut state: u64 = 0x2545F491;
        let mut next = move |modulus: u64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % modulus
        };

        for case in 0..50 {
            let n = 1 + next(40) as usize;
            let bands: Vec<RenderBand> = (0..n)
                .map(|i| {
                    let start = next(1000);
                    let end = start + 1 + next(200);
                    band(&format!("band-{case}-{i}"), start, end)
                })
                .collect();

            let layout = pack_lanes(&bands);
            assert_eq!(
                layout.number_lanes(),
                brute_force_max_overlap(&bands),
                "lane count must equal the interval-graph chromatic number"
            );

            // No two bands in the same lane may overlap.
            for a in &bands {
                for b in &bands {
                    if a.id != b.id
                        && layout.lane_of(&a.id).unwrap() == layout.lane_of(&b.id).unwrap()
                    {
                        assert!(
                            a.end <= b.start || b.end <= a.start,
                            "bands {} and {} overlap in one lane",
                            a.id,
                            b.id
                        );
                    }
                }
            }
        }
    }
}
