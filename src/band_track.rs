//! Interval-feature track: genes, annotations and structural variants packed
//! into non-overlapping lanes, with exon/intron detail above a zoom
//! threshold.

use crate::data_source::{Direction, FetchPayload, RenderBand, SubFeature};
use crate::error::{LocusViewError, Result};
use crate::genome::GenomicRange;
use crate::lanes::pack_lanes;
use crate::scale::LinearScale;
use crate::track::{
    DataTrackCore, HoverBox, HoverElement, LoadState, RenderViewport, parse_band_color,
    track_font,
};
use crate::track_settings::{TrackSettings, TrackType};
use eframe::egui::{Align2, Color32, Painter, Pos2, Rect, Stroke};

pub const LANE_HEIGHT: f32 = 12.0;
pub const LANE_GAP: f32 = 4.0;
pub const TRACK_PADDING: f32 = 6.0;

/// Coarser than this many nucleotides per pixel, features collapse to plain
/// rectangles without exon/intron/arrow detail.
pub const DETAIL_NTS_PER_PX: f64 = 100.0;

/// Features narrower than this stay clickable.
pub const MIN_BAND_WIDTH_PX: f32 = 2.0;

pub const ARROW_SPACING_PX: f32 = 50.0;
const ARROW_HALF: f32 = 2.5;

fn fallback_color(track_type: TrackType) -> Color32 {
    match track_type {
        TrackType::Gene => Color32::from_rgb(0x33, 0x6b, 0xb3),
        TrackType::Variant => Color32::from_rgb(0xc0, 0x30, 0x30),
        _ => Color32::from_rgb(0x4a, 0x7a, 0x6f),
    }
}

/// Bands intersecting or surrounding the view range, sorted by start.
fn visible_bands(bands: &[RenderBand], range: GenomicRange) -> Vec<RenderBand> {
    let mut visible: Vec<RenderBand> = bands
        .iter()
        .filter(|band| range.overlaps(band.start, band.end))
        .cloned()
        .collect();
    visible.sort_by_key(|band| band.start);
    visible
}

/// Pixel rectangle of an interval, with the minimum-width floor applied.
fn interval_rect(
    start: u64,
    end: u64,
    x_scale: &LinearScale,
    top: f32,
    height: f32,
) -> Rect {
    let x1 = x_scale.px(start as f64);
    let x2 = x_scale.px(end as f64).max(x1 + MIN_BAND_WIDTH_PX);
    Rect::from_min_max(Pos2::new(x1, top), Pos2::new(x2, top + height))
}

/// X positions of direction arrowheads, spaced at a fixed pixel interval
/// measured from the end the feature grows away from.
fn arrow_positions(x1: f32, x2: f32, direction: Direction, spacing: f32) -> Vec<f32> {
    let mut positions = vec![];
    match direction {
        Direction::Forward => {
            let mut x = x1 + spacing;
            while x < x2 {
                positions.push(x);
                x += spacing;
            }
        }
        Direction::Reverse => {
            let mut x = x2 - spacing;
            while x > x1 {
                positions.push(x);
                x -= spacing;
            }
        }
    }
    positions
}

/// Genomic gaps between consecutive sub-features; the synthesized "intron"
/// hover regions.
fn intron_gaps(sub_features: &[SubFeature]) -> Vec<(u64, u64)> {
    let mut sorted: Vec<&SubFeature> = sub_features.iter().collect();
    sorted.sort_by_key(|sub| sub.start);
    sorted
        .windows(2)
        .filter(|pair| pair[0].end < pair[1].start)
        .map(|pair| (pair[0].end, pair[1].start))
        .collect()
}

fn sub_feature_label(sub: &SubFeature) -> String {
    match (sub.feature.as_str(), sub.exon_number) {
        ("exon", Some(n)) => format!("Exon {n}"),
        ("exon", None) => "Exon".to_string(),
        (kind, _) => kind.to_string(),
    }
}

#[derive(Debug)]
pub struct BandTrack {
    core: DataTrackCore,
    last_number_lanes: usize,
}

impl BandTrack {
    pub fn new(track_id: &str) -> Self {
        Self {
            core: DataTrackCore::new(track_id),
            last_number_lanes: 1,
        }
    }

    pub fn core(&self) -> &DataTrackCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut DataTrackCore {
        &mut self.core
    }

    /// Expanded height follows the lane count of the last draw; collapsed
    /// tracks keep their configured height and accept lane overlap.
    pub fn height(&self, settings: &TrackSettings) -> f32 {
        if settings.is_expanded {
            let lanes = self.last_number_lanes.max(1) as f32;
            let derived = lanes * (LANE_HEIGHT + LANE_GAP) + 2.0 * TRACK_PADDING;
            settings
                .expanded_height
                .unwrap_or(derived)
                .max(settings.collapsed_height)
        } else {
            settings.collapsed_height
        }
    }

    pub fn draw(
        &mut self,
        painter: &Painter,
        settings: &TrackSettings,
        viewport: &RenderViewport,
        highlights: &[GenomicRange],
    ) -> Result<()> {
        self.core.clear_hover_boxes();
        draw_track_label(painter, settings, viewport);

        if *self.core.state() != LoadState::Ready {
            self.core.draw_state_notice(painter, viewport.plot_rect());
            return Ok(());
        }
        let Some(FetchPayload::Bands(bands)) = self.core.data() else {
            return Err(LocusViewError::contract(format!(
                "band track '{}' holds a non-band payload",
                settings.track_label
            )));
        };

        let visible = visible_bands(bands, viewport.range);
        let layout = pack_lanes(&visible);
        self.last_number_lanes = layout.number_lanes().max(1);

        let plot = viewport.plot_rect();
        let x_scale = viewport.x_scale();
        let show_detail = viewport.nts_per_pixel() <= DETAIL_NTS_PER_PX;
        let color_fallback = fallback_color(settings.track_type);

        let mut hover_boxes: Vec<HoverBox> = vec![];
        for band in &visible {
            // Every visible band went through the packer above; a miss here
            // is a bug, not a data problem.
            let lane = layout.lane_of(&band.id)?;
            let top = if settings.is_expanded {
                plot.min.y + TRACK_PADDING + lane as f32 * (LANE_HEIGHT + LANE_GAP)
            } else {
                plot.min.y + (plot.height() - LANE_HEIGHT) / 2.0
            };
            let rect = interval_rect(band.start, band.end, &x_scale, top, LANE_HEIGHT);
            let clipped = rect.intersect(plot);
            let color = parse_band_color(band.color.as_deref(), color_fallback);

            if band.is_transcript_like() && show_detail {
                draw_transcript(painter, band, &x_scale, rect, plot, color, &mut hover_boxes);
            } else {
                painter.rect_filled(clipped, 1.0, color);
            }
            hover_boxes.push(HoverBox {
                rect: clipped,
                label: band.display_label().to_string(),
                element: HoverElement::Band(band.to_owned()),
            });

            if settings.is_expanded {
                // Label pinned inside the on-screen intersection of the band.
                let label_painter = painter.with_clip_rect(Rect::from_min_max(
                    Pos2::new(clipped.min.x, plot.min.y),
                    Pos2::new(clipped.max.x, plot.max.y),
                ));
                let _rect = label_painter.text(
                    Pos2::new(clipped.center().x, rect.max.y + 1.0),
                    Align2::CENTER_TOP,
                    band.display_label(),
                    track_font(),
                    Color32::from_gray(70),
                );
            }
        }
        for hover in hover_boxes {
            self.core.push_hover_box(hover);
        }

        DataTrackCore::draw_highlights(painter, viewport, highlights);
        Ok(())
    }
}

fn draw_track_label(painter: &Painter, settings: &TrackSettings, viewport: &RenderViewport) {
    let _rect = painter.text(
        Pos2::new(viewport.rect.min.x + 2.0, viewport.rect.center().y),
        Align2::LEFT_CENTER,
        &settings.track_label,
        track_font(),
        Color32::from_gray(60),
    );
}

fn draw_transcript(
    painter: &Painter,
    band: &RenderBand,
    x_scale: &LinearScale,
    rect: Rect,
    plot: Rect,
    color: Color32,
    hover_boxes: &mut Vec<HoverBox>,
) {
    let mid_y = rect.center().y;
    let stroke = Stroke { width: 1.0, color };
    let clipped = rect.intersect(plot);

    painter.line_segment(
        [
            Pos2::new(clipped.min.x, mid_y),
            Pos2::new(clipped.max.x, mid_y),
        ],
        stroke,
    );

    if let Some(direction) = band.direction {
        let dx = match direction {
            Direction::Forward => ARROW_HALF,
            Direction::Reverse => -ARROW_HALF,
        };
        for x in arrow_positions(clipped.min.x, clipped.max.x, direction, ARROW_SPACING_PX) {
            painter.line_segment(
                [
                    Pos2::new(x - dx, mid_y - ARROW_HALF),
                    Pos2::new(x + dx, mid_y),
                ],
                stroke,
            );
            painter.line_segment(
                [
                    Pos2::new(x + dx, mid_y),
                    Pos2::new(x - dx, mid_y + ARROW_HALF),
                ],
                stroke,
            );
        }
    }

    for sub in &band.sub_features {
        let sub_rect = interval_rect(sub.start, sub.end, x_scale, rect.min.y, rect.height())
            .intersect(plot);
        if sub_rect.width() <= 0.0 {
            continue;
        }
        // Non-exon sub-feature kinds (UTRs etc.) render muted.
        let sub_color = if sub.feature == "exon" {
            color
        } else {
            color.gamma_multiply(0.45)
        };
        painter.rect_filled(sub_rect, 0.0, sub_color);
        hover_boxes.push(HoverBox {
            rect: sub_rect,
            label: sub_feature_label(sub),
            element: HoverElement::Exon(sub.to_owned()),
        });
    }

    for (gap_start, gap_end) in intron_gaps(&band.sub_features) {
        let gap_rect = Rect::from_min_max(
            Pos2::new(x_scale.px(gap_start as f64), mid_y - 2.0),
            Pos2::new(x_scale.px(gap_end as f64), mid_y + 2.0),
        )
        .intersect(plot);
        if gap_rect.width() <= 0.0 {
            continue;
        }
        hover_boxes.push(HoverBox {
            rect: gap_rect,
            label: "Intron".to_string(),
            element: HoverElement::Intron {
                start: gap_start,
                end: gap_end,
            },
        });
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
    fn test_visible_bands_filters_and_sorts() {
        let bands = vec![
            band("right_out", 500, 600),
            band("surrounds", 0, 400),
            band("inside", 150, 160),
            band("left_out", 0, 50),
        ];
        let range = GenomicRange::new(100, 300).unwrap();
        let visible = visible_bands(&bands, range);
        let ids: Vec<&str> = visible.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["surrounds", "inside"]);
    }

    #[test]
    fn test_interval_rect_applies_min_width() {
        let x_scale = LinearScale::new((0.0, 1000.0), (0.0, 100.0));
        let rect = interval_rect(500, 501, &x_scale, 10.0, 12.0);
        assert!((rect.width() - MIN_BAND_WIDTH_PX).abs() < f32::EPSILON);
        let wide = interval_rect(0, 1000, &x_scale, 10.0, 12.0);
        assert!((wide.width() - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_arrow_positions_forward_and_reverse() {
        let forward = arrow_positions(0.0, 160.0, Direction::Forward, 50.0);
        assert_eq!(forward, vec![50.0, 100.0, 150.0]);
        let reverse = arrow_positions(0.0, 160.0, Direction::Reverse, 50.0);
        assert_eq!(reverse, vec![110.0, 60.0, 10.0]);
        assert!(arrow_positions(0.0, 40.0, Direction::Forward, 50.0).is_empty());
    }

    #[test]
    fn test_intron_gaps_between_sorted_exons() {
        let subs = vec![
            SubFeature {
                start: 300,
                end: 400,
                feature: "exon".to_string(),
                exon_number: Some(2),
            },
            SubFeature {
                start: 100,
                end: 200,
                feature: "exon".to_string(),
                exon_number: Some(1),
            },
            SubFeature {
                start: 400,
                end: 450,
                feature: "utr".to_string(),
                exon_number: None,
            },
        ];
        // unsorted input, touching features produce no gap
        assert_eq!(intron_gaps(&subs), vec![(200, 300)]);
    }

    #[test]
    fn test_expanded_height_follows_lane_count() {
        let mut track = BandTrack::new("t");
        let mut settings = TrackSettings::new_gene();
        settings.is_expanded = true;
        track.last_number_lanes = 3;
        let expected = 3.0 * (LANE_HEIGHT + LANE_GAP) + 2.0 * TRACK_PADDING;
        assert!((track.height(&settings) - expected).abs() < f32::EPSILON);
        settings.is_expanded = false;
        assert_eq!(track.height(&settings), settings.collapsed_height);
    }

    #[test]
    fn test_sub_feature_labels() {
        let exon = SubFeature {
            start: 0,
            end: 1,
            feature: "exon".to_string(),
            exon_number: Some(7),
        };
        assert_eq!(sub_feature_label(&exon), "Exon 7");
        let utr = SubFeature {
            start: 0,
            end: 1,
            feature: "five_prime_utr".to_string(),
            exon_number: None,
        };
        assert_eq!(sub_feature_label(&utr), "five_prime_utr");
    }
}
