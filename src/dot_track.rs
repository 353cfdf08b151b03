//! Scatter track for coverage and B-allele-frequency measurements.

use crate::data_source::FetchPayload;
use crate::error::{LocusViewError, Result};
use crate::genome::GenomicRange;
use crate::scale::LinearScale;
use crate::track::{DataTrackCore, LoadState, RenderViewport, track_font};
use crate::track_settings::{TrackSettings, YAxis};
use eframe::egui::{Align2, Color32, Painter, Pos2, Stroke};

pub const DOT_RADIUS: f32 = 1.4;
const PLOT_PADDING: f32 = 4.0;

const DOT_COLOR: Color32 = Color32::from_rgb(0x45, 0x5a, 0x85);
/// Values truncated into the axis range are recolored so truncation is
/// visible.
pub const OUT_OF_RANGE_COLOR: Color32 = Color32::from_rgb(0xe0, 0x6c, 0x00);
const HIGHLIGHTED_DOT_COLOR: Color32 = Color32::from_rgb(0x1f, 0x8a, 0x70);

/// Clamps a value into the axis range; the flag reports truncation.
fn clamp_to_axis(y: f64, range: (f64, f64)) -> (f64, bool) {
    let (min, max) = range;
    if y < min {
        (min, true)
    } else if y > max {
        (max, true)
    } else {
        (y, false)
    }
}

#[derive(Debug)]
pub struct DotTrack {
    core: DataTrackCore,
}

impl DotTrack {
    pub fn new(track_id: &str) -> Self {
        Self {
            core: DataTrackCore::new(track_id),
        }
    }

    pub fn core(&self) -> &DataTrackCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut DataTrackCore {
        &mut self.core
    }

    pub fn height(&self, settings: &TrackSettings) -> f32 {
        if settings.is_expanded {
            settings
                .expanded_height
                .unwrap_or(settings.collapsed_height * 2.0)
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

        let y_axis = settings.y_axis.as_ref().ok_or_else(|| {
            LocusViewError::contract(format!(
                "dot track '{}' has no y-axis configuration",
                settings.track_label
            ))
        })?;
        draw_y_axis(painter, y_axis, settings, viewport);

        if *self.core.state() != LoadState::Ready {
            self.core.draw_state_notice(painter, viewport.plot_rect());
            return Ok(());
        }
        let Some(FetchPayload::Dots(dots)) = self.core.data() else {
            return Err(LocusViewError::contract(format!(
                "dot track '{}' holds a non-dot payload",
                settings.track_label
            )));
        };

        let plot = viewport.plot_rect();
        let x_scale = viewport.x_scale();
        let y_scale = LinearScale::new_reversed(
            y_axis.range,
            ((plot.min.y + PLOT_PADDING) as f64, (plot.max.y - PLOT_PADDING) as f64),
        );

        for dot in dots {
            if !viewport.range.contains(dot.x) {
                continue;
            }
            let (value, out_of_range) = clamp_to_axis(dot.y, y_axis.range);
            let highlighted = highlights.iter().any(|h| h.contains(dot.x));
            let color = if out_of_range {
                OUT_OF_RANGE_COLOR
            } else if highlighted {
                HIGHLIGHTED_DOT_COLOR
            } else {
                DOT_COLOR
            };
            painter.circle_filled(
                Pos2::new(x_scale.px(dot.x as f64), y_scale.px(value)),
                DOT_RADIUS,
                color,
            );
        }

        DataTrackCore::draw_highlights(painter, viewport, highlights);
        Ok(())
    }
}

fn draw_y_axis(
    painter: &Painter,
    y_axis: &YAxis,
    settings: &TrackSettings,
    viewport: &RenderViewport,
) {
    let plot = viewport.plot_rect();
    let gutter_right = plot.min.x - 2.0;

    painter.line_segment(
        [
            Pos2::new(plot.min.x, plot.min.y + PLOT_PADDING),
            Pos2::new(plot.min.x, plot.max.y - PLOT_PADDING),
        ],
        Stroke {
            width: 1.0,
            color: Color32::from_gray(150),
        },
    );

    if !y_axis.hide_ticks {
        let y_scale = LinearScale::new_reversed(
            y_axis.range,
            ((plot.min.y + PLOT_PADDING) as f64, (plot.max.y - PLOT_PADDING) as f64),
        );
        let (min, max) = y_axis.range;
        let mut ticks = vec![min, max];
        if min < 0.0 && 0.0 < max {
            ticks.push(0.0);
        }
        for tick in ticks {
            let _rect = painter.text(
                Pos2::new(gutter_right, y_scale.px(tick)),
                Align2::RIGHT_CENTER,
                format!("{tick}"),
                track_font(),
                Color32::from_gray(100),
            );
        }
    }

    let label = if y_axis.hide_label {
        &settings.track_label
    } else {
        &y_axis.label
    };
    let _rect = painter.text(
        Pos2::new(viewport.rect.min.x + 2.0, viewport.rect.min.y + 2.0),
        Align2::LEFT_TOP,
        label,
        track_font(),
        Color32::from_gray(60),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::RenderDot;

    #[test]
    fn test_clamp_inside_range_untouched() {
        assert_eq!(clamp_to_axis(0.5, (-2.0, 2.0)), (0.5, false));
        assert_eq!(clamp_to_axis(-2.0, (-2.0, 2.0)), (-2.0, false));
    }

    #[test]
    fn test_clamp_truncates_and_flags() {
        // a point at y=5 with range [-2,2] renders at the clamped bound
        assert_eq!(clamp_to_axis(5.0, (-2.0, 2.0)), (2.0, true));
        assert_eq!(clamp_to_axis(-7.5, (-2.0, 2.0)), (-2.0, true));
    }

    #[test]
    fn test_out_of_range_color_differs() {
        assert_ne!(OUT_OF_RANGE_COLOR, DOT_COLOR);
        assert_ne!(OUT_OF_RANGE_COLOR, HIGHLIGHTED_DOT_COLOR);
    }

    #[test]
    fn test_height_modes() {
        let sample = crate::data_source::Sample::new("c", "s");
        let mut settings = TrackSettings::new_coverage(&sample);
        let track = DotTrack::new(settings.track_id());
        assert_eq!(track.height(&settings), settings.collapsed_height);
        settings.is_expanded = true;
        assert_eq!(track.height(&settings), settings.expanded_height.unwrap());
    }

    #[test]
    fn test_clamped_dot_keeps_position() {
        // Clamping only moves the drawn value, not the genomic position.
        let dot = RenderDot { x: 100, y: 5.0 };
        let (value, out) = clamp_to_axis(dot.y, (-2.0, 2.0));
        assert!(out);
        assert_eq!(value, 2.0);
        assert_eq!(dot.x, 100);
    }
}
