//! Cytogenetic ideogram strip for the current chromosome, drawn between the
//! whole-genome overview and the data tracks. Band data comes from the
//! backend's chromosome info and is refetched only on chromosome change.

use crate::data_source::{FetchPayload, FetchRequest};
use crate::error::Result;
use crate::genome::GenomicRange;
use crate::scale::LinearScale;
use crate::track::{DataTrackCore, LoadState, track_font};
use eframe::egui::{self, Align2, Color32, Pos2, Rect, Sense, Stroke, Vec2};
use std::time::Instant;

pub const IDEOGRAM_HEIGHT: f32 = 16.0;

const VIEW_WINDOW_STROKE: Color32 = Color32::from_rgb(0xcc, 0x44, 0x22);

/// Giemsa stain shades, centromeres in red.
fn stain_color(stain: &str) -> Color32 {
    match stain {
        "gneg" => Color32::WHITE,
        "gpos25" => Color32::from_gray(200),
        "gpos50" => Color32::from_gray(150),
        "gpos75" => Color32::from_gray(100),
        "gpos100" => Color32::from_gray(40),
        "acen" => Color32::from_rgb(0xb4, 0x40, 0x40),
        "gvar" => Color32::from_gray(220),
        "stalk" => Color32::from_gray(170),
        _ => Color32::from_gray(230),
    }
}

pub struct IdeogramTrack {
    core: DataTrackCore,
    chrom: Option<String>,
}

impl IdeogramTrack {
    pub fn new() -> Self {
        Self {
            core: DataTrackCore::new("ideogram"),
            chrom: None,
        }
    }

    pub fn core(&self) -> &DataTrackCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut DataTrackCore {
        &mut self.core
    }

    /// Refetches band data when the chromosome actually changed.
    pub fn set_chromosome(&mut self, chrom: &str, now: Instant) {
        if self.chrom.as_deref() == Some(chrom) {
            return;
        }
        self.chrom = Some(chrom.to_string());
        self.core.mark_data_updated();
        let _scheduled = self.core.request_render(
            FetchRequest::ChromInfo {
                chrom: chrom.to_string(),
            },
            now,
        );
    }

    pub fn complete_fetch(&mut self, ticket: u64, result: Result<FetchPayload>) {
        let _applied = self.core.complete_fetch(ticket, result);
    }

    pub fn render(&mut self, ui: &mut egui::Ui, view_range: GenomicRange, chrom_size: u64) {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(ui.available_width(), IDEOGRAM_HEIGHT),
            Sense::hover(),
        );
        let rect = response.rect;

        let info = match (self.core.state(), self.core.data()) {
            (LoadState::Ready, Some(FetchPayload::Chrom(info))) => info,
            (LoadState::Error(_), _) => {
                // Band data is decoration; note the failure and move on.
                let _rect = painter.text(
                    rect.left_center(),
                    Align2::LEFT_CENTER,
                    "no cytoband data",
                    track_font(),
                    Color32::from_gray(150),
                );
                return;
            }
            _ => return,
        };

        let x_scale = LinearScale::new(
            (0.0, chrom_size as f64),
            (rect.min.x as f64, rect.max.x as f64),
        );
        for band in &info.bands {
            let band_rect = Rect::from_min_max(
                Pos2::new(x_scale.px(band.start as f64), rect.min.y + 2.0),
                Pos2::new(x_scale.px(band.end as f64), rect.max.y - 2.0),
            );
            painter.rect_filled(band_rect, 0.0, stain_color(&band.stain));
        }
        painter.rect_stroke(
            Rect::from_min_max(
                Pos2::new(rect.min.x, rect.min.y + 2.0),
                Pos2::new(rect.max.x, rect.max.y - 2.0),
            ),
            0.0,
            Stroke {
                width: 1.0,
                color: Color32::from_gray(140),
            },
            egui::StrokeKind::Inside,
        );

        // outline of the currently viewed window
        let window = Rect::from_min_max(
            Pos2::new(x_scale.px(view_range.start() as f64), rect.min.y),
            Pos2::new(x_scale.px(view_range.end() as f64), rect.max.y),
        );
        painter.rect_stroke(
            window,
            0.0,
            Stroke {
                width: 1.5,
                color: VIEW_WINDOW_STROKE,
            },
            egui::StrokeKind::Inside,
        );

        // hovered band name
        if let Some(pos) = response.hover_pos() {
            let genomic = x_scale.inverted().scale(pos.x as f64).max(0.0) as u64;
            if let Some(band) = info
                .bands
                .iter()
                .find(|b| b.start <= genomic && genomic < b.end)
            {
                response.on_hover_text(band.id.to_owned());
            }
        }
    }
}

impl Default for IdeogramTrack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{ChromInfo, CytoBand};

    #[test]
    fn test_stain_shades_are_distinct() {
        let stains = ["gneg", "gpos25", "gpos50", "gpos75", "gpos100", "acen"];
        let colors: Vec<Color32> = stains.iter().map(|s| stain_color(s)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        // unknown stains fall back instead of panicking
        let _color = stain_color("mystery");
    }

    #[test]
    fn test_chromosome_change_triggers_refetch() {
        let mut ideogram = IdeogramTrack::new();
        let t0 = Instant::now();
        ideogram.set_chromosome("1", t0);
        let job = ideogram
            .core_mut()
            .due_job(t0 + std::time::Duration::from_millis(60))
            .unwrap();
        assert!(matches!(
            job.request,
            FetchRequest::ChromInfo { ref chrom } if chrom == "1"
        ));
        ideogram.complete_fetch(
            job.ticket,
            Ok(FetchPayload::Chrom(ChromInfo {
                chrom: "1".to_string(),
                size: 1000,
                bands: vec![CytoBand {
                    id: "p11".to_string(),
                    start: 0,
                    end: 500,
                    stain: "gneg".to_string(),
                }],
            })),
        );
        assert_eq!(*ideogram.core().state(), LoadState::Ready);

        // same chromosome again: no new fetch
        ideogram.set_chromosome("1", t0);
        assert!(ideogram
            .core_mut()
            .due_job(t0 + std::time::Duration::from_millis(120))
            .is_none());

        // different chromosome: fetch again
        ideogram.set_chromosome("2", t0);
        assert!(ideogram
            .core_mut()
            .due_job(t0 + std::time::Duration::from_millis(120))
            .is_some());
    }
}
