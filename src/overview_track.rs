//! Whole-genome overview: every chromosome side by side, coverage dots
//! rasterized into an offscreen buffer that survives pan/zoom frames.
//!
//! The raster is rebuilt only when data, size or sample changes; normal
//! frames reuse the uploaded texture and repaint just the view marker and
//! labels on top.

use crate::data_source::{FetchPayload, FetchRequest, RenderDot, Sample};
use crate::error::Result;
use crate::genome::{Genome, GenomicRange};
use crate::scale::LinearScale;
use crate::track::{DataTrackCore, LoadState, track_font};
use crate::track_settings::COV_Y_RANGE;
use eframe::egui::{
    self, Align2, Color32, ColorImage, Painter, Pos2, Rect, Sense, Stroke, TextureHandle,
    TextureOptions, Vec2,
};
use rayon::prelude::*;
use std::collections::HashMap;

pub const OVERVIEW_HEIGHT: f32 = 90.0;

/// Raster oversampling factor for sharper dots on dense displays.
pub const OVERSAMPLE: usize = 2;

const BACKGROUND: Color32 = Color32::from_rgb(0xfa, 0xfa, 0xf8);
const SEPARATOR: Color32 = Color32::from_rgb(0xd8, 0xd8, 0xd4);
const AXIS: Color32 = Color32::from_rgb(0xe4, 0xe4, 0xe0);
const DOT: Color32 = Color32::from_rgb(0x45, 0x5a, 0x85);
const MARKER_STROKE: Color32 = Color32::from_rgb(0xcc, 0x44, 0x22);

/// Per-chromosome pixel span `(name, x_start, x_end)` across `width` pixels.
pub fn chromosome_spans(genome: &Genome, width: f32) -> Vec<(String, f32, f32)> {
    let scale = LinearScale::new((0.0, genome.total_size() as f64), (0.0, width as f64));
    genome
        .iter()
        .map(|(name, size, offset)| {
            (
                name.to_string(),
                scale.px(offset as f64),
                scale.px((offset + size) as f64),
            )
        })
        .collect()
}

/// Chromosome under an x pixel, if any.
pub fn resolve_chromosome(spans: &[(String, f32, f32)], x: f32) -> Option<&str> {
    spans
        .iter()
        .find(|(_, x1, x2)| *x1 <= x && x < *x2)
        .map(|(name, _, _)| name.as_str())
}

/// Rasterizes the expensive layer: background, chromosome separators and all
/// scatter points. Chromosomes rasterize in parallel, pixel writes apply
/// serially.
pub fn build_raster(
    data: &HashMap<String, Vec<RenderDot>>,
    genome: &Genome,
    width: usize,
    height: usize,
) -> ColorImage {
    if width == 0 || height == 0 {
        return ColorImage::filled([0, 0], BACKGROUND);
    }
    let mut image = ColorImage::filled([width, height], BACKGROUND);
    let spans = chromosome_spans(genome, width as f32);

    let y_scale = LinearScale::new_reversed(COV_Y_RANGE, (1.0, height as f64 - 2.0));

    // neutral-coverage axis line, then one separator per chromosome boundary
    let axis_y = (y_scale.scale(0.0) as usize).min(height - 1);
    for x in 0..width {
        image[(x, axis_y)] = AXIS;
    }
    for (_, x1, _) in spans.iter().skip(1) {
        let x = *x1 as usize;
        if x < width {
            for y in 0..height {
                image[(x, y)] = SEPARATOR;
            }
        }
    }
    let pixels: Vec<(usize, usize)> = spans
        .par_iter()
        .flat_map(|(name, x1, x2)| {
            let Some(dots) = data.get(name) else {
                return vec![];
            };
            let Ok(size) = genome.size_of(name) else {
                return vec![];
            };
            let x_scale =
                LinearScale::new((0.0, size as f64), (*x1 as f64, *x2 as f64));
            dots.iter()
                .map(|dot| {
                    let x = x_scale.scale(dot.x as f64) as usize;
                    let y = y_scale.scale(dot.y.clamp(COV_Y_RANGE.0, COV_Y_RANGE.1)) as usize;
                    (x.min(width - 1), y.min(height - 1))
                })
                .collect::<Vec<_>>()
        })
        .collect();
    for (x, y) in pixels {
        image[(x, y)] = DOT;
    }
    image
}

/// Interaction the caller should apply to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum OverviewAction {
    SelectChromosome(String),
    SetViewRange(GenomicRange),
}

pub struct OverviewTrack {
    core: DataTrackCore,
    sample: Option<Sample>,
    texture: Option<TextureHandle>,
    buffered_size: (usize, usize),
    raster_dirty: bool,
}

impl OverviewTrack {
    pub fn new() -> Self {
        Self {
            core: DataTrackCore::new("overview"),
            sample: None,
            texture: None,
            buffered_size: (0, 0),
            raster_dirty: true,
        }
    }

    pub fn core(&self) -> &DataTrackCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut DataTrackCore {
        &mut self.core
    }

    /// Points the overview at a sample; same sample is a no-op, a different
    /// one invalidates data and raster.
    pub fn set_sample(&mut self, sample: Option<&Sample>, now: std::time::Instant) {
        if self.sample.as_ref() == sample {
            return;
        }
        self.sample = sample.cloned();
        self.raster_dirty = true;
        match &self.sample {
            Some(sample) => {
                self.core.mark_data_updated();
                let _scheduled = self.core.request_render(
                    FetchRequest::OverviewCovData {
                        sample: sample.to_owned(),
                    },
                    now,
                );
            }
            None => {
                // drop stale data along with the sample
                self.core = DataTrackCore::new("overview");
                self.texture = None;
            }
        }
    }

    pub fn complete_fetch(
        &mut self,
        ticket: u64,
        result: Result<FetchPayload>,
    ) {
        if self.core.complete_fetch(ticket, result) {
            self.raster_dirty = true;
        }
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        genome: &Genome,
        current_chrom: &str,
        view_range: GenomicRange,
    ) -> Option<OverviewAction> {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(ui.available_width(), OVERVIEW_HEIGHT),
            Sense::click_and_drag(),
        );
        let rect = response.rect;
        let spans = chromosome_spans(genome, rect.width());

        if matches!(self.core.state(), LoadState::Ready) {
            self.refresh_raster(ui.ctx(), genome, rect);
            if let Some(texture) = &self.texture {
                painter.image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        } else {
            painter.rect_filled(rect, 0.0, BACKGROUND);
            self.core.draw_state_notice(&painter, rect);
        }

        self.draw_overlay(&painter, rect, &spans, genome, current_chrom, view_range);

        // Click selects a chromosome; dragging moves the view marker within
        // the current one.
        if response.clicked() {
            let pos = response.interact_pointer_pos()?;
            let chrom = resolve_chromosome(&spans, pos.x - rect.min.x)?;
            return Some(OverviewAction::SelectChromosome(chrom.to_string()));
        }
        if response.dragged() {
            let delta = response.drag_delta().x;
            let (_, x1, x2) = spans.iter().find(|(name, _, _)| name == current_chrom)?;
            let chrom_size = genome.size_of(current_chrom).ok()?;
            let nts_per_px = chrom_size as f64 / (x2 - x1).max(1.0) as f64;
            let distance = (delta as f64 * nts_per_px) as i64;
            return Some(OverviewAction::SetViewRange(
                view_range.panned(distance, chrom_size),
            ));
        }
        None
    }

    fn refresh_raster(&mut self, ctx: &egui::Context, genome: &Genome, rect: Rect) {
        let size = (
            (rect.width() as usize * OVERSAMPLE).max(OVERSAMPLE),
            (rect.height() as usize * OVERSAMPLE).max(OVERSAMPLE),
        );
        if !self.raster_dirty && self.buffered_size == size && self.texture.is_some() {
            return;
        }
        let Some(FetchPayload::OverviewDots(data)) = self.core.data() else {
            return;
        };
        let image = build_raster(data, genome, size.0, size.1);
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("overview-raster", image, TextureOptions::LINEAR));
            }
        }
        self.buffered_size = size;
        self.raster_dirty = false;
    }

    /// Cheap per-frame layer: chromosome names, sample label, view marker.
    fn draw_overlay(
        &self,
        painter: &Painter,
        rect: Rect,
        spans: &[(String, f32, f32)],
        genome: &Genome,
        current_chrom: &str,
        view_range: GenomicRange,
    ) {
        for (name, x1, x2) in spans {
            let _rect = painter.text(
                Pos2::new(rect.min.x + (x1 + x2) / 2.0, rect.min.y + 1.0),
                Align2::CENTER_TOP,
                name,
                track_font(),
                Color32::from_gray(120),
            );
        }
        if let Some(sample) = &self.sample {
            let _rect = painter.text(
                Pos2::new(rect.min.x + 3.0, rect.max.y - 2.0),
                Align2::LEFT_BOTTOM,
                &sample.sample_id,
                track_font(),
                Color32::from_gray(90),
            );
        }

        if let (Some((_, x1, x2)), Ok(chrom_size)) = (
            spans.iter().find(|(name, _, _)| name == current_chrom),
            genome.size_of(current_chrom),
        ) {
            let x_scale = LinearScale::new(
                (0.0, chrom_size as f64),
                ((rect.min.x + x1) as f64, (rect.min.x + x2) as f64),
            );
            let marker = Rect::from_min_max(
                Pos2::new(x_scale.px(view_range.start() as f64), rect.min.y),
                Pos2::new(x_scale.px(view_range.end() as f64), rect.max.y),
            );
            painter.rect_stroke(
                marker,
                0.0,
                Stroke {
                    width: 1.5,
                    color: MARKER_STROKE,
                },
                egui::StrokeKind::Inside,
            );
        }
    }
}

impl Default for OverviewTrack {
    fn default() -> Self {
        Self::new()
    }
}
