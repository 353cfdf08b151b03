//! Track view plumbing shared by the band and dot renderers: fetch state
//! machine, hover-target registry, viewport scales and highlight overlay.

use crate::band_track::BandTrack;
use crate::data_source::{
    FetchJob, FetchPayload, FetchRequest, RenderBand, RenderDot, SubFeature,
};
use crate::dot_track::DotTrack;
use crate::error::{LocusViewError, Result};
use crate::genome::GenomicRange;
use crate::scale::LinearScale;
use crate::scheduler::{DebounceTimer, FETCH_DEBOUNCE, SequenceGuard};
use crate::track_settings::{TrackSettings, TrackType, VARIANT_QUALITY_THRESHOLD};
use eframe::egui::{Align2, Color32, FontFamily, FontId, Painter, Pos2, Rect, Stroke};
use lazy_static::lazy_static;
use log::debug;
use std::time::Instant;

/// Left gutter reserved for track labels and y-axis ticks.
pub const LEFT_GUTTER: f32 = 54.0;

lazy_static! {
    pub static ref FRAME_STROKE: Stroke = Stroke {
        width: 1.0,
        color: Color32::from_gray(180),
    };
    pub static ref HIGHLIGHT_FILL: Color32 = Color32::from_rgba_premultiplied(120, 160, 255, 40);
}

pub fn track_font() -> FontId {
    FontId {
        size: 10.0,
        family: FontFamily::Proportional,
    }
}

/// `#rrggbb` color spec from the data source, with a per-track fallback.
pub fn parse_band_color(spec: Option<&str>, fallback: Color32) -> Color32 {
    let Some(spec) = spec else {
        return fallback;
    };
    let hex = spec.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return fallback;
    }
    match (
        u8::from_str_radix(&hex[0..2], 16),
        u8::from_str_radix(&hex[2..4], 16),
        u8::from_str_radix(&hex[4..6], 16),
    ) {
        (Ok(r), Ok(g), Ok(b)) => Color32::from_rgb(r, g, b),
        _ => fallback,
    }
}

/// Source feature behind a hover target.
#[derive(Clone, Debug)]
pub enum HoverElement {
    Band(RenderBand),
    Exon(SubFeature),
    Intron { start: u64, end: u64 },
    Dot(RenderDot),
}

/// Clickable pixel rectangle, rebuilt on every draw.
#[derive(Clone, Debug)]
pub struct HoverBox {
    pub rect: Rect,
    pub label: String,
    pub element: HoverElement,
}

/// Screen area and genomic window a track draws into.
#[derive(Clone, Copy, Debug)]
pub struct RenderViewport {
    pub rect: Rect,
    pub range: GenomicRange,
}

impl RenderViewport {
    /// Plot area right of the label gutter.
    pub fn plot_rect(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(self.rect.min.x + LEFT_GUTTER, self.rect.min.y),
            self.rect.max,
        )
    }

    pub fn x_scale(&self) -> LinearScale {
        let plot = self.plot_rect();
        LinearScale::new(
            (self.range.start() as f64, self.range.end() as f64),
            (plot.min.x as f64, plot.max.x as f64),
        )
    }

    pub fn nts_per_pixel(&self) -> f64 {
        let width = self.plot_rect().width() as f64;
        if width <= 0.0 {
            return f64::MAX;
        }
        self.range.len() as f64 / width
    }
}

/// Fetch/display state of a data track.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LoadState {
    #[default]
    NoData,
    Loading,
    Ready,
    Error(String),
}

/// Shared base of every data track: debounced, sequence-guarded fetching and
/// the per-draw hover registry.
#[derive(Debug)]
pub struct DataTrackCore {
    track_id: String,
    data_updated: bool,
    state: LoadState,
    guard: SequenceGuard,
    debounce: DebounceTimer,
    pending: Option<FetchRequest>,
    data: Option<FetchPayload>,
    hover_boxes: Vec<HoverBox>,
}

impl DataTrackCore {
    pub fn new(track_id: &str) -> Self {
        Self {
            track_id: track_id.to_string(),
            data_updated: true,
            state: LoadState::NoData,
            guard: SequenceGuard::default(),
            debounce: DebounceTimer::new(FETCH_DEBOUNCE),
            pending: None,
            data: None,
            hover_boxes: vec![],
        }
    }

    #[inline(always)]
    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    #[inline(always)]
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    #[inline(always)]
    pub fn data(&self) -> Option<&FetchPayload> {
        self.data.as_ref()
    }

    /// Flags that the next render request must fetch fresh data.
    pub fn mark_data_updated(&mut self) {
        self.data_updated = true;
    }

    /// True when a fetch was scheduled; false means cached data suffices and
    /// the caller draws synchronously.
    pub fn request_render(&mut self, request: FetchRequest, now: Instant) -> bool {
        if !self.data_updated && self.data.is_some() {
            return false;
        }
        // Issue the ticket at request time so any in-flight result is already
        // stale by the time it lands.
        let _ticket = self.guard.next();
        self.state = LoadState::Loading;
        self.pending = Some(request);
        self.debounce.schedule(now);
        true
    }

    /// Polled once per frame; returns the coalesced job when the debounce
    /// window has elapsed.
    pub fn due_job(&mut self, now: Instant) -> Option<FetchJob> {
        if !self.debounce.fire(now) {
            return None;
        }
        self.pending.take().map(|request| FetchJob {
            track_id: self.track_id.to_owned(),
            ticket: self.guard.current(),
            request,
        })
    }

    /// Applies a finished fetch unless its ticket went stale. Failed fetches
    /// move the track to an error state instead of leaving it loading.
    pub fn complete_fetch(&mut self, ticket: u64, result: Result<FetchPayload>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!(
                "track {}: discarding stale fetch (ticket {ticket}, current {})",
                self.track_id,
                self.guard.current()
            );
            return false;
        }
        match result {
            Ok(payload) => {
                self.data = Some(payload);
                self.data_updated = false;
                self.state = LoadState::Ready;
                true
            }
            Err(err) => {
                // data_updated stays set, the next render request retries
                self.state = LoadState::Error(err.to_string());
                false
            }
        }
    }

    /// True while a fetch is debouncing or in flight; the app keeps
    /// repainting so the debounce deadline is observed without user input.
    pub fn is_busy(&self) -> bool {
        self.debounce.is_pending() || self.state == LoadState::Loading
    }

    pub fn clear_hover_boxes(&mut self) {
        self.hover_boxes.clear();
    }

    pub fn push_hover_box(&mut self, hover: HoverBox) {
        self.hover_boxes.push(hover);
    }

    pub fn hover_box_at(&self, pos: Pos2) -> Option<&HoverBox> {
        self.hover_boxes.iter().find(|h| h.rect.contains(pos))
    }

    /// Translucent overlay for the session highlight list; drawn over the
    /// plot area of every data track.
    pub fn draw_highlights(
        painter: &Painter,
        viewport: &RenderViewport,
        highlights: &[GenomicRange],
    ) {
        let plot = viewport.plot_rect();
        let x_scale = viewport.x_scale();
        for highlight in highlights {
            if !viewport
                .range
                .overlaps(highlight.start(), highlight.end())
            {
                continue;
            }
            let x1 = x_scale.px(highlight.start() as f64).max(plot.min.x);
            let x2 = x_scale.px(highlight.end() as f64).min(plot.max.x);
            painter.rect_filled(
                Rect::from_min_max(Pos2::new(x1, plot.min.y), Pos2::new(x2, plot.max.y)),
                0.0,
                *HIGHLIGHT_FILL,
            );
        }
    }

    /// Loading/error placeholder text in the middle of the track area.
    pub fn draw_state_notice(&self, painter: &Painter, rect: Rect) {
        let text = match &self.state {
            LoadState::Loading => "Loading ...".to_string(),
            LoadState::Error(message) => format!("Data error: {message}"),
            _ => return,
        };
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            text,
            track_font(),
            Color32::from_gray(110),
        );
    }
}

/// Builds the fetch request matching a track's settings. Settings that cannot
/// be mapped to a backend operation are caller bugs.
pub fn build_fetch_request(
    settings: &TrackSettings,
    chrom: &str,
    range: GenomicRange,
) -> Result<FetchRequest> {
    let sample = || {
        settings.sample.to_owned().ok_or_else(|| {
            LocusViewError::contract(format!(
                "track '{}' needs an owning sample",
                settings.track_label
            ))
        })
    };
    let source = || {
        settings.source_id.to_owned().ok_or_else(|| {
            LocusViewError::contract(format!(
                "track '{}' needs an annotation source",
                settings.track_label
            ))
        })
    };
    match settings.track_type {
        TrackType::Annotation | TrackType::GeneList => Ok(FetchRequest::AnnotationBands {
            track_id: source()?,
            chrom: chrom.to_string(),
        }),
        TrackType::Gene => Ok(FetchRequest::TranscriptBands {
            chrom: chrom.to_string(),
        }),
        TrackType::SampleAnnotation => Ok(FetchRequest::SampleAnnotationBands {
            sample: sample()?,
            source: source()?,
            chrom: chrom.to_string(),
        }),
        TrackType::Variant => Ok(FetchRequest::VariantBands {
            sample: sample()?,
            chrom: chrom.to_string(),
            threshold: VARIANT_QUALITY_THRESHOLD,
        }),
        TrackType::DotCov => Ok(FetchRequest::CovData {
            sample: sample()?,
            chrom: chrom.to_string(),
            range,
        }),
        TrackType::DotBaf => Ok(FetchRequest::BafData {
            sample: sample()?,
            chrom: chrom.to_string(),
            range,
        }),
        TrackType::Position => Err(LocusViewError::contract(
            "position tracks do not fetch data",
        )),
    }
}

/// Closed set of data track renderers, dispatched by match.
#[derive(Debug)]
pub enum TrackView {
    Band(BandTrack),
    Dot(DotTrack),
}

impl TrackView {
    /// Constructs the matching view for a setting.
    pub fn for_settings(settings: &TrackSettings) -> Result<Self> {
        match settings.track_type {
            TrackType::Annotation
            | TrackType::Gene
            | TrackType::GeneList
            | TrackType::SampleAnnotation
            | TrackType::Variant => Ok(Self::Band(BandTrack::new(settings.track_id()))),
            TrackType::DotCov | TrackType::DotBaf => {
                Ok(Self::Dot(DotTrack::new(settings.track_id())))
            }
            TrackType::Position => Err(LocusViewError::contract(
                "position tracks have no data view",
            )),
        }
    }

    pub fn core(&self) -> &DataTrackCore {
        match self {
            Self::Band(track) => track.core(),
            Self::Dot(track) => track.core(),
        }
    }

    pub fn core_mut(&mut self) -> &mut DataTrackCore {
        match self {
            Self::Band(track) => track.core_mut(),
            Self::Dot(track) => track.core_mut(),
        }
    }

    /// Height the track wants for the next frame.
    pub fn height(&self, settings: &TrackSettings) -> f32 {
        match self {
            Self::Band(track) => track.height(settings),
            Self::Dot(track) => track.height(settings),
        }
    }

    pub fn request_render(
        &mut self,
        settings: &TrackSettings,
        chrom: &str,
        range: GenomicRange,
        now: Instant,
    ) -> Result<()> {
        let request = build_fetch_request(settings, chrom, range)?;
        let _scheduled = self.core_mut().request_render(request, now);
        Ok(())
    }

    pub fn draw(
        &mut self,
        painter: &Painter,
        settings: &TrackSettings,
        viewport: &RenderViewport,
        highlights: &[GenomicRange],
    ) -> Result<()> {
        match self {
            Self::Band(track) => track.draw(painter, settings, viewport, highlights),
            Self::Dot(track) => track.draw(painter, settings, viewport, highlights),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::Sample;
    use std::time::Duration;

    fn annotation_request() -> FetchRequest {
        FetchRequest::TranscriptBands {
            chrom: "1".to_string(),
        }
    }

    fn bands_payload(n: usize) -> FetchPayload {
        FetchPayload::Bands(
            (0..n)
                .map(|i| RenderBand {
                    id: format!("band-{i}"),
                    start: i as u64 * 10,
                    end: i as u64 * 10 + 5,
                    ..Default::default()
                })
                .collect(),
        )
    }

    #[test]
    fn test_first_render_schedules_fetch() {
        let mut core = DataTrackCore::new("t1");
        let t0 = Instant::now();
        assert!(core.request_render(annotation_request(), t0));
        assert_eq!(*core.state(), LoadState::Loading);
        assert!(core.due_job(t0).is_none());
        let job = core.due_job(t0 + Duration::from_millis(60)).unwrap();
        assert_eq!(job.ticket, 1);
    }

    #[test]
    fn test_cached_data_renders_without_fetch() {
        let mut core = DataTrackCore::new("t1");
        let t0 = Instant::now();
        let _scheduled = core.request_render(annotation_request(), t0);
        let job = core.due_job(t0 + Duration::from_millis(60)).unwrap();
        assert!(core.complete_fetch(job.ticket, Ok(bands_payload(2))));
        // No data change: the next render request draws from cache.
        assert!(!core.request_render(annotation_request(), t0 + Duration::from_millis(100)));
        assert_eq!(*core.state(), LoadState::Ready);
    }

    #[test]
    fn test_interleaved_fetches_last_request_wins() {
        let mut core = DataTrackCore::new("t1");
        let t0 = Instant::now();

        // First render request; its job is dispatched.
        let _scheduled = core.request_render(annotation_request(), t0);
        let first_job = core.due_job(t0 + Duration::from_millis(60)).unwrap();

        // Second render request while the first fetch is in flight.
        core.mark_data_updated();
        let _scheduled =
            core.request_render(annotation_request(), t0 + Duration::from_millis(70));
        let second_job = core.due_job(t0 + Duration::from_millis(130)).unwrap();

        // The first fetch resolves after the second was issued: discarded,
        // even though it arrives first.
        assert!(!core.complete_fetch(first_job.ticket, Ok(bands_payload(1))));
        assert!(core.data().is_none());
        assert!(core.complete_fetch(second_job.ticket, Ok(bands_payload(2))));
        assert!(matches!(
            core.data(),
            Some(FetchPayload::Bands(bands)) if bands.len() == 2
        ));
    }

    #[test]
    fn test_burst_coalesces_into_one_job() {
        let mut core = DataTrackCore::new("t1");
        let t0 = Instant::now();
        for ms in [0u64, 10, 20, 30] {
            core.mark_data_updated();
            let _scheduled =
                core.request_render(annotation_request(), t0 + Duration::from_millis(ms));
        }
        // Window restarts with each request; only one job comes due.
        assert!(core.due_job(t0 + Duration::from_millis(75)).is_none());
        let job = core.due_job(t0 + Duration::from_millis(81)).unwrap();
        assert_eq!(job.ticket, 4);
        assert!(core.due_job(t0 + Duration::from_millis(200)).is_none());
    }

    #[test]
    fn test_fetch_failure_shows_error_state_and_retries() {
        let mut core = DataTrackCore::new("t1");
        let t0 = Instant::now();
        let _scheduled = core.request_render(annotation_request(), t0);
        let job = core.due_job(t0 + Duration::from_millis(60)).unwrap();
        let _applied = core.complete_fetch(job.ticket, Err("boom".to_string().into()));
        assert!(matches!(core.state(), LoadState::Error(_)));
        // The failure leaves the data flag set, so a later render retries.
        assert!(core.request_render(annotation_request(), t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_parse_band_color() {
        assert_eq!(
            parse_band_color(Some("#ff0080"), Color32::GRAY),
            Color32::from_rgb(255, 0, 128)
        );
        assert_eq!(parse_band_color(Some("bogus"), Color32::GRAY), Color32::GRAY);
        assert_eq!(parse_band_color(None, Color32::GRAY), Color32::GRAY);
    }

    #[test]
    fn test_build_fetch_request_contract() {
        let mut settings = TrackSettings::new_coverage(&Sample::new("c", "s"));
        settings.sample = None;
        let range = GenomicRange::new(0, 10).unwrap();
        assert!(build_fetch_request(&settings, "1", range)
            .unwrap_err()
            .is_contract_violation());
    }
}
