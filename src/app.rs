//! eframe application shell: wires the session, the fetch worker, the track
//! views and the overview into one window.

use crate::data_source::{
    AnnotationSourceInfo, DataSource, FetchWorker, FileDataSource, HttpDataSource, Sample,
};
use crate::genome::GenomicRange;
use crate::ideogram::IdeogramTrack;
use crate::layout::LayoutRecord;
use crate::overview_track::{OverviewAction, OverviewTrack};
use crate::session::Session;
use crate::track::{RenderViewport, TrackView, track_font};
use crate::track_collection::ShiftDirection;
use anyhow::{Context, Result};
use eframe::egui::{self, Align2, Color32, Pos2, Rect, Sense, Vec2, menu};
use log::{debug, error, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct LocusViewApp {
    session: Session,
    source: Arc<dyn DataSource>,
    worker: FetchWorker,
    views: HashMap<String, TrackView>,
    overview: OverviewTrack,
    ideogram: IdeogramTrack,
    available_samples: Vec<Sample>,
    available_annotations: Vec<AnnotationSourceInfo>,
    region_input: String,
    status: Option<String>,
    drag_anchor: Option<f32>,
}

impl LocusViewApp {
    /// `location` is a data directory or an `http(s)://` base URL; `None`
    /// starts with an empty backend until one is opened from the menu.
    pub fn new(location: Option<&str>) -> Self {
        let source = Self::make_source(location.unwrap_or(""));
        let worker = FetchWorker::new(source.clone());
        let mut app = Self {
            session: Session::new(),
            source,
            worker,
            views: HashMap::new(),
            overview: OverviewTrack::new(),
            ideogram: IdeogramTrack::new(),
            available_samples: vec![],
            available_annotations: vec![],
            region_input: String::new(),
            status: None,
            drag_anchor: None,
        };
        app.reload_catalogs();
        app
    }

    fn make_source(location: &str) -> Arc<dyn DataSource> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Arc::new(HttpDataSource::new(location))
        } else {
            Arc::new(FileDataSource::new(location.to_string()))
        }
    }

    fn open_location(&mut self, location: &str) {
        self.source = Self::make_source(location);
        self.worker = FetchWorker::new(self.source.clone());
        self.views.clear();
        self.overview = OverviewTrack::new();
        self.ideogram = IdeogramTrack::new();
        self.session = Session::new();
        self.reload_catalogs();
    }

    fn reload_catalogs(&mut self) {
        match self.source.list_annotation_tracks() {
            Ok(annotations) => self.available_annotations = annotations,
            Err(err) => {
                self.status = Some(format!("Could not list annotation tracks: {err}"));
            }
        }
        match self.source.list_samples() {
            Ok(samples) => self.available_samples = samples,
            Err(err) => self.status = Some(format!("Could not list samples: {err}")),
        }
    }

    /// Applies a synchronizer outcome to the view registry.
    fn apply_sync_outcome(&mut self) {
        let outcome = self.session.sync_tracks();
        for track_id in &outcome.removed {
            let _view = self.views.remove(track_id);
            debug!("detached track view {track_id}");
        }
        for track_id in &outcome.added {
            let Ok(settings) = self.session.tracks().get(track_id) else {
                continue;
            };
            match TrackView::for_settings(settings) {
                Ok(view) => {
                    let _previous = self.views.insert(track_id.to_string(), view);
                }
                Err(err) => error!("cannot attach view for '{track_id}': {err}"),
            }
        }
    }

    /// Asks every visible track (and the overview) for fresh data.
    fn request_renders(&mut self, now: Instant, position_changed: bool) {
        let chrom = self.session.chromosome().to_string();
        let range = self.session.view_range();
        for settings in self.session.tracks().all() {
            if settings.is_hidden {
                continue;
            }
            let Some(view) = self.views.get_mut(settings.track_id()) else {
                continue;
            };
            if position_changed {
                view.core_mut().mark_data_updated();
            }
            if let Err(err) = view.request_render(settings, &chrom, range, now) {
                error!("render request failed: {err}");
                self.status = Some(err.to_string());
            }
        }
        self.overview
            .set_sample(self.session.selected_samples().first(), now);
        self.ideogram.set_chromosome(&chrom, now);
    }

    fn pump_worker(&mut self, now: Instant) {
        for outcome in self.worker.poll() {
            if outcome.track_id == "overview" {
                self.overview.complete_fetch(outcome.ticket, outcome.result);
            } else if outcome.track_id == "ideogram" {
                self.ideogram.complete_fetch(outcome.ticket, outcome.result);
            } else if let Some(view) = self.views.get_mut(&outcome.track_id) {
                let _applied = view.core_mut().complete_fetch(outcome.ticket, outcome.result);
            } else {
                debug!("dropping fetch result for removed track {}", outcome.track_id);
            }
        }
        // dispatch fetches whose debounce window elapsed
        let mut jobs = vec![];
        for view in self.views.values_mut() {
            if let Some(job) = view.core_mut().due_job(now) {
                jobs.push(job);
            }
        }
        if let Some(job) = self.overview.core_mut().due_job(now) {
            jobs.push(job);
        }
        if let Some(job) = self.ideogram.core_mut().due_job(now) {
            jobs.push(job);
        }
        for job in jobs {
            self.worker.submit(job);
        }
    }

    fn render_menu_bar(&mut self, ui: &mut egui::Ui) {
        menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open data directory ...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.open_location(&path.display().to_string());
                    }
                }
                if ui.button("Save track layout ...").clicked() {
                    self.save_layout();
                }
                if ui.button("Load track layout ...").clicked() {
                    self.load_layout();
                }
            });
            ui.separator();
            let marker = self.session.marker_mode();
            if ui
                .selectable_label(marker, "Marker mode")
                .on_hover_text("Drag on a track to mark a region instead of panning")
                .clicked()
            {
                self.session.toggle_marker_mode();
            }
            if ui.button("Clear marks").clicked() {
                self.session.clear_highlights();
            }
            ui.separator();
            let response = ui.text_edit_singleline(&mut self.region_input);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                let region = self.region_input.to_owned();
                if let Err(err) = self.session.go_to_region(&region) {
                    self.status = Some(err.to_string());
                }
            }
        });
    }

    fn try_save_layout(&self, path: &Path) -> Result<()> {
        let record = LayoutRecord::capture(self.session.tracks())
            .with_context(|| "layout capture failed".to_string())?;
        record
            .save_to_file(path)
            .with_context(|| format!("could not write {}", path.display()))?;
        Ok(())
    }

    fn save_layout(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("layout.json")
            .save_file()
        else {
            return;
        };
        if let Err(err) = self.try_save_layout(&path) {
            self.status = Some(format!("Could not save layout: {err}"));
        }
    }

    fn try_load_layout(&mut self, path: &Path) -> Result<()> {
        let record = LayoutRecord::load_from_file(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        record.apply(self.session.tracks_mut())?;
        Ok(())
    }

    fn load_layout(&mut self) {
        let Some(path) = rfd::FileDialog::new().pick_file() else {
            return;
        };
        match self.try_load_layout(&path) {
            Ok(()) => self.request_renders(Instant::now(), false),
            Err(err) => self.status = Some(format!("Could not load layout: {err}")),
        }
    }

    fn render_selection_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Samples");
        for sample in self.available_samples.to_owned() {
            let mut selected = self.session.is_sample_selected(&sample);
            if ui.checkbox(&mut selected, &sample.sample_id).changed() {
                if selected {
                    let sources = self
                        .source
                        .list_sample_annotation_sources(&sample)
                        .unwrap_or_else(|err| {
                            warn!("no annotation sources for {}: {err}", sample.key());
                            vec![]
                        });
                    self.session.select_sample(&sample, sources);
                } else {
                    self.session.deselect_sample(&sample);
                }
            }
        }

        ui.separator();
        ui.heading("Annotations");
        for info in self.available_annotations.to_owned() {
            let mut selected = self.session.is_annotation_selected(&info.track_id);
            if ui.checkbox(&mut selected, &info.label).changed() {
                if selected {
                    self.session.select_annotation(&info);
                } else {
                    self.session.deselect_annotation(&info.track_id);
                }
            }
        }

        ui.separator();
        ui.heading("Tracks");
        enum TrackAction {
            ToggleHidden(String),
            ToggleExpanded(String),
            Shift(String, ShiftDirection),
        }
        let mut actions = vec![];
        for settings in self.session.tracks().all() {
            ui.horizontal(|ui| {
                let mut shown = !settings.is_hidden;
                if ui.checkbox(&mut shown, "").changed() {
                    actions.push(TrackAction::ToggleHidden(settings.track_id().to_string()));
                }
                if ui
                    .selectable_label(settings.is_expanded, &settings.track_label)
                    .clicked()
                {
                    actions.push(TrackAction::ToggleExpanded(settings.track_id().to_string()));
                }
                if ui.small_button("up").clicked() {
                    actions.push(TrackAction::Shift(
                        settings.track_id().to_string(),
                        ShiftDirection::Up,
                    ));
                }
                if ui.small_button("dn").clicked() {
                    actions.push(TrackAction::Shift(
                        settings.track_id().to_string(),
                        ShiftDirection::Down,
                    ));
                }
            });
        }
        let mut render_needed = false;
        for action in actions {
            let result = match action {
                TrackAction::ToggleHidden(id) => {
                    render_needed = true;
                    self.session.tracks_mut().toggle_hidden(&id)
                }
                TrackAction::ToggleExpanded(id) => self.session.tracks_mut().toggle_expanded(&id),
                TrackAction::Shift(id, direction) => {
                    self.session.tracks_mut().shift(&id, direction)
                }
            };
            if let Err(err) = result {
                error!("track operation failed: {err}");
            }
        }
        if render_needed {
            self.request_renders(Instant::now(), false);
        }
    }

    fn render_tracks(&mut self, ui: &mut egui::Ui) {
        let chrom = self.session.chromosome().to_string();
        let range = self.session.view_range();

        if let Some(action) = self.overview.render(ui, self.session.genome(), &chrom, range) {
            match action {
                OverviewAction::SelectChromosome(chrom) => {
                    if let Err(err) = self.session.set_chromosome(&chrom) {
                        self.status = Some(err.to_string());
                    }
                }
                OverviewAction::SetViewRange(range) => self.session.set_view_range(range),
            }
        }
        let chrom_size = self
            .session
            .genome()
            .size_of(&chrom)
            .unwrap_or(range.end().max(1));
        self.ideogram.render(ui, range, chrom_size);
        ui.separator();

        let highlights = self.session.highlights().to_vec();
        let track_ids: Vec<String> = self
            .session
            .tracks()
            .all()
            .iter()
            .filter(|t| !t.is_hidden)
            .map(|t| t.track_id().to_string())
            .collect();

        let mut pan: Option<i64> = None;
        let mut zoom: Option<f64> = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            for track_id in &track_ids {
                let Some(view) = self.views.get_mut(track_id) else {
                    continue;
                };
                let Ok(settings) = self.session.tracks().get(track_id) else {
                    continue;
                };
                let height = view.height(settings);
                let (response, painter) = ui.allocate_painter(
                    Vec2::new(ui.available_width(), height),
                    Sense::click_and_drag(),
                );
                let viewport = RenderViewport {
                    rect: response.rect,
                    range,
                };
                painter.rect_stroke(
                    response.rect,
                    0.0,
                    *crate::track::FRAME_STROKE,
                    egui::StrokeKind::Inside,
                );
                if let Err(err) = view.draw(&painter, settings, &viewport, &highlights) {
                    error!("draw failed for {track_id}: {err}");
                    self.status = Some(err.to_string());
                }

                if response.double_clicked() {
                    let _result = self.session.tracks_mut().toggle_expanded(track_id);
                }

                // hover tooltip from the per-draw hover registry
                if let Some(pos) = response.hover_pos() {
                    if let Some(hover) = view.core().hover_box_at(pos) {
                        let label = hover.label.to_owned();
                        let galley_pos = Pos2::new(pos.x + 12.0, pos.y - 4.0);
                        let bg = Rect::from_min_size(
                            galley_pos,
                            Vec2::new(7.0 * label.len() as f32, 14.0),
                        );
                        painter.rect_filled(bg, 2.0, Color32::from_rgba_premultiplied(
                            30, 30, 30, 220,
                        ));
                        let _rect = painter.text(
                            bg.left_center() + Vec2::new(3.0, 0.0),
                            Align2::LEFT_CENTER,
                            label,
                            track_font(),
                            Color32::WHITE,
                        );
                    }
                }

                let nts_per_px = viewport.nts_per_pixel();
                if response.dragged() {
                    if self.session.marker_mode() {
                        if self.drag_anchor.is_none() {
                            self.drag_anchor =
                                response.interact_pointer_pos().map(|pos| pos.x);
                        }
                    } else {
                        let delta = response.drag_delta().x;
                        if delta != 0.0 {
                            pan = Some((-delta as f64 * nts_per_px) as i64);
                        }
                    }
                }
                if response.drag_stopped() {
                    if let (Some(anchor), Some(pos)) =
                        (self.drag_anchor.take(), response.interact_pointer_pos())
                    {
                        let x_to_genomic = viewport.x_scale().inverted();
                        let a = x_to_genomic.scale(anchor as f64).max(0.0) as u64;
                        let b = x_to_genomic.scale(pos.x as f64).max(0.0) as u64;
                        self.session.add_highlight(GenomicRange::ordered(a, b));
                    }
                }
                if response.hovered() {
                    let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                    if scroll != 0.0 {
                        zoom = Some((1.1f64).powf((-scroll / 40.0) as f64));
                    }
                }
            }
        });

        if let Some(distance) = pan {
            self.session
                .set_view_range(range.panned(distance, chrom_size));
        }
        if let Some(factor) = zoom {
            self.session
                .set_view_range(range.zoomed(factor, chrom_size));
        }
    }

    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let range = self.session.view_range();
            ui.label(format!(
                "{}:{}-{}",
                self.session.chromosome(),
                range.start(),
                range.end()
            ));
            if let Some(status) = &self.status {
                ui.separator();
                ui.colored_label(Color32::from_rgb(0xc0, 0x30, 0x30), status);
            }
        });
    }
}

impl eframe::App for LocusViewApp {
    fn ui(&mut self, ui: &mut egui::Ui, frame: &mut eframe::Frame) {
        let ctx = ui.ctx().clone();
        self.update(&ctx, frame);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.pump_worker(now);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            self.render_menu_bar(ui);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.render_status_bar(ui);
        });
        egui::SidePanel::left("selection")
            .default_width(190.0)
            .show(ctx, |ui| {
                self.render_selection_panel(ui);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_tracks(ui);
        });

        if self.session.take_selection_dirty() {
            self.apply_sync_outcome();
            self.request_renders(now, false);
        }
        if self.session.take_position_dirty() {
            self.request_renders(now, true);
        }

        // keep frames coming while debounce windows and fetches are open
        let busy = self.views.values().any(|view| view.core().is_busy())
            || self.overview.core().is_busy()
            || self.ideogram.core().is_busy();
        if busy {
            ctx.request_repaint_after(Duration::from_millis(25));
        }
    }
}
