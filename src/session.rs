//! Canonical mutable session state: position, selections, highlights and the
//! track collection. Views never mutate this directly; everything goes
//! through the narrow setters here.

use crate::data_source::{AnnotationSourceInfo, Sample};
use crate::error::Result;
use crate::genome::{GENOME, Genome, GenomicRange};
use crate::track_collection::TrackCollection;
use crate::track_sync::{SyncOutcome, SyncRequest, synchronize_tracks};
use std::collections::HashMap;

/// Narrower than this many nucleotides, zooming in stops.
const MIN_VIEW_SPAN: u64 = 40;

pub struct Session {
    genome: &'static Genome,
    chromosome: String,
    view_range: GenomicRange,
    marker_mode: bool,
    highlights: Vec<GenomicRange>,
    selected_samples: Vec<Sample>,
    selected_annotations: Vec<AnnotationSourceInfo>,
    selected_gene_lists: Vec<AnnotationSourceInfo>,
    sample_annotation_sources: HashMap<String, Vec<String>>,
    tracks: TrackCollection,
    position_dirty: bool,
    selection_dirty: bool,
}

impl Session {
    pub fn new() -> Self {
        let chromosome = "1".to_string();
        let view_range = GENOME
            .full_range(&chromosome)
            .unwrap_or_else(|_| GenomicRange::ordered(0, 1));
        Self {
            genome: &GENOME,
            chromosome,
            view_range,
            marker_mode: false,
            highlights: vec![],
            selected_samples: vec![],
            selected_annotations: vec![],
            selected_gene_lists: vec![],
            sample_annotation_sources: HashMap::new(),
            tracks: TrackCollection::default(),
            position_dirty: true,
            selection_dirty: true,
        }
    }

    #[inline(always)]
    pub fn genome(&self) -> &Genome {
        self.genome
    }

    #[inline(always)]
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    #[inline(always)]
    pub fn view_range(&self) -> GenomicRange {
        self.view_range
    }

    #[inline(always)]
    pub fn marker_mode(&self) -> bool {
        self.marker_mode
    }

    pub fn toggle_marker_mode(&mut self) {
        self.marker_mode = !self.marker_mode;
    }

    #[inline(always)]
    pub fn highlights(&self) -> &[GenomicRange] {
        &self.highlights
    }

    pub fn add_highlight(&mut self, range: GenomicRange) {
        self.highlights.push(range);
    }

    pub fn clear_highlights(&mut self) {
        self.highlights.clear();
    }

    pub fn tracks(&self) -> &TrackCollection {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut TrackCollection {
        &mut self.tracks
    }

    pub fn selected_samples(&self) -> &[Sample] {
        &self.selected_samples
    }

    pub fn selected_annotations(&self) -> &[AnnotationSourceInfo] {
        &self.selected_annotations
    }

    pub fn set_chromosome(&mut self, chrom: &str) -> Result<()> {
        let full_range = self.genome.full_range(chrom)?;
        self.chromosome = chrom.trim_start_matches("chr").to_ascii_uppercase();
        self.view_range = full_range;
        self.highlights.clear();
        self.position_dirty = true;
        Ok(())
    }

    /// Clamps into the chromosome and enforces the minimum span.
    pub fn set_view_range(&mut self, range: GenomicRange) {
        let Ok(size) = self.genome.size_of(&self.chromosome) else {
            return;
        };
        let start = range.start().min(size);
        let mut end = range.end().min(size);
        if end - start < MIN_VIEW_SPAN {
            end = (start + MIN_VIEW_SPAN).min(size);
        }
        let clamped = GenomicRange::ordered(start, end);
        if clamped != self.view_range {
            self.view_range = clamped;
            self.position_dirty = true;
        }
    }

    /// Jumps to a region given as `chrom:start-end`.
    pub fn go_to_region(&mut self, text: &str) -> Result<()> {
        let (chrom, range) = crate::genome::parse_region(text, self.genome)?;
        self.set_chromosome(&chrom)?;
        self.set_view_range(range);
        Ok(())
    }

    pub fn select_sample(&mut self, sample: &Sample, annotation_sources: Vec<String>) {
        if self.selected_samples.iter().any(|s| s.key() == sample.key()) {
            return;
        }
        let _previous = self
            .sample_annotation_sources
            .insert(sample.key(), annotation_sources);
        self.selected_samples.push(sample.to_owned());
        self.selection_dirty = true;
    }

    pub fn deselect_sample(&mut self, sample: &Sample) {
        let before = self.selected_samples.len();
        self.selected_samples.retain(|s| s.key() != sample.key());
        if self.selected_samples.len() != before {
            self.selection_dirty = true;
        }
    }

    pub fn is_sample_selected(&self, sample: &Sample) -> bool {
        self.selected_samples.iter().any(|s| s.key() == sample.key())
    }

    pub fn select_annotation(&mut self, info: &AnnotationSourceInfo) {
        if self
            .selected_annotations
            .iter()
            .any(|a| a.track_id == info.track_id)
        {
            return;
        }
        self.selected_annotations.push(info.to_owned());
        self.selection_dirty = true;
    }

    pub fn deselect_annotation(&mut self, track_id: &str) {
        let before = self.selected_annotations.len();
        self.selected_annotations.retain(|a| a.track_id != track_id);
        if self.selected_annotations.len() != before {
            self.selection_dirty = true;
        }
    }

    pub fn is_annotation_selected(&self, track_id: &str) -> bool {
        self.selected_annotations
            .iter()
            .any(|a| a.track_id == track_id)
    }

    pub fn select_gene_list(&mut self, info: &AnnotationSourceInfo) {
        if self
            .selected_gene_lists
            .iter()
            .any(|g| g.track_id == info.track_id)
        {
            return;
        }
        self.selected_gene_lists.push(info.to_owned());
        self.selection_dirty = true;
    }

    pub fn deselect_gene_list(&mut self, track_id: &str) {
        let before = self.selected_gene_lists.len();
        self.selected_gene_lists.retain(|g| g.track_id != track_id);
        if self.selected_gene_lists.len() != before {
            self.selection_dirty = true;
        }
    }

    /// True once per position change; consuming it obliges the caller to
    /// re-request renders.
    pub fn take_position_dirty(&mut self) -> bool {
        std::mem::take(&mut self.position_dirty)
    }

    pub fn take_selection_dirty(&mut self) -> bool {
        std::mem::take(&mut self.selection_dirty)
    }

    /// Reconciles the track collection against the current selections and
    /// installs the new authoritative list.
    pub fn sync_tracks(&mut self) -> SyncOutcome {
        let request = SyncRequest {
            selected_annotations: &self.selected_annotations,
            selected_gene_lists: &self.selected_gene_lists,
            selected_samples: &self.selected_samples,
            sample_annotation_sources: &self.sample_annotation_sources,
        };
        let outcome = synchronize_tracks(self.tracks.all(), &request);
        self.tracks.set_all(outcome.tracks.to_owned());
        outcome
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_settings::TrackType;

    #[test]
    fn test_set_chromosome_resets_range() {
        let mut session = Session::new();
        session.set_chromosome("17").unwrap();
        assert_eq!(session.chromosome(), "17");
        assert_eq!(session.view_range().start(), 0);
        assert_eq!(
            session.view_range().end(),
            session.genome().size_of("17").unwrap()
        );
        assert!(session.set_chromosome("Z").is_err());
    }

    #[test]
    fn test_set_view_range_clamps_and_enforces_min_span() {
        let mut session = Session::new();
        session.set_chromosome("21").unwrap();
        let size = session.genome().size_of("21").unwrap();
        session.set_view_range(GenomicRange::ordered(100, 110));
        assert_eq!(session.view_range().len(), MIN_VIEW_SPAN);
        session.set_view_range(GenomicRange::ordered(0, size + 500));
        assert_eq!(session.view_range().end(), size);
    }

    #[test]
    fn test_position_dirty_fires_once() {
        let mut session = Session::new();
        let _initial = session.take_position_dirty();
        session.set_view_range(GenomicRange::ordered(1000, 2000));
        assert!(session.take_position_dirty());
        assert!(!session.take_position_dirty());
        // setting the identical range is not a change
        session.set_view_range(GenomicRange::ordered(1000, 2000));
        assert!(!session.take_position_dirty());
    }

    #[test]
    fn test_selection_drives_sync() {
        let mut session = Session::new();
        let sample = Sample::new("case1", "s1");
        session.select_sample(&sample, vec!["upd".to_string()]);
        assert!(session.take_selection_dirty());
        let outcome = session.sync_tracks();
        // cov + baf + variant + sample annotation + gene
        assert_eq!(outcome.tracks.len(), 5);
        assert!(session
            .tracks()
            .all()
            .iter()
            .any(|t| t.track_type == TrackType::Gene));

        session.deselect_sample(&sample);
        let outcome = session.sync_tracks();
        assert_eq!(outcome.removed.len(), 4);
        assert_eq!(session.tracks().len(), 1);
    }

    #[test]
    fn test_duplicate_selection_is_noop() {
        let mut session = Session::new();
        let sample = Sample::new("case1", "s1");
        session.select_sample(&sample, vec![]);
        let _dirty = session.take_selection_dirty();
        session.select_sample(&sample, vec![]);
        assert!(!session.take_selection_dirty());
        assert_eq!(session.selected_samples().len(), 1);
    }

    #[test]
    fn test_go_to_region() {
        let mut session = Session::new();
        session.go_to_region("17:7,565,097-7,590,856").unwrap();
        assert_eq!(session.chromosome(), "17");
        assert_eq!(session.view_range().start(), 7_565_097);
        assert_eq!(session.view_range().end(), 7_590_856);
    }
}
