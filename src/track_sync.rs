//! Reconciles the desired track set against the rendered one.
//!
//! The desired set is derived from the current selections; the diff keeps
//! every retained setting untouched (hidden/expanded/height/order survive),
//! removes settings whose originating selection disappeared and appends
//! defaults for new selections. On-screen ordering beyond "retained order,
//! new tracks at the end" is an explicit reorder step elsewhere.

use crate::data_source::{AnnotationSourceInfo, Sample};
use crate::track_settings::{TrackSettings, TrackType};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct SyncRequest<'a> {
    pub selected_annotations: &'a [AnnotationSourceInfo],
    pub selected_gene_lists: &'a [AnnotationSourceInfo],
    pub selected_samples: &'a [Sample],
    /// Available sample-annotation sources per `Sample::key()`.
    pub sample_annotation_sources: &'a HashMap<String, Vec<String>>,
}

/// Result of one reconciliation cycle.
#[derive(Clone, Debug, Default)]
pub struct SyncOutcome {
    /// Internal ids of newly constructed settings, in appended order.
    pub added: Vec<String>,
    /// Internal ids dropped from the previous list.
    pub removed: Vec<String>,
    /// The new authoritative settings list.
    pub tracks: Vec<TrackSettings>,
}

fn annotation_source_of(settings: &TrackSettings, track_type: TrackType) -> Option<&str> {
    (settings.track_type == track_type)
        .then(|| settings.source_id.as_deref())
        .flatten()
}

/// Diff of one annotation-like family (annotation sources or gene lists).
fn diff_annotation_family(
    previous: &[TrackSettings],
    desired: &[AnnotationSourceInfo],
    track_type: TrackType,
    make: fn(&AnnotationSourceInfo) -> TrackSettings,
) -> (Vec<TrackSettings>, Vec<String>) {
    let present: HashSet<&str> = previous
        .iter()
        .filter_map(|t| annotation_source_of(t, track_type))
        .collect();
    let desired_ids: HashSet<&str> = desired.iter().map(|d| d.track_id.as_str()).collect();

    let added = desired
        .iter()
        .filter(|d| !present.contains(d.track_id.as_str()))
        .map(make)
        .collect();
    let removed = previous
        .iter()
        .filter(|t| {
            annotation_source_of(t, track_type)
                .map(|source| !desired_ids.contains(source))
                .unwrap_or(false)
        })
        .map(|t| t.track_id().to_string())
        .collect();
    (added, removed)
}

pub fn synchronize_tracks(previous: &[TrackSettings], request: &SyncRequest) -> SyncOutcome {
    let (added_annotations, removed_annotations) = diff_annotation_family(
        previous,
        request.selected_annotations,
        TrackType::Annotation,
        TrackSettings::new_annotation,
    );
    let (added_gene_lists, removed_gene_lists) = diff_annotation_family(
        previous,
        request.selected_gene_lists,
        TrackType::GeneList,
        TrackSettings::new_gene_list,
    );

    // Sample diff works on composite case:sample keys; one added sample
    // constructs its whole track family at once.
    let rendered_samples: HashSet<String> = previous
        .iter()
        .filter_map(|t| t.sample.as_ref())
        .map(Sample::key)
        .collect();
    let desired_samples: HashSet<String> =
        request.selected_samples.iter().map(Sample::key).collect();

    let empty: Vec<String> = vec![];
    let added_sample_tracks: Vec<TrackSettings> = request
        .selected_samples
        .iter()
        .filter(|sample| !rendered_samples.contains(&sample.key()))
        .flat_map(|sample| {
            let sources = request
                .sample_annotation_sources
                .get(&sample.key())
                .unwrap_or(&empty);
            TrackSettings::new_sample_family(sample, sources)
        })
        .collect();
    let removed_sample_tracks: Vec<String> = previous
        .iter()
        .filter(|t| {
            t.sample
                .as_ref()
                .map(|s| !desired_samples.contains(&s.key()))
                .unwrap_or(false)
        })
        .map(|t| t.track_id().to_string())
        .collect();

    let removed: Vec<String> = removed_annotations
        .into_iter()
        .chain(removed_gene_lists)
        .chain(removed_sample_tracks)
        .unique()
        .collect();
    let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();

    // Removals before additions; retained relative order preserved; new
    // settings appended.
    let mut tracks: Vec<TrackSettings> = previous
        .iter()
        .filter(|t| !removed_set.contains(t.track_id()))
        .cloned()
        .collect();
    let mut added: Vec<String> = vec![];
    for settings in added_annotations
        .into_iter()
        .chain(added_gene_lists)
        .chain(added_sample_tracks)
    {
        added.push(settings.track_id().to_string());
        tracks.push(settings);
    }

    // The fixed gene track is always present exactly once.
    if !tracks.iter().any(|t| t.track_type == TrackType::Gene) {
        let gene = TrackSettings::new_gene();
        added.push(gene.track_id().to_string());
        tracks.push(gene);
    }

    SyncOutcome {
        added,
        removed,
        tracks,
    }
}
