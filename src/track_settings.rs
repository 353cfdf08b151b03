//! Per-track configuration owned by the session's track collection.

use crate::data_source::{AnnotationSourceInfo, Sample};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const BAND_TRACK_COLLAPSED_HEIGHT: f32 = 38.0;
pub const DOT_TRACK_COLLAPSED_HEIGHT: f32 = 80.0;
pub const DOT_TRACK_EXPANDED_HEIGHT: f32 = 160.0;

pub const COV_Y_RANGE: (f64, f64) = (-2.0, 2.0);
pub const BAF_Y_RANGE: (f64, f64) = (0.0, 1.0);

/// Default quality threshold for variant fetches.
pub const VARIANT_QUALITY_THRESHOLD: f64 = 10.0;

static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-local arbitrary identifier; regenerated every session, never
/// persisted. Layout persistence goes through portable identities instead.
fn next_track_id() -> String {
    let n = TRACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("track-{n}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackType {
    Annotation,
    Gene,
    GeneList,
    SampleAnnotation,
    Variant,
    DotCov,
    DotBaf,
    Position,
}

impl TrackType {
    pub fn name(&self) -> &'static str {
        match self {
            TrackType::Annotation => "annotation",
            TrackType::Gene => "gene",
            TrackType::GeneList => "gene-list",
            TrackType::SampleAnnotation => "sample-annotation",
            TrackType::Variant => "variant",
            TrackType::DotCov => "dot-cov",
            TrackType::DotBaf => "dot-baf",
            TrackType::Position => "position",
        }
    }

    /// Tracks that draw interval bands (as opposed to scatter dots).
    pub fn is_band_type(&self) -> bool {
        matches!(
            self,
            TrackType::Annotation
                | TrackType::Gene
                | TrackType::GeneList
                | TrackType::SampleAnnotation
                | TrackType::Variant
        )
    }
}

/// Vertical value axis of a dot track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YAxis {
    pub range: (f64, f64),
    pub label: String,
    #[serde(default)]
    pub hide_ticks: bool,
    #[serde(default)]
    pub hide_label: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackSettings {
    track_id: String,
    pub track_label: String,
    pub track_type: TrackType,
    pub collapsed_height: f32,
    pub expanded_height: Option<f32>,
    pub is_expanded: bool,
    pub is_hidden: bool,
    pub y_axis: Option<YAxis>,
    pub sample: Option<Sample>,
    /// Annotation source specifier for annotation-class tracks; stable across
    /// sessions, unlike `track_id`.
    pub source_id: Option<String>,
}

impl TrackSettings {
    fn new(label: &str, track_type: TrackType, collapsed_height: f32) -> Self {
        Self {
            track_id: next_track_id(),
            track_label: label.to_string(),
            track_type,
            collapsed_height,
            expanded_height: None,
            is_expanded: false,
            is_hidden: false,
            y_axis: None,
            sample: None,
            source_id: None,
        }
    }

    #[inline(always)]
    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn new_annotation(info: &AnnotationSourceInfo) -> Self {
        let mut settings = Self::new(&info.label, TrackType::Annotation, BAND_TRACK_COLLAPSED_HEIGHT);
        settings.source_id = Some(info.track_id.to_owned());
        settings
    }

    pub fn new_gene_list(info: &AnnotationSourceInfo) -> Self {
        let mut settings = Self::new(&info.label, TrackType::GeneList, BAND_TRACK_COLLAPSED_HEIGHT);
        settings.source_id = Some(info.track_id.to_owned());
        settings
    }

    /// The fixed transcript track that is always present.
    pub fn new_gene() -> Self {
        Self::new("Genes", TrackType::Gene, BAND_TRACK_COLLAPSED_HEIGHT)
    }

    pub fn new_coverage(sample: &Sample) -> Self {
        let mut settings = Self::new(
            &format!("Coverage {}", sample.sample_id),
            TrackType::DotCov,
            DOT_TRACK_COLLAPSED_HEIGHT,
        );
        settings.expanded_height = Some(DOT_TRACK_EXPANDED_HEIGHT);
        settings.y_axis = Some(YAxis {
            range: COV_Y_RANGE,
            label: "Log2 ratio".to_string(),
            hide_ticks: false,
            hide_label: false,
        });
        settings.sample = Some(sample.to_owned());
        settings
    }

    pub fn new_baf(sample: &Sample) -> Self {
        let mut settings = Self::new(
            &format!("BAF {}", sample.sample_id),
            TrackType::DotBaf,
            DOT_TRACK_COLLAPSED_HEIGHT,
        );
        settings.expanded_height = Some(DOT_TRACK_EXPANDED_HEIGHT);
        settings.y_axis = Some(YAxis {
            range: BAF_Y_RANGE,
            label: "B-allele freq".to_string(),
            hide_ticks: false,
            hide_label: false,
        });
        settings.sample = Some(sample.to_owned());
        settings
    }

    pub fn new_variant(sample: &Sample) -> Self {
        let mut settings = Self::new(
            &format!("Variants {}", sample.sample_id),
            TrackType::Variant,
            BAND_TRACK_COLLAPSED_HEIGHT,
        );
        settings.sample = Some(sample.to_owned());
        settings
    }

    pub fn new_sample_annotation(sample: &Sample, source: &str) -> Self {
        let mut settings = Self::new(
            &format!("{} {}", source.replace('_', " "), sample.sample_id),
            TrackType::SampleAnnotation,
            BAND_TRACK_COLLAPSED_HEIGHT,
        );
        settings.sample = Some(sample.to_owned());
        settings.source_id = Some(source.to_string());
        settings
    }

    /// Full default track family of one sample: coverage, BAF, variants, one
    /// sample-annotation track per available source.
    pub fn new_sample_family(sample: &Sample, annotation_sources: &[String]) -> Vec<Self> {
        let mut family = vec![
            Self::new_coverage(sample),
            Self::new_baf(sample),
            Self::new_variant(sample),
        ];
        for source in annotation_sources {
            family.push(Self::new_sample_annotation(sample, source));
        }
        family
    }
}
