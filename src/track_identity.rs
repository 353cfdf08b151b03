//! Portable track identities, stable across sessions.
//!
//! Internal `track_id`s are regenerated on every reload, so persisted layout
//! data is keyed by a string derived from semantically stable attributes
//! instead: track-type class, a specifier, and the display label.

use crate::error::{LocusViewError, Result};
use crate::track_settings::{TrackSettings, TrackType};

/// Deterministic identity of a track setting.
pub fn portable_track_id(settings: &TrackSettings) -> Result<String> {
    let label = &settings.track_label;
    match settings.track_type {
        TrackType::Annotation | TrackType::GeneList => {
            let source = settings.source_id.as_deref().ok_or_else(|| {
                LocusViewError::contract(format!(
                    "annotation-class track '{label}' has no source id"
                ))
            })?;
            Ok(format!("annotation|{source}|{label}"))
        }
        TrackType::Gene | TrackType::Position => {
            Ok(format!("static|{}|{label}", settings.track_type.name()))
        }
        TrackType::SampleAnnotation
        | TrackType::Variant
        | TrackType::DotCov
        | TrackType::DotBaf => {
            if settings.sample.is_none() {
                // Refuse to classify rather than silently invalidating
                // persisted layout data.
                return Err(LocusViewError::contract(format!(
                    "sample-class track '{label}' has no owning sample"
                )));
            }
            Ok(format!("sample|{}|{label}", settings.track_type.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{AnnotationSourceInfo, Sample};

    #[test]
    fn test_identity_survives_internal_id_regeneration() {
        let info = AnnotationSourceInfo {
            track_id: "dosage_regions".to_string(),
            label: "dosage regions".to_string(),
        };
        // Two settings constructed independently get different internal ids
        // but the same portable identity.
        let first = TrackSettings::new_annotation(&info);
        let second = TrackSettings::new_annotation(&info);
        assert_ne!(first.track_id(), second.track_id());
        assert_eq!(
            portable_track_id(&first).unwrap(),
            portable_track_id(&second).unwrap()
        );
    }

    #[test]
    fn test_identity_distinguishes_sample_track_kinds() {
        let sample = Sample::new("case1", "s1");
        let cov = portable_track_id(&TrackSettings::new_coverage(&sample)).unwrap();
        let baf = portable_track_id(&TrackSettings::new_baf(&sample)).unwrap();
        let var = portable_track_id(&TrackSettings::new_variant(&sample)).unwrap();
        assert_ne!(cov, baf);
        assert_ne!(cov, var);
        assert!(cov.starts_with("sample|dot-cov|"));
    }

    #[test]
    fn test_sample_track_without_sample_is_hard_error() {
        let mut settings = TrackSettings::new_coverage(&Sample::new("c", "s"));
        settings.sample = None;
        assert!(portable_track_id(&settings)
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_annotation_track_without_source_is_hard_error() {
        let info = AnnotationSourceInfo {
            track_id: "cnv".to_string(),
            label: "cnv".to_string(),
        };
        let mut settings = TrackSettings::new_annotation(&info);
        settings.source_id = None;
        assert!(portable_track_id(&settings)
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_gene_track_identity_is_fixed() {
        let gene = TrackSettings::new_gene();
        assert_eq!(portable_track_id(&gene).unwrap(), "static|gene|Genes");
    }
}
