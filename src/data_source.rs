//! Feature records and the data backends that produce them.
//!
//! All fetching is blocking and runs on the [`FetchWorker`] thread; the UI
//! thread only submits jobs and drains outcomes. Returned collections are not
//! assumed filtered or sorted, the track renderers re-filter defensively.

use crate::error::{LocusViewError, Result};
use crate::genome::{ChromInfo, GenomicRange};
use flate2::read::GzDecoder;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/// Strand of a transcript-like feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

/// Exon-like sub-interval of a band.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubFeature {
    pub start: u64,
    pub end: u64,
    /// Sub-feature kind, `"exon"` or a non-exon kind drawn muted.
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exon_number: Option<u32>,
}

/// Genomic interval feature (gene, annotation, variant).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RenderBand {
    pub id: String,
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_features: Vec<SubFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RenderBand {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn is_transcript_like(&self) -> bool {
        !self.sub_features.is_empty()
    }
}

/// Scatter point: genomic position against a measured value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderDot {
    pub x: u64,
    pub y: f64,
}

/// Sample identity within a case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub case_id: String,
    pub sample_id: String,
}

impl Sample {
    pub fn new(case_id: &str, sample_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            sample_id: sample_id.to_string(),
        }
    }

    /// Composite key used by the synchronizer and portable identities.
    pub fn key(&self) -> String {
        format!("{}:{}", self.case_id, self.sample_id)
    }
}

/// Annotation source available from a backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnotationSourceInfo {
    pub track_id: String,
    pub label: String,
}

/// Backend contract. Implementations block; they are only ever called from
/// the fetch worker thread.
pub trait DataSource: Send + Sync {
    fn get_annotation_bands(&self, track_id: &str, chrom: &str) -> Result<Vec<RenderBand>>;
    fn get_sample_annotation_bands(
        &self,
        sample: &Sample,
        source: &str,
        chrom: &str,
    ) -> Result<Vec<RenderBand>>;
    fn get_variant_bands(
        &self,
        sample: &Sample,
        chrom: &str,
        threshold: f64,
    ) -> Result<Vec<RenderBand>>;
    fn get_transcript_bands(&self, chrom: &str) -> Result<Vec<RenderBand>>;
    fn get_cov_data(
        &self,
        sample: &Sample,
        chrom: &str,
        range: GenomicRange,
    ) -> Result<Vec<RenderDot>>;
    fn get_baf_data(
        &self,
        sample: &Sample,
        chrom: &str,
        range: GenomicRange,
    ) -> Result<Vec<RenderDot>>;
    fn get_overview_cov_data(&self, sample: &Sample) -> Result<HashMap<String, Vec<RenderDot>>>;
    fn get_chrom_info(&self, chrom: &str) -> Result<ChromInfo>;
    fn list_annotation_tracks(&self) -> Result<Vec<AnnotationSourceInfo>>;
    fn list_samples(&self) -> Result<Vec<Sample>>;
    fn list_sample_annotation_sources(&self, sample: &Sample) -> Result<Vec<String>>;
}

// ── File backend ────────────────────────────────────────────────────────────

/// Directory-tree backend. Layout under the root:
///
/// ```text
/// annotations/<track_id>/<chrom>.json
/// transcripts/<chrom>.json
/// chromosomes/<chrom>.json
/// samples/<case>/<sample>/cov/<chrom>.json[.gz]
/// samples/<case>/<sample>/cov/overview.json[.gz]
/// samples/<case>/<sample>/baf/<chrom>.json[.gz]
/// samples/<case>/<sample>/variants/<chrom>.json
/// samples/<case>/<sample>/annotations/<source>/<chrom>.json
/// ```
#[derive(Clone, Debug)]
pub struct FileDataSource {
    root: PathBuf,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sample_dir(&self, sample: &Sample) -> PathBuf {
        self.root
            .join("samples")
            .join(&sample.case_id)
            .join(&sample.sample_id)
    }

    /// Reads a JSON document, transparently decompressing `<path>.gz` when the
    /// plain file does not exist.
    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let mut text = String::new();
        if path.exists() {
            let _bytes = File::open(path)?.read_to_string(&mut text)?;
        } else {
            let gz_path = PathBuf::from(format!("{}.gz", path.display()));
            if !gz_path.exists() {
                return Err(LocusViewError::String(format!(
                    "data file not found: {}",
                    path.display()
                )));
            }
            let _bytes = GzDecoder::new(File::open(&gz_path)?).read_to_string(&mut text)?;
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Missing per-chromosome files mean "no data here", not an error.
    fn read_json_or_empty<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
        let gz_path = PathBuf::from(format!("{}.gz", path.display()));
        if !path.exists() && !gz_path.exists() {
            return Ok(T::default());
        }
        Self::read_json(path)
    }

    fn list_subdirectories(path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort_unstable();
        Ok(names)
    }
}

impl DataSource for FileDataSource {
    fn get_annotation_bands(&self, track_id: &str, chrom: &str) -> Result<Vec<RenderBand>> {
        let path = self
            .root
            .join("annotations")
            .join(track_id)
            .join(format!("{chrom}.json"));
        Self::read_json_or_empty(&path)
    }

    fn get_sample_annotation_bands(
        &self,
        sample: &Sample,
        source: &str,
        chrom: &str,
    ) -> Result<Vec<RenderBand>> {
        let path = self
            .sample_dir(sample)
            .join("annotations")
            .join(source)
            .join(format!("{chrom}.json"));
        Self::read_json_or_empty(&path)
    }

    fn get_variant_bands(
        &self,
        sample: &Sample,
        chrom: &str,
        threshold: f64,
    ) -> Result<Vec<RenderBand>> {
        let path = self
            .sample_dir(sample)
            .join("variants")
            .join(format!("{chrom}.json"));
        let bands: Vec<VariantRecord> = Self::read_json_or_empty(&path)?;
        Ok(bands
            .into_iter()
            .filter(|v| v.quality.unwrap_or(f64::MAX) >= threshold)
            .map(|v| v.band)
            .collect())
    }

    fn get_transcript_bands(&self, chrom: &str) -> Result<Vec<RenderBand>> {
        let path = self.root.join("transcripts").join(format!("{chrom}.json"));
        Self::read_json_or_empty(&path)
    }

    fn get_cov_data(
        &self,
        sample: &Sample,
        chrom: &str,
        _range: GenomicRange,
    ) -> Result<Vec<RenderDot>> {
        let path = self.sample_dir(sample).join("cov").join(format!("{chrom}.json"));
        Self::read_json_or_empty(&path)
    }

    fn get_baf_data(
        &self,
        sample: &Sample,
        chrom: &str,
        _range: GenomicRange,
    ) -> Result<Vec<RenderDot>> {
        let path = self.sample_dir(sample).join("baf").join(format!("{chrom}.json"));
        Self::read_json_or_empty(&path)
    }

    fn get_overview_cov_data(&self, sample: &Sample) -> Result<HashMap<String, Vec<RenderDot>>> {
        let path = self.sample_dir(sample).join("cov").join("overview.json");
        Self::read_json_or_empty(&path)
    }

    fn get_chrom_info(&self, chrom: &str) -> Result<ChromInfo> {
        let path = self.root.join("chromosomes").join(format!("{chrom}.json"));
        Self::read_json(&path)
    }

    fn list_annotation_tracks(&self) -> Result<Vec<AnnotationSourceInfo>> {
        Ok(Self::list_subdirectories(&self.root.join("annotations"))?
            .into_iter()
            .map(|name| AnnotationSourceInfo {
                label: name.replace('_', " "),
                track_id: name,
            })
            .collect())
    }

    fn list_samples(&self) -> Result<Vec<Sample>> {
        let mut samples = vec![];
        for case_id in Self::list_subdirectories(&self.root.join("samples"))? {
            let case_dir = self.root.join("samples").join(&case_id);
            for sample_id in Self::list_subdirectories(&case_dir)? {
                samples.push(Sample::new(&case_id, &sample_id));
            }
        }
        Ok(samples)
    }

    fn list_sample_annotation_sources(&self, sample: &Sample) -> Result<Vec<String>> {
        Self::list_subdirectories(&self.sample_dir(sample).join("annotations"))
    }
}

/// Variant file record: a band plus the quality the threshold filter applies
/// to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct VariantRecord {
    #[serde(flatten)]
    band: RenderBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quality: Option<f64>,
}

// ── HTTP backend ────────────────────────────────────────────────────────────

/// Blocking JSON-over-HTTP backend against a base URL.
pub struct HttpDataSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        self.client
            .get(&url)
            .query(query)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|e| LocusViewError::String(format!("GET {url} failed: {e}")))
    }
}

impl DataSource for HttpDataSource {
    fn get_annotation_bands(&self, track_id: &str, chrom: &str) -> Result<Vec<RenderBand>> {
        self.get_json(&format!("annotations/{track_id}/{chrom}"), &[])
    }

    fn get_sample_annotation_bands(
        &self,
        sample: &Sample,
        source: &str,
        chrom: &str,
    ) -> Result<Vec<RenderBand>> {
        self.get_json(
            &format!(
                "samples/{}/{}/annotations/{source}/{chrom}",
                sample.case_id, sample.sample_id
            ),
            &[],
        )
    }

    fn get_variant_bands(
        &self,
        sample: &Sample,
        chrom: &str,
        threshold: f64,
    ) -> Result<Vec<RenderBand>> {
        self.get_json(
            &format!(
                "samples/{}/{}/variants/{chrom}",
                sample.case_id, sample.sample_id
            ),
            &[("threshold", threshold.to_string())],
        )
    }

    fn get_transcript_bands(&self, chrom: &str) -> Result<Vec<RenderBand>> {
        self.get_json(&format!("transcripts/{chrom}"), &[])
    }

    fn get_cov_data(
        &self,
        sample: &Sample,
        chrom: &str,
        range: GenomicRange,
    ) -> Result<Vec<RenderDot>> {
        self.get_json(
            &format!("samples/{}/{}/cov/{chrom}", sample.case_id, sample.sample_id),
            &[
                ("start", range.start().to_string()),
                ("end", range.end().to_string()),
            ],
        )
    }

    fn get_baf_data(
        &self,
        sample: &Sample,
        chrom: &str,
        range: GenomicRange,
    ) -> Result<Vec<RenderDot>> {
        self.get_json(
            &format!("samples/{}/{}/baf/{chrom}", sample.case_id, sample.sample_id),
            &[
                ("start", range.start().to_string()),
                ("end", range.end().to_string()),
            ],
        )
    }

    fn get_overview_cov_data(&self, sample: &Sample) -> Result<HashMap<String, Vec<RenderDot>>> {
        self.get_json(
            &format!(
                "samples/{}/{}/cov/overview",
                sample.case_id, sample.sample_id
            ),
            &[],
        )
    }

    fn get_chrom_info(&self, chrom: &str) -> Result<ChromInfo> {
        self.get_json(&format!("chromosomes/{chrom}"), &[])
    }

    fn list_annotation_tracks(&self) -> Result<Vec<AnnotationSourceInfo>> {
        self.get_json("annotations", &[])
    }

    fn list_samples(&self) -> Result<Vec<Sample>> {
        self.get_json("samples", &[])
    }

    fn list_sample_annotation_sources(&self, sample: &Sample) -> Result<Vec<String>> {
        self.get_json(
            &format!(
                "samples/{}/{}/annotations",
                sample.case_id, sample.sample_id
            ),
            &[],
        )
    }
}

// ── Fetch worker ────────────────────────────────────────────────────────────

/// One fetch a track asked for.
#[derive(Clone, Debug)]
pub enum FetchRequest {
    AnnotationBands {
        track_id: String,
        chrom: String,
    },
    SampleAnnotationBands {
        sample: Sample,
        source: String,
        chrom: String,
    },
    VariantBands {
        sample: Sample,
        chrom: String,
        threshold: f64,
    },
    TranscriptBands {
        chrom: String,
    },
    CovData {
        sample: Sample,
        chrom: String,
        range: GenomicRange,
    },
    BafData {
        sample: Sample,
        chrom: String,
        range: GenomicRange,
    },
    OverviewCovData {
        sample: Sample,
    },
    ChromInfo {
        chrom: String,
    },
}

#[derive(Clone, Debug)]
pub enum FetchPayload {
    Bands(Vec<RenderBand>),
    Dots(Vec<RenderDot>),
    OverviewDots(HashMap<String, Vec<RenderDot>>),
    Chrom(ChromInfo),
}

#[derive(Debug)]
pub struct FetchJob {
    pub track_id: String,
    pub ticket: u64,
    pub request: FetchRequest,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub track_id: String,
    pub ticket: u64,
    pub result: Result<FetchPayload>,
}

pub fn run_fetch_request(source: &dyn DataSource, request: &FetchRequest) -> Result<FetchPayload> {
    match request {
        FetchRequest::AnnotationBands { track_id, chrom } => Ok(FetchPayload::Bands(
            source.get_annotation_bands(track_id, chrom)?,
        )),
        FetchRequest::SampleAnnotationBands {
            sample,
            source: annotation_source,
            chrom,
        } => Ok(FetchPayload::Bands(source.get_sample_annotation_bands(
            sample,
            annotation_source,
            chrom,
        )?)),
        FetchRequest::VariantBands {
            sample,
            chrom,
            threshold,
        } => Ok(FetchPayload::Bands(
            source.get_variant_bands(sample, chrom, *threshold)?,
        )),
        FetchRequest::TranscriptBands { chrom } => {
            Ok(FetchPayload::Bands(source.get_transcript_bands(chrom)?))
        }
        FetchRequest::CovData {
            sample,
            chrom,
            range,
        } => Ok(FetchPayload::Dots(
            source.get_cov_data(sample, chrom, *range)?,
        )),
        FetchRequest::BafData {
            sample,
            chrom,
            range,
        } => Ok(FetchPayload::Dots(
            source.get_baf_data(sample, chrom, *range)?,
        )),
        FetchRequest::OverviewCovData { sample } => Ok(FetchPayload::OverviewDots(
            source.get_overview_cov_data(sample)?,
        )),
        FetchRequest::ChromInfo { chrom } => {
            Ok(FetchPayload::Chrom(source.get_chrom_info(chrom)?))
        }
    }
}

/// Background thread running blocking fetches; jobs in, outcomes out. The UI
/// thread drains outcomes once per frame. Dropping the worker closes the job
/// channel and ends the thread.
pub struct FetchWorker {
    jobs: Sender<FetchJob>,
    outcomes: Receiver<FetchOutcome>,
}

impl FetchWorker {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let (job_tx, job_rx) = channel::<FetchJob>();
        let (outcome_tx, outcome_rx) = channel::<FetchOutcome>();
        let _handle = thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                debug!("fetch {} ticket {}", job.track_id, job.ticket);
                let result = run_fetch_request(source.as_ref(), &job.request);
                let outcome = FetchOutcome {
                    track_id: job.track_id,
                    ticket: job.ticket,
                    result,
                };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });
        Self {
            jobs: job_tx,
            outcomes: outcome_rx,
        }
    }

    pub fn submit(&self, job: FetchJob) {
        if self.jobs.send(job).is_err() {
            log::error!("fetch worker thread is gone, dropping job");
        }
    }

    /// Outcomes that completed since the last poll.
    pub fn poll(&self) -> Vec<FetchOutcome> {
        self.outcomes.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_band_json_round_trip() {
        let json = r##"[{"id":"BRCA2","start":100,"end":500,"color":"#3f51b5",
            "sub_features":[{"start":120,"end":180,"feature":"exon","exon_number":1}],
            "direction":"+","label":"BRCA2"}]"##;
        let bands: Vec<RenderBand> = serde_json::from_str(json).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].direction, Some(Direction::Forward));
        assert!(bands[0].is_transcript_like());
        assert_eq!(bands[0].sub_features[0].exon_number, Some(1));
    }

    #[test]
    fn test_file_source_missing_chromosome_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileDataSource::new(dir.path());
        let bands = source.get_transcript_bands("13").unwrap();
        assert!(bands.is_empty());
    }

    #[test]
    fn test_file_source_reads_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let cov_dir = dir.path().join("samples/case1/s1/cov");
        fs::create_dir_all(&cov_dir).unwrap();

        let dots = vec![RenderDot { x: 10, y: 0.5 }, RenderDot { x: 20, y: -1.0 }];
        let text = serde_json::to_string(&dots).unwrap();
        fs::write(cov_dir.join("1.json"), &text).unwrap();

        let mut gz = flate2::write::GzEncoder::new(
            File::create(cov_dir.join("2.json.gz")).unwrap(),
            flate2::Compression::default(),
        );
        gz.write_all(text.as_bytes()).unwrap();
        let _file = gz.finish().unwrap();

        let source = FileDataSource::new(dir.path());
        let sample = Sample::new("case1", "s1");
        let range = GenomicRange::new(0, 100).unwrap();
        assert_eq!(source.get_cov_data(&sample, "1", range).unwrap(), dots);
        assert_eq!(source.get_cov_data(&sample, "2", range).unwrap(), dots);
    }

    #[test]
    fn test_variant_threshold_filter() {
        let dir = tempfile::tempdir().unwrap();
        let var_dir = dir.path().join("samples/case1/s1/variants");
        fs::create_dir_all(&var_dir).unwrap();
        fs::write(
            var_dir.join("3.json"),
            r#"[{"id":"sv1","start":5,"end":9,"quality":40.0},
                {"id":"sv2","start":15,"end":19,"quality":5.0},
                {"id":"sv3","start":25,"end":29}]"#,
        )
        .unwrap();

        let source = FileDataSource::new(dir.path());
        let sample = Sample::new("case1", "s1");
        let bands = source.get_variant_bands(&sample, "3", 10.0).unwrap();
        // sv2 falls below the threshold; sv3 has no quality and is kept
        let ids: Vec<&str> = bands.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["sv1", "sv3"]);
    }

    #[test]
    fn test_list_annotation_tracks_from_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("annotations/dosage_regions")).unwrap();
        fs::create_dir_all(dir.path().join("annotations/cnv_calls")).unwrap();
        let source = FileDataSource::new(dir.path());
        let tracks = source.list_annotation_tracks().unwrap();
        let ids: Vec<&str> = tracks.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["cnv_calls", "dosage_regions"]);
        assert_eq!(tracks[1].label, "dosage regions");
    }

    #[test]
    fn test_worker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let worker = FetchWorker::new(Arc::new(FileDataSource::new(dir.path())));
        worker.submit(FetchJob {
            track_id: "genes".to_string(),
            ticket: 7,
            request: FetchRequest::TranscriptBands {
                chrom: "1".to_string(),
            },
        });
        // Blocking receive through the public poll interface.
        let outcome = loop {
            let mut outcomes = worker.poll();
            if let Some(outcome) = outcomes.pop() {
                break outcome;
            }
            thread::yield_now();
        };
        assert_eq!(outcome.track_id, "genes");
        assert_eq!(outcome.ticket, 7);
        assert!(matches!(outcome.result, Ok(FetchPayload::Bands(ref b)) if b.is_empty()));
    }
}
