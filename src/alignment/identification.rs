use crate::alignment::algorithm::{MapAlignmentAlgorithm, ModelSpec};
use crate::alignment::info::InputKind;
use crate::alignment::reference::Reference;
use crate::data::{DataPoint, SortedArray};
use crate::description::TransformationDescription;
use crate::error::AlignmentError;
use crate::maps::{FeatureMap, PeptideIdentification};

use itertools::Itertools;
use log::{info, warn};
use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Retention times of every observed sequence
type SequenceRts = BTreeMap<String, Vec<f64>>;

/// One retention time per sequence
type SequenceRt = BTreeMap<String, f64>;

/// Runs with fewer correspondences get a warning
const FEW_DATA_POINTS: usize = 10;

macro_const! {
    const DOC: &str = r#"
Alignment by peptide identifications shared between runs

The best hit of every identification gives a sequence and a retention time, repeated observations
of a sequence within a run are summarised by their median. Every run is then mapped onto the
reference retention times of the sequences it shares with the reference:

- `Reference::Index(i)`: run `i`, which gets the identity transformation
- `Reference::File(path)`: CSV file with a `sequence,rt` header, medians of repeated sequences
- no reference: per-sequence median over the runs, using sequences seen in at least
  `min_run_occur` runs

Pairs shifted by more than `max_rt_shift` are dropped: values up to one are a fraction of the
reference retention time range, larger values are seconds, zero disables the filter. The remaining
pairs are fitted with `model`, a smoothing spline by default.
"#;
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IdentificationAlignmentParams {
    #[serde(default = "IdentificationAlignmentParams::default_min_run_occur")]
    pub min_run_occur: usize,
    #[serde(default = "IdentificationAlignmentParams::default_max_rt_shift")]
    pub max_rt_shift: f64,
    #[serde(default = "IdentificationAlignmentParams::default_use_unassigned_peptides")]
    pub use_unassigned_peptides: bool,
    #[serde(default = "IdentificationAlignmentParams::default_use_feature_rt")]
    pub use_feature_rt: bool,
    /// Hits scoring worse than this are ignored
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub model: ModelSpec,
}

impl IdentificationAlignmentParams {
    #[inline]
    pub fn default_min_run_occur() -> usize {
        2
    }

    #[inline]
    pub fn default_max_rt_shift() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_use_unassigned_peptides() -> bool {
        true
    }

    #[inline]
    pub fn default_use_feature_rt() -> bool {
        false
    }

    fn check(&self) -> Result<(), AlignmentError> {
        if self.min_run_occur == 0 {
            return Err(AlignmentError::InvalidParameter(
                "min_run_occur must be positive".to_owned(),
            ));
        }
        if !(self.max_rt_shift >= 0.0) {
            return Err(AlignmentError::InvalidParameter(format!(
                "max_rt_shift must be non-negative, got {}",
                self.max_rt_shift
            )));
        }
        Ok(())
    }
}

impl Default for IdentificationAlignmentParams {
    fn default() -> Self {
        Self {
            min_run_occur: Self::default_min_run_occur(),
            max_rt_shift: Self::default_max_rt_shift(),
            use_unassigned_peptides: Self::default_use_unassigned_peptides(),
            use_feature_rt: Self::default_use_feature_rt(),
            min_score: None,
            model: ModelSpec::default(),
        }
    }
}

#[doc = DOC!()]
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IdentificationAlignment {
    params: IdentificationAlignmentParams,
    reference: Option<Reference>,
}

alignment_info!(
    IDENTIFICATION_ALIGNMENT_INFO,
    IdentificationAlignment,
    name: IdentificationAlignment::NAME,
    reference_support: true,
    inputs: &[InputKind::FeatureMaps, InputKind::PeptideIdentifications],
);

impl IdentificationAlignment {
    pub const NAME: &'static str = "identification";

    pub fn new(params: IdentificationAlignmentParams) -> Self {
        Self {
            params,
            reference: None,
        }
    }

    pub fn params(&self) -> &IdentificationAlignmentParams {
        &self.params
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    /// Best hit sequence of an identification unless it fails the score threshold
    fn best_sequence<'a>(&self, id: &'a PeptideIdentification) -> Option<&'a str> {
        let hit = id.best_hit()?;
        let passes = match self.params.min_score {
            None => true,
            Some(min) if id.higher_score_better => hit.score >= min,
            Some(min) => hit.score <= min,
        };
        passes.then_some(hit.sequence.as_str())
    }

    fn collect_identifications<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a PeptideIdentification>,
        rts: &mut SequenceRts,
    ) {
        for id in ids {
            if let Some(sequence) = self.best_sequence(id) {
                rts.entry(sequence.to_owned()).or_default().push(id.rt);
            }
        }
    }

    fn feature_map_rts(&self, map: &FeatureMap) -> SequenceRts {
        let mut rts = SequenceRts::new();
        for feature in &map.features {
            if self.params.use_feature_rt {
                // A feature counts once per sequence, at its own position
                let sequences: Vec<_> = feature
                    .peptide_identifications
                    .iter()
                    .filter_map(|id| self.best_sequence(id))
                    .unique()
                    .collect();
                for sequence in sequences {
                    rts.entry(sequence.to_owned()).or_default().push(feature.rt);
                }
            } else {
                self.collect_identifications(&feature.peptide_identifications, &mut rts);
            }
        }
        if self.params.use_unassigned_peptides {
            self.collect_identifications(&map.unassigned_peptide_identifications, &mut rts);
        }
        rts
    }

    fn consensus_reference(&self, medians: &[SequenceRt]) -> SequenceRt {
        let min_run_occur = if self.params.min_run_occur > medians.len() {
            warn!(
                "min_run_occur {} exceeds the number of runs, using {}",
                self.params.min_run_occur,
                medians.len()
            );
            medians.len()
        } else {
            self.params.min_run_occur
        };
        let mut all = SequenceRts::new();
        for run in medians {
            for (sequence, &rt) in run {
                all.entry(sequence.clone()).or_default().push(rt);
            }
        }
        all.into_iter()
            .filter(|(_, rts)| rts.len() >= min_run_occur)
            .map(|(sequence, rts)| (sequence, median(rts)))
            .collect()
    }

    fn reference_rts(&self, medians: &[SequenceRt]) -> Result<SequenceRt, AlignmentError> {
        match &self.reference {
            Some(Reference::Index(index)) => Ok(medians[*index].clone()),
            Some(Reference::File(path)) => read_reference_file(path),
            None => Ok(self.consensus_reference(medians)),
        }
    }

    /// Largest accepted distance between a run and the reference retention time
    fn max_shift(&self, reference: &SequenceRt) -> f64 {
        let shift = self.params.max_rt_shift;
        if shift == 0.0 {
            f64::INFINITY
        } else if shift <= 1.0 {
            let (min, max) = reference
                .values()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &rt| {
                    (min.min(rt), max.max(rt))
                });
            shift * (max - min)
        } else {
            shift
        }
    }

    fn compute_transformations(
        &self,
        runs: Vec<SequenceRts>,
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        self.params.check()?;
        if let Some(reference) = &self.reference {
            reference.check_index(runs.len())?;
        }
        info!(
            "{} alignment of {} runs, reference {:?}",
            Self::NAME,
            runs.len(),
            self.reference
        );

        let medians: Vec<SequenceRt> = runs
            .into_iter()
            .map(|run| {
                run.into_iter()
                    .map(|(sequence, rts)| (sequence, median(rts)))
                    .collect()
            })
            .collect();
        let reference = self.reference_rts(&medians)?;
        if reference.is_empty() && !medians.is_empty() {
            return Err(AlignmentError::unable_to_fit(
                Self::NAME,
                "no reference retention times",
            ));
        }
        let max_shift = self.max_shift(&reference);
        let reference_index = self.reference.as_ref().and_then(Reference::index);

        let mut trafos: Vec<_> = medians
            .iter()
            .enumerate()
            .map(|(i, run)| {
                if Some(i) == reference_index {
                    return TransformationDescription::identity();
                }
                let data: Vec<_> = run
                    .iter()
                    .filter_map(|(sequence, &rt)| {
                        let &reference_rt = reference.get(sequence)?;
                        ((reference_rt - rt).abs() <= max_shift)
                            .then(|| DataPoint::with_note(rt, reference_rt, sequence.as_str()))
                    })
                    .collect();
                if data.len() < FEW_DATA_POINTS {
                    warn!(
                        "only {} retention time pairs for run {i}, the alignment may be poor",
                        data.len()
                    );
                }
                TransformationDescription::from_data_points(data)
            })
            .collect();
        self.params.model.fit(&mut trafos)?;
        Ok(trafos)
    }
}

impl MapAlignmentAlgorithm for IdentificationAlignment {
    fn set_reference(&mut self, reference: Option<Reference>) -> Result<(), AlignmentError> {
        if let Some(reference) = &reference {
            reference.check_file()?;
        }
        self.reference = reference;
        Ok(())
    }

    fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    fn align_feature_maps(
        &self,
        maps: &[FeatureMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        let runs = maps.iter().map(|map| self.feature_map_rts(map)).collect();
        self.compute_transformations(runs)
    }

    fn align_peptide_identifications(
        &self,
        runs: &[Vec<PeptideIdentification>],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        let runs = runs
            .iter()
            .map(|ids| {
                let mut rts = SequenceRts::new();
                self.collect_identifications(ids, &mut rts);
                rts
            })
            .collect();
        self.compute_transformations(runs)
    }
}

fn median(rts: Vec<f64>) -> f64 {
    SortedArray::from(rts).median()
}

#[derive(Deserialize)]
struct ReferenceRecord {
    sequence: String,
    rt: f64,
}

fn read_reference_file(path: &Path) -> Result<SequenceRt, AlignmentError> {
    let read_error = |err: csv::Error| {
        AlignmentError::InvalidParameter(format!(
            "cannot read reference file {}: {err}",
            path.display()
        ))
    };
    let mut rts = SequenceRts::new();
    for record in csv::Reader::from_path(path).map_err(read_error)?.deserialize() {
        let ReferenceRecord { sequence, rt } = record.map_err(read_error)?;
        rts.entry(sequence).or_default().push(rt);
    }
    Ok(rts
        .into_iter()
        .map(|(sequence, rts)| (sequence, median(rts)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::alignment::info::AlignmentInfoTrait;
    use crate::maps::{ConsensusFeature, ConsensusMap, Feature, PeptideHit};
    use crate::params::Params;

    use approx::assert_relative_eq;
    use std::io::Write;

    const SEQUENCES: [&str; 6] = ["AAK", "CCR", "DDK", "EEK", "FFR", "GGK"];

    fn identification(sequence: &str, rt: f64) -> PeptideIdentification {
        PeptideIdentification::new(rt, 500.0, vec![PeptideHit::new(sequence, 10.0)])
    }

    /// Run `i` is shifted by `10 i` seconds
    fn shifted_runs(num_runs: usize) -> Vec<Vec<PeptideIdentification>> {
        (0..num_runs)
            .map(|i| {
                SEQUENCES
                    .iter()
                    .enumerate()
                    .map(|(j, seq)| identification(seq, 100.0 * (j + 1) as f64 + 10.0 * i as f64))
                    .collect()
            })
            .collect()
    }

    fn linear_alignment() -> IdentificationAlignment {
        IdentificationAlignment::new(IdentificationAlignmentParams {
            max_rt_shift: 0.0,
            model: ModelSpec::new("linear", Params::new()),
            ..IdentificationAlignmentParams::default()
        })
    }

    #[test]
    fn chosen_reference_gets_identity() {
        let mut alignment = linear_alignment();
        alignment.set_reference(Some(Reference::Index(2))).unwrap();
        let trafos = alignment
            .align_peptide_identifications(&shifted_runs(3))
            .unwrap();
        assert_eq!(trafos.len(), 3);
        assert_eq!(trafos[2].model_type(), "identity");
        assert_eq!(trafos[0].model_type(), "linear");
        assert_relative_eq!(trafos[0].apply(100.0), 120.0, epsilon = 1e-9);
        assert_relative_eq!(trafos[1].apply(250.0), 260.0, epsilon = 1e-9);
        assert_eq!(trafos[0].data_points()[0].note, "AAK");
    }

    #[test]
    fn reference_index_out_of_range() {
        let mut alignment = linear_alignment();
        alignment.set_reference(Some(Reference::Index(3))).unwrap();
        assert!(matches!(
            alignment.align_peptide_identifications(&shifted_runs(3)),
            Err(AlignmentError::InvalidParameter(_))
        ));
    }

    #[test]
    fn consensus_reference_is_median_of_runs() {
        let alignment = linear_alignment();
        let trafos = alignment
            .align_peptide_identifications(&shifted_runs(3))
            .unwrap();
        // Median run is shifted by 10 seconds
        assert_relative_eq!(trafos[0].apply(300.0), 310.0, epsilon = 1e-9);
        assert_relative_eq!(trafos[1].apply(300.0), 300.0, epsilon = 1e-9);
        assert_relative_eq!(trafos[2].apply(300.0), 290.0, epsilon = 1e-9);
    }

    #[test]
    fn min_run_occur_is_clamped() {
        let alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            min_run_occur: 5,
            ..linear_alignment().params
        });
        let trafos = alignment
            .align_peptide_identifications(&shifted_runs(2))
            .unwrap();
        assert_eq!(trafos[0].data_points().len(), SEQUENCES.len());
    }

    #[test]
    fn large_shifts_are_dropped() {
        let mut runs = shifted_runs(2);
        runs[1][0].rt = 400.0;
        let mut alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            max_rt_shift: 50.0,
            ..linear_alignment().params
        });
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        assert_eq!(trafos[1].data_points().len(), SEQUENCES.len() - 1);
        assert_relative_eq!(trafos[1].apply(210.0), 200.0, epsilon = 1e-9);

        // Fraction of the 500 s reference range
        let mut alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            max_rt_shift: 0.01,
            ..linear_alignment().params
        });
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        let err = alignment.align_peptide_identifications(&runs).unwrap_err();
        assert!(matches!(err, AlignmentError::UnableToFit { .. }));
    }

    #[test]
    fn score_threshold() {
        let mut runs = shifted_runs(2);
        runs[1][0].hits[0].score = 1.0;
        runs[1][0].rt = 1000.0;
        let mut alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            min_score: Some(5.0),
            ..linear_alignment().params
        });
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        assert_eq!(trafos[1].data_points().len(), SEQUENCES.len() - 1);
    }

    #[test]
    fn score_threshold_lower_is_better() {
        // e-values: the first two identifications of run 1 are too large
        let mut runs: Vec<Vec<_>> = shifted_runs(2)
            .into_iter()
            .map(|run| {
                run.into_iter()
                    .map(|mut id| {
                        id.hits[0].score = 0.01;
                        id.with_higher_score_better(false)
                    })
                    .collect()
            })
            .collect();
        runs[1][0].hits[0].score = 0.5;
        runs[1][1].hits[0].score = 0.05;
        let mut alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            min_score: Some(0.05),
            ..linear_alignment().params
        });
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        let sources: Vec<_> = trafos[1].data_points().iter().map(|p| p.source).collect();
        assert_eq!(sources.len(), SEQUENCES.len() - 1);
        assert!(!sources.contains(&110.0));
        assert!(sources.contains(&210.0));
    }

    #[test]
    fn reference_file() {
        let path = std::env::temp_dir().join("map_alignment_reference_file.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sequence,rt").unwrap();
        for (j, seq) in SEQUENCES.iter().enumerate() {
            writeln!(file, "{seq},{}", 50.0 * (j + 1) as f64).unwrap();
        }
        drop(file);

        let mut alignment = linear_alignment();
        alignment.set_reference(Some(Reference::file(&path))).unwrap();
        let trafos = alignment
            .align_peptide_identifications(&shifted_runs(2))
            .unwrap();
        assert_eq!(trafos[0].model_type(), "linear");
        assert_relative_eq!(trafos[0].apply(200.0), 100.0, epsilon = 1e-9);
        assert_relative_eq!(trafos[1].apply(210.0), 100.0, epsilon = 1e-9);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            alignment.set_reference(Some(Reference::file(&path))),
            Err(AlignmentError::InvalidParameter(_))
        ));
    }

    fn feature_maps() -> Vec<FeatureMap> {
        shifted_runs(2)
            .into_iter()
            .map(|ids| {
                let mut ids = ids.into_iter();
                let features = ids
                    .by_ref()
                    .take(4)
                    .map(|id| Feature::new(id.rt + 1.0, id.mz, 1e5).with_identifications(vec![id]))
                    .collect();
                let mut map = FeatureMap::new(features);
                map.unassigned_peptide_identifications = ids.collect();
                map
            })
            .collect()
    }

    #[test]
    fn feature_maps_with_unassigned() {
        let mut alignment = linear_alignment();
        alignment.set_reference(Some(Reference::Index(1))).unwrap();
        let trafos = alignment.align_feature_maps(&feature_maps()).unwrap();
        assert_eq!(trafos[0].data_points().len(), SEQUENCES.len());
        assert_relative_eq!(trafos[0].apply(100.0), 110.0, epsilon = 1e-9);

        let mut alignment = IdentificationAlignment::new(IdentificationAlignmentParams {
            use_unassigned_peptides: false,
            use_feature_rt: true,
            ..linear_alignment().params
        });
        alignment.set_reference(Some(Reference::Index(1))).unwrap();
        let trafos = alignment.align_feature_maps(&feature_maps()).unwrap();
        assert_eq!(trafos[0].data_points().len(), 4);
        assert_relative_eq!(trafos[0].data_points()[0].source, 101.0);
    }

    #[test]
    fn consensus_maps_through_feature_maps() {
        let mut maps: Vec<_> = shifted_runs(2)
            .into_iter()
            .map(|ids| {
                ConsensusMap::new(
                    ids.into_iter()
                        .map(|id| {
                            let mut feature = ConsensusFeature::new(id.rt, id.mz, 1.0);
                            feature.peptide_identifications.push(id);
                            feature
                        })
                        .collect(),
                )
            })
            .collect();
        let mut alignment = linear_alignment();
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        alignment.align_consensus_maps(&mut maps).unwrap();
        assert_relative_eq!(maps[1].features[0].rt, 100.0, epsilon = 1e-9);
        assert_relative_eq!(
            maps[1].features[0].peptide_identifications[0].rt,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn default_spline_model() {
        let alignment = IdentificationAlignment::default();
        assert!(alignment.info().reference_support);
        let runs = shifted_runs(2);
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        assert_eq!(trafos[0].model_type(), "b_spline");
        assert_relative_eq!(trafos[0].apply(300.0), 305.0, epsilon = 1e-6);
    }

    #[test]
    fn params_serde() {
        let params: IdentificationAlignmentParams =
            serde_json::from_str(r#"{"min_run_occur": 3, "model": {"model_type": "linear"}}"#)
                .unwrap();
        assert_eq!(params.min_run_occur, 3);
        assert_eq!(params.max_rt_shift, 0.5);
        assert_eq!(params.model, ModelSpec::new("linear", Params::new()));
    }

    fn fixture_alignment() -> IdentificationAlignment {
        IdentificationAlignment::new(IdentificationAlignmentParams {
            model: ModelSpec::new("b_spline", Params::new().with("num_nodes", 10)),
            ..IdentificationAlignmentParams::default()
        })
    }

    #[test]
    fn fixture_runs_onto_undrifted_run() {
        crate::tests::init_logger();
        let runs = crate::tests::fixture_identification_runs();
        let mut alignment = fixture_alignment();
        alignment.set_reference(Some(Reference::Index(0))).unwrap();
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        assert_eq!(trafos.len(), runs.len());
        assert_eq!(trafos[0].model_type(), "identity");

        let mut reference = SequenceRts::new();
        alignment.collect_identifications(&runs[0], &mut reference);
        for (run, trafo) in runs.iter().zip(&trafos).skip(1) {
            assert!(trafo.data_points().len() > 50);
            for id in run {
                let Some(rts) = reference.get(&id.hits[0].sequence) else {
                    continue;
                };
                let expected = median(rts.clone());
                assert!(
                    (trafo.apply(id.rt) - expected).abs() < 4.0,
                    "{}: {} is mapped to {}, expected {expected}",
                    id.hits[0].sequence,
                    id.rt,
                    trafo.apply(id.rt),
                );
            }
        }
    }

    #[test]
    fn fixture_runs_onto_reference_file() {
        let runs = crate::tests::fixture_identification_runs();
        let mut alignment = fixture_alignment();
        alignment
            .set_reference(Some(Reference::file(
                map_alignment_test_util::REFERENCE_CSV_PATH,
            )))
            .unwrap();
        let trafos = alignment.align_peptide_identifications(&runs).unwrap();
        for (run, trafo) in runs.iter().zip(&trafos) {
            assert_eq!(trafo.model_type(), "b_spline");
            for id in run {
                let expected = map_alignment_test_util::REFERENCE_RTS[&id.hits[0].sequence];
                assert!((trafo.apply(id.rt) - expected).abs() < 3.0);
            }
        }
        let statistics = trafos[1].statistics();
        assert!(statistics[0].after < statistics[0].before);
    }
}
