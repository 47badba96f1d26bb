use crate::alignment::algorithm::{MapAlignmentAlgorithm, ModelSpec};
use crate::alignment::info::InputKind;
use crate::data::DataPoint;
use crate::description::TransformationDescription;
use crate::error::AlignmentError;
use crate::maps::{CompactMap, PeakMap, Spectrum};

use itertools::{EitherOrBoth, Itertools};
use log::{debug, info, warn};
use macro_const::macro_const;
use ndarray::Array2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Runs with fewer anchor points get a warning
const FEW_DATA_POINTS: usize = 10;

/// Smallest distance between block corners, in spectra
const MIN_BLOCK_SIZE: usize = 3;

macro_const! {
    const DOC: &str = r#"
Alignment of raw runs by the similarity of their MS1 spectra

The first map is the reference. The MS1 spectra of every other map, ordered by retention time, are
globally aligned to the reference spectra with affine gap costs: opening a gap costs `gap_cost`,
every further skipped spectrum `affine_gap_cost`. The alignment is split into up to four blocks
whose corners are confidently matched spectra at a quarter, a half and three quarters of either
run, every block is aligned on its own. Spectra are compared by the cosine similarity of their
intensities binned to `bin_size` m/z units; a pair scores `2 + similarity` if the similarity
reaches `cutoff_score` and `mismatch_score` otherwise.

Matched pairs are split into consecutive buckets of `bucket_size` matches, every bucket keeps its
best `anchor_points` percent (at least one). Each kept pair gives a data point
`(rt, reference rt)`, the points are fitted with `model`, a smoothing spline by default.
"#;
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SpectrumAlignmentParams {
    /// Cost of opening a gap
    #[serde(default = "SpectrumAlignmentParams::default_gap_cost")]
    pub gap_cost: f64,
    /// Cost of extending an open gap by one more spectrum
    #[serde(default = "SpectrumAlignmentParams::default_affine_gap_cost")]
    pub affine_gap_cost: f64,
    #[serde(default = "SpectrumAlignmentParams::default_cutoff_score")]
    pub cutoff_score: f64,
    #[serde(default = "SpectrumAlignmentParams::default_mismatch_score")]
    pub mismatch_score: f64,
    #[serde(default = "SpectrumAlignmentParams::default_bucket_size")]
    pub bucket_size: usize,
    /// Percentage of every bucket kept as anchor points
    #[serde(default = "SpectrumAlignmentParams::default_anchor_points")]
    pub anchor_points: usize,
    /// Width of m/z bins for spectrum comparison
    #[serde(default = "SpectrumAlignmentParams::default_bin_size")]
    pub bin_size: f64,
    #[serde(default)]
    pub model: ModelSpec,
}

impl SpectrumAlignmentParams {
    #[inline]
    pub fn default_gap_cost() -> f64 {
        1.0
    }

    #[inline]
    pub fn default_affine_gap_cost() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_cutoff_score() -> f64 {
        0.7
    }

    #[inline]
    pub fn default_mismatch_score() -> f64 {
        -5.0
    }

    #[inline]
    pub fn default_bucket_size() -> usize {
        100
    }

    #[inline]
    pub fn default_anchor_points() -> usize {
        100
    }

    #[inline]
    pub fn default_bin_size() -> f64 {
        1.0
    }

    fn check(&self) -> Result<(), AlignmentError> {
        let invalid = |name: &str, value: &dyn std::fmt::Display, range: &str| {
            Err(AlignmentError::InvalidParameter(format!(
                "{name} must be {range}, got {value}"
            )))
        };
        if !(self.gap_cost >= 0.0 && self.gap_cost.is_finite()) {
            return invalid("gap_cost", &self.gap_cost, "finite and non-negative");
        }
        if !(self.affine_gap_cost >= 0.0 && self.affine_gap_cost.is_finite()) {
            return invalid("affine_gap_cost", &self.affine_gap_cost, "finite and non-negative");
        }
        if !(0.0..=1.0).contains(&self.cutoff_score) {
            return invalid("cutoff_score", &self.cutoff_score, "in [0, 1]");
        }
        if !(self.mismatch_score <= 0.0) {
            return invalid("mismatch_score", &self.mismatch_score, "non-positive");
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size", &self.bucket_size, "positive");
        }
        if !(1..=100).contains(&self.anchor_points) {
            return invalid("anchor_points", &self.anchor_points, "in [1, 100]");
        }
        if !(self.bin_size > 0.0 && self.bin_size.is_finite()) {
            return invalid("bin_size", &self.bin_size, "positive");
        }
        Ok(())
    }
}

impl Default for SpectrumAlignmentParams {
    fn default() -> Self {
        Self {
            gap_cost: Self::default_gap_cost(),
            affine_gap_cost: Self::default_affine_gap_cost(),
            cutoff_score: Self::default_cutoff_score(),
            mismatch_score: Self::default_mismatch_score(),
            bucket_size: Self::default_bucket_size(),
            anchor_points: Self::default_anchor_points(),
            bin_size: Self::default_bin_size(),
            model: ModelSpec::default(),
        }
    }
}

#[doc = DOC!()]
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SpectrumAlignment {
    params: SpectrumAlignmentParams,
}

alignment_info!(
    SPECTRUM_ALIGNMENT_INFO,
    SpectrumAlignment,
    name: SpectrumAlignment::NAME,
    reference_support: false,
    inputs: &[InputKind::PeakMaps, InputKind::CompactMaps],
);

impl SpectrumAlignment {
    pub const NAME: &'static str = "spectrum_alignment";

    pub fn new(params: SpectrumAlignmentParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SpectrumAlignmentParams {
        &self.params
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    #[inline]
    fn pair_score(&self, similarity: f64) -> f64 {
        if similarity >= self.params.cutoff_score {
            2.0 + similarity
        } else {
            self.params.mismatch_score
        }
    }

    /// Index of the candidate most similar to `spectrum`, if the similarity reaches the cutoff
    fn best_partner(
        &self,
        spectrum: &BinnedSpectrum,
        candidates: &[BinnedSpectrum],
    ) -> Option<usize> {
        candidates
            .iter()
            .map(|candidate| spectrum.cosine(candidate))
            .enumerate()
            .filter(|&(_, similarity)| similarity >= self.params.cutoff_score)
            .min_by(|a, b| b.1.total_cmp(&a.1))
            .map(|(k, _)| k)
    }

    /// Corners `(reference, aligned)` of the blocks aligned independently
    ///
    /// Blocks run from the first to the last spectra of both runs through confidently matched
    /// spectra at a quarter, a half and three quarters of either run. Corners are at least
    /// [MIN_BLOCK_SIZE] spectra apart in both runs.
    fn block_corners(
        &self,
        reference: &[BinnedSpectrum],
        aligned: &[BinnedSpectrum],
    ) -> Vec<(usize, usize)> {
        let end = (reference.len() - 1, aligned.len() - 1);
        let mut corners = vec![(0, 0)];
        let mut last = (0, 0);
        for quarter in 1..=3 {
            let x = reference.len() * quarter / 4;
            let y = aligned.len() * quarter / 4;
            let candidates = [
                self.best_partner(&aligned[y], reference).map(|x| (x, y)),
                self.best_partner(&reference[x], aligned).map(|y| (x, y)),
            ];
            for (x, y) in candidates.into_iter().flatten() {
                if x >= last.0 + MIN_BLOCK_SIZE
                    && y >= last.1 + MIN_BLOCK_SIZE
                    && x + MIN_BLOCK_SIZE <= end.0
                    && y + MIN_BLOCK_SIZE <= end.1
                {
                    corners.push((x, y));
                    last = (x, y);
                }
            }
        }
        corners.push(end);
        corners
    }

    /// Matched pairs of the block-wise global alignment, unique per aligned spectrum
    fn blockwise_alignment(
        &self,
        reference: &[BinnedSpectrum],
        aligned: &[BinnedSpectrum],
    ) -> Vec<Match> {
        let corners = self.block_corners(reference, aligned);
        debug!("aligning {} blocks with corners {corners:?}", corners.len() - 1);
        let mut matches: Vec<Match> = vec![];
        for (&(x0, y0), &(x1, y1)) in corners.iter().tuple_windows() {
            for m in self.global_alignment(&reference[x0..=x1], &aligned[y0..=y1]) {
                let m = Match {
                    reference: m.reference + x0,
                    aligned: m.aligned + y0,
                    similarity: m.similarity,
                };
                // corners belong to both adjacent blocks
                if matches.last().is_none_or(|last| last.aligned < m.aligned) {
                    matches.push(m);
                }
            }
        }
        matches
    }

    /// Matched pairs of the optimal global alignment with affine gap costs, ordered by index
    ///
    /// A gap of `k` spectra costs `gap_cost + (k - 1) * affine_gap_cost`. Scores are kept for two
    /// rows only, the traceback stores the predecessor state of every state of every cell.
    fn global_alignment(
        &self,
        reference: &[BinnedSpectrum],
        aligned: &[BinnedSpectrum],
    ) -> Vec<Match> {
        let (n, m) = (reference.len(), aligned.len());
        let open = self.params.gap_cost;
        let extend = self.params.affine_gap_cost;
        let gap = |length: usize| -open - (length - 1) as f64 * extend;

        let mut trace = Array2::from_elem((n + 1, m + 1), [Move::Diagonal; 3]);
        let mut previous = vec![[f64::NEG_INFINITY; 3]; m + 1];
        previous[0][Move::Diagonal.index()] = 0.0;
        for j in 1..=m {
            previous[j][Move::SkipAligned.index()] = gap(j);
            if j > 1 {
                trace[(0, j)][Move::SkipAligned.index()] = Move::SkipAligned;
            }
        }
        for i in 1..=n {
            let mut current = vec![[f64::NEG_INFINITY; 3]; m + 1];
            current[0][Move::SkipReference.index()] = gap(i);
            if i > 1 {
                trace[(i, 0)][Move::SkipReference.index()] = Move::SkipReference;
            }
            for j in 1..=m {
                let similarity = reference[i - 1].cosine(&aligned[j - 1]);
                let diagonal = Move::best(previous[j - 1]);
                let skip_reference = Move::best([
                    previous[j][0] - open,
                    previous[j][1] - extend,
                    previous[j][2] - open,
                ]);
                let skip_aligned = Move::best([
                    current[j - 1][0] - open,
                    current[j - 1][1] - open,
                    current[j - 1][2] - extend,
                ]);
                current[j] = [
                    diagonal.1 + self.pair_score(similarity),
                    skip_reference.1,
                    skip_aligned.1,
                ];
                trace[(i, j)] = [diagonal.0, skip_reference.0, skip_aligned.0];
            }
            previous = current;
        }

        let mut matches = vec![];
        let (mut i, mut j) = (n, m);
        let mut state = Move::best(previous[m]).0;
        while i > 0 || j > 0 {
            let predecessor = trace[(i, j)][state.index()];
            match state {
                Move::Diagonal => {
                    i -= 1;
                    j -= 1;
                    // Mismatched pairs are aligned but not matched
                    let similarity = reference[i].cosine(&aligned[j]);
                    if similarity >= self.params.cutoff_score {
                        matches.push(Match {
                            reference: i,
                            aligned: j,
                            similarity,
                        });
                    }
                }
                Move::SkipReference => i -= 1,
                Move::SkipAligned => j -= 1,
            }
            state = predecessor;
        }
        matches.reverse();
        matches
    }

    fn align_spectra(
        &self,
        runs: &[Vec<&Spectrum>],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        self.params.check()?;
        info!("{} alignment of {} runs", Self::NAME, runs.len());
        if let Some(i) = runs.iter().position(Vec::is_empty) {
            return Err(AlignmentError::unable_to_fit(
                Self::NAME,
                format!("map {i} has no MS1 spectra"),
            ));
        }
        let binned: Vec<Vec<_>> = runs
            .iter()
            .map(|spectra| {
                spectra
                    .iter()
                    .map(|s| BinnedSpectrum::new(s, self.params.bin_size))
                    .collect()
            })
            .collect();
        let Some(reference) = binned.first() else {
            return Ok(vec![]);
        };

        let mut trafos = vec![TransformationDescription::identity()];
        for (i, aligned) in binned.iter().enumerate().skip(1) {
            let matches = self.blockwise_alignment(reference, aligned);
            let anchors = bucket_filter(
                &matches,
                self.params.bucket_size,
                self.params.anchor_points,
                self.params.cutoff_score,
            );
            if anchors.len() < FEW_DATA_POINTS {
                warn!(
                    "only {} anchor points for map {i}, the alignment may be poor",
                    anchors.len()
                );
            }
            let data = anchors
                .iter()
                .map(|a| DataPoint::new(runs[i][a.aligned].rt, runs[0][a.reference].rt))
                .collect();
            trafos.push(TransformationDescription::from_data_points(data));
        }
        self.params.model.fit(&mut trafos)?;
        Ok(trafos)
    }
}

impl MapAlignmentAlgorithm for SpectrumAlignment {
    fn align_peak_maps(
        &self,
        maps: &[PeakMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        let runs: Vec<_> = maps.iter().map(PeakMap::ms1_spectra).collect();
        self.align_spectra(&runs)
    }

    fn align_compact_maps(
        &self,
        maps: &[CompactMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        let spectra: Vec<_> = maps.iter().map(CompactMap::spectra).collect();
        let runs: Vec<Vec<_>> = spectra.iter().map(|s| s.iter().collect()).collect();
        self.align_spectra(&runs)
    }
}

/// Last step of an alignment path, also the state of the affine gap recursion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Move {
    Diagonal,
    SkipReference,
    SkipAligned,
}

impl Move {
    const ALL: [Self; 3] = [Self::Diagonal, Self::SkipReference, Self::SkipAligned];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Best of the scores indexed by state, ties go to the earlier state
    #[inline]
    fn best(scores: [f64; 3]) -> (Self, f64) {
        Self::ALL
            .into_iter()
            .zip(scores)
            .fold((Self::Diagonal, f64::NEG_INFINITY), |best, (state, score)| {
                if score > best.1 { (state, score) } else { best }
            })
    }
}

/// Pair of spectrum indices
#[derive(Clone, Copy, Debug, PartialEq)]
struct Match {
    reference: usize,
    aligned: usize,
    similarity: f64,
}

/// Sparse intensity vector, bins are sorted and unique
#[derive(Clone, Debug)]
struct BinnedSpectrum {
    bins: Vec<(i64, f64)>,
    norm: f64,
}

impl BinnedSpectrum {
    fn new(spectrum: &Spectrum, bin_size: f64) -> Self {
        let bins: Vec<(i64, f64)> = spectrum
            .peaks
            .iter()
            .filter(|p| p.mz.is_finite() && p.intensity.is_finite())
            .map(|p| ((p.mz / bin_size).floor() as i64, p.intensity))
            .sorted_by_key(|&(bin, _)| bin)
            .chunk_by(|&(bin, _)| bin)
            .into_iter()
            .map(|(bin, group)| (bin, group.map(|(_, intensity)| intensity).sum()))
            .collect();
        let norm = bins.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        Self { bins, norm }
    }

    /// Cosine similarity clamped to unity, zero for an empty spectrum
    fn cosine(&self, other: &Self) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let dot: f64 = self
            .bins
            .iter()
            .merge_join_by(&other.bins, |a, b| a.0.cmp(&b.0))
            .filter_map(|pair| match pair {
                EitherOrBoth::Both(a, b) => Some(a.1 * b.1),
                _ => None,
            })
            .sum();
        (dot / (self.norm * other.norm)).min(1.0)
    }
}

/// Best `anchor_points` percent of every bucket of consecutive matches, one per aligned spectrum
fn bucket_filter(
    matches: &[Match],
    bucket_size: usize,
    anchor_points: usize,
    cutoff_score: f64,
) -> Vec<Match> {
    let mut anchors: Vec<_> = matches
        .chunks(bucket_size)
        .flat_map(|bucket| {
            let keep = (bucket.len() * anchor_points / 100).max(1);
            bucket
                .iter()
                .filter(|m| m.similarity >= cutoff_score)
                .sorted_by(|a, b| b.similarity.total_cmp(&a.similarity))
                .take(keep)
                .copied()
        })
        .collect();
    anchors.sort_by_key(|m| m.aligned);
    anchors.dedup_by_key(|m| m.aligned);
    anchors
}
