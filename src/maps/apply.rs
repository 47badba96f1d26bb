use crate::description::TransformationDescription;
use crate::maps::compact_map::CompactMap;
use crate::maps::consensus_map::ConsensusMap;
use crate::maps::feature_map::FeatureMap;
use crate::maps::peak_map::PeakMap;
use crate::maps::peptide_identification::PeptideIdentification;

/// Rewrite every retention time of a collection through a transformation
///
/// With `store_original_rt` an element keeps its first untransformed retention time in its
/// `original_rt` field; applying several transformations in a row does not overwrite it.
pub trait ApplyTransformation {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    );
}

fn transform_rt(
    rt: &mut f64,
    original_rt: &mut Option<f64>,
    trafo: &TransformationDescription,
    store_original_rt: bool,
) {
    if store_original_rt && original_rt.is_none() {
        *original_rt = Some(*rt);
    }
    *rt = trafo.apply(*rt);
}

impl ApplyTransformation for PeakMap {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    ) {
        for spectrum in self.spectra.iter_mut() {
            transform_rt(
                &mut spectrum.rt,
                &mut spectrum.original_rt,
                trafo,
                store_original_rt,
            );
        }
    }
}

impl ApplyTransformation for CompactMap {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    ) {
        for peak in self.peaks.iter_mut() {
            transform_rt(&mut peak.rt, &mut peak.original_rt, trafo, store_original_rt);
        }
    }
}

impl ApplyTransformation for [PeptideIdentification] {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    ) {
        for id in self.iter_mut() {
            transform_rt(&mut id.rt, &mut id.original_rt, trafo, store_original_rt);
        }
    }
}

impl ApplyTransformation for FeatureMap {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    ) {
        for feature in self.features.iter_mut() {
            transform_rt(
                &mut feature.rt,
                &mut feature.original_rt,
                trafo,
                store_original_rt,
            );
            feature
                .peptide_identifications
                .transform_retention_times(trafo, store_original_rt);
        }
        self.unassigned_peptide_identifications
            .transform_retention_times(trafo, store_original_rt);
    }
}

/// Handles are moved along with their consensus feature, they keep no original retention time
impl ApplyTransformation for ConsensusMap {
    fn transform_retention_times(
        &mut self,
        trafo: &TransformationDescription,
        store_original_rt: bool,
    ) {
        for feature in self.features.iter_mut() {
            transform_rt(
                &mut feature.rt,
                &mut feature.original_rt,
                trafo,
                store_original_rt,
            );
            for handle in feature.handles.iter_mut() {
                handle.rt = trafo.apply(handle.rt);
            }
            feature
                .peptide_identifications
                .transform_retention_times(trafo, store_original_rt);
        }
        self.unassigned_peptide_identifications
            .transform_retention_times(trafo, store_original_rt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data::DataPoint;
    use crate::maps::{
        CompactPeak, ConsensusFeature, Feature, FeatureHandle, PeptideHit, Spectrum,
    };
    use crate::params::Params;

    fn shift_by_ten() -> TransformationDescription {
        let mut trafo = TransformationDescription::from_data_points(vec![
            DataPoint::new(0.0, 10.0),
            DataPoint::new(100.0, 110.0),
        ]);
        trafo.fit_model("linear", &Params::new()).unwrap();
        trafo
    }

    #[test]
    fn peak_map() {
        let mut map = PeakMap::new(vec![
            Spectrum::new(5.0, 1, [(400.0, 1.0)]),
            Spectrum::new(6.0, 2, [(200.0, 1.0)]),
        ]);
        map.transform_retention_times(&shift_by_ten(), true);
        assert!((map.spectra[0].rt - 15.0).abs() < 1e-10);
        assert!((map.spectra[1].rt - 16.0).abs() < 1e-10);
        assert_eq!(map.spectra[0].original_rt, Some(5.0));
    }

    #[test]
    fn original_rt_is_stored_once() {
        let mut map = CompactMap::new(vec![CompactPeak::new(1.0, 300.0, 5.0)]);
        map.transform_retention_times(&shift_by_ten(), true);
        map.transform_retention_times(&shift_by_ten(), true);
        assert!((map.peaks[0].rt - 21.0).abs() < 1e-10);
        assert_eq!(map.peaks[0].original_rt, Some(1.0));

        let mut map = CompactMap::new(vec![CompactPeak::new(1.0, 300.0, 5.0)]);
        map.transform_retention_times(&shift_by_ten(), false);
        assert_eq!(map.peaks[0].original_rt, None);
    }

    #[test]
    fn feature_map_moves_identifications() {
        let id = PeptideIdentification::new(20.0, 500.0, vec![PeptideHit::new("PEPTIDE", 1.0)]);
        let mut map = FeatureMap::new(vec![
            Feature::new(20.0, 500.0, 1e5).with_identifications(vec![id.clone()]),
        ]);
        map.unassigned_peptide_identifications.push(id);
        map.transform_retention_times(&shift_by_ten(), false);
        assert!((map.features[0].rt - 30.0).abs() < 1e-10);
        assert!((map.features[0].peptide_identifications[0].rt - 30.0).abs() < 1e-10);
        assert!((map.unassigned_peptide_identifications[0].rt - 30.0).abs() < 1e-10);
    }

    #[test]
    fn consensus_map_moves_handles() {
        let mut feature = ConsensusFeature::new(50.0, 600.0, 1e6);
        feature.handles.push(FeatureHandle {
            map_index: 0,
            rt: 48.0,
            mz: 600.0,
            intensity: 5e5,
        });
        let mut map = ConsensusMap::new(vec![feature]);
        map.transform_retention_times(&shift_by_ten(), true);
        assert!((map.features[0].rt - 60.0).abs() < 1e-10);
        assert!((map.features[0].handles[0].rt - 58.0).abs() < 1e-10);
        assert_eq!(map.features[0].original_rt, Some(50.0));
    }
}
