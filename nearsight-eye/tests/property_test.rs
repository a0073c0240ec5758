use nearsight_eye::config::{DuplicateLabelPolicy, FusionConfig};
use nearsight_eye::processing::filter::filter;
use nearsight_eye::processing::sampler::sample;
use nearsight_eye::{BoundingBox, DataOrganizer, DepthMap, Detection, FusedObject, RecordValue};
use proptest::prelude::*;
use std::collections::HashSet;

fn depth_map() -> impl Strategy<Value = DepthMap> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop_oneof![3 => Just(0u16), 1 => 1u16..5000], (w * h) as usize)
            .prop_map(move |data| DepthMap::new(w, h, data).unwrap())
    })
}

fn detection() -> impl Strategy<Value = Detection> {
    (0f32..500.0, 0f32..500.0, 0f32..300.0, 0f32..300.0, "[a-z]{1,6}").prop_map(|(x, y, w, h, label)| {
        Detection::new(label, 0.5, BoundingBox::new(x, y, x + w, y + h))
    })
}

fn fused_objects() -> impl Strategy<Value = Vec<FusedObject>> {
    prop::collection::vec(
        ("[a-c]{1,2}", prop::option::weighted(0.7, 0u32..20_000))
            .prop_map(|(label, d)| FusedObject::new(label, d)),
        0..10,
    )
}

proptest! {
    #[test]
    fn test_sample_valid_iff_any_reading(
        depth in depth_map(),
        x in -5f32..30.0,
        y in -5f32..30.0,
        radius in 0u32..5,
    ) {
        let cx = x.round() as i64;
        let cy = y.round() as i64;
        let r = radius as i64;
        let mut readings = Vec::new();
        for py in (cy - r)..=(cy + r) {
            for px in (cx - r)..=(cx + r) {
                if px >= 0 && py >= 0 {
                    if let Some(d) = depth.get(px as u32, py as u32) {
                        if d != 0 {
                            readings.push(d);
                        }
                    }
                }
            }
        }

        let result = sample(&depth, x, y, radius);
        prop_assert_eq!(result.is_some(), !readings.is_empty());
        if let Some(mean) = result {
            let min = *readings.iter().min().unwrap() as u32;
            let max = *readings.iter().max().unwrap() as u32;
            prop_assert!(mean >= min && mean <= max);
        }
    }

    #[test]
    fn test_filter_is_ordered_subset(
        detections in prop::collection::vec(detection(), 0..20),
        min_area in 0f32..40_000.0,
    ) {
        let kept = filter(&detections, min_area);

        let mut cursor = detections.iter();
        for d in &kept {
            prop_assert!(d.bbox.area() >= min_area);
            prop_assert!(cursor.any(|orig| orig == d));
        }

        let removed = detections.iter().filter(|d| d.bbox.area() < min_area).count();
        prop_assert_eq!(kept.len() + removed, detections.len());
    }

    #[test]
    fn test_organize_always_has_k_unique_entries(
        fused in fused_objects(),
        top_k in 1usize..6,
        overwrite in any::<bool>(),
    ) {
        let policy = if overwrite { DuplicateLabelPolicy::Overwrite } else { DuplicateLabelPolicy::Disambiguate };
        let record = DataOrganizer::with_top_k(top_k, policy).organize(&fused);

        prop_assert_eq!(record.len(), top_k);
        let keys: HashSet<_> = record.keys().collect();
        prop_assert_eq!(keys.len(), top_k);
    }

    #[test]
    fn test_organize_is_idempotent(fused in fused_objects()) {
        let organizer = DataOrganizer::new(&FusionConfig::default());
        prop_assert_eq!(organizer.organize(&fused), organizer.organize(&fused));
    }

    #[test]
    fn test_ranked_values_ascend(fused in fused_objects()) {
        let record = DataOrganizer::new(&FusionConfig::default()).organize(&fused);
        let meters: Vec<f64> = record
            .entries()
            .iter()
            .filter_map(|(_, v)| match v {
                RecordValue::Meters(m) => Some(*m),
                RecordValue::NotAvailable => None,
            })
            .collect();

        prop_assert!(meters.windows(2).all(|w| w[0] <= w[1]));
        let valid = fused.iter().filter(|f| f.distance_mm.is_some()).count();
        prop_assert_eq!(meters.len(), valid.min(3));
    }
}
