use endoyolo::dataset::{ClassId, ClassRegistry, YoloBox};
use endoyolo::geometry::{BBoxXYXY, Normalized};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn in_bounds_boxes_normalize_into_unit_range(
        (w, h, rows) in proptest_helpers::arb_item(8)
    ) {
        for raw in &rows {
            let yolo = YoloBox::from_raw(ClassId::new(0), raw, w, h);
            for value in [yolo.x_center, yolo.y_center, yolo.width, yolo.height] {
                prop_assert!((0.0..=1.0).contains(&value), "{value} out of range for {raw:?}");
            }
            prop_assert!(yolo.width > 0.0 && yolo.height > 0.0);
        }
    }

    #[test]
    fn label_line_denormalizes_to_source_corners(
        (w, h, rows) in proptest_helpers::arb_item(8)
    ) {
        let eps = proptest_helpers::eps_yolo(w, h);
        for raw in &rows {
            let line = YoloBox::from_raw(ClassId::new(3), raw, w, h).to_string();
            let fields: Vec<&str> = line.split(' ').collect();
            prop_assert_eq!(fields.len(), 5);
            prop_assert_eq!(fields[0], "3");
            for field in &fields[1..] {
                let decimals = field.split('.').nth(1).map(str::len);
                prop_assert_eq!(decimals, Some(6), "{}", line);
            }

            let values: Vec<f64> = fields[1..]
                .iter()
                .map(|f| f.parse::<f64>().expect("numeric field"))
                .collect();
            let restored = BBoxXYXY::<Normalized>::from_cxcywh(values[0], values[1], values[2], values[3])
                .to_pixel(w as f64, h as f64);

            prop_assert!((restored.xmin() - raw.xmin as f64).abs() <= eps, "{restored:?} vs {raw:?}");
            prop_assert!((restored.ymin() - raw.ymin as f64).abs() <= eps, "{restored:?} vs {raw:?}");
            prop_assert!((restored.xmax() - raw.xmax as f64).abs() <= eps, "{restored:?} vs {raw:?}");
            prop_assert!((restored.ymax() - raw.ymax as f64).abs() <= eps, "{restored:?} vs {raw:?}");
        }
    }

    #[test]
    fn registry_ids_follow_first_appearance(
        names in proptest_helpers::arb_class_sequence(20)
    ) {
        let mut registry = ClassRegistry::new();
        let ids: Vec<u64> = names.iter().map(|n| registry.resolve(n).as_u64()).collect();

        let mut first_seen: Vec<&str> = Vec::new();
        for name in &names {
            if !first_seen.contains(&name.as_str()) {
                first_seen.push(name);
            }
        }

        let expected_names: Vec<String> = first_seen.iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(registry.names().to_vec(), expected_names);
        for (name, id) in names.iter().zip(ids) {
            let expected = first_seen.iter().position(|s| *s == name.as_str()).expect("seen") as u64;
            prop_assert_eq!(id, expected);
        }
        let keys: Vec<u64> = registry.id_to_name().keys().copied().collect();
        prop_assert_eq!(keys, (0..registry.len() as u64).collect::<Vec<_>>());
    }
}
