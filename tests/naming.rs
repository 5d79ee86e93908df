use colony_counter::model::Dilution;
use colony_counter::{NameResolver, ResolverConfig};
use std::path::Path;

#[test]
fn sample_and_ordinal_with_day_folder() {
    let name = NameResolver::default().resolve(Path::new("plates/Day 3/3_1_3rd_dilution.JPG"));
    assert_eq!(name.day, Some(3));
    assert_eq!(name.sample, Some(1));
    assert_eq!(name.dilution, Some(Dilution::X1000));
    assert_eq!(name.display_name, "Day 3 - Sample 1 - x1000 dilution");
}

#[test]
fn short_name_takes_day_from_folder() {
    let name = NameResolver::default().resolve_name("12_2nd.jpg", Some("Day 7"));
    assert_eq!((name.day, name.sample), (Some(7), Some(12)));
    assert_eq!(name.dilution, Some(Dilution::X100));
    assert!(name.timepoint(0).is_some());
}

#[test]
fn inline_day_sample_and_dilution() {
    let name = NameResolver::default().resolve_name("19_23_2nd_dilution.JPG", None);
    assert_eq!(name.day, Some(19));
    assert_eq!(name.sample, Some(23));
    assert_eq!(name.dilution, Some(Dilution::X100));
    let tp = name.timepoint(41).unwrap();
    assert_eq!((tp.day, tp.sample_number, tp.num_keypoints), (19, 23, 41));
}

#[test]
fn non_numeric_inline_day_falls_back_to_folder() {
    let name = NameResolver::default().resolve_name("DX_5_1st.png", Some("Day 2"));
    assert_eq!(name.day, Some(2));
    assert_eq!(name.sample, Some(5));
    assert_eq!(name.dilution, Some(Dilution::X10));
}

#[test]
fn label_images_keep_their_file_name() {
    let name = NameResolver::default().resolve_name("XYZ_label.JPG", Some("Day 3"));
    assert_eq!(name.display_name, "XYZ_label.JPG");
    assert_eq!(name.timepoint(3), None);
}

#[test]
fn missing_ordinal_uses_the_default_once() {
    let name = NameResolver::default().resolve_name("4_plain.png", Some("Day 1"));
    assert_eq!(name.dilution, Some(Dilution::X1000));

    let resolver = NameResolver::new(ResolverConfig {
        default_ordinal: "none".to_string(),
        ..Default::default()
    });
    let name = resolver.resolve_name("4_plain.png", Some("Day 1"));
    assert_eq!(name.dilution, None);
    assert_eq!(name.timepoint(1), None);
    assert_eq!(name.display_name, "Day 1 - Sample 4");
}

#[test]
fn unparseable_names_fall_back_to_basename() {
    let resolver = NameResolver::default();
    for file in ["plate.png", "a_b_c_d_e.png", "1_2_3_4.png"] {
        let name = resolver.resolve_name(file, Some("Day 9"));
        assert_eq!(name.display_name, file);
        assert_eq!(name.timepoint(0), None);
    }
}
