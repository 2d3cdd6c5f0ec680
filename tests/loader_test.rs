use helion::profile::{ProfileLoader, bundled_profiles, load_bundled};
use helion::{ProfileError, SubsystemGroup};
use std::fs;

const SAMPLE: &str = r#"
info:
  manufacturer: Deye
  model:
    - SUN-12K-SG04LP3*
    - SUN-10K-SG04LP3*
default:
  update_interval: 30
  digits: 2
requests:
  - start: 60
    count: 64
  - start: 500
    count: 16
    function: holding
    name: state block
parameters:
  - group: Battery
    update_interval: 15
    items:
      - name: Battery Voltage
        rule: 1
        registers: [183]
        scale: [0.01]
        range:
          min: [1000]
          max: 6000
      - name: Battery Power
        rule: 2
        registers: [190]
        signed: true
        validation:
          min: -16000
          max: 16000
"#;

#[test]
fn parses_full_document_shape() {
    let profile = ProfileLoader::parse("deye_sample", SAMPLE).unwrap();
    assert_eq!(profile.info.models.len(), 2);
    assert_eq!(profile.defaults.update_interval, 30);
    assert_eq!(profile.defaults.digits, 2);
    assert_eq!(profile.requests.len(), 2);
    assert_eq!(profile.requests[1].name.as_deref(), Some("state block"));

    let group = &profile.parameters[0];
    assert_eq!(group.update_interval, Some(15));
    let voltage = &group.items[0];
    assert_eq!(voltage.scale, 0.01);
    assert_eq!(voltage.range.min, Some(1000.0));
    assert_eq!(voltage.range.max, Some(6000.0));
    let power = &group.items[1];
    assert!(power.signed);
    assert_eq!(power.validation.min, Some(-16000.0));
}

#[test]
fn load_from_file_and_resource_layout() {
    let dir = tempfile::tempdir().unwrap();
    let vendor_dir = dir.path().join("deye");
    fs::create_dir_all(&vendor_dir).unwrap();
    let path = vendor_dir.join("deye_sample.yaml");
    fs::write(&path, SAMPLE).unwrap();

    let from_file = ProfileLoader::from_file("deye_sample", &path).unwrap();
    assert_eq!(from_file.id, "deye_sample");

    let from_dir =
        ProfileLoader::from_resource_dir(dir.path(), "deye", "deye_sample").unwrap();
    assert_eq!(from_dir, from_file);
}

#[test]
fn missing_file_is_load_failure() {
    let err = ProfileLoader::from_file("nope", "/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, ProfileError::LoadFailed { .. }));
}

#[test]
fn parse_error_carries_identifier() {
    let err = ProfileLoader::parse("broken", "info:\n  manufacturer: [unclosed").unwrap_err();
    match err {
        ProfileError::ParseError { id, .. } => assert_eq!(id, "broken"),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn bundled_profiles_enumerate_deterministically() {
    let first = bundled_profiles();
    let second = bundled_profiles();
    assert_eq!(first, second);
    assert!(first.contains(&"deye_p3"));
    assert!(first.contains(&"deye_string"));
    assert!(first.contains(&"sofar_hyd3k"));
}

#[test]
fn bundled_profiles_round_trip_through_yaml() {
    for id in bundled_profiles() {
        let parsed = load_bundled(id).unwrap();
        let rendered = ProfileLoader::to_yaml(&parsed).unwrap();
        let reparsed = ProfileLoader::parse(id, &rendered).unwrap();
        assert_eq!(parsed, reparsed, "profile {} does not round-trip", id);
    }
}

#[test]
fn unknown_bundled_identifier_fails() {
    let err = load_bundled("growatt_mod").unwrap_err();
    assert!(matches!(err, ProfileError::LoadFailed { .. }));
}

#[test]
fn bundled_deye_p3_covers_all_basic_groups() {
    let profile = load_bundled("deye_p3").unwrap();
    for group in [
        SubsystemGroup::Battery,
        SubsystemGroup::Grid,
        SubsystemGroup::Pv,
        SubsystemGroup::Load,
        SubsystemGroup::Inverter,
        SubsystemGroup::Generator,
        SubsystemGroup::Ups,
        SubsystemGroup::Bms,
        SubsystemGroup::TimeOfUse,
    ] {
        let names = group.profile_group_names();
        assert!(
            profile
                .parameters
                .iter()
                .any(|g| names.contains(&g.group.as_str())),
            "no profile group feeds {}",
            group
        );
    }
}

#[test]
fn normalized_ids_derive_from_names() {
    let profile = load_bundled("deye_p3").unwrap();
    let soc = profile
        .all_items()
        .find(|item| item.name == "Battery SOC")
        .unwrap();
    assert_eq!(soc.normalized_id, "battery_soc");
    let ct = profile
        .all_items()
        .find(|item| item.name == "External CT L1 Power")
        .unwrap();
    assert_eq!(ct.normalized_id, "external_ct_l1_power");
}
