use super::*;
use crate::dataset::filter::{FilterOp, TagFilter};
use tempfile::tempdir;

const FULL: &str = r#"
dataset_name = "orbit_v1"
dataset_path = "~/datasets"
overwrite_local = true
imageset = ["set_a", "set_b"]
test_percent = 0.25
kfolds = 5
upload = false
delete_local = false

[metadata]
created_by = "A. Tester"
comments = "night passes only"

[filter]
interactive = false

[[filter.groups]]
name = "earth_dark"
take = 3

[[filter.groups.filters]]
type = "AND"
tags = ["earth", "dark"]

[[filter.groups.filters]]
type = "OR"
tags = ["moon"]

[plugin]
verbose = true
"#;

#[test]
fn parses_every_section() {
    let config = parse_create_config(FULL).unwrap();
    assert_eq!(config.dataset_name.as_deref(), Some("orbit_v1"));
    assert!(config.overwrite_local);
    assert_eq!(config.imageset.as_ref().unwrap().len(), 2);
    assert_eq!(config.kfolds, Some(5));
    assert_eq!(config.metadata.created_by.as_deref(), Some("A. Tester"));
    let group = &config.filter.groups[0];
    assert_eq!(group.take, Some(3));
    assert_eq!(group.filters[0], TagFilter::and(["earth", "dark"]));
    assert_eq!(group.filters[1].op, FilterOp::Or);
    assert_eq!(config.plugin.unwrap()["verbose"].as_bool(), Some(true));
}

#[test]
fn full_config_validates() {
    parse_create_config(FULL).unwrap().validate().unwrap();
}

#[test]
fn test_percent_defaults_when_absent() {
    let config = parse_create_config("[plugin]\n").unwrap();
    assert_eq!(config.test_percent, None);
    assert_eq!(config.effective_test_percent(), 0.2);
    config.validate().unwrap();
}

#[test]
fn out_of_range_values_are_rejected() {
    let cases = [
        ("test_percent = 1.5\n[plugin]\n", "test_percent"),
        ("test_percent = -0.1\n[plugin]\n", "test_percent"),
        ("kfolds = 0\n[plugin]\n", "kfolds"),
        ("copy_threads = 0\n[plugin]\n", "copy_threads"),
        ("dataset_name = \"../up\"\n[plugin]\n", "dataset_name"),
        ("imageset = []\n[plugin]\n", "imageset"),
        ("test_percent = 0.1\n", "plugin"),
    ];
    for (text, expected) in cases {
        let err = parse_create_config(text).unwrap().validate().unwrap_err();
        assert!(
            matches!(&err, ConfigError::Invalid { field, .. } if field == expected),
            "{text:?} gave {err}"
        );
    }
}

#[test]
fn group_rules_are_checked() {
    let duplicate = r#"
[[filter.groups]]
name = "a"
[[filter.groups]]
name = "a"
[plugin]
"#;
    assert!(parse_create_config(duplicate).unwrap().validate().is_err());

    let no_tags = r#"
[[filter.groups]]
name = "a"
[[filter.groups.filters]]
type = "AND"
tags = []
[plugin]
"#;
    let err = parse_create_config(no_tags).unwrap().validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "filter.groups[a]"));
}

#[test]
fn dataset_name_pattern() {
    assert!(is_valid_dataset_name("orbit_v1.2-final"));
    assert!(!is_valid_dataset_name(""));
    assert!(!is_valid_dataset_name(".hidden"));
    assert!(!is_valid_dataset_name("with space"));
}

#[test]
fn load_reports_path_on_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("create.toml");
    std::fs::write(&path, "test_percent = \"lots\"\n").unwrap();
    let err = load_create_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { path: ref p, .. } if p == &path));

    let missing = load_create_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));
}
