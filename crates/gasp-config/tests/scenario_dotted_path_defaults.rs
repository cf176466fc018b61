//! Dotted-path lookup with default fallback.

use gasp_config::load_layered_yaml_from_strings;

const YAML: &str = r#"
ad_manager:
  network_code: "123456"
  currency_code: "JPY"
sync:
  pause_ms: 0
"#;

#[test]
fn get_fails_with_key_missing_for_absent_path() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = loaded.get("ad_manager.base_url").unwrap_err().to_string();
    assert!(err.contains("CONFIG_KEY_MISSING"), "got: {err}");
    assert!(err.contains("ad_manager.base_url"), "got: {err}");
}

#[test]
fn explicit_value_wins_over_default() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    assert_eq!(loaded.get_u64_or_default("sync.pause_ms").unwrap(), 0);
}

#[test]
fn default_used_when_value_absent() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    assert_eq!(loaded.get_u64_or_default("sync.chunk_size").unwrap(), 30);
    assert!(loaded
        .get_bool_or_default("creative.safe_frame_compatible")
        .unwrap());
    assert_eq!(
        loaded.get_str_or_default("lineitem.type").unwrap(),
        "PRICE_PRIORITY"
    );
}

#[test]
fn path_without_value_or_default_fails() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = loaded.get_or_default("nope.nothing").unwrap_err().to_string();
    assert!(err.contains("no default"), "got: {err}");
}

#[test]
fn type_mismatch_is_reported() {
    let loaded =
        load_layered_yaml_from_strings(&["sync:\n  chunk_size: \"thirty\"\n"]).unwrap();
    let err = loaded
        .get_u64_or_default("sync.chunk_size")
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_TYPE_MISMATCH"), "got: {err}");
}
