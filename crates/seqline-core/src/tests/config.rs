use crate::*;
use serde_json::json;

#[test]
fn config_dotted_paths_read_typed_values() {
    let cfg = SeqlineConfig::from_value(json!({
        "sequence": {"arrowSize": 8, "opaqueMessageText": true, "labelAlignment": "left"}
    }));
    assert_eq!(cfg.get_f64("sequence.arrowSize"), Some(8.0));
    assert_eq!(cfg.get_bool("sequence.opaqueMessageText"), Some(true));
    assert_eq!(cfg.get_str("sequence.labelAlignment"), Some("left"));
    assert_eq!(cfg.get_f64("sequence.missing"), None);
}

#[test]
fn config_override_parses_json_or_falls_back_to_text() {
    let mut cfg = SeqlineConfig::default();
    cfg.apply_override("sequence.arrowSize=10").unwrap();
    cfg.apply_override("sequence.labelAlignment=right").unwrap();
    cfg.apply_override("sequence.threadColors=[\"#ff0000\"]").unwrap();
    assert_eq!(
        cfg.as_value(),
        &json!({"sequence": {"arrowSize": 10, "labelAlignment": "right", "threadColors": ["#ff0000"]}})
    );

    assert!(matches!(
        cfg.apply_override("sequence..x=1"),
        Err(Error::InvalidConfigOverride { .. })
    ));
    assert!(matches!(
        cfg.apply_override("no-equals-sign"),
        Err(Error::InvalidConfigOverride { .. })
    ));
}

#[test]
fn config_deep_merge_keeps_unrelated_keys() {
    let mut cfg = SeqlineConfig::from_value(json!({"sequence": {"arrowSize": 6, "threaded": false}}));
    cfg.deep_merge(&json!({"sequence": {"threaded": true}}));
    assert_eq!(cfg.get_f64("sequence.arrowSize"), Some(6.0));
    assert_eq!(cfg.get_bool("sequence.threaded"), Some(true));
}

#[test]
fn config_set_value_replaces_non_object_root() {
    let mut cfg = SeqlineConfig::from_value(json!(3));
    cfg.set_value("sequence.arrowSize", json!(4));
    assert_eq!(cfg.get_f64("sequence.arrowSize"), Some(4.0));
}

#[test]
fn config_from_json_str_requires_object() {
    assert!(SeqlineConfig::from_json_str("[1, 2]").is_err());
    let cfg = SeqlineConfig::from_json_str(r#"{"sequence": {}}"#).unwrap();
    assert!(cfg.get("sequence").is_some());
}

#[test]
fn config_set_value_replaces_scalar_intermediate_and_merge_adds_new_tables() {
    let mut cfg = SeqlineConfig::from_value(json!({"sequence": 5}));
    cfg.set_value("sequence.arrowSize", json!(4));
    assert_eq!(cfg.as_value(), &json!({"sequence": {"arrowSize": 4}}));

    cfg.deep_merge(&json!({"sequence": {"wrapLabels": true}, "theme": {"dark": true}}));
    assert_eq!(
        cfg.as_value(),
        &json!({"sequence": {"arrowSize": 4, "wrapLabels": true}, "theme": {"dark": true}})
    );
}
