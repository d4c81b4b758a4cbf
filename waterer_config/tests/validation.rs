use waterer_config::{Config, LineEnding, load_config, load_toml, parse_pump_data};

#[test]
fn empty_document_uses_station_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.pump.address, 1);
    assert_eq!(cfg.polling.barcode_ms, 10_000);
    assert_eq!(cfg.retry.scale_max_attempts, 5);
    assert_eq!(cfg.devices.scale_line_ending, LineEnding::Lf);
    assert!(cfg.sync.remote_dir.is_none());
}

#[test]
fn rejects_broadcast_pump_address() {
    let cfg = load_toml("[pump]\naddress = 99\n").expect("parse TOML");
    let err = cfg.validate().expect_err("99 is reserved");
    assert!(format!("{err}").contains("pump.address"));
}

#[test]
fn rejects_zero_scale_attempts() {
    let cfg = load_toml("[retry]\nscale_max_attempts = 0\n").expect("parse TOML");
    let err = cfg.validate().expect_err("needs at least one attempt");
    assert!(format!("{err}").contains("scale_max_attempts"));
}

#[test]
fn rejects_hid_offset_past_report() {
    let cfg = load_toml("[devices]\nhid_first_byte = 8\n").expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unknown_rotation() {
    let cfg = load_toml("[logging]\nrotation = \"weekly\"\n").expect("parse TOML");
    let err = cfg.validate().expect_err("weekly is not supported");
    assert!(format!("{err}").contains("rotation"));
}

#[test]
fn rejects_invalid_default_calibration() {
    let toml = r#"
[calibration]
motor_speed = 70
water_per_1_revolution = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("zero grams per revolution");
    assert!(format!("{err}").contains("calibration"));
}

#[test]
fn relative_paths_resolve_against_data_dir() {
    let toml = r#"
[paths]
data_dir = "/srv/station"
plants = "plants.csv"
watering_log = "/var/log/watering.csv"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert_eq!(
        cfg.paths.plants_path(),
        std::path::PathBuf::from("/srv/station/plants.csv")
    );
    assert_eq!(
        cfg.paths.watering_log_path(),
        std::path::PathBuf::from("/var/log/watering.csv")
    );
    assert_eq!(cfg.paths.sounds_path(), std::path::PathBuf::from("/srv/station"));
}

#[test]
fn written_config_loads_back() {
    let mut cfg = Config::default();
    cfg.sync.token = Some("abc123".into());
    let text = cfg.to_toml_string().expect("serialize");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("waterer.toml");
    std::fs::write(&path, text).expect("write");
    let loaded = load_config(&path).expect("load");
    assert_eq!(loaded.sync.token.as_deref(), Some("abc123"));
    assert_eq!(loaded.pump.address, cfg.pump.address);
}

#[test]
fn pump_data_payload_parses() {
    let data = parse_pump_data("motor_speed = 80\nwater_per_1_revolution = 0.85\n").unwrap();
    assert!((data.motor_speed - 80.0).abs() < f64::EPSILON);
    assert!((data.water_per_1_revolution - 0.85).abs() < f64::EPSILON);
}

#[test]
fn pump_data_rejects_missing_field_and_bad_values() {
    assert!(parse_pump_data("motor_speed = 80\n").is_err());
    assert!(parse_pump_data("motor_speed = 180\nwater_per_1_revolution = 1\n").is_err());
    assert!(parse_pump_data("motor_speed = 50\nwater_per_1_revolution = -1\n").is_err());
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/waterer.toml")).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.pump.address, 1);
    assert_eq!(cfg.paths.plants_path().file_name().unwrap(), "experiment-data.csv");
}
