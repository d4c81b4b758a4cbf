#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Station config and calibration payload: parse errors are fine, panics are not.
    if let Ok(cfg) = waterer_config::load_toml(data) {
        let _ = cfg.validate();
    }
    let _ = waterer_config::parse_pump_data(data);
});
