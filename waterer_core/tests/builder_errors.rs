use rstest::rstest;
use waterer_core::error::BuildError;
use waterer_core::mocks::{MockStation, RecordingAnnouncer};
use waterer_core::{ControllerCfg, RetryPolicy, WateringController, WateringLog};

#[rstest]
fn builder_missing_devices_yields_typed_build_error() {
    let err = WateringController::builder()
        // missing with_devices()
        .with_announcer(RecordingAnnouncer::new())
        .with_log(WateringLog::new("watering.csv"))
        .try_build()
        .expect_err("should fail with MissingDevices");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingDevices) => {}
        other => panic!("expected MissingDevices, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_log_yields_typed_build_error() {
    let err = WateringController::builder()
        .with_devices(MockStation::default())
        .with_announcer(RecordingAnnouncer::new())
        .try_build()
        .expect_err("should fail with MissingLog");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingLog)
    ));
}

#[rstest]
#[case(ControllerCfg { scale_retry: RetryPolicy::fixed(0, std::time::Duration::ZERO), ..ControllerCfg::default() })]
#[case(ControllerCfg { max_decisions: Some(0), ..ControllerCfg::default() })]
fn builder_rejects_invalid_config(#[case] cfg: ControllerCfg) {
    let err = WateringController::builder()
        .with_devices(MockStation::default())
        .with_announcer(RecordingAnnouncer::new())
        .with_log(WateringLog::new("watering.csv"))
        .with_config(cfg)
        .build()
        .expect_err("invalid config");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
