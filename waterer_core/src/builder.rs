//! Type-state builder for `WateringController`.
//!
//! `build()` is only available once devices, an announcer and a watering log
//! are provided. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use waterer_traits::{Announcer, Clock, MonotonicClock};

use crate::Station;
use crate::config::ControllerCfg;
use crate::controller::{RunSummary, WateringController};
use crate::error::{BuildError, Result};
use crate::session::Session;
use crate::status::ControllerState;
use crate::watering_log::WateringLog;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct ControllerBuilder<D, A, L> {
    devices: Option<Box<dyn Station>>,
    announcer: Option<Box<dyn Announcer>>,
    log: Option<WateringLog>,
    clock: Option<Box<dyn Clock>>,
    cfg: ControllerCfg,
    session: Session,
    shutdown: Option<Arc<AtomicBool>>,
    _d: PhantomData<D>,
    _a: PhantomData<A>,
    _l: PhantomData<L>,
}

impl Default for ControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            devices: None,
            announcer: None,
            log: None,
            clock: None,
            cfg: ControllerCfg::default(),
            session: Session::default(),
            shutdown: None,
            _d: PhantomData,
            _a: PhantomData,
            _l: PhantomData,
        }
    }
}

impl WateringController {
    pub fn builder() -> ControllerBuilder<Missing, Missing, Missing> {
        ControllerBuilder::default()
    }
}

impl<D, A, L> ControllerBuilder<D, A, L> {
    fn retag<D2, A2, L2>(self) -> ControllerBuilder<D2, A2, L2> {
        ControllerBuilder {
            devices: self.devices,
            announcer: self.announcer,
            log: self.log,
            clock: self.clock,
            cfg: self.cfg,
            session: self.session,
            shutdown: self.shutdown,
            _d: PhantomData,
            _a: PhantomData,
            _l: PhantomData,
        }
    }

    pub fn with_devices(mut self, devices: impl Station + 'static) -> ControllerBuilder<Set, A, L> {
        self.devices = Some(Box::new(devices));
        self.retag()
    }

    pub fn with_announcer(
        mut self,
        announcer: impl Announcer + 'static,
    ) -> ControllerBuilder<D, Set, L> {
        self.announcer = Some(Box::new(announcer));
        self.retag()
    }

    pub fn with_log(mut self, log: WateringLog) -> ControllerBuilder<D, A, Set> {
        self.log = Some(log);
        self.retag()
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Share an externally owned shutdown flag (e.g. set from a signal handler).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn max_decisions(mut self, limit: Option<u64>) -> Self {
        self.cfg.max_decisions = limit;
        self
    }

    /// Build with runtime checks, regardless of type-state.
    pub fn try_build(self) -> Result<WateringController> {
        let devices = self
            .devices
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDevices))?;
        let announcer = self
            .announcer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAnnouncer))?;
        let log = self
            .log
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLog))?;
        if self.cfg.scale_retry.max_attempts == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "scale retry attempts must be >= 1",
            )));
        }
        if self.cfg.max_decisions == Some(0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max decisions must be >= 1",
            )));
        }
        Ok(WateringController {
            devices,
            announcer,
            clock: self.clock.unwrap_or_else(|| Box::new(MonotonicClock::new())),
            log,
            cfg: self.cfg,
            session: self.session,
            shutdown: self.shutdown.unwrap_or_default(),
            state: ControllerState::AwaitingDevices,
            scanner: None,
            scale: None,
            pump: None,
            summary: RunSummary::default(),
            barcode_prompted: false,
        })
    }
}

impl ControllerBuilder<Set, Set, Set> {
    pub fn build(self) -> Result<WateringController> {
        self.try_build()
    }
}
