//! Scriptable devices and recorders for driving the controller without hardware.
//!
//! Recorders share their logs through `Arc<Mutex<..>>`, so a clone kept by a
//! test observes what the controller did with the boxed original.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use waterer_traits::{
    Announcer, BarcodeScanner, BoxError, Cue, DeviceKind, DeviceLocator, DeviceOpener, Pump,
    Scale,
};

use crate::error::WaterError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOp {
    SetMotorSpeed,
    SetRevolutions,
    Go,
    Halt,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PumpCall {
    SetMotorSpeed(f64),
    SetRevolutions(f64),
    Go,
    Halt,
    Cancel,
}

impl PumpCall {
    pub fn op(&self) -> PumpOp {
        match self {
            PumpCall::SetMotorSpeed(_) => PumpOp::SetMotorSpeed,
            PumpCall::SetRevolutions(_) => PumpOp::SetRevolutions,
            PumpCall::Go => PumpOp::Go,
            PumpCall::Halt => PumpOp::Halt,
            PumpCall::Cancel => PumpOp::Cancel,
        }
    }
}

/// Pump that records every call; optionally fails one operation with a protocol error.
#[derive(Debug, Clone, Default)]
pub struct RecordingPump {
    calls: Arc<Mutex<Vec<PumpCall>>>,
    fail_on: Option<PumpOp>,
}

impl RecordingPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, op: PumpOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<PumpCall> {
        lock(&self.calls).clone()
    }

    fn call(&mut self, call: PumpCall) -> Result<(), BoxError> {
        let op = call.op();
        lock(&self.calls).push(call);
        if self.fail_on == Some(op) {
            return Err(Box::new(WaterError::Protocol(format!(
                "scripted failure on {op:?}"
            ))));
        }
        Ok(())
    }
}

impl Pump for RecordingPump {
    fn set_motor_speed(&mut self, percent: f64) -> Result<(), BoxError> {
        self.call(PumpCall::SetMotorSpeed(percent))
    }
    fn set_revolutions(&mut self, count: f64) -> Result<(), BoxError> {
        self.call(PumpCall::SetRevolutions(count))
    }
    fn go(&mut self) -> Result<(), BoxError> {
        self.call(PumpCall::Go)
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        self.call(PumpCall::Halt)
    }
    fn cancel(&mut self) -> Result<(), BoxError> {
        self.call(PumpCall::Cancel)
    }
}

/// Scanner that replays scripted results.
///
/// When the script runs out it reports the scanner as lost and raises the
/// optional shutdown flag, which ends a test run.
#[derive(Debug, Default)]
pub struct ScriptedScanner {
    script: VecDeque<Result<Option<String>, WaterError>>,
    on_exhausted: Option<Arc<AtomicBool>>,
}

impl ScriptedScanner {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: codes.into_iter().map(|c| Ok(Some(c.into()))).collect(),
            on_exhausted: None,
        }
    }

    pub fn then_error(mut self, e: WaterError) -> Self {
        self.script.push_back(Err(e));
        self
    }

    pub fn then_code(mut self, code: impl Into<String>) -> Self {
        self.script.push_back(Ok(Some(code.into())));
        self
    }

    /// `polls` polls that time out with no code.
    pub fn then_idle(mut self, polls: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Ok(None), polls));
        self
    }

    pub fn with_exhausted_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.on_exhausted = Some(flag);
        self
    }
}

impl BarcodeScanner for ScriptedScanner {
    fn read_code(&mut self) -> Result<Option<String>, BoxError> {
        match self.script.pop_front() {
            Some(Ok(code)) => Ok(code),
            Some(Err(e)) => Err(Box::new(e)),
            None => {
                if let Some(flag) = &self.on_exhausted {
                    flag.store(true, Ordering::Relaxed);
                }
                Err(Box::new(WaterError::DeviceLost(
                    DeviceKind::Barcode,
                    "script exhausted".into(),
                )))
            }
        }
    }
}

/// Scale that replays scripted polls, then reports no reading.
#[derive(Debug, Default)]
pub struct SeqScale {
    script: VecDeque<Result<Option<f64>, WaterError>>,
}

impl SeqScale {
    pub fn new<I: IntoIterator<Item = Result<Option<f64>, WaterError>>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Scale that always reads `weight`.
    pub fn constant(weight: f64, polls: usize) -> Self {
        Self::new(std::iter::repeat_n(Ok(Some(weight)), polls))
    }
}

impl Scale for SeqScale {
    fn read_weight(&mut self) -> Result<Option<f64>, BoxError> {
        match self.script.pop_front() {
            Some(Ok(w)) => Ok(w),
            Some(Err(e)) => Err(Box::new(e)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    Cue(Cue),
    Speech(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingAnnouncer {
    heard: Arc<Mutex<Vec<Announcement>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heard(&self) -> Vec<Announcement> {
        lock(&self.heard).clone()
    }

    pub fn cue_count(&self, cue: Cue) -> usize {
        lock(&self.heard)
            .iter()
            .filter(|a| **a == Announcement::Cue(cue))
            .count()
    }

    pub fn speech(&self) -> Vec<String> {
        lock(&self.heard)
            .iter()
            .filter_map(|a| match a {
                Announcement::Speech(s) => Some(s.clone()),
                Announcement::Cue(_) => None,
            })
            .collect()
    }
}

impl Announcer for RecordingAnnouncer {
    fn play(&self, cue: Cue) {
        lock(&self.heard).push(Announcement::Cue(cue));
    }
    fn say(&self, text: &str) {
        lock(&self.heard).push(Announcement::Speech(text.to_string()));
    }
}

/// Presence answers per device; once a script is used up the device is present.
#[derive(Debug, Default)]
pub struct ScriptedLocator {
    scripts: Mutex<HashMap<DeviceKind, VecDeque<bool>>>,
}

impl ScriptedLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device reports absent for the next `polls` checks.
    pub fn absent_for(self, kind: DeviceKind, polls: usize) -> Self {
        lock(&self.scripts)
            .entry(kind)
            .or_default()
            .extend(std::iter::repeat_n(false, polls));
        self
    }
}

impl DeviceLocator for ScriptedLocator {
    fn is_present(&self, device: DeviceKind) -> bool {
        lock(&self.scripts)
            .get_mut(&device)
            .and_then(VecDeque::pop_front)
            .unwrap_or(true)
    }
}

/// A whole mock station. Scanner and scale are handed out once; reopening
/// yields empty scripts.
#[derive(Debug, Default)]
pub struct MockStation {
    locator: ScriptedLocator,
    scanner: Option<ScriptedScanner>,
    scale: Option<SeqScale>,
    pump: RecordingPump,
    opened: Arc<Mutex<Vec<DeviceKind>>>,
}

impl MockStation {
    pub fn new(scanner: ScriptedScanner, scale: SeqScale, pump: RecordingPump) -> Self {
        Self {
            locator: ScriptedLocator::new(),
            scanner: Some(scanner),
            scale: Some(scale),
            pump,
            opened: Arc::default(),
        }
    }

    pub fn with_locator(mut self, locator: ScriptedLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Shared record of every device opened, in order.
    pub fn opened(&self) -> Arc<Mutex<Vec<DeviceKind>>> {
        Arc::clone(&self.opened)
    }
}

impl DeviceLocator for MockStation {
    fn is_present(&self, device: DeviceKind) -> bool {
        self.locator.is_present(device)
    }
}

impl DeviceOpener for MockStation {
    fn open_scanner(&mut self) -> Result<Box<dyn BarcodeScanner>, BoxError> {
        lock(&self.opened).push(DeviceKind::Barcode);
        Ok(Box::new(self.scanner.take().unwrap_or_default()))
    }

    fn open_scale(&mut self) -> Result<Box<dyn Scale>, BoxError> {
        lock(&self.opened).push(DeviceKind::Scale);
        Ok(Box::new(self.scale.take().unwrap_or_default()))
    }

    fn open_pump(&mut self) -> Result<Box<dyn Pump>, BoxError> {
        lock(&self.opened).push(DeviceKind::Pump);
        Ok(Box::new(self.pump.clone()))
    }
}
