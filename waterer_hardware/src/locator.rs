//! Device discovery by node path existence.

use std::path::{Path, PathBuf};

use tracing::trace;
use waterer_traits::{DeviceKind, DeviceLocator};

/// Device node paths for one station.
#[derive(Debug, Clone)]
pub struct DevicePaths {
    pub barcode: PathBuf,
    pub pump: PathBuf,
    pub scale: PathBuf,
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self {
            barcode: PathBuf::from("/dev/hidraw0"),
            pump: PathBuf::from("/dev/ttyUSB0"),
            scale: PathBuf::from("/dev/ttyUSB1"),
        }
    }
}

impl DevicePaths {
    pub fn path(&self, device: DeviceKind) -> &Path {
        match device {
            DeviceKind::Barcode => &self.barcode,
            DeviceKind::Pump => &self.pump,
            DeviceKind::Scale => &self.scale,
        }
    }
}

/// A device is present when its node exists in the file system.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
    paths: DevicePaths,
}

impl PathLocator {
    pub fn new(paths: DevicePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DevicePaths {
        &self.paths
    }
}

impl DeviceLocator for PathLocator {
    fn is_present(&self, device: DeviceKind) -> bool {
        let path = self.paths.path(device);
        let present = path.exists();
        trace!(%device, path = %path.display(), present, "device presence");
        present
    }
}
