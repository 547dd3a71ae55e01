//! Compute device resolution.
//!
//! Picks the first platform and, on it, the first GPU. When the platform has
//! no GPU the first CPU device is used instead.

use crate::error::{LaunchError, Result};
use log::debug;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU,
    Device as ClDevice,
};
use opencl3::error_codes::{CL_DEVICE_NOT_FOUND, ClError};
use opencl3::platform::get_platforms;
use opencl3::types::{cl_device_id, cl_device_type};
use std::fmt;

/// Broad class of a compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// GPU or other accelerator.
    Accelerator,
    /// General-purpose processor.
    Processor,
    Other,
}

impl DeviceClass {
    fn from_type(device_type: cl_device_type) -> Self {
        if device_type & (CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_ACCELERATOR) != 0 {
            DeviceClass::Accelerator
        } else if device_type & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::Processor
        } else {
            DeviceClass::Other
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Accelerator => "GPU",
            DeviceClass::Processor => "CPU",
            DeviceClass::Other => "other",
        };
        f.write_str(name)
    }
}

/// The device selected for a launch.
///
/// Chosen once and never modified. The runtime owns the underlying id, so
/// there is nothing to release.
#[derive(Debug, Clone)]
pub struct ResolvedDevice {
    device: ClDevice,
    class: DeviceClass,
}

impl ResolvedDevice {
    pub fn cl_device(&self) -> &ClDevice {
        &self.device
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Returns the device name, or `Unknown` when the query fails.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }
}

/// Returns true if any OpenCL platform is installed.
pub fn is_available() -> bool {
    get_platforms().map(|p| !p.is_empty()).unwrap_or(false)
}

/// Resolves the device used by a launch.
pub fn resolve_device() -> Result<ResolvedDevice> {
    let platform = get_platforms()
        .ok()
        .and_then(|platforms| platforms.into_iter().next())
        .ok_or(LaunchError::NoPlatform)?;
    debug!(
        "Using platform {}",
        platform.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    if let Some(id) = first_device(platform.get_devices(CL_DEVICE_TYPE_GPU))? {
        return Ok(ResolvedDevice {
            device: ClDevice::new(id),
            class: DeviceClass::Accelerator,
        });
    }

    debug!("No GPU found, falling back to CPU");
    let id = first_device(platform.get_devices(CL_DEVICE_TYPE_CPU))?.ok_or_else(|| {
        LaunchError::DeviceResolution("no GPU or CPU device on the first platform".to_string())
    })?;

    Ok(ResolvedDevice {
        device: ClDevice::new(id),
        class: DeviceClass::Processor,
    })
}

/// Picks the first id from a device query.
///
/// An empty list and `CL_DEVICE_NOT_FOUND` both mean the class is absent and
/// give `Ok(None)`. Any other query error is fatal.
fn first_device(
    query: std::result::Result<Vec<cl_device_id>, ClError>,
) -> Result<Option<cl_device_id>> {
    match query {
        Ok(ids) => Ok(ids.first().copied()),
        Err(ClError(CL_DEVICE_NOT_FOUND)) => Ok(None),
        Err(e) => Err(LaunchError::DeviceResolution(e.to_string())),
    }
}

/// One row of the device listing.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub platform: String,
    pub name: String,
    pub class: DeviceClass,
}

/// Lists every device on every platform.
pub fn list_devices() -> Result<Vec<DeviceSummary>> {
    let platforms = get_platforms().map_err(|_| LaunchError::NoPlatform)?;

    let mut summaries = Vec::new();
    for platform in platforms {
        let platform_name = platform.name().unwrap_or_else(|_| "Unknown".to_string());
        let Ok(ids) = platform.get_devices(CL_DEVICE_TYPE_ALL) else {
            continue;
        };
        for id in ids {
            let device = ClDevice::new(id);
            let class = device
                .dev_type()
                .map(DeviceClass::from_type)
                .unwrap_or(DeviceClass::Other);
            summaries.push(DeviceSummary {
                platform: platform_name.clone(),
                name: device.name().unwrap_or_else(|_| "Unknown".to_string()),
                class,
            });
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencl3::device::CL_DEVICE_TYPE_CUSTOM;

    #[test]
    fn test_device_class_from_type() {
        assert_eq!(
            DeviceClass::from_type(CL_DEVICE_TYPE_GPU),
            DeviceClass::Accelerator
        );
        assert_eq!(
            DeviceClass::from_type(CL_DEVICE_TYPE_ACCELERATOR),
            DeviceClass::Accelerator
        );
        assert_eq!(
            DeviceClass::from_type(CL_DEVICE_TYPE_CPU),
            DeviceClass::Processor
        );
        assert_eq!(
            DeviceClass::from_type(CL_DEVICE_TYPE_CUSTOM),
            DeviceClass::Other
        );
    }

    #[test]
    fn test_first_device_falls_back_only_when_not_found() {
        assert_eq!(first_device(Ok(Vec::new())).unwrap(), None);
        assert_eq!(
            first_device(Err(ClError(CL_DEVICE_NOT_FOUND))).unwrap(),
            None
        );

        let id: cl_device_id = std::ptr::null_mut();
        assert_eq!(first_device(Ok(vec![id])).unwrap(), Some(id));
    }

    #[test]
    fn test_first_device_other_errors_are_fatal() {
        // CL_INVALID_PLATFORM
        let err = first_device(Err(ClError(-32))).unwrap_err();
        assert!(matches!(err, LaunchError::DeviceResolution(_)));
        assert!(err.to_string().starts_with("couldn't access any devices"));
    }

    #[test]
    fn test_resolve_device() {
        if !is_available() {
            println!("OpenCL not available, skipping test");
            return;
        }

        match resolve_device() {
            Ok(device) => {
                assert_ne!(device.class(), DeviceClass::Other);
                println!("Resolved {} ({})", device.name(), device.class());
            }
            // A platform without GPU or CPU devices is legal, just useless.
            Err(e) => assert!(matches!(e, LaunchError::DeviceResolution(_)), "{}", e),
        }
    }

    #[test]
    fn test_list_devices() {
        if !is_available() {
            println!("OpenCL not available, skipping test");
            return;
        }

        let devices = list_devices().unwrap();
        for device in &devices {
            println!("{} / {} ({})", device.platform, device.name, device.class);
        }
    }
}
