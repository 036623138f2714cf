use std::str::FromStr;

use crate::error::{PalmError, PalmResult};

/// Frequency of the reference crystal feeding the PLL
pub const DEFAULT_CRYSTAL_FREQUENCY: u32 = 32_768;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Reference crystal frequency in Hz
    pub crystal_frequency: u32,
    /// Device wired to the SSP
    pub ssp_device: SspDeviceKind,
    /// Log accesses to unimplemented registers as warnings instead of debug messages
    pub register_access_warnings: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            crystal_frequency: DEFAULT_CRYSTAL_FREQUENCY,
            ssp_device: Default::default(),
            register_access_warnings: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> PalmResult<()> {
        if self.crystal_frequency == 0 {
            return Err(PalmError::InvalidSettings(
                "crystal frequency can't be 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum SspDeviceKind {
    #[default]
    Disconnected,
    Loopback,
}

impl FromStr for SspDeviceKind {
    type Err = PalmError;

    fn from_str(s: &str) -> PalmResult<SspDeviceKind> {
        match s.to_ascii_lowercase().as_str() {
            "disconnected" | "none" => Ok(SspDeviceKind::Disconnected),
            "loopback" => Ok(SspDeviceKind::Loopback),
            _ => Err(PalmError::UnknownSspDevice(s.to_string())),
        }
    }
}

#[test]
fn settings_validation() {
    assert!(Settings::default().validate().is_ok());

    let settings = Settings {
        crystal_frequency: 0,
        ..Default::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(PalmError::InvalidSettings(_))
    ));
}

#[test]
fn ssp_device_names() {
    assert_eq!("Loopback".parse::<SspDeviceKind>().ok(), Some(SspDeviceKind::Loopback));
    assert_eq!("none".parse::<SspDeviceKind>().ok(), Some(SspDeviceKind::Disconnected));
    assert!(matches!(
        "tsc2101".parse::<SspDeviceKind>(),
        Err(PalmError::UnknownSspDevice(_))
    ));
}
