//! INI settings file
//!
//! ```ini
//! [Clock]
//! CrystalFrequency = 32768
//!
//! [Ssp]
//! Device = Loopback
//!
//! [Debug]
//! RegisterWarnings = false
//! ```
//!
//! Missing keys keep their default value, invalid ones are reported and ignored.

use std::path::Path;

use ini::Ini;
use palm_lib::{Settings, SspDeviceKind};
use tracing::{info, warn};

use crate::error::Result;
use crate::script::parse_number;

pub fn load(path: &Path) -> Result<Settings> {
    info!("Loading settings from {}", path.display());

    let ini = Ini::load_from_file(path)?;

    from_ini(&ini)
}

pub fn from_ini(ini: &Ini) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(freq) = ini.get_from(Some("Clock"), "CrystalFrequency") {
        match parse_number(freq).and_then(|f| u32::try_from(f).ok()) {
            Some(f) => settings.crystal_frequency = f,
            None => warn!("Invalid crystal frequency `{}`", freq),
        }
    }

    if let Some(device) = ini.get_from(Some("Ssp"), "Device") {
        match device.parse::<SspDeviceKind>() {
            Ok(kind) => settings.ssp_device = kind,
            Err(e) => warn!("{}, using {:?}", e, settings.ssp_device),
        }
    }

    if let Some(warnings) = ini.get_from(Some("Debug"), "RegisterWarnings") {
        match warnings.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => settings.register_access_warnings = true,
            "false" | "no" | "off" | "0" => settings.register_access_warnings = false,
            _ => warn!("Invalid RegisterWarnings value `{}`", warnings),
        }
    }

    settings.validate()?;

    Ok(settings)
}

#[test]
fn settings_from_ini() {
    let ini = Ini::load_from_str(
        "[Clock]\nCrystalFrequency = 0x8000\n[Ssp]\nDevice = loopback\n[Debug]\nRegisterWarnings = off\n",
    )
    .unwrap();

    let settings = from_ini(&ini).unwrap();

    assert_eq!(settings.crystal_frequency, 32768);
    assert_eq!(settings.ssp_device, SspDeviceKind::Loopback);
    assert!(!settings.register_access_warnings);
}

#[test]
fn settings_defaults_and_invalid_values() {
    let ini = Ini::load_from_str("[Ssp]\nDevice = tsc2101\n").unwrap();

    assert_eq!(from_ini(&ini).unwrap(), Settings::default());

    let ini = Ini::load_from_str("[Clock]\nCrystalFrequency = 0\n").unwrap();

    assert!(from_ini(&ini).is_err());
}
