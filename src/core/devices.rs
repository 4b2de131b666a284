use crate::domain::model::{DeviceInfo, DeviceSelector};
use crate::domain::ports::CaptureBackend;
use crate::utils::error::{MelodiqaError, Result};
use std::collections::{HashMap, HashSet};

/// Sorts entries by name and makes names unique so they can be selected by
/// name or by index. Repeated names become `"Name (1)"`, `"Name (2)"`, ...
/// skipping any suffix that another device already uses as its real name.
pub fn catalog<T>(mut entries: Vec<(DeviceInfo, T)>) -> Vec<(DeviceInfo, T)> {
    entries.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let mut counts: HashMap<String, usize> = HashMap::new();
    for (info, _) in &entries {
        *counts.entry(info.name.clone()).or_insert(0) += 1;
    }

    let mut taken: HashSet<String> = counts
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(name, _)| name.clone())
        .collect();
    let mut next: HashMap<String, usize> = HashMap::new();
    entries
        .into_iter()
        .map(|(mut info, handle)| {
            if counts[&info.name] > 1 {
                let n = next.entry(info.name.clone()).or_insert(0);
                let renamed = loop {
                    *n += 1;
                    let candidate = format!("{} ({})", info.name, n);
                    if taken.insert(candidate.clone()) {
                        break candidate;
                    }
                };
                info.name = renamed;
            }
            (info, handle)
        })
        .collect()
}

pub fn select<'a>(devices: &'a [DeviceInfo], selector: &DeviceSelector) -> Result<&'a DeviceInfo> {
    match selector {
        DeviceSelector::Name(name) => devices
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| MelodiqaError::DeviceNotFound { name: name.clone() }),
        DeviceSelector::Index(index) => {
            devices
                .get(*index)
                .ok_or(MelodiqaError::DeviceIndexOutOfRange {
                    index: *index,
                    available: devices.len(),
                })
        }
    }
}

pub fn list<C: CaptureBackend + ?Sized>(capture: &C) -> Result<Vec<DeviceInfo>> {
    let devices = capture.list_devices()?;
    tracing::debug!("Found {} input device(s)", devices.len());
    Ok(devices)
}

pub fn describe(device: &DeviceInfo) -> String {
    let mut line = device.name.clone();
    if let (Some(rate), Some(channels)) = (device.sample_rate, device.channels) {
        line.push_str(&format!(" - {} Hz, {} ch", rate, channels));
        if let Some(format) = &device.sample_format {
            line.push_str(&format!(", {}", format));
        }
    }
    line
}

pub fn log_listing(devices: &[DeviceInfo]) {
    tracing::info!("Available devices ({}):", devices.len());
    for (i, device) in devices.iter().enumerate() {
        tracing::info!("[{}] {}", i, describe(device));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[(DeviceInfo, usize)]) -> Vec<&str> {
        entries.iter().map(|(d, _)| d.name.as_str()).collect()
    }

    #[test]
    fn test_catalog_sorts_and_disambiguates() {
        let entries = vec![
            (DeviceInfo::named("Stereo Mix"), 0),
            (DeviceInfo::named("Microphone"), 1),
            (DeviceInfo::named("Line In"), 2),
            (DeviceInfo::named("Microphone"), 3),
        ];
        let catalog = catalog(entries);

        assert_eq!(
            names(&catalog),
            vec!["Line In", "Microphone (1)", "Microphone (2)", "Stereo Mix"]
        );
        // handles travel with their entries
        assert_eq!(catalog[0].1, 2);
        assert_eq!(catalog[3].1, 0);
    }

    #[test]
    fn test_catalog_skips_names_already_in_use() {
        let entries = vec![
            (DeviceInfo::named("Mic"), 0),
            (DeviceInfo::named("Mic"), 1),
            (DeviceInfo::named("Mic (1)"), 2),
        ];
        let catalog = catalog(entries);

        assert_eq!(names(&catalog), vec!["Mic (2)", "Mic (3)", "Mic (1)"]);
        let unique: HashSet<&str> = names(&catalog).into_iter().collect();
        assert_eq!(unique.len(), catalog.len());

        let devices: Vec<DeviceInfo> = catalog.iter().map(|(d, _)| d.clone()).collect();
        let picked = select(&devices, &DeviceSelector::Name("Mic (1)".into())).unwrap();
        assert_eq!(picked.name, "Mic (1)");
        assert_eq!(catalog[2].1, 2);
    }

    #[test]
    fn test_select_by_name_and_index() {
        let devices = vec![DeviceInfo::named("Line In"), DeviceInfo::named("Microphone")];

        let by_name = select(&devices, &DeviceSelector::Name("Microphone".into())).unwrap();
        assert_eq!(by_name.name, "Microphone");

        let by_index = select(&devices, &DeviceSelector::Index(0)).unwrap();
        assert_eq!(by_index.name, "Line In");
    }

    #[test]
    fn test_select_errors() {
        let devices = vec![DeviceInfo::named("Line In")];

        let err = select(&devices, &DeviceSelector::Name("line in".into())).unwrap_err();
        assert!(matches!(err, MelodiqaError::DeviceNotFound { .. }));

        let err = select(&devices, &DeviceSelector::Index(1)).unwrap_err();
        assert!(matches!(
            err,
            MelodiqaError::DeviceIndexOutOfRange {
                index: 1,
                available: 1
            }
        ));
    }

    #[test]
    fn test_describe() {
        let device = DeviceInfo {
            name: "USB Mic".to_string(),
            sample_rate: Some(44_100),
            channels: Some(1),
            sample_format: Some("i16".to_string()),
        };
        assert_eq!(describe(&device), "USB Mic - 44100 Hz, 1 ch, i16");
        assert_eq!(describe(&DeviceInfo::named("Bare")), "Bare");
    }
}
