// Rekeyrs Input Layer - Registration Filtering
// Which events a profile receives and whether handled events are swallowed

use crate::RawKeyEvent;

/// Device filter of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceFilter {
    /// Every device, including events with no device id
    #[default]
    All,
    /// Devices whose id contains the given string
    Contains(String),
}

impl DeviceFilter {
    /// Parse the profile form: absent or `"*"` means all devices
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            None | Some("*") => DeviceFilter::All,
            Some(s) => DeviceFilter::Contains(s.to_string()),
        }
    }

    /// Check if a device id passes the filter.
    ///
    /// Events the host could not attribute to a device always pass.
    pub fn matches(&self, device: Option<&str>) -> bool {
        match (self, device) {
            (DeviceFilter::All, _) => true,
            (DeviceFilter::Contains(_), None) => true,
            (DeviceFilter::Contains(needle), Some(name)) => name.contains(needle.as_str()),
        }
    }
}

/// Key filter of a registration. Only "match all" exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFilter {
    #[default]
    All,
}

/// Interest registered with the host for one profile.
///
/// An event is wanted when any device filter accepts it; an empty list
/// accepts every device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registration {
    pub device_filters: Vec<DeviceFilter>,
    pub key_filter: KeyFilter,
    /// When set, a handled event is suppressed instead of passed through
    pub intercept: bool,
}

impl Registration {
    /// Check if the profile wants to see this event
    pub fn matches(&self, event: &RawKeyEvent) -> bool {
        match self.key_filter {
            KeyFilter::All => {}
        }
        let device = event.device.as_deref();
        self.device_filters.is_empty()
            || self
                .device_filters
                .iter()
                .any(|filter| filter.matches(device))
    }

    /// Whether a routed event should be hidden from the rest of the system
    pub fn suppress(&self, handled: bool) -> bool {
        self.intercept && handled
    }
}
