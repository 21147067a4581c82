use crate::error::Result;
use crate::reading::Reading;
use btleplug::api::BDAddr;
use std::time::Duration;

/// Something that can produce the latest probe temperatures of a thermometer.
#[allow(async_fn_in_trait)]
pub trait ReadingSource {
    /// Look for the thermometer for at most `timeout`.
    ///
    /// `Ok(None)` means no device reported any probe within the window.
    async fn scan(&mut self, timeout: Duration) -> Result<Option<Reading>>;
}

/// Which device a source should report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceFilter {
    /// The first H5055 seen.
    #[default]
    Any,
    Address(BDAddr),
}

impl DeviceFilter {
    pub fn matches(&self, address: BDAddr) -> bool {
        match self {
            DeviceFilter::Any => true,
            DeviceFilter::Address(expected) => *expected == address,
        }
    }
}

impl From<Option<BDAddr>> for DeviceFilter {
    fn from(address: Option<BDAddr>) -> Self {
        address.map_or(DeviceFilter::Any, DeviceFilter::Address)
    }
}
