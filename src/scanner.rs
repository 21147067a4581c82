use crate::error::{Error, Result};
use crate::govee::{self, ProbePair};
use crate::reading::Reading;
use crate::source::{DeviceFilter, ReadingSource};
use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use chrono::Local;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Probe values gathered during one scan window.
#[derive(Debug)]
pub(crate) struct ScanState {
    filter: DeviceFilter,
    target: Option<BDAddr>,
    reading: Option<Reading>,
    pairs: HashSet<ProbePair>,
}

impl ScanState {
    pub(crate) fn new(filter: DeviceFilter) -> Self {
        ScanState {
            filter,
            target: None,
            reading: None,
            pairs: HashSet::new(),
        }
    }

    /// Whether advertisements from `address` are relevant for this scan.
    pub(crate) fn wants(&self, address: BDAddr) -> bool {
        self.filter.matches(address) && self.target.map_or(true, |target| target == address)
    }

    /// Merge one manufacturer-data record, returns whether it carried H5055 data.
    pub(crate) fn absorb(
        &mut self,
        address: BDAddr,
        local_name: Option<&str>,
        company: u16,
        payload: &[u8],
    ) -> bool {
        if !self.wants(address) || !govee::is_h5055(local_name, company, payload) {
            return false;
        }
        let advertisement = match govee::decode(payload) {
            Ok(advertisement) => advertisement,
            Err(e) => {
                debug!(%address, error = ?e, "undecodable advertisement");
                return false;
            }
        };

        if self.target.is_none() {
            info!(%address, "found {} device", govee::MODEL);
            self.target = Some(address);
        }
        let reading = self
            .reading
            .get_or_insert_with(|| Reading::new(address.to_string(), Local::now()));
        for probe in &advertisement.probes {
            debug!(
                %address,
                probe = probe.probe,
                celsius = probe.celsius,
                alarm = ?probe.alarm,
                battery = advertisement.battery,
                "probe update"
            );
            reading.probes.insert(probe.probe, probe.celsius);
        }
        self.pairs.insert(advertisement.pair);
        true
    }

    /// All probe pairs of the target have been heard.
    pub(crate) fn is_complete(&self) -> bool {
        self.pairs.len() == ProbePair::COUNT
    }

    /// Filter to use for the next scan: locks onto the device found in this one.
    pub(crate) fn next_filter(&self) -> DeviceFilter {
        match (self.filter, self.target) {
            (DeviceFilter::Any, Some(address)) => DeviceFilter::Address(address),
            (filter, _) => filter,
        }
    }

    pub(crate) fn into_reading(self) -> Option<Reading> {
        self.reading.filter(|reading| !reading.is_empty())
    }
}

/// [`ReadingSource`] backed by the first bluetooth adapter of the host.
pub struct BleScanner {
    adapter: Adapter,
    filter: DeviceFilter,
    scanning: bool,
}

impl BleScanner {
    pub async fn new(filter: DeviceFilter) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAdapter)?;
        let info = adapter.adapter_info().await.ok();
        debug!(adapter = ?info, "using bluetooth adapter");
        Ok(BleScanner {
            adapter,
            filter,
            scanning: false,
        })
    }

    async fn collect(&mut self, deadline: Instant) -> Result<Option<Reading>> {
        let mut events = self.adapter.events().await?;
        let mut state = ScanState::new(self.filter);

        while let Ok(Some(event)) = timeout_at(deadline, events.next()).await {
            let CentralEvent::ManufacturerDataAdvertisement {
                id,
                manufacturer_data,
            } = event
            else {
                continue;
            };

            // the device can disappear between the event and the lookup
            let peripheral = match self.adapter.peripheral(&id).await {
                Ok(peripheral) => peripheral,
                Err(e) => {
                    debug!(error = %e, "peripheral lookup failed");
                    continue;
                }
            };
            let address = peripheral.address();
            if !state.wants(address) {
                continue;
            }
            let local_name = match peripheral.properties().await {
                Ok(properties) => properties.and_then(|properties| properties.local_name),
                Err(e) => {
                    debug!(%address, error = %e, "reading peripheral properties failed");
                    continue;
                }
            };

            for (company, payload) in &manufacturer_data {
                debug!(%address, ?local_name, company, ?payload, "advertisement");
                state.absorb(address, local_name.as_deref(), *company, payload);
            }

            if state.is_complete() {
                break;
            }
        }

        let next = state.next_filter();
        if next != self.filter {
            info!(filter = ?next, "locking onto device");
            self.filter = next;
        }
        Ok(state.into_reading())
    }
}

impl ReadingSource for BleScanner {
    async fn scan(&mut self, timeout: Duration) -> Result<Option<Reading>> {
        let deadline = Instant::now() + timeout;
        // a scan future dropped by the caller's timeout leaves discovery running
        if self.scanning {
            debug!("stopping leftover scan");
            if let Err(e) = self.adapter.stop_scan().await {
                debug!(error = %e, "failed to stop leftover scan");
            }
            self.scanning = false;
        }

        self.adapter.start_scan(ScanFilter::default()).await?;
        self.scanning = true;
        let result = self.collect(deadline).await;
        match self.adapter.stop_scan().await {
            Ok(()) => self.scanning = false,
            Err(e) => warn!(error = %e, "failed to stop scan"),
        }
        result
    }
}
