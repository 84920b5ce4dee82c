// Station list and statistics for one event, plus one access session per
// active station.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::access::{AccessSession, QrVerifier};
use crate::api::{ApiClient, ApiError};
use crate::cache::CachedData;
use crate::models::{EventContext, Station, StationStats, StationStatsMap, UserRole};
use crate::polling::{
    spawn_polling_task, PollHandle, RefreshTrigger, CHANNEL_BUFFER_SIZE, POLL_INTERVAL,
};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Role '{0}' may not manage stations")]
    NotPermitted(UserRole),

    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Station registry has been torn down")]
    TornDown,

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct StationRegistry {
    api: ApiClient,
    verifier: QrVerifier,
    context: EventContext,

    stations: Vec<Station>,
    stats: Option<CachedData<StationStatsMap>>,
    sessions: HashMap<String, AccessSession>,

    /// Fired by every session after a granted scan
    session_triggers: Vec<RefreshTrigger>,

    poll_interval: Duration,
    poller: Option<PollHandle>,
    stats_rx: Option<mpsc::Receiver<StationStatsMap>>,
    torn_down: bool,
}

impl StationRegistry {
    pub fn new(api: ApiClient, context: EventContext) -> Self {
        Self {
            verifier: QrVerifier::new(api.clone()),
            api,
            context,
            stations: Vec::new(),
            stats: None,
            sessions: HashMap::new(),
            session_triggers: Vec::new(),
            poll_interval: POLL_INTERVAL,
            poller: None,
            stats_rx: None,
            torn_down: false,
        }
    }

    pub(crate) fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = period;
        self
    }

    /// Load the stations and start the stats poller.
    pub async fn mount(&mut self) {
        info!(
            event_id = %self.context.event_id,
            role = %self.context.role,
            "Mounting station registry"
        );
        self.start_polling();
        if let Err(e) = self.list_stations().await {
            debug!(error = %e, "Initial station list unavailable");
        }
    }

    /// Start the periodic per-station stats fetch. Does nothing if already running.
    pub fn start_polling(&mut self) {
        if self.poller.is_some() || self.torn_down {
            return;
        }

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let api = self.api.clone();
        let event_id = self.context.event_id.clone();

        let poller = spawn_polling_task("station-stats", self.poll_interval, tx, move || {
            let api = api.clone();
            let event_id = event_id.clone();
            async move { api.fetch_station_stats(&event_id).await }
        });

        let trigger = poller.refresh_trigger();
        for session in self.sessions.values_mut() {
            session.add_refresh(trigger.clone());
        }
        self.session_triggers.push(trigger);

        self.poller = Some(poller);
        self.stats_rx = Some(rx);
    }

    /// Have every session (current and future) fire `trigger` after a granted scan.
    pub fn add_session_refresh(&mut self, trigger: RefreshTrigger) {
        for session in self.sessions.values_mut() {
            session.add_refresh(trigger.clone());
        }
        self.session_triggers.push(trigger);
    }

    /// Ask the stats poller for an immediate fetch.
    pub fn refresh_stats(&self) {
        if let Some(ref poller) = self.poller {
            poller.refresh_now();
        }
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, station_id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == station_id)
    }

    pub fn stats(&self) -> Option<&StationStatsMap> {
        self.stats.as_ref().map(|c| &c.data)
    }

    pub fn stats_for(&self, station_id: &str) -> Option<&StationStats> {
        self.stats().and_then(|m| m.get(station_id))
    }

    /// How old the displayed stats are, e.g. "45s ago"
    pub fn stats_age(&self) -> Option<String> {
        self.stats.as_ref().map(|c| c.age_display())
    }

    pub fn session(&self, station_id: &str) -> Option<&AccessSession> {
        self.sessions.get(station_id)
    }

    pub fn session_mut(&mut self, station_id: &str) -> Option<&mut AccessSession> {
        self.sessions.get_mut(station_id)
    }

    /// Whether add/toggle/remove controls are offered to the current role.
    pub fn controls_visible(&self) -> bool {
        self.context.role.can_manage_stations()
    }

    fn ensure_live(&self) -> Result<(), RegistryError> {
        if self.torn_down {
            Err(RegistryError::TornDown)
        } else {
            Ok(())
        }
    }

    fn ensure_permitted(&self) -> Result<(), RegistryError> {
        self.ensure_live()?;
        if self.controls_visible() {
            Ok(())
        } else {
            Err(RegistryError::NotPermitted(self.context.role.clone()))
        }
    }

    // ===== Backend operations =====

    /// Fetch all stations for the event, replacing the local list.
    pub async fn list_stations(&mut self) -> Result<&[Station], RegistryError> {
        self.ensure_live()?;
        match self.api.fetch_stations(&self.context.event_id).await {
            Ok(stations) => {
                debug!(count = stations.len(), "Stations loaded");
                self.stations = stations;
                self.sync_sessions();
                Ok(self.stations.as_slice())
            }
            Err(e) => {
                warn!(event_id = %self.context.event_id, error = %e, "Failed to fetch stations");
                Err(e.into())
            }
        }
    }

    pub async fn add_station(&mut self) -> Result<&Station, RegistryError> {
        self.ensure_permitted()?;

        match self.api.add_station(&self.context.event_id).await {
            Ok(station) => {
                info!(station = %station.id, "Station added");
                self.stations.retain(|s| s.id != station.id);
                self.stations.push(station);
                self.sync_sessions();
                let idx = self.stations.len() - 1;
                Ok(&self.stations[idx])
            }
            Err(e) => {
                warn!(event_id = %self.context.event_id, error = %e, "Failed to add station");
                Err(e.into())
            }
        }
    }

    /// Flip a station's active flag. The local record is replaced with the
    /// backend's answer rather than flipped locally.
    pub async fn toggle_station(&mut self, station_id: &str) -> Result<&Station, RegistryError> {
        self.ensure_permitted()?;
        let idx = self
            .stations
            .iter()
            .position(|s| s.id == station_id)
            .ok_or_else(|| RegistryError::UnknownStation(station_id.to_string()))?;

        match self.api.toggle_station(&self.context.event_id, station_id).await {
            Ok(station) => {
                info!(station = %station_id, active = station.is_active, "Station toggled");
                self.stations[idx] = station;
                self.sync_sessions();
                Ok(&self.stations[idx])
            }
            Err(e) => {
                warn!(station = %station_id, error = %e, "Failed to toggle station");
                Err(e.into())
            }
        }
    }

    /// Delete a station; it leaves the local list only once the backend confirms.
    pub async fn remove_station(&mut self, station_id: &str) -> Result<(), RegistryError> {
        self.ensure_permitted()?;
        if self.station(station_id).is_none() {
            return Err(RegistryError::UnknownStation(station_id.to_string()));
        }

        match self.api.remove_station(&self.context.event_id, station_id).await {
            Ok(()) => {
                info!(station = %station_id, "Station removed");
                self.stations.retain(|s| s.id != station_id);
                self.sync_sessions();
                Ok(())
            }
            Err(e) => {
                warn!(station = %station_id, error = %e, "Failed to remove station");
                Err(e.into())
            }
        }
    }

    // ===== Background results =====

    /// Apply finished stats polls and scan verifications. Returns true when
    /// anything visible changed.
    pub fn check_background_tasks(&mut self) -> bool {
        if self.torn_down {
            return false;
        }

        let latest = {
            let mut latest = None;
            if let Some(ref mut rx) = self.stats_rx {
                while let Ok(map) = rx.try_recv() {
                    latest = Some(map);
                }
            }
            latest
        };

        let mut changed = false;
        if let Some(map) = latest {
            self.apply_stats(map);
            changed = true;
        }
        for session in self.sessions.values_mut() {
            changed |= session.check_background_tasks();
        }
        changed
    }

    fn apply_stats(&mut self, map: StationStatsMap) {
        debug!(stations = map.len(), "Station stats replaced");
        self.stats = Some(CachedData::new(map));
    }

    /// Keep exactly one session per active station.
    fn sync_sessions(&mut self) {
        let active: Vec<&str> = self
            .stations
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.id.as_str())
            .collect();

        let stale: Vec<String> = self
            .sessions
            .keys()
            .filter(|id| !active.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(mut session) = self.sessions.remove(&id) {
                session.teardown();
            }
        }

        for id in active {
            if !self.sessions.contains_key(id) {
                let mut session =
                    AccessSession::new(self.verifier.clone(), self.context.event_id.clone(), id);
                for trigger in &self.session_triggers {
                    session.add_refresh(trigger.clone());
                }
                self.sessions.insert(id.to_string(), session);
            }
        }
    }

    /// Stop polling and all sessions. Late results are discarded.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        info!(event_id = %self.context.event_id, "Tearing down station registry");
        self.torn_down = true;
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        self.stats_rx = None;
        for session in self.sessions.values_mut() {
            session.teardown();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for StationRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}
