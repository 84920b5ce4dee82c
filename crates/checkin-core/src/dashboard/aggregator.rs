use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiResult};
use crate::cache::CachedData;
use crate::models::{EntryDataPoint, Event, EventCheckInStats, EventContext, RecentEntry, UserRole};
use crate::polling::{
    spawn_polling_task, PollHandle, RefreshTrigger, CHANNEL_BUFFER_SIZE, POLL_INTERVAL,
};

/// Everything the live dashboard shows, fetched together in one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub stats: EventCheckInStats,
    /// Newest first
    pub recent_entries: Vec<RecentEntry>,
    pub entry_data: Vec<EntryDataPoint>,
}

impl DashboardSnapshot {
    /// Fetch stats, entry feed and chart series concurrently. Fails if any
    /// of the three fails, so a snapshot is never half old, half new.
    pub async fn fetch(api: &ApiClient, event_id: &str) -> ApiResult<Self> {
        let (stats, recent_entries, entry_data) = futures::try_join!(
            api.fetch_event_stats(event_id),
            api.fetch_recent_entries(event_id),
            api.fetch_entry_data(event_id),
        )?;
        Ok(Self {
            stats,
            recent_entries,
            entry_data,
        })
    }

    pub fn total_entries_charted(&self) -> u64 {
        self.entry_data.iter().map(|p| p.entries).sum()
    }
}

/// Real-time check-in dashboard for one event.
pub struct EventDashboard {
    api: ApiClient,
    event_id: String,
    event: Option<Event>,
    role: UserRole,
    snapshot: Option<CachedData<DashboardSnapshot>>,

    poll_interval: Duration,
    poller: Option<PollHandle>,
    snapshot_rx: Option<mpsc::Receiver<DashboardSnapshot>>,
    torn_down: bool,
}

impl EventDashboard {
    pub fn new(api: ApiClient, event_id: impl Into<String>) -> Self {
        Self {
            api,
            event_id: event_id.into(),
            event: None,
            role: UserRole::default(),
            snapshot: None,
            poll_interval: POLL_INTERVAL,
            poller: None,
            snapshot_rx: None,
            torn_down: false,
        }
    }

    pub(crate) fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = period;
        self
    }

    /// Load event details and the user's role, then start the refresh timer.
    pub async fn mount(&mut self) {
        info!(event_id = %self.event_id, "Mounting event dashboard");

        match self.api.fetch_event(&self.event_id).await {
            Ok(event) => self.event = Some(event),
            Err(e) => warn!(event_id = %self.event_id, error = %e, "Failed to fetch event details"),
        }

        match self.api.fetch_user_role().await {
            Ok(role) => self.role = role,
            Err(e) => warn!(error = %e, "Failed to fetch user role, staying '{}'", self.role),
        }

        self.start_polling();
    }

    pub fn start_polling(&mut self) {
        if self.poller.is_some() || self.torn_down {
            return;
        }

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let api = self.api.clone();
        let event_id = self.event_id.clone();

        self.poller = Some(spawn_polling_task("dashboard", self.poll_interval, tx, move || {
            let api = api.clone();
            let event_id = event_id.clone();
            async move { DashboardSnapshot::fetch(&api, &event_id).await }
        }));
        self.snapshot_rx = Some(rx);
    }

    /// Fetch everything now, outside the timer cadence. The next scheduled
    /// refresh still happens on time.
    pub fn refresh_now(&self) {
        match self.poller {
            Some(ref poller) => poller.refresh_now(),
            None => debug!("Refresh requested before dashboard polling started"),
        }
    }

    pub fn refresh_trigger(&self) -> Option<RefreshTrigger> {
        self.poller.as_ref().map(|p| p.refresh_trigger())
    }

    /// Apply the newest finished refresh, if any. Returns true when the
    /// snapshot changed.
    pub fn check_background_tasks(&mut self) -> bool {
        if self.torn_down {
            return false;
        }

        let mut latest = None;
        if let Some(ref mut rx) = self.snapshot_rx {
            while let Ok(snapshot) = rx.try_recv() {
                latest = Some(snapshot);
            }
        }

        match latest {
            Some(snapshot) => {
                debug!(
                    checked_in = snapshot.stats.checked_in,
                    entries = snapshot.recent_entries.len(),
                    "Dashboard snapshot replaced"
                );
                self.snapshot = Some(CachedData::new(snapshot));
                true
            }
            None => false,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    /// The event title, or its id until details have loaded
    pub fn title(&self) -> String {
        match self.event {
            Some(ref event) => event.name.clone(),
            None => format!("Event {}", self.event_id),
        }
    }

    pub fn role(&self) -> &UserRole {
        &self.role
    }

    pub fn context(&self) -> EventContext {
        EventContext::new(self.event_id.clone(), self.role.clone())
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref().map(|c| &c.data)
    }

    pub fn stats(&self) -> EventCheckInStats {
        self.snapshot().map(|s| s.stats.clone()).unwrap_or_default()
    }

    pub fn recent_entries(&self) -> &[RecentEntry] {
        self.snapshot().map(|s| s.recent_entries.as_slice()).unwrap_or(&[])
    }

    pub fn entry_data(&self) -> &[EntryDataPoint] {
        self.snapshot().map(|s| s.entry_data.as_slice()).unwrap_or(&[])
    }

    pub fn last_updated(&self) -> Option<String> {
        self.snapshot.as_ref().map(|c| c.age_display())
    }

    pub fn is_stale(&self) -> bool {
        self.snapshot.as_ref().map(|c| c.is_stale()).unwrap_or(true)
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        info!(event_id = %self.event_id, "Tearing down event dashboard");
        self.torn_down = true;
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        self.snapshot_rx = None;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for EventDashboard {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_json(server: &MockServer, p: &str, body: serde_json::Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(server).await,
            None => mock.mount(server).await,
        }
    }

    async fn mount_cycle(
        server: &MockServer,
        stats: serde_json::Value,
        entries: serde_json::Value,
        data: serde_json::Value,
        times: Option<u64>,
    ) {
        mount_json(server, "/events/E1/stats", stats, times).await;
        mount_json(server, "/events/E1/recent-entries", entries, times).await;
        mount_json(server, "/events/E1/entry-data", data, times).await;
    }

    fn dashboard(server: &MockServer, period: Duration) -> EventDashboard {
        EventDashboard::new(ApiClient::new(server.uri()).unwrap(), "E1").with_poll_interval(period)
    }

    async fn wait_until<F>(dash: &mut EventDashboard, mut done: F) -> bool
    where
        F: FnMut(&EventDashboard) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                dash.check_background_tasks();
                if done(dash) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    async fn requests_to(server: &MockServer, p: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == p)
            .count()
    }

    #[tokio::test]
    async fn test_mount_loads_event_and_role() {
        let server = MockServer::start().await;
        let event = serde_json::json!({ "id": "E1", "name": "Spring Gala", "capacity": 100 });
        mount_json(&server, "/events/E1", event, None).await;
        mount_json(&server, "/auth/user-role", serde_json::json!({ "role": "admin" }), None).await;
        let stats = serde_json::json!({ "totalGuests": 100, "checkedIn": 40 });
        mount_cycle(&server, stats, serde_json::json!([]), serde_json::json!([]), None).await;

        let mut dash = dashboard(&server, Duration::from_secs(3600));
        assert_eq!(dash.title(), "Event E1");
        dash.mount().await;

        assert_eq!(dash.title(), "Spring Gala");
        assert_eq!(dash.role(), &UserRole::Admin);
        assert_eq!(dash.context(), EventContext::new("E1", UserRole::Admin));

        assert!(wait_until(&mut dash, |d| d.snapshot().is_some()).await);
        let stats = dash.stats();
        assert_eq!(stats.total_guests, 100);
        assert_eq!(stats.checked_in, 40);
        assert_eq!(stats.not_arrived(), 60);
        dash.teardown();
    }

    #[tokio::test]
    async fn test_role_failure_defaults_to_operator() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/user-role"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut dash = dashboard(&server, Duration::from_secs(3600));
        dash.mount().await;
        assert_eq!(dash.role(), &UserRole::Operator);
        assert!(dash.event().is_none());
        assert!(dash.is_stale());
        dash.teardown();
    }

    #[tokio::test]
    async fn test_snapshot_replaced_wholesale() {
        let server = MockServer::start().await;
        mount_cycle(
            &server,
            serde_json::json!({ "totalGuests": 100, "checkedIn": 40, "notArrived": 60 }),
            serde_json::json!([
                { "guestName": "Ada", "entryTime": "2026-06-01T19:00:00Z" },
                { "guestName": "Grace", "entryTime": "2026-06-01T18:59:00Z" }
            ]),
            serde_json::json!([
                { "time": "18:00", "entries": 10 },
                { "time": "19:00", "entries": 30 }
            ]),
            Some(1),
        )
        .await;
        mount_cycle(
            &server,
            serde_json::json!({ "totalGuests": 100, "checkedIn": 41 }),
            serde_json::json!([{ "guestName": "Alan", "entryTime": "2026-06-01T19:05:00Z" }]),
            serde_json::json!([{ "time": "19:00", "entries": 31 }]),
            None,
        )
        .await;

        let mut dash = dashboard(&server, Duration::from_millis(200));
        dash.start_polling();

        assert!(wait_until(&mut dash, |d| d.stats().checked_in == 40).await);
        assert_eq!(dash.recent_entries().len(), 2);
        assert_eq!(dash.snapshot().unwrap().total_entries_charted(), 40);

        assert!(wait_until(&mut dash, |d| d.stats().checked_in == 41).await);
        let snapshot = dash.snapshot().unwrap();
        assert_eq!(
            snapshot,
            &DashboardSnapshot {
                stats: EventCheckInStats {
                    total_guests: 100,
                    checked_in: 41,
                    not_arrived: None,
                },
                recent_entries: vec![RecentEntry {
                    guest_name: "Alan".to_string(),
                    entry_time: "2026-06-01T19:05:00Z".to_string(),
                }],
                entry_data: vec![EntryDataPoint {
                    time: "19:00".to_string(),
                    entries: 31,
                }],
            }
        );
        assert_eq!(dash.last_updated().as_deref(), Some("just now"));
        dash.teardown();
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_previous_snapshot() {
        let server = MockServer::start().await;
        let first = serde_json::json!({ "totalGuests": 10, "checkedIn": 2 });
        let later = serde_json::json!({ "totalGuests": 10, "checkedIn": 9 });
        mount_json(&server, "/events/E1/stats", first, Some(1)).await;
        mount_json(&server, "/events/E1/stats", later, None).await;
        mount_json(&server, "/events/E1/recent-entries", serde_json::json!([]), Some(1)).await;
        Mock::given(method("GET"))
            .and(path("/events/E1/recent-entries"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        mount_json(&server, "/events/E1/entry-data", serde_json::json!([]), None).await;

        let mut dash = dashboard(&server, Duration::from_millis(30));
        dash.start_polling();
        assert!(wait_until(&mut dash, |d| d.snapshot().is_some()).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        dash.check_background_tasks();
        assert_eq!(dash.stats().checked_in, 2);
        dash.teardown();
    }

    #[tokio::test]
    async fn test_refresh_now_fetches_outside_cadence() {
        let server = MockServer::start().await;
        let stats = serde_json::json!({ "totalGuests": 1, "checkedIn": 0 });
        mount_cycle(&server, stats, serde_json::json!([]), serde_json::json!([]), None).await;

        let mut dash = dashboard(&server, Duration::from_secs(3600));
        dash.start_polling();
        assert!(wait_until(&mut dash, |d| d.snapshot().is_some()).await);
        assert_eq!(requests_to(&server, "/events/E1/stats").await, 1);

        dash.refresh_now();
        let refreshed = tokio::time::timeout(Duration::from_secs(2), async {
            while requests_to(&server, "/events/E1/stats").await < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(refreshed.is_ok());
        assert_eq!(requests_to(&server, "/events/E1/recent-entries").await, 2);
        dash.teardown();
    }

    #[tokio::test]
    async fn test_no_mutation_after_teardown() {
        let server = MockServer::start().await;
        for p in ["/events/E1/stats", "/events/E1/recent-entries", "/events/E1/entry-data"] {
            let body = if p.ends_with("stats") {
                serde_json::json!({ "totalGuests": 5, "checkedIn": 5 })
            } else {
                serde_json::json!([])
            };
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(body)
                        .set_delay(Duration::from_millis(150)),
                )
                .mount(&server)
                .await;
        }

        let mut dash = dashboard(&server, Duration::from_millis(20));
        dash.start_polling();
        dash.teardown();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!dash.check_background_tasks());
        assert!(dash.snapshot().is_none());
        assert!(dash.is_torn_down());
        dash.refresh_now();
    }
}
