//! Check-in console for one event: the live dashboard plus the
//! multi-station registry, wired so a granted scan at any station
//! refreshes both the station stats and the dashboard counts.

use tracing::info;

use crate::access::AccessSession;
use crate::api::ApiClient;
use crate::dashboard::EventDashboard;
use crate::stations::StationRegistry;

pub struct CheckInConsole {
    dashboard: EventDashboard,
    registry: StationRegistry,
}

impl CheckInConsole {
    /// Load the event, the user's role and the stations, and start both pollers.
    pub async fn mount(api: ApiClient, event_id: impl Into<String>) -> Self {
        let mut dashboard = EventDashboard::new(api.clone(), event_id);
        dashboard.mount().await;

        let mut registry = StationRegistry::new(api, dashboard.context());
        registry.mount().await;
        if let Some(trigger) = dashboard.refresh_trigger() {
            registry.add_session_refresh(trigger);
        }
        info!(
            event_id = %dashboard.event_id(),
            role = %dashboard.role(),
            stations = registry.stations().len(),
            "Check-in console ready"
        );
        Self { dashboard, registry }
    }

    pub fn dashboard(&self) -> &EventDashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut EventDashboard {
        &mut self.dashboard
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StationRegistry {
        &mut self.registry
    }

    pub fn session_mut(&mut self, station_id: &str) -> Option<&mut AccessSession> {
        self.registry.session_mut(station_id)
    }

    /// Refresh the dashboard and station stats now, outside the timer cadence.
    pub fn refresh_now(&self) {
        self.dashboard.refresh_now();
        self.registry.refresh_stats();
    }

    /// Apply every finished background fetch and verification.
    /// Returns true when anything visible changed.
    pub fn check_background_tasks(&mut self) -> bool {
        let dashboard_changed = self.dashboard.check_background_tasks();
        let registry_changed = self.registry.check_background_tasks();
        dashboard_changed || registry_changed
    }

    pub fn teardown(&mut self) {
        self.dashboard.teardown();
        self.registry.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::models::UserRole;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn get(server: &MockServer, p: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
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

    async fn backend(role: &str) -> MockServer {
        let server = MockServer::start().await;
        get(&server, "/events/E1", serde_json::json!({ "id": "E1", "name": "Gala" })).await;
        get(&server, "/auth/user-role", serde_json::json!({ "role": role })).await;
        let stations = serde_json::json!([{ "id": "S1", "isActive": true }]);
        get(&server, "/events/E1/stations", stations).await;
        get(&server, "/events/E1/stations/stats", serde_json::json!({})).await;
        let stats = serde_json::json!({ "totalGuests": 100, "checkedIn": 40 });
        get(&server, "/events/E1/stats", stats).await;
        get(&server, "/events/E1/recent-entries", serde_json::json!([])).await;
        get(&server, "/events/E1/entry-data", serde_json::json!([])).await;
        Mock::given(method("POST"))
            .and(path("/events/E1/verify-qr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "guestName": "Ada" })),
            )
            .mount(&server)
            .await;
        server
    }

    async fn wait_for_requests(server: &MockServer, p: &str, at_least: usize) -> bool {
        tokio::time::timeout(Duration::from_secs(3), async {
            while requests_to(server, p).await < at_least {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_role_flows_from_dashboard_to_registry() {
        let server = backend("supervisor").await;
        let mut console = CheckInConsole::mount(ApiClient::new(server.uri()).unwrap(), "E1").await;

        assert_eq!(console.registry().context().role, UserRole::Supervisor);
        assert!(console.registry().controls_visible());
        assert!(console.registry().session("S1").is_some());
        console.teardown();
    }

    #[tokio::test]
    async fn test_operator_console_hides_controls() {
        let server = backend("operator").await;
        let mut console = CheckInConsole::mount(ApiClient::new(server.uri()).unwrap(), "E1").await;
        assert!(!console.registry().controls_visible());
        console.teardown();
    }

    #[tokio::test]
    async fn test_granted_scan_refreshes_stations_and_dashboard() {
        let server = backend("operator").await;
        let mut console = CheckInConsole::mount(ApiClient::new(server.uri()).unwrap(), "E1").await;

        // Let the initial (immediate) polls land first
        assert!(wait_for_requests(&server, "/events/E1/stations/stats", 1).await);
        assert!(wait_for_requests(&server, "/events/E1/stats", 1).await);
        let station_polls = requests_to(&server, "/events/E1/stations/stats").await;
        let dashboard_polls = requests_to(&server, "/events/E1/stats").await;

        let session = console.session_mut("S1").unwrap();
        assert!(session.scan("TICKET-1"));
        session.wait_for_outcome().await;
        assert_eq!(session.result().unwrap().guest_name, "Ada");

        assert!(wait_for_requests(&server, "/events/E1/stations/stats", station_polls + 1).await);
        assert!(wait_for_requests(&server, "/events/E1/stats", dashboard_polls + 1).await);
        console.teardown();
    }

    #[tokio::test]
    async fn test_check_background_tasks_after_teardown() {
        let server = backend("admin").await;
        let mut console = CheckInConsole::mount(ApiClient::new(server.uri()).unwrap(), "E1").await;
        console.teardown();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!console.check_background_tasks());
        assert!(console.dashboard().is_torn_down());
        assert!(console.registry().is_torn_down());
        assert!(console.registry().session("S1").unwrap().is_torn_down());
    }
}
