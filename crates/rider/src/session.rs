//! Relay connection and event loop.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use waypoint_common::{ClientEvent, Coordinates, Role, ServerEvent, WaypointError};

use crate::dashboard::{Change, Dashboard, RouteStatus};
use crate::motion::PositionSource;
use crate::routing::{RouteClient, RouteSummary};

/// Outcome of one route lookup
type EtaResult = Result<RouteSummary, WaypointError>;

/// Session settings
pub struct SessionConfig {
    pub server_url: String,
    pub role: Role,
    pub report_interval: Duration,
    /// Minimum spacing between route lookups
    pub eta_interval: Duration,
}

/// Throttles route lookups to one in flight and one per interval
struct EtaPlanner {
    client: Option<RouteClient>,
    interval: Duration,
    next_allowed: Instant,
    in_flight: bool,
}

impl EtaPlanner {
    fn should_request(&self, now: Instant) -> bool {
        self.client.is_some() && !self.in_flight && now >= self.next_allowed
    }

    fn spawn(
        &mut self,
        start: Coordinates,
        end: Coordinates,
        results: mpsc::Sender<EtaResult>,
    ) {
        let Some(client) = self.client.clone() else {
            return;
        };
        self.in_flight = true;
        self.next_allowed = Instant::now() + self.interval;

        tokio::spawn(async move {
            let result = client.route(start, end).await;
            let _ = results.send(result).await;
        });
    }
}

/// Connect, claim the role, and print the dashboard until the relay goes
/// away or Ctrl+C.
pub async fn run(
    config: SessionConfig,
    source: PositionSource,
    route_client: Option<RouteClient>,
) -> Result<()> {
    drive(config, source, route_client, |text| println!("{text}")).await
}

/// Session loop; `on_redraw` receives every rendered dashboard.
async fn drive<F>(
    config: SessionConfig,
    mut source: PositionSource,
    route_client: Option<RouteClient>,
    mut on_redraw: F,
) -> Result<()>
where
    F: FnMut(String),
{
    let (ws, _) = tokio_tungstenite::connect_async(config.server_url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", config.server_url))?;
    tracing::info!(server = %config.server_url, role = %config.role, "WebSocket connected");

    let (mut ws_tx, mut ws_rx) = ws.split();

    send(&mut ws_tx, &ClientEvent::SelectRole { role: config.role }).await?;

    let mut dashboard = Dashboard::new(config.role);
    let mut report = tokio::time::interval(config.report_interval);
    let (eta_tx, mut eta_rx) = mpsc::channel::<EtaResult>(1);
    let mut eta = EtaPlanner {
        client: if config.role == Role::Admin { route_client } else { None },
        interval: config.eta_interval,
        next_allowed: Instant::now(),
        in_flight: false,
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let change = tokio::select! {
            _ = report.tick() => {
                let at = source.next_position();
                send(&mut ws_tx, &ClientEvent::location(at)).await?;
                dashboard.set_own_position(at)
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => match ServerEvent::decode(text.as_str()) {
                    Ok(event) => dashboard.apply(event),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring server frame");
                        Change::default()
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    anyhow::bail!("Relay closed the connection");
                }
                Some(Ok(_)) => Change::default(),
                Some(Err(e)) => return Err(e).context("WebSocket error"),
            },
            Some(result) = eta_rx.recv() => {
                eta.in_flight = false;
                let status = match result {
                    Ok(route) => RouteStatus::Found(route),
                    Err(e) => {
                        tracing::warn!(error = %e, "Route lookup failed");
                        RouteStatus::Failed(e.to_string())
                    }
                };
                dashboard.set_route(status);
                Change { redraw: true, route_wanted: false }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Leaving session");
                let _ = ws_tx.send(Message::Close(None)).await;
                return Ok(());
            }
        };

        if change.route_wanted && eta.should_request(Instant::now()) {
            if let Some((bus, admin)) = dashboard.route_endpoints() {
                eta.spawn(bus, admin, eta_tx.clone());
            }
        }

        if change.redraw {
            on_redraw(dashboard.render());
        }
    }
}

async fn send<S>(ws_tx: &mut S, event: &ClientEvent) -> Result<()>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let text = event.encode()?;
    ws_tx
        .send(Message::Text(text.into()))
        .await
        .context("Failed to send to relay")
}
