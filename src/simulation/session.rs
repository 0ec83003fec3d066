use super::{Dashboard, DashboardSnapshot, Event, SimConfig};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A running dashboard. One task owns the [`Dashboard`] and drains a single
/// event queue; three timer tasks feed it, and so does anyone holding a
/// sender. Snapshots go out on a watch channel after every change.
pub struct Session {
    events: mpsc::UnboundedSender<Event>,
    snapshots: watch::Receiver<Arc<DashboardSnapshot>>,
    cancel: CancellationToken,
    timers: Vec<JoinHandle<()>>,
    owner: Option<JoinHandle<Dashboard>>,
}

impl Session {
    pub fn start(config: SimConfig) -> Self {
        info!(
            "Starting session {}: {} nodes, window {}, loopback {}",
            config.name, config.node_count, config.window_size, config.allow_loopback
        );

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let timers = vec![
            spawn_timer("packets", config.packet_period(), Event::PacketTick, tx.clone(), cancel.clone()),
            spawn_timer("stats", config.stats_period(), Event::StatsTick, tx.clone(), cancel.clone()),
            spawn_timer("remote", config.remote_period(), Event::RemoteTick, tx.clone(), cancel.clone()),
        ];

        let dashboard = Dashboard::new(config);
        let (snap_tx, snap_rx) = watch::channel(Arc::new(dashboard.snapshot(Duration::ZERO)));
        let owner = tokio::spawn(own(dashboard, rx, snap_tx, cancel.clone(), Instant::now()));

        Self {
            events: tx,
            snapshots: snap_rx,
            cancel,
            timers,
            owner: Some(owner),
        }
    }

    pub fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            warn!("Session already stopped, event dropped");
        }
    }

    pub fn submit(&self, content: impl Into<String>, encrypted: bool) {
        self.send(Event::Submit {
            content: content.into(),
            encrypted,
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Arc<DashboardSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Stops every timer and the owning task, and hands back the final state.
    pub async fn shutdown(mut self) -> Result<Dashboard> {
        info!("Shutting down session..");
        self.cancel.cancel();

        for handle in std::mem::take(&mut self.timers) {
            if tokio::time::timeout(Duration::from_secs(2), handle).await.is_err() {
                warn!("Timer did not stop in time");
            }
        }

        let owner = self
            .owner
            .take()
            .ok_or_else(|| anyhow::anyhow!("Session owner already taken"))?;
        let dashboard = owner.await?;
        Ok(dashboard)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_timer(
    name: &'static str,
    period: Duration,
    event: Event,
    tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // first tick lands one full period after start
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Timer {} stopped", name);
                    break;
                }
                _ = tick.tick() => {
                    if tx.send(event.clone()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn own(
    mut dashboard: Dashboard,
    mut rx: mpsc::UnboundedReceiver<Event>,
    snapshots: watch::Sender<Arc<DashboardSnapshot>>,
    cancel: CancellationToken,
    epoch: Instant,
) -> Dashboard {
    let apply = |dashboard: &mut Dashboard, event: Event| {
        let now = epoch.elapsed();
        if dashboard.handle(event, now) {
            // nobody watching is fine
            let _ = snapshots.send(Arc::new(dashboard.snapshot(now)));
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => apply(&mut dashboard, event),
                None => return dashboard,
            },
        }
    }

    // events accepted before the cancel still count
    rx.close();
    let mut drained = 0usize;
    while let Ok(event) = rx.try_recv() {
        apply(&mut dashboard, event);
        drained += 1;
    }
    if drained > 0 {
        debug!("Applied {} queued events on shutdown", drained);
    }
    dashboard
}
