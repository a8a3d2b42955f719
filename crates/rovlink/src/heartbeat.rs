//! Autonomy heartbeat -- a cancellable periodic task.
//!
//! While autonomous mode is on, the rover expects `auto1` to keep arriving.
//! [`Heartbeat`] re-sends it every period and drains whatever the rover
//! answered, so neither the socket buffer nor the operator's control path
//! ever blocks on it.
//!
//! The first beat fires one full period after [`Heartbeat::spawn`]; the
//! dispatcher sends the initial `auto1` itself.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use rovlink_core::error::Result;
use rovlink_core::events::RoverEvent;
use rovlink_protocol::Command;

use crate::session::Session;

/// Handle to a running heartbeat task.
///
/// Dropping the handle cancels the task without waiting for it; call
/// [`stop`](Heartbeat::stop) to cancel and wait.
#[derive(Debug)]
pub struct Heartbeat {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Start beating on `session` every `period`, reading up to
    /// `receive_buffer` bytes of reply after each beat.
    pub fn spawn(
        session: Session,
        period: Duration,
        receive_buffer: usize,
        event_tx: broadcast::Sender<RoverEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            session,
            period,
            receive_buffer,
            event_tx.clone(),
            cancel.clone(),
        ));

        debug!(period_ms = period.as_millis(), "Heartbeat started");
        let _ = event_tx.send(RoverEvent::HeartbeatStarted);

        Heartbeat { cancel, task }
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the task and wait for it to finish.
    ///
    /// When this returns no further beat will be sent.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            if e.is_panic() {
                warn!(error = %e, "Heartbeat task panicked");
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    session: Session,
    period: Duration,
    receive_buffer: usize,
    event_tx: broadcast::Sender<RoverEvent>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Consecutive failed sends; only the first of a run logs at warn.
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        match beat(&session, receive_buffer, &event_tx).await {
            Ok(()) if failures > 0 => {
                info!(failures, "Heartbeat send recovered");
                failures = 0;
            }
            Ok(()) => {}
            Err(e) => {
                failures = failures.saturating_add(1);
                if failures == 1 {
                    warn!(error = %e, "Heartbeat send failed");
                } else {
                    trace!(error = %e, failures, "Heartbeat send still failing");
                }
            }
        }
    }

    debug!("Heartbeat stopped");
    let _ = event_tx.send(RoverEvent::HeartbeatStopped);
}

/// One beat: send `auto1`, then drain a reply if one is waiting.
///
/// Returns the send error; the read is skipped when the send fails.
async fn beat(
    session: &Session,
    receive_buffer: usize,
    event_tx: &broadcast::Sender<RoverEvent>,
) -> Result<()> {
    session.send(&Command::heartbeat().encode()).await?;

    match session.receive(receive_buffer).await {
        Ok(data) => {
            debug!(data = %String::from_utf8_lossy(&data), "Data received");
            let _ = event_tx.send(RoverEvent::Reply { data });
        }
        Err(e) if e.is_timeout() => trace!("No reply to heartbeat"),
        Err(e) => warn!(error = %e, "Could not receive data"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RetryPolicy;
    use crate::test_log::CapturedLogs;
    use tracing::Level;
    use rovlink_test_harness::MockConnector;
    use std::sync::Arc;

    const PERIOD: Duration = Duration::from_millis(100);

    async fn connected(connector: &MockConnector) -> (Session, broadcast::Sender<RoverEvent>) {
        let (event_tx, _) = broadcast::channel(64);
        let session = Session::new(
            "rover:5005",
            Arc::new(connector.clone()),
            RetryPolicy::default(),
            Duration::from_millis(10),
            event_tx.clone(),
        );
        session.connect().await.unwrap();
        (session, event_tx)
    }

    #[tokio::test(start_paused = true)]
    async fn beats_every_period() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(350)).await;
        heartbeat.stop().await;

        let beats = connector.handle().count_sent("auto1");
        assert!((3..=4).contains(&beats), "beats: {beats}");
    }

    #[tokio::test(start_paused = true)]
    async fn first_beat_waits_one_period() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.handle().count_sent("auto1"), 0);

        heartbeat.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_sent_after_stop() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(250)).await;
        heartbeat.stop().await;
        let beats = connector.handle().count_sent("auto1");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(connector.handle().count_sent("auto1"), beats);
    }

    #[tokio::test(start_paused = true)]
    async fn replies_are_published_as_opaque_bytes() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;
        let mut events = event_tx.subscribe();
        connector.handle().queue_reply(&[0x00, 0xFF, b'o', b'k']);

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(150)).await;
        heartbeat.stop().await;

        assert_eq!(events.recv().await.unwrap(), RoverEvent::HeartbeatStarted);
        assert_eq!(
            events.recv().await.unwrap(),
            RoverEvent::Reply {
                data: bytes::Bytes::from_static(&[0x00, 0xFF, b'o', b'k'])
            }
        );
        assert_eq!(events.recv().await.unwrap(), RoverEvent::HeartbeatStopped);
    }

    #[tokio::test(start_paused = true)]
    async fn survives_send_failures() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;
        connector.handle().set_fail_sends(true);

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(heartbeat.is_running());

        connector.handle().set_fail_sends(false);
        tokio::time::sleep(Duration::from_millis(200)).await;
        heartbeat.stop().await;

        assert!(connector.handle().count_sent("auto1") >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_task() {
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        drop(heartbeat);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(connector.handle().count_sent("auto1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_link_warns_once_per_outage() {
        let (logs, _guard) = CapturedLogs::install();
        let connector = MockConnector::new();
        let (session, event_tx) = connected(&connector).await;
        connector.handle().set_fail_sends(true);

        let heartbeat = Heartbeat::spawn(session, PERIOD, 255, event_tx);
        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(logs.count(Level::WARN, "Heartbeat send failed"), 1);

        connector.handle().set_fail_sends(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(logs.count(Level::INFO, "Heartbeat send recovered"), 1);

        connector.handle().set_fail_sends(true);
        tokio::time::sleep(Duration::from_millis(300)).await;
        heartbeat.stop().await;

        assert_eq!(logs.count(Level::WARN, "Heartbeat send failed"), 2);
    }
}
