use super::TOTPApplication;
use crate::domain::error::TotpError;
use crate::domain::models::DisplayFrame;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct RefreshHandle {
    frames: watch::Receiver<DisplayFrame>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn subscribe(&self) -> watch::Receiver<DisplayFrame> {
        self.frames.clone()
    }

    pub fn latest(&self) -> DisplayFrame {
        self.frames.borrow().clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!("Refresh loop ended abnormally: {}", e);
        }
    }
}

// Each tick reads the wall clock afresh; late ticks do not accumulate drift.
pub fn spawn(
    app: Arc<TOTPApplication>,
    interval: Duration,
    clock: Arc<dyn Clock>,
) -> RefreshHandle {
    let (frame_tx, frame_rx) = watch::channel(DisplayFrame::Idle);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_error: Option<TotpError> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let frame = tick(&app, clock.now(), &mut last_error).await;
                    frame_tx.send_replace(frame);
                }
            }
        }
        debug!("Refresh loop stopped");
    });

    RefreshHandle {
        frames: frame_rx,
        shutdown: Some(shutdown_tx),
        task,
    }
}

async fn tick(
    app: &TOTPApplication,
    now: DateTime<Utc>,
    last_error: &mut Option<TotpError>,
) -> DisplayFrame {
    match app.try_frame_at(now).await {
        Ok(frame) => {
            *last_error = None;
            frame
        }
        Err(e) => {
            // once per distinct failure, not every tick
            if last_error.as_ref() != Some(&e) {
                error!("totp error: {}", e);
                *last_error = Some(e);
            }
            DisplayFrame::Error {
                fraction_elapsed: app.totp().fraction_elapsed(now),
            }
        }
    }
}
