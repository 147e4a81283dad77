//! Periodic liveness frames for an active session.
//!
//! [`run_keep_alive`] takes sole ownership of the session's write half once
//! the login burst is out; nothing else writes to the connection after that.
//! The session stops it through a `watch` channel. Cancellation is observed
//! at every await point, including while a tick's frames are still being
//! written to a peer that has stopped reading, so a stalled client can never
//! keep the task alive. A half-written frame is abandoned and the write half
//! is shut down.

use crate::login::spawn_position_sync;
use log::debug;
use shared::packets::KeepAlive;
use shared::{write_frame, CodecError, Packet};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};

/// Upper bound on closing the write half after the loop ends.
const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Resolves once `cancel` reads true or its sender is gone.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Sends a keep-alive and a position sync every `period` until cancelled.
///
/// The first tick fires one full period after the call, so nothing is written
/// before the caller's own frames. Owns the write half for the rest of the
/// session. Returns the first write error, which ends the session.
pub async fn run_keep_alive<W>(
    mut writer: W,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            written = tick(&mut ticker, &mut writer) => written?,
        }
    }

    // Best effort; the peer may already be gone.
    match timeout(WRITER_SHUTDOWN_TIMEOUT, writer.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Shutdown of session writer failed: {}", e),
        Err(_) => debug!("Shutdown of session writer timed out"),
    }
    Ok(())
}

/// Waits for the next tick and writes its two frames.
async fn tick<W>(ticker: &mut Interval, writer: &mut W) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    ticker.tick().await;
    let keep_alive = KeepAlive { id: rand::random() };
    write_frame(writer, &keep_alive.to_frame()?).await?;
    write_frame(writer, &spawn_position_sync().to_frame()?).await
}
