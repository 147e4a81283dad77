//! The play stage of an established session.
//!
//! The stream is split once the bootstrap burst is out: the keep-alive task
//! takes the write half, and this task keeps the read half and discards
//! every frame the client sends. Whichever side stops first ends the
//! session; the registry entry goes with the guard.

use crate::error::ConnectionError;
use crate::keepalive::{cancelled, run_keep_alive};
use crate::registry::SessionGuard;
use log::{debug, info, trace, warn};
use shared::{read_frame, CodecError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;

/// How long a cancelled keep-alive task gets to finish before it is aborted.
const KEEP_ALIVE_STOP_TIMEOUT: Duration = Duration::from_secs(2);

enum Exit {
    Read(CodecError),
    KeepAlive(Result<Result<(), CodecError>, JoinError>),
    Shutdown,
}

/// Runs the session until the client disconnects, a keep-alive write fails,
/// or `shutdown` fires. The keep-alive task has always finished when this
/// returns.
pub async fn run_session<S>(
    stream: S,
    guard: SessionGuard,
    keep_alive_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let session = guard.session();
    let (mut reader, writer) = tokio::io::split(stream);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut keep_alive = tokio::spawn(run_keep_alive(writer, keep_alive_interval, cancel_rx));

    let exit = loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(frame) => trace!(
                    "Discarding frame 0x{:02X} from {}",
                    frame.id, session.username
                ),
                Err(e) => break Exit::Read(e),
            },
            joined = &mut keep_alive => break Exit::KeepAlive(joined),
            _ = cancelled(&mut shutdown) => break Exit::Shutdown,
        }
    };

    let result = match exit {
        Exit::KeepAlive(joined) => keep_alive_result(joined, &session.username),
        exit => {
            // Stop the ticker before the stream is dropped.
            let _ = cancel_tx.send(true);
            stop_keep_alive(keep_alive, &session.username).await;
            match exit {
                Exit::Read(e) => Err(e.into()),
                _ => Ok(()),
            }
        }
    };

    info!(
        "{}({}) disconnected after {:.1?}",
        session.username,
        session.uuid,
        session.established_at.elapsed()
    );
    drop(guard);
    result
}

async fn stop_keep_alive(
    mut keep_alive: JoinHandle<Result<(), CodecError>>,
    username: &str,
) {
    match timeout(KEEP_ALIVE_STOP_TIMEOUT, &mut keep_alive).await {
        Ok(joined) => {
            if let Err(e) = keep_alive_result(joined, username) {
                debug!("Keep-alive for {} ended with: {}", username, e);
            }
        }
        Err(_) => {
            warn!("Keep-alive task for {} did not stop, aborting", username);
            keep_alive.abort();
        }
    }
}

fn keep_alive_result(
    joined: Result<Result<(), CodecError>, JoinError>,
    username: &str,
) -> Result<(), ConnectionError> {
    match joined {
        Ok(result) => result.map_err(ConnectionError::from),
        Err(e) => {
            warn!("Keep-alive task for {} failed: {}", username, e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionRegistry;
    use shared::ids::play;
    use shared::offline_uuid;
    use std::sync::Arc;
    use tokio::io::{duplex, AsyncWriteExt};

    fn register(registry: &Arc<SessionRegistry>) -> SessionGuard {
        registry
            .register(
                offline_uuid("Alex"),
                "Alex",
                "127.0.0.1:5000".parse().unwrap(),
                None,
            )
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_frames_are_discarded() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, mut client_end) = duplex(4096);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        // A teleport confirm and a second login start, both ignored.
        client_end.write_all(&[0x02, 0x00, 0x05]).await.unwrap();
        client_end
            .write_all(&[0x07, 0x00, 0x04, b'A', b'l', b'e', b'x', 0x00])
            .await
            .unwrap();

        let frame = read_frame(&mut client_end).await.unwrap();
        assert_eq!(frame.id, play::KEEP_ALIVE);
        assert_eq!(registry.len(), 1);
        assert!(!task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_removes_session() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, client_end) = duplex(4096);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        drop(client_end);
        let result = task.await.unwrap();
        assert!(matches!(result, Err(ref e) if e.is_disconnect()));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_ends_session() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, mut client_end) = duplex(4096);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        client_end.write_all(&[0x00]).await.unwrap();
        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::Codec(CodecError::EmptyFrame))
        ));
        assert!(registry.is_empty());

        // The write half was shut down with the session.
        assert!(matches!(
            read_frame(&mut client_end).await,
            Err(CodecError::ConnectionClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eof_ends_session_while_peer_stopped_reading() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, mut client_end) = duplex(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_millis(100),
            shutdown_rx,
        ));

        // Never read, so the keep-alive writes back up.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!task.is_finished());

        client_end.shutdown().await.unwrap();
        let result = timeout(Duration::from_secs(3), task)
            .await
            .expect("session hung on a stalled keep-alive")
            .unwrap();
        assert!(matches!(result, Err(ref e) if e.is_disconnect()));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_session_while_peer_stopped_reading() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, _client_end) = duplex(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_millis(100),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!task.is_finished());

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(3), task)
            .await
            .expect("session hung on a stalled keep-alive")
            .unwrap()
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_session() {
        let registry = Arc::new(SessionRegistry::new());
        let (server_end, _client_end) = duplex(4096);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            server_end,
            register(&registry),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
        assert!(registry.is_empty());
    }
}
