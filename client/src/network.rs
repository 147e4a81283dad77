use log::{debug, info};
use shared::packets::{
    Handshake, Intent, LoginDisconnect, LoginStart, LoginSuccess, PingRequest, PingResponse,
    StatusRequest, StatusResponse,
};
use shared::status::StatusDocument;
use shared::{ids, read_frame, write_frame, CodecError, DecodePacket, Frame, Packet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;
use uuid::Uuid;

/// How a login attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The server accepted the login; play frames follow.
    Success { uuid: Uuid, username: String },
    /// The server kicked the client with a reason.
    Disconnected { reason: String },
}

/// Frames received during an observation window.
#[derive(Debug, Default)]
pub struct Recording {
    pub frames: Vec<Frame>,
    /// The server closed the stream before the window ended.
    pub closed: bool,
}

impl Recording {
    /// Type codes in arrival order.
    pub fn ids(&self) -> Vec<i32> {
        self.frames.iter().map(|frame| frame.id).collect()
    }

    pub fn count(&self, id: i32) -> usize {
        self.frames.iter().filter(|frame| frame.id == id).count()
    }

    pub fn keep_alives(&self) -> usize {
        self.count(ids::play::KEEP_ALIVE)
    }
}

/// Protocol probe speaking just enough of the protocol to query status and
/// log in.
pub struct ProbeClient<S> {
    stream: BufReader<S>,
}

impl ProbeClient<TcpStream> {
    pub async fn connect(addr: SocketAddr) -> Result<Self, CodecError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S> ProbeClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Writes a PROXY v1 line as a load balancer would.
    pub async fn send_proxy_header(
        &mut self,
        source: SocketAddr,
        destination: SocketAddr,
    ) -> Result<(), CodecError> {
        let protocol = if source.is_ipv4() { "TCP4" } else { "TCP6" };
        let line = format!(
            "PROXY {} {} {} {} {}\r\n",
            protocol,
            source.ip(),
            destination.ip(),
            source.port(),
            destination.port()
        );
        self.send_raw(line.as_bytes()).await
    }

    pub async fn handshake(
        &mut self,
        protocol_version: i32,
        server_addr: SocketAddr,
        intent: Intent,
    ) -> Result<(), CodecError> {
        let handshake = Handshake {
            protocol_version,
            server_address: server_addr.ip().to_string(),
            server_port: server_addr.port(),
            intent,
        };
        self.send(&handshake).await
    }

    /// Requests the status document. Must follow a status handshake.
    pub async fn status(&mut self) -> Result<StatusDocument, CodecError> {
        self.send(&StatusRequest).await?;
        let response = StatusResponse::from_frame(&self.next_frame().await?)?;
        Ok(response.document)
    }

    /// Sends a ping and returns the echoed token with the round-trip time.
    pub async fn ping(&mut self, token: i64) -> Result<(i64, Duration), CodecError> {
        let sent_at = Instant::now();
        self.send(&PingRequest { payload: token }).await?;
        let pong = PingResponse::from_frame(&self.next_frame().await?)?;
        Ok((pong.payload, sent_at.elapsed()))
    }

    /// Sends login start and waits for success or a kick.
    pub async fn login(&mut self, username: &str) -> Result<LoginOutcome, CodecError> {
        self.send(&LoginStart {
            username: username.to_string(),
            signature: None,
        })
        .await?;

        let frame = self.next_frame().await?;
        match frame.id {
            ids::login::LOGIN_SUCCESS => {
                let success = LoginSuccess::from_frame(&frame)?;
                info!("Logged in as {}({})", success.username, success.uuid);
                Ok(LoginOutcome::Success {
                    uuid: success.uuid,
                    username: success.username,
                })
            }
            ids::login::DISCONNECT => {
                let kick = LoginDisconnect::from_frame(&frame)?;
                info!("Kicked during login: {}", kick.reason.text);
                Ok(LoginOutcome::Disconnected {
                    reason: kick.reason.text,
                })
            }
            found => Err(CodecError::UnexpectedPacket {
                expected: ids::login::LOGIN_SUCCESS,
                found,
            }),
        }
    }

    pub async fn send<P: Packet>(&mut self, packet: &P) -> Result<(), CodecError> {
        write_frame(&mut self.stream, &packet.to_frame()?).await
    }

    /// Writes bytes as they are, bypassing the codec.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn next_frame(&mut self) -> Result<Frame, CodecError> {
        read_frame(&mut self.stream).await
    }

    /// Collects every frame that arrives within `window`, stopping early if
    /// the server closes the stream.
    pub async fn record(&mut self, window: Duration) -> Result<Recording, CodecError> {
        let deadline = Instant::now() + window;
        let mut recording = Recording::default();

        loop {
            match tokio::time::timeout_at(deadline, self.next_frame()).await {
                Err(_) => break,
                Ok(Ok(frame)) => recording.frames.push(frame),
                Ok(Err(CodecError::ConnectionClosed)) => {
                    recording.closed = true;
                    break;
                }
                Ok(Err(e)) => return Err(e),
            }
        }
        Ok(recording)
    }

    /// Closes the write side so the server sees end of stream.
    pub async fn close(&mut self) -> Result<(), CodecError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::ChatMessage;
    use shared::packets::KeepAlive;
    use shared::status::{PlayerCounts, VersionInfo};

    fn bytes<P: Packet>(packet: &P) -> Vec<u8> {
        packet.to_frame().unwrap().encode().unwrap()
    }

    fn server_addr() -> SocketAddr {
        "127.0.0.1:25565".parse().unwrap()
    }

    #[tokio::test]
    async fn test_status_and_ping() {
        let document = StatusDocument {
            version: VersionInfo {
                name: "1.19".to_string(),
                protocol: 759,
            },
            players: PlayerCounts {
                max: 0,
                online: 2,
                sample: Vec::new(),
            },
            description: ChatMessage::text("motd"),
            favicon: None,
        };
        let handshake = Handshake {
            protocol_version: 759,
            server_address: "127.0.0.1".to_string(),
            server_port: 25565,
            intent: Intent::Status,
        };

        let mock = tokio_test::io::Builder::new()
            .write(&bytes(&handshake))
            .write(&bytes(&StatusRequest))
            .read(&bytes(&StatusResponse {
                document: document.clone(),
            }))
            .write(&bytes(&PingRequest { payload: 7 }))
            .read(&bytes(&PingResponse { payload: 7 }))
            .build();

        let mut client = ProbeClient::new(mock);
        client
            .handshake(759, server_addr(), Intent::Status)
            .await
            .unwrap();
        assert_eq!(client.status().await.unwrap(), document);
        assert_eq!(client.ping(7).await.unwrap().0, 7);
    }

    #[tokio::test]
    async fn test_login_kick_is_reported() {
        let start = LoginStart {
            username: "Steve".to_string(),
            signature: None,
        };
        let kick = LoginDisconnect {
            reason: ChatMessage::text("Unsupported version"),
        };
        let mock = tokio_test::io::Builder::new()
            .write(&bytes(&start))
            .read(&bytes(&kick))
            .build();

        let mut client = ProbeClient::new(mock);
        assert_eq!(
            client.login("Steve").await.unwrap(),
            LoginOutcome::Disconnected {
                reason: "Unsupported version".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_login_rejects_play_frame() {
        let start = LoginStart {
            username: "Steve".to_string(),
            signature: None,
        };
        let mock = tokio_test::io::Builder::new()
            .write(&bytes(&start))
            .read(&bytes(&KeepAlive { id: 1 }))
            .build();

        let mut client = ProbeClient::new(mock);
        assert!(matches!(
            client.login("Steve").await,
            Err(CodecError::UnexpectedPacket { .. })
        ));
    }

    #[tokio::test]
    async fn test_proxy_header_format() {
        let mock = tokio_test::io::Builder::new()
            .write(b"PROXY TCP4 192.0.2.1 127.0.0.1 5000 25565\r\n")
            .build();

        let mut client = ProbeClient::new(mock);
        client
            .send_proxy_header("192.0.2.1:5000".parse().unwrap(), server_addr())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_record_stops_at_end_of_stream() {
        let mut input = bytes(&KeepAlive { id: 1 });
        input.extend_from_slice(&bytes(&KeepAlive { id: 2 }));
        let mock = tokio_test::io::Builder::new().read(&input).build();

        let mut client = ProbeClient::new(mock);
        let recording = client.record(Duration::from_secs(5)).await.unwrap();
        assert!(recording.closed);
        assert_eq!(recording.keep_alives(), 2);
        assert_eq!(recording.ids(), vec![ids::play::KEEP_ALIVE; 2]);
    }
}
