use super::{Autopilot, AutopilotCommand, AutopilotEvent, CommandPayload, FRAME_HEAD, FrameError, encode_frame};
use crate::envelope::outbound::event_publication;
use crate::message_link::{MessageLink, Topic};
use crate::{event, info, warn};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Frame codec on top of a byte stream to the autopilot.
///
/// Outbound frames are written under a lock so concurrent senders never
/// interleave. The inbound side runs in [`AutopilotLink::listen`] and only
/// touches the arm request flag and the server link.
pub struct AutopilotLink<W> {
    writer: Mutex<W>,
    arm_requested: AtomicBool,
    server: Arc<dyn MessageLink>,
}

impl<W> AutopilotLink<W>
where W: AsyncWrite + Unpin + Send
{
    /// Upper bound for an inbound event blob.
    const MAX_EVENT_SIZE: u32 = 4096;

    pub fn new(writer: W, server: Arc<dyn MessageLink>) -> Self {
        Self { writer: Mutex::new(writer), arm_requested: AtomicBool::new(false), server }
    }

    /// Consumes inbound frames until end of stream or cancellation.
    ///
    /// A malformed frame is logged and skipped: the reader resynchronizes on
    /// the next frame head. Only a broken stream ends the loop with an error.
    pub async fn listen<R>(&self, reader: R, cancel: CancellationToken) -> Result<(), FrameError>
    where R: AsyncRead + Unpin {
        let mut reader = BufReader::new(reader);
        loop {
            let frame = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                frame = self.read_frame(&mut reader) => frame,
            };
            match frame {
                Ok(()) => {}
                Err(FrameError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    info!("Autopilot stream closed");
                    return Ok(());
                }
                Err(FrameError::Io(e)) => return Err(FrameError::Io(e)),
                Err(e) => warn!("Dropping autopilot frame: {e}"),
            }
        }
    }

    async fn read_frame<R>(&self, reader: &mut R) -> Result<(), FrameError>
    where R: AsyncRead + Unpin {
        let tag = Self::read_command_byte(reader).await?;
        match AutopilotCommand::from_tag(tag) {
            Some(AutopilotCommand::ArmRequest) => {
                event!("Autopilot requested to arm");
                self.arm_requested.store(true, Ordering::Release);
                Ok(())
            }
            Some(AutopilotCommand::AutopilotEvent) => {
                let size = reader.read_u32_le().await?;
                if size > Self::MAX_EVENT_SIZE {
                    return Err(FrameError::Oversized(size));
                }
                let mut blob = vec![0u8; size as usize];
                reader.read_exact(&mut blob).await?;
                match AutopilotEvent::decode(&blob) {
                    Ok(decoded) => self.relay_event(&decoded).await,
                    Err(FrameError::UnknownEvent(kind)) => event!("Ignoring unknown event kind {kind}"),
                    Err(e) => return Err(e),
                }
                Ok(())
            }
            Some(other) => {
                warn!("Unexpected inbound command {other}");
                Ok(())
            }
            None => {
                warn!("Unknown inbound command byte {tag:#04x}");
                Ok(())
            }
        }
    }

    /// Skips bytes until a full frame head was seen and returns the byte after it.
    async fn read_command_byte<R>(reader: &mut R) -> Result<u8, FrameError>
    where R: AsyncRead + Unpin {
        let mut head_run = 0usize;
        loop {
            let byte = reader.read_u8().await?;
            if byte == FRAME_HEAD[0] {
                head_run += 1;
            } else if head_run >= FRAME_HEAD.len() {
                return Ok(byte);
            } else {
                head_run = 0;
            }
        }
    }

    async fn relay_event(&self, decoded: &AutopilotEvent) {
        event!("Autopilot event {}: {}", decoded.kind(), decoded.text());
        let payload = event_publication(&decoded.kind().to_string(), decoded.text());
        if let Err(e) = self.server.publish(Topic::Events, &payload).await {
            warn!("Failed to publish autopilot event: {e}");
        }
    }
}

impl AutopilotLink<OwnedWriteHalf> {
    /// Connects to the autopilot over TCP, returning the link and the read half for `listen`.
    pub async fn connect(addr: &str, server: Arc<dyn MessageLink>) -> Result<(Self, OwnedReadHalf), FrameError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        info!("Connected to autopilot at {addr}");
        Ok((Self::new(writer, server), reader))
    }
}

#[async_trait]
impl<W> Autopilot for AutopilotLink<W>
where W: AsyncWrite + Unpin + Send
{
    fn poll_arm_request(&self) -> bool { self.arm_requested.swap(false, Ordering::AcqRel) }

    async fn send_command(&self, command: AutopilotCommand, payload: CommandPayload) -> Result<(), FrameError> {
        let frame = encode_frame(command, &payload);
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}
