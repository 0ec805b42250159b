//! TCP connection to the relay server speaking the framed text protocol

use log::debug;
use shared::{encode_frame, FrameDecoder, Message};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

const READ_BUFFER_SIZE: usize = 4096;

pub struct RelayClient {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl RelayClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", stream.peer_addr()?);

        Ok(Self {
            stream,
            decoder: FrameDecoder::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Frames and sends a payload
    pub async fn send_text(&mut self, text: &str) -> io::Result<()> {
        let frame =
            encode_frame(text).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.stream.write_all(&frame).await
    }

    pub async fn send(&mut self, message: &Message) -> io::Result<()> {
        self.send_text(&message.to_string()).await
    }

    /// Writes bytes as-is, bypassing framing
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Waits for the next payload
    ///
    /// A clean close by the server is reported as `UnexpectedEof`. Safe to
    /// cancel: partially received frames stay buffered.
    pub async fn recv_text(&mut self) -> io::Result<String> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            let frame = self
                .decoder
                .next_frame()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if let Some(text) = frame {
                return Ok(text);
            }

            let n = self.stream.read(&mut buffer).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                ));
            }
            self.decoder.extend(&buffer[..n]);
        }
    }

    /// Waits for the next payload and parses it
    ///
    /// Relayed text that does not parse as a known command is returned as
    /// [`Message::Other`].
    pub async fn recv(&mut self) -> io::Result<Message> {
        let text = self.recv_text().await?;
        Ok(Message::parse(&text).unwrap_or(Message::Other(text)))
    }

    /// Like [`recv_text`](Self::recv_text) but gives up after `timeout`,
    /// returning `Ok(None)`
    pub async fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        match tokio::time::timeout(timeout, self.recv_text()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    pub async fn close(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
