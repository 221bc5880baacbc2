//! # Video Stream
//!
//! Receives the drone's H.264 downlink on UDP port 11111 and turns it
//! into RGB frames.
//!
//! The stream arrives as datagram chunks of up to 1460 bytes; a
//! shorter datagram terminates the current access unit. Reassembled
//! units are fed to an openh264 decoder on a dedicated thread (the
//! decoder holds the blocking socket read, no async involved) and each
//! decoded picture is published latest-wins through a watch slot:
//! frames the pipeline does not consume in time are overwritten, never
//! queued.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use openh264::decoder::Decoder;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{PilotError, Result};

/// Datagrams of exactly this size are continuation chunks; anything
/// shorter ends the access unit.
const MAX_CHUNK_SIZE: usize = 1460;

/// One decoded RGB frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Tightly packed RGB8 pixels
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic frame counter
    pub seq: u64,
}

/// The receiving/decoding half of the video downlink.
#[derive(Debug)]
pub struct VideoStream {
    stop: Arc<AtomicBool>,
}

impl VideoStream {
    /// Bind the video port and start the receive/decode thread.
    /// Returns the stream handle and the latest-frame receiver.
    pub fn start(port: u16) -> Result<(Self, watch::Receiver<Option<VideoFrame>>)> {
        let local_address = format!("0.0.0.0:{port}");
        let sock = UdpSocket::bind(&local_address)
            .map_err(|e| PilotError::Transport(format!("bind {local_address}: {e}")))?;
        // bounded read so the thread notices the stop flag
        sock.set_read_timeout(Some(Duration::from_millis(250)))?;
        info!("Video listener on {local_address}");

        let (tx, rx) = watch::channel(None);
        let stop = Arc::new(AtomicBool::new(false));

        let stop_for_thread = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("video-decoder".into())
            .spawn(move || receive_loop(&sock, &tx, &stop_for_thread))
            .map_err(|e| PilotError::Frame(format!("spawn video thread: {e}")))?;

        Ok((Self { stop }, rx))
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(
    sock: &UdpSocket,
    tx: &watch::Sender<Option<VideoFrame>>,
    stop: &AtomicBool,
) {
    let mut decoder = match Decoder::new() {
        Ok(decoder) => decoder,
        Err(err) => {
            warn!("H.264 decoder unavailable, video disabled: {err}");
            return;
        }
    };

    let mut unit = BytesMut::with_capacity(64 * 1024);
    let mut chunk = [0u8; MAX_CHUNK_SIZE];
    let mut seq: u64 = 0;

    while !stop.load(Ordering::Acquire) {
        let n = match sock.recv(&mut chunk) {
            Ok(n) => n,
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => {
                warn!("Video receive failed: {err}");
                return;
            }
        };

        if n == 0 {
            continue;
        }
        unit.extend_from_slice(&chunk[..n]);

        // short datagram closes the access unit
        if n < MAX_CHUNK_SIZE {
            let packet = unit.split().freeze();
            match decoder.decode(&packet) {
                Ok(Some(yuv)) => {
                    let (width, height) = yuv.dimension_rgb();
                    let mut rgb = vec![0u8; width * height * 3];
                    yuv.write_rgb8(&mut rgb);

                    seq += 1;
                    // receiver gone means shutdown is underway
                    if tx
                        .send(Some(VideoFrame {
                            data: rgb,
                            width: width as u32,
                            height: height as u32,
                            seq,
                        }))
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(None) => {
                    // decoder needs more data (SPS/PPS not seen yet)
                    debug!("Incomplete picture, dropped");
                }
                Err(err) => {
                    debug!("H.264 decode error, dropped unit: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_equality_by_content() {
        let a = VideoFrame {
            data: vec![1, 2, 3],
            width: 1,
            height: 1,
            seq: 1,
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.seq = 2;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_stream_binds_and_stops() {
        let (stream, rx) = VideoStream::start(0).expect("bind ephemeral port");
        assert!(rx.borrow().is_none());
        stream.stop();
    }

    #[test]
    fn test_chunk_size_matches_tello_mtu() {
        assert_eq!(MAX_CHUNK_SIZE, 1460);
    }
}
