//! Worker wire framing.
//!
//! Workers send bare big-endian `u32` values with no other framing: first
//! their listening port, then their client count, repeatedly.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FrameError;

/// Read exactly one big-endian `u32`.
///
/// End of stream before the first byte is a clean close; end of stream
/// inside a frame is a short read.
pub async fn read_u32<R>(reader: &mut R) -> Result<u32, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 {
                FrameError::Closed
            } else {
                FrameError::Short { got: filled }
            });
        }
        filled += n;
    }
    Ok(u32::from_be_bytes(buf))
}

/// `read_u32` bounded by a fresh `deadline`.
pub async fn read_u32_within<R>(reader: &mut R, deadline: Duration) -> Result<u32, FrameError>
where
    R: AsyncRead + Unpin,
{
    tokio::time::timeout(deadline, read_u32(reader))
        .await
        .map_err(|_| FrameError::TimedOut(deadline))?
}

/// Host portion of a peer address, with IPv4-mapped IPv6 unwrapped so it
/// matches plain IPv4 list entries.
pub fn peer_host(peer: SocketAddr) -> IpAddr {
    peer.ip().to_canonical()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let bytes: &[u8] = &[0x00, 0x00, 0x23, 0x28, 0x00, 0x00, 0x00, 0x07];
        let mut reader = bytes;

        assert_eq!(read_u32(&mut reader).await.unwrap(), 9000);
        assert_eq!(read_u32(&mut reader).await.unwrap(), 7);
        assert!(matches!(read_u32(&mut reader).await, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn partial_frame_is_short() {
        let mut reader: &[u8] = &[0x00, 0x01];
        assert!(matches!(
            read_u32(&mut reader).await,
            Err(FrameError::Short { got: 2 })
        ));
    }

    #[tokio::test]
    async fn split_writes_reassemble() {
        let (mut client, mut server) = tokio::io::duplex(16);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(&[0xde, 0xad]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.write_all(&[0xbe, 0xef]).await.unwrap();
        });

        assert_eq!(read_u32(&mut server).await.unwrap(), 0xdead_beef);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn deadline_expires() {
        let (_client, mut server) = tokio::io::duplex(16);
        let result = read_u32_within(&mut server, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(FrameError::TimedOut(_))));
    }

    #[test]
    fn peer_host_strips_port_and_mapping() {
        let v4: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        assert_eq!(peer_host(v4), "10.1.2.3".parse::<IpAddr>().unwrap());

        let mapped: SocketAddr = "[::ffff:10.1.2.3]:5555".parse().unwrap();
        assert_eq!(peer_host(mapped), "10.1.2.3".parse::<IpAddr>().unwrap());
    }
}
