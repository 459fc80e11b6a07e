//! Line codec for the control channel.
//!
//! Records are newline-delimited: one UTF-8 JSON value per line, no other
//! framing. No JSON value may contain an unescaped newline; compact
//! serde_json output never does.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{ControlError, ControlResult, ProtocolErrorKind};

/// Maximum record length (64 KiB by default, configurable).
pub const DEFAULT_MAX_LINE_BYTES: usize = 65_536;

/// Read one newline-terminated record, bounded by `max` bytes.
///
/// Returns the record without its trailing newline. End-of-stream before
/// any byte is read maps to `ConnectionClosed`; a record growing past `max`
/// maps to `LineTooLong`.
pub async fn read_line_bounded<R>(reader: &mut R, max: usize) -> ControlResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Err(ControlError::Protocol {
                    kind: ProtocolErrorKind::ConnectionClosed,
                });
            }
            // Stream ended mid-record; hand back what we have.
            break;
        }

        let (take, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        if line.len() + take > max + 1 {
            reader.consume(take);
            return Err(ControlError::Protocol {
                kind: ProtocolErrorKind::LineTooLong {
                    size: line.len() + take,
                    max,
                },
            });
        }

        line.extend_from_slice(&available[..take]);
        reader.consume(take);

        if done {
            break;
        }
    }

    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line).map_err(|e| ControlError::Protocol {
        kind: ProtocolErrorKind::MalformedRecord {
            message: format!("invalid UTF-8: {}", e),
        },
    })
}

/// Write one record followed by a newline and flush.
pub async fn write_line<W>(writer: &mut W, record: &str) -> ControlResult<()>
where
    W: AsyncWriteExt + Unpin,
{
    if record.contains('\n') {
        return Err(ControlError::Protocol {
            kind: ProtocolErrorKind::MalformedRecord {
                message: "record contains an unescaped newline".to_string(),
            },
        });
    }

    writer.write_all(record.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read a bounded record, failing with `ConnectionTimeout` past the window.
pub async fn read_line_with_timeout<R>(
    reader: &mut R,
    max: usize,
    window: Duration,
) -> ControlResult<String>
where
    R: AsyncBufRead + Unpin,
{
    timeout(window, read_line_bounded(reader, max))
        .await
        .map_err(|_| ControlError::Protocol {
            kind: ProtocolErrorKind::ConnectionTimeout,
        })?
}

/// Write a record, failing with `ConnectionTimeout` past the window.
pub async fn write_line_with_timeout<W>(
    writer: &mut W,
    record: &str,
    window: Duration,
) -> ControlResult<()>
where
    W: AsyncWriteExt + Unpin,
{
    timeout(window, write_line(writer, record))
        .await
        .map_err(|_| ControlError::Protocol {
            kind: ProtocolErrorKind::ConnectionTimeout,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let mut buffer = Vec::new();
        write_line(&mut buffer, r#"{"action":"get_stats"}"#)
            .await
            .unwrap();
        assert_eq!(buffer.last(), Some(&b'\n'));

        let mut reader = BufReader::new(Cursor::new(buffer));
        let line = read_line_bounded(&mut reader, DEFAULT_MAX_LINE_BYTES)
            .await
            .unwrap();
        assert_eq!(line, r#"{"action":"get_stats"}"#);
    }

    #[tokio::test]
    async fn eof_maps_to_connection_closed() {
        let mut reader = BufReader::new(Cursor::new(Vec::<u8>::new()));
        let result = read_line_bounded(&mut reader, DEFAULT_MAX_LINE_BYTES).await;
        assert!(matches!(
            result,
            Err(ControlError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed
            })
        ));
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let mut data = vec![b'x'; 256];
        data.push(b'\n');
        let mut reader = BufReader::new(Cursor::new(data));

        let result = read_line_bounded(&mut reader, 64).await;
        assert!(matches!(
            result,
            Err(ControlError::Protocol {
                kind: ProtocolErrorKind::LineTooLong { .. }
            })
        ));
    }

    #[tokio::test]
    async fn embedded_newline_is_refused_on_write() {
        let mut buffer = Vec::new();
        let result = write_line(&mut buffer, "broken\nrecord").await;
        assert!(matches!(
            result,
            Err(ControlError::Protocol {
                kind: ProtocolErrorKind::MalformedRecord { .. }
            })
        ));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn final_record_without_newline_is_returned() {
        let mut reader = BufReader::new(Cursor::new(b"{\"success\":true}".to_vec()));
        let line = read_line_bounded(&mut reader, DEFAULT_MAX_LINE_BYTES)
            .await
            .unwrap();
        assert_eq!(line, "{\"success\":true}");
    }
}
