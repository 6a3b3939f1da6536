//! Tio text protocol codec
//!
//! Commands are space separated tokens terminated by CRLF. The server
//! replies with a single answer line, possibly preceded by event lines for
//! subscriptions on the same session:
//! ```text
//! open intelimarket/bvmf/PETR4/book_buy\r\n
//! answer ok handle 1 volatile_list\r\n
//! get_count 1\r\n
//! answer ok count 2000\r\n
//! ```

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

/// Longest answer line we accept before assuming the stream is garbage
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A server answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// `answer ok <fields...>`
    Ok(Vec<String>),
    /// `answer error <description>`
    Error(String),
}

/// Write one command line
pub async fn write_command<W: AsyncWrite + Unpin>(writer: &mut W, tokens: &[&str]) -> Result<()> {
    if let Some(bad) = tokens
        .iter()
        .find(|t| t.is_empty() || t.contains(char::is_whitespace))
    {
        return Err(Error::Protocol(format!(
            "cannot send token '{}': tokens must be non-empty and contain no whitespace",
            bad
        )));
    }

    let line = format!("{}\r\n", tokens.join(" "));
    tracing::debug!("tio >>> {}", line.trim_end());

    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read lines until an answer arrives
///
/// Event lines are skipped. Anything else is a protocol error.
pub async fn read_answer<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Answer> {
    loop {
        let mut line = String::new();
        let bytes_read = (&mut *reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_line(&mut line)
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Error::ConnectionClosed
                } else {
                    Error::Io(e)
                }
            })?;

        if bytes_read == 0 {
            return Err(Error::ConnectionClosed);
        }
        if bytes_read > MAX_LINE_BYTES {
            return Err(Error::Protocol(format!(
                "answer line longer than {} bytes",
                MAX_LINE_BYTES
            )));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        tracing::debug!("tio <<< {}", line);

        if line.is_empty() || line.starts_with("event ") {
            continue;
        }

        let Some(rest) = line.strip_prefix("answer ") else {
            return Err(Error::Protocol(format!("unexpected line: {}", line)));
        };

        if let Some(fields) = rest.strip_prefix("ok") {
            return Ok(Answer::Ok(
                fields.split_whitespace().map(str::to_string).collect(),
            ));
        }
        if let Some(desc) = rest.strip_prefix("error") {
            return Ok(Answer::Error(desc.trim().to_string()));
        }

        return Err(Error::Protocol(format!("unknown answer status: {}", line)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_write_command() {
        let mut output = Vec::new();
        write_command(&mut output, &["open", "intelimarket/bvmf/XYZ/trades"])
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "open intelimarket/bvmf/XYZ/trades\r\n"
        );
    }

    #[tokio::test]
    async fn test_write_command_rejects_spaces() {
        let mut output = Vec::new();
        let err = write_command(&mut output, &["open", "a b"]).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_read_ok_answer() {
        let data = b"answer ok handle 4 volatile_map\r\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));
        assert_eq!(
            read_answer(&mut reader).await.unwrap(),
            Answer::Ok(vec![
                "handle".to_string(),
                "4".to_string(),
                "volatile_map".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_read_error_answer_after_event() {
        let data = b"event 1 push_back string a\r\nanswer error no such container\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));
        assert_eq!(
            read_answer(&mut reader).await.unwrap(),
            Answer::Error("no such container".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_answer_eof() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        assert!(matches!(
            read_answer(&mut reader).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_answer_caps_line_length() {
        let mut data = vec![b'a'; MAX_LINE_BYTES + 100];
        data.extend_from_slice(b"\r\nanswer ok\r\n");
        let total = data.len();
        let mut reader = BufReader::new(Cursor::new(data));

        let err = read_answer(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        // Reading stopped at the cap; the rest of the line is still unread
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest.len(), total - (MAX_LINE_BYTES + 1));
    }

    #[tokio::test]
    async fn test_read_garbage() {
        let mut reader = BufReader::new(Cursor::new(b"HTTP/1.1 400\r\n".to_vec()));
        assert!(matches!(
            read_answer(&mut reader).await,
            Err(Error::Protocol(_))
        ));
    }
}
