//! Tio client used to read back container state
//!
//! Only the read side of the protocol is implemented: open a container by
//! name and ask for its record count.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::common::config::DEFAULT_PORT;
use crate::common::{Error, Result};

use super::codec::{self, Answer};

const URI_SCHEME: &str = "tio://";

/// Host and port taken from a `tio://host:port` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TioAddress {
    pub host: String,
    pub port: u16,
}

impl TioAddress {
    /// Parse `tio://host[:port]`; the port defaults to 2605
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix(URI_SCHEME).ok_or_else(|| {
            Error::Configuration(format!("'{}' is not a tio:// URI", uri))
        })?;
        let rest = rest.trim_end_matches('/');

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    Error::Configuration(format!("invalid port '{}' in '{}'", port, uri))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Error::Configuration(format!("missing host in '{}'", uri)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// A container opened on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Name the container was opened with
    pub name: String,
    /// Session-scoped handle issued by the server
    pub handle: u32,
    /// Container type reported by the server, e.g. `volatile_list`
    pub container_type: String,
}

/// Read access to container state
///
/// Implemented by [`TioConnection`]; scenario tests substitute an in-memory
/// store.
#[async_trait]
pub trait ContainerStore: Send {
    /// Resolve a container by its full path
    async fn open(&mut self, path: &str) -> Result<ContainerHandle>;

    /// Current record count of an opened container
    async fn length(&mut self, container: &ContainerHandle) -> Result<u64>;
}

/// Opens [`ContainerStore`] sessions
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Box<dyn ContainerStore>>;
}

/// Connects real [`TioConnection`]s
#[derive(Debug, Default, Clone)]
pub struct TioConnector {
    pub io_timeout: Option<Duration>,
}

#[async_trait]
impl Connector for TioConnector {
    async fn connect(&self, uri: &str) -> Result<Box<dyn ContainerStore>> {
        let connection = TioConnection::connect_with_timeout(uri, self.io_timeout).await?;
        Ok(Box::new(connection))
    }
}

/// A live session with a tio server
pub struct TioConnection {
    uri: String,
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    io_timeout: Option<Duration>,
}

impl TioConnection {
    /// Connect with no bound on protocol exchanges
    pub async fn connect(uri: &str) -> Result<Self> {
        Self::connect_with_timeout(uri, None).await
    }

    /// Connect, bounding the connect and each later exchange by `io_timeout`
    pub async fn connect_with_timeout(uri: &str, io_timeout: Option<Duration>) -> Result<Self> {
        let address = TioAddress::parse(uri)?;
        tracing::debug!(host = %address.host, port = address.port, "Connecting to tio");

        let connect = TcpStream::connect((address.host.as_str(), address.port));
        let stream = match io_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| Error::timeout("connect", limit.as_secs()))?,
            None => connect.await,
        }
        .map_err(|source| Error::Connection {
            uri: uri.to_string(),
            source,
        })?;

        let (read_half, write_half) = stream.into_split();

        tracing::info!("Connected to {}", uri);

        Ok(Self {
            uri: uri.to_string(),
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            io_timeout,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Send one command and wait for its answer
    async fn exchange(&mut self, tokens: &[&str]) -> Result<Answer> {
        let io_timeout = self.io_timeout;
        let exchange = async {
            codec::write_command(&mut self.writer, tokens).await?;
            codec::read_answer(&mut self.reader).await
        };

        match io_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| Error::timeout(&format!("'{}'", tokens[0]), limit.as_secs()))?,
            None => exchange.await,
        }
    }

    /// Round trip a ping
    pub async fn ping(&mut self) -> Result<()> {
        match self.exchange(&["ping"]).await? {
            Answer::Ok(_) => Ok(()),
            Answer::Error(desc) => Err(Error::Protocol(format!("ping failed: {}", desc))),
        }
    }

    /// Open an existing container
    pub async fn open(&mut self, path: &str) -> Result<ContainerHandle> {
        match self.exchange(&["open", path]).await? {
            Answer::Ok(fields) => {
                let (handle, container_type) = match fields.as_slice() {
                    [tag, handle, rest @ ..] if tag == "handle" => {
                        let handle: u32 = handle.parse().map_err(|_| {
                            Error::Protocol(format!("invalid handle '{}'", handle))
                        })?;
                        (handle, rest.first().cloned().unwrap_or_default())
                    }
                    _ => {
                        return Err(Error::Protocol(format!(
                            "unexpected open answer: {:?}",
                            fields
                        )))
                    }
                };

                tracing::debug!(container = path, handle, "Opened container");

                Ok(ContainerHandle {
                    name: path.to_string(),
                    handle,
                    container_type,
                })
            }
            Answer::Error(desc) => Err(Error::NotFound(path.to_string(), desc)),
        }
    }

    /// Current record count of `container`
    pub async fn length(&mut self, container: &ContainerHandle) -> Result<u64> {
        let handle = container.handle.to_string();
        match self.exchange(&["get_count", &handle]).await? {
            Answer::Ok(fields) => match fields.as_slice() {
                [tag, count] if tag == "count" => count.parse().map_err(|_| {
                    Error::Protocol(format!("invalid count '{}' for {}", count, container.name))
                }),
                _ => Err(Error::Protocol(format!(
                    "unexpected get_count answer: {:?}",
                    fields
                ))),
            },
            Answer::Error(desc) => Err(Error::Protocol(format!(
                "get_count on '{}' failed: {}",
                container.name, desc
            ))),
        }
    }

    /// Release a container handle
    pub async fn close(&mut self, container: ContainerHandle) -> Result<()> {
        let handle = container.handle.to_string();
        match self.exchange(&["close", &handle]).await? {
            Answer::Ok(_) => Ok(()),
            Answer::Error(desc) => Err(Error::Protocol(format!(
                "close on '{}' failed: {}",
                container.name, desc
            ))),
        }
    }
}

#[async_trait]
impl ContainerStore for TioConnection {
    async fn open(&mut self, path: &str) -> Result<ContainerHandle> {
        TioConnection::open(self, path).await
    }

    async fn length(&mut self, container: &ContainerHandle) -> Result<u64> {
        TioConnection::length(self, container).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_uri() {
        assert_eq!(
            TioAddress::parse("tio://localhost:2605").unwrap(),
            TioAddress {
                host: "localhost".to_string(),
                port: 2605
            }
        );
        assert_eq!(TioAddress::parse("tio://10.1.2.3").unwrap().port, 2605);
        assert_eq!(TioAddress::parse("tio://box:7000/").unwrap().port, 7000);
    }

    #[test]
    fn test_parse_bad_uri() {
        for uri in ["http://localhost:2605", "tio://:2605", "tio://host:port"] {
            assert!(
                matches!(TioAddress::parse(uri), Err(Error::Configuration(_))),
                "{} should be rejected",
                uri
            );
        }
    }

    /// Serve canned answers, one per received line
    async fn scripted_server(answers: Vec<&'static str>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let uri = format!("tio://127.0.0.1:{}", listener.local_addr().unwrap().port());

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = tokio::io::BufReader::new(read_half).lines();
            let mut received = Vec::new();

            for answer in answers {
                let Some(line) = lines.next_line().await.unwrap() else {
                    break;
                };
                received.push(line);
                write_half.write_all(answer.as_bytes()).await.unwrap();
            }
            received
        });

        (uri, task)
    }

    #[tokio::test]
    async fn test_open_and_length() {
        let (uri, server) = scripted_server(vec![
            "answer ok handle 7 volatile_map\r\n",
            "answer ok count 1000\r\n",
        ])
        .await;

        let mut cn = TioConnection::connect(&uri).await.unwrap();
        let container = cn.open("somecontainer").await.unwrap();
        assert_eq!(container.handle, 7);
        assert_eq!(container.container_type, "volatile_map");
        assert_eq!(cn.length(&container).await.unwrap(), 1000);

        let received = server.await.unwrap();
        assert_eq!(received, vec!["open somecontainer", "get_count 7"]);
    }

    #[tokio::test]
    async fn test_open_missing_container() {
        let (uri, _server) =
            scripted_server(vec!["answer error no such container\r\n"]).await;

        let mut cn = TioConnection::connect(&uri).await.unwrap();
        let err = cn.open("intelimarket/bvmf/NOPE/book_buy").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref name, _) if name == "intelimarket/bvmf/NOPE/book_buy"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TioConnection::connect(&format!("tio://127.0.0.1:{}", port))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let uri = format!("tio://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let _silent = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut cn = TioConnection::connect_with_timeout(&uri, Some(Duration::from_millis(200)))
            .await
            .unwrap();
        let err = cn.ping().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
