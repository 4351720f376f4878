use crate::error::Result;
use crate::traits::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// reqwest-backed transport. One client (and its connection pool) is shared by
/// every worker of every phase.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` bounds each whole request, body included.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, url: &str) -> Result<()> {
        // send() resolves once the response headers are in; the body is dropped unread
        self.client.get(url).send().await?;
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;
        let mut received: u64 = 0;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => received += chunk.len() as u64,
                Ok(None) => break,
                Err(e) => {
                    // 已读取的部分仍然计入
                    debug!("download body interrupted after {} bytes: {}", received, e);
                    break;
                }
            }
        }

        Ok(received)
    }

    async fn upload(&self, url: &str, payload: Bytes) -> Result<u16> {
        let length = payload.len();
        let mut response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        while response.chunk().await?.is_some() {}

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Minimal HTTP/1.1 responder: reads one request (headers plus a
    /// Content-Length body), answers with `status` and `body_len` bytes.
    async fn spawn_server(status: u16, body_len: usize) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, status, body_len));
            }
        });

        Ok(format!("http://{}", addr))
    }

    async fn handle(mut stream: TcpStream, status: u16, body_len: usize) -> std::io::Result<()> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body_read = buf.len() - header_end;
        while body_read < content_length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body_read += n;
        }

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status, body_len
        );
        stream.write_all(response.as_bytes()).await?;
        stream.write_all(&vec![0u8; body_len]).await?;
        stream.shutdown().await
    }

    #[tokio::test]
    async fn test_download_counts_body_bytes() -> Result<()> {
        let base = spawn_server(200, 150_000).await?;
        let transport = HttpTransport::new(Duration::from_secs(5))?;

        let bytes = transport.download(&format!("{}/down", base)).await?;
        assert_eq!(bytes, 150_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_reports_status() -> Result<()> {
        let base = spawn_server(503, 0).await?;
        let transport = HttpTransport::new(Duration::from_secs(5))?;

        let status = transport
            .upload(&format!("{}/up", base), Bytes::from(vec![0u8; 64 * 1024]))
            .await?;
        assert_eq!(status, 503);
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_accepts_any_status() -> Result<()> {
        let base = spawn_server(404, 10).await?;
        let transport = HttpTransport::new(Duration::from_secs(5))?;

        transport.probe(&format!("{}/missing", base)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() -> Result<()> {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
        let transport = HttpTransport::new(Duration::from_secs(2))?;

        assert!(transport.download(&format!("http://{}/", addr)).await.is_err());
        Ok(())
    }
}
