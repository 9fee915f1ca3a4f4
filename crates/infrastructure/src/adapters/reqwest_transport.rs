//! Transport implementation using reqwest.
//!
//! This adapter implements the `Transport` port: one round trip per call,
//! plus server-sent event streams read chunk by chunk.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tether_application::ports::{EventStream, StreamOpening, Transport, TransportError};
use tether_domain::request::ACCEPT;
use tether_domain::{BasicRequest, EventParser, Headers, Method, Response, StreamEvent};
use tracing::{debug, trace};

const MAX_REDIRECTS: u32 = 10;
const EVENT_STREAM: &str = "text/event-stream";

/// Transport backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// Default configuration:
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    /// - User-Agent: "Tether/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("Tether/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS as usize))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    /// Creates a transport around a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    const fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn builder(&self, request: &BasicRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url);
        for header in request.headers.iter() {
            builder = builder.header(&header.name, &header.value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        let host = || {
            error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string()
        };

        if error.is_connect() {
            let message = error.to_string();
            let lower = message.to_lowercase();
            if lower.contains("dns") || lower.contains("resolve") {
                return TransportError::DnsError {
                    host: host(),
                    message,
                };
            }
            if lower.contains("refused") {
                return TransportError::ConnectionRefused {
                    host: host(),
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            return TransportError::ConnectionFailed(message);
        }

        if error.is_redirect() {
            return TransportError::TooManyRedirects { max: MAX_REDIRECTS };
        }

        if error.is_body() || error.is_decode() {
            return TransportError::Body(error.to_string());
        }

        TransportError::Other(error.to_string())
    }

    async fn into_response(response: reqwest::Response) -> Result<Response, TransportError> {
        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_vec();
        Ok(Response::new(status, headers, body))
    }
}

fn collect_headers(response: &reqwest::Response) -> Headers {
    response
        .headers()
        .iter()
        .map(|(name, value)| {
            tether_domain::request::Header::new(
                name.as_str(),
                value.to_str().unwrap_or("<binary>"),
            )
        })
        .collect()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: BasicRequest) -> Result<Response, TransportError> {
        let timeout_ms = request.timeout_ms;
        let response = self
            .builder(&request)?
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        Self::into_response(response).await
    }

    async fn stream(&self, request: BasicRequest) -> Result<StreamOpening, TransportError> {
        let timeout_ms = request.timeout_ms;
        let pending = self.builder(&request)?.header(ACCEPT, EVENT_STREAM).send();

        // The timeout bounds opening only; the stream itself may stay idle.
        let response = tokio::time::timeout(Duration::from_millis(timeout_ms), pending)
            .await
            .map_err(|_| TransportError::Timeout { timeout_ms })?
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        if !response.status().is_success() {
            return Ok(StreamOpening::Refused(Self::into_response(response).await?));
        }

        debug!(url = %request.url, "event stream opened");
        Ok(StreamOpening::Open(Box::new(SseStream::new(response))))
    }
}

/// Server-sent event stream over a reqwest response body.
struct SseStream {
    response: Option<reqwest::Response>,
    parser: EventParser,
    pending: VecDeque<StreamEvent>,
    carry: Vec<u8>,
}

impl SseStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
            parser: EventParser::new(),
            pending: VecDeque::new(),
            carry: Vec::new(),
        }
    }

    /// Appends a chunk and feeds its complete UTF-8 prefix to the parser.
    fn absorb(&mut self, chunk: &[u8]) {
        self.carry.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.carry) {
            Ok(text) => text.len(),
            Err(error) => error.valid_up_to(),
        };
        let rest = self.carry.split_off(valid);
        let text = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry = rest;
        self.pending.extend(self.parser.feed(&text));
    }
}

#[async_trait]
impl EventStream for SseStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                trace!(event = %event.event_name, "event received");
                return Some(Ok(event));
            }
            let response = self.response.as_mut()?;
            match response.chunk().await {
                Ok(Some(chunk)) => self.absorb(&chunk),
                Ok(None) => {
                    self.response = None;
                    return None;
                }
                Err(error) => {
                    self.response = None;
                    return Some(Err(TransportError::Body(error.to_string())));
                }
            }
        }
    }

    fn close(&mut self) {
        self.response = None;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.response.is_some() || !self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a local port and returns the
    /// request head it received.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buffer = [0_u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                head.extend_from_slice(&buffer[..read]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (address, handle)
    }

    fn get(url: String) -> BasicRequest {
        BasicRequest {
            method: Method::Get,
            url,
            headers: Headers::new().with("Authorization", "Bearer t1"),
            body: None,
            timeout_ms: 5_000,
        }
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(Method::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(Method::Post),
            reqwest::Method::POST
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(Method::Delete),
            reqwest::Method::DELETE
        );
    }

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let transport = ReqwestTransport::new().unwrap();
        let error = transport
            .round_trip(get("not a url".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_round_trip_returns_any_status() {
        let (address, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: 27\r\nConnection: close\r\n\r\n{\"error_code\":\"InvalidSes\"}",
        )
        .await;
        let transport = ReqwestTransport::new().unwrap();

        let response = transport
            .round_trip(get(format!("{address}/data")))
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 401);
        assert_eq!(
            response.headers.get("content-type"),
            Some("application/json")
        );
        assert_eq!(response.body_text(), r#"{"error_code":"InvalidSes"}"#);
        let head = server.await.unwrap();
        assert!(head.starts_with("GET /data HTTP/1.1"));
        assert!(head.to_lowercase().contains("authorization: bearer t1"));
    }

    #[tokio::test]
    async fn test_stream_yields_server_sent_events() {
        let (address, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\nevent: tick\ndata: 1\n\ndata: 2\n\n",
        )
        .await;
        let transport = ReqwestTransport::new().unwrap();

        let opening = transport
            .stream(get(format!("{address}/watch")))
            .await
            .unwrap();
        let StreamOpening::Open(mut stream) = opening else {
            panic!("stream was refused");
        };

        let first = stream.next_event().await.unwrap().unwrap();
        assert_eq!(first.event_name, "tick");
        assert_eq!(first.data, "1");
        let second = stream.next_event().await.unwrap().unwrap();
        assert_eq!(second.event_name, "message");
        assert_eq!(second.data, "2");
        assert!(stream.next_event().await.is_none());
        assert!(!stream.is_open());

        let head = server.await.unwrap();
        assert!(head.to_lowercase().contains("accept: text/event-stream"));
    }

    #[tokio::test]
    async fn test_refused_stream_returns_response() {
        let (address, _server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        )
        .await;
        let transport = ReqwestTransport::new().unwrap();

        let opening = transport
            .stream(get(format!("{address}/watch")))
            .await
            .unwrap();

        assert!(matches!(opening, StreamOpening::Refused(r) if r.status.as_u16() == 404));
    }
}
