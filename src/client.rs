// Client for the Correios price/deadline calculator
//
// One call is one GET round trip: no retries, no caching. A provider-side
// rejection (Erro/MsgErro) is not an error here; it travels inside the
// returned QuoteRecord.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::quote_request::QuoteRequest;
use crate::xml_response::{DecodeError, QuoteResponse};

pub const DEFAULT_BASE_URL: &str = "http://ws.correios.com.br/calculador/CalcPrecoPrazo.aspx";

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Request build error: {0}")]
    RequestBuild(String),

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Body read error: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    // None means no timeout at all
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: None,
        }
    }
}

#[async_trait]
pub trait QuoteClient: Send + Sync + 'static {
    // Price and deadline for the services named in the request
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, QuoteError>;
}

pub struct CorreiosClient {
    config: ClientConfig,
    http: Client,
}

impl CorreiosClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl QuoteClient for CorreiosClient {
    #[tracing::instrument(skip(self, request), fields(service = %request.service_code))]
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, QuoteError> {
        let url = build_url(&self.config.base_url, request)?;
        debug!(%url, "Requesting quote");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/xml")
            .send()
            .await
            .map_err(QuoteError::Transport)?;

        // The status code is not checked: the calculator has been known to
        // send its XML with error statuses, so the body decides.
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Non-success status from calculator, decoding body anyway");
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Consumes the response; the connection is released before decoding
        let body = response.bytes().await.map_err(QuoteError::BodyRead)?;
        debug!(bytes = body.len(), "Read response body");

        Ok(QuoteResponse::from_bytes(&body, content_type.as_deref())?)
    }
}

/// Attaches the request's query parameters to `base_url`, percent-encoding
/// every value.
pub fn build_url(base_url: &str, request: &QuoteRequest) -> Result<Url, QuoteError> {
    Url::parse_with_params(base_url, request.query_pairs())
        .map_err(|e| QuoteError::RequestBuild(format!("{}: {}", base_url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml_response::SAMPLE_RESPONSE_XML;
    use mockito::Matcher;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const CALC_PATH: &str = "/calculador/CalcPrecoPrazo.aspx";

    fn sedex_request() -> QuoteRequest {
        QuoteRequest {
            service_code: "04014".to_string(),
            origin_cep: "70002900".to_string(),
            destination_cep: "04547000".to_string(),
            weight: "1".to_string(),
            format: 1,
            length: 20.0,
            height: 20.0,
            width: 20.0,
            diameter: 0.0,
            ..Default::default()
        }
    }

    fn client_for(base_url: String) -> CorreiosClient {
        CorreiosClient::new(ClientConfig {
            base_url,
            timeout_ms: Some(5_000),
        })
        .unwrap()
    }

    #[test]
    fn test_default_config_has_no_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let result = CorreiosClient::new(ClientConfig {
            base_url: "  ".to_string(),
            timeout_ms: None,
        });
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_build_url_encodes_values() {
        let request = QuoteRequest {
            company_code: "0808 2650".to_string(),
            password: "s&nh@".to_string(),
            ..sedex_request()
        };
        let url = build_url(DEFAULT_BASE_URL, &request).unwrap();
        let query = url.query().unwrap();

        assert!(query.starts_with("nCdEmpresa=0808+2650&sDsSenha=s%26nh%40&"));
        assert!(query.contains("nVlValorDeclarado=0.00"));
        assert!(query.ends_with("StrRetorno=xml&nIndicaCalculo=3"));

        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.len(), 16);
        assert_eq!(pairs["sDsSenha"], "s&nh@");
    }

    #[test]
    fn test_build_url_keeps_empty_values() {
        let url = build_url(DEFAULT_BASE_URL, &sedex_request()).unwrap();
        assert!(url.query().unwrap().starts_with("nCdEmpresa=&sDsSenha=&"));
        assert_eq!(url.host_str(), Some("ws.correios.com.br"));
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_build_url_rejects_malformed_endpoint() {
        let result = build_url("not a url", &sedex_request());
        assert!(matches!(result, Err(QuoteError::RequestBuild(_))));
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", CALC_PATH)
            .match_header("accept", "application/xml")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("nCdServico".into(), "04014".into()),
                Matcher::UrlEncoded("sCepOrigem".into(), "70002900".into()),
                Matcher::UrlEncoded("sCepDestino".into(), "04547000".into()),
                Matcher::UrlEncoded("nVlComprimento".into(), "20.00".into()),
                Matcher::UrlEncoded("nVlValorDeclarado".into(), "0.00".into()),
                Matcher::UrlEncoded("StrRetorno".into(), "xml".into()),
                Matcher::UrlEncoded("nIndicaCalculo".into(), "3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/xml; charset=utf-8")
            .with_body(SAMPLE_RESPONSE_XML)
            .create_async()
            .await;

        let client = client_for(format!("{}{}", server.url(), CALC_PATH));
        let response = client.fetch_quote(&sedex_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.services.len(), 2);
        assert_eq!(response.services[0].codigo, "04014");
        assert!(!response.services[0].valor.is_empty());
        assert!(!response.services[0].prazo_entrega.is_empty());
    }

    #[tokio::test]
    async fn test_business_error_is_not_a_client_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALC_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(SAMPLE_RESPONSE_XML)
            .create_async()
            .await;

        let client = client_for(format!("{}{}", server.url(), CALC_PATH));
        let response = client.fetch_quote(&sedex_request()).await.unwrap();

        assert!(!response.services[0].has_error());
        assert!(response.services[1].has_error());
        assert_eq!(response.services[1].msg_erro, "CEP de destino invalido.");
    }

    #[tokio::test]
    async fn test_error_status_still_decodes_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALC_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(SAMPLE_RESPONSE_XML)
            .create_async()
            .await;

        let client = client_for(format!("{}{}", server.url(), CALC_PATH));
        let response = client.fetch_quote(&sedex_request()).await.unwrap();
        assert_eq!(response.services.len(), 2);
    }

    #[tokio::test]
    async fn test_html_error_page_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALC_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "text/html")
            .with_body("<html><body>Not Found</body></html>")
            .create_async()
            .await;

        let client = client_for(format!("{}{}", server.url(), CALC_PATH));
        let result = client.fetch_quote(&sedex_request()).await;
        assert!(matches!(
            result,
            Err(QuoteError::Decode(DecodeError::UnexpectedRoot(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALC_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(format!("{}{}", server.url(), CALC_PATH));
        let result = client.fetch_quote(&sedex_request()).await;
        assert!(matches!(
            result,
            Err(QuoteError::Decode(DecodeError::EmptyBody))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}{}", addr, CALC_PATH));
        let result = client.fetch_quote(&sedex_request()).await;
        assert!(matches!(result, Err(QuoteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_truncated_body_is_body_read_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 500\r\n\r\n<Servicos><cServico>",
                )
                .await
                .unwrap();
            socket.flush().await.unwrap();
            // Closing here leaves the body short of its declared length
        });

        let client = client_for(format!("http://{}{}", addr, CALC_PATH));
        let result = client.fetch_quote(&sedex_request()).await;
        server.await.unwrap();

        assert!(matches!(result, Err(QuoteError::BodyRead(_))));
    }
}
