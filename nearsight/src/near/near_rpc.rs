use crate::errors::TransportError;
use crate::near::near_models::{JsonRpcRequest, JsonRpcResponse};
use crate::near::provider_pool::ProviderEndpoint;
use crate::settings::Settings;
use async_trait::async_trait;
use log::{error, trace};
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

/// One JSON-RPC round trip against a single endpoint. No retries here; the pool decides.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, endpoint: &ProviderEndpoint, request: &JsonRpcRequest) -> Result<Value, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<HttpTransport, reqwest::Error> {
        let builder = reqwest::Client::builder().timeout(settings.http_timeout);
        let proxy_builder = match &settings.proxy {
            Some(val) => { builder.proxy(reqwest::Proxy::https(val)?) }
            None => { builder }
        };

        Ok(HttpTransport {
            client: proxy_builder.build()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_ut(client: reqwest::Client) -> HttpTransport {
        HttpTransport { client }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, endpoint: &ProviderEndpoint, request: &JsonRpcRequest) -> Result<Value, TransportError> {
        let res = self
            .client
            .post(endpoint.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    TransportError::Builder(e.to_string())
                } else {
                    TransportError::Request(e)
                }
            })?;
        let status = res.status();
        trace!("Response: {:?} {} from {}", res.version(), status, endpoint);
        let body = res.text().await?;
        trace!("body:{}", &body);

        let parsed: Result<JsonRpcResponse, serde_json::Error> = serde_json::from_str(&body);
        if !status.is_success() {
            // a failed status only carries a usable answer when the error is about the request itself
            return match parsed {
                Ok(JsonRpcResponse { error: Some(error), .. }) if error.is_terminal() => Err(error.to_transport_error()),
                _ => Err(TransportError::Status(status.as_u16())),
            };
        }
        match parsed {
            Ok(response) => response.into_result(),
            Err(e) => {
                error!("near rpc malformed response from {},{}", endpoint, &body);
                Err(TransportError::Malformed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RpcError;
    use crate::near::near_models::{RpcQuery, UNKNOWN_ACCOUNT};
    use crate::near::provider_pool::ProviderPool;
    use crate::settings::Network;
    use crate::utils::setup_logger;
    use log::LevelFilter;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use url::Url;

    const VIEW_BODY: &str = r#"{"jsonrpc":"2.0","id":"dontcare","result":{"amount":"1000000000000000000000000","locked":"0","storage_usage":182}}"#;
    const RATE_LIMIT_BODY: &str = r#"{"jsonrpc":"2.0","id":"dontcare","error":{"code":-32005,"message":"rate limit exceeded"}}"#;
    const HANDLER_BODY: &str = r#"{"jsonrpc":"2.0","id":"dontcare","error":{"name":"HANDLER_ERROR","cause":{"name":"CONTRACT_EXECUTION_ERROR","info":{}},"code":-32000,"message":"Server error","data":"MethodNotFound"}}"#;

    fn transport() -> HttpTransport {
        HttpTransport::new_for_ut(reqwest::Client::builder().no_proxy().build().unwrap())
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local node answering one connection per canned reply, in order.
    async fn serve(replies: Vec<(u16, String)>) -> ProviderEndpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                let reply = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        ProviderEndpoint::new(Url::parse(&format!("http://{addr}/")).unwrap())
    }

    async fn call_once(status: u16, body: &str) -> Result<Value, TransportError> {
        let endpoint = serve(vec![(status, body.to_string())]).await;
        let request = RpcQuery::ViewAccount("alice.near".to_string()).to_request();
        transport().call(&endpoint, &request).await
    }

    #[test]
    fn test_build_with_proxy() {
        let mut settings = Settings::for_network(Network::Testnet);
        settings.proxy = Some("http://localhost:7890".to_string());
        assert!(HttpTransport::new(&settings).is_ok());
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let actual = call_once(200, VIEW_BODY).await.unwrap();
        assert_eq!(json!("1000000000000000000000000"), actual["amount"]);
        assert_eq!(json!(182), actual["storage_usage"]);
    }

    #[tokio::test]
    async fn test_call_returns_rpc_error() {
        let body = std::fs::read_to_string("tests/data/near_unknown_account.json").unwrap();
        match call_once(200, &body).await {
            Err(TransportError::Rpc { name, .. }) => assert_eq!(UNKNOWN_ACCOUNT, name),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let actual = call_once(503, "").await;
        assert!(matches!(actual, Err(TransportError::Status(503))), "{:?}", actual);
    }

    #[tokio::test]
    async fn test_rate_limit_body_is_a_status_failure() {
        let actual = call_once(429, RATE_LIMIT_BODY).await;
        assert!(matches!(actual, Err(TransportError::Status(429))), "{:?}", actual);
    }

    #[tokio::test]
    async fn test_handler_error_with_failed_status() {
        match call_once(500, HANDLER_BODY).await {
            Err(TransportError::Rpc { name, message }) => {
                assert_eq!("CONTRACT_EXECUTION_ERROR", name);
                assert_eq!("MethodNotFound", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let actual = call_once(200, "<html>bad gateway</html>").await;
        assert!(matches!(actual, Err(TransportError::Malformed(_))), "{:?}", actual);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_builder_error() {
        let endpoint = ProviderEndpoint::new(Url::parse("ftp://127.0.0.1/").unwrap());
        let request = RpcQuery::Validators.to_request();
        let actual = transport().call(&endpoint, &request).await;
        assert!(matches!(actual, Err(TransportError::Builder(_))), "{:?}", actual);
    }

    #[tokio::test]
    async fn test_rate_limited_endpoint_fails_over() {
        let limited = serve(vec![(429, RATE_LIMIT_BODY.to_string())]).await;
        let healthy = serve(vec![(200, VIEW_BODY.to_string())]).await;
        let pool = ProviderPool::new(vec![limited, healthy], Arc::new(transport()));

        let actual = pool.query(&RpcQuery::ViewAccount("alice.near".to_string())).await;
        match actual {
            Ok(view) => assert_eq!(json!(182), view["storage_usage"]),
            Err(RpcError::Handler(m)) => panic!("rate limit treated as final: {m}"),
            Err(e) => panic!("unexpected {e}"),
        }
    }

    /**
    连接真实节点的测试，默认 ignore。
    **/
    #[ignore]
    #[tokio::test]
    async fn test_real_view_account() {
        let _ = setup_logger(Some(LevelFilter::Trace));
        let settings = Settings::for_network(Network::Mainnet);
        let transport = HttpTransport::new(&settings).unwrap();
        let request = RpcQuery::ViewAccount("near".to_string()).to_request();
        let value = transport.call(&settings.endpoints[0], &request).await.unwrap();
        println!("{:?}", value)
    }
}
