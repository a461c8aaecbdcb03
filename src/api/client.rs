use async_trait::async_trait;
use reqwest::{Request, Response};

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}

/// A client that answers every request with a fixed response and records
/// what it was sent.
#[cfg(test)]
pub(crate) mod canned {
    use super::*;
    use reqwest::Method;
    use reqwest::header::HeaderMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct SentRequest {
        pub method: Method,
        pub url: String,
        pub headers: HeaderMap,
        pub body: Option<Vec<u8>>,
    }

    pub struct CannedClient {
        status: u16,
        body: &'static str,
        pub sent: Mutex<Vec<SentRequest>>,
    }

    impl CannedClient {
        pub fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn last(&self) -> SentRequest {
            self.sent.lock().unwrap().last().cloned().expect("no request sent")
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            self.sent.lock().unwrap().push(SentRequest {
                method: req.method().clone(),
                url: req.url().to_string(),
                headers: req.headers().clone(),
                body: req.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
            });
            let response = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(Response::from(response))
        }
    }
}
