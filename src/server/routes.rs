//! Request routing and response helpers
//!
//! # Supported Endpoints
//!
//! * `POST /convert` - Convert an uploaded track (see [`ConvertHandler`])
//! * `GET /health` - Health check endpoint
//! * All other requests return 404 Not Found

use super::handler::ConvertHandler;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{info, Instrument};

/// Dispatches requests to their handlers
pub struct Router {
    convert: ConvertHandler,
}

impl Router {
    pub fn new(convert: ConvertHandler) -> Self {
        Self { convert }
    }

    /// Route a request and produce its response
    ///
    /// Generic over the body type so handlers can be driven without a socket.
    pub async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = tracing::info_span!(
            "http.request",
            http.method = %method,
            http.target = %path,
        );

        async move {
            info!("Handling {} {}", method, path);

            let response = match (path.as_str(), &method) {
                ("/convert", _) => self.convert.handle(req).await,
                ("/health", &Method::GET) => {
                    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
                }
                _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
            };

            info!(status = response.status().as_u16(), "Request complete");
            response
        }
        .instrument(span)
        .await
    }
}

/// Plain-text response with the given status
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// JSON response with the given status
pub fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
