// src/server.rs
//! HTTP endpoints over the snapshot store

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::location::{LocationValidator, ValidationError};
use crate::nmea::{ingest_section, Channel, ChannelResult};
use crate::snapshot::{SnapshotStore, Status};

pub const PATH_LATEST: &str = "/latest_data";
pub const PATH_NMEA: &str = "/nmea";
pub const PATH_LOCATION: &str = "/location";

const NO_JSON: &str = "No JSON data received";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures at the HTTP boundary. Each maps to a non-2xx status.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BadRequest(_) | RequestError::Validation(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: Status,
    message: String,
}

/// Request handling shared by every connection.
pub struct App {
    store: Arc<SnapshotStore>,
    validator: LocationValidator,
    max_body_bytes: usize,
}

impl App {
    pub fn new(store: Arc<SnapshotStore>, config: &MonitorConfig) -> Self {
        Self {
            store,
            validator: LocationValidator::new().with_range_check(config.validate_coordinate_range),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Route one request. Never fails: errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!(%method, %path, "Handling request");

        match self.route(req).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %path, error = %err, "Request rejected");
                json_response(
                    err.status(),
                    &ErrorBody {
                        status: Status::Error,
                        message: err.to_string(),
                    },
                )
            }
        }
    }

    async fn route<B>(&self, req: Request<B>) -> std::result::Result<Response<Full<Bytes>>, RequestError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        match (req.method(), req.uri().path()) {
            (&Method::GET, PATH_LATEST) => Ok(json_response(StatusCode::OK, &*self.store.read())),
            (&Method::POST, PATH_NMEA) => self.receive_nmea(req).await,
            (&Method::POST, PATH_LOCATION) => self.receive_location(req).await,
            (method, PATH_LATEST | PATH_NMEA | PATH_LOCATION) => {
                Err(RequestError::MethodNotAllowed(method.to_string()))
            }
            (_, path) => Err(RequestError::NotFound(path.to_string())),
        }
    }

    async fn receive_nmea<B>(&self, req: Request<B>) -> std::result::Result<Response<Full<Bytes>>, RequestError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let payload = read_json_object(req.into_body(), self.max_body_bytes).await?;

        let mut batches = Vec::new();
        for channel in Channel::ALL {
            match payload.get(channel.as_str()) {
                None => {}
                Some(Value::Null) => batches.push((channel, "")),
                Some(Value::String(batch)) => batches.push((channel, batch.as_str())),
                Some(_) => {
                    return Err(RequestError::BadRequest(format!(
                        "Field {} must be a string of NMEA sentences",
                        channel
                    )))
                }
            }
        }

        let channels: BTreeMap<Channel, ChannelResult> = batches
            .into_iter()
            .map(|(channel, batch)| (channel, ingest_section(batch)))
            .collect();
        let counts: Vec<String> = channels
            .iter()
            .map(|(channel, result)| format!("{}={}", channel, result.len()))
            .collect();

        let snapshot = self.store.replace_channels(channels);
        info!(records = %counts.join(" "), "NMEA data received");

        Ok(json_response(StatusCode::OK, &*snapshot))
    }

    async fn receive_location<B>(&self, req: Request<B>) -> std::result::Result<Response<Full<Bytes>>, RequestError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let payload = read_json_object(req.into_body(), self.max_body_bytes).await?;
        let fix = self.validator.validate(&payload)?;

        info!(
            fix_type = fix.fix_type(),
            latitude = fix.latitude(),
            longitude = fix.longitude(),
            "Location data received"
        );
        let snapshot = self.store.merge_location(fix);

        Ok(json_response(StatusCode::OK, &*snapshot))
    }
}

async fn read_json_object<B>(body: B, limit: usize) -> std::result::Result<Map<String, Value>, RequestError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                RequestError::PayloadTooLarge(limit)
            } else {
                RequestError::BadRequest(format!("Failed to read request body: {}", err))
            }
        })?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(RequestError::BadRequest(NO_JSON.to_string()));
    }

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| RequestError::BadRequest(format!("Invalid JSON: {}", e)))?;

    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        Value::Object(_) | Value::Null => Err(RequestError::BadRequest(NO_JSON.to_string())),
        _ => Err(RequestError::BadRequest("Expected a JSON object".to_string())),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(err) => {
            error!("Failed to serialize response: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"status":"error","message":"serialization failed"}"#),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Bound listener plus the shared [`App`].
pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
}

impl Server {
    pub async fn bind(config: &MonitorConfig, store: Arc<SnapshotStore>) -> Result<Self> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| MonitorError::Bind { addr, source })?;

        Ok(Self {
            listener,
            app: Arc::new(App::new(store, config)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(addr = %self.local_addr()?, "HTTP server listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("HTTP server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let app = Arc::clone(&self.app);
                            tokio::spawn(async move {
                                if let Err(err) = serve_connection(stream, app).await {
                                    error!(%peer, "Connection error: {}", err);
                                }
                            });
                        }
                        Err(err) => {
                            warn!("Accept error: {}", err);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, app: Arc<App>) -> std::result::Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(app.handle(req).await) }
    });
    http1::Builder::new().serve_connection(io, service).await
}
