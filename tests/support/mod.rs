#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use h2::client::{self, SendRequest};
use h2::RecvStream;
use http::{HeaderMap, Request, StatusCode};
use pushbench::server::{serve_connection, Service};
use tokio::task::JoinHandle;

/// One response as seen by the client, with everything pushed alongside it.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub pushed: Vec<Pushed>,
}

#[derive(Debug)]
pub struct Pushed {
    pub uri: String,
    pub promise_headers: HeaderMap,
    pub status: StatusCode,
    pub body: Bytes,
}

/// Serves `service` on one end of an in-memory pipe, connecting an h2
/// client to the other.
pub async fn connect(service: Service) -> SendRequest<Bytes> {
    // h2 servers may not open pushed streams until the client advertises
    // SETTINGS_MAX_CONCURRENT_STREAMS
    let mut builder = client::Builder::new();
    builder.max_concurrent_streams(100);
    connect_with(service, builder).await
}

pub async fn connect_with(service: Service, builder: client::Builder) -> SendRequest<Bytes> {
    connect_parts(service, builder).await.0
}

/// Like `connect_with`, also returning the task driving the client side of
/// the connection; it finishes once the server closes the connection.
pub async fn connect_parts(
    service: Service,
    builder: client::Builder,
) -> (SendRequest<Bytes>, JoinHandle<()>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pushbench=trace")
        .with_test_writer()
        .try_init();

    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    tokio::spawn(async move {
        let builder = h2::server::Builder::new();
        let _ = serve_connection(server_io, &builder, service).await;
    });

    let (send, conn) = builder
        .handshake::<_, Bytes>(client_io)
        .await
        .expect("client handshake");
    let conn = tokio::spawn(async move {
        let _ = conn.await;
    });
    (send, conn)
}

pub async fn get(send: &mut SendRequest<Bytes>, path: &str) -> Fetched {
    get_with(send, path, HeaderMap::new()).await
}

pub async fn get_with(send: &mut SendRequest<Bytes>, path: &str, headers: HeaderMap) -> Fetched {
    let mut req = Request::get(format!("https://localhost{}", path))
        .body(())
        .unwrap();
    *req.headers_mut() = headers;

    let mut ready = send.clone().ready().await.expect("ready");
    let (mut response, _) = ready.send_request(req, true).expect("send_request");

    let mut promises = response.push_promises();
    let mut pushed = Vec::new();
    while let Some(promise) = promises.push_promise().await {
        let (promise, response) = promise.expect("push promise").into_parts();
        let response = response.await.expect("pushed response");
        let status = response.status();
        pushed.push(Pushed {
            uri: promise.uri().to_string(),
            promise_headers: promise.headers().clone(),
            status,
            body: read(response.into_body()).await,
        });
    }

    let response = response.await.expect("response");
    let (parts, body) = response.into_parts();
    Fetched {
        status: parts.status,
        headers: parts.headers,
        body: read(body).await,
        pushed,
    }
}

pub async fn read(mut body: RecvStream) -> Bytes {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.expect("body chunk");
        body.flow_control()
            .release_capacity(chunk.len())
            .expect("release capacity");
        buf.extend_from_slice(&chunk);
    }
    buf.freeze()
}
