// Default transport: hyper http1 over a tokio accept loop

use crate::app::Dispatcher;
use crate::http::RequestHead;
use crate::request::BodyStream;
use crate::Error;
use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyDataStream, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Accept connections and invoke the dispatcher once per request.
///
/// One task per connection; each request owns its context, so the shared
/// dispatcher needs no synchronization.
pub async fn serve(app: Arc<Dispatcher>, addr: impl ToSocketAddrs) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!("listening on http://{}", local);
    }

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let app = app.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: hyper::Request<Incoming>| {
                let app = app.clone();
                async move {
                    let (head, body) = convert_request(req);
                    let response = app.handle(head, body).await;
                    Ok::<_, Infallible>(convert_response(response))
                }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!(error = %err, "connection error");
            }
        });
    }
}

fn convert_request(req: hyper::Request<Incoming>) -> (RequestHead, BodyStream) {
    let (parts, body) = req.into_parts();

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut headers = HashMap::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), v.to_string());
        }
    }

    let head = RequestHead::new(parts.method.as_str(), target, headers);
    let stream: BodyStream = Box::pin(
        BodyDataStream::new(body).map(|chunk| chunk.map_err(|e| Error::BodyRead(e.to_string()))),
    );
    (head, stream)
}

fn convert_response(response: crate::http::Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|_| {
            hyper::Response::builder()
                .status(500)
                .body(Full::new(Bytes::new()))
                .expect("bare 500 response is valid")
        })
}
