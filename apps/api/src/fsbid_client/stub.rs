//! In-process stand-in for the FSBid APIs, for tests.
//!
//! Serves whatever JSON the responder returns for a request and records every
//! request as `"METHOD /path?query"`.

use std::sync::{Arc, Mutex};

use axum::http::{Method, Uri};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::Value;

pub(crate) struct StubUpstream {
    /// Root to hand to the code under test, e.g. `http://127.0.0.1:PORT/v1`.
    pub root: Url,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubUpstream {
    pub fn requests(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

/// Starts a stub answering every request with `respond(method, uri)`.
pub(crate) async fn spawn<F>(respond: F) -> StubUpstream
where
    F: Fn(&Method, &Uri) -> Value + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let app = Router::new().fallback(move |method: Method, uri: Uri| {
        let respond = respond.clone();
        let recorder = recorder.clone();
        async move {
            recorder.lock().unwrap().push(format!("{method} {uri}"));
            Json(respond(&method, &uri))
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubUpstream {
        root: Url::parse(&format!("http://{addr}/v1")).unwrap(),
        seen,
    }
}

/// Stub that answers every request with the same payload.
pub(crate) async fn spawn_fixed(payload: Value) -> StubUpstream {
    spawn(move |_, _| payload.clone()).await
}
