//! In-process mock login site used by the integration tests.
//!
//! `GET /login-page` serves the scripted nonce page, `POST /login` hands the
//! decoded form to a responder closure. Request counts and the peak number of
//! concurrent login submissions are recorded for assertions.

#![allow(dead_code)]

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server};
use loginstress::engine::client::build_client;
use loginstress::{Credential, Endpoints};
use loginstress_common::RunConfig;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Form = HashMap<String, String>;
pub type Responder = Arc<dyn Fn(&Form) -> Reply + Send + Sync>;

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
pub struct SiteScript {
    pub page_status: u16,
    pub page_body: String,
    pub login: Responder,
}

impl SiteScript {
    /// Serves a valid nonce page and answers every login with `reply`.
    pub fn answering(reply: Reply) -> Self {
        Self {
            page_status: 200,
            page_body: nonce_page("abc123"),
            login: Arc::new(move |_| reply.clone()),
        }
    }

    pub fn with_responder(login: impl Fn(&Form) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            page_status: 200,
            page_body: nonce_page("abc123"),
            login: Arc::new(login),
        }
    }
}

#[derive(Default)]
pub struct SiteStats {
    pub page_hits: AtomicUsize,
    pub login_hits: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub forms: Mutex<Vec<Form>>,
    pub headers: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl SiteStats {
    pub fn page_hits(&self) -> usize {
        self.page_hits.load(Ordering::SeqCst)
    }

    pub fn login_hits(&self) -> usize {
        self.login_hits.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub struct MockSite {
    pub addr: SocketAddr,
    pub stats: Arc<SiteStats>,
}

impl MockSite {
    pub async fn start(script: SiteScript) -> Self {
        let script = Arc::new(script);
        let stats = Arc::new(SiteStats::default());

        let svc_script = Arc::clone(&script);
        let svc_stats = Arc::clone(&stats);
        let make_svc = make_service_fn(move |_conn| {
            let script = Arc::clone(&svc_script);
            let stats = Arc::clone(&svc_stats);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle(req, Arc::clone(&script), Arc::clone(&stats))
                }))
            }
        });

        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);

        Self { addr, stats }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            format!("http://{}/login", self.addr),
            format!("http://{}/login-page", self.addr),
        )
        .unwrap()
    }
}

async fn handle(
    req: Request<Body>,
    script: Arc<SiteScript>,
    stats: Arc<SiteStats>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/login-page") => {
            stats.page_hits.fetch_add(1, Ordering::SeqCst);
            Ok(respond(script.page_status, script.page_body.clone()))
        }
        (Method::POST, "/login") => {
            stats.login_hits.fetch_add(1, Ordering::SeqCst);
            let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let seen = {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                (header("content-type"), header("user-agent"))
            };
            stats.headers.lock().unwrap().push(seen);

            let bytes = hyper::body::to_bytes(req.into_body())
                .await
                .unwrap_or_default();
            let form = parse_form(&String::from_utf8_lossy(&bytes));
            stats.forms.lock().unwrap().push(form.clone());

            let reply = (script.login)(&form);
            tokio::time::sleep(reply.delay).await;

            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(respond(reply.status, reply.body))
        }
        _ => Ok(respond(404, "Not Found".to_string())),
    }
}

fn respond(status: u16, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body))
        .unwrap()
}

/// Decodes the simple ASCII forms the tests send.
fn parse_form(raw: &str) -> Form {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.replace('+', " ")))
        .collect()
}

pub fn nonce_page(nonce: &str) -> String {
    format!(
        r#"<html><body><form method="post">
<input type="text" name="username">
<input type="hidden" name="login-form-nonce" value="{}">
</form></body></html>"#,
        nonce
    )
}

pub fn client() -> reqwest::Client {
    build_client(&RunConfig::default()).unwrap()
}

pub fn credentials(count: usize) -> Vec<Credential> {
    (0..count)
        .map(|i| Credential::new(format!("user{}", i), format!("pass{}", i)))
        .collect()
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/login-page", addr)
}
