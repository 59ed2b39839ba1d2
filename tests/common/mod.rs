/// Fake Meteomatics upstream for integration tests.
///
/// Binds tiny_http on an ephemeral local port and answers each incoming
/// request with the next canned `(status, body)` pair, recording the URL
/// and `Authorization` header it saw.

use forecast_service::config::ProviderConfig;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server, StatusCode};

pub const USERNAME: &str = "forecast_user";
pub const PASSWORD: &str = "s3cret";

#[derive(Debug)]
pub struct SeenRequest {
    pub url: String,
    pub authorization: Option<String>,
}

pub struct FakeUpstream {
    pub base_url: String,
    pub seen: Receiver<SeenRequest>,
}

impl FakeUpstream {
    pub fn start(replies: Vec<(u16, String)>) -> Self {
        Self::start_with_delay(replies, Duration::ZERO)
    }

    /// Like `start`, but waits `delay` before answering each request.
    pub fn start_with_delay(replies: Vec<(u16, String)>, delay: Duration) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind fake upstream");
        let port = server
            .server_addr()
            .to_ip()
            .expect("fake upstream listens on IP")
            .port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (status, body) in replies {
                let Ok(request) = server.recv() else { return };
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                let _ = tx.send(SeenRequest {
                    url: request.url().to_string(),
                    authorization,
                });

                if !delay.is_zero() {
                    thread::sleep(delay);
                }

                let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("static header");
                let response = Response::from_string(body)
                    .with_status_code(StatusCode(status))
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            seen: rx,
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.clone(),
            model: "mix".to_string(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
        }
    }
}

/// Provider body with one temperature and one humidity series for a
/// single coordinate.
pub fn provider_body(latitude: f64, longitude: f64, samples: &[(&str, f64, f64)]) -> String {
    let temperatures: Vec<_> = samples
        .iter()
        .map(|(date, temperature, _)| serde_json::json!({ "date": date, "value": temperature }))
        .collect();
    let humidities: Vec<_> = samples
        .iter()
        .map(|(date, _, humidity)| serde_json::json!({ "date": date, "value": humidity }))
        .collect();
    serde_json::json!({
        "version": "3.0",
        "status": "OK",
        "data": [
            {
                "parameter": "t_2m:C",
                "coordinates": [{ "lat": latitude, "lon": longitude, "dates": temperatures }]
            },
            {
                "parameter": "relative_humidity_2m:p",
                "coordinates": [{ "lat": latitude, "lon": longitude, "dates": humidities }]
            }
        ]
    })
    .to_string()
}
