//! Realtime-database cloud adapter.
//!
//! Implements [`CloudPush`] over the database's REST interface: one HTTPS
//! `PUT https://{host}/{path}.json?auth={token}` with the integer as the
//! JSON body.  Any 2xx status is success.
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` wrapped in the
//!   `embedded_svc` blocking client, TLS via the built-in CA bundle.
//! - **all other targets**: logs the request and records it.

use core::fmt::Write as _;

use log::{info, warn};

use crate::app::ports::CloudPush;
use crate::error::PushError;

#[cfg(target_os = "espidf")]
use embedded_svc::http::client::Client;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};

/// Host + path + token with room to spare.
pub const URL_CAP: usize = 192;

#[cfg(target_os = "espidf")]
const HTTP_TIMEOUT_SECS: u64 = 15;

/// Build the REST URL for `path`.  An empty token omits the query string.
pub fn push_url(host: &str, path: &str, auth: &str) -> Result<heapless::String<URL_CAP>, PushError> {
    if path.is_empty() || path.starts_with('/') {
        return Err(PushError::InvalidPath);
    }
    let mut url = heapless::String::new();
    let written = if auth.is_empty() {
        write!(url, "https://{}/{}.json", host, path)
    } else {
        write!(url, "https://{}/{}.json?auth={}", host, path, auth)
    };
    written.map_err(|_| PushError::InvalidPath)?;
    Ok(url)
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

pub struct FirebaseCloud {
    host: heapless::String<64>,
    auth: heapless::String<64>,
    pushes: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_requests: Vec<(String, String)>,
}

impl FirebaseCloud {
    pub fn new(host: &str, auth: &str) -> Self {
        let mut h = heapless::String::new();
        let mut a = heapless::String::new();
        if h.push_str(host).is_err() {
            warn!("Cloud: host longer than {} bytes, left empty", h.capacity());
        }
        if a.push_str(auth).is_err() {
            warn!("Cloud: auth token longer than {} bytes, left empty", a.capacity());
        }
        Self {
            host: h,
            auth: a,
            pushes: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_requests: Vec::new(),
        }
    }

    /// Successful pushes since construction.
    pub fn pushes(&self) -> u32 {
        self.pushes
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_put(&mut self, url: &str, body: &[u8]) -> Result<u16, PushError> {
        use embedded_svc::http::Method;
        use embedded_svc::io::Write;

        let connection = EspHttpConnection::new(&HttpConfiguration {
            timeout: Some(core::time::Duration::from_secs(HTTP_TIMEOUT_SECS)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|e| {
            warn!("Cloud: connection setup failed: {:?}", e);
            PushError::Network
        })?;
        let mut client = Client::wrap(connection);

        let mut content_len = heapless::String::<8>::new();
        write!(content_len, "{}", body.len()).map_err(|_| PushError::Network)?;
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", content_len.as_str()),
        ];

        let mut request = client
            .request(Method::Put, url, &headers)
            .map_err(|e| {
                warn!("Cloud: request failed: {:?}", e);
                PushError::Network
            })?;
        request.write_all(body).map_err(|e| {
            warn!("Cloud: body write failed: {:?}", e);
            PushError::Network
        })?;
        request.flush().map_err(|_| PushError::Network)?;
        let response = request.submit().map_err(|e| {
            warn!("Cloud: submit failed: {:?}", e);
            PushError::Network
        })?;
        Ok(response.status())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_put(&mut self, url: &str, body: &[u8]) -> Result<u16, PushError> {
        let body = String::from_utf8_lossy(body).into_owned();
        info!("Cloud(sim): PUT {} {}", url, body);
        self.sim_requests.push((url.to_owned(), body));
        Ok(200)
    }
}

#[cfg(not(target_os = "espidf"))]
impl FirebaseCloud {
    /// `(url, body)` for every request issued.
    pub fn sim_requests(&self) -> &[(String, String)] {
        &self.sim_requests
    }
}

// ───────────────────────────────────────────────────────────────
// CloudPush implementation
// ───────────────────────────────────────────────────────────────

impl CloudPush for FirebaseCloud {
    fn push_value(&mut self, path: &str, value: i32) -> Result<(), PushError> {
        let url = push_url(&self.host, path, &self.auth)?;
        let body = serde_json::to_vec(&value).map_err(|_| PushError::Network)?;

        // The URL carries the token; log only the path.
        info!("Cloud: PUT /{}.json <- {}", path, value);
        let status = self.platform_put(&url, &body)?;
        if !is_success(status) {
            warn!("Cloud: /{} rejected with HTTP {}", path, status);
            return Err(PushError::Status(status));
        }
        self.pushes = self.pushes.saturating_add(1);
        Ok(())
    }
}
