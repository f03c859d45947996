//! WiFi station-mode adapter.
//!
//! Implements [`NetworkJoin`]: associate with the stored network and wait
//! for an IP address, retrying until joined or until the optional timeout
//! expires.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stub with an injectable outcome.

use core::time::Duration;
use std::time::Instant;

use log::{info, warn};

use crate::app::ports::NetworkJoin;
use crate::error::JoinError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

const MAX_NETWORK_ID_LEN: usize = 32;
const MAX_SECRET_LEN: usize = 64;

/// Pause between association attempts.
const JOIN_RETRY_MS: u64 = 500;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn validate_credentials(network_id: &str, secret: &str) -> Result<(), JoinError> {
    if network_id.is_empty() || network_id.len() > MAX_NETWORK_ID_LEN {
        return Err(JoinError::InvalidNetworkId);
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err(JoinError::InvalidSecret);
    }
    Ok(())
}

fn deadline_passed(elapsed: Duration, timeout: Option<Duration>) -> bool {
    timeout.is_some_and(|t| elapsed >= t)
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    joined: bool,
    attempts: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_reachable: bool,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, JoinError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), None).map_err(|e| {
            warn!("WiFi: driver init failed: {:?}", e);
            JoinError::Driver
        })?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(|e| {
            warn!("WiFi: event loop wrap failed: {:?}", e);
            JoinError::Driver
        })?;
        Ok(Self {
            wifi,
            joined: false,
            attempts: 0,
        })
    }

    fn configure(&mut self, network_id: &str, secret: &str) -> Result<(), JoinError> {
        let auth_method = if secret.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: network_id
                .try_into()
                .map_err(|_| JoinError::InvalidNetworkId)?,
            password: secret.try_into().map_err(|_| JoinError::InvalidSecret)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| JoinError::Driver)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| JoinError::Driver)?;
        }
        Ok(())
    }

    fn platform_attempt(&mut self) -> bool {
        match self.wifi.connect() {
            Ok(()) => match self.wifi.wait_netif_up() {
                Ok(()) => true,
                Err(e) => {
                    warn!("WiFi: netif up failed: {:?}", e);
                    false
                }
            },
            Err(e) => {
                warn!("WiFi: connect failed: {:?}", e);
                let _ = self.wifi.disconnect();
                false
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            joined: false,
            attempts: 0,
            sim_reachable: true,
        }
    }

    /// Make the simulated access point (un)reachable.
    pub fn sim_set_reachable(&mut self, reachable: bool) {
        self.sim_reachable = reachable;
    }

    fn configure(&mut self, _network_id: &str, _secret: &str) -> Result<(), JoinError> {
        Ok(())
    }

    fn platform_attempt(&mut self) -> bool {
        self.sim_reachable
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Association attempts made by the last `join`.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkJoin implementation
// ───────────────────────────────────────────────────────────────

impl NetworkJoin for WifiAdapter {
    fn join(
        &mut self,
        network_id: &str,
        secret: &str,
        timeout: Option<Duration>,
    ) -> Result<(), JoinError> {
        validate_credentials(network_id, secret)?;
        self.configure(network_id, secret)?;
        self.joined = false;
        self.attempts = 0;

        info!(
            "WiFi: joining '{}' (secret {} bytes, timeout {:?})",
            network_id,
            secret.len(),
            timeout
        );

        let started = Instant::now();
        loop {
            self.attempts = self.attempts.saturating_add(1);
            if self.platform_attempt() {
                self.joined = true;
                info!(
                    "WiFi: joined after {} attempt(s) in {} ms",
                    self.attempts,
                    started.elapsed().as_millis()
                );
                return Ok(());
            }
            if deadline_passed(started.elapsed(), timeout) {
                warn!(
                    "WiFi: join timed out after {} attempt(s)",
                    self.attempts
                );
                return Err(JoinError::TimedOut);
            }
            std::thread::sleep(Duration::from_millis(JOIN_RETRY_MS));
        }
    }
}
