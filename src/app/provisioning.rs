//! Inbound message handling for provisioning mode.
//!
//! Runs in the radio stack's callback context.  Field updates go straight
//! into the [`StagedSettings`] working copy; a commit flips the working
//! copy's mode and hands the flash write to the main loop through the
//! [`DeferredActionQueue`].

use log::{info, warn};

use crate::events::{DeferredAction, DeferredActionQueue};
use crate::settings::Mode;

use super::commands::{Command, parse};
use super::ports::InboundMessageHandler;
use super::staging::StagedSettings;

pub struct ProvisioningInbound<'a> {
    staged: &'a StagedSettings,
    deferred: &'a DeferredActionQueue,
}

impl<'a> ProvisioningInbound<'a> {
    pub const fn new(staged: &'a StagedSettings, deferred: &'a DeferredActionQueue) -> Self {
        Self { staged, deferred }
    }
}

impl InboundMessageHandler for ProvisioningInbound<'_> {
    fn on_inbound_message(&self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }

        match parse(raw) {
            Command::SetField(field, value) => {
                let write = self.staged.set_field(field, value);
                if field.is_secret() {
                    info!("Provision: {} set ({} bytes)", field, write.stored_len);
                } else {
                    let snap = self.staged.snapshot();
                    info!("Provision: {} = \"{}\"", field, snap.get(field));
                }
                if write.truncated {
                    warn!(
                        "Provision: {} input {} bytes, kept {}",
                        field,
                        value.len(),
                        write.stored_len
                    );
                }
            }
            Command::Commit => {
                self.staged.set_mode(Mode::WifiActive);
                if self.deferred.push(DeferredAction::Commit) {
                    info!("Provision: commit requested");
                }
            }
            Command::Unrecognized(raw) => {
                warn!("Provision: unrecognized message ({} bytes) ignored", raw.len());
            }
        }
    }
}
