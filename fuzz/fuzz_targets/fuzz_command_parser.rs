//! Fuzz target: provisioning writes
//!
//! Feeds arbitrary writes through the parser and the inbound handler, then
//! checks that the working copy still encodes to a valid record.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartplant::app::commands::{Command, PREFIX_LEN, parse};
use smartplant::app::ports::InboundMessageHandler;
use smartplant::app::provisioning::ProvisioningInbound;
use smartplant::app::staging::StagedSettings;
use smartplant::events::DeferredActionQueue;
use smartplant::settings::{self, Field};

fuzz_target!(|data: &[u8]| {
    if let Command::SetField(_, payload) = parse(data) {
        assert_eq!(payload.len(), data.len() - PREFIX_LEN);
    }

    let staged = StagedSettings::new();
    let deferred = DeferredActionQueue::new();
    let inbound = ProvisioningInbound::new(&staged, &deferred);

    // Treat the input as a stream of writes split on '\n'.
    for msg in data.split(|&b| b == b'\n') {
        inbound.on_inbound_message(msg);
    }

    let record = staged.snapshot();
    for field in Field::ALL {
        assert!(record.get(field).len() <= field.max_len());
    }
    assert_eq!(settings::decode(&settings::encode(&record)), record);
});
