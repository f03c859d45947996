//! Inbound provisioning commands.
//!
//! Every BLE write is a single message: a four-byte ASCII prefix followed
//! by an optional payload.
//!
//! | prefix | meaning                              |
//! |--------|--------------------------------------|
//! | `ssid` | set network id to the payload        |
//! | `pass` | set network secret to the payload    |
//! | `usid` | set account id to the payload        |
//! | `plid` | set device id to the payload         |
//! | `ssav` | commit staged settings (payload ignored) |
//!
//! Prefixes are case-sensitive.  Anything else is [`Command::Unrecognized`].

use crate::settings::Field;

/// Length of the command prefix.
pub const PREFIX_LEN: usize = 4;

/// Prefix that requests a commit.
pub const COMMIT_PREFIX: &[u8; PREFIX_LEN] = b"ssav";

/// A parsed inbound message.  Borrows the payload from the raw write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Stage `value` into `field` of the working copy.
    SetField(Field, &'a [u8]),
    /// Mark the working copy active and persist it.
    Commit,
    /// Unknown prefix or a message shorter than a prefix.
    Unrecognized(&'a [u8]),
}

/// Classify one raw message.  Total and allocation-free.
pub fn parse(raw: &[u8]) -> Command<'_> {
    let Some((prefix, payload)) = raw.split_at_checked(PREFIX_LEN) else {
        return Command::Unrecognized(raw);
    };

    if prefix == COMMIT_PREFIX {
        return Command::Commit;
    }

    match Field::from_prefix(prefix) {
        Some(field) => Command::SetField(field, payload),
        None => Command::Unrecognized(raw),
    }
}
