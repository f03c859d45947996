//! Persisted node settings and their fixed-layout on-flash encoding.
//!
//! The record is a flat 119-byte image made of NUL-padded fields at fixed
//! offsets:
//!
//! ```text
//!  offset  width  field
//!  ──────  ─────  ──────────────────────────────────
//!       0      5  mode tag   ("wifi\0" = telemetry)
//!       5     32  network id (SSID)
//!      37     32  network secret
//!      69     29  account id
//!      98     21  device id
//!  ──────  ─────
//!             119
//! ```
//!
//! Each text field holds at most `width - 1` bytes so there is always a
//! terminator.  Decoding is total: any byte image yields a record, and
//! anything that is not exactly the telemetry tag reads as unconfigured.

use core::fmt;

use heapless::String;

pub const MODE_OFFSET: usize = 0;
pub const MODE_WIDTH: usize = 5;
pub const NETWORK_ID_WIDTH: usize = 32;
pub const NETWORK_SECRET_WIDTH: usize = 32;
pub const ACCOUNT_ID_WIDTH: usize = 29;
pub const DEVICE_ID_WIDTH: usize = 21;

/// Total encoded length of a [`SettingsRecord`].
pub const RECORD_LEN: usize =
    MODE_WIDTH + NETWORK_ID_WIDTH + NETWORK_SECRET_WIDTH + ACCOUNT_ID_WIDTH + DEVICE_ID_WIDTH;

/// Mode tag bytes for [`Mode::WifiActive`], terminator included.
const WIFI_TAG: [u8; MODE_WIDTH] = *b"wifi\0";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No committed configuration; the node boots into provisioning.
    #[default]
    Unconfigured,
    /// Settings were committed; the node boots into telemetry.
    WifiActive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::WifiActive => write!(f, "wifi"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A settable text field of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    NetworkId,
    NetworkSecret,
    AccountId,
    DeviceId,
}

impl Field {
    /// All fields in record order.
    pub const ALL: [Self; 4] = [
        Self::NetworkId,
        Self::NetworkSecret,
        Self::AccountId,
        Self::DeviceId,
    ];

    /// Four-byte command prefix that targets this field.
    pub const fn prefix(self) -> &'static [u8; 4] {
        match self {
            Self::NetworkId => b"ssid",
            Self::NetworkSecret => b"pass",
            Self::AccountId => b"usid",
            Self::DeviceId => b"plid",
        }
    }

    pub fn from_prefix(prefix: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.prefix().as_slice() == prefix)
    }

    /// Encoded width, terminator included.
    pub const fn width(self) -> usize {
        match self {
            Self::NetworkId => NETWORK_ID_WIDTH,
            Self::NetworkSecret => NETWORK_SECRET_WIDTH,
            Self::AccountId => ACCOUNT_ID_WIDTH,
            Self::DeviceId => DEVICE_ID_WIDTH,
        }
    }

    /// Longest content the field can hold.
    pub const fn max_len(self) -> usize {
        self.width() - 1
    }

    pub const fn offset(self) -> usize {
        match self {
            Self::NetworkId => MODE_OFFSET + MODE_WIDTH,
            Self::NetworkSecret => Self::NetworkId.offset() + NETWORK_ID_WIDTH,
            Self::AccountId => Self::NetworkSecret.offset() + NETWORK_SECRET_WIDTH,
            Self::DeviceId => Self::AccountId.offset() + ACCOUNT_ID_WIDTH,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::NetworkId => "network_id",
            Self::NetworkSecret => "network_secret",
            Self::AccountId => "account_id",
            Self::DeviceId => "device_id",
        }
    }

    /// Fields whose content must never reach the log.
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::NetworkSecret)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Result of storing one field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWrite {
    /// Bytes actually kept.
    pub stored_len: usize,
    /// `true` when input was cut (length bound, NUL, or a split UTF-8 char).
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsRecord {
    pub mode: Mode,
    pub network_id: String<{ NETWORK_ID_WIDTH - 1 }>,
    pub network_secret: String<{ NETWORK_SECRET_WIDTH - 1 }>,
    pub account_id: String<{ ACCOUNT_ID_WIDTH - 1 }>,
    pub device_id: String<{ DEVICE_ID_WIDTH - 1 }>,
}

impl SettingsRecord {
    /// An all-empty, unconfigured record.
    pub const fn new() -> Self {
        Self {
            mode: Mode::Unconfigured,
            network_id: String::new(),
            network_secret: String::new(),
            account_id: String::new(),
            device_id: String::new(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::NetworkId => &self.network_id,
            Field::NetworkSecret => &self.network_secret,
            Field::AccountId => &self.account_id,
            Field::DeviceId => &self.device_id,
        }
    }

    /// Overwrite `field` with `value`, truncated to the field's bound.
    ///
    /// Content stops at the first NUL byte and at the last complete UTF-8
    /// character that fits, so the stored text always survives an
    /// encode/decode cycle unchanged.
    pub fn set_field(&mut self, field: Field, value: &[u8]) -> FieldWrite {
        let text = bounded_text(value, field.max_len());
        let write = FieldWrite {
            stored_len: text.len(),
            truncated: text.len() != value.len(),
        };
        // `bounded_text` never exceeds the capacity, so the pushes below
        // cannot fail.
        match field {
            Field::NetworkId => replace(&mut self.network_id, text),
            Field::NetworkSecret => replace(&mut self.network_secret, text),
            Field::AccountId => replace(&mut self.account_id, text),
            Field::DeviceId => replace(&mut self.device_id, text),
        }
        write
    }

    /// First empty field in record order, if any.
    pub fn missing_field(&self) -> Option<Field> {
        Field::ALL.into_iter().find(|f| self.get(*f).is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Committed and carrying everything telemetry needs.
    pub fn is_telemetry_ready(&self) -> bool {
        self.mode == Mode::WifiActive && self.is_complete()
    }
}

fn replace<const N: usize>(slot: &mut String<N>, text: &str) {
    slot.clear();
    let _ = slot.push_str(text);
}

/// Longest valid UTF-8 prefix of `value` that stops before any NUL and is at
/// most `max` bytes.
fn bounded_text(value: &[u8], max: usize) -> &str {
    let end = value
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(value.len())
        .min(max);
    utf8_prefix(&value[..end])
}

fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialise `record` into its fixed on-flash image.
pub fn encode(record: &SettingsRecord) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    if record.mode == Mode::WifiActive {
        out[MODE_OFFSET..MODE_OFFSET + MODE_WIDTH].copy_from_slice(&WIFI_TAG);
    }
    for field in Field::ALL {
        let text = record.get(field).as_bytes();
        let start = field.offset();
        out[start..start + text.len()].copy_from_slice(text);
    }
    out
}

/// Parse an on-flash image.  Never fails.
pub fn decode(bytes: &[u8; RECORD_LEN]) -> SettingsRecord {
    let mut record = SettingsRecord::new();
    if bytes[MODE_OFFSET..MODE_OFFSET + MODE_WIDTH] == WIFI_TAG {
        record.mode = Mode::WifiActive;
    }
    for field in Field::ALL {
        let start = field.offset();
        record.set_field(field, &bytes[start..start + field.width()]);
    }
    record
}
