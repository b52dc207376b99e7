/// Hardware (MAC) addresses: parsing operator input, formatting, comparison.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Maximum length for MAC address strings ("aa:bb:cc:dd:ee:ff")
pub type MacString = heapless::String<18>;

/// A 6-byte link-layer hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

/// Operator input that is not six colon-separated hex bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidAddressFormat {
    #[error("expected 6 colon-separated bytes, found {0}")]
    WrongLength(usize),
    #[error("byte {index} is not a two-digit hex value")]
    BadByte { index: usize },
}

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    /// Read an address out of a 6-byte slice. Returns `None` on any other length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(MacAddr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Format into a fixed-capacity string without allocating.
    pub fn to_mac_string(&self) -> MacString {
        use core::fmt::Write;
        let mut s = MacString::new();
        let _ = write!(s, "{}", self);
        s
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = InvalidAddressFormat;

    /// Parse `xx:xx:xx:xx:xx:xx`. Hex digits are case-insensitive and
    /// surrounding whitespace is ignored; each byte must be exactly two digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut count = 0;
        for (index, part) in s.trim().split(':').enumerate() {
            if index >= out.len() {
                count = index + 1;
                continue;
            }
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(InvalidAddressFormat::BadByte { index });
            }
            out[index] = u8::from_str_radix(part, 16)
                .map_err(|_| InvalidAddressFormat::BadByte { index })?;
            count = index + 1;
        }
        if count != out.len() {
            return Err(InvalidAddressFormat::WrongLength(count));
        }
        Ok(MacAddr(out))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}
