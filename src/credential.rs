// src/credential.rs

//! CURVE identity credentials.
//!
//! A credential is the key pair one side of a connection authenticates
//! with. Each `LogTail` holds two: the client's own key pair, applied to
//! the socket, and the server's public key, pinned so the handshake only
//! succeeds against that publisher.
//!
//! Credentials are read from CZMQ certificate files:
//!
//! ```text
//! #   ****  Generated by CZMQ  ****
//! metadata
//!     name = "collector-1"
//! curve
//!     public-key = "rq:rM>}U?@Lns47E1%kR.o@n%FcmmsL/@{H8]yf7"
//!     secret-key = "JTKVSB%%)wK0E.X)V>+}o?pNmC{O&4W4b!Ni{Lh6"
//! ```
//!
//! Keys are Z85-encoded 32 byte values. CZMQ stores the secret half in a
//! sibling file named `<path>_secret`; [`IdentityCredential::load`] reads
//! that sibling when it exists, like `zcert_load` does.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::{Result, TailError};

/// Length of a raw CURVE key.
pub const KEY_LEN: usize = 32;

/// Length of a Z85-encoded CURVE key.
pub const Z85_KEY_LEN: usize = 40;

const Z85_ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// A CURVE public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveKey([u8; KEY_LEN]);

impl CurveKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 40 character Z85 key.
    pub fn from_z85(text: &str) -> std::result::Result<Self, String> {
        decode_key(text).map(|bytes| Self(*bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_z85(&self) -> String {
        z85_encode(&self.0)
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_z85())
    }
}

impl fmt::Debug for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurveKey({})", self.to_z85())
    }
}

/// A CURVE secret key. Wiped from memory on drop.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<[u8; KEY_LEN]>);

impl SecretKey {
    pub fn from_z85(text: &str) -> std::result::Result<Self, String> {
        decode_key(text).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// A key pair loaded from a certificate file.
///
/// Server credentials usually carry only the public key; client
/// credentials need both halves.
#[derive(Clone, Debug)]
pub struct IdentityCredential {
    public: CurveKey,
    secret: Option<SecretKey>,
    metadata: Vec<(String, String)>,
    source: PathBuf,
}

impl IdentityCredential {
    /// Load a credential from `path`, preferring `<path>_secret`.
    ///
    /// # Errors
    ///
    /// [`TailError::Credential`] naming `path` when neither file can be read
    /// or the certificate has no valid `public-key`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        // ---
        let path = path.as_ref();

        let mut secret_path = OsString::from(path.as_os_str());
        secret_path.push("_secret");
        let secret_path = PathBuf::from(secret_path);

        let (source, text) = match std::fs::read_to_string(&secret_path) {
            Ok(text) => (secret_path, text),
            Err(_) => match std::fs::read_to_string(path) {
                Ok(text) => (path.to_path_buf(), text),
                Err(err) => {
                    return Err(TailError::Credential {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    })
                }
            },
        };

        crate::log_debug!("loading credential from {}", source.display());
        Self::parse(&text, source)
    }

    /// Parse certificate text. `source` is only used in error messages.
    pub fn parse(text: &str, source: impl Into<PathBuf>) -> Result<Self> {
        // ---
        let source = source.into();
        let fail = |reason: String| TailError::Credential {
            path: source.display().to_string(),
            reason,
        };

        let entries = parse_zpl(text).map_err(&fail)?;

        let mut public = None;
        let mut secret = None;
        let mut metadata = Vec::new();

        for (section, key, value) in entries {
            match (section.as_str(), key.as_str()) {
                ("curve", "public-key") => {
                    let key = CurveKey::from_z85(&value).map_err(|e| fail(format!("public-key: {e}")))?;
                    public = Some(key);
                }
                ("curve", "secret-key") => {
                    let key = SecretKey::from_z85(&value).map_err(|e| fail(format!("secret-key: {e}")))?;
                    secret = Some(key);
                }
                ("metadata", _) => metadata.push((key, value)),
                _ => {}
            }
        }

        let public = public.ok_or_else(|| fail("no curve public-key".into()))?;

        Ok(Self {
            public,
            secret,
            metadata,
            source,
        })
    }

    pub fn public(&self) -> &CurveKey {
        &self.public
    }

    pub fn secret(&self) -> Option<&SecretKey> {
        self.secret.as_ref()
    }

    /// Certificate metadata, in file order.
    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Look up one metadata value.
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The file this credential was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Fail unless the secret half is present.
    pub(crate) fn require_secret(&self) -> Result<&SecretKey> {
        self.secret.as_ref().ok_or_else(|| TailError::Credential {
            path: self.source.display().to_string(),
            reason: "certificate has no curve secret-key".into(),
        })
    }
}

// (section, key, value) triples for every `key = value` nested one level
// under a top-level section. Deeper nesting is ignored.
fn parse_zpl(text: &str) -> std::result::Result<Vec<(String, String, String)>, String> {
    // ---
    let mut entries = Vec::new();
    let mut section: Option<String> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let body = line.trim_start();

        if body.is_empty() || body.starts_with('#') {
            continue;
        }

        let indent = line.len() - body.len();

        if indent == 0 {
            let name = body.split(['=', '#']).next().unwrap_or_default().trim();
            section = Some(name.to_string());
            continue;
        }

        if indent != 4 {
            continue;
        }

        let Some(current) = section.as_ref() else {
            return Err(format!("line {}: entry outside of a section", lineno + 1));
        };

        let Some((key, value)) = body.split_once('=') else {
            // a nested section header; its children sit deeper and are skipped
            continue;
        };

        let value = unquote(value.trim())
            .ok_or_else(|| format!("line {}: unterminated quoted value", lineno + 1))?;

        entries.push((current.clone(), key.trim().to_string(), value));
    }

    Ok(entries)
}

fn unquote(value: &str) -> Option<String> {
    // ---
    match value.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let rest = &value[1..];
            rest.find(quote).map(|end| rest[..end].to_string())
        }
        _ => {
            let bare = value.split('#').next().unwrap_or_default();
            Some(bare.trim().to_string())
        }
    }
}

fn decode_key(text: &str) -> std::result::Result<Zeroizing<[u8; KEY_LEN]>, String> {
    // ---
    if text.len() != Z85_KEY_LEN {
        return Err(format!(
            "expected {Z85_KEY_LEN} Z85 characters, found {}",
            text.len()
        ));
    }

    let decoded = Zeroizing::new(z85_decode(text)?);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&decoded);
    Ok(key)
}

/// Decode Z85 text (ZeroMQ RFC 32). Length must be a multiple of 5.
pub fn z85_decode(text: &str) -> std::result::Result<Vec<u8>, String> {
    // ---
    let input = text.as_bytes();
    if input.len() % 5 != 0 {
        return Err(format!("Z85 length {} is not a multiple of 5", input.len()));
    }

    let mut out = Vec::with_capacity(input.len() / 5 * 4);

    for chunk in input.chunks(5) {
        let mut value: u64 = 0;
        for &c in chunk {
            let digit = Z85_ALPHABET
                .iter()
                .position(|&a| a == c)
                .ok_or_else(|| format!("invalid Z85 character {:?}", c as char))?;
            value = value * 85 + digit as u64;
        }

        let value = u32::try_from(value).map_err(|_| "Z85 block out of range".to_string())?;
        out.extend_from_slice(&value.to_be_bytes());
    }

    Ok(out)
}

/// Encode bytes as Z85. Length must be a multiple of 4.
pub fn z85_encode(bytes: &[u8]) -> String {
    // ---
    let mut out = String::with_capacity(bytes.len() / 4 * 5);

    for chunk in bytes.chunks_exact(4) {
        let mut value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let mut block = [0u8; 5];
        for slot in block.iter_mut().rev() {
            *slot = Z85_ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.extend(block.iter().map(|&b| b as char));
    }

    out
}
