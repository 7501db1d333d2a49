//! API request/response types. These map directly to the JSON objects
//! travelling inside a `/cs` batch array.
//!
//! Each request carries its command under the `a` key; constructors set it
//! so callers cannot mismatch command and payload.

use serde::{Deserialize, Serialize};

// ── Authentication ────────────────────────────────────────────────────────────

/// `us` — start a session for a named or ephemeral account.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    a: &'static str,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uh: Option<String>,
}

impl LoginRequest {
    /// Named account: email plus the username hash derived under PK.
    pub fn named(email: &str, username_hash: String) -> Self {
        Self {
            a: "us",
            user: email.to_string(),
            uh: Some(username_hash),
        }
    }

    /// Ephemeral account: the user handle is the literal username.
    pub fn ephemeral(user_handle: &str) -> Self {
        Self {
            a: "us",
            user: user_handle.to_string(),
            uh: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// Master key wrapped with PK, url-base64.
    pub k: String,
    /// RSA challenge session id; preferred over `tsid` when both are present.
    #[serde(default)]
    pub csid: Option<String>,
    /// Self-authenticating temporary session id.
    #[serde(default)]
    pub tsid: Option<String>,
    /// Wrapped private key, sent alongside `csid`.
    #[serde(default)]
    pub privk: Option<String>,
    #[serde(default)]
    pub u: Option<String>,
}

/// `ug` — fetch the full user object for the current session.
#[derive(Debug, Serialize)]
pub struct GetUserRequest {
    a: &'static str,
}

impl GetUserRequest {
    pub fn new() -> Self {
        Self { a: "ug" }
    }
}

impl Default for GetUserRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    /// User handle.
    pub u: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pubk: Option<String>,
    #[serde(default)]
    pub privk: Option<String>,
}

// ── Account lifecycle ─────────────────────────────────────────────────────────

/// `up` — create or update an account. Registration sends `k` + `ts`;
/// confirmation sends `c` + `uh` + the RSA keypair. The server answers with
/// the user handle either way.
#[derive(Debug, Default, Serialize)]
pub struct UpdateUserRequest {
    a: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uh: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdateUserRequest {
    pub fn new() -> Self {
        Self {
            a: "up",
            ..Default::default()
        }
    }

    /// Ephemeral registration payload: wrapped master key + session proof.
    pub fn register(emk_b64: String, ts_b64: String) -> Self {
        Self {
            k: Some(emk_b64),
            ts: Some(ts_b64),
            ..Self::new()
        }
    }
}

/// `uc` — request a signup link for an ephemeral account.
#[derive(Debug, Serialize)]
pub struct SignupLinkRequest {
    a: &'static str,
    /// AES-ECB(PK, MK ‖ challenge), url-base64.
    pub c: String,
    /// Display name, url-base64.
    pub n: String,
    /// Email, url-base64.
    pub m: String,
}

impl SignupLinkRequest {
    pub fn new(challenge_b64: String, name_b64: String, email_b64: String) -> Self {
        Self {
            a: "uc",
            c: challenge_b64,
            n: name_b64,
            m: email_b64,
        }
    }
}

/// `ud` — decode a signup code from the confirmation link.
#[derive(Debug, Serialize)]
pub struct SignupDecodeRequest {
    a: &'static str,
    pub c: String,
}

impl SignupDecodeRequest {
    pub fn new(code: &str) -> Self {
        Self {
            a: "ud",
            c: code.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupDecodeResponse {
    /// Email, url-base64.
    pub e: String,
    /// Display name, url-base64.
    #[serde(default)]
    pub n: Option<String>,
    /// User handle of the pending account.
    pub uh: String,
    /// The signup challenge blob echoed back, url-base64.
    pub c: String,
}

/// `erx` — request an account-reset email.
#[derive(Debug, Serialize)]
pub struct ResetRequest {
    a: &'static str,
    pub m: String,
}

impl ResetRequest {
    pub fn new(email: &str) -> Self {
        Self {
            a: "erx",
            m: email.to_string(),
        }
    }
}

/// `erm` — complete an account reset with a fresh master key.
#[derive(Debug, Serialize)]
pub struct ResetCompleteRequest {
    a: &'static str,
    pub m: String,
    pub c: String,
    /// New wrapped master key, url-base64.
    pub k: String,
    /// Session proof under the new master key, url-base64.
    pub ts: String,
}

impl ResetCompleteRequest {
    pub fn new(email: &str, code: &str, emk_b64: String, ts_b64: String) -> Self {
        Self {
            a: "erm",
            m: email.to_string(),
            c: code.to_string(),
            k: emk_b64,
            ts: ts_b64,
        }
    }
}

// ── Filesystem ────────────────────────────────────────────────────────────────

/// `f` — fetch the complete node catalogue.
#[derive(Debug, Serialize)]
pub struct FilesRequest {
    a: &'static str,
    c: u8,
    r: u8,
}

impl FilesRequest {
    pub fn new() -> Self {
        Self { a: "f", c: 1, r: 1 }
    }
}

impl Default for FilesRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesResponse {
    /// Owner-wrapped share keys.
    #[serde(default)]
    pub ok: Vec<ShareKeyEntry>,
    /// Nodes.
    #[serde(default)]
    pub f: Vec<NodeEntry>,
    /// User relationships (contacts).
    #[serde(default)]
    pub u: Vec<UserRelation>,
}

/// One entry of `ok`: a share key wrapped with the owner's master key,
/// authenticated by `ha`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareKeyEntry {
    pub h: String,
    pub ha: String,
    pub k: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub h: String,
    /// Node type (0 file, 1 folder, 2 root, 3 inbox, 4 rubbish).
    pub t: i64,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default)]
    pub u: Option<String>,
    /// Encrypted attribute blob.
    #[serde(default)]
    pub a: Option<String>,
    /// `<owner>:<ciphertext>` key pairs.
    #[serde(default)]
    pub k: Option<String>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub ts: Option<i64>,
    /// Share-origin owner handle.
    #[serde(default)]
    pub su: Option<String>,
    /// Share key for this node (RSA- or AES-wrapped).
    #[serde(default)]
    pub sk: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRelation {
    pub u: String,
    /// Email.
    #[serde(default)]
    pub m: Option<String>,
    /// Relationship: 1 = accepted contact.
    #[serde(default)]
    pub c: Option<i64>,
}
