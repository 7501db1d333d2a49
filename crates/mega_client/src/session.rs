//! Session lifecycle.
//!
//! A session moves from credentialed to open along one of three routes:
//! a fresh-enough on-disk record is resumed outright, a stale record is
//! revalidated with a `ug` probe and falls back to a full login if the
//! service rejects the saved sid, or — with nothing usable on disk — the
//! login flow runs (ephemeral or named, decided by the username shape).
//!
//! Every route that ends in an open session rewrites the two encrypted
//! blobs: the session record and the filesystem snapshot.
//!
//! Exported-folder mode bypasses all of it: the folder handle acts as the
//! session id under the `n` parameter and the supplied key is the master
//! key; nothing is persisted because no credentials exist.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zeroize::ZeroizeOnDrop;

use mega_crypto::aes::{aes_dec, aes_enc};
use mega_crypto::b64::{ub64dec, ub64enc};
use mega_crypto::buf::{random_bytes, random_key};
use mega_crypto::error::CryptoError;
use mega_crypto::kdf;
use mega_crypto::rsa::{self, RsaPrivate};
use mega_proto::api::{
    FilesRequest, FilesResponse, GetUserRequest, LoginRequest, LoginResponse, ResetCompleteRequest,
    ResetRequest, SignupDecodeRequest, SignupDecodeResponse, SignupLinkRequest, UpdateUserRequest,
    UserResponse,
};
use mega_proto::handshake;

use crate::api::{Api, SidParam};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fs::FileSystem;
use crate::store::BlobStore;
use crate::transport::{HttpTransport, Transport};

/// A resumed record older than this is revalidated before use.
const FRESHNESS_WINDOW_MS: i64 = 60 * 60 * 1000;
const FS_BLOB_NAME: &str = "fs";

/// Ephemeral usernames are the bare user handle: exactly 11 characters of
/// the url-base64 alphabet.
pub fn is_ephemeral(username: &str) -> bool {
    username.len() == 11
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// The persisted session record. Written JSON-encoded inside the encrypted
/// blob envelope; key material is zeroized when the record drops.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct SessionRecord {
    pub uh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mk: [u8; 16],
    pub pk: [u8; 16],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubk: Option<Vec<u8>>,
    /// Unwrapped private key in wire form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privk: Option<Vec<u8>>,
    pub sid: String,
    #[serde(rename = "sidParamName")]
    pub sid_param_name: String,
    /// Epoch millis of the last persist.
    pub saved: i64,
}

pub struct Session {
    config: ClientConfig,
    api: Api,
    username: Option<String>,
    password: Option<String>,
    session_name: String,
    state: Option<SessionRecord>,
    fs: Option<FileSystem>,
    exported: bool,
}

impl Session {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a session over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api: Api::new(config.clone(), transport),
            config,
            username: None,
            password: None,
            session_name: String::new(),
            state: None,
            fs: None,
            exported: false,
        }
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
    }

    /// Distinguish several saved sessions for the same account.
    pub fn set_session_name(&mut self, name: &str) {
        self.session_name = name.to_string();
    }

    /// Install an exported-folder session: the folder handle is the session
    /// id (under the `n` parameter) and `master_key` is the session's MK.
    pub fn set_exported_folder(&mut self, handle: &str, master_key: [u8; 16]) {
        self.exported = true;
        self.api
            .set_session(Some(handle.to_string()), SidParam::Node);
        self.state = Some(SessionRecord {
            uh: String::new(),
            email: None,
            name: None,
            mk: master_key,
            pk: [0u8; 16],
            pubk: None,
            privk: None,
            sid: handle.to_string(),
            sid_param_name: "n".to_string(),
            saved: Utc::now().timestamp_millis(),
        });
        info!(handle, "exported-folder session installed");
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&SessionRecord> {
        self.state.as_ref()
    }

    pub fn filesystem(&self) -> Option<&FileSystem> {
        self.fs.as_ref()
    }

    /// Direct access to the transaction engine, for RPCs this crate does
    /// not wrap.
    pub fn api_mut(&mut self) -> &mut Api {
        &mut self.api
    }

    // ── Open / close ──────────────────────────────────────────────────────────

    /// Bring the session to the open state: resume from disk when fresh,
    /// revalidate a stale sid, or log in from scratch. `force_check` skips
    /// the freshness shortcut and always probes the service.
    pub async fn open(&mut self, force_check: bool) -> Result<(), ClientError> {
        if self.state.is_some() {
            return Ok(());
        }
        if self.exported {
            return Err(ClientError::State("exported session lost its state"));
        }
        let username = self
            .username
            .clone()
            .ok_or(ClientError::State("credentials not set"))?;
        let password = self
            .password
            .clone()
            .ok_or(ClientError::State("credentials not set"))?;

        let pk = kdf::aes_key_from_password(&password);
        let store = BlobStore::new(pk.0, &username, &password);

        if let Some(mut record) = self.load_record(&store) {
            let age_ms = Utc::now().timestamp_millis() - record.saved;
            if (0..FRESHNESS_WINDOW_MS).contains(&age_ms) && !force_check {
                info!("resuming session from disk");
                self.install(record, &store);
                // Rewrite the blobs without touching the freshness anchor.
                self.persist(&store, false)?;
                return Ok(());
            }

            self.api
                .set_session(Some(record.sid.clone()), SidParam::Sid);
            match self.fetch_user().await {
                Ok(user) => {
                    merge_user(&mut record, user)?;
                    info!("saved session still valid");
                    self.install(record, &store);
                    self.persist(&store, true)?;
                    return Ok(());
                }
                Err(ClientError::Service(e)) => {
                    info!("saved session rejected ({e}), logging in again");
                }
                Err(e) => return Err(e),
            }
        }

        if is_ephemeral(&username) {
            self.login_ephemeral(&pk.0, &username).await?;
        } else {
            self.login(&pk.0, &username).await?;
        }
        let user = self.fetch_user().await?;
        let state = self.state.as_mut().expect("login installed the state");
        merge_user(state, user)?;
        self.persist(&store, true)?;
        info!(uh = %self.state.as_ref().expect("still open").uh, "session open");
        Ok(())
    }

    /// Drop the session and its on-disk blobs; credentials stay set.
    pub fn close(&mut self) {
        if let Some(store) = self.blob_store() {
            store.remove(&self.session_name);
            store.remove(&self.fs_blob_name());
        }
        self.state = None;
        self.fs = None;
        self.exported = false;
        self.api.set_session(None, SidParam::Sid);
        info!("session closed");
    }

    // ── Filesystem ────────────────────────────────────────────────────────────

    /// Fetch and materialise the node catalogue, replacing any previous
    /// snapshot, and rewrite the on-disk blobs.
    pub async fn load_filesystem(&mut self) -> Result<&FileSystem, ClientError> {
        let Some(state) = &self.state else {
            return Err(ClientError::State("session not open"));
        };
        let uh = state.uh.clone();
        let mk = state.mk;
        let privk_wire = state.privk.clone();

        let value = self
            .api
            .call(serde_json::to_value(FilesRequest::new())?)
            .await?;
        let resp: FilesResponse = serde_json::from_value(value)?;

        let privk = match &privk_wire {
            Some(wire) => Some(RsaPrivate::parse(wire)?),
            None => None,
        };
        let fs = FileSystem::build(&resp, &uh, &mk, privk.as_ref(), self.exported);
        self.fs = Some(fs);

        if let Some(store) = self.blob_store() {
            self.persist(&store, true)?;
        }
        Ok(self.fs.as_ref().expect("snapshot just installed"))
    }

    // ── Login flows ───────────────────────────────────────────────────────────

    async fn login(&mut self, pk: &[u8; 16], email: &str) -> Result<(), ClientError> {
        let hash = kdf::make_username_hash(pk, email);
        let value = self
            .api
            .call(serde_json::to_value(LoginRequest::named(email, hash))?)
            .await?;
        let resp: LoginResponse = serde_json::from_value(value)?;
        self.install_login(pk, resp, Some(email.to_string()))
    }

    async fn login_ephemeral(&mut self, pk: &[u8; 16], user_handle: &str) -> Result<(), ClientError> {
        let value = self
            .api
            .call(serde_json::to_value(LoginRequest::ephemeral(user_handle))?)
            .await?;
        let resp: LoginResponse = serde_json::from_value(value)?;
        self.install_login(pk, resp, None)
    }

    fn install_login(
        &mut self,
        pk: &[u8; 16],
        resp: LoginResponse,
        email: Option<String>,
    ) -> Result<(), ClientError> {
        let emk = ub64dec(&resp.k)?;
        let mk_plain = aes_dec(pk, &emk)?;
        let mk: [u8; 16] = mk_plain
            .get(..16)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                ClientError::Crypto(CryptoError::InvalidKey(
                    "wrapped master key too short".into(),
                ))
            })?;

        // csid wins when the response carries both session id forms.
        let (sid, privk_wire) = if let Some(csid) = &resp.csid {
            let wrapped_b64 = resp.privk.as_ref().ok_or(ClientError::SidDecrypt)?;
            let privk = RsaPrivate::unwrap(&mk, &ub64dec(wrapped_b64)?)?;
            let sid =
                handshake::decrypt_csid(&privk, csid).map_err(|_| ClientError::SidDecrypt)?;
            (sid, Some(privk.to_wire()))
        } else if let Some(tsid) = &resp.tsid {
            if !handshake::tsid_valid(&mk, tsid) {
                return Err(ClientError::InvalidTsid);
            }
            (tsid.clone(), None)
        } else {
            return Err(ClientError::UnexpectedResponse(
                "login response carries no session id".into(),
            ));
        };

        self.api.set_session(Some(sid.clone()), SidParam::Sid);
        self.state = Some(SessionRecord {
            uh: resp.u.unwrap_or_default(),
            email,
            name: None,
            mk,
            pk: *pk,
            pubk: None,
            privk: privk_wire,
            sid,
            sid_param_name: "sid".to_string(),
            saved: 0,
        });
        Ok(())
    }

    async fn fetch_user(&mut self) -> Result<UserResponse, ClientError> {
        let value = self
            .api
            .call(serde_json::to_value(GetUserRequest::new())?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // ── Account lifecycle ─────────────────────────────────────────────────────

    /// Create an ephemeral account. On success the session is credentialed
    /// with the returned user handle and the password; `open` then logs in.
    pub async fn register_ephemeral(&mut self, password: &str) -> Result<String, ClientError> {
        let pk = kdf::aes_key_from_password(password);
        let mk = random_key();
        let emk = aes_enc(&pk.0, &mk)?;
        let ts = handshake::make_ts_blob(&mk);
        let req = UpdateUserRequest::register(ub64enc(&emk), ub64enc(&ts));
        let value = self.api.call(serde_json::to_value(req)?).await?;
        let uh = match value.as_str() {
            Some(uh) => uh.to_string(),
            None => return Err(ClientError::UnexpectedResponse(value.to_string())),
        };
        self.set_credentials(&uh, password);
        info!(uh = %uh, "ephemeral account registered");
        Ok(uh)
    }

    /// Ask for a signup link to upgrade the open ephemeral session to a
    /// named account. The blob carries MK and an 8-byte random challenge
    /// with a zero tail, all wrapped under PK; the confirm step checks the
    /// tail to detect a wrong password.
    pub async fn request_signup_link(
        &mut self,
        email: &str,
        display_name: &str,
    ) -> Result<(), ClientError> {
        let Some(state) = &self.state else {
            return Err(ClientError::State("session not open"));
        };
        let mut plain = [0u8; 32];
        plain[..16].copy_from_slice(&state.mk);
        plain[16..24].copy_from_slice(&random_bytes(8));
        let c = ub64enc(&aes_enc(&state.pk, &plain)?);
        let req = SignupLinkRequest::new(
            c,
            ub64enc(display_name.as_bytes()),
            ub64enc(email.as_bytes()),
        );
        self.api.call(serde_json::to_value(req)?).await?;
        info!(email, "signup link requested");
        Ok(())
    }

    /// Complete a signup from the emailed code: recover MK under the
    /// password, verify the challenge tail, then finalise the account with
    /// the username hash and a fresh RSA keypair.
    pub async fn confirm_account(
        &mut self,
        code: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let value = self
            .api
            .call(serde_json::to_value(SignupDecodeRequest::new(code))?)
            .await?;
        let resp: SignupDecodeResponse = serde_json::from_value(value)?;
        let email = String::from_utf8(ub64dec(&resp.e)?)
            .map_err(|_| ClientError::UnexpectedResponse("signup email is not utf-8".into()))?;

        let pk = kdf::aes_key_from_password(password);
        let blob = aes_dec(&pk.0, &ub64dec(&resp.c)?)?;
        if blob.len() != 32 || blob[24..] != [0u8; 8] {
            return Err(ClientError::BadPassword);
        }
        let mk: [u8; 16] = blob[..16].try_into().expect("length checked");

        let keypair = rsa::generate_keypair(&mk, self.config.rsa_key_bits)?;
        let mut req = UpdateUserRequest::new();
        req.c = Some(code.to_string());
        req.uh = Some(kdf::make_username_hash(&pk.0, &email));
        req.pubk = Some(ub64enc(&keypair.pubk));
        req.privk = Some(ub64enc(&keypair.privk));
        let value = self.api.call(serde_json::to_value(req)?).await?;
        let uh = match value.as_str() {
            Some(uh) => uh.to_string(),
            None => return Err(ClientError::UnexpectedResponse(value.to_string())),
        };

        self.set_credentials(&email, password);
        info!(uh = %uh, "account confirmed");
        Ok(uh)
    }

    /// Ask the service to mail an account-reset code.
    pub async fn request_reset(&mut self, email: &str) -> Result<(), ClientError> {
        self.api
            .call(serde_json::to_value(ResetRequest::new(email))?)
            .await?;
        Ok(())
    }

    /// Complete a reset: a fresh master key wrapped under the new password,
    /// proven with the same challenge blob used at registration.
    pub async fn complete_reset(
        &mut self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let pk = kdf::aes_key_from_password(new_password);
        let mk = random_key();
        let emk = aes_enc(&pk.0, &mk)?;
        let ts = handshake::make_ts_blob(&mk);
        let req = ResetCompleteRequest::new(email, code, ub64enc(&emk), ub64enc(&ts));
        let value = self.api.call(serde_json::to_value(req)?).await?;
        let uh = match value.as_str() {
            Some(uh) => uh.to_string(),
            None => return Err(ClientError::UnexpectedResponse(value.to_string())),
        };
        self.set_credentials(email, new_password);
        info!(uh = %uh, "account reset complete");
        Ok(uh)
    }

    // ── Persistence helpers ───────────────────────────────────────────────────

    fn fs_blob_name(&self) -> String {
        format!("{}{}", self.session_name, FS_BLOB_NAME)
    }

    fn blob_store(&self) -> Option<BlobStore> {
        if self.exported {
            return None;
        }
        let state = self.state.as_ref()?;
        let username = self.username.as_deref()?;
        let password = self.password.as_deref()?;
        Some(BlobStore::new(state.pk, username, password))
    }

    fn load_record(&self, store: &BlobStore) -> Option<SessionRecord> {
        let bytes = store.load(&self.session_name)?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("session record unparseable, ignoring: {e}");
                None
            }
        }
    }

    fn install(&mut self, record: SessionRecord, store: &BlobStore) {
        let param = if record.sid_param_name == "n" {
            SidParam::Node
        } else {
            SidParam::Sid
        };
        self.api.set_session(Some(record.sid.clone()), param);
        self.state = Some(record);
        self.fs = store
            .load(&self.fs_blob_name())
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());
    }

    /// Rewrite both blobs. `refresh_saved` stamps the record with the
    /// current time; resuming an already-fresh record keeps its anchor so
    /// the freshness window does not slide.
    fn persist(&mut self, store: &BlobStore, refresh_saved: bool) -> Result<(), ClientError> {
        let Some(state) = &mut self.state else {
            return Err(ClientError::State("nothing to persist"));
        };
        if refresh_saved {
            state.saved = Utc::now().timestamp_millis();
        }
        store.save(&self.session_name, &serde_json::to_vec(&*state)?)?;
        let snapshot = match &self.fs {
            Some(fs) => serde_json::to_vec(fs)?,
            None => serde_json::to_vec(&FileSystem::default())?,
        };
        store.save(&self.fs_blob_name(), &snapshot)?;
        Ok(())
    }
}

fn merge_user(record: &mut SessionRecord, user: UserResponse) -> Result<(), ClientError> {
    record.uh = user.u;
    if user.email.is_some() {
        record.email = user.email;
    }
    if user.name.is_some() {
        record.name = user.name;
    }
    if let Some(pubk) = user.pubk {
        record.pubk = Some(ub64dec(&pubk)?);
    }
    if let Some(privk_b64) = user.privk {
        if record.privk.is_none() {
            let privk = RsaPrivate::unwrap(&record.mk, &ub64dec(&privk_b64)?)?;
            record.privk = Some(privk.to_wire());
        }
    }
    Ok(())
}
