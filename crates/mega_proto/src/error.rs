//! Service error taxonomy.
//!
//! The API reports failure as a negative integer, either for a whole batch
//! (scalar response) or per request (array position). Every integer the
//! server is known to emit maps to a symbolic name with a canonical message;
//! anything unmapped surfaces as `Unknown` rather than being dropped.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("EINTERNAL (-1): Internal error")]
    Internal,
    #[error("EARGS (-2): Invalid argument")]
    Args,
    #[error("EAGAIN (-3): Request failed, retrying")]
    Again,
    #[error("ERATELIMIT (-4): Rate limit exceeded")]
    RateLimit,
    #[error("EFAILED (-5): Failed permanently")]
    Failed,
    #[error("ETOOMANY (-6): Too many concurrent connections or transfers")]
    TooMany,
    #[error("ERANGE (-7): Out of range")]
    Range,
    #[error("EEXPIRED (-8): Expired")]
    Expired,
    #[error("ENOENT (-9): Not found")]
    NoEnt,
    #[error("ECIRCULAR (-10): Circular linkage detected")]
    Circular,
    #[error("EACCESS (-11): Access denied")]
    Access,
    #[error("EEXIST (-12): Already exists")]
    Exist,
    #[error("EINCOMPLETE (-13): Incomplete")]
    Incomplete,
    #[error("EKEY (-14): Invalid key or decryption error")]
    Key,
    #[error("ESID (-15): Bad session ID")]
    Sid,
    #[error("EBLOCKED (-16): Blocked")]
    Blocked,
    #[error("EOVERQUOTA (-17): Over quota")]
    OverQuota,
    #[error("ETEMPUNAVAIL (-18): Temporarily not available")]
    TempUnavail,
    #[error("ETOOMANYCONNECTIONS (-19): Connection overflow")]
    TooManyConnections,
    #[error("EWRITE (-20): Write error")]
    Write,
    #[error("EREAD (-21): Read error")]
    Read,
    #[error("EAPPKEY (-22): Invalid application key")]
    AppKey,
    #[error("EUNKNOWN ({0}): Unknown error")]
    Unknown(i64),
}

impl ServiceError {
    pub fn from_code(code: i64) -> Self {
        use ServiceError::*;
        match code {
            -1 => Internal,
            -2 => Args,
            -3 => Again,
            -4 => RateLimit,
            -5 => Failed,
            -6 => TooMany,
            -7 => Range,
            -8 => Expired,
            -9 => NoEnt,
            -10 => Circular,
            -11 => Access,
            -12 => Exist,
            -13 => Incomplete,
            -14 => Key,
            -15 => Sid,
            -16 => Blocked,
            -17 => OverQuota,
            -18 => TempUnavail,
            -19 => TooManyConnections,
            -20 => Write,
            -21 => Read,
            -22 => AppKey,
            other => Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        use ServiceError::*;
        match self {
            Internal => -1,
            Args => -2,
            Again => -3,
            RateLimit => -4,
            Failed => -5,
            TooMany => -6,
            Range => -7,
            Expired => -8,
            NoEnt => -9,
            Circular => -10,
            Access => -11,
            Exist => -12,
            Incomplete => -13,
            Key => -14,
            Sid => -15,
            Blocked => -16,
            OverQuota => -17,
            TempUnavail => -18,
            TooManyConnections => -19,
            Write => -20,
            Read => -21,
            AppKey => -22,
            Unknown(code) => *code,
        }
    }

    /// Symbolic name, e.g. "ENOENT".
    pub fn name(&self) -> &'static str {
        use ServiceError::*;
        match self {
            Internal => "EINTERNAL",
            Args => "EARGS",
            Again => "EAGAIN",
            RateLimit => "ERATELIMIT",
            Failed => "EFAILED",
            TooMany => "ETOOMANY",
            Range => "ERANGE",
            Expired => "EEXPIRED",
            NoEnt => "ENOENT",
            Circular => "ECIRCULAR",
            Access => "EACCESS",
            Exist => "EEXIST",
            Incomplete => "EINCOMPLETE",
            Key => "EKEY",
            Sid => "ESID",
            Blocked => "EBLOCKED",
            OverQuota => "EOVERQUOTA",
            TempUnavail => "ETEMPUNAVAIL",
            TooManyConnections => "ETOOMANYCONNECTIONS",
            Write => "EWRITE",
            Read => "EREAD",
            AppKey => "EAPPKEY",
            Unknown(_) => "EUNKNOWN",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] mega_crypto::CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Malformed node key field: {0}")]
    MalformedKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_roundtrips() {
        for code in -22..=-1 {
            let err = ServiceError::from_code(code);
            assert_eq!(err.code(), code);
            assert!(!matches!(err, ServiceError::Unknown(_)));
        }
    }

    #[test]
    fn unmapped_codes_surface_as_unknown() {
        let err = ServiceError::from_code(-99);
        assert_eq!(err, ServiceError::Unknown(-99));
        assert_eq!(err.code(), -99);
        assert_eq!(err.name(), "EUNKNOWN");
    }

    #[test]
    fn not_found_display() {
        let err = ServiceError::from_code(-9);
        assert_eq!(err.name(), "ENOENT");
        assert_eq!(err.to_string(), "ENOENT (-9): Not found");
    }
}
