use crate::{
    identity::Identity,
    mechanism::cram_md5::{cram_md5_digest, CRAM_MD5},
    AuthError,
};

/// Credentials provided by the user and transmitted to the server.
#[derive(derive_more::Debug, Clone, Default, Eq, PartialEq)]
pub struct ClientCredentials {
    authcid: String,
    #[debug(skip)]
    secret: String,
    authzid: String,
}

impl ClientCredentials {
    pub fn new(authcid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            authcid: authcid.into(),
            secret: secret.into(),
            authzid: String::new(),
        }
    }

    /// Request authorization as another identity.
    pub fn with_authzid(mut self, authzid: impl Into<String>) -> Self {
        self.authzid = authzid.into();
        self
    }

    pub fn authcid(&self) -> &str {
        &self.authcid
    }

    /// The secret string, e.g. password or bearer token.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The authorization identity, or an empty string.
    pub fn authzid(&self) -> &str {
        &self.authzid
    }

    /// The identity being assumed: the authzid if given, otherwise the
    /// authcid.
    pub fn identity(&self) -> &str {
        if self.authzid.is_empty() {
            &self.authcid
        } else {
            &self.authzid
        }
    }
}

/// The result of verifying [`ServerCredentials`] against an [`Identity`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VerifyOutcome {
    /// The credentials were checked locally.
    Verified(bool),
    /// The credentials are structurally valid but must be authorized by the
    /// caller, e.g. by validating a bearer token.
    Deferred(ExternalVerification),
}

impl VerifyOutcome {
    /// True only for a successful local verification.
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified(true))
    }
}

#[derive(derive_more::Debug, Clone, Eq, PartialEq)]
pub struct ExternalVerification {
    /// The identity to authorize.
    pub authzid: String,
    /// A bearer token to validate for `authzid`, if the mechanism sent one.
    #[debug(skip)]
    pub token: Option<String>,
}

/// Credentials received from a client once a server-side exchange is
/// complete.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ServerCredentials {
    Plain(PlainCredentials),
    CramMd5(CramMd5Result),
    External(ExternalCredentials),
}

impl ServerCredentials {
    pub fn authcid(&self) -> &str {
        match self {
            ServerCredentials::Plain(creds) => &creds.authcid,
            ServerCredentials::CramMd5(creds) => &creds.authcid,
            ServerCredentials::External(_) => "",
        }
    }

    pub fn authzid(&self) -> &str {
        match self {
            ServerCredentials::Plain(creds) => &creds.authzid,
            ServerCredentials::CramMd5(creds) => &creds.authcid,
            ServerCredentials::External(creds) => &creds.authzid,
        }
    }

    /// Authenticate the credentials against the identity looked up for
    /// them, if any.
    pub fn verify(&self, identity: Option<&dyn Identity>) -> Result<VerifyOutcome, AuthError> {
        match self {
            ServerCredentials::Plain(creds) => creds.verify(identity).map(VerifyOutcome::Verified),
            ServerCredentials::CramMd5(creds) => {
                creds.verify(identity).map(VerifyOutcome::Verified)
            }
            ServerCredentials::External(creds) => Ok(creds.verify()),
        }
    }
}

/// Credentials of mechanisms that send the secret in cleartext, like PLAIN
/// and LOGIN.
#[derive(derive_more::Debug, Clone, Eq, PartialEq)]
pub struct PlainCredentials {
    authcid: String,
    #[debug(skip)]
    secret: String,
    authzid: String,
}

impl PlainCredentials {
    /// An empty authzid defaults to the authcid.
    pub fn new(authcid: String, secret: String, authzid: String) -> Self {
        let authzid = if authzid.is_empty() {
            authcid.clone()
        } else {
            authzid
        };
        Self {
            authcid,
            secret,
            authzid,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn verify(&self, identity: Option<&dyn Identity>) -> Result<bool, AuthError> {
        let Some(identity) = identity else {
            return Ok(false);
        };
        Ok(identity.compare_authcid(&self.authcid)? && identity.compare_secret(&self.secret)?)
    }
}

/// The CRAM-MD5 response. The secret never crosses the wire, so verifying
/// requires the identity's cleartext secret.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CramMd5Result {
    authcid: String,
    challenge: Vec<u8>,
    digest: Vec<u8>,
}

impl CramMd5Result {
    pub fn new(authcid: String, challenge: Vec<u8>, digest: Vec<u8>) -> Self {
        Self {
            authcid,
            challenge,
            digest,
        }
    }

    pub fn challenge(&self) -> &[u8] {
        &self.challenge
    }

    fn verify(&self, identity: Option<&dyn Identity>) -> Result<bool, AuthError> {
        let Some(identity) = identity else {
            return Ok(false);
        };
        let Some(secret) = identity.get_clear_secret() else {
            return Err(AuthError::MechanismUnusable(CRAM_MD5));
        };
        let expected = cram_md5_digest(secret.as_bytes(), &self.challenge)?;
        let digest_ok = constant_time_eq::constant_time_eq(expected.as_bytes(), &self.digest);
        Ok(identity.compare_authcid(&self.authcid)? && digest_ok)
    }
}

/// Credentials that can only be verified outside this crate, like EXTERNAL
/// and XOAUTH2.
#[derive(derive_more::Debug, Clone, Eq, PartialEq)]
pub struct ExternalCredentials {
    authzid: String,
    #[debug(skip)]
    token: Option<String>,
}

impl ExternalCredentials {
    pub fn new(authzid: String, token: Option<String>) -> Self {
        Self { authzid, token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn verify(&self) -> VerifyOutcome {
        VerifyOutcome::Deferred(ExternalVerification {
            authzid: self.authzid.clone(),
            token: self.token.clone(),
        })
    }
}
