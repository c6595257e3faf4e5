use crate::{
    hashing::{Cleartext, HashInterface},
    prep::{PrepError, Preparation},
    AuthError,
};
use std::sync::Arc;

/// A server-side identity that credentials are authenticated against.
/// Identities are supplied by the application's identity store.
pub trait Identity {
    /// The authentication identity, e.g. a login username.
    fn authcid(&self) -> &str;

    /// Compare the identity's authcid with the given one. Both sides are
    /// prepared and compared in constant time.
    fn compare_authcid(&self, authcid: &str) -> Result<bool, AuthError>;

    /// Compare the identity's secret with the given one, accounting for any
    /// hashing of the stored secret.
    fn compare_secret(&self, secret: &str) -> Result<bool, AuthError>;

    /// The prepared cleartext secret, if the identity has it.
    fn get_clear_secret(&self) -> Option<&str>;
}

fn compare_prepared(prepare: Preparation, ours: &str, theirs: &str) -> Result<bool, PrepError> {
    let ours = prepare.prepare(ours)?;
    let theirs = prepare.prepare(theirs)?;
    Ok(constant_time_eq::constant_time_eq(
        ours.as_bytes(),
        theirs.as_bytes(),
    ))
}

/// An [`Identity`] holding its secret in cleartext.
#[derive(derive_more::Debug, Clone)]
pub struct ClearIdentity {
    authcid: String,
    #[debug(skip)]
    secret: String,
    prepare: Preparation,
}

impl ClearIdentity {
    pub fn new(authcid: impl Into<String>, secret: &str) -> Result<Self, PrepError> {
        Self::with_prepare(authcid, secret, Preparation::default())
    }

    /// The secret is prepared once, here.
    pub fn with_prepare(
        authcid: impl Into<String>,
        secret: &str,
        prepare: Preparation,
    ) -> Result<Self, PrepError> {
        Ok(Self {
            authcid: authcid.into(),
            secret: prepare.prepare(secret)?.into_owned(),
            prepare,
        })
    }
}

impl Identity for ClearIdentity {
    fn authcid(&self) -> &str {
        &self.authcid
    }

    fn compare_authcid(&self, authcid: &str) -> Result<bool, AuthError> {
        Ok(compare_prepared(self.prepare, &self.authcid, authcid)?)
    }

    fn compare_secret(&self, secret: &str) -> Result<bool, AuthError> {
        let secret = self.prepare.prepare(secret)?;
        Ok(constant_time_eq::constant_time_eq(
            self.secret.as_bytes(),
            secret.as_bytes(),
        ))
    }

    fn get_clear_secret(&self) -> Option<&str> {
        Some(&self.secret)
    }
}

/// An [`Identity`] whose secret was hashed for storage.
#[derive(derive_more::Debug, Clone)]
pub struct HashedIdentity {
    authcid: String,
    #[debug(skip)]
    digest: String,
    hash: Arc<dyn HashInterface>,
    prepare: Preparation,
}

impl HashedIdentity {
    pub fn new(
        authcid: impl Into<String>,
        digest: impl Into<String>,
        hash: Arc<dyn HashInterface>,
    ) -> Self {
        Self::with_prepare(authcid, digest, hash, Preparation::default())
    }

    pub fn with_prepare(
        authcid: impl Into<String>,
        digest: impl Into<String>,
        hash: Arc<dyn HashInterface>,
        prepare: Preparation,
    ) -> Self {
        Self {
            authcid: authcid.into(),
            digest: digest.into(),
            hash,
            prepare,
        }
    }

    /// Prepare and hash the secret, returning the identity to store.
    ///
    /// ```
    /// # use gel_sasl::{hashing::*, identity::*};
    /// # use std::sync::Arc;
    /// let hash = Arc::new(Pbkdf2Hash::new(HashName::Sha256, 16, 1000).unwrap());
    /// let identity = HashedIdentity::create("user", "pass\u{00AD}word", hash).unwrap();
    /// assert!(identity.compare_secret("password").unwrap());
    /// assert!(identity.get_clear_secret().is_none());
    /// ```
    pub fn create(
        authcid: impl Into<String>,
        secret: &str,
        hash: Arc<dyn HashInterface>,
    ) -> Result<Self, PrepError> {
        Self::create_with_prepare(authcid, secret, hash, Preparation::default())
    }

    pub fn create_with_prepare(
        authcid: impl Into<String>,
        secret: &str,
        hash: Arc<dyn HashInterface>,
        prepare: Preparation,
    ) -> Result<Self, PrepError> {
        let digest = hash.hash(&prepare.prepare(secret)?);
        Ok(Self::with_prepare(authcid, digest, hash, prepare))
    }

    /// Store a secret without hashing it.
    pub fn cleartext(authcid: impl Into<String>, secret: &str) -> Result<Self, PrepError> {
        Self::create(authcid, secret, Arc::new(Cleartext))
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn hash(&self) -> &Arc<dyn HashInterface> {
        &self.hash
    }
}

impl Identity for HashedIdentity {
    fn authcid(&self) -> &str {
        &self.authcid
    }

    fn compare_authcid(&self, authcid: &str) -> Result<bool, AuthError> {
        Ok(compare_prepared(self.prepare, &self.authcid, authcid)?)
    }

    fn compare_secret(&self, secret: &str) -> Result<bool, AuthError> {
        let secret = self.prepare.prepare(secret)?;
        Ok(self.hash.verify(&secret, &self.digest)?)
    }

    fn get_clear_secret(&self) -> Option<&str> {
        self.hash.is_cleartext().then_some(self.digest.as_str())
    }
}
