//! Hashing and verification of stored secrets.
//!
//! The builtin [`Pbkdf2Hash`] produces digest strings in the modular crypt
//! style used by passlib's `pbkdf2_*` hashes, so that stored digests remain
//! portable between implementations:
//!
//! ```text
//! $pbkdf2-sha256$<rounds>$<base64 salt>$<base64 digest>
//! ```
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    prelude::*,
};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::{fmt::Debug, num::NonZeroU32, str::FromStr, sync::Arc};

/// Decodes both padded and unpadded base64.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum HashError {
    #[error("Malformed digest: {0}")]
    MalformedDigest(&'static str),
    #[error("Unknown hash name: {0}")]
    UnknownHashName(String),
    #[error("Invalid rounds: {0}")]
    InvalidRounds(u32),
}

/// An algorithm that hashes secrets for storage and verifies secrets against
/// stored digests.
///
/// Implementations hold only their parameters and never change after
/// construction.
pub trait HashInterface: Debug + Send + Sync {
    /// Hash the secret, returning the digest string to store.
    fn hash(&self, secret: &str) -> String;

    /// Check the secret against a stored digest string. A digest that cannot
    /// be parsed is an error rather than a mismatch.
    fn verify(&self, secret: &str, digest: &str) -> Result<bool, HashError>;

    /// Return a new hash with the given parameters replaced.
    fn copy(&self, overrides: &HashOverrides) -> Arc<dyn HashInterface>;

    /// True if digests produced by this hash are the secrets themselves.
    fn is_cleartext(&self) -> bool {
        false
    }
}

/// Parameters to replace when copying a [`HashInterface`]. Parameters a
/// hash does not have are ignored.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct HashOverrides {
    pub hash_name: Option<HashName>,
    pub salt_len: Option<usize>,
    pub rounds: Option<NonZeroU32>,
}

/// The HMAC digest used by PBKDF2.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum HashName {
    Sha1,
    #[default]
    Sha256,
    Sha512,
}

impl HashName {
    /// The algorithm tag used in the digest string.
    pub fn tag(&self) -> &'static str {
        match self {
            HashName::Sha1 => "pbkdf2",
            HashName::Sha256 => "pbkdf2-sha256",
            HashName::Sha512 => "pbkdf2-sha512",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pbkdf2" => Some(HashName::Sha1),
            "pbkdf2-sha256" => Some(HashName::Sha256),
            "pbkdf2-sha512" => Some(HashName::Sha512),
            _ => None,
        }
    }

    /// The size of the derived digest, which is the HMAC output size.
    pub fn output_len(&self) -> usize {
        match self {
            HashName::Sha1 => 20,
            HashName::Sha256 => 32,
            HashName::Sha512 => 64,
        }
    }

    fn derive(&self, secret: &[u8], salt: &[u8], rounds: u32) -> Vec<u8> {
        let mut out = vec![0; self.output_len()];
        match self {
            HashName::Sha1 => pbkdf2::pbkdf2_hmac::<Sha1>(secret, salt, rounds, &mut out),
            HashName::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, rounds, &mut out),
            HashName::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(secret, salt, rounds, &mut out),
        }
        out
    }
}

impl FromStr for HashName {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(HashName::Sha1),
            "sha256" => Ok(HashName::Sha256),
            "sha512" => Ok(HashName::Sha512),
            _ => Err(HashError::UnknownHashName(s.to_owned())),
        }
    }
}

const DEFAULT_ROUNDS: NonZeroU32 = match NonZeroU32::new(1_000_000) {
    Some(rounds) => rounds,
    None => unreachable!(),
};

/// PBKDF2-HMAC with a random salt per digest.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Pbkdf2Hash {
    hash_name: HashName,
    salt_len: usize,
    rounds: NonZeroU32,
}

impl Default for Pbkdf2Hash {
    fn default() -> Self {
        Self {
            hash_name: HashName::Sha256,
            salt_len: 16,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl Pbkdf2Hash {
    /// Fails with [`HashError::InvalidRounds`] when `rounds` is zero.
    pub fn new(hash_name: HashName, salt_len: usize, rounds: u32) -> Result<Self, HashError> {
        let rounds = NonZeroU32::new(rounds).ok_or(HashError::InvalidRounds(rounds))?;
        Ok(Self {
            hash_name,
            salt_len,
            rounds,
        })
    }

    pub fn hash_name(&self) -> HashName {
        self.hash_name
    }

    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    pub fn rounds(&self) -> u32 {
        self.rounds.get()
    }

    /// Like [`Pbkdf2Hash::copy`], but keeps the concrete type.
    pub fn with_overrides(&self, overrides: &HashOverrides) -> Self {
        Self {
            hash_name: overrides.hash_name.unwrap_or(self.hash_name),
            salt_len: overrides.salt_len.unwrap_or(self.salt_len),
            rounds: overrides.rounds.unwrap_or(self.rounds),
        }
    }

    /// Hash the secret with a caller-provided salt instead of a random one.
    ///
    /// ```
    /// # use gel_sasl::hashing::*;
    /// let hash = Pbkdf2Hash::new(HashName::Sha256, 4, 1000).unwrap();
    /// let digest = hash.hash_with_salt("password", b"salt");
    /// assert!(digest.starts_with("$pbkdf2-sha256$1000$c2FsdA==$"));
    /// assert!(hash.verify("password", &digest).unwrap());
    /// ```
    pub fn hash_with_salt(&self, secret: &str, salt: &[u8]) -> String {
        let digest = self
            .hash_name
            .derive(secret.as_bytes(), salt, self.rounds.get());
        format!(
            "${}${}${}${}",
            self.hash_name.tag(),
            self.rounds,
            BASE64_STANDARD.encode(salt),
            BASE64_STANDARD.encode(digest)
        )
    }
}

impl HashInterface for Pbkdf2Hash {
    fn hash(&self, secret: &str) -> String {
        let mut salt = vec![0; self.salt_len];
        rand::thread_rng().fill_bytes(&mut salt);
        self.hash_with_salt(secret, &salt)
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, HashError> {
        let stored = StoredDigest::parse(digest)?;
        let computed = stored
            .hash_name
            .derive(secret.as_bytes(), &stored.salt, stored.rounds);
        Ok(constant_time_eq::constant_time_eq(&computed, &stored.digest))
    }

    fn copy(&self, overrides: &HashOverrides) -> Arc<dyn HashInterface> {
        Arc::new(self.with_overrides(overrides))
    }
}

/// The parts of a `$<tag>$<rounds>$<salt>$<digest>` string.
struct StoredDigest {
    hash_name: HashName,
    rounds: u32,
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl StoredDigest {
    fn parse(s: &str) -> Result<Self, HashError> {
        let mut parts = s.split('$');
        let (Some(""), Some(tag), Some(rounds), Some(salt), Some(digest), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(HashError::MalformedDigest("expected $tag$rounds$salt$digest"));
        };
        let hash_name =
            HashName::from_tag(tag).ok_or(HashError::MalformedDigest("unknown algorithm tag"))?;
        let rounds = match rounds.parse::<u32>() {
            Ok(rounds) if rounds > 0 => rounds,
            _ => return Err(HashError::MalformedDigest("invalid rounds")),
        };
        Ok(Self {
            hash_name,
            rounds,
            salt: decode_b64(salt)?,
            digest: decode_b64(digest)?,
        })
    }
}

/// passlib writes an adapted base64 with `.` in place of `+` and no padding.
fn decode_b64(s: &str) -> Result<Vec<u8>, HashError> {
    LENIENT
        .decode(s.replace('.', "+"))
        .map_err(|_| HashError::MalformedDigest("invalid base64"))
}

/// Stores secrets as they are. Identities using this hash can give their
/// secret to mechanisms like CRAM-MD5 that need it.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Cleartext;

impl HashInterface for Cleartext {
    fn hash(&self, secret: &str) -> String {
        secret.to_owned()
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, HashError> {
        Ok(constant_time_eq::constant_time_eq(
            secret.as_bytes(),
            digest.as_bytes(),
        ))
    }

    fn copy(&self, _overrides: &HashOverrides) -> Arc<dyn HashInterface> {
        Arc::new(Cleartext)
    }

    fn is_cleartext(&self) -> bool {
        true
    }
}

/// The hash to use when nothing else is configured.
pub fn default_hash() -> Arc<dyn HashInterface> {
    Arc::new(Pbkdf2Hash::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const B64_SALT: &str = "bzstsT0hfnnXDUPTJqbkhQ==";
    const PASSWORD_SHA1: &str = "$pbkdf2$1000$bzstsT0hfnnXDUPTJqbkhQ==$ZreCYDHwQD8P81LbstmBx15gBgo=";
    const PASSWORD_SHA256: &str = "$pbkdf2-sha256$1000$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=";
    const PASSWORD_SHA512: &str = "$pbkdf2-sha512$1000$bzstsT0hfnnXDUPTJqbkhQ==$CTOIJXzOcorIOzxrRZVKxe3yMrllU7+vbPpSeT7SQWGX6S4tkOZq5s/A6LSsDOkE6ExBXXRh5Lv5I18B/cQpkQ==";

    #[rstest]
    #[case(HashName::Sha1, PASSWORD_SHA1)]
    #[case(HashName::Sha256, PASSWORD_SHA256)]
    #[case(HashName::Sha512, PASSWORD_SHA512)]
    fn test_known_digests(#[case] hash_name: HashName, #[case] expected: &str) {
        let salt = BASE64_STANDARD.decode(B64_SALT).unwrap();
        let hash = Pbkdf2Hash::new(hash_name, salt.len(), 1000).unwrap();
        assert_eq!(hash.hash_with_salt("password", &salt), expected);
        assert!(hash.verify("password", expected).unwrap());
        assert!(!hash.verify("invalid", expected).unwrap());
    }

    #[test]
    fn test_verify_uses_stored_algorithm() {
        // The tag in the digest decides the algorithm, not the hash's own.
        let hash = Pbkdf2Hash::new(HashName::Sha256, 16, 1000).unwrap();
        assert!(hash.verify("password", PASSWORD_SHA1).unwrap());
        assert!(hash.verify("password", PASSWORD_SHA512).unwrap());
    }

    #[test]
    fn test_verify_adapted_base64() {
        let hash = Pbkdf2Hash::new(HashName::Sha256, 16, 1000).unwrap();
        let adapted = PASSWORD_SHA256.replace('+', ".").replace('=', "");
        assert!(hash.verify("password", &adapted).unwrap());
    }

    #[rstest]
    fn test_hash_roundtrip(
        #[values(HashName::Sha1, HashName::Sha256, HashName::Sha512)] hash_name: HashName,
        #[values(0, 8, 16)] salt_len: usize,
        #[values(1, 100)] rounds: u32,
    ) {
        let hash = Pbkdf2Hash::new(hash_name, salt_len, rounds).unwrap();
        let first = hash.hash("s3cret");
        let second = hash.hash("s3cret");
        assert!(hash.verify("s3cret", &first).unwrap());
        assert!(hash.verify("s3cret", &second).unwrap());
        assert!(!hash.verify("s3cre", &first).unwrap());
        if salt_len > 0 {
            assert_ne!(first, second);
        }
    }

    #[rstest]
    fn test_zero_rounds(#[values(HashName::Sha1, HashName::Sha256)] hash_name: HashName) {
        assert_eq!(
            Pbkdf2Hash::new(hash_name, 16, 0),
            Err(HashError::InvalidRounds(0))
        );
        // The smallest count still round-trips through the digest string.
        let hash = Pbkdf2Hash::new(hash_name, 16, 1).unwrap();
        assert_eq!(hash.rounds(), 1);
        assert!(hash.verify("s3cret", &hash.hash("s3cret")).unwrap());
    }

    #[rstest]
    #[case("invalid")]
    #[case("invalid$pbkdf2-sha256$1000$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=")]
    #[case("$sha256$1000$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=")]
    #[case("$pbkdf2-sha256$0$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=")]
    #[case("$pbkdf2-sha256$many$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=")]
    #[case("$pbkdf2-sha256$1000$!!!$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=")]
    #[case("$pbkdf2-sha256$1000$bzstsT0hfnnXDUPTJqbkhQ==$dWvL4bTpWfPobA2eti+kCjUsF4sfwwiW58SE10p4Vh0=$")]
    fn test_malformed_digest(#[case] digest: &str) {
        let hash = Pbkdf2Hash::default();
        assert!(matches!(
            hash.verify("password", digest),
            Err(HashError::MalformedDigest(_))
        ));
    }

    #[test]
    fn test_copy() {
        let hash = Pbkdf2Hash::new(HashName::Sha256, 16, 1000).unwrap();
        let copy = hash.with_overrides(&HashOverrides {
            hash_name: Some(HashName::Sha512),
            rounds: NonZeroU32::new(10),
            ..Default::default()
        });
        assert_eq!(copy, Pbkdf2Hash::new(HashName::Sha512, 16, 10).unwrap());
        // The original is untouched.
        assert_eq!(hash, Pbkdf2Hash::new(HashName::Sha256, 16, 1000).unwrap());
        assert_eq!(hash.with_overrides(&HashOverrides::default()), hash);

        let copy = hash.copy(&HashOverrides::default());
        assert!(!copy.is_cleartext());
        assert!(copy.verify("password", PASSWORD_SHA256).unwrap());
    }

    #[test]
    fn test_hash_name() {
        assert_eq!("sha1".parse::<HashName>().unwrap(), HashName::Sha1);
        assert_eq!("sha512".parse::<HashName>().unwrap(), HashName::Sha512);
        assert!("md5".parse::<HashName>().is_err());
        assert_eq!(HashName::from_tag(HashName::Sha1.tag()), Some(HashName::Sha1));
    }

    #[test]
    fn test_cleartext() {
        assert_eq!(Cleartext.hash("password"), "password");
        assert!(Cleartext.verify("password", "password").unwrap());
        assert!(!Cleartext.verify("password", "passwore").unwrap());
        assert!(!Cleartext.verify("password", "password1").unwrap());
        assert!(Cleartext.is_cleartext());
        assert!(Cleartext.copy(&HashOverrides::default()).is_cleartext());
    }
}
