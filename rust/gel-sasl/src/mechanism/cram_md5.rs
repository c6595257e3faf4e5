use super::{
    utf8, ChallengeResponse, ClientMechanism, SaslMechanism, ServerChallenge, ServerMechanism,
    ServerStep,
};
use crate::{
    config::SaslConfig,
    creds::{ClientCredentials, CramMd5Result, ServerCredentials},
    AuthError,
};
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

pub const CRAM_MD5: &str = "CRAM-MD5";

/// The CRAM-MD5 mechanism, [RFC 2195](https://datatracker.ietf.org/doc/html/rfc2195).
///
/// The secret never crosses the wire, but the server needs the cleartext
/// secret to verify the client's digest. Identities whose secrets are hashed
/// cannot use this mechanism.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct CramMd5 {
    config: SaslConfig,
}

impl CramMd5 {
    pub fn new(config: SaslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }

    /// A fresh challenge token of the form `<random.timestamp@domain>`.
    fn make_token(&self) -> String {
        let nonce: [u8; 16] = rand::thread_rng().gen();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!(
            "<{}.{}@{}>",
            to_hex_string(&nonce),
            timestamp,
            self.config.challenge_domain
        )
    }
}

impl SaslMechanism for CramMd5 {
    fn name(&self) -> &'static str {
        CRAM_MD5
    }
}

impl ServerMechanism for CramMd5 {
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError> {
        let Some(first) = responses.first() else {
            trace!("CRAM-MD5: sending challenge token");
            return Ok(ServerStep::NeedMore(ServerChallenge::new(self.make_token())));
        };
        // The username may itself contain spaces, the digest never does.
        let Some(split) = first.response.iter().rposition(|&b| b == b' ') else {
            return Err(AuthError::InvalidResponse);
        };
        let (username, digest) = (&first.response[..split], &first.response[split + 1..]);
        // The response is a single line.
        if digest.is_empty() || username.contains(&b'\n') {
            return Err(AuthError::InvalidResponse);
        }
        let creds = CramMd5Result::new(
            utf8(username)?.to_owned(),
            first.challenge.clone(),
            digest.to_vec(),
        );
        trace!("CRAM-MD5: received digest");
        Ok(ServerStep::Done(ServerCredentials::CramMd5(creds), None))
    }
}

impl ClientMechanism for CramMd5 {
    fn client_first(&self) -> bool {
        false
    }

    fn client_attempt(
        &self,
        creds: &ClientCredentials,
        challenges: &[ServerChallenge],
    ) -> Result<ChallengeResponse, AuthError> {
        let challenge = match challenges {
            [] => return Ok(ChallengeResponse::default()),
            [challenge] => &challenge.data,
            _ => return Err(AuthError::UnexpectedChallenge),
        };
        let authcid = self.config.prepare.prepare(creds.authcid())?;
        let secret = self.config.prepare.prepare(creds.secret())?;
        let digest = cram_md5_digest(secret.as_bytes(), challenge)?;
        Ok(ChallengeResponse::new(
            challenge.clone(),
            format!("{authcid} {digest}"),
        ))
    }
}

/// Computes the hex encoded `HMAC-MD5(secret, challenge)` that a CRAM-MD5
/// client answers with.
///
/// # Example
///
/// ```
/// # use gel_sasl::mechanism::cram_md5::*;
/// let digest = cram_md5_digest(b"testpass", b"<abc123.1234@testhost>").unwrap();
/// assert_eq!(digest, "3a569c3950e95c490fd42f5d89e1ef67");
/// ```
pub fn cram_md5_digest(secret: &[u8], challenge: &[u8]) -> Result<String, AuthError> {
    let mut mac = <Hmac<Md5> as Mac>::new_from_slice(secret)
        .map_err(|_| AuthError::MechanismUnusable(CRAM_MD5))?;
    mac.update(challenge);
    Ok(to_hex_string(&mac.finalize().into_bytes()))
}

/// Converts a byte slice to a hexadecimal string.
fn to_hex_string(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}
