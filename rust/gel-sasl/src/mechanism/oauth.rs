use super::{
    utf8, ChallengeResponse, ClientMechanism, SaslMechanism, ServerChallenge, ServerMechanism,
    ServerStep,
};
use crate::{
    config::SaslConfig,
    creds::{ClientCredentials, ExternalCredentials, ServerCredentials},
    AuthError,
};
use tracing::trace;

pub const XOAUTH2: &str = "XOAUTH2";

/// The XOAUTH2 mechanism, which authenticates with an OAuth 2.0 bearer token.
///
/// The client's [`ClientCredentials::secret`] is the bearer token. On the
/// server the token is returned for the caller to validate.
///
/// See <https://developers.google.com/gmail/imap/xoauth2-protocol>.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct XOAuth2 {
    config: SaslConfig,
}

impl XOAuth2 {
    pub fn new(config: SaslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }
}

/// Split `user=<user>\x01auth=Bearer <token>\x01\x01` into user and token.
fn parse_response(response: &[u8]) -> Option<(&[u8], &[u8])> {
    let rest = response.strip_prefix(b"user=")?;
    let rest = rest.strip_suffix(b"\x01\x01")?;
    let split = rest.windows(6).position(|w| w == b"\x01auth=")?;
    let (user, auth) = (&rest[..split], &rest[split + 6..]);
    if auth.len() < 7 {
        return None;
    }
    let (scheme, token) = auth.split_at(7);
    if !scheme[..6].eq_ignore_ascii_case(b"bearer") || scheme[6] != b' ' {
        return None;
    }
    if user.contains(&b'\n') || token.contains(&b'\n') {
        return None;
    }
    Some((user, token))
}

impl SaslMechanism for XOAuth2 {
    fn name(&self) -> &'static str {
        XOAUTH2
    }
}

impl ServerMechanism for XOAuth2 {
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError> {
        let Some(first) = responses.first() else {
            trace!("XOAUTH2: requesting response");
            return Ok(ServerStep::NeedMore(ServerChallenge::default()));
        };
        let (user, token) = parse_response(&first.response).ok_or(AuthError::InvalidResponse)?;
        let creds = ExternalCredentials::new(utf8(user)?.to_owned(), Some(utf8(token)?.to_owned()));
        trace!("XOAUTH2: received bearer token");
        Ok(ServerStep::Done(ServerCredentials::External(creds), None))
    }
}

impl ClientMechanism for XOAuth2 {
    fn client_first(&self) -> bool {
        true
    }

    fn client_attempt(
        &self,
        creds: &ClientCredentials,
        challenges: &[ServerChallenge],
    ) -> Result<ChallengeResponse, AuthError> {
        let challenge = match challenges {
            [] => &[][..],
            [challenge] => &challenge.data[..],
            _ => return Err(AuthError::UnexpectedChallenge),
        };
        // A non-empty challenge carries the server's error report, which the
        // client acknowledges with an empty response.
        if !challenge.is_empty() {
            trace!("XOAUTH2: acknowledging error challenge");
            return Ok(ChallengeResponse::new(challenge, ""));
        }
        let response = format!(
            "user={}\x01auth=Bearer {}\x01\x01",
            creds.authcid(),
            creds.secret()
        );
        Ok(ChallengeResponse::new(challenge, response))
    }
}
