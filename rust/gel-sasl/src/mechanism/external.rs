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

pub const EXTERNAL: &str = "EXTERNAL";

/// The EXTERNAL mechanism, [RFC 4422 appendix A](https://datatracker.ietf.org/doc/html/rfc4422#appendix-A).
///
/// Authentication happened outside of SASL, e.g. with a TLS client
/// certificate. The client only names the identity to authorize as, and the
/// credentials are always verified by the caller.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct External {
    config: SaslConfig,
}

impl External {
    pub fn new(config: SaslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }
}

impl SaslMechanism for External {
    fn name(&self) -> &'static str {
        EXTERNAL
    }
}

impl ServerMechanism for External {
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError> {
        let Some(first) = responses.first() else {
            trace!("EXTERNAL: requesting authzid");
            return Ok(ServerStep::NeedMore(ServerChallenge::default()));
        };
        let authzid = utf8(&first.response)?.to_owned();
        let creds = ExternalCredentials::new(authzid, None);
        Ok(ServerStep::Done(ServerCredentials::External(creds), None))
    }
}

impl ClientMechanism for External {
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
        Ok(ChallengeResponse::new(challenge, creds.authzid()))
    }
}
