use super::{
    utf8, ChallengeResponse, ClientMechanism, SaslMechanism, ServerChallenge, ServerMechanism,
    ServerStep,
};
use crate::{
    config::SaslConfig,
    creds::{ClientCredentials, PlainCredentials, ServerCredentials},
    AuthError,
};
use tracing::trace;

pub const PLAIN: &str = "PLAIN";

/// The PLAIN mechanism, [RFC 4616](https://datatracker.ietf.org/doc/html/rfc4616).
///
/// The client sends `authzid NUL authcid NUL secret` as its only response.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Plain {
    config: SaslConfig,
}

impl Plain {
    pub fn new(config: SaslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }
}

impl SaslMechanism for Plain {
    fn name(&self) -> &'static str {
        PLAIN
    }
}

impl ServerMechanism for Plain {
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError> {
        let Some(first) = responses.first() else {
            trace!("PLAIN: requesting response");
            return Ok(ServerStep::NeedMore(ServerChallenge::default()));
        };
        let mut fields = first.response.split(|&b| b == 0);
        let (Some(authzid), Some(authcid), Some(secret), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(AuthError::InvalidResponse);
        };
        if authcid.is_empty() {
            return Err(AuthError::InvalidResponse);
        }
        let creds = PlainCredentials::new(
            utf8(authcid)?.to_owned(),
            utf8(secret)?.to_owned(),
            utf8(authzid)?.to_owned(),
        );
        trace!("PLAIN: received credentials");
        Ok(ServerStep::Done(ServerCredentials::Plain(creds), None))
    }
}

impl ClientMechanism for Plain {
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
        let response = format!(
            "{}\0{}\0{}",
            creds.authzid(),
            creds.authcid(),
            creds.secret()
        );
        Ok(ChallengeResponse::new(challenge, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{creds::VerifyOutcome, identity::ClearIdentity};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn server(response: &[u8]) -> Result<ServerStep, AuthError> {
        Plain::default().server_attempt(&[ChallengeResponse::new("", response)])
    }

    fn done(step: ServerStep) -> ServerCredentials {
        match step {
            ServerStep::Done(creds, None) => creds,
            step => panic!("unexpected step {step:?}"),
        }
    }

    #[test]
    fn test_server_challenge() {
        assert_eq!(
            Plain::default().server_attempt(&[]).unwrap(),
            ServerStep::NeedMore(ServerChallenge::new(""))
        );
    }

    #[test]
    fn test_server_attempt() {
        let identity = ClearIdentity::new("testuser", "testpass").unwrap();
        let creds = done(server(b"\0testuser\0testpass").unwrap());
        assert_eq!(creds.authcid(), "testuser");
        assert_eq!(creds.authzid(), "testuser");
        assert_eq!(creds.verify(Some(&identity)).unwrap(), VerifyOutcome::Verified(true));

        let creds = done(server(b"\0testuser\0badpass").unwrap());
        assert_eq!(creds.verify(Some(&identity)).unwrap(), VerifyOutcome::Verified(false));
    }

    #[test]
    fn test_server_attempt_authzid() {
        let creds = done(server(b"testzid\0testuser\0testpass").unwrap());
        assert_eq!(creds.authcid(), "testuser");
        assert_eq!(creds.authzid(), "testzid");
        let identity = ClearIdentity::new("testuser", "testpass").unwrap();
        assert!(creds.verify(Some(&identity)).unwrap().is_verified());
    }

    #[test]
    fn test_server_attempt_empty_secret() {
        let creds = done(server(b"\0testuser\0").unwrap());
        let ServerCredentials::Plain(plain) = creds else {
            panic!("expected PLAIN credentials");
        };
        assert_eq!(plain.secret(), "");
    }

    #[rstest]
    #[case(b"")]
    #[case(b"testuser")]
    #[case(b"testuser\0testpass")]
    #[case(b"\0\0testpass")]
    #[case(b"zid\0testuser\0testpass\0")]
    #[case(b"\0test\xffuser\0testpass")]
    fn test_server_attempt_invalid(#[case] response: &[u8]) {
        assert_eq!(server(response), Err(AuthError::InvalidResponse));
    }

    #[test]
    fn test_client_attempt() {
        let creds = ClientCredentials::new("testuser", "testpass");
        let resp = Plain::default().client_attempt(&creds, &[]).unwrap();
        assert_eq!(resp, ChallengeResponse::new("", "\0testuser\0testpass"));

        let creds = creds.with_authzid("testzid");
        let resp = Plain::default()
            .client_attempt(&creds, &[ServerChallenge::new("")])
            .unwrap();
        assert_eq!(resp.response, b"testzid\0testuser\0testpass");
    }

    #[test]
    fn test_client_attempt_unexpected() {
        let creds = ClientCredentials::new("testuser", "testpass");
        let challenges = [ServerChallenge::new(""), ServerChallenge::new("")];
        assert_eq!(
            Plain::default().client_attempt(&creds, &challenges),
            Err(AuthError::UnexpectedChallenge)
        );
    }
}
