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

pub const LOGIN: &str = "LOGIN";

/// The obsolete but widely deployed LOGIN mechanism. The server prompts for
/// the username and then the password, one round each.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Login {
    config: SaslConfig,
}

impl Login {
    pub fn new(config: SaslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }
}

impl SaslMechanism for Login {
    fn name(&self) -> &'static str {
        LOGIN
    }
}

impl ServerMechanism for Login {
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError> {
        match responses {
            [] => {
                trace!("LOGIN: requesting username");
                Ok(ServerStep::NeedMore(ServerChallenge::new("Username:")))
            }
            [_] => {
                trace!("LOGIN: requesting password");
                Ok(ServerStep::NeedMore(ServerChallenge::new("Password:")))
            }
            [username, password, ..] => {
                let authcid = utf8(&username.response)?.to_owned();
                let secret = utf8(&password.response)?.to_owned();
                let creds = PlainCredentials::new(authcid.clone(), secret, authcid);
                Ok(ServerStep::Done(ServerCredentials::Plain(creds), None))
            }
        }
    }
}

impl ClientMechanism for Login {
    fn client_first(&self) -> bool {
        false
    }

    fn client_attempt(
        &self,
        creds: &ClientCredentials,
        challenges: &[ServerChallenge],
    ) -> Result<ChallengeResponse, AuthError> {
        match challenges {
            [] => Ok(ChallengeResponse::default()),
            [username] => Ok(ChallengeResponse::new(
                username.data.clone(),
                creds.authcid(),
            )),
            [_, password] => Ok(ChallengeResponse::new(
                password.data.clone(),
                creds.secret(),
            )),
            _ => Err(AuthError::UnexpectedChallenge),
        }
    }
}
