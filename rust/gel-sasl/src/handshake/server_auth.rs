use crate::{
    creds::ServerCredentials,
    mechanism::{ChallengeResponse, Mechanism, ServerStep},
    AuthError,
};
use tracing::{debug, error, trace};

#[derive(Debug)]
pub enum ServerAuthResponse {
    /// Send this challenge to the client.
    Challenge(Vec<u8>),
    /// The exchange is complete. The credentials must still be verified
    /// before the client is told the outcome, along with any final data.
    Complete(ServerCredentials, Option<Vec<u8>>),
    Error(ServerAuthError),
}

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum ServerAuthError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid message type")]
    InvalidMessageType,
}

#[derive(Debug)]
enum ServerAuthState {
    Initial,
    /// Waiting for the response to this challenge.
    Challenged(Vec<u8>),
    Complete,
    Failed,
}

#[derive(derive_more::Debug)]
pub enum ServerAuthDrive<'a> {
    /// Start the exchange without an initial response.
    Initial,
    /// Start the exchange with the client's initial response.
    InitialResponse(#[debug(skip)] &'a [u8]),
    /// The client's response to the last challenge.
    Response(#[debug(skip)] &'a [u8]),
}

/// Drives the server side of one negotiation, keeping the exchange history
/// that the mechanism steps are computed from.
#[derive(Debug)]
pub struct ServerAuth {
    state: ServerAuthState,
    mechanism: Mechanism,
    responses: Vec<ChallengeResponse>,
}

impl ServerAuth {
    pub fn new(mechanism: Mechanism) -> Self {
        Self {
            state: ServerAuthState::Initial,
            mechanism,
            responses: vec![],
        }
    }

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    /// The rounds completed so far.
    pub fn responses(&self) -> &[ChallengeResponse] {
        &self.responses
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, ServerAuthState::Complete)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ServerAuthState::Failed)
    }

    pub fn drive(&mut self, drive: ServerAuthDrive) -> ServerAuthResponse {
        match (&mut self.state, drive) {
            (ServerAuthState::Initial, ServerAuthDrive::Initial) => self.step(),
            (ServerAuthState::Initial, ServerAuthDrive::InitialResponse(response)) => {
                self.responses
                    .push(ChallengeResponse::new(Vec::new(), response));
                self.step()
            }
            (ServerAuthState::Challenged(challenge), ServerAuthDrive::Response(response)) => {
                let challenge = std::mem::take(challenge);
                self.responses
                    .push(ChallengeResponse::new(challenge, response));
                self.step()
            }
            (_, drive) => {
                error!("Received invalid drive {drive:?} in state {:?}", self.state);
                self.state = ServerAuthState::Failed;
                ServerAuthResponse::Error(ServerAuthError::InvalidMessageType)
            }
        }
    }

    fn step(&mut self) -> ServerAuthResponse {
        let name = self.mechanism.name();
        match self.mechanism.as_server().server_attempt(&self.responses) {
            Ok(ServerStep::NeedMore(challenge)) => {
                trace!("{name}: sending challenge {}", self.responses.len() + 1);
                self.state = ServerAuthState::Challenged(challenge.data.clone());
                ServerAuthResponse::Challenge(challenge.data)
            }
            Ok(ServerStep::Done(creds, data)) => {
                debug!(
                    "{name}: exchange complete after {} rounds",
                    self.responses.len()
                );
                self.state = ServerAuthState::Complete;
                ServerAuthResponse::Complete(creds, data)
            }
            Err(e) => {
                debug!("{name}: exchange failed: {e}");
                self.state = ServerAuthState::Failed;
                ServerAuthResponse::Error(e.into())
            }
        }
    }
}
