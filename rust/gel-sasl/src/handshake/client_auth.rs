use crate::{
    creds::ClientCredentials,
    mechanism::{Mechanism, ServerChallenge},
    AuthError,
};
use tracing::trace;

/// Drives the client side of one negotiation.
#[derive(Debug)]
pub struct ClientAuth {
    mechanism: Mechanism,
    creds: ClientCredentials,
    challenges: Vec<ServerChallenge>,
}

impl ClientAuth {
    pub fn new(mechanism: Mechanism, creds: ClientCredentials) -> Self {
        Self {
            mechanism,
            creds,
            challenges: vec![],
        }
    }

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    /// The challenges received so far.
    pub fn challenges(&self) -> &[ServerChallenge] {
        &self.challenges
    }

    /// Begin the exchange, returning the mechanism name and the initial
    /// response if the mechanism sends one.
    ///
    /// The initial response is not recorded as an answer to a challenge. A
    /// server that ignores it and sends an empty challenge gets the same
    /// response again from [`ClientAuth::next`].
    pub fn start(&mut self) -> Result<(&'static str, Option<Vec<u8>>), AuthError> {
        self.challenges.clear();
        let client = self.mechanism.as_client();
        let initial = if client.client_first() {
            Some(client.client_attempt(&self.creds, &[])?.response)
        } else {
            None
        };
        trace!(
            "{}: starting, initial response: {}",
            self.mechanism.name(),
            initial.is_some()
        );
        Ok((self.mechanism.name(), initial))
    }

    /// Answer a challenge from the server.
    pub fn next(&mut self, challenge: &[u8]) -> Result<Vec<u8>, AuthError> {
        self.challenges.push(ServerChallenge::new(challenge));
        let client = self.mechanism.as_client();
        trace!("{}: answering challenge {}", self.mechanism.name(), self.challenges.len());
        Ok(client.client_attempt(&self.creds, &self.challenges)?.response)
    }
}
