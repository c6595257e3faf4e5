pub mod config;
pub mod creds;
pub mod handshake;
pub mod hashing;
pub mod identity;
pub mod mechanism;
pub mod prep;
pub mod registry;

use thiserror::Error;

pub use config::SaslConfig;
pub use creds::{ClientCredentials, ServerCredentials, VerifyOutcome};
pub use identity::{ClearIdentity, HashedIdentity, Identity};
pub use mechanism::{ChallengeResponse, Mechanism, ServerChallenge, ServerStep};
pub use registry::SaslAuth;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AuthError {
    /// The client received more challenges than the mechanism allows.
    #[error("Unexpected auth challenge")]
    UnexpectedChallenge,
    /// The server received a response it could not parse.
    #[error("Invalid auth response")]
    InvalidResponse,
    /// The mechanism needs something the identity cannot provide, like a
    /// cleartext secret.
    #[error("{0} cannot authenticate this identity")]
    MechanismUnusable(&'static str),
    #[error("Unknown mechanism: {0}")]
    UnknownMechanism(String),
    #[error(transparent)]
    Prep(#[from] prep::PrepError),
    #[error(transparent)]
    Hash(#[from] hashing::HashError),
}
