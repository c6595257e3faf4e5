//! The SASL mechanisms and the challenge/response exchange they drive.
//!
//! A mechanism never holds per-negotiation state. Each server or client step
//! is computed from the full history of the negotiation so far, so a single
//! [`Mechanism`] can serve any number of concurrent negotiations.
use crate::{
    config::SaslConfig,
    creds::{ClientCredentials, ServerCredentials},
    AuthError,
};

pub mod cram_md5;
pub mod external;
pub mod login;
pub mod oauth;
pub mod plain;

pub use cram_md5::CramMd5;
pub use external::External;
pub use login::Login;
pub use oauth::XOAuth2;
pub use plain::Plain;

/// One completed round of a negotiation: the challenge the server sent and
/// the response the client answered with.
#[derive(derive_more::Debug, Clone, Default, Eq, PartialEq)]
pub struct ChallengeResponse {
    #[debug("{:?}", String::from_utf8_lossy(challenge))]
    pub challenge: Vec<u8>,
    /// Responses may carry secrets.
    #[debug(skip)]
    pub response: Vec<u8>,
}

impl ChallengeResponse {
    pub fn new(challenge: impl Into<Vec<u8>>, response: impl Into<Vec<u8>>) -> Self {
        Self {
            challenge: challenge.into(),
            response: response.into(),
        }
    }
}

/// A challenge the server sends to the client.
#[derive(derive_more::Debug, Clone, Default, Eq, PartialEq)]
pub struct ServerChallenge {
    #[debug("{:?}", String::from_utf8_lossy(data))]
    pub data: Vec<u8>,
}

impl ServerChallenge {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// The outcome of a server-side step.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ServerStep {
    /// Send the challenge to the client and call again with its response.
    NeedMore(ServerChallenge),
    /// The exchange is complete. The credentials still need verifying, and
    /// the final data, if any, is sent to the client with the outcome.
    Done(ServerCredentials, Option<Vec<u8>>),
}

pub trait SaslMechanism {
    /// The registered mechanism name, in uppercase.
    fn name(&self) -> &'static str;
}

pub trait ServerMechanism: SaslMechanism {
    /// Take the next server step given the rounds completed so far.
    fn server_attempt(&self, responses: &[ChallengeResponse]) -> Result<ServerStep, AuthError>;
}

pub trait ClientMechanism: SaslMechanism {
    /// True if the client sends a response before receiving any challenge.
    fn client_first(&self) -> bool;

    /// Compute the response to the last of the challenges received so far.
    /// With no challenges, this is the initial response.
    fn client_attempt(
        &self,
        creds: &ClientCredentials,
        challenges: &[ServerChallenge],
    ) -> Result<ChallengeResponse, AuthError>;
}

/// The builtin mechanisms.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Mechanism {
    Plain(Plain),
    Login(Login),
    CramMd5(CramMd5),
    External(External),
    XOAuth2(XOAuth2),
}

impl Mechanism {
    /// Look up a builtin mechanism by name, ignoring case.
    ///
    /// ```
    /// # use gel_sasl::{Mechanism, SaslConfig};
    /// let mech = Mechanism::builtin("cram-md5", &SaslConfig::default()).unwrap();
    /// assert_eq!(mech.name(), "CRAM-MD5");
    /// assert!(Mechanism::builtin("SCRAM-SHA-256", &SaslConfig::default()).is_none());
    /// ```
    pub fn builtin(name: &str, config: &SaslConfig) -> Option<Self> {
        let config = config.clone();
        let mech = match name.to_ascii_uppercase().as_str() {
            plain::PLAIN => Mechanism::Plain(Plain::new(config)),
            login::LOGIN => Mechanism::Login(Login::new(config)),
            cram_md5::CRAM_MD5 => Mechanism::CramMd5(CramMd5::new(config)),
            external::EXTERNAL => Mechanism::External(External::new(config)),
            oauth::XOAUTH2 => Mechanism::XOAuth2(XOAuth2::new(config)),
            _ => return None,
        };
        Some(mech)
    }

    pub fn name(&self) -> &'static str {
        self.as_mechanism().name()
    }

    pub fn config(&self) -> &SaslConfig {
        match self {
            Mechanism::Plain(mech) => mech.config(),
            Mechanism::Login(mech) => mech.config(),
            Mechanism::CramMd5(mech) => mech.config(),
            Mechanism::External(mech) => mech.config(),
            Mechanism::XOAuth2(mech) => mech.config(),
        }
    }

    fn as_mechanism(&self) -> &dyn SaslMechanism {
        match self {
            Mechanism::Plain(mech) => mech,
            Mechanism::Login(mech) => mech,
            Mechanism::CramMd5(mech) => mech,
            Mechanism::External(mech) => mech,
            Mechanism::XOAuth2(mech) => mech,
        }
    }

    /// The server side of this mechanism. Every builtin has both sides.
    pub fn as_server(&self) -> &dyn ServerMechanism {
        match self {
            Mechanism::Plain(mech) => mech,
            Mechanism::Login(mech) => mech,
            Mechanism::CramMd5(mech) => mech,
            Mechanism::External(mech) => mech,
            Mechanism::XOAuth2(mech) => mech,
        }
    }

    /// The client side of this mechanism.
    pub fn as_client(&self) -> &dyn ClientMechanism {
        match self {
            Mechanism::Plain(mech) => mech,
            Mechanism::Login(mech) => mech,
            Mechanism::CramMd5(mech) => mech,
            Mechanism::External(mech) => mech,
            Mechanism::XOAuth2(mech) => mech,
        }
    }
}

/// Decode a text field of a response.
pub(crate) fn utf8(bytes: &[u8]) -> Result<&str, AuthError> {
    std::str::from_utf8(bytes).map_err(|_| AuthError::InvalidResponse)
}
