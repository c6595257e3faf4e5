use crate::prep::Preparation;

/// Settings shared by the builtin mechanisms.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SaslConfig {
    /// Preparation applied to authentication identities and secrets.
    pub prepare: Preparation,
    /// The domain part of CRAM-MD5 challenge tokens.
    pub challenge_domain: String,
}

impl Default for SaslConfig {
    fn default() -> Self {
        Self {
            prepare: Preparation::SaslPrep,
            challenge_domain: "localhost".to_owned(),
        }
    }
}

impl SaslConfig {
    pub fn with_prepare(mut self, prepare: Preparation) -> Self {
        self.prepare = prepare;
        self
    }

    pub fn with_challenge_domain(mut self, domain: impl Into<String>) -> Self {
        self.challenge_domain = domain.into();
        self
    }
}
