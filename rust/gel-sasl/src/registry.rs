use crate::{config::SaslConfig, mechanism::Mechanism, AuthError};
use tracing::{debug, warn};

/// An ordered set of mechanisms, unique by name.
///
/// ```
/// # use gel_sasl::{SaslAuth, SaslConfig};
/// let sasl = SaslAuth::named(["CRAM-MD5", "PLAIN"], &SaslConfig::default()).unwrap();
/// assert!(sasl.get("plain").is_some());
/// assert!(sasl.get("LOGIN").is_none());
/// assert_eq!(sasl.names().collect::<Vec<_>>(), ["CRAM-MD5", "PLAIN"]);
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SaslAuth {
    mechanisms: Vec<Mechanism>,
}

impl Default for SaslAuth {
    fn default() -> Self {
        Self::defaults()
    }
}

impl SaslAuth {
    /// A later mechanism with the name of an earlier one replaces it, keeping
    /// the earlier position.
    pub fn new(mechanisms: impl IntoIterator<Item = Mechanism>) -> Self {
        let mut this = Self { mechanisms: vec![] };
        for mech in mechanisms {
            this.insert(mech);
        }
        this
    }

    /// The mechanisms every server and client is expected to handle: PLAIN
    /// and LOGIN.
    pub fn defaults() -> Self {
        Self::new([
            Mechanism::Plain(Default::default()),
            Mechanism::Login(Default::default()),
        ])
    }

    /// Build the registry from builtin mechanism names.
    pub fn named<S: AsRef<str>>(
        names: impl IntoIterator<Item = S>,
        config: &SaslConfig,
    ) -> Result<Self, AuthError> {
        let mut this = Self { mechanisms: vec![] };
        for name in names {
            let name = name.as_ref();
            let Some(mech) = Mechanism::builtin(name, config) else {
                warn!("Unknown SASL mechanism {name:?}");
                return Err(AuthError::UnknownMechanism(name.to_owned()));
            };
            this.insert(mech);
        }
        Ok(this)
    }

    fn insert(&mut self, mech: Mechanism) {
        match self.mechanisms.iter_mut().find(|m| m.name() == mech.name()) {
            Some(existing) => *existing = mech,
            None => self.mechanisms.push(mech),
        }
    }

    pub fn mechanisms(&self) -> &[Mechanism] {
        &self.mechanisms
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mechanisms.iter().map(Mechanism::name)
    }

    /// The mechanisms to advertise on the server side, in order. Every
    /// builtin has both sides, so this is all of them.
    pub fn server_mechanisms(&self) -> Vec<&Mechanism> {
        self.mechanisms.iter().collect()
    }

    /// The mechanisms to offer on the client side, in order.
    pub fn client_mechanisms(&self) -> Vec<&Mechanism> {
        self.mechanisms.iter().collect()
    }

    /// Find a mechanism by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Mechanism> {
        let mech = self
            .mechanisms
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name));
        if mech.is_none() {
            debug!("SASL mechanism {name:?} is not available");
        }
        mech
    }
}
