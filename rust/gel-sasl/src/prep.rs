use std::{borrow::Cow, fmt};
use stringprep::tables;
use unicode_normalization::UnicodeNormalization;

/// Selects the string preparation applied to identities and secrets before
/// they are compared.
///
/// See [RFC 4422 section 5](https://datatracker.ietf.org/doc/html/rfc4422#section-5).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum Preparation {
    /// SASLprep for stored strings: unassigned code points are prohibited.
    #[default]
    SaslPrep,
    /// SASLprep for queries: unassigned code points are let through.
    SaslPrepQuery,
    /// No preparation; the string is compared as given.
    NoPrep,
}

impl Preparation {
    pub fn prepare<'a>(&self, source: &'a str) -> Result<Cow<'a, str>, PrepError> {
        match self {
            Preparation::SaslPrep => saslprep(source),
            Preparation::SaslPrepQuery => saslprep_query(source),
            Preparation::NoPrep => Ok(noprep(source)),
        }
    }
}

#[derive(thiserror::Error, derive_more::Debug, Clone, Eq, PartialEq)]
pub enum PrepError {
    /// The string cannot be prepared. The offending input is kept for the
    /// caller but never rendered, as it is usually a password.
    #[error("Prohibited input: {reason}")]
    ProhibitedInput {
        #[debug(skip)]
        input: String,
        reason: Prohibited,
    },
}

impl PrepError {
    fn prohibited(input: &str, reason: Prohibited) -> Self {
        PrepError::ProhibitedInput {
            input: input.to_owned(),
            reason,
        }
    }

    /// The string that failed preparation.
    pub fn input(&self) -> &str {
        match self {
            PrepError::ProhibitedInput { input, .. } => input,
        }
    }

    pub fn reason(&self) -> Prohibited {
        match self {
            PrepError::ProhibitedInput { reason, .. } => *reason,
        }
    }
}

/// Why SASLprep rejected a string.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Prohibited {
    /// Code point unassigned in Unicode 3.2 (RFC 3454 table A.1).
    Unassigned(char),
    /// Code point from a prohibited output table (C.1.2 through C.9).
    Character(char),
    /// Right-to-left text that also contains left-to-right characters.
    MixedDirection,
    /// Right-to-left text that does not start and end with a right-to-left
    /// character.
    BidiBoundary,
}

impl fmt::Display for Prohibited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prohibited::Unassigned(c) => write!(f, "unassigned code point U+{:04X}", *c as u32),
            Prohibited::Character(c) => write!(f, "prohibited code point U+{:04X}", *c as u32),
            Prohibited::MixedDirection => write!(f, "mixed bidirectional text"),
            Prohibited::BidiBoundary => {
                write!(f, "right-to-left text must start and end with a right-to-left character")
            }
        }
    }
}

/// Returns the source string unchanged.
///
/// # Examples
///
/// ```
/// # use gel_sasl::prep::*;
/// assert_eq!(noprep("I\u{00AD}X"), "I\u{00AD}X");
/// assert_eq!(noprep("\u{0007}"), "\u{0007}");
/// ```
pub fn noprep(source: &str) -> Cow<str> {
    Cow::Borrowed(source)
}

/// Prepare a stored string (username or password) using SASLprep from
/// RFC 4013.
///
/// # Examples
///
/// ```
/// # use gel_sasl::prep::*;
/// assert_eq!(saslprep("user").unwrap(), "user");
/// assert_eq!(saslprep("I\u{00AD}X").unwrap(), "IX"); // soft hyphen maps to nothing
/// assert_eq!(saslprep("passw\u{00A0}rd").unwrap(), "passw rd"); // non-ASCII space
/// assert_eq!(saslprep("\u{00AA}").unwrap(), "a");
/// assert_eq!(saslprep("\u{2168}").unwrap(), "IX"); // roman numeral nine
/// assert_eq!(saslprep("\u{0061}\u{0308}").unwrap(), "\u{00E4}");
/// assert!(saslprep("\u{0007}").is_err()); // control character
/// assert!(saslprep("\u{0627}\u{0031}").is_err()); // RandALCat must end the string
/// ```
pub fn saslprep(source: &str) -> Result<Cow<str>, PrepError> {
    prepare(source, false)
}

/// Prepare a query string using SASLprep, allowing unassigned code points.
///
/// # Examples
///
/// ```
/// # use gel_sasl::prep::*;
/// assert!(saslprep("\u{0221}").is_err());
/// assert_eq!(saslprep_query("\u{0221}").unwrap(), "\u{0221}");
/// ```
pub fn saslprep_query(source: &str) -> Result<Cow<str>, PrepError> {
    prepare(source, true)
}

fn prepare(s: &str, allow_unassigned: bool) -> Result<Cow<str>, PrepError> {
    // ASCII is already in NFKC form and has nothing to map, only the control
    // characters of table C.2.1 can be prohibited.
    if s.is_ascii() {
        return match s.chars().find(|c| tables::ascii_control_character(*c)) {
            Some(c) => Err(PrepError::prohibited(s, Prohibited::Character(c))),
            None => Ok(Cow::Borrowed(s)),
        };
    }

    // Step 1: Map. Table B.1 code points are removed and table C.1.2
    // (non-ASCII spaces) become ASCII spaces.
    let mapped = s
        .chars()
        .filter(|c| !tables::commonly_mapped_to_nothing(*c))
        .map(|c| {
            if tables::non_ascii_space_character(c) {
                ' '
            } else {
                c
            }
        });

    // Step 2: Normalize with Unicode NFKC.
    let normalized = mapped.nfkc().collect::<String>();

    // Step 3: Prohibited output.
    for c in normalized.chars() {
        if is_prohibited(c) {
            return Err(PrepError::prohibited(s, Prohibited::Character(c)));
        }
        if !allow_unassigned && tables::unassigned_code_point(c) {
            return Err(PrepError::prohibited(s, Prohibited::Unassigned(c)));
        }
    }

    // Step 4: Bidirectional characters, RFC 3454 section 6. Table C.8 was
    // checked above. RandALCat (D.1) and LCat (D.2) may not be mixed, and
    // RandALCat text must begin and end with a RandALCat character.
    if normalized.chars().any(tables::bidi_r_or_al) {
        if normalized.chars().any(tables::bidi_l) {
            return Err(PrepError::prohibited(s, Prohibited::MixedDirection));
        }
        let first = normalized.chars().next();
        let last = normalized.chars().next_back();
        if !first.is_some_and(tables::bidi_r_or_al) || !last.is_some_and(tables::bidi_r_or_al) {
            return Err(PrepError::prohibited(s, Prohibited::BidiBoundary));
        }
    }

    Ok(Cow::Owned(normalized))
}

/// Tables C.1.2, C.2.1, C.2.2, C.3, C.4, C.5, C.6, C.7, C.8 and C.9.
#[inline(always)]
fn is_prohibited(c: char) -> bool {
    tables::non_ascii_space_character(c)
        || tables::ascii_control_character(c)
        || tables::non_ascii_control_character(c)
        || tables::private_use(c)
        || tables::non_character_code_point(c)
        || tables::surrogate_code(c)
        || tables::inappropriate_for_plain_text(c)
        || tables::inappropriate_for_canonical_representation(c)
        || tables::change_display_properties_or_deprecated(c)
        || tables::tagging_character(c)
}
