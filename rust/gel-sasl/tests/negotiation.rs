use gel_sasl::{
    creds::ExternalVerification,
    handshake::{
        client::ClientAuth,
        server::{ServerAuth, ServerAuthDrive, ServerAuthResponse},
    },
    hashing::{HashName, Pbkdf2Hash},
    prep::Preparation,
    *,
};
use rstest::rstest;
use std::sync::Arc;

/// Run an exchange over an in-memory "transport", returning the final
/// server response and every challenge the server sent.
fn exchange(mut client: ClientAuth, server: &mut ServerAuth) -> (ServerAuthResponse, Vec<Vec<u8>>) {
    let (name, initial) = client.start().unwrap();
    assert_eq!(name, server.mechanism().name());
    let mut challenges = vec![];
    let mut response = match &initial {
        Some(initial) => server.drive(ServerAuthDrive::InitialResponse(initial)),
        None => server.drive(ServerAuthDrive::Initial),
    };
    while let ServerAuthResponse::Challenge(challenge) = response {
        assert!(challenges.len() < 5, "too many challenges");
        let answer = client.next(&challenge).unwrap();
        challenges.push(challenge);
        response = server.drive(ServerAuthDrive::Response(&answer));
    }
    (response, challenges)
}

fn credentials(response: ServerAuthResponse) -> ServerCredentials {
    match response {
        ServerAuthResponse::Complete(creds, _) => creds,
        response => panic!("exchange did not complete: {response:?}"),
    }
}

#[test_log::test]
fn test_registry_negotiation() -> Result<(), AuthError> {
    let config = SaslConfig::default();
    let server_sasl = SaslAuth::named(["CRAM-MD5", "PLAIN", "LOGIN"], &config)?;
    let client_sasl = SaslAuth::defaults();

    // The client picks the first advertised mechanism it also supports.
    let mech = server_sasl
        .server_mechanisms()
        .into_iter()
        .find_map(|m| client_sasl.get(m.name()))
        .cloned()
        .unwrap();
    assert_eq!(mech.name(), "PLAIN");

    let hash = Arc::new(Pbkdf2Hash::new(HashName::Sha512, 16, 100)?);
    let identity = HashedIdentity::create("user", "password", hash)?;
    let client = ClientAuth::new(mech.clone(), ClientCredentials::new("user", "password"));
    let mut server = ServerAuth::new(server_sasl.get(mech.name()).cloned().unwrap());
    let (response, challenges) = exchange(client, &mut server);
    assert!(challenges.is_empty());
    let creds = credentials(response);
    assert_eq!(creds.verify(Some(&identity))?, VerifyOutcome::Verified(true));
    Ok(())
}

/// One mechanism value serves many negotiations at once.
#[test_log::test]
fn test_shared_mechanism() {
    let mech = Mechanism::builtin("CRAM-MD5", &SaslConfig::default()).unwrap();
    let users = ["alice", "bob", "carol", "dave"];
    let tokens = std::thread::scope(|s| {
        let handles = users.map(|user| {
            let mech = &mech;
            s.spawn(move || {
                let identity = ClearIdentity::new(user, "password").unwrap();
                let client = ClientAuth::new(mech.clone(), ClientCredentials::new(user, "password"));
                let mut server = ServerAuth::new(mech.clone());
                let (response, mut challenges) = exchange(client, &mut server);
                let creds = credentials(response);
                assert_eq!(creds.authcid(), user);
                assert!(creds.verify(Some(&identity)).unwrap().is_verified());
                challenges.remove(0)
            })
        });
        handles.map(|h| h.join().unwrap())
    });
    for (i, token) in tokens.iter().enumerate() {
        assert!(!tokens[i + 1..].contains(token), "challenge token reused");
    }
}

#[test_log::test]
fn test_xoauth2_rejected_token() {
    let mech = Mechanism::builtin("XOAUTH2", &SaslConfig::default()).unwrap();
    let mut client = ClientAuth::new(
        mech.clone(),
        ClientCredentials::new("user@example.com", "expired"),
    );
    let mut server = ServerAuth::new(mech);

    let (_, initial) = client.start().unwrap();
    let creds = credentials(server.drive(ServerAuthDrive::InitialResponse(&initial.unwrap())));
    let VerifyOutcome::Deferred(ExternalVerification { authzid, token }) =
        creds.verify(None).unwrap()
    else {
        panic!("expected external verification");
    };
    assert_eq!(authzid, "user@example.com");
    assert_eq!(token.as_deref(), Some("expired"));

    // The caller rejects the token and reports the error as a challenge,
    // which the client acknowledges with an empty response.
    let error = br#"{"status":"401","schemes":"bearer"}"#;
    assert_eq!(client.next(error).unwrap(), b"");
}

#[rstest]
#[test_log::test]
fn test_prepared_credentials(
    #[values("PLAIN", "LOGIN", "CRAM-MD5")] name: &str,
    #[values(Preparation::SaslPrep, Preparation::NoPrep)] prepare: Preparation,
) {
    let config = SaslConfig::default().with_prepare(prepare);
    let mech = Mechanism::builtin(name, &config).unwrap();
    let identity = ClearIdentity::with_prepare("IX", "IX", prepare).unwrap();
    // Soft hyphen maps to nothing, roman numeral nine to "IX".
    let client = ClientAuth::new(mech.clone(), ClientCredentials::new("I\u{00AD}X", "\u{2168}"));
    let mut server = ServerAuth::new(mech);
    let (response, _) = exchange(client, &mut server);
    let verified = credentials(response)
        .verify(Some(&identity))
        .unwrap()
        .is_verified();
    assert_eq!(verified, prepare == Preparation::SaslPrep);
}

#[rstest]
#[test_log::test]
fn test_round_limits(
    #[values("PLAIN", "LOGIN", "CRAM-MD5", "EXTERNAL", "XOAUTH2")] name: &str,
) {
    let mech = Mechanism::builtin(name, &SaslConfig::default()).unwrap();
    let client = mech.as_client();
    let creds = ClientCredentials::new("user", "password");
    let limit = if name == "LOGIN" { 3 } else { 2 };
    let challenges = vec![ServerChallenge::new(""); limit];
    for n in 0..limit {
        assert!(client.client_attempt(&creds, &challenges[..n]).is_ok());
    }
    assert_eq!(
        client.client_attempt(&creds, &challenges),
        Err(AuthError::UnexpectedChallenge)
    );
}
