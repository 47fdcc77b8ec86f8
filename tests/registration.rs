mod common;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use httpmock::MockServer;
use httpmock::prelude::HttpMockRequest;
use klokapp_client_sdk::Result;
use klokapp_client_sdk::auth::{FALLBACK_RECAPTCHA_TOKEN, PlainVerification, VerificationChain};
use klokapp_client_sdk::errors::Error;
use klokapp_client_sdk::registration::{RegistrationReport, Registrar};
use klokapp_client_sdk::wallet::Wallet;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{RecordingSleeper, SESSION_TOKEN, ScriptedRandom, carries_captcha, client};

const REFERRAL_CODE: &str = "KLOK123";

fn registrar(server: &MockServer, accounts_file: &Path) -> Result<(Registrar, RecordingSleeper)> {
    let sleeper = RecordingSleeper::default();
    let registrar = Registrar::new(client(server)?, REFERRAL_CODE, accounts_file)
        .with_random(ScriptedRandom::default())
        .with_sleeper(sleeper.clone());
    Ok((registrar, sleeper))
}

fn recorded_accounts(path: &Path) -> Result<Vec<(String, String)>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .filter_map(|line| line.split_once(" | "))
        .map(|(address, key)| (address.to_owned(), key.to_owned()))
        .collect())
}

#[tokio::test]
async fn registers_each_account_with_the_referral_code() -> Result<()> {
    let server = MockServer::start();
    let dir = tempfile::tempdir()?;
    let accounts_file = dir.path().join("accounts.txt");

    // No token endpoint answers, so the fallback recaptcha token goes out.
    let verify = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/verify").json_body_partial(
            json!({
                "referral_code": REFERRAL_CODE,
                "recaptcha_token": FALLBACK_RECAPTCHA_TOKEN
            })
            .to_string(),
        );
        then.status(StatusCode::OK.as_u16())
            .json_body(json!({ "session_token": SESSION_TOKEN }));
    });

    let (mut registrar, sleeper) = registrar(&server, &accounts_file)?;
    let report = registrar.run(3).await?;

    assert_eq!(
        report,
        RegistrationReport {
            created: 3,
            succeeded: 3,
            failed: 0
        }
    );
    verify.assert_hits(3);

    let accounts = recorded_accounts(&accounts_file)?;
    assert_eq!(accounts.len(), 3);
    for (address, key) in &accounts {
        assert_eq!(Wallet::from_private_key(key)?.address().to_string(), *address);
    }
    let distinct: HashSet<_> = accounts.iter().map(|(address, _)| address).collect();
    assert_eq!(distinct.len(), 3);

    // A pause between accounts, none after the last.
    assert_eq!(sleeper.recorded(), [Duration::from_secs(3); 2]);

    Ok(())
}

#[tokio::test]
async fn token_from_a_recaptcha_endpoint_is_preferred() -> Result<()> {
    let server = MockServer::start();
    let dir = tempfile::tempdir()?;
    let accounts_file = dir.path().join("accounts.txt");

    let issued = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/recaptcha-token");
        then.status(StatusCode::OK.as_u16()).json_body(json!({ "token": "issued-token" }));
    });
    let later = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/captcha");
        then.status(StatusCode::OK.as_u16()).json_body(json!({ "token": "unused-token" }));
    });
    let verify = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/verify")
            .json_body_partial(json!({ "recaptcha_token": "issued-token" }).to_string());
        then.status(StatusCode::OK.as_u16())
            .json_body(json!({ "session_token": SESSION_TOKEN }));
    });

    let (mut registrar, sleeper) = registrar(&server, &accounts_file)?;
    let report = registrar.run(1).await?;

    assert_eq!(report.succeeded, 1);
    issued.assert_hits(1);
    later.assert_hits(0);
    verify.assert_hits(1);
    assert!(sleeper.recorded().is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_sign_ups_are_counted_and_their_keys_kept() -> Result<()> {
    let server = MockServer::start();
    let dir = tempfile::tempdir()?;
    let accounts_file = dir.path().join("accounts.txt");

    let verify = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/verify");
        then.status(StatusCode::FORBIDDEN.as_u16()).body("captcha required");
    });

    let (mut registrar, _) = registrar(&server, &accounts_file)?;
    let report = registrar.run(2).await?;

    assert_eq!(
        report,
        RegistrationReport {
            created: 2,
            succeeded: 0,
            failed: 2
        }
    );
    // recaptcha endpoint, direct and three dummy tokens; the challenge strategies never get a
    // token to submit.
    verify.assert_hits(10);
    assert_eq!(recorded_accounts(&accounts_file)?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn custom_chain_still_carries_the_referral_code() -> Result<()> {
    let server = MockServer::start();
    let dir = tempfile::tempdir()?;
    let accounts_file = dir.path().join("accounts.txt");

    let verify = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/verify")
            .json_body_partial(json!({ "referral_code": REFERRAL_CODE }).to_string())
            .matches(|req: &HttpMockRequest| !carries_captcha(req));
        then.status(StatusCode::OK.as_u16())
            .json_body(json!({ "session_token": SESSION_TOKEN }));
    });

    let (registrar, _) = registrar(&server, &accounts_file)?;
    let mut registrar =
        registrar.with_chain(VerificationChain::new(vec![Box::new(PlainVerification)]));
    let report = registrar.run(1).await?;

    assert_eq!(report.succeeded, 1);
    verify.assert_hits(1);

    Ok(())
}

#[tokio::test]
async fn unwritable_accounts_file_stops_before_any_sign_up() -> Result<()> {
    let server = MockServer::start();
    let dir = tempfile::tempdir()?;

    let verify = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/verify");
        then.status(StatusCode::OK.as_u16())
            .json_body(json!({ "session_token": SESSION_TOKEN }));
    });

    // A directory cannot be opened for appending.
    let (mut registrar, _) = registrar(&server, dir.path())?;
    let result = registrar.run(2).await;

    match result {
        Ok(_) => panic!("expected failure"),
        Err(Error::Io(_)) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }
    verify.assert_hits(0);

    Ok(())
}
