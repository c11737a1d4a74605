use anyhow::{Context as _, Result, bail};
use baileys_authdb::{AuthState, open_auth_state};
use baileys_authdb_core::codec;
use baileys_authdb_storage::{AuthStore, ConnectionDescriptor, SessionOptions, connect};

use crate::Target;

fn descriptor(target: &Target) -> Result<ConnectionDescriptor> {
    match (&target.url, &target.options_json) {
        (Some(url), _) => Ok(ConnectionDescriptor::from(url.as_str())),
        (None, Some(json)) => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--options-json is not valid JSON")?;
            Ok(ConnectionDescriptor::from_json(value)?)
        },
        (None, None) => bail!("no connection given: pass --url, set BAILEYS_AUTHDB_URL, or pass --options-json"),
    }
}

fn session_options(target: &Target) -> SessionOptions {
    let mut options = SessionOptions::new();
    if let Some(session) = &target.session {
        options = options.session(session);
    }
    if let Some(table) = &target.table {
        options = options.table(table).collection(table);
    }
    options
}

pub(crate) async fn run_check(target: &Target) -> Result<()> {
    let connection = connect(&descriptor(target)?, &session_options(target)).await?;
    println!("ok: {} session {:?}", connection.dialect(), connection.session());
    connection.close().await?;
    Ok(())
}

pub(crate) async fn run_init(target: &Target) -> Result<()> {
    let auth: AuthState = open_auth_state(descriptor(target)?, &session_options(target)).await?;
    auth.save_creds().await?;
    let creds = auth.creds();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "registrationId": creds.registration_id,
            "registered": creds.registered,
        }))?
    );
    auth.close().await?;
    Ok(())
}

pub(crate) async fn run_show(target: &Target, identifier: &str) -> Result<()> {
    let connection = connect(&descriptor(target)?, &session_options(target)).await?;
    let stored = connection.get_value(identifier).await;
    connection.close().await?;
    match stored? {
        Some(text) => {
            let value = codec::deserialize_value(&text)
                .with_context(|| format!("stored value for {identifier} is not valid JSON"))?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        None => println!("No value stored for {identifier}"),
    }
    Ok(())
}

pub(crate) async fn run_wipe(target: &Target, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("refusing to wipe without --yes");
    }
    let connection = connect(&descriptor(target)?, &session_options(target)).await?;
    let wiped = connection.wipe().await;
    connection.close().await?;
    wiped?;
    println!("wiped session {:?}", connection.session());
    Ok(())
}
