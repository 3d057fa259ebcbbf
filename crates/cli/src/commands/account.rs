//! Sign-in, profile and order history.

use std::io::{self, Write};

use marketplace_storefront::Storefront;
use marketplace_storefront::api::ProfileUpdate;
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandResult, fallback, outcome};
use crate::render;

/// Read a password from the first line of stdin.
pub async fn read_password() -> io::Result<SecretString> {
    let mut prompt = io::stderr().lock();
    write!(prompt, "Password: ")?;
    prompt.flush()?;
    drop(prompt);

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub async fn login(
    storefront: &mut Storefront,
    email: &str,
    out: &mut impl Write,
) -> CommandResult {
    let password = read_password().await?;
    let notice = storefront.login(email, &password).await;
    outcome(out, &notice)
}

pub async fn register(
    storefront: &mut Storefront,
    name: &str,
    email: &str,
    out: &mut impl Write,
) -> CommandResult {
    let password = read_password().await?;
    let notice = storefront.register(name, email, &password).await;
    outcome(out, &notice)
}

pub async fn logout(storefront: &mut Storefront, out: &mut impl Write) -> CommandResult {
    if !storefront.is_authenticated() {
        writeln!(out, "Not signed in.")?;
        return Ok(());
    }
    let notice = storefront.logout().await;
    outcome(out, &notice)
}

/// Show the profile, applying `update` first when it changes anything.
pub async fn profile(
    storefront: &mut Storefront,
    update: ProfileUpdate,
    out: &mut impl Write,
) -> CommandResult {
    if update != ProfileUpdate::default() {
        let notice = storefront.update_profile(&update).await;
        outcome(out, &notice)?;
    }
    let loaded = storefront.profile().await;
    if let Some(user) = &loaded.value {
        render::user(out, user)?;
    }
    fallback(loaded.notice)
}

pub async fn orders(storefront: &mut Storefront, out: &mut impl Write) -> CommandResult {
    let loaded = storefront.orders().await;
    render::orders(out, &loaded.value)?;
    fallback(loaded.notice)
}

/// The server-side watchlist, merged into this session's.
pub async fn watchlist(storefront: &mut Storefront, out: &mut impl Write) -> CommandResult {
    match storefront.sync_watchlist().await {
        Some(notice) if notice.is_error() => return Err(notice.to_string().into()),
        Some(_) => {}
        None => {
            writeln!(out, "Sign in to see your saved watchlist.")?;
            return Ok(());
        }
    }
    render::watchlist(out, storefront.watchlist())?;
    Ok(())
}
