//! Login flow for the remote site
//!
//! The session lives in the fetcher's cookie store; once this succeeds every
//! later request is authenticated.

use crate::config::Credentials;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{extract_csrf_token, is_logged_in};
use crate::CragError;
use url::Url;

/// Logs in with the given credentials
///
/// Any failure here is an [`CragError::Auth`], since nothing else can succeed
/// without a session.
pub async fn login(
    fetcher: &mut Fetcher,
    login_url: &Url,
    credentials: &Credentials,
) -> Result<(), CragError> {
    tracing::info!("Logging in as {}", credentials.username);

    let login_page = fetcher
        .get_text(login_url)
        .await
        .map_err(|e| CragError::Auth(format!("could not load login page: {}", e)))?;

    let token = extract_csrf_token(&login_page)
        .ok_or_else(|| CragError::Auth("login page has no CSRF token".to_string()))?;

    let form = [
        ("authenticity_token", token.as_str()),
        ("web_user[username]", credentials.username.as_str()),
        ("web_user[password]", credentials.password.as_str()),
        ("web_user[remember_me]", "1"),
    ];

    let response = fetcher
        .post_form(login_url, &form)
        .await
        .map_err(|e| CragError::Auth(format!("login request failed: {}", e)))?;

    if is_logged_in(&response.body) {
        tracing::info!("Logged in (landed on {})", response.final_url);
        return Ok(());
    }

    if response.body.contains("Invalid email or password") {
        Err(CragError::Auth("invalid username or password".to_string()))
    } else {
        Err(CragError::Auth(format!(
            "could not confirm login (HTTP {} from {})",
            response.status, response.final_url
        )))
    }
}
