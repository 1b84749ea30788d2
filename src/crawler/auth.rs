//! Form login performed once before the crawl
//!
//! The crawl core treats authentication as opaque: it only needs the shared
//! client's cookie store to hold a valid session afterwards. Any failure
//! here is fatal, since crawling unauthenticated would report every gated
//! page as broken or redirected.

use crate::config::AuthConfig;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Establishes an authenticated session for subsequent navigations
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<(), CrawlError>;
}

/// Login form as found on the login page
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginForm {
    action: Url,
    hidden_fields: Vec<(String, String)>,
}

/// Username/password form login over the crawl's HTTP client
#[derive(Debug, Clone)]
pub struct FormLogin {
    client: Client,
    config: AuthConfig,
}

impl FormLogin {
    pub fn new(client: Client, config: AuthConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Authenticator for FormLogin {
    async fn authenticate(&self) -> Result<(), CrawlError> {
        login(&self.client, &self.config).await
    }
}

/// Logs in through the configured form
///
/// # Flow
///
/// 1. GET the login URL (collects pre-login cookies)
/// 2. Locate the form holding the password field; keep its action and
///    hidden inputs (CSRF tokens and the like)
/// 3. POST hidden inputs, extra fields and credentials as a urlencoded form
/// 4. Follow redirects and verify the result
///
/// # Failure Conditions
///
/// - transport error or non-2xx status on either request
/// - the final URL is still the login page
/// - the configured failure marker appears in the final page
/// - the final page still shows the password field
pub async fn login(client: &Client, config: &AuthConfig) -> Result<(), CrawlError> {
    let login_url = Url::parse(&config.login_url)?;
    tracing::info!("Logging in at {}", login_url);

    let response = client
        .get(login_url.clone())
        .send()
        .await
        .map_err(|e| CrawlError::Auth(format!("login page unreachable: {}", e)))?;

    if !response.status().is_success() {
        return Err(CrawlError::Auth(format!(
            "login page returned HTTP {}",
            response.status()
        )));
    }

    let page_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| CrawlError::Auth(format!("failed to read login page: {}", e)))?;

    let form = find_login_form(&body, &page_url, &config.password_field).unwrap_or_else(|| {
        tracing::debug!("No login form found on {}; posting to it directly", page_url);
        LoginForm {
            action: page_url.clone(),
            hidden_fields: Vec::new(),
        }
    });

    let mut fields = form.hidden_fields;
    fields.extend(
        config
            .extra_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    fields.push((config.username_field.clone(), config.username.clone()));
    fields.push((config.password_field.clone(), config.password.clone()));

    tracing::debug!("Submitting login form to {}", form.action);
    let response = client
        .post(form.action.clone())
        .form(&fields)
        .send()
        .await
        .map_err(|e| CrawlError::Auth(format!("login submission failed: {}", e)))?;

    let status = response.status();
    let landed_on = response.url().clone();
    if !status.is_success() {
        return Err(CrawlError::Auth(format!(
            "login submission returned HTTP {}",
            status
        )));
    }

    if still_on_login_page(&login_url, &landed_on) {
        return Err(CrawlError::Auth(format!(
            "redirected back to the login page ({})",
            landed_on
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| CrawlError::Auth(format!("failed to read login response: {}", e)))?;

    if let Some(marker) = config.failure_marker.as_deref() {
        if !marker.is_empty() && body.contains(marker) {
            return Err(CrawlError::Auth(format!(
                "login rejected ('{}' found on {})",
                marker, landed_on
            )));
        }
    }

    if find_login_form(&body, &landed_on, &config.password_field).is_some() {
        return Err(CrawlError::Auth(format!(
            "still on a login form after submitting ({})",
            landed_on
        )));
    }

    tracing::info!("Login succeeded, session established ({})", landed_on);
    Ok(())
}

/// True if the login flow ended on the login page itself
///
/// A login page served at the site root is ambiguous, since a successful
/// login often lands there too; the marker and form checks decide it.
fn still_on_login_page(login_url: &Url, landed_on: &Url) -> bool {
    login_url.path() != "/"
        && landed_on.path() == login_url.path()
        && landed_on.host_str() == login_url.host_str()
}

/// Finds the first form containing an input named `password_field`
fn find_login_form(html: &str, page_url: &Url, password_field: &str) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input[name]").ok()?;

    document.select(&form_selector).find_map(|form| {
        let inputs: Vec<_> = form.select(&input_selector).collect();
        let has_password = inputs
            .iter()
            .any(|input| input.value().attr("name") == Some(password_field));
        if !has_password {
            return None;
        }

        let action = form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .and_then(|a| page_url.join(a).ok())
            .unwrap_or_else(|| page_url.clone());

        let hidden_fields = inputs
            .iter()
            .filter(|input| {
                input
                    .value()
                    .attr("type")
                    .map_or(false, |t| t.eq_ignore_ascii_case("hidden"))
            })
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Some(LoginForm {
            action,
            hidden_fields,
        })
    })
}
