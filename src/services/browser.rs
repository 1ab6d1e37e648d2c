// src/services/browser.rs

//! Stateful web session over reqwest.
//!
//! Emulates a minimal form-capable browser: it keeps a cookie map and
//! the current page, fills and submits forms found in the markup, and
//! follows links by path. Redirects are followed manually so that
//! `Set-Cookie` headers on intermediate hops are observed; reqwest's
//! built-in cookie jar cannot be snapshotted for persistence.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Client, Method};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Bound on manual redirect following per navigation.
const MAX_REDIRECT_HOPS: usize = 10;

/// How to locate a form on the current page.
#[derive(Debug, Clone, Copy)]
pub enum FormMatcher<'a> {
    /// First form matching a CSS selector.
    Css(&'a str),
    /// First form whose `method` attribute is `post`, case-insensitive.
    /// CSS attribute matching is case-sensitive and the portal mixes
    /// `POST` and `post` across its pages, so this cannot be a selector.
    PostMethod,
}

impl FormMatcher<'_> {
    fn describe(&self) -> String {
        match self {
            FormMatcher::Css(selector) => (*selector).to_string(),
            FormMatcher::PostMethod => "form[method=post]".to_string(),
        }
    }
}

/// A planned form submission: where to send what, and how.
#[derive(Debug)]
struct FormSubmission {
    method: Method,
    url: Url,
    fields: Vec<(String, String)>,
}

/// A stateful authenticated web session.
pub struct WebSession {
    client: Client,
    cookies: HashMap<String, String>,
    page: String,
    page_url: Option<Url>,
}

impl WebSession {
    /// Create a session with a configured HTTP client.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            cookies: HashMap::new(),
            page: String::new(),
            page_url: None,
        })
    }

    /// Raw markup of the current page.
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Current cookie snapshot, for persistence.
    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Replace the cookie map with a previously saved snapshot.
    pub fn restore_cookies(&mut self, cookies: HashMap<String, String>) {
        self.cookies = cookies;
    }

    /// Navigate to a URL with a GET request.
    pub async fn open(&mut self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        self.request(Method::GET, url, None).await
    }

    /// Locate a form on the current page, fill it, and submit it.
    ///
    /// The form's own input values (hidden fields in particular) are
    /// carried over; `overrides` replace inputs of the same name.
    pub async fn submit_form(
        &mut self,
        matcher: FormMatcher<'_>,
        overrides: &[(&str, &str)],
    ) -> Result<()> {
        let base = self.require_page_url()?.clone();
        let submission = plan_submission(&self.page, &base, matcher, overrides)?;

        if submission.method == Method::GET {
            let mut url = submission.url;
            url.query_pairs_mut().extend_pairs(&submission.fields);
            self.request(Method::GET, url, None).await
        } else {
            self.request(submission.method, submission.url, Some(submission.fields))
                .await
        }
    }

    /// Follow the first link on the current page whose href contains
    /// `path`. Raises the distinguished [`AppError::LinkNotFound`] when
    /// no such link exists.
    pub async fn follow_link(&mut self, path: &str) -> Result<()> {
        let base = self.require_page_url()?.clone();
        let target = find_link(&self.page, &base, path)?;
        self.request(Method::GET, target, None).await
    }

    fn require_page_url(&self) -> Result<&Url> {
        self.page_url
            .as_ref()
            .ok_or_else(|| AppError::navigation("no page loaded yet"))
    }

    /// Perform one navigation, following redirects manually and merging
    /// `Set-Cookie` headers from every hop into the session.
    async fn request(
        &mut self,
        method: Method,
        url: Url,
        form: Option<Vec<(String, String)>>,
    ) -> Result<()> {
        let mut method = method;
        let mut url = url;
        let mut form = form;

        for _ in 0..MAX_REDIRECT_HOPS {
            let mut request = self.client.request(method.clone(), url.clone());
            if !self.cookies.is_empty() {
                request = request.header(COOKIE, self.cookie_header());
            }
            if let Some(fields) = &form {
                request = request.form(fields);
            }

            let response = request.send().await?;
            self.absorb_cookies(&response);

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        AppError::navigation(format!("redirect from {url} without a Location"))
                    })?;
                url = url.join(location)?;
                // Redirect targets are fetched with GET, dropping the body.
                method = Method::GET;
                form = None;
                continue;
            }

            self.page = response.text().await?;
            self.page_url = Some(url);
            return Ok(());
        }

        Err(AppError::navigation(format!(
            "more than {MAX_REDIRECT_HOPS} redirects from {url}"
        )))
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn absorb_cookies(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            if let Some((name, value)) = value.to_str().ok().and_then(parse_set_cookie) {
                self.cookies.insert(name, value);
            }
        }
    }
}

/// Parse the name/value pair off the front of a `Set-Cookie` header.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Resolve a form in `page` into a ready-to-send submission.
///
/// Only `<input>` controls are collected; `<select>` and `<textarea>`
/// defaults are not. The portal's forms carry their state exclusively
/// in hidden inputs, so no navigation here needs the other controls.
fn plan_submission(
    page: &str,
    base: &Url,
    matcher: FormMatcher<'_>,
    overrides: &[(&str, &str)],
) -> Result<FormSubmission> {
    let document = Html::parse_document(page);
    let form = locate_form(&document, matcher)?;

    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("post") => Method::POST,
        _ => Method::GET,
    };

    let action = form.value().attr("action").unwrap_or("");
    let url = base.join(action)?;

    let input_selector = parse_selector("input")?;
    let mut fields: Vec<(String, String)> = Vec::new();
    for input in form.select(&input_selector) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        if overrides.iter().any(|(key, _)| *key == name) {
            continue;
        }
        let kind = input.value().attr("type").unwrap_or("text");
        if matches!(kind, "checkbox" | "radio") && input.value().attr("checked").is_none() {
            continue;
        }
        let value = input.value().attr("value").unwrap_or("");
        fields.push((name.to_string(), value.to_string()));
    }
    for (key, value) in overrides {
        fields.push(((*key).to_string(), (*value).to_string()));
    }

    Ok(FormSubmission {
        method,
        url,
        fields,
    })
}

fn locate_form<'a>(document: &'a Html, matcher: FormMatcher<'_>) -> Result<ElementRef<'a>> {
    let found = match matcher {
        FormMatcher::Css(selector) => {
            let selector = parse_selector(selector)?;
            document.select(&selector).next()
        }
        FormMatcher::PostMethod => {
            let forms = parse_selector("form")?;
            document.select(&forms).find(|form| {
                form.value()
                    .attr("method")
                    .is_some_and(|m| m.eq_ignore_ascii_case("post"))
            })
        }
    };

    found.ok_or_else(|| AppError::FormNotFound(matcher.describe()))
}

/// Find the first link whose href contains `path`, resolved against `base`.
fn find_link(page: &str, base: &Url, path: &str) -> Result<Url> {
    let document = Html::parse_document(page);
    let anchors = parse_selector("a[href]")?;

    for anchor in document.select(&anchors) {
        if let Some(href) = anchor.value().attr("href") {
            if href.contains(path) {
                return Ok(base.join(href)?);
            }
        }
    }

    Err(AppError::LinkNotFound(path.to_string()))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://records.example.ac.nz/landing").unwrap()
    }

    #[test]
    fn plan_submission_collects_hidden_inputs_and_overrides() {
        let page = r#"
            <form action="/adfs/ls/idp" method="POST">
                <input type="hidden" name="AuthMethod" value="Forms"/>
                <input type="text" name="UserName" value=""/>
                <input type="password" name="Password"/>
                <input type="submit" name="Submit" value="Sign in"/>
            </form>
        "#;

        let submission = plan_submission(
            page,
            &base(),
            FormMatcher::Css("form[action^=\"/adfs/ls\"]"),
            &[("UserName", "student"), ("Password", "hunter2")],
        )
        .unwrap();

        assert_eq!(submission.method, Method::POST);
        assert_eq!(submission.url.path(), "/adfs/ls/idp");
        assert!(
            submission
                .fields
                .contains(&("AuthMethod".into(), "Forms".into()))
        );
        assert!(
            submission
                .fields
                .contains(&("UserName".into(), "student".into()))
        );
        assert!(
            submission
                .fields
                .contains(&("Password".into(), "hunter2".into()))
        );
        // The form's own empty UserName must not survive alongside the override.
        let usernames = submission
            .fields
            .iter()
            .filter(|(name, _)| name == "UserName")
            .count();
        assert_eq!(usernames, 1);
    }

    #[test]
    fn post_matcher_is_case_insensitive() {
        let upper = r#"<form method="POST" action="/a"><input name="x" value="1"/></form>"#;
        let lower = r#"<form method="post" action="/b"></form>"#;

        let planned = plan_submission(upper, &base(), FormMatcher::PostMethod, &[]).unwrap();
        assert_eq!(planned.url.path(), "/a");

        let planned = plan_submission(lower, &base(), FormMatcher::PostMethod, &[]).unwrap();
        assert_eq!(planned.url.path(), "/b");
    }

    #[test]
    fn post_matcher_skips_get_forms() {
        let page = r#"
            <form method="get" action="/search"></form>
            <form method="post" action="/login"></form>
        "#;
        let planned = plan_submission(page, &base(), FormMatcher::PostMethod, &[]).unwrap();
        assert_eq!(planned.url.path(), "/login");
    }

    #[test]
    fn missing_form_is_a_form_not_found_error() {
        let page = "<p>Nothing here</p>";
        let err = plan_submission(page, &base(), FormMatcher::PostMethod, &[]).unwrap_err();
        assert!(matches!(err, AppError::FormNotFound(_)));
    }

    #[test]
    fn unchecked_checkboxes_are_omitted() {
        let page = r#"
            <form method="post" action="/a">
                <input type="checkbox" name="remember" value="yes"/>
                <input type="checkbox" name="agreed" value="yes" checked/>
            </form>
        "#;
        let planned = plan_submission(page, &base(), FormMatcher::PostMethod, &[]).unwrap();
        assert_eq!(planned.fields, vec![("agreed".into(), "yes".into())]);
    }

    #[test]
    fn find_link_matches_by_path_fragment() {
        let page = r#"
            <a href="/other/page">elsewhere</a>
            <a href="/pls/webprod/bwsxacdh.P_FacStuInfo">Academic History</a>
        "#;
        let url = find_link(page, &base(), "/pls/webprod/bwsxacdh.P_FacStuInfo").unwrap();
        assert_eq!(url.path(), "/pls/webprod/bwsxacdh.P_FacStuInfo");
    }

    #[test]
    fn missing_link_is_the_distinguished_condition() {
        let err = find_link("<p>no links</p>", &base(), "/target").unwrap_err();
        assert!(matches!(err, AppError::LinkNotFound(path) if path == "/target"));
    }

    #[test]
    fn set_cookie_parsing_takes_first_pair() {
        assert_eq!(
            parse_set_cookie("SESSID=abc123; Path=/; HttpOnly"),
            Some(("SESSID".into(), "abc123".into()))
        );
        assert_eq!(parse_set_cookie("garbage"), None);
    }
}
