//! A cookie-carrying browsing session against the Plaud web app.
//!
//! The session walks redirect chains itself so every `Set-Cookie` along the
//! way lands in its jar, and it understands just enough HTML to find and
//! submit a login form. Cookies are scoped by domain, path and `Secure`, so a
//! hop through another host never sees the Plaud session.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::InteractionError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::settings::PlaudSettings;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Sent with every request; the web app serves a reduced page to unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

const EMAIL_INPUTS: &[&str] = &[
    "input[type=\"email\"]",
    "input[name=\"email\"]",
    "input[placeholder*=\"email\" i]",
    "input[type=\"text\"]",
];

const PASSWORD_INPUTS: &[&str] = &["input[type=\"password\"]", "input[name=\"password\"]"];

/// A fully loaded page after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Credentials form found on the login page, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Body encoded as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

pub struct PlaudSession<'a> {
    transport: &'a dyn HttpTransport,
    cookies: Jar,
}

impl<'a> PlaudSession<'a> {
    pub fn open(transport: &'a dyn HttpTransport) -> Self {
        tracing::debug!("Opened Plaud session");
        Self {
            transport,
            cookies: Jar::default(),
        }
    }

    /// Discard the cookie jar.
    pub fn close(self) {
        tracing::debug!("Closed Plaud session");
    }

    /// Value of cookie `name` as it would be sent to `url`.
    pub fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let header = self.cookie_header(&Url::parse(url).ok()?)?;
        header
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    fn cookie_header(&self, url: &Url) -> Option<String> {
        let header = self.cookies.cookies(url)?;
        header.to_str().ok().map(str::to_string)
    }

    /// Submit the configured credentials through the login page's form.
    pub async fn login(&mut self, settings: &PlaudSettings) -> Result<(), InteractionError> {
        let login_url = settings.login_url();
        tracing::debug!(url = %login_url, "Loading login page");

        let page = self.get(&login_url).await?;
        if !(200..300).contains(&page.status) {
            return Err(InteractionError::Navigation {
                url: page.url,
                status: page.status,
            });
        }

        let form = parse_login_form(&page.body, &page.url, &settings.email, &settings.password)?;
        tracing::debug!(action = %form.action, "Submitting login form");

        let landing = self
            .send(HttpMethod::Post, &form.action, form.encode().into_bytes())
            .await?;
        match landing.status {
            401 | 403 => {
                return Err(InteractionError::LoginRejected {
                    message: format!("HTTP {}", landing.status),
                });
            }
            status if !(200..300).contains(&status) => {
                return Err(InteractionError::Navigation {
                    url: landing.url,
                    status,
                });
            }
            _ => {}
        }
        if shows_password_input(&landing.body) {
            return Err(InteractionError::LoginRejected {
                message: format!("still on a login page at {}", landing.url),
            });
        }

        tracing::info!("Logged in to Plaud");
        Ok(())
    }

    /// Load an authenticated page.
    pub async fn navigate(&mut self, url: &str) -> Result<Page, InteractionError> {
        tracing::debug!(url, "Navigating");
        let page = self.get(url).await?;
        if !(200..300).contains(&page.status) {
            return Err(InteractionError::Navigation {
                url: page.url,
                status: page.status,
            });
        }
        if shows_password_input(&page.body) {
            return Err(InteractionError::LoginRejected {
                message: format!("redirected to a login page at {}", page.url),
            });
        }
        Ok(page)
    }

    async fn get(&mut self, url: &str) -> Result<Page, InteractionError> {
        self.send(HttpMethod::Get, url, Vec::new()).await
    }

    /// Send a request and follow redirects up to [`MAX_REDIRECTS`] hops.
    async fn send(
        &mut self,
        method: HttpMethod,
        url: &str,
        body: Vec<u8>,
    ) -> Result<Page, InteractionError> {
        let mut current = Url::parse(url).map_err(|e| InteractionError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let mut method = method;
        let mut body = body;

        for _ in 0..=MAX_REDIRECTS {
            let request = self.request(method, &current, &body);
            let response =
                self.transport
                    .send(request)
                    .await
                    .map_err(|e| InteractionError::Transport {
                        url: current.to_string(),
                        message: e.to_string(),
                    })?;
            self.store_cookies(&current, &response);

            let location = response.header("location").map(str::to_string);
            let (true, Some(location)) = (response.is_redirect(), location) else {
                return Ok(Page {
                    url: current.to_string(),
                    status: response.status,
                    body: response.text(),
                });
            };

            current = current
                .join(&location)
                .map_err(|e| InteractionError::Transport {
                    url: location.clone(),
                    message: e.to_string(),
                })?;
            // 307/308 replay the request; everything else becomes a GET.
            if !matches!(response.status, 307 | 308) {
                method = HttpMethod::Get;
                body.clear();
            }
            tracing::debug!(status = response.status, location = %current, "Following redirect");
        }

        Err(InteractionError::TooManyRedirects {
            url: url.to_string(),
        })
    }

    fn request(&self, method: HttpMethod, url: &Url, body: &[u8]) -> HttpRequest {
        let mut request = HttpRequest::new(method, url.as_str())
            .with_header("User-Agent", USER_AGENT)
            .with_header("Accept", ACCEPT_HTML);
        if let Some(cookie) = self.cookie_header(url) {
            request = request.with_header("Cookie", cookie);
        }
        if method == HttpMethod::Post {
            request = request
                .with_header("Content-Type", "application/x-www-form-urlencoded")
                .with_body(body.to_vec());
        }
        request
    }

    fn store_cookies(&self, url: &Url, response: &HttpResponse) {
        let values: Vec<HeaderValue> = response
            .header_values("set-cookie")
            .filter_map(|raw| HeaderValue::from_str(raw).ok())
            .collect();
        if !values.is_empty() {
            self.cookies.set_cookies(&mut values.iter(), url);
        }
    }
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

fn first_match<'a>(scope: ElementRef<'a>, cascade: &[Selector]) -> Option<ElementRef<'a>> {
    cascade
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

/// Whether the page still asks for a password.
pub fn shows_password_input(html: &str) -> bool {
    let document = Html::parse_document(html);
    first_match(document.root_element(), &selectors(PASSWORD_INPUTS)).is_some()
}

/// Locate the credentials form and fill it in.
///
/// Hidden inputs and a named submit button are carried along so CSRF tokens
/// survive the round trip.
pub fn parse_login_form(
    html: &str,
    page_url: &str,
    email: &str,
    password: &str,
) -> Result<LoginForm, InteractionError> {
    let not_found = || InteractionError::LoginFormNotFound {
        url: page_url.to_string(),
    };

    let document = Html::parse_document(html);
    let password_inputs = selectors(PASSWORD_INPUTS);
    let email_inputs = selectors(EMAIL_INPUTS);
    let Ok(form_selector) = Selector::parse("form") else {
        return Err(not_found());
    };

    let form = document
        .select(&form_selector)
        .find(|form| first_match(*form, &password_inputs).is_some())
        .or_else(|| document.select(&form_selector).next());
    let scope = form.unwrap_or_else(|| document.root_element());

    let password_input = first_match(scope, &password_inputs).ok_or_else(not_found)?;
    let email_input = first_match(scope, &email_inputs).ok_or_else(not_found)?;

    let mut fields = Vec::new();
    if let Ok(hidden) = Selector::parse("input[type=\"hidden\"][name]") {
        for input in scope.select(&hidden) {
            let value = input.value();
            if let Some(name) = value.attr("name") {
                fields.push((
                    name.to_string(),
                    value.attr("value").unwrap_or_default().to_string(),
                ));
            }
        }
    }
    fields.push((
        email_input.value().attr("name").unwrap_or("email").to_string(),
        email.to_string(),
    ));
    fields.push((
        password_input
            .value()
            .attr("name")
            .unwrap_or("password")
            .to_string(),
        password.to_string(),
    ));
    if let Ok(submit) =
        Selector::parse("button[type=\"submit\"][name], input[type=\"submit\"][name]")
        && let Some(button) = scope.select(&submit).next()
        && let Some(name) = button.value().attr("name")
    {
        fields.push((
            name.to_string(),
            button.value().attr("value").unwrap_or_default().to_string(),
        ));
    }

    let base = Url::parse(page_url).map_err(|_| not_found())?;
    let action = form
        .and_then(|form| form.value().attr("action"))
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .and_then(|action| base.join(action).ok())
        .unwrap_or(base);

    Ok(LoginForm {
        action: action.to_string(),
        fields,
    })
}
