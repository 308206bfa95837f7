// src/client/http.rs

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::REFERER;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Instant;

use crate::client::ExecutionBackend;
use crate::config::AppConfig;
use crate::errors::{IdeError, Result};
use crate::language::Language;
use crate::models::{DeleteResponse, ErrorDetail, RunCodeResponse, RunRequest, SubmissionHandle};

const RUN_CODE_PATH: &str = "/problem/run_code";
const DELETE_PATH: &str = "/submission/delete/";
const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP side of the judge: run requests, submission cleanup and grading.
/// Cheap to clone; clones share the connection pool and cookie store.
#[derive(Clone)]
pub struct JudgeClient {
    client: Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl JudgeClient {
    /// Creates a new `JudgeClient`, seeding the cookie store from `config.cookies`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let cookies = Arc::new(Jar::default());
        if let Some(raw) = &config.cookies {
            for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                cookies.add_cookie_str(pair, &config.base_url);
            }
        }

        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            cookies,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| IdeError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Current `csrftoken` cookie for the site, or an empty string.
    pub fn csrf_token(&self) -> String {
        let Some(header) = self.cookies.cookies(&self.base_url) else {
            return String::new();
        };
        header
            .to_str()
            .ok()
            .and_then(|cookies| find_cookie(cookies, CSRF_COOKIE))
            .unwrap_or_default()
            .to_string()
    }

    /// `POST /problem/run_code`.
    pub async fn submit_run(&self, request: &RunRequest) -> Result<SubmissionHandle> {
        let url = self.endpoint(RUN_CODE_PATH)?;

        log::info!("📡 Submitting run to {} (language: {})", url, request.language);

        let start = Instant::now();
        let resp = self.client.post(url).json(request).send().await?;

        let status = resp.status();
        log::info!(
            "📥 run_code response status: {} ({}ms)",
            status,
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorDetail>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(IdeError::ExecutionRequest {
                status: status.as_u16(),
                detail,
            });
        }

        let reply: RunCodeResponse = resp.json().await?;
        reply.into_handle()
    }

    /// `POST /submission/delete/` with the CSRF header. Any failure comes back as an error
    /// for the caller to log; nothing here retries.
    pub async fn delete_submission(&self, submission_id: &str) -> Result<()> {
        let url = self.endpoint(DELETE_PATH)?;

        let resp = self
            .client
            .post(url)
            .header(CSRF_HEADER, self.csrf_token())
            // Django's CSRF check wants a same-origin Referer on https.
            .header(REFERER, self.base_url.as_str())
            .form(&[("id", submission_id)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IdeError::Cleanup(format!("delete returned status {}", status)));
        }

        let reply: DeleteResponse = resp.json().await?;
        if reply.success {
            log::debug!("🧹 Deleted submission {}", submission_id);
            Ok(())
        } else {
            Err(IdeError::Cleanup(
                reply
                    .error
                    .or(reply.message)
                    .unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }

    /// Submit `source` for grading through the problem's submit form.
    ///
    /// # Returns
    /// The URL the judge redirected to, normally the submission status page.
    pub async fn submit_for_grading(
        &self,
        problem_path: &str,
        language: Language,
        source: &str,
    ) -> Result<Url> {
        let grading_id = language
            .grading_id()
            .ok_or_else(|| IdeError::UnsupportedLanguage(language.to_string()))?
            .to_string();
        let url = self.endpoint(&grading_path(problem_path))?;
        let token = self.csrf_token();

        log::info!("📤 Submitting {} solution to {}", language, url);

        let form = [
            ("ide_source", source),
            ("ide_language", grading_id.as_str()),
            ("csrfmiddlewaretoken", token.as_str()),
        ];

        let resp = self
            .client
            .post(url)
            .header(CSRF_HEADER, token.as_str())
            .header(REFERER, self.base_url.as_str())
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(IdeError::Grading {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.url().clone())
    }
}

impl ExecutionBackend for JudgeClient {
    async fn run_code(&self, request: &RunRequest) -> Result<SubmissionHandle> {
        self.submit_run(request).await
    }
}

/// Value of cookie `name` in a `Cookie:` header.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `{problem_path}/submit`, tolerating a trailing slash on the problem path.
fn grading_path(problem_path: &str) -> String {
    let mut path = problem_path.trim().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str("submit");
    path
}
