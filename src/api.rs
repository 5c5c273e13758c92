use crate::settings::Settings;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const TWEETS_PATH: &str = "/2/tweets";
const MEDIA_UPLOAD_PATH: &str = "/1.1/media/upload.json";

const API_KEY_VAR: &str = "API_KEY";
const API_SECRET_VAR: &str = "API_SECRET";
const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
const ACCESS_SECRET_VAR: &str = "ACCESS_SECRET";

/// RFC 3986 unreserved characters pass through; everything else is percent-encoded.
const RFC3986: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

type HmacSha1 = Hmac<sha1::Sha1>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("401 Unauthorized: {body}")]
    Unauthorized { body: String },

    #[error("rate limited (429). {}try again later", .reset.as_deref().map(|r| format!("Resets at timestamp {r}. ")).unwrap_or_default())]
    RateLimited { reset: Option<String> },

    #[error("X API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("media error: {0}")]
    Media(String),

    #[error("failed to parse response: {0}")]
    Decode(String),
}

/// The four OAuth 1.0a user-context secrets.
#[derive(Clone, Default)]
pub struct Config {
    pub api_key: String,
    pub api_key_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"***REDACTED***")
            .field("api_key_secret", &"***REDACTED***")
            .field("access_token", &"***REDACTED***")
            .field("access_token_secret", &"***REDACTED***")
            .finish()
    }
}

impl Config {
    /// Read credentials from the process environment, falling back to the
    /// `KEY=value` pairs in `dotenv_path`. A missing file is fine.
    pub fn load(dotenv_path: &Path) -> Result<Self, dotenvy::Error> {
        Self::load_with(dotenv_path, |name| std::env::var(name).ok())
    }

    /// Variables already set in `env` win over the dotenv file.
    pub fn load_with(
        dotenv_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, dotenvy::Error> {
        let file_vars = read_dotenv(dotenv_path)?;
        Ok(Self::from_lookup(|name| {
            env(name).or_else(|| file_vars.get(name).cloned())
        }))
    }

    /// Build credentials from any key lookup. Missing values are left empty;
    /// X rejects them with a 401 when the tweet is posted.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name).unwrap_or_else(|| {
                tracing::warn!("{name} is not set");
                String::new()
            })
        };

        Self {
            api_key: get(API_KEY_VAR),
            api_key_secret: get(API_SECRET_VAR),
            access_token: get(ACCESS_TOKEN_VAR),
            access_token_secret: get(ACCESS_SECRET_VAR),
        }
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, dotenvy::Error> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            let vars = iter.collect::<Result<HashMap<_, _>, _>>()?;
            tracing::info!("Loaded {} variables from {}", vars.len(), path.display());
            Ok(vars)
        }
        Err(e) if e.not_found() => {
            tracing::debug!("No {} file, using the process environment", path.display());
            Ok(HashMap::new())
        }
        Err(e) => Err(e),
    }
}

pub struct XClient {
    config: Config,
    http: Client,
    tweets_url: String,
    media_upload_url: String,
}

#[derive(Serialize)]
struct TweetBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MediaResponse {
    media_id_string: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostResult {
    pub tweet_id: String,
    pub url: String,
}

impl PostResult {
    pub fn new(tweet_id: impl Into<String>) -> Self {
        let tweet_id = tweet_id.into();
        Self {
            url: format!("https://x.com/i/status/{tweet_id}"),
            tweet_id,
        }
    }
}

impl XClient {
    pub fn new(config: Config, settings: &Settings) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(format!("porkelon-tweet-bot/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            http,
            tweets_url: format!("{}{TWEETS_PATH}", settings.api_base.trim_end_matches('/')),
            media_upload_url: format!(
                "{}{MEDIA_UPLOAD_PATH}",
                settings.upload_base.trim_end_matches('/')
            ),
        })
    }

    /// Post a tweet, uploading `image_path` first when given.
    pub async fn post_tweet(
        &self,
        text: &str,
        image_path: Option<&Path>,
    ) -> Result<PostResult, ApiError> {
        let media_id = match image_path {
            Some(path) => Some(self.upload_media(path).await?),
            None => None,
        };

        let body = TweetBody {
            text,
            media: media_id.map(|id| TweetMedia {
                media_ids: vec![id],
            }),
        };

        tracing::debug!("POST {}", self.tweets_url);
        let auth = self.oauth_header("POST", &self.tweets_url)?;
        let resp = self
            .http
            .post(&self.tweets_url)
            .header("Authorization", auth)
            .json(&body)
            .send()
            .await?;

        let resp = Self::check_status(resp).await?;
        let tweet: TweetResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("tweet response: {e}")))?;

        Ok(PostResult::new(tweet.data.id))
    }

    async fn upload_media(&self, path: &Path) -> Result<String, ApiError> {
        let mime = mime_from_path(path)?;
        let file_bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Media(format!("failed to read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let part = media_part(file_bytes, file_name, mime)?;
        let form = reqwest::multipart::Form::new().part("media", part);

        // For multipart uploads, only OAuth params go in signature (no body params)
        tracing::debug!("POST {} ({})", self.media_upload_url, path.display());
        let auth = self.oauth_header("POST", &self.media_upload_url)?;
        let resp = self
            .http
            .post(&self.media_upload_url)
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await?;

        let resp = Self::check_status(resp).await?;
        let media: MediaResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("media response: {e}")))?;
        Ok(media.media_id_string)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        match status.as_u16() {
            401 => {
                tracing::error!(
                    "Received 401 Unauthorized from X API. \
                     Check API_KEY, API_SECRET, ACCESS_TOKEN and ACCESS_SECRET, \
                     or regenerate them at https://developer.x.com/"
                );
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::Unauthorized { body })
            }
            429 => Err(ApiError::RateLimited {
                reset: resp
                    .headers()
                    .get("x-rate-limit-reset")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
            }),
            code => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::Api { status: code, body })
            }
        }
    }

    // --- OAuth 1.0a ---

    fn oauth_header(&self, method: &str, url: &str) -> Result<String, ApiError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("oauth_consumer_key", self.config.api_key.clone());
        params.insert("oauth_nonce", nonce());
        params.insert("oauth_signature_method", "HMAC-SHA1".into());
        params.insert("oauth_timestamp", timestamp);
        params.insert("oauth_token", self.config.access_token.clone());
        params.insert("oauth_version", "1.0".into());

        let base_string = signature_base_string(method, url, &params);
        let signing_key = format!(
            "{}&{}",
            pct_encode(&self.config.api_key_secret),
            pct_encode(&self.config.access_token_secret)
        );
        params.insert("oauth_signature", sign(&signing_key, &base_string)?);

        let header_parts: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", pct_encode(k), pct_encode(v)))
            .collect();

        Ok(format!("OAuth {}", header_parts.join(", ")))
    }
}

fn signature_base_string(method: &str, url: &str, params: &BTreeMap<&str, String>) -> String {
    let param_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", pct_encode(k), pct_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        pct_encode(url),
        pct_encode(&param_string)
    )
}

fn sign(key: &str, data: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| ApiError::Decode(format!("HMAC key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn pct_encode(input: &str) -> String {
    utf8_percent_encode(input, RFC3986).to_string()
}

fn media_part(
    bytes: Vec<u8>,
    file_name: String,
    mime: &str,
) -> Result<reqwest::multipart::Part, ApiError> {
    reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| ApiError::Media(format!("invalid MIME type '{mime}': {e}")))
}

fn mime_from_path(path: &Path) -> Result<&'static str, ApiError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(ApiError::Media(format!(
            "unsupported image format '.{ext}'. Allowed: jpeg, png, gif, webp"
        ))),
    }
}
