use {
    tracing::{info, debug, warn},
    serde::Deserialize,
    async_trait::async_trait,
    reqwest::StatusCode,
    url::Url,
    crate::{
        config::YoutubeConfig,
        models::Comment,
    },
};

pub const VIDEO_ID_LEN: usize = 11;
pub const MAX_PAGE_SIZE: u32 = 100;

const URL_MARKERS: [&str; 2] = ["watch?v=", "youtu.be/"];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid youtube url: {0}")]
    InvalidUrlFormat(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("youtube rejected the api credential: {0}")]
    Authentication(String),
    #[error("youtube quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("video not found or comments are disabled: {0}")]
    NotFound(String),
    #[error("youtube api key is not configured")]
    MissingCredential,
    #[error("youtube api returned status {status}: {message}")]
    UnexpectedResponse { status: u16, message: String },
    #[error("failed to decode youtube api response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request to youtube api failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoId(String);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_page_token: Option<String>,
}

/// One call to the comment listing endpoint.
#[async_trait]
pub trait PageSource {
    async fn fetch_page(&self, video_id: &VideoId, page_token: Option<&str>, max_results: u32) -> Result<CommentPage, FetchError>;
}

pub struct CommentFetcher<S> {
    source: S,
}

pub struct YoutubeApi {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Deserialize, Debug)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_video_id(url: &str) -> Result<VideoId, UrlError> {
    for marker in URL_MARKERS {
        if let Some(position) = url.rfind(marker) {
            let id: String = url[position + marker.len()..].chars().take(VIDEO_ID_LEN).collect();
            if id.chars().count() == VIDEO_ID_LEN {
                return Ok(VideoId(id));
            }
        }
    }

    Err(UrlError::InvalidUrlFormat(url.to_owned()))
}

impl<S: PageSource> CommentFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
        }
    }

    #[cfg(test)]
    fn source(&self) -> &S {
        &self.source
    }

    /// Walks the pages in order until `max_comments` is reached or the source runs out of pages.
    pub async fn fetch(&self, video_id: &VideoId, max_comments: usize) -> Result<Vec<Comment>, FetchError> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        while comments.len() < max_comments {
            let remaining = max_comments - comments.len();
            let page_size = remaining.min(MAX_PAGE_SIZE as usize) as u32;

            let page = self.source.fetch_page(video_id, page_token.as_deref(), page_size).await?;
            pages += 1;
            debug!("page {} for {}: {} comments", pages, video_id.as_str(), page.comments.len());

            comments.extend(page.comments.into_iter().take(remaining));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("fetched {} comments for video {} in {} pages", comments.len(), video_id.as_str(), pages);
        Ok(comments)
    }
}

impl YoutubeApi {
    pub fn new(config: &YoutubeConfig) -> Result<Self, FetchError> {
        let api_key = config.api_key().ok_or(FetchError::MissingCredential)?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint(),
            api_key,
        })
    }

    fn comment_threads_url(&self, video_id: &VideoId, page_token: Option<&str>, max_results: u32) -> Result<Url, FetchError> {
        let max_results = max_results.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("videoId", video_id.as_str()),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        Url::parse_with_params(&format!("{}/commentThreads", self.endpoint.trim_end_matches('/')), &params)
            .map_err(|err| FetchError::UnexpectedResponse {
                status: 0,
                message: format!("bad endpoint {}: {}", self.endpoint, err),
            })
    }
}

#[async_trait]
impl PageSource for YoutubeApi {
    async fn fetch_page(&self, video_id: &VideoId, page_token: Option<&str>, max_results: u32) -> Result<CommentPage, FetchError> {
        let url = self.comment_threads_url(video_id, page_token, max_results)?;
        let res = self.client.get(url).send().await?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = match res.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!("failed to read error body for status {}: {}", status, err);
                    format!("unreadable error body: {}", err)
                }
            };
            return Err(error_from_response(status, &body));
        }

        parse_page(&res.bytes().await?)
    }
}

fn parse_page(body: &[u8]) -> Result<CommentPage, FetchError> {
    let response: CommentThreadListResponse = serde_json::from_slice(body)?;
    Ok(response.into())
}

impl From<CommentThreadListResponse> for CommentPage {
    fn from(response: CommentThreadListResponse) -> Self {
        Self {
            comments: response.items
                .into_iter()
                .map(|item| Comment::new(item.snippet.top_level_comment.snippet.text_display.unwrap_or_default()))
                .collect(),
            next_page_token: response.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

fn error_from_response(status: StatusCode, body: &str) -> FetchError {
    let (message, reasons): (String, Vec<String>) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(v) => (v.error.message, v.error.errors.into_iter().map(|e| e.reason).collect()),
        Err(_) => (body.to_owned(), Vec::new()),
    };
    let has_reason = |names: &[&str]| reasons.iter().any(|reason| names.contains(&reason.as_str()));

    if has_reason(&["quotaExceeded", "rateLimitExceeded", "dailyLimitExceeded", "userRateLimitExceeded"]) {
        FetchError::QuotaExceeded(message)
    } else if has_reason(&["videoNotFound", "commentsDisabled"]) {
        FetchError::NotFound(message)
    } else if has_reason(&["keyInvalid", "keyExpired", "unauthorized", "forbidden"]) {
        FetchError::Authentication(message)
    } else {
        match status {
            StatusCode::UNAUTHORIZED => FetchError::Authentication(message),
            StatusCode::TOO_MANY_REQUESTS => FetchError::QuotaExceeded(message),
            StatusCode::NOT_FOUND => FetchError::NotFound(message),
            _ => FetchError::UnexpectedResponse { status: status.as_u16(), message },
        }
    }
}
