use {
    once_cell::sync::Lazy,
    regex::Regex,
    crate::{
        config::NormalizationConfig,
        models::{NormalizedComment, EMPTY_SENTINEL},
    },
};

// Anchored on a scheme or `www.` so that already-cleaned text can never match again.
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?://|www\.)\S+").unwrap());
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").unwrap());
static NON_ALPHANUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MentionPolicy {
    Strip,
    Keep,
}

#[derive(Clone, Copy, Debug)]
pub struct Normalizer {
    mentions: MentionPolicy,
}

impl Normalizer {
    pub fn new(mentions: MentionPolicy) -> Self {
        Self {
            mentions,
        }
    }

    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self::new(if config.strip_mentions { MentionPolicy::Strip } else { MentionPolicy::Keep })
    }

    pub fn normalize(&self, text: Option<&str>) -> NormalizedComment {
        let mut text = text.unwrap_or_default().to_lowercase();
        text = URL_RE.replace_all(&text, "").into_owned();
        if self.mentions == MentionPolicy::Strip {
            text = MENTION_RE.replace_all(&text, "").into_owned();
        }
        text = NON_ALPHANUMERIC_RE.replace_all(&text, "").into_owned();
        let text = WHITESPACE_RE.replace_all(&text, " ");
        let text = text.trim();

        if text.is_empty() {
            NormalizedComment::from_normalized(EMPTY_SENTINEL.to_owned())
        } else {
            NormalizedComment::from_normalized(text.to_owned())
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(MentionPolicy::Strip)
    }
}

pub fn normalize(text: Option<&str>) -> NormalizedComment {
    Normalizer::default().normalize(text)
}
