use {
    std::{collections::BTreeMap, env, fs::read_to_string, path::PathBuf},
    tracing::warn,
    serde::Deserialize,
};

pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

const DEFAULT_MAX_COMMENTS: u32 = 20;

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    youtube: Option<YoutubeConfig>,
    classifier: Option<ClassifierConfig>,
    #[serde(default)]
    normalization: NormalizationConfig,
    export: Option<ExportConfig>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct YoutubeConfig {
    api_key: Option<String>,
    endpoint: Option<String>,
    max_comments: Option<u32>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ClassifierConfig {
    model_dir: Option<PathBuf>,
    remote_base_url: Option<String>,
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct NormalizationConfig {
    pub strip_mentions: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ExportConfig {
    path: Option<PathBuf>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            max_comments: None,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            remote_base_url: None,
            labels: None,
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_mentions: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        read_to_string("./config.toml")
            .or_else(|_| read_to_string("/config/config.toml"))
            .map_err(|err| err.to_string())
            .and_then(|v| Self::parse(&v))
            .unwrap_or_else(|err| {
                warn!("failed to read config: {}", err);
                Config::default()
            })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|err| err.to_string())
    }

    pub fn youtube(&self) -> YoutubeConfig {
        self.youtube.as_ref().cloned().unwrap_or_default()
    }

    pub fn classifier(&self) -> ClassifierConfig {
        self.classifier.as_ref().cloned().unwrap_or_default()
    }

    pub fn normalization(&self) -> &NormalizationConfig {
        &self.normalization
    }

    pub fn export(&self) -> ExportConfig {
        self.export.as_ref().cloned().unwrap_or_default()
    }
}

impl YoutubeConfig {
    /// The environment variable wins over the file, so the key does not have to live next to the binary.
    pub fn api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV).ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_key.as_ref().cloned())
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.as_ref().cloned().unwrap_or("https://www.googleapis.com/youtube/v3".to_owned())
    }

    pub fn max_comments(&self) -> u32 {
        self.max_comments.unwrap_or(DEFAULT_MAX_COMMENTS)
    }
}

impl ClassifierConfig {
    pub fn model_dir(&self) -> Option<&PathBuf> {
        self.model_dir.as_ref()
    }

    pub fn remote_base_url(&self) -> String {
        self.remote_base_url.as_ref().cloned()
            .unwrap_or("https://huggingface.co/cardiffnlp/twitter-roberta-base-sentiment/resolve/main".to_owned())
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.labels.as_ref().cloned().unwrap_or_else(default_labels)
    }
}

impl ExportConfig {
    pub fn path(&self) -> PathBuf {
        self.path.as_ref().cloned().unwrap_or(PathBuf::from("youtube_comments_with_sentiment.csv"))
    }
}

fn default_labels() -> BTreeMap<String, String> {
    [("LABEL_0", "negative"), ("LABEL_1", "neutral"), ("LABEL_2", "positive")]
        .into_iter()
        .map(|(code, label)| (code.to_owned(), label.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.youtube().max_comments(), 20);
        assert_eq!(config.youtube().endpoint(), "https://www.googleapis.com/youtube/v3");
        assert!(config.normalization().strip_mentions);
        assert_eq!(config.export().path(), PathBuf::from("youtube_comments_with_sentiment.csv"));
        assert_eq!(config.classifier().labels().get("LABEL_2").map(String::as_str), Some("positive"));
        assert!(config.classifier().model_dir().is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(r#"
[youtube]
endpoint = "http://localhost:8080"
max_comments = 250

[classifier]
model_dir = "/models/roberta"

[classifier.labels]
NEG = "negative"
POS = "positive"

[normalization]
strip_mentions = false

[export]
path = "out.csv"
"#).unwrap();

        assert_eq!(config.youtube().endpoint(), "http://localhost:8080");
        assert_eq!(config.youtube().max_comments(), 250);
        assert_eq!(config.classifier().model_dir(), Some(&PathBuf::from("/models/roberta")));
        assert_eq!(config.classifier().labels().len(), 2);
        assert!(!config.normalization().strip_mentions);
        assert_eq!(config.export().path(), PathBuf::from("out.csv"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::parse("[youtube\nmax_comments = ").is_err());
    }
}
