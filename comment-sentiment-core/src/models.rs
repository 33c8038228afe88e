use std::fmt;

pub const EMPTY_SENTINEL: &str = "empty";

/// Raw user text, exactly as fetched or uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
}

/// Output of the normalizer. Never an empty string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedComment {
    text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
    Unknown,
}

/// What the pipeline knows about one comment after classification.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Labeled { sentiment: Sentiment, score: f64 },
    /// Blank input; the classifier was never asked.
    Blank,
    Failed { reason: String },
}

/// One unit of analysis input. `Missing` stands for an absent cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommentInput {
    Raw(Comment),
    /// Already cleaned text, with the raw comment it came from when the source has one.
    PreNormalized { clean: String, raw: Option<Comment> },
    Missing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub comment: Option<Comment>,
    pub normalized: NormalizedComment,
    pub classification: Classification,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    rows: Vec<ResultRow>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
        }
    }
}

impl NormalizedComment {
    pub(crate) fn from_normalized(text: String) -> Self {
        debug_assert!(!text.is_empty());
        Self {
            text,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_sentinel(&self) -> bool {
        self.text == EMPTY_SENTINEL
    }
}

impl fmt::Display for NormalizedComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Sentiment {
    pub fn from_label(label: &str) -> Self {
        match label {
            "negative" => Sentiment::Negative,
            "neutral" => Sentiment::Neutral,
            "positive" => Sentiment::Positive,
            _ => Sentiment::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
            Sentiment::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Labeled { sentiment, .. } => sentiment.as_str(),
            Classification::Blank => Sentiment::Neutral.as_str(),
            Classification::Failed { .. } => "error",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Classification::Labeled { score, .. } => *score,
            Classification::Blank | Classification::Failed { .. } => 0.0,
        }
    }
}

impl CommentInput {
    /// Blank means absent or whitespace-only before any normalization happens.
    pub fn is_blank(&self) -> bool {
        match self {
            CommentInput::Raw(comment) => comment.text.trim().is_empty(),
            CommentInput::PreNormalized { clean, .. } => clean.trim().is_empty(),
            CommentInput::Missing => true,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            CommentInput::Raw(comment) => Some(&comment.text),
            CommentInput::PreNormalized { clean, .. } => Some(clean),
            CommentInput::Missing => None,
        }
    }
}

impl From<Comment> for CommentInput {
    fn from(comment: Comment) -> Self {
        CommentInput::Raw(comment)
    }
}

impl ResultRow {
    pub fn label(&self) -> &'static str {
        self.classification.label()
    }

    pub fn score(&self) -> f64 {
        self.classification.score()
    }
}

impl ResultSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
