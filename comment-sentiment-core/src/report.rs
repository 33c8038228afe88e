use {
    std::collections::HashMap,
    crate::models::ResultSet,
};

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be", "because",
    "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "get", "got", "had", "has",
    "have", "he", "her", "here", "him", "his", "how", "i", "if", "im", "in", "into", "is", "it", "its",
    "just", "me", "more", "my", "no", "not", "of", "on", "or", "our", "out", "she", "so", "than", "that",
    "the", "their", "them", "then", "there", "they", "this", "to", "too", "up", "us", "was", "we", "were",
    "what", "when", "which", "who", "why", "will", "with", "would", "you", "your",
];

#[derive(Clone, Debug, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub share: f64,
}

/// Count per distinct label, in the order labels first appear.
pub fn label_distribution(results: &ResultSet) -> Vec<LabelCount> {
    let mut counts: Vec<LabelCount> = Vec::new();

    for row in results {
        let position = counts.iter().position(|entry| entry.label == row.label());
        match position {
            Some(index) => counts[index].count += 1,
            None => counts.push(LabelCount {
                label: row.label().to_owned(),
                count: 1,
                share: 0.0,
            }),
        }
    }

    let total = results.len() as f64;
    for entry in counts.iter_mut() {
        entry.share = entry.count as f64 / total;
    }

    counts
}

/// All normalized texts joined by spaces; sentinel rows carry no words.
pub fn combined_text(results: &ResultSet) -> String {
    results.rows()
        .iter()
        .filter(|row| !row.normalized.is_sentinel())
        .map(|row| row.normalized.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most frequent non-stopword words, highest count first, ties alphabetical.
pub fn word_frequencies(text: &str, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in text.split_whitespace() {
        if word.len() > 1 && !STOPWORDS.contains(&word) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = counts.into_iter()
        .map(|(word, count)| (word.to_owned(), count))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    words
}
