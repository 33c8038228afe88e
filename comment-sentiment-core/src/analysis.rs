use {
    tracing::{info, warn},
    crate::{
        classifier::{Classifier, LabelMap},
        models::{Classification, CommentInput, ResultRow, ResultSet},
        normalize::Normalizer,
    },
};

/// Normalize, classify and join, one comment at a time and in input order.
pub struct Analyzer {
    normalizer: Normalizer,
    labels: LabelMap,
}

impl Analyzer {
    pub fn new(normalizer: Normalizer, labels: LabelMap) -> Self {
        Self {
            normalizer,
            labels,
        }
    }

    pub fn analyze(&self, classifier: &dyn Classifier, inputs: Vec<CommentInput>) -> ResultSet {
        self.analyze_with(classifier, inputs, |_, _| {})
    }

    /// `on_row` sees every row right after it is produced, with its position.
    pub fn analyze_with<F>(&self, classifier: &dyn Classifier, inputs: Vec<CommentInput>, mut on_row: F) -> ResultSet
    where
        F: FnMut(usize, &ResultRow),
    {
        let mut results = ResultSet::with_capacity(inputs.len());
        let mut failed = 0;

        for (index, input) in inputs.into_iter().enumerate() {
            let row = self.analyze_one(classifier, input);
            if let Classification::Failed { reason } = &row.classification {
                warn!("failed to classify comment {}: {}", index, reason);
                failed += 1;
            }
            on_row(index, &row);
            results.push(row);
        }

        info!("classified {} comments ({} failed)", results.len(), failed);
        results
    }

    fn analyze_one(&self, classifier: &dyn Classifier, input: CommentInput) -> ResultRow {
        let normalized = self.normalizer.normalize(input.text());

        let classification = if input.is_blank() {
            Classification::Blank
        } else {
            match classifier.classify(normalized.as_str()) {
                Ok(prediction) => Classification::Labeled {
                    sentiment: self.labels.map(&prediction.label),
                    score: prediction.score,
                },
                Err(err) => Classification::Failed {
                    reason: err.to_string(),
                },
            }
        };

        let comment = match input {
            CommentInput::Raw(comment) => Some(comment),
            CommentInput::PreNormalized { raw, .. } => raw,
            CommentInput::Missing => None,
        };

        ResultRow {
            comment,
            normalized,
            classification,
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Normalizer::default(), LabelMap::default())
    }
}
