use {
    std::{collections::BTreeMap, panic::{catch_unwind, AssertUnwindSafe}, path::Path},
    tracing::info,
    anyhow::{anyhow, Result},
    once_cell::unsync::OnceCell,
    rust_bert::{
        pipelines::{
            common::ModelType,
            sequence_classification::{SequenceClassificationConfig, SequenceClassificationModel},
        },
        resources::{LocalResource, RemoteResource, ResourceProvider},
    },
    crate::{
        config::ClassifierConfig,
        models::Sentiment,
    },
};

const REMOTE_CACHE_SUBDIR: &str = "twitter-roberta-base-sentiment";

#[derive(Clone, Debug, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

pub trait Classifier {
    fn classify(&self, text: &str) -> Result<RawPrediction>;
}

/// Raw classifier codes to readable sentiments. Codes missing from the table are `Unknown`.
#[derive(Clone, Debug)]
pub struct LabelMap {
    table: BTreeMap<String, Sentiment>,
}

pub struct BertClassifier {
    model: SequenceClassificationModel,
}

type Loader = Box<dyn Fn() -> Result<Box<dyn Classifier>>>;

/// Loads the model on first use and keeps it for the rest of the process.
/// Not `Sync`: the session never classifies from two threads.
pub struct LazyClassifier {
    cell: OnceCell<Box<dyn Classifier>>,
    loader: Loader,
}

impl LabelMap {
    pub fn new(table: BTreeMap<String, String>) -> Self {
        Self {
            table: table.into_iter()
                .map(|(code, label)| {
                    let sentiment = Sentiment::from_label(&label.to_lowercase());
                    (code, sentiment)
                })
                .collect(),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.labels())
    }

    pub fn map(&self, raw_label: &str) -> Sentiment {
        self.table.get(raw_label).copied().unwrap_or(Sentiment::Unknown)
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl BertClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let sequence_config = match config.model_dir() {
            Some(dir) => {
                info!("loading sentiment model from {}", dir.display());
                local_sequence_config(dir)
            },
            None => {
                info!("loading sentiment model from {}", config.remote_base_url());
                remote_sequence_config(&config.remote_base_url())
            },
        };

        let model = SequenceClassificationModel::new(sequence_config)?;
        info!("sentiment model loaded");

        Ok(Self {
            model,
        })
    }
}

impl Classifier for BertClassifier {
    fn classify(&self, text: &str) -> Result<RawPrediction> {
        // predict panics on tensor errors instead of returning them
        let output = catch_unwind(AssertUnwindSafe(|| self.model.predict(&[text])))
            .map_err(|_| anyhow!("sentiment model panicked while classifying"))?;

        output.into_iter()
            .next()
            .map(|label| RawPrediction {
                label: label.text,
                score: label.score,
            })
            .ok_or_else(|| anyhow!("sentiment model returned no label"))
    }
}

impl LazyClassifier {
    pub fn new(loader: impl Fn() -> Result<Box<dyn Classifier>> + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    pub fn bert(config: ClassifierConfig) -> Self {
        Self::new(move || Ok(Box::new(BertClassifier::new(&config)?) as Box<dyn Classifier>))
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// A failed load leaves the cell empty, so the next call tries again.
    pub fn get(&self) -> Result<&dyn Classifier> {
        self.cell.get_or_try_init(|| (self.loader)()).map(|v| v.as_ref())
    }
}

fn local_sequence_config(dir: &Path) -> SequenceClassificationConfig {
    let resource = |name: &str| LocalResource {
        local_path: dir.join(name),
    };

    sequence_config(resource("rust_model.ot"), resource("config.json"), resource("vocab.json"), resource("merges.txt"))
}

fn remote_sequence_config(base_url: &str) -> SequenceClassificationConfig {
    let base_url = base_url.trim_end_matches('/');
    let resource = |name: &str| RemoteResource::new(&format!("{}/{}", base_url, name), REMOTE_CACHE_SUBDIR);

    sequence_config(resource("rust_model.ot"), resource("config.json"), resource("vocab.json"), resource("merges.txt"))
}

fn sequence_config<R>(model: R, config: R, vocab: R, merges: R) -> SequenceClassificationConfig
where
    R: ResourceProvider + Send + 'static,
{
    SequenceClassificationConfig::new(
        ModelType::Roberta,
        model,
        config,
        vocab,
        Some(merges),
        false,
        None,
        false,
    )
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::cell::Cell,
        std::rc::Rc,
    };

    struct Echo;

    impl Classifier for Echo {
        fn classify(&self, text: &str) -> Result<RawPrediction> {
            Ok(RawPrediction {
                label: text.to_owned(),
                score: 0.5,
            })
        }
    }

    #[test]
    fn maps_known_codes() {
        let labels = LabelMap::default();

        assert_eq!(labels.map("LABEL_0"), Sentiment::Negative);
        assert_eq!(labels.map("LABEL_1"), Sentiment::Neutral);
        assert_eq!(labels.map("LABEL_2"), Sentiment::Positive);
    }

    #[test]
    fn unrecognized_codes_are_unknown() {
        let labels = LabelMap::default();

        for code in ["LABEL_3", "label_0", "POSITIVE", ""] {
            assert_eq!(labels.map(code), Sentiment::Unknown);
        }
    }

    #[test]
    fn custom_table_with_unreadable_target() {
        let labels = LabelMap::new([
            ("neg".to_owned(), "Negative".to_owned()),
            ("meh".to_owned(), "mixed".to_owned()),
        ].into_iter().collect());

        assert_eq!(labels.map("neg"), Sentiment::Negative);
        assert_eq!(labels.map("meh"), Sentiment::Unknown);
    }

    #[test]
    fn lazy_classifier_loads_once() {
        let loads = Rc::new(Cell::new(0));
        let counter = loads.clone();
        let lazy = LazyClassifier::new(move || {
            counter.set(counter.get() + 1);
            Ok(Box::new(Echo) as Box<dyn Classifier>)
        });

        assert!(!lazy.is_loaded());
        assert_eq!(lazy.get().unwrap().classify("a").unwrap().label, "a");
        assert_eq!(lazy.get().unwrap().classify("b").unwrap().label, "b");
        assert!(lazy.is_loaded());
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn lazy_classifier_retries_after_failed_load() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let lazy = LazyClassifier::new(move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Err(anyhow!("download failed"))
            } else {
                Ok(Box::new(Echo) as Box<dyn Classifier>)
            }
        });

        assert!(lazy.get().is_err());
        assert!(!lazy.is_loaded());
        assert!(lazy.get().is_ok());
        assert_eq!(attempts.get(), 2);
    }
}
