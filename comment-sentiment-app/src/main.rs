use {
    std::io,
    tracing::info,
    comment_sentiment_core::{
        classifier::LazyClassifier,
        config::Config,
    },
    crate::{
        session::Session,
        utils::init_logging,
    },
};

mod render;
mod session;
mod utils;

// network calls run on the session's own current-thread runtime, the model never runs inside it
fn main() -> anyhow::Result<()> {
    init_logging();

    info!("youtube comment sentiment analysis");

    let config = Config::load();
    let classifier = LazyClassifier::bert(config.classifier());
    let mut session = Session::new(config, classifier)?;

    session.run(io::stdin().lock(), io::stdout())
}
