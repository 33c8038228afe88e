use {
    std::{io::{BufRead, Write}, path::{Path, PathBuf}},
    tracing::info,
    anyhow::{anyhow, Result},
    indicatif::ProgressBar,
    comment_sentiment_core::{
        analysis::Analyzer,
        classifier::{LabelMap, LazyClassifier},
        config::Config,
        models::{CommentInput, ResultSet},
        normalize::Normalizer,
        report::{combined_text, label_distribution, word_frequencies},
        table::{create_export_file, write_comment_results, write_table_results, UploadedTable},
        youtube::{parse_video_id, CommentFetcher, YoutubeApi},
    },
    crate::render,
};

const SAMPLE_ROWS: usize = 5;
const RESULT_ROWS: usize = 10;
const CLOUD_WORDS: usize = 25;

const HELP: &str = "\
commands:
  live <youtube url> [limit]   fetch comments for a video and classify them
  batch <csv file>             classify a table with a 'comment' or 'clean_comment' column
  export [path]                save the latest results as csv
  help                         show this message
  quit                         leave the session
";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Live { url: String, limit: Option<usize> },
    Batch { path: PathBuf },
    Export { path: Option<PathBuf> },
    Help,
    Quit,
    Nothing,
}

/// Results of the latest run. Starting a new run drops the previous one.
enum LastRun {
    Live(ResultSet),
    Batch { table: UploadedTable, results: ResultSet },
}

pub struct Session {
    config: Config,
    runtime: tokio::runtime::Runtime,
    normalizer: Normalizer,
    analyzer: Analyzer,
    classifier: LazyClassifier,
    last_run: Option<LastRun>,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        Ok(match name.to_lowercase().as_str() {
            "" => Command::Nothing,
            "live" => {
                let mut parts = rest.split_whitespace();
                let url = parts.next().ok_or_else(|| anyhow!("usage: live <youtube url> [limit]"))?.to_owned();
                let limit = match parts.next() {
                    Some(v) => Some(v.parse().map_err(|_| anyhow!("limit must be a number, got '{}'", v))?),
                    None => None,
                };
                Command::Live { url, limit }
            },
            "batch" => {
                if rest.is_empty() {
                    return Err(anyhow!("usage: batch <csv file>"));
                }
                Command::Batch { path: PathBuf::from(rest) }
            },
            "export" => Command::Export {
                path: if rest.is_empty() { None } else { Some(PathBuf::from(rest)) },
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(anyhow!("unknown command '{}', type 'help' for the list", other)),
        })
    }
}

impl Session {
    pub fn new(config: Config, classifier: LazyClassifier) -> Result<Self> {
        let normalizer = Normalizer::from_config(config.normalization());
        let analyzer = Analyzer::new(normalizer, LabelMap::from_config(&config.classifier()));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            runtime,
            normalizer,
            analyzer,
            classifier,
            last_run: None,
        })
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        writeln!(out, "youtube comment sentiment analysis")?;
        write!(out, "{}", HELP)?;

        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };

            let result = match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command, &mut out),
                Err(err) => Err(err),
            };

            if let Err(err) = result {
                writeln!(out, "error: {:#}", err)?;
            }
        }

        Ok(())
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Live { url, limit } => self.live(&url, limit, out),
            Command::Batch { path } => self.batch(&path, out),
            Command::Export { path } => self.export(path, out),
            Command::Help => Ok(write!(out, "{}", HELP)?),
            Command::Quit | Command::Nothing => Ok(()),
        }
    }

    fn live<W: Write>(&mut self, url: &str, limit: Option<usize>, out: &mut W) -> Result<()> {
        let video_id = parse_video_id(url)?;
        self.last_run = None;

        let youtube = self.config.youtube();
        let limit = limit.unwrap_or(youtube.max_comments() as usize);
        let fetcher = CommentFetcher::new(YoutubeApi::new(&youtube)?);

        info!("fetching up to {} comments for video {}", limit, video_id.as_str());
        let comments = self.runtime.block_on(fetcher.fetch(&video_id, limit))?;

        writeln!(out, "\n### Sample Comments ({})", comments.len())?;
        for comment in comments.iter().take(SAMPLE_ROWS) {
            writeln!(out, "- {}", render::preview(&comment.text, 120))?;
        }

        let classifier = self.classifier.get()?;
        writeln!(out, "\n### Sentiment Analysis Results")?;
        let mut written = Ok(());
        let inputs = comments.into_iter().map(CommentInput::from).collect();
        let results = self.analyzer.analyze_with(classifier, inputs, |_, row| {
            if written.is_ok() {
                written = writeln!(out, "{}", render::live_row(row));
            }
        });
        written?;

        self.summary(&results, out)?;
        self.last_run = Some(LastRun::Live(results));
        Ok(())
    }

    fn batch<W: Write>(&mut self, path: &Path, out: &mut W) -> Result<()> {
        self.last_run = None;
        let table = UploadedTable::open(path, &self.normalizer)?;

        writeln!(out, "\n### Sample Comments Loaded ({} rows)", table.len())?;
        write!(out, "{}", render::table_head(&table, SAMPLE_ROWS))?;

        let classifier = self.classifier.get()?;
        let progress = ProgressBar::new(table.len() as u64);
        let results = self.analyzer.analyze_with(classifier, table.inputs(), |_, _| progress.inc(1));
        progress.finish_and_clear();
        writeln!(out, "sentiment analysis completed for {} comments", results.len())?;

        writeln!(out, "\n### Comments with Sentiment")?;
        write!(out, "{}", render::results_table(results.rows(), RESULT_ROWS))?;

        self.summary(&results, out)?;
        writeln!(out, "\nuse 'export' to save the results")?;
        self.last_run = Some(LastRun::Batch { table, results });
        Ok(())
    }

    fn summary<W: Write>(&self, results: &ResultSet, out: &mut W) -> Result<()> {
        writeln!(out, "\n### Sentiment Distribution")?;
        write!(out, "{}", render::distribution_chart(&label_distribution(results)))?;

        writeln!(out, "\n### Word Cloud of Comments")?;
        write!(out, "{}", render::word_cloud(&word_frequencies(&combined_text(results), CLOUD_WORDS)))?;
        Ok(())
    }

    fn export<W: Write>(&self, path: Option<PathBuf>, out: &mut W) -> Result<()> {
        let path = path.unwrap_or_else(|| self.config.export().path());
        let rows = match &self.last_run {
            Some(LastRun::Live(results)) => {
                write_comment_results(create_export_file(&path)?, results)?;
                results.len()
            },
            Some(LastRun::Batch { table, results }) => {
                write_table_results(create_export_file(&path)?, table, results)?;
                results.len()
            },
            None => return Err(anyhow!("nothing to export yet, run 'live' or 'batch' first")),
        };

        info!("exported {} rows to {}", rows, path.display());
        writeln!(out, "saved {} rows to {}", rows, path.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{cell::Cell, fs, rc::Rc},
        comment_sentiment_core::classifier::{Classifier, RawPrediction},
    };

    struct ConstantClassifier;

    impl Classifier for ConstantClassifier {
        fn classify(&self, text: &str) -> Result<RawPrediction> {
            Ok(RawPrediction {
                label: if text.contains("good") { "LABEL_2" } else { "LABEL_0" }.to_owned(),
                score: 0.8,
            })
        }
    }

    fn session(loads: Rc<Cell<usize>>) -> Session {
        let classifier = LazyClassifier::new(move || {
            loads.set(loads.get() + 1);
            Ok(Box::new(ConstantClassifier) as Box<dyn Classifier>)
        });
        Session::new(Config::default(), classifier).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("comment-sentiment-{}-{}", std::process::id(), name))
    }

    fn run(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  ").unwrap(), Command::Nothing);
        assert_eq!(
            Command::parse("live https://youtu.be/dQw4w9WgXcQ 50").unwrap(),
            Command::Live { url: "https://youtu.be/dQw4w9WgXcQ".to_owned(), limit: Some(50) }
        );
        assert_eq!(
            Command::parse("LIVE https://youtu.be/dQw4w9WgXcQ").unwrap(),
            Command::Live { url: "https://youtu.be/dQw4w9WgXcQ".to_owned(), limit: None }
        );
        assert_eq!(Command::parse("batch my comments.csv").unwrap(), Command::Batch { path: PathBuf::from("my comments.csv") });
        assert_eq!(Command::parse("export").unwrap(), Command::Export { path: None });
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert!(Command::parse("live").is_err());
        assert!(Command::parse("live https://youtu.be/dQw4w9WgXcQ many").is_err());
        assert!(Command::parse("batch").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn invalid_url_is_reported_without_fetching() {
        let loads = Rc::new(Cell::new(0));
        let mut session = session(loads.clone());

        let output = run(&mut session, "live https://vimeo.com/123\nquit\n");

        assert!(output.contains("error: invalid youtube url: https://vimeo.com/123"));
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn export_before_any_run_fails() {
        let mut session = session(Rc::new(Cell::new(0)));

        let output = run(&mut session, "export\n");

        assert!(output.contains("error: nothing to export yet"));
    }

    #[test]
    fn batch_then_export() {
        let input = temp_path("batch-input.csv");
        let output_path = temp_path("batch-output.csv");
        fs::write(&input, "id,Comment\n1,So GOOD!!\n2,\n3,bad @troll http://spam.io\n").unwrap();

        let loads = Rc::new(Cell::new(0));
        let mut session = session(loads.clone());
        let output = run(&mut session, &format!("batch {}\nexport {}\n", input.display(), output_path.display()));

        assert!(output.contains("sentiment analysis completed for 3 comments"));
        assert!(output.contains("saved 3 rows to"));
        assert_eq!(loads.get(), 1);
        assert_eq!(
            fs::read_to_string(&output_path).unwrap(),
            "id,Comment,clean_comment,sentiment,score\n1,So GOOD!!,so good,positive,0.8\n2,,empty,neutral,0\n3,bad @troll http://spam.io,bad,negative,0.8\n"
        );

        fs::remove_file(input).unwrap();
        fs::remove_file(output_path).unwrap();
    }

    #[test]
    fn missing_column_aborts_batch() {
        let input = temp_path("no-comment-column.csv");
        fs::write(&input, "id,text\n1,hello\n").unwrap();

        let loads = Rc::new(Cell::new(0));
        let mut session = session(loads.clone());
        let output = run(&mut session, &format!("batch {}\nexport\n", input.display()));

        assert!(output.contains("error: no 'comment' or 'clean_comment' column found"));
        assert!(output.contains("error: nothing to export yet"));
        assert_eq!(loads.get(), 0);

        fs::remove_file(input).unwrap();
    }

    #[test]
    fn missing_api_key_is_reported() {
        std::env::remove_var(comment_sentiment_core::config::API_KEY_ENV);
        let mut session = session(Rc::new(Cell::new(0)));

        let output = run(&mut session, "live https://youtu.be/dQw4w9WgXcQ\n");

        assert!(output.contains("error: youtube api key is not configured"));
    }
}
