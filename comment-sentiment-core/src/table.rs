use {
    std::{fs::File, io, path::Path},
    tracing::info,
    csv::{ByteRecord, ReaderBuilder, Writer},
    crate::{
        models::{Comment, CommentInput, ResultSet},
        normalize::Normalizer,
    },
};

pub const COMMENT_COLUMN: &str = "comment";
pub const CLEAN_COMMENT_COLUMN: &str = "clean_comment";
pub const SENTIMENT_COLUMN: &str = "sentiment";
pub const SCORE_COLUMN: &str = "score";

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("no '{}' or '{}' column found in uploaded table", COMMENT_COLUMN, CLEAN_COMMENT_COLUMN)]
    MissingColumn,
    #[error("table has {rows} rows but {results} results were produced")]
    LengthMismatch { rows: usize, results: usize },
    #[error("failed to parse csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to access file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextColumn {
    /// Index of a raw `comment` column, normalized on load.
    Raw(usize),
    /// Index of a `clean_comment` column, used as given.
    Clean(usize),
}

/// An uploaded table. Original headers and cells are kept untouched; results are written on export.
#[derive(Debug)]
pub struct UploadedTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    text_column: TextColumn,
    comment_column: Option<usize>,
    derived_clean: Option<Vec<String>>,
}

/// Where each derived value lands in an exported record.
#[derive(Debug, PartialEq, Eq)]
struct ExportLayout {
    headers: Vec<String>,
    clean: usize,
    sentiment: usize,
    score: usize,
}

impl UploadedTable {
    pub fn open(path: &Path, normalizer: &Normalizer) -> Result<Self, TableError> {
        let table = Self::read(File::open(path)?, normalizer)?;
        info!("loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn read<R: io::Read>(reader: R, normalizer: &Normalizer) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.byte_headers()?.iter().map(lossy).collect();
        let text_column = find_column(&headers, CLEAN_COMMENT_COLUMN).map(TextColumn::Clean)
            .or_else(|| find_column(&headers, COMMENT_COLUMN).map(TextColumn::Raw))
            .ok_or(TableError::MissingColumn)?;
        let comment_column = find_column(&headers, COMMENT_COLUMN);

        let mut records = Vec::new();
        let mut record = ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            records.push(record.iter().map(lossy).collect::<Vec<_>>());
        }

        let derived_clean = match text_column {
            TextColumn::Raw(index) => Some(records.iter()
                .map(|record| normalizer.normalize(record.get(index).map(String::as_str)).to_string())
                .collect()),
            TextColumn::Clean(_) => None,
        };

        Ok(Self {
            headers,
            records,
            text_column,
            comment_column,
            derived_clean,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn text_column(&self) -> TextColumn {
        self.text_column
    }

    /// The `clean_comment` values computed on load, when the table only had raw comments.
    pub fn derived_clean(&self) -> Option<&[String]> {
        self.derived_clean.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn inputs(&self) -> Vec<CommentInput> {
        self.records.iter()
            .map(|record| match self.text_column {
                TextColumn::Raw(index) => record.get(index)
                    .map(|text| CommentInput::Raw(Comment::new(text.as_str())))
                    .unwrap_or(CommentInput::Missing),
                TextColumn::Clean(index) => record.get(index)
                    .map(|text| CommentInput::PreNormalized {
                        clean: text.clone(),
                        raw: self.comment_column
                            .and_then(|column| record.get(column))
                            .map(|raw| Comment::new(raw.as_str())),
                    })
                    .unwrap_or(CommentInput::Missing),
            })
            .collect()
    }

    /// Headers of the exported file: the originals, then `clean_comment`, `sentiment` and `score` unless already present.
    pub fn export_headers(&self) -> Vec<String> {
        self.export_layout().headers
    }

    fn export_layout(&self) -> ExportLayout {
        let mut headers = self.headers.clone();
        let mut column = |name: &str| find_column(&headers, name).unwrap_or_else(|| {
            headers.push(name.to_owned());
            headers.len() - 1
        });

        let clean = column(CLEAN_COMMENT_COLUMN);
        let sentiment = column(SENTIMENT_COLUMN);
        let score = column(SCORE_COLUMN);

        ExportLayout {
            headers,
            clean,
            sentiment,
            score,
        }
    }
}

pub fn write_table_results<W: io::Write>(writer: W, table: &UploadedTable, results: &ResultSet) -> Result<(), TableError> {
    if table.len() != results.len() {
        return Err(TableError::LengthMismatch { rows: table.len(), results: results.len() });
    }

    let layout = table.export_layout();
    let mut writer = Writer::from_writer(writer);
    writer.write_record(&layout.headers)?;

    // existing result columns are overwritten, the cleaned text is the one that was classified
    for (record, row) in table.records().iter().zip(results) {
        let mut out: Vec<String> = record.iter().take(table.headers().len()).cloned().collect();
        out.resize(layout.headers.len(), String::new());
        out[layout.clean] = row.normalized.to_string();
        out[layout.sentiment] = row.label().to_owned();
        out[layout.score] = row.score().to_string();
        writer.write_record(&out)?;
    }

    writer.flush()?;
    Ok(())
}

/// Export for fetched comments, which have no source table.
pub fn write_comment_results<W: io::Write>(writer: W, results: &ResultSet) -> Result<(), TableError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record([COMMENT_COLUMN, CLEAN_COMMENT_COLUMN, SENTIMENT_COLUMN, SCORE_COLUMN])?;

    for row in results {
        let comment = row.comment.as_ref().map(|c| c.text.as_str()).unwrap_or_default();
        writer.write_record([
            comment,
            row.normalized.as_str(),
            row.label(),
            row.score().to_string().as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn create_export_file(path: &Path) -> Result<File, TableError> {
    Ok(File::create(path)?)
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}
