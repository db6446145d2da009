// Quote sources that drive the signal core
pub mod synthetic;

pub use synthetic::{QuoteScenario, SyntheticQuoteFeed};

use std::io::BufRead;
use thiserror::Error;

use crate::models::Quote;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read quote stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed quote: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads one JSON quote per line
///
/// Blank lines are skipped. Each item carries its own error so a caller can
/// decide whether a bad line ends the stream.
pub struct JsonLinesFeed<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesFeed<R> {
    type Item = Result<Quote, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let text = self.buf.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(text).map_err(|source| {
                        FeedError::Parse {
                            line: self.line,
                            source,
                        }
                    }));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
