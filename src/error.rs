use thiserror::Error;

/// Every way a single rate lookup can fail. All of them end the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid date {input:?} (format: YYYY-MM-DD): {source}")]
    InvalidDateFormat {
        input: String,
        #[source]
        source: jiff::Error,
    },
    #[error("GET error: {0}")]
    Network(#[source] ureq::Error),
    #[error("status error: {0}")]
    HttpStatus(u16),
    #[error("read body: {0}")]
    Read(#[source] ureq::Error),
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
    #[error("cannot decode rate table: {0}")]
    XmlDecode(#[from] serde_xml_rs::Error),
}
