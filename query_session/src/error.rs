use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("ParseException: {message}"))]
    Parse { message: String },

    #[snafu(display("AnalysisError: {message}"))]
    Analysis { message: String },

    #[snafu(display("invariant violation: {message}"))]
    Invariant { message: String },

    #[snafu(display("metadata store error: {source}"))]
    Metadata { source: qmeta::Error },

    #[snafu(display("index map error: {source}"))]
    IndexMap { source: index_map::Error },

    #[snafu(display("chunk spec error: {source}"))]
    Chunking { source: chunking::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<qmeta::Error> for Error {
    fn from(source: qmeta::Error) -> Error {
        Error::Metadata { source }
    }
}

impl From<index_map::Error> for Error {
    fn from(source: index_map::Error) -> Error {
        Error::IndexMap { source }
    }
}

impl From<chunking::Error> for Error {
    fn from(source: chunking::Error) -> Error {
        Error::Chunking { source }
    }
}
