use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("invalid number of parameters for {shape}: expected {expected}, got {got}"))]
    InvalidParamCount {
        shape: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[snafu(display("could not parse restrictor parameter {value:?} as a number: {source}"))]
    InvalidParamValue {
        value: String,
        source: std::num::ParseFloatError,
    },

    #[snafu(display("secondary index lookup failed: {message}"))]
    SecondaryIndexLookup { message: String },

    #[snafu(display("chunk spec error: {source}"))]
    Chunking { source: chunking::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<chunking::Error> for Error {
    fn from(source: chunking::Error) -> Error {
        Error::Chunking { source }
    }
}
