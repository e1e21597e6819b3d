use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("LOAD DATA INFILE failed for table {table}: {message}"))]
    Ingest { table: String, message: String },

    #[snafu(display("merge finalize statement failed: {message}"))]
    Finalize { message: String },

    #[snafu(display("cannot discard merger: not finished"))]
    DiscardWhileUnfinished,

    #[snafu(display("connection error: {message}"))]
    Connection { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
