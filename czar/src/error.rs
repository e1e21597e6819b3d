//! Error taxonomy for the façade and session registry (§7). Dispatch and
//! merge errors surface through the message store instead of this enum
//! (they're recorded per-chunk and drive `join()`'s return value, not a
//! `Result`); this enum covers the synchronous, caller-visible failures:
//! registry misses, discard preconditions, and bubbled-up errors from the
//! crates `czar` wires together.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// `MissingUserQuery(id)` per §4.8: a lookup by session id found
    /// nothing registered.
    #[snafu(display("Invalid UserQuery[{id}]"))]
    MissingUserQuery { id: i64 },

    #[snafu(display("cannot discard query {id}: executive has jobs in flight"))]
    DiscardWhileInFlight { id: i64 },

    #[snafu(display("cannot delete result for query {id}: not in a terminal state"))]
    ResultNotTerminal { id: i64 },

    #[snafu(display("cannot delete result for query {id}: result is not stored in a table"))]
    ResultNotInTable { id: i64 },

    #[snafu(display("invalid query id: {value}"))]
    InvalidQueryId { value: String },

    #[snafu(display("analysis failed: {source}"))]
    Analysis { source: query_session::Error },

    #[snafu(display("metadata store error: {source}"))]
    Metadata { source: qmeta::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<query_session::Error> for Error {
    fn from(source: query_session::Error) -> Error {
        Error::Analysis { source }
    }
}

impl From<qmeta::Error> for Error {
    fn from(source: qmeta::Error) -> Error {
        Error::Metadata { source }
    }
}
