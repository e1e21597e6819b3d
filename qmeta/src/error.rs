use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("unknown database {db}"))]
    UnknownDatabase { db: String },

    #[snafu(display("unknown table {db}.{table}"))]
    UnknownTable { db: String, table: String },

    #[snafu(display("no query registered with id {query_id}"))]
    MissingQueryInfo { query_id: i64 },

    #[snafu(display("query {query_id} has already reached a terminal status and cannot transition again"))]
    AlreadyTerminal { query_id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
