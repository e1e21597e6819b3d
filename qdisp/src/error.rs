use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("priority queue already has an entry for priority {priority}"))]
    DuplicatePriority { priority: i32 },

    #[snafu(display("no queue registered for priority {priority}"))]
    UnknownPriority { priority: i32 },

    #[snafu(display("dispatch failed: {message}"))]
    Dispatch { message: String },

    #[snafu(display("no such job {job_id} in this query"))]
    UnknownJob { job_id: i32 },

    #[snafu(display("bug: {message}"))]
    Bug { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
