use snafu::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot normalize the zero vector"))]
    ZeroVector,

    #[snafu(display("angle {degrees} is not a valid latitude (must be in [-90, 90])"))]
    InvalidLatitude { degrees: f64 },

    #[snafu(display("a convex polygon must have at least 3 vertices, got {count}"))]
    TooFewVertices { count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
