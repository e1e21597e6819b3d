use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display(
        "the number of stripes and sub-stripes per stripe must be positive (got {num_stripes}, {num_sub_stripes_per_stripe})"
    ))]
    NonPositiveStripes {
        num_stripes: i32,
        num_sub_stripes_per_stripe: i32,
    },

    #[snafu(display(
        "sub-stripes are too small: {num_stripes} stripes * {num_sub_stripes_per_stripe} sub-stripes per stripe exceeds the 180*3600 limit"
    ))]
    SubStripesTooSmall {
        num_stripes: i32,
        num_sub_stripes_per_stripe: i32,
    },

    #[snafu(display("chunk spec merge/restrict between mismatched chunk ids {lhs} and {rhs}"))]
    MismatchedChunkId { lhs: i32, rhs: i32 },

    #[snafu(display("attempted a per-sub-chunk spec list without sub-chunks (chunk {chunk_id})"))]
    NoSubChunks { chunk_id: i32 },

    #[snafu(display(
        "striping parameters must have stripes >= 1 and sub-stripes-per-stripe >= 1 (got {stripes}, {sub_stripes_per_stripe})"
    ))]
    InvalidStripingParams {
        stripes: i32,
        sub_stripes_per_stripe: i32,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
