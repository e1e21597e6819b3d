use crate::chunker::Chunker;
use crate::error::{InvalidStripingParamsSnafu, Result};
use snafu::ensure;

/// The two numbers that determine a database's partitioning scheme: how
/// many latitude stripes the sphere is divided into, and how many
/// sub-stripes each stripe is further divided into for sub-chunk
/// resolution. Read from the metadata store per database (see `qmeta`);
/// `chunking` only knows how to turn a pair of these numbers into a
/// [`Chunker`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StripingParams {
    pub stripes: i32,
    pub sub_stripes_per_stripe: i32,
}

impl StripingParams {
    pub fn new(stripes: i32, sub_stripes_per_stripe: i32) -> Result<StripingParams> {
        ensure!(
            stripes >= 1 && sub_stripes_per_stripe >= 1,
            InvalidStripingParamsSnafu {
                stripes,
                sub_stripes_per_stripe,
            }
        );
        Ok(StripingParams {
            stripes,
            sub_stripes_per_stripe,
        })
    }

    /// Builds the [`Chunker`] these parameters describe.
    pub fn build_chunker(&self) -> Result<Chunker> {
        Chunker::new(self.stripes, self.sub_stripes_per_stripe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_values() {
        let err = StripingParams::new(0, 4).unwrap_err();
        test_helpers::assert_error_contains(&err, "must have stripes");
    }

    #[test]
    fn builds_a_chunker() {
        let sp = StripingParams::new(85, 12).unwrap();
        let chunker = sp.build_chunker().unwrap();
        assert_eq!(chunker.num_stripes(), 85);
    }
}
