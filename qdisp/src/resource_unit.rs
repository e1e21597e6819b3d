//! `ResourceUnit`: the address of a worker resource a job is dispatched
//! against. Grounded on `qdisp/ResourceUnit.h`: an immutable `(db, chunkId)`
//! pair rendered as a `/chunk/<db>/<chunkId>` path-shaped string toward the
//! wire layer (§6, "Toward workers").

use std::fmt;

/// Immutable address of one worker-side chunk resource.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResourceUnit {
    db: String,
    chunk_id: i32,
}

impl ResourceUnit {
    pub fn new(db: impl Into<String>, chunk_id: i32) -> ResourceUnit {
        ResourceUnit {
            db: db.into(),
            chunk_id,
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn chunk_id(&self) -> i32 {
        self.chunk_id
    }

    /// Renders the `/chunk/<db>/<chunkId>` path the original uses as a
    /// worker resource identifier.
    pub fn path(&self) -> String {
        format!("/chunk/{}/{}", self.db, self.chunk_id)
    }
}

impl fmt::Display for ResourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_chunk_path() {
        let ru = ResourceUnit::new("LSST", 100);
        assert_eq!(ru.path(), "/chunk/LSST/100");
        assert_eq!(ru.to_string(), "/chunk/LSST/100");
    }
}
