//! `QueryTemplate`: a rendered SQL string carrying `%CC%`/`%SS%` placeholders
//! that get substituted once per chunk (and, for sub-chunk overlap queries,
//! once per sub-chunk) at dispatch time. Grounded on `query/QueryTemplate.h`'s
//! role in the original: plugins manipulate tokens without re-parsing, and
//! the final substitution is a single pass over the rendered text.

pub const CHUNK_TOKEN: &str = "%CC%";
pub const SUB_CHUNK_TOKEN: &str = "%SS%";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn new(text: impl Into<String>) -> QueryTemplate {
        QueryTemplate(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_sub_chunk_token(&self) -> bool {
        self.0.contains(SUB_CHUNK_TOKEN)
    }

    /// Substitutes `%CC%` with `chunk_id` and, if present, `%SS%` with
    /// `sub_chunk_id`.
    pub fn render(&self, chunk_id: i32, sub_chunk_id: Option<i32>) -> String {
        let mut out = self.0.replace(CHUNK_TOKEN, &chunk_id.to_string());
        if let Some(sub_chunk_id) = sub_chunk_id {
            out = out.replace(SUB_CHUNK_TOKEN, &sub_chunk_id.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_chunk_token_only() {
        let t = QueryTemplate::new("SELECT * FROM LSST.Object_%CC% AS QST_1_");
        assert_eq!(t.render(100, None), "SELECT * FROM LSST.Object_100 AS QST_1_");
    }

    #[test]
    fn renders_chunk_and_sub_chunk_tokens() {
        let t = QueryTemplate::new("LSST.Object_%CC%_%SS%");
        assert!(t.has_sub_chunk_token());
        assert_eq!(t.render(100, Some(5)), "LSST.Object_100_5");
    }
}
