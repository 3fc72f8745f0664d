//! Keeps remote response bodies out of logs in full.
//!
//! Config documents for a busy instance run to hundreds of kilobytes; logging
//! them verbatim at debug level floods the output and can leak upstream
//! addresses into shared log sinks.

/// Maximum number of bytes of a body kept in log output.
const BODY_LOG_LIMIT: usize = 512;

/// Largest char boundary of `s` that is `<= index`.
fn char_boundary_at_or_before(s: &str, index: usize) -> usize {
    (0..=index.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}

/// Shorten a response body for logging.
///
/// Bodies within the limit are returned unchanged (minus a trailing newline);
/// longer ones keep their head and note the full size.
pub fn summarize_body(body: &str) -> String {
    let body = body.trim_end_matches('\n');
    if body.len() <= BODY_LOG_LIMIT {
        return body.to_string();
    }
    let cut = char_boundary_at_or_before(body, BODY_LOG_LIMIT);
    format!("{} <{} more bytes>", &body[..cut], body.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_unchanged() {
        assert_eq!(summarize_body("{\"ok\":true}\n"), "{\"ok\":true}");
    }

    #[test]
    fn long_body_is_cut_with_remainder_count() {
        let body = "x".repeat(BODY_LOG_LIMIT + 40);
        let result = summarize_body(&body);
        assert!(result.starts_with(&"x".repeat(BODY_LOG_LIMIT)));
        assert!(result.ends_with("<40 more bytes>"));
    }

    #[test]
    fn cut_respects_utf8_boundaries() {
        // 3-byte characters never align with the limit.
        let body = "日".repeat(BODY_LOG_LIMIT);
        let result = summarize_body(&body);
        assert!(result.contains("more bytes>"));
        let head = result.split(" <").next().unwrap();
        assert_eq!(head.len() % 3, 0);
    }
}
