// Flat segment-list manifest: one reference per line, only lines ending in the
// segment extension are kept. No playlist directives are interpreted.

use tracing::trace;
use url::Url;

/// Extract segment URLs from a manifest body, in file order.
///
/// Lines are trimmed before matching. Relative references are resolved against
/// `base`; references that cannot be resolved are dropped. Duplicates are kept,
/// deduplication is the fetcher's job.
pub fn parse_segment_list(body: &str, base: &Url, extension: &str) -> Vec<Url> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.ends_with(extension))
        .filter_map(|line| match base.join(line) {
            Ok(url) => Some(url),
            Err(e) => {
                trace!(line, error = %e, "Skipping unresolvable segment reference");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://radio.example/live/channel/playlist.m3u8").unwrap()
    }

    fn strings(urls: Vec<Url>) -> Vec<String> {
        urls.into_iter().map(String::from).collect()
    }

    #[test]
    fn keeps_only_segment_lines_in_order() {
        let body = "#EXTM3U\n#EXT-X-TARGETDURATION:10\nhttp://cdn.example/a/1.aac\nnotes.txt\nhttp://cdn.example/a/2.aac\n";
        assert_eq!(
            strings(parse_segment_list(body, &base(), ".aac")),
            vec!["http://cdn.example/a/1.aac", "http://cdn.example/a/2.aac"]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let body = "seg1.aac\nseg2.aac\nseg1.aac\nother.txt\n";
        assert_eq!(
            strings(parse_segment_list(body, &base(), ".aac")),
            vec![
                "http://radio.example/live/channel/seg1.aac",
                "http://radio.example/live/channel/seg2.aac",
                "http://radio.example/live/channel/seg1.aac",
            ]
        );
    }

    #[test]
    fn tolerates_crlf_and_padding() {
        let body = "  http://cdn.example/x.aac \r\n\r\n/abs/y.aac\r\n";
        assert_eq!(
            strings(parse_segment_list(body, &base(), ".aac")),
            vec!["http://cdn.example/x.aac", "http://radio.example/abs/y.aac"]
        );
    }

    #[test]
    fn suffix_must_match_exactly() {
        let body = "a.aac?token=1\nb.AAC\nc.ts\n";
        assert!(parse_segment_list(body, &base(), ".aac").is_empty());
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert!(parse_segment_list("", &base(), ".aac").is_empty());
    }
}
