// Source URL resolution
//
// Candidates come from post metadata and from filename conventions. Known CDN
// links are rewritten to canonical post URLs, then every candidate is ranked
// by a fixed per-domain priority table and only the best survives.

use std::sync::OnceLock;

use regex::Regex;

/// Per-domain priority. Lower is better.
const SOURCE_PRIORITY: &[(&str, i32)] = &[
    ("pixiv.net", 1),
    ("fantia.jp", 2),
    ("tumblr.com", 3),
    ("baraag.net", 4),
    ("misskey.io", 5),
    ("pawoo.net", 6),
    ("twitter.com", 7),
    ("x.com", 7),
    ("gelbooru.com", 8),
    ("konachan.com", 9),
    ("kemono.cr", 10),
    ("danbooru.donmai.us", 11),
    ("twimg.com", 12),
    ("yande.re", 13),
];

const UNKNOWN_DOMAIN_SCORE: i32 = 100;
const ABSENT_SCORE: i32 = 999;

/// Priority score for a URL. Unknown-but-valid domains rank below all known
/// ones; an absent source ranks worst.
pub fn source_score(url: &str) -> i32 {
    if url.is_empty() {
        return ABSENT_SCORE;
    }

    let lower = url.to_lowercase();
    for (domain, score) in SOURCE_PRIORITY {
        if lower.contains(domain) {
            return *score;
        }
    }

    UNKNOWN_DOMAIN_SCORE
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

cached_regex!(
    pixiv_re,
    r"(?:i|img)\d{0,5}\.(?:pximg|pixiv)\.net/(?:(?:img-original|img\d{1,5})/img/|img/)(?:\d{4}/\d{2}/\d{2}/\d{2}/\d{2}/\d{2}/)?(?:[^/]+/)?(\d+)(?:_(?:[\w]+_)?p\d{1,3})?\.(?:jpg|jpeg|png|webp)"
);
cached_regex!(fantia_re, r"c\.fantia\.jp/uploads/post/file/(\d+)/");
cached_regex!(tumblr_re, r"([\w-]+)\.tumblr\.com/post/(\d+)");
cached_regex!(gelbooru_re, r"gelbooru_(\d+)_");
cached_regex!(konachan_re, r"konachan_(\d+)_");
cached_regex!(kemono_re, r"fanbox/(\d+)/(\d+)_");
cached_regex!(yandere_file_re, r"yandere_(\d+)_");
cached_regex!(yandere_url_re, r"files\.yande\.re/.*?/yande\.re(?:%20|\s|\+)(\d+)");

/// Rewrite known CDN links to canonical post URLs. Unknown URLs pass through
/// unchanged.
pub fn convert_cdn_url(url: &str) -> String {
    if let Some(m) = pixiv_re().captures(url) {
        return format!("https://www.pixiv.net/en/artworks/{}", &m[1]);
    }
    if let Some(m) = fantia_re().captures(url) {
        return format!("https://fantia.jp/posts/{}", &m[1]);
    }
    if let Some(m) = tumblr_re().captures(url) {
        return format!("https://{}.tumblr.com/post/{}", &m[1], &m[2]);
    }
    if let Some(m) = gelbooru_re().captures(url) {
        return format!(
            "https://gelbooru.com/index.php?page=post&s=view&id={}",
            &m[1]
        );
    }
    if let Some(m) = yandere_url_re().captures(url) {
        return format!("https://yande.re/post/show/{}", &m[1]);
    }

    url.to_string()
}

/// Extract a canonical source URL from standardized filename conventions.
pub fn source_from_filename(filename: &str) -> Option<String> {
    if let Some(m) = gelbooru_re().captures(filename) {
        return Some(format!(
            "https://gelbooru.com/index.php?page=post&s=view&id={}",
            &m[1]
        ));
    }
    if let Some(m) = konachan_re().captures(filename) {
        return Some(format!("https://konachan.com/post/show/{}", &m[1]));
    }
    if let Some(m) = kemono_re().captures(filename) {
        return Some(format!(
            "https://kemono.cr/fanbox/user/{}/post/{}",
            &m[1], &m[2]
        ));
    }
    if let Some(m) = yandere_file_re().captures(filename) {
        return Some(format!("https://yande.re/post/show/{}", &m[1]));
    }

    None
}

/// Evaluate the metadata source and the filename, returning the top-ranked
/// canonical URL. Deterministic regardless of candidate order.
pub fn resolve_best_source(post_source: &str, filename: &str) -> Option<String> {
    let mut candidates = Vec::new();

    if !post_source.is_empty() {
        candidates.push(convert_cdn_url(post_source));
    }
    if let Some(src) = source_from_filename(filename) {
        candidates.push(src);
    }

    candidates.sort_by_key(|c| source_score(c));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_score_ordering() {
        assert_eq!(source_score("https://www.pixiv.net/en/artworks/1"), 1);
        assert_eq!(source_score("https://twitter.com/user/status/1"), 7);
        assert_eq!(source_score("https://example.com/foo"), 100);
        assert_eq!(source_score(""), 999);
    }

    #[test]
    fn test_convert_pixiv_cdn() {
        let url = "https://i.pximg.net/img-original/img/2021/06/01/00/00/00/90123456_p0.png";
        assert_eq!(
            convert_cdn_url(url),
            "https://www.pixiv.net/en/artworks/90123456"
        );
    }

    #[test]
    fn test_convert_fantia_cdn() {
        let url = "https://c.fantia.jp/uploads/post/file/123456/main_image.jpg";
        assert_eq!(convert_cdn_url(url), "https://fantia.jp/posts/123456");
    }

    #[test]
    fn test_convert_tumblr() {
        let url = "https://some-user.tumblr.com/post/654321/slug";
        assert_eq!(
            convert_cdn_url(url),
            "https://some-user.tumblr.com/post/654321"
        );
    }

    #[test]
    fn test_unknown_url_passthrough() {
        let url = "https://example.com/image.png";
        assert_eq!(convert_cdn_url(url), url);
    }

    #[test]
    fn test_source_from_filename() {
        assert_eq!(
            source_from_filename("gelbooru_123456_0a1b2c.jpg").as_deref(),
            Some("https://gelbooru.com/index.php?page=post&s=view&id=123456")
        );
        assert_eq!(
            source_from_filename("konachan_99_hash.png").as_deref(),
            Some("https://konachan.com/post/show/99")
        );
        assert_eq!(
            source_from_filename("fanbox/111/222_cover.jpg").as_deref(),
            Some("https://kemono.cr/fanbox/user/111/post/222")
        );
        assert_eq!(source_from_filename("vacation.jpg"), None);
    }

    #[test]
    fn test_best_source_prefers_priority() {
        // pixiv (1) must beat the gelbooru filename candidate (8),
        // regardless of which side supplies it
        let best = resolve_best_source(
            "https://i.pximg.net/img-original/img/2021/06/01/00/00/00/42_p0.png",
            "gelbooru_777_hash.jpg",
        );
        assert_eq!(best.as_deref(), Some("https://www.pixiv.net/en/artworks/42"));

        let best = resolve_best_source(
            "https://gelbooru.com/index.php?page=post&s=view&id=777",
            "vacation.jpg",
        );
        assert_eq!(
            best.as_deref(),
            Some("https://gelbooru.com/index.php?page=post&s=view&id=777")
        );
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(resolve_best_source("", "vacation.jpg"), None);
    }
}
