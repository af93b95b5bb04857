// src/sources/extract.rs
//! Selector-fallback extraction shared by the static and dynamic adapters.
//!
//! Job boards rename their CSS classes often, so every field is read through
//! an ordered list of candidate selectors; the first non-empty hit wins.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Parse a selector known at compile time.
pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Try each selector in order; return the first non-empty text content.
pub(crate) fn first_text(el: &ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    for s in selectors {
        if let Some(hit) = el.select(s).next() {
            let text = hit.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Try each selector in order; return the first non-empty attribute value.
pub(crate) fn first_attr(
    el: &ElementRef<'_>,
    selectors: &[Selector],
    attr: &str,
) -> Option<String> {
    for s in selectors {
        for hit in el.select(s) {
            if let Some(v) = hit.value().attr(attr) {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| sel("title"));

const BODY_MARKERS: [&str; 5] = [
    "captcha",
    "recaptcha",
    "hcaptcha",
    "cloudflare",
    "access denied",
];
const TITLE_MARKERS: [&str; 4] = ["captcha", "security check", "access denied", "please verify"];

/// Textual heuristic for anti-bot interstitials: a page served in place of
/// the intended resource. Checked on both static responses and rendered DOM.
pub(crate) fn looks_like_interstitial(doc: &Html) -> bool {
    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|t| t.text().collect::<String>().to_lowercase())
        .unwrap_or_default();
    if TITLE_MARKERS.iter().any(|m| title.contains(m)) {
        return true;
    }
    let body = doc.root_element().text().collect::<String>().to_lowercase();
    BODY_MARKERS.iter().any(|m| body.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order_picks_first_nonempty() {
        let html = Html::parse_fragment(
            r#"<div><span class="a"></span><span class="b">Beta</span><span class="c">Gamma</span></div>"#,
        );
        let root = html.root_element();
        let sels = vec![sel("span.a"), sel("span.b"), sel("span.c")];
        assert_eq!(first_text(&root, &sels).as_deref(), Some("Beta"));
    }

    #[test]
    fn attr_fallback_skips_missing() {
        let html = Html::parse_fragment(
            r#"<div><a class="x">no href</a><a class="y" href="/jobs/1">link</a></div>"#,
        );
        let root = html.root_element();
        let sels = vec![sel("a.x"), sel("a.y")];
        assert_eq!(first_attr(&root, &sels, "href").as_deref(), Some("/jobs/1"));
    }

    #[test]
    fn interstitial_detected_by_title_and_body() {
        let blocked = Html::parse_document(
            "<html><head><title>Security Check</title></head><body>verify</body></html>",
        );
        assert!(looks_like_interstitial(&blocked));

        let cf = Html::parse_document(
            "<html><head><title>Jobs</title></head><body>Checking with Cloudflare</body></html>",
        );
        assert!(looks_like_interstitial(&cf));

        let fine = Html::parse_document(
            "<html><head><title>Jobs</title></head><body>50 open roles</body></html>",
        );
        assert!(!looks_like_interstitial(&fine));
    }
}
