//! Ad-host and bandwidth-optimization request classifiers (spec §4.5 steps
//! 2 and 4). Intentionally small, static lists rather than a maintained
//! filter-list parser: `blockHosts`/`blockUrlPatterns` in [`SessionConfig`]
//! are the extensibility point for callers who need more.

use helm_cdp::protocol::fetch::RequestPausedEvent;
use helm_cdp::protocol::network::ResourceType;

use crate::config::BandwidthBlockPolicy;

/// A small set of well-known ad/tracking hosts, enough to demonstrate the
/// classifier without shipping a filter-list dependency.
const AD_HOST_MARKERS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "googleadservices.com",
    "adservice.google.com",
    "ads-twitter.com",
    "amazon-adsystem.com",
    "taboola.com",
    "outbrain.com",
];

pub fn is_ad_request(url: &str) -> bool {
    AD_HOST_MARKERS.iter().any(|host| url.contains(host))
}

pub fn is_bandwidth_blocked(event: &RequestPausedEvent, policy: &BandwidthBlockPolicy) -> bool {
    if policy.is_empty() {
        return false;
    }
    let by_resource_type = match event.resource_type {
        ResourceType::Image => policy.block_images,
        ResourceType::Media => policy.block_media,
        ResourceType::Stylesheet => policy.block_stylesheets,
        _ => false,
    };
    if by_resource_type {
        return true;
    }
    if policy.block_hosts.iter().any(|host| event.request.url.contains(host)) {
        return true;
    }
    policy
        .block_url_patterns
        .iter()
        .any(|pattern| glob_match(pattern, &event.request.url))
}

/// Minimal `*`/`?` glob matcher, mirroring the wildcard semantics CDP's own
/// `Fetch.RequestPattern.urlPattern` documents.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn helper(pattern: &[char], text: &[char]) -> bool {
        match pattern.first() {
            None => text.is_empty(),
            Some('*') => {
                helper(&pattern[1..], text)
                    || (!text.is_empty() && helper(pattern, &text[1..]))
            }
            Some('?') => !text.is_empty() && helper(&pattern[1..], &text[1..]),
            Some(c) => text.first() == Some(c) && helper(&pattern[1..], &text[1..]),
        }
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    helper(&pattern, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_ad_hosts() {
        assert!(is_ad_request("https://pagead2.googlesyndication.com/pagead/ads"));
        assert!(!is_ad_request("https://example.com/main.js"));
    }

    #[test]
    fn glob_handles_wildcards() {
        assert!(glob_match("*.example.com/*", "cdn.example.com/img.png"));
        assert!(!glob_match("*.example.com/*", "cdn.other.com/img.png"));
        assert!(glob_match("/path/??.png", "/path/ab.png"));
    }
}
