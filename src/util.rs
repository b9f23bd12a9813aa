use crate::models::Platform;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LIST_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]list=([a-zA-Z0-9_-]+)").unwrap());

/// Expand `${name}` and `${platform}` placeholders in a playlist name template.
pub fn expand_template(template: &str, name: &str, platform: Platform) -> String {
    template
        .replace("${name}", name)
        .replace("${platform}", platform.display_name())
}

/// Extract a playlist id from a share URL or URI, or return the input
/// (trimmed) if it already looks like an id.
///
/// - Spotify: `https://open.spotify.com/playlist/<id>?si=..` or `spotify:playlist:<id>`
/// - YouTube Music: the `list` query parameter; `PL...` ids pass through
/// - Apple Music: the last path segment (`pl.<id>`)
pub fn extract_playlist_id(platform: Platform, input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }
    match platform {
        Platform::Spotify => {
            if let Some(rest) = input.strip_prefix("spotify:playlist:") {
                return rest.to_string();
            }
            last_path_segment(input).unwrap_or_else(|| input.to_string())
        }
        Platform::YoutubeMusic => {
            if input.starts_with("PL") && !input.contains('/') {
                return input.to_string();
            }
            if let Ok(url) = Url::parse(input) {
                if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "list") {
                    return v.into_owned();
                }
            }
            LIST_PARAM
                .captures(input)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| input.to_string())
        }
        Platform::AppleMusic => last_path_segment(input).unwrap_or_else(|| input.to_string()),
    }
}

fn last_path_segment(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders() {
        assert_eq!(
            expand_template("${name} (${platform})", "Road Trip", Platform::AppleMusic),
            "Road Trip (Apple Music)"
        );
        assert_eq!(expand_template("${name}", "Mix", Platform::Spotify), "Mix");
    }
}
