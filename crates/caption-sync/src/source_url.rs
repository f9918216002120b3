//! Video URL validation and id extraction
//!
//! Accepted forms (http or https):
//! - `youtube.com/watch?v=ID` (optionally `www.` or `m.`)
//! - `youtu.be/ID`
//! - `youtube.com/embed/ID`, `youtube.com/v/ID` (optionally `www.`)

use url::Url;

/// Length of a video id
const VIDEO_ID_LEN: usize = 11;

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Returns true if `url` is a supported video URL carrying a video id
pub fn is_valid_video_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}

/// Extract the 11-character video id from a supported URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host.as_str() {
        "youtu.be" | "www.youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" => match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("v") if host != "m.youtube.com" => {
                segments.next().map(str::to_string)
            }
            _ => None,
        },
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}
