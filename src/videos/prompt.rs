//! Instruction text, response schema and the protected-link heuristic.

use crate::llm::{ChatMessage, ResponseSchema};
use serde_json::json;
use url::Url;

/// Hosts (and their subdomains) of streaming CDNs that hand out expiring links.
pub const STREAMING_CDN_HOSTS: &[&str] = &[
    "akamaihd.net",
    "akamaized.net",
    "cloudfront.net",
    "fastly.net",
    "googlevideo.com",
    "vimeocdn.com",
    "fbcdn.net",
    "cdninstagram.com",
    "ttvnw.net",
    "jwpcdn.com",
    "brightcovecdn.com",
    "llnwd.net",
    "b-cdn.net",
];

/// Query parameters that mark a signed or session-bound URL. Compared case-insensitively.
pub const SIGNING_PARAMS: &[&str] = &[
    "expires",
    "expire",
    "exp",
    "signature",
    "sig",
    "token",
    "hdnts",
    "hdnea",
    "policy",
    "key-pair-id",
    "x-amz-signature",
    "x-amz-expires",
    "x-amz-credential",
    "sessionid",
    "session_id",
    "sid",
];

/// System instruction sent with every analysis request.
pub fn analysis_instruction() -> String {
    format!(
        r#"You are an expert at finding downloadable video content on web pages.

Analyze the web page at the URL the user provides and find every direct video file link (mp4, webm, mov, mkv and similar) and every streaming manifest (m3u8, mpd).

Group the results by conceptual video: if the same video is offered in several qualities or formats, return ONE entry for it and list each quality as a variant.

For each video extract:
- title: a descriptive, non-empty title
- thumbnailUrl: the poster or thumbnail image, if any
- category: a short category label, if one can be inferred
- uploadDate: the publication date in ISO 8601 format (YYYY-MM-DD), if known
- popularity: a numeric popularity indicator such as a view count, if known

For each variant extract:
- url: the direct link to the file or manifest, exactly as it appears
- format: the lowercase file or container extension, e.g. "mp4" or "m3u8"
- resolution: a quality label such as "1080p", "720p" or "Audio Only"; use "Unknown" when it cannot be determined
- sizeMb: the file size in megabytes, if known
- isProtected: true when the link is likely to expire

A link is protected when its host belongs to a known streaming CDN ({cdns}), or when its query string contains any of these parameters: {params}.

Return only a JSON array of video objects. Return an empty array if the page has no videos."#,
        cdns = STREAMING_CDN_HOSTS.join(", "),
        params = SIGNING_PARAMS.join(", "),
    )
}

/// Full conversation for one page.
pub fn analysis_messages(page_url: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(analysis_instruction()),
        ChatMessage::user(format!("Find all videos on this page: {}", page_url)),
    ]
}

/// JSON array schema matching [`super::VideoGroup`] / [`super::VideoVariant`].
pub fn video_groups_schema() -> ResponseSchema {
    let variant = json!({
        "type": "object",
        "properties": {
            "url": { "type": "string" },
            "format": { "type": "string" },
            "resolution": { "type": "string" },
            "sizeMb": { "type": "number" },
            "isProtected": { "type": "boolean" }
        },
        "required": ["url", "format", "resolution"]
    });

    let group = json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "thumbnailUrl": { "type": "string" },
            "category": { "type": "string" },
            "uploadDate": { "type": "string" },
            "popularity": { "type": "number" },
            "variants": { "type": "array", "items": variant }
        },
        "required": ["title", "variants"]
    });

    ResponseSchema::new("video_groups", json!({ "type": "array", "items": group }))
}

/// Same rule the instruction gives the model, applied locally.
pub fn looks_protected(url: &Url) -> bool {
    let on_cdn = url.host_str().map_or(false, |host| {
        let host = host.to_ascii_lowercase();
        STREAMING_CDN_HOSTS
            .iter()
            .any(|cdn| host == *cdn || host.ends_with(&format!(".{}", cdn)))
    });

    on_cdn
        || url.query_pairs().any(|(name, _)| {
            let name = name.to_ascii_lowercase();
            SIGNING_PARAMS.contains(&name.as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_lists_protection_signals() {
        let instruction = analysis_instruction();
        assert!(instruction.contains("cloudfront.net"));
        assert!(instruction.contains("x-amz-signature"));
        assert!(instruction.contains("m3u8"));
    }

    #[test]
    fn test_messages_carry_page_url() {
        let messages = analysis_messages("https://site.test/page");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.ends_with("https://site.test/page"));
    }

    #[test]
    fn test_schema_required_fields() {
        let schema = video_groups_schema().schema;
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["required"], json!(["title", "variants"]));
        assert_eq!(
            schema["items"]["properties"]["variants"]["items"]["required"],
            json!(["url", "format", "resolution"])
        );
    }

    #[test]
    fn test_looks_protected() {
        let cdn = Url::parse("https://d111.cloudfront.net/v/a.mp4").unwrap();
        let signed = Url::parse("https://media.site.test/a.mp4?Expires=123&Signature=abc").unwrap();
        let plain = Url::parse("https://media.site.test/a.mp4?quality=hd").unwrap();
        let lookalike = Url::parse("https://notcloudfront.net/a.mp4").unwrap();

        assert!(looks_protected(&cdn));
        assert!(looks_protected(&signed));
        assert!(!looks_protected(&plain));
        assert!(!looks_protected(&lookalike));
    }
}
