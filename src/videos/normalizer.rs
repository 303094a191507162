/// Validation and reshaping of the model's JSON reply
use super::prompt::looks_protected;
use super::{VideoGroup, VideoVariant};
use crate::error::{AnalysisError, LinkResolutionError};
use crate::llm::ENVELOPE_KEY;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariant {
    url: String,
    format: String,
    resolution: String,
    #[serde(default)]
    size_mb: Option<f64>,
    #[serde(default)]
    is_protected: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    title: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
    variants: Vec<RawVariant>,
}

/// Parse the reply text and turn it into video groups whose links are
/// resolved against `page_url`.
///
/// Any JSON or type error fails the whole response. Link resolution failures
/// only affect the field they occur in.
pub fn normalize_response(content: &str, page_url: &str) -> Result<Vec<VideoGroup>, AnalysisError> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| AnalysisError::InvalidJson(e.to_string()))?;

    let items = match value {
        Value::Object(mut map) => map.remove(ENVELOPE_KEY).unwrap_or(Value::Null),
        other => other,
    };
    if !items.is_array() {
        return Err(AnalysisError::Schema(
            "expected an array of video groups".to_string(),
        ));
    }
    let raw_groups = parse_groups(items)?;

    let base = match Url::parse(page_url) {
        Ok(base) => Some(base),
        Err(e) => {
            warn!("Page URL {} is not a valid base, links stay as returned: {}", page_url, e);
            None
        }
    };

    raw_groups
        .into_iter()
        .enumerate()
        .map(|(index, raw)| normalize_group(index, raw, base.as_ref(), page_url))
        .collect()
}

fn parse_groups(value: Value) -> Result<Vec<RawGroup>, AnalysisError> {
    serde_json::from_value(value).map_err(|e| AnalysisError::Schema(e.to_string()))
}

fn normalize_group(
    index: usize,
    raw: RawGroup,
    base: Option<&Url>,
    page_url: &str,
) -> Result<VideoGroup, AnalysisError> {
    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(AnalysisError::Schema(format!("group {} has an empty title", index)));
    }
    if raw.variants.is_empty() {
        return Err(AnalysisError::Schema(format!("group {:?} has no variants", title)));
    }

    let thumbnail_url = non_empty(raw.thumbnail_url)
        .map(|link| resolve_or_keep(base, page_url, link));

    let variants = raw
        .variants
        .into_iter()
        .map(|variant| normalize_variant(variant, base, page_url, &title))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VideoGroup {
        title,
        thumbnail_url,
        category: non_empty(raw.category),
        upload_date: non_empty(raw.upload_date),
        popularity: raw.popularity.filter(|p| p.is_finite()),
        variants,
    })
}

fn normalize_variant(
    raw: RawVariant,
    base: Option<&Url>,
    page_url: &str,
    title: &str,
) -> Result<VideoVariant, AnalysisError> {
    if raw.url.trim().is_empty() {
        return Err(AnalysisError::Schema(format!("a variant of {:?} has an empty url", title)));
    }

    let url = resolve_or_keep(base, page_url, raw.url);

    let format = raw.format.trim().trim_start_matches('.').to_lowercase();
    let size_mb = raw.size_mb.filter(|size| size.is_finite() && *size > 0.0);
    let is_protected = raw.is_protected.or_else(|| {
        Url::parse(&url)
            .ok()
            .filter(looks_protected)
            .map(|_| true)
    });

    Ok(VideoVariant {
        url,
        format,
        resolution: non_empty(Some(raw.resolution)),
        size_mb,
        is_protected,
    })
}

/// Make `link` absolute against `base`. Without a base only absolute links succeed.
pub fn resolve_link(base: Option<&Url>, page_url: &str, link: &str) -> Result<String, LinkResolutionError> {
    let failure = |reason: String| LinkResolutionError {
        link: link.to_string(),
        base: page_url.to_string(),
        reason,
    };

    let resolved = match base {
        Some(base) => base.join(link.trim()),
        None => Url::parse(link.trim()),
    };
    resolved.map(String::from).map_err(|e| failure(e.to_string()))
}

fn resolve_or_keep(base: Option<&Url>, page_url: &str, link: String) -> String {
    match resolve_link(base, page_url, &link) {
        Ok(resolved) => {
            if resolved != link {
                debug!("Resolved {} -> {}", link, resolved);
            }
            resolved
        }
        Err(e) => {
            warn!("{}", e);
            link
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
