/// Plain-text rendering of results, download options and history
use super::session::PresentationState;
use crate::videos::{VideoGroup, VideoVariant};
use std::fmt::Write;

/// "850 KB", "12.4 MB", "1.50 GB"; `None` is "unknown size".
pub fn format_size(size_mb: Option<f64>) -> String {
    match size_mb {
        None => "unknown size".to_string(),
        Some(mb) if mb < 1.0 => format!("{:.0} KB", mb * 1024.0),
        Some(mb) if mb >= 1024.0 => format!("{:.2} GB", mb / 1024.0),
        Some(mb) => format!("{:.1} MB", mb),
    }
}

fn variant_summary(variant: &VideoVariant) -> String {
    let mut line = format!(
        "{} · {} · {}",
        variant.resolution.as_deref().unwrap_or("unknown quality"),
        variant.format.to_uppercase(),
        format_size(variant.size_mb)
    );
    if variant.may_expire() {
        line.push_str(" · ⚠️ link may expire");
    }
    line
}

/// Numbered result list followed by the active filter and sort order.
pub fn render_results(state: &PresentationState) -> String {
    let mut out = String::new();

    if state.is_loading {
        out.push_str("⏳ Analyzing page...\n");
        return out;
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "❌ {}", error);
        return out;
    }
    if !state.has_searched {
        out.push_str("Enter a page URL to find its videos.\n");
        return out;
    }

    let visible = state.visible_groups();
    if visible.is_empty() {
        out.push_str("No videos found.\n");
    }

    for (index, group) in visible.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}", index + 1, group_heading(group));
        if let Some(first) = group.variants.first() {
            let _ = writeln!(
                out,
                "    {} variant(s), first: {}",
                group.variants.len(),
                variant_summary(first)
            );
        }
    }

    let _ = writeln!(
        out,
        "\nShowing {} of {} · category: {} · sorted by {}",
        visible.len(),
        state.video_groups.len(),
        state.selected_category,
        state.sort_by
    );
    out
}

fn group_heading(group: &VideoGroup) -> String {
    let mut heading = group.title.clone();
    if let Some(category) = &group.category {
        let _ = write!(heading, " [{}]", category);
    }
    if let Some(date) = &group.upload_date {
        let _ = write!(heading, " · {}", date);
    }
    if let Some(popularity) = group.popularity {
        let _ = write!(heading, " · popularity {}", popularity);
    }
    heading
}

/// Every variant of `group` with its full URL. `is_copied` marks the
/// variant whose URL was copied last.
pub fn render_download_options(group: &VideoGroup, is_copied: impl Fn(&str) -> bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Download options for {}", group.title);
    if let Some(thumbnail) = &group.thumbnail_url {
        let _ = writeln!(out, "  thumbnail: {}", thumbnail);
    }
    for (index, variant) in group.variants.iter().enumerate() {
        let marker = if is_copied(&variant.url) { "  ✅ copied" } else { "" };
        let _ = writeln!(out, "  {}. {}{}", index + 1, variant_summary(variant), marker);
        let _ = writeln!(out, "     {}", variant.url);
    }
    out
}

pub fn render_history(entries: &[String]) -> String {
    if entries.is_empty() {
        return "No recent searches.\n".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(index, url)| format!("{:>2}. {}\n", index + 1, url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> VideoGroup {
        VideoGroup {
            title: "Keynote".to_string(),
            thumbnail_url: Some("https://site.test/k.jpg".to_string()),
            category: Some("Talks".to_string()),
            upload_date: None,
            popularity: Some(12.0),
            variants: vec![
                VideoVariant {
                    url: "https://site.test/k-1080.mp4".to_string(),
                    format: "mp4".to_string(),
                    resolution: Some("1080p".to_string()),
                    size_mb: Some(1536.0),
                    is_protected: Some(true),
                },
                VideoVariant {
                    url: "https://site.test/k.m3u8".to_string(),
                    format: "m3u8".to_string(),
                    resolution: None,
                    size_mb: None,
                    is_protected: None,
                },
            ],
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "unknown size");
        assert_eq!(format_size(Some(0.5)), "512 KB");
        assert_eq!(format_size(Some(12.44)), "12.4 MB");
        assert_eq!(format_size(Some(1536.0)), "1.50 GB");
    }

    #[test]
    fn test_render_results_states() {
        let mut state = PresentationState::default();
        assert!(render_results(&state).contains("Enter a page URL"));

        state.is_loading = true;
        assert!(render_results(&state).contains("Analyzing"));

        state.is_loading = false;
        state.has_searched = true;
        assert!(render_results(&state).contains("No videos found"));

        state.video_groups = vec![sample_group()];
        let rendered = render_results(&state);
        assert!(rendered.contains(" 1. Keynote [Talks]"));
        assert!(rendered.contains("link may expire"));
        assert!(rendered.contains("Showing 1 of 1"));

        state.error = Some("boom".to_string());
        assert_eq!(render_results(&state), "❌ boom\n");
    }

    #[test]
    fn test_render_download_options_marks_copied() {
        let group = sample_group();
        let rendered = render_download_options(&group, |url| url.ends_with(".m3u8"));

        assert!(rendered.contains("https://site.test/k-1080.mp4"));
        assert!(rendered.contains("unknown quality · M3U8 · unknown size  ✅ copied"));
        assert_eq!(rendered.matches("copied").count(), 1);
    }

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "No recent searches.\n");
        let entries = vec!["https://a.test".to_string(), "https://b.test".to_string()];
        assert_eq!(render_history(&entries), " 1. https://a.test\n 2. https://b.test\n");
    }
}
