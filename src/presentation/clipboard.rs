/// Copying variant URLs and the transient "copied" marker
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// How long a URL shows as copied
pub const COPY_FEEDBACK_DURATION: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// The desktop clipboard
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut clipboard = arboard::Clipboard::new()?;
            clipboard.set_text(text)?;
            Ok(())
        })
        .await??;
        Ok(())
    }
}

/// Remembers which URL was copied last, for a short while.
///
/// Each copy starts its own timer. A timer only clears the marker if it
/// still holds the URL that timer was started for.
#[derive(Clone)]
pub struct CopyFeedback {
    copied: Arc<Mutex<Option<String>>>,
    duration: Duration,
}

impl CopyFeedback {
    pub fn new(duration: Duration) -> Self {
        Self {
            copied: Arc::new(Mutex::new(None)),
            duration,
        }
    }

    /// Write `url` to `clipboard` and mark it copied. Nothing is marked on failure.
    pub async fn copy(&self, clipboard: &dyn Clipboard, url: &str) -> Result<()> {
        clipboard.write_text(url).await?;
        *self.copied.lock().await = Some(url.to_string());
        debug!("📋 Copied {}", url);

        let copied = Arc::clone(&self.copied);
        let url = url.to_string();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut current = copied.lock().await;
            if current.as_deref() == Some(url.as_str()) {
                *current = None;
            }
        });

        Ok(())
    }

    pub async fn is_copied(&self, url: &str) -> bool {
        self.copied.lock().await.as_deref() == Some(url)
    }
}

impl Default for CopyFeedback {
    fn default() -> Self {
        Self::new(COPY_FEEDBACK_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingClipboard {
        written: StdMutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("clipboard unavailable");
            }
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_expires() {
        let clipboard = RecordingClipboard::default();
        let feedback = CopyFeedback::default();

        feedback.copy(&clipboard, "https://a.test/v.mp4").await.unwrap();
        assert!(feedback.is_copied("https://a.test/v.mp4").await);
        assert_eq!(clipboard.written.lock().unwrap().as_slice(), &["https://a.test/v.mp4"]);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(!feedback.is_copied("https://a.test/v.mp4").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_timer_keeps_newer_marker() {
        let clipboard = RecordingClipboard::default();
        let feedback = CopyFeedback::default();

        feedback.copy(&clipboard, "https://a.test/1.mp4").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        feedback.copy(&clipboard, "https://a.test/2.mp4").await.unwrap();

        // first timer fires here
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(feedback.is_copied("https://a.test/2.mp4").await);
        assert!(!feedback.is_copied("https://a.test/1.mp4").await);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!feedback.is_copied("https://a.test/2.mp4").await);
    }

    #[tokio::test]
    async fn test_failed_copy_marks_nothing() {
        let clipboard = RecordingClipboard {
            fail: true,
            ..Default::default()
        };
        let feedback = CopyFeedback::default();

        assert!(feedback.copy(&clipboard, "https://a.test/v.mp4").await.is_err());
        assert!(!feedback.is_copied("https://a.test/v.mp4").await);
    }
}
