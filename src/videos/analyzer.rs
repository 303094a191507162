/// Cached page analysis backed by the configured model
use super::normalizer::normalize_response;
use super::prompt::{analysis_messages, video_groups_schema};
use super::VideoGroup;
use crate::error::AnalysisError;
use crate::llm::{create_llm, LLMConfig, LLMProvider, LLM};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Resolves page URLs to video groups, asking the model at most once per URL.
///
/// Entries are keyed by the exact submitted string and are never evicted. The
/// map only lives as long as the analyzer, which is one interactive session.
pub struct VideoAnalyzer {
    llm: Arc<dyn LLM>,
    cache: RwLock<HashMap<String, Vec<VideoGroup>>>,
}

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_groups: usize,
}

impl VideoAnalyzer {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self {
            llm,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build the analyzer around the provider named in `config`.
    pub fn from_config(config: &LLMConfig) -> anyhow::Result<Self> {
        let llm: Arc<dyn LLM> = Arc::from(create_llm(config)?);
        Ok(Self::new(llm))
    }

    /// Video groups found on `url`.
    pub async fn resolve(&self, url: &str) -> Result<Vec<VideoGroup>, AnalysisError> {
        if let Some(cached) = self.cache.read().await.get(url) {
            info!("📚 Cache hit: {} video groups for {}", cached.len(), url);
            return Ok(cached.clone());
        }

        debug!("Cache miss for {}, asking {:?}", url, self.llm.provider_type());

        let schema = video_groups_schema();
        let response = self
            .llm
            .chat(analysis_messages(url), Some(&schema))
            .await
            .map_err(|e| {
                error!("Model request for {} failed: {:#}", url, e);
                AnalysisError::Request(format!("{:#}", e))
            })?;

        if let Some(tokens) = response.tokens_used {
            debug!("Model used {} tokens for {}", tokens, url);
        }

        let groups = normalize_response(&response.content, url).map_err(|e| {
            error!("Rejected model response for {}: {}", url, e);
            e
        })?;

        self.cache.write().await.insert(url.to_string(), groups.clone());
        info!("💾 Cached {} video groups for {}", groups.len(), url);

        Ok(groups)
    }

    /// Cached result for `url` without calling the model.
    pub async fn cached(&self, url: &str) -> Option<Vec<VideoGroup>> {
        self.cache.read().await.get(url).cloned()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        CacheStats {
            entries: cache.len(),
            total_groups: cache.values().map(Vec::len).sum(),
        }
    }

    pub fn provider_type(&self) -> LLMProvider {
        self.llm.provider_type()
    }

    pub async fn is_available(&self) -> bool {
        self.llm.is_available().await
    }
}
