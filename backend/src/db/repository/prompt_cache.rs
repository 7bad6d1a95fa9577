//! Cached agent replies.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::PromptCacheEntry;

#[async_trait]
pub trait PromptCacheRepository: Send + Sync {
    async fn get_cached_response(&self, prompt_key: &str) -> RepositoryResult<Option<PromptCacheEntry>>;

    /// Store a reply under `prompt_key`. An existing entry for the key is kept
    /// unchanged and returned.
    async fn store_cached_response(
        &self,
        prompt_key: &str,
        response: &str,
    ) -> RepositoryResult<PromptCacheEntry>;
}
