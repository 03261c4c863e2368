pub mod gemini;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::AssistantError;
use crate::model::PriceBar;

/// Abstraction over a hosted generative-model API.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn Assistant`).
pub trait Assistant: Send + Sync {
    #[allow(dead_code)]
    fn provider(&self) -> &'static str;

    /// Answer a free-form question about the dataset.
    ///
    /// `sample` is one example row included in the prompt so the model
    /// knows the column shape. A missing credential is a recoverable
    /// condition: the returned text explains how to configure the key and
    /// no request is made.
    fn answer(
        &self,
        question: &str,
        sample: Option<&PriceBar>,
    ) -> BoxFuture<'_, Result<String, Report<AssistantError>>>;
}
