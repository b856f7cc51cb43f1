#[cfg(feature = "browser")]
pub mod browser;
pub mod fetcher;
pub mod http_renderer;
pub mod llm;
pub mod settle;

#[cfg(feature = "browser")]
pub use browser::{ChromiumRenderer, ChromiumSession};
pub use fetcher::{DEFAULT_MAX_PAGE_BYTES, ReqwestFetcher};
pub use http_renderer::{HttpRenderer, HttpSession};
pub use llm::{InferenceConfig, OpenAiSchemaInferrer};
pub use settle::SettlePolicy;
