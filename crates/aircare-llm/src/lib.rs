pub mod ollama;
pub mod provider;
pub mod stub;

pub use ollama::OllamaProvider;
pub use provider::{parse_json_lenient, LlmProvider, ProviderError};
pub use stub::StubProvider;
