pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAIClient;
pub use provider::LLMProvider;
pub use types::{GenerateConfig, GenerateResponse, Message, Role, Usage};
