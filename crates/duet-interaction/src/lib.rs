//! HTTP side of generation: the OpenAI-compatible completion client.

pub mod openai_compatible_client;

pub use openai_compatible_client::OpenAiCompatibleClient;
