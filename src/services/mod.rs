// src/services/mod.rs
pub mod fusion;
pub mod image_processor;
pub mod llm_service;
pub mod preview_store;
pub mod prompts;
pub mod session_controller;

pub use llm_service::{LLMService, RemoteAnalysis};
pub use preview_store::PreviewStore;
pub use session_controller::SessionController;
