#[cfg(feature = "gemini")]
pub mod client;
pub mod prompts;
#[cfg(feature = "gemini")]
pub mod types;
pub mod vision;

#[cfg(feature = "gemini")]
pub use client::*;
pub use vision::*;
