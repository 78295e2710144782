//! Chia is a small client for a persona chat on Google Gemini that only ever
//! answers in structured JSON.
//!
//! # Overview
//! Every reply from the model is a JSON array of parts. Each part carries a
//! sentence of text plus a facial expression and an animation tag for an
//! avatar to play. The crate:
//!
//! - constrains the model with a fixed system instruction and response schema
//! - keeps the conversation going through a [`session::Session`]
//! - decodes each reply into a typed [`persona::Reply`], rejecting anything off-contract
//! - renders the exchange to the terminal or an HTML page
//!
//! # Example
//! ```no_run
//! use chia::{conversation, display::HtmlPage, persona};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut page = HtmlPage::new("Chia");
//!     match persona::open_session(persona::SessionOptions {
//!         api_key: std::env::var("GEMINI_API_KEY").ok(),
//!         ..Default::default()
//!     }) {
//!         Ok(mut session) => {
//!             conversation::run(&mut session, &mut page, &conversation::DEMO_MESSAGES).await;
//!         }
//!         Err(e) => conversation::report_failure(&mut page, &e),
//!     }
//!     println!("{}", page.render());
//! }
//! ```

// Re-export for convenience
pub use async_trait::async_trait;

/// Backend implementations for supported providers
pub mod backends;

/// Builder pattern for configuring and instantiating providers
pub mod builder;

/// Chat-based interactions with language models
pub mod chat;

/// The scripted exchange and its error handler
pub mod conversation;

/// Where conversation output is shown
pub mod display;

/// Error types and handling
pub mod error;

/// The Chia persona, its reply types and response schema
pub mod persona;

/// Secret store for storing API keys
pub mod secret_store;

/// Stateful conversation handle
pub mod session;

pub use error::LLMError;
pub use persona::{Animation, Expression, Reply, ResponsePart};
pub use session::Session;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
