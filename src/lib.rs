//! HTTP backend that turns a screenshot of a coding problem into text (via an
//! OCR API) and problem text into a solution (via a language-model API).

pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod models;
pub mod provider;
pub mod server;

pub use config::Config;
pub use server::{router, AppState};
