//! Mail sources — where emails come from before they reach the pipeline.

pub mod email;
pub mod email_types;

pub use email::{ImapConfig, ImapMailSource, ImapSourceFactory, MailSource, MailSourceFactory};
