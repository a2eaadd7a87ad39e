//! Alert delivery for Vigil
//!
//! [`AlertDispatcher`] sends through any [`vigil_core::Mailer`] and records
//! every attempt in the history. [`SmtpMailer`] is the production transport.

mod dispatcher;
mod mock;
mod smtp;

pub use dispatcher::AlertDispatcher;
pub use mock::{MockMailer, SentMail};
pub use smtp::SmtpMailer;
