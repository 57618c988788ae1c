//! Host side of the extension messaging protocol: one [`ExtensionClient`] per extension URI
//! handles registration, command correlation, inbound events and live data, and component
//! state messages. [`ExtensionManager`] exposes registered extensions to documents by namespace.

mod action;
mod client;
mod config;
mod correlation;
mod dispatch;
mod document;
mod error;
mod manager;
mod registration;
mod services;

pub use action::{ActionRef, ActionState};
pub use client::{CommandInvocation, ExtensionClient};
pub use config::{ClientConfig, LOG_MESSAGES_ENV};
pub use document::{ExtensionComponent, ExtensionDocument, ExtensionEvent};
pub use error::ClientError;
pub use manager::{ExtensionManager, ExtensionRequest};
pub use registration::RegistrationState;
pub use services::{CommandIdGenerator, ExtensionServices, FIRST_COMMAND_ID};
