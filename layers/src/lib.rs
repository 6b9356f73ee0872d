//! Protocol Stack Layers Library
//!
//! This crate implements the 5G protocol stack layers according to 3GPP Release 16.
//! Currently it provides the DU MAC PUCCH resource management.

pub mod mac;

use thiserror::Error;

/// Common errors for protocol layers
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
