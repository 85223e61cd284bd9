//! Command modules for the PDL CLI

pub mod record;

pub use record::record_session;
