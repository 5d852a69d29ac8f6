//! forms_core — domain layer of the forms manager.
//!
//! Holds the form definition and metadata model, the structural mutation
//! helpers, definition validation, the store/publisher ports, repositories,
//! listing, audit-event mapping and [`service::FormService`]. No database code
//! lives here; `forms_postgres` and [`memory`] provide the adapters.

pub mod error;
pub mod events;
pub mod listing;
pub mod memory;
pub mod model;
pub mod mutation;
pub mod ports;
pub mod repository;
pub mod service;
pub mod slug;
pub mod validation;

pub use error::{FormsError, Result};
pub use service::FormService;
