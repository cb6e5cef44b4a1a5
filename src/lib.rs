//! logsift: filter, highlight and navigate large text logs.
//!
//! The engine lives in [`session`]: a [`DocumentSession`](session::DocumentSession)
//! owns the document, its [`filter`] list and markers, and re-runs the
//! [`pipeline`] in the background through [`refilter`] whenever they change.
//! The terminal viewer in [`app`] and [`ui`] is one consumer of it.

pub mod app;
pub mod cli;
pub mod error;
pub mod filter;
pub mod logging;
pub mod markers;
pub mod navigator;
pub mod pipeline;
pub mod queue;
pub mod refilter;
pub mod session;
pub mod source;
pub mod state;
pub mod status;
pub mod ui;
pub mod view;
