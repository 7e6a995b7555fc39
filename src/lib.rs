//! Minimal template helper.
//!
//! Assign named variables to a [`TemplateEngine`], point it at a directory of
//! MiniJinja templates and fetch the rendered text of one of them:
//!
//! ```no_run
//! use tmplet::TemplateEngine;
//!
//! let mut engine = TemplateEngine::new();
//! engine.set_template_dir("templates")?;
//! engine.assign("name", "World")?;
//! let page = engine.fetch("hello.j2")?;
//! # Ok::<(), tmplet::TemplateError>(())
//! ```
//!
//! Besides the assigned variables, templates can use `_vars` (the whole
//! variable mapping), `_template` (the resolved path of the template being
//! rendered) and the functions `fetch`, `begin_capture`, `end_capture`,
//! `strict`, `notice`, `deprecated` and `warn`.

mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
mod runtime;

pub use config::{ConfigError, EngineConfig, Severity};
pub use engine::{TemplateEngine, DATASET_NAME, TEMPLATE_NAME};
pub use error::TemplateError;
