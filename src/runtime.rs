//! Functions available to templates while they render.

use log::{debug, info, warn};
use minijinja::value::{Kwargs, Value};
use minijinja::{Environment, Error, ErrorKind};
use std::path::Path;

use crate::capture::{self, SharedCapture};
use crate::config::Severity;
use crate::engine::TemplateEngine;

/// Registers `fetch`, the capture functions and the condition functions for
/// one render of `path`.
pub(crate) fn register(
    env: &mut Environment<'_>,
    engine: &TemplateEngine,
    capture: &SharedCapture,
    path: &Path,
) {
    let child = engine.nested();
    env.add_function("fetch", move |template: String, vars: Kwargs| {
        fetch(&child, &template, &vars)
    });

    let scopes = capture.clone();
    env.add_function("begin_capture", move || -> Result<String, Error> {
        let mut stack = capture::lock(&scopes).map_err(write_failure)?;
        stack.push().map_err(write_failure)?;
        Ok(String::new())
    });

    let scopes = capture.clone();
    env.add_function("end_capture", move || -> Result<String, Error> {
        let mut stack = capture::lock(&scopes).map_err(write_failure)?;
        Ok(stack.pop().unwrap_or_default())
    });

    let threshold = engine.config().escalate_at;
    for severity in [
        Severity::Strict,
        Severity::Notice,
        Severity::Deprecated,
        Severity::Warning,
    ] {
        let name = match severity {
            Severity::Strict => "strict",
            Severity::Notice => "notice",
            Severity::Deprecated => "deprecated",
            Severity::Warning => "warn",
        };
        let path = path.to_path_buf();
        env.add_function(name, move |message: String| {
            raise(severity, threshold, &path, &message)
        });
    }
}

fn fetch(child: &TemplateEngine, template: &str, vars: &Kwargs) -> Result<Value, Error> {
    if child.depth() > child.config().max_nesting {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "template nesting limit of {} exceeded while fetching {:?}",
                child.config().max_nesting,
                template
            ),
        ));
    }

    let mut child = child.clone();
    for name in vars.args() {
        let value: Value = vars.get(name)?;
        child.assign(name, value).map_err(|e| nested_failure(template, e))?;
    }
    debug!("Nested fetch of {:?} at depth {}", template, child.depth());

    let output = child
        .fetch(template)
        .map_err(|e| nested_failure(template, e))?;
    Ok(Value::from_safe_string(output))
}

fn raise(
    severity: Severity,
    threshold: Severity,
    path: &Path,
    message: &str,
) -> Result<String, Error> {
    if severity >= threshold {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("template {}: {}", severity, message),
        ));
    }
    match severity {
        Severity::Warning | Severity::Deprecated => {
            warn!("{:?}: template {}: {}", path, severity, message)
        }
        _ => info!("{:?}: template {}: {}", path, severity, message),
    }
    Ok(String::new())
}

fn nested_failure(template: &str, err: crate::TemplateError) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("failed to fetch {:?}", template),
    )
    .with_source(err)
}

fn write_failure(err: std::io::Error) -> Error {
    Error::new(ErrorKind::WriteFailure, "output capture failed").with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_raise_below_threshold_is_silent() {
        let path = PathBuf::from("page.j2");
        let out = raise(Severity::Notice, Severity::Warning, &path, "old syntax").unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_raise_at_threshold_fails() {
        let path = PathBuf::from("page.j2");
        let err = raise(Severity::Warning, Severity::Warning, &path, "bad input").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert!(err.to_string().contains("template warning: bad input"));

        assert!(raise(Severity::Deprecated, Severity::Deprecated, &path, "x").is_err());
    }

    #[test]
    fn test_default_threshold_lets_only_strict_and_notice_through() {
        let path = PathBuf::from("page.j2");
        let threshold = crate::EngineConfig::default().escalate_at;
        assert!(raise(Severity::Strict, threshold, &path, "style").is_ok());
        assert!(raise(Severity::Notice, threshold, &path, "minor").is_ok());
        assert!(raise(Severity::Deprecated, threshold, &path, "old api").is_err());
        assert!(raise(Severity::Warning, threshold, &path, "bad input").is_err());
    }
}
