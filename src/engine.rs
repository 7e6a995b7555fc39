use log::{debug, error};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::{self, CaptureWriter};
use crate::config::EngineConfig;
use crate::error::TemplateError;
use crate::{filters, runtime};

/// Name under which the whole variable mapping is exposed to templates.
pub const DATASET_NAME: &str = "_vars";

/// Name under which the resolved template path is exposed to templates.
pub const TEMPLATE_NAME: &str = "_template";

const RESERVED_NAMES: [&str; 2] = [DATASET_NAME, TEMPLATE_NAME];

/// TemplateEngine binds a set of named variables to template files found in
/// a base directory and renders them into strings.
///
/// Every render builds its own MiniJinja environment and output capture, so
/// nothing leaks from one render into the next.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    template_dir: Option<PathBuf>,
    template: Option<String>,
    /// Shared between clones until one of them assigns.
    variables: Arc<BTreeMap<String, Value>>,
    config: EngineConfig,
    depth: usize,
}

impl TemplateEngine {
    /// Creates an engine with no directory and no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine from a loaded configuration.
    ///
    /// The configured directory is validated like [`set_template_dir`] and the
    /// configured globals become the initial variables.
    ///
    /// [`set_template_dir`]: TemplateEngine::set_template_dir
    pub fn from_config(mut config: EngineConfig) -> Result<Self, TemplateError> {
        let template_dir = config.template_dir.take();
        let globals = std::mem::take(&mut config.globals);

        let mut engine = Self {
            config,
            ..Self::default()
        };
        if let Some(dir) = template_dir {
            engine.set_template_dir(dir)?;
        }
        engine.assign_all(globals)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assigns a single variable, replacing any previous value of that name.
    pub fn assign<V: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: V,
    ) -> Result<&mut Self, TemplateError> {
        let name = name.into();
        let value = serde_json::to_value(value).map_err(|e| {
            TemplateError::InvalidArgument(format!("Cannot assign {:?}: {}", name, e))
        })?;
        Arc::make_mut(&mut self.variables).insert(name, value);
        Ok(self)
    }

    /// Assigns every name-value pair of `vars`.
    pub fn assign_all<I, K, V>(&mut self, vars: I) -> Result<&mut Self, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        for (name, value) in vars {
            self.assign(name, value)?;
        }
        Ok(self)
    }

    /// Assigns the entries of any serializable map or sequence.
    ///
    /// Sequence entries are assigned under their index. Scalars and null are
    /// rejected.
    pub fn assign_dataset<T: Serialize>(&mut self, data: T) -> Result<&mut Self, TemplateError> {
        match serde_json::to_value(data) {
            Ok(Value::Object(map)) => Arc::make_mut(&mut self.variables).extend(map),
            Ok(Value::Array(items)) => Arc::make_mut(&mut self.variables).extend(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| (index.to_string(), value)),
            ),
            _ => {
                return Err(TemplateError::InvalidArgument(
                    "Dataset is not iterable".to_string(),
                ))
            }
        }
        Ok(self)
    }

    /// Returns an independent copy of this engine that renders `template` by
    /// default.
    pub fn create_template(&self, template: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.template = Some(template.into());
        child
    }

    /// Sets the base directory templates are resolved against.
    ///
    /// The previous directory is kept if `path` is empty or not an existing
    /// directory.
    pub fn set_template_dir(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, TemplateError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || !path.is_dir() {
            return Err(TemplateError::InvalidState(format!(
                "Templates path must be an existing directory: {:?}",
                path
            )));
        }
        let canonical = fs::canonicalize(path).map_err(|e| {
            TemplateError::InvalidState(format!("Cannot resolve templates path {:?}: {}", path, e))
        })?;
        debug!("Template directory set to {:?}", canonical);
        self.template_dir = Some(canonical);
        Ok(self)
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    /// The default template set by [`create_template`](TemplateEngine::create_template).
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn template_vars(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn template_var(&self, name: &str) -> Result<&Value, TemplateError> {
        self.variables
            .get(name)
            .ok_or_else(|| TemplateError::UndefinedKey(name.to_string()))
    }

    /// Rendered output is never cached.
    pub fn is_cached(&self) -> bool {
        false
    }

    pub fn get(&self, name: &str) -> Result<&Value, TemplateError> {
        self.template_var(name)
    }

    pub fn set<V: Serialize>(&mut self, name: impl Into<String>, value: V) -> Result<(), TemplateError> {
        self.assign(name, value).map(|_| ())
    }

    /// True if `name` is assigned and not null.
    pub fn is_set(&self, name: &str) -> bool {
        self.variables.get(name).is_some_and(|value| !value.is_null())
    }

    /// Renders `template`, or the default template when `None`, and returns
    /// the captured output.
    pub fn fetch<'a>(&self, template: impl Into<Option<&'a str>>) -> Result<String, TemplateError> {
        let template = template
            .into()
            .or(self.template.as_deref())
            .unwrap_or_default();
        if template.is_empty() {
            return Err(TemplateError::InvalidArgument(
                "No template file specified".to_string(),
            ));
        }
        self.render(template)
    }

    /// Renders like [`fetch`](TemplateEngine::fetch) and prints the result to stdout.
    pub fn display<'a>(&self, template: impl Into<Option<&'a str>>) -> Result<(), TemplateError> {
        self.display_to(io::stdout().lock(), template)
    }

    pub fn display_to<'a, W: Write>(
        &self,
        mut out: W,
        template: impl Into<Option<&'a str>>,
    ) -> Result<(), TemplateError> {
        let rendered = self.fetch(template)?;
        out.write_all(rendered.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| TemplateError::io("Failed to write rendered output", Some(e)))
    }

    /// Resolves `template` against the base directory.
    ///
    /// Paths are joined by plain concatenation; `..` segments are not
    /// normalized. A rooted path is used as-is only when no directory is set.
    pub fn resolve(&self, template: &str) -> PathBuf {
        let rooted = template.starts_with('/') || template.starts_with('\\');
        match &self.template_dir {
            None if rooted => PathBuf::from(template),
            None => PathBuf::from(format!("/{}", template)),
            Some(dir) => PathBuf::from(format!("{}/{}", dir.display(), template)),
        }
    }

    fn render(&self, template: &str) -> Result<String, TemplateError> {
        let path = self.resolve(template);
        self.protect(&path)
    }

    /// Renders the file at `path` in a fresh execution context and returns
    /// the text captured in the render's base scope.
    fn protect(&self, path: &Path) -> Result<String, TemplateError> {
        debug!("Rendering {:?} at depth {}", path, self.depth);
        let name = path.to_string_lossy().into_owned();
        let source = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read template file: {:?}", path);
            TemplateError::io(format!("Failed to read template file {:?}", path), Some(e))
        })?;
        let context = self.exposed_variables(&name);

        let capture = capture::shared(self.config.max_capture_depth);
        let baseline = capture::lock(&capture)
            .and_then(|mut stack| stack.push())
            .map_err(|e| TemplateError::io("Unable to start output capture", Some(e)))?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        filters::register(&mut env);
        runtime::register(&mut env, self, &capture, path);

        let rendered = env.template_from_named_str(&name, &source).and_then(|template| {
            template.render_to_write(&context, CaptureWriter::new(capture.clone()))?;
            Ok(())
        });
        drop(env);

        rendered.map_err(|source| TemplateError::Execution {
            path: path.to_path_buf(),
            source,
        })?;

        let mut stack = capture::lock(&capture)
            .map_err(|e| TemplateError::io("Output capture unavailable", Some(e)))?;
        if stack.depth() != baseline {
            if !stack.overflow().is_empty() {
                debug!(
                    "Discarding {} bytes written outside any capture scope",
                    stack.overflow().len()
                );
            }
            return Err(TemplateError::Logic(format!(
                "Invalid output buffer depth: expected {}, found {}",
                baseline,
                stack.depth()
            )));
        }
        Ok(stack.pop().unwrap_or_default())
    }

    /// Top-level names visible to the template. Variables named after a
    /// reserved name stay reachable through the dataset only.
    fn exposed_variables(&self, template_name: &str) -> BTreeMap<String, Value> {
        let mut exposed: BTreeMap<String, Value> = self
            .variables
            .iter()
            .filter(|(name, _)| !RESERVED_NAMES.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        exposed.insert(
            DATASET_NAME.to_string(),
            Value::Object(
                self.variables
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            ),
        );
        exposed.insert(
            TEMPLATE_NAME.to_string(),
            Value::String(template_name.to_string()),
        );
        exposed
    }

    /// Copy used by template-side `fetch`: same variables and directory, one
    /// level deeper, no default template.
    pub(crate) fn nested(&self) -> Self {
        let mut child = self.clone();
        child.template = None;
        child.depth += 1;
        child
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}
