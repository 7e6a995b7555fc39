use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use minijinja::Environment;
use uuid::Uuid;

/// Namespace name for deterministic (v5) UUIDs.
const UUID_NAMESPACE_NAME: &str = "tmplet.templates";

/// Registers the case-conversion filters and the `uuid_generate` helper.
pub fn register(env: &mut Environment<'_>) {
    env.add_filter("camelcase", camelcase);
    env.add_filter("pascalcase", pascalcase);
    env.add_filter("snakecase", snakecase);
    env.add_filter("kebabcase", kebabcase);
    env.add_filter("screamingsnakecase", screamingsnakecase);
    env.add_filter("uuid_generate", uuid_generate);
    env.add_function("uuid_generate", uuid_generate);
}

pub fn camelcase(s: String) -> String {
    s.to_lower_camel_case()
}

pub fn pascalcase(s: String) -> String {
    s.to_pascal_case()
}

pub fn snakecase(s: String) -> String {
    s.to_snake_case()
}

pub fn kebabcase(s: String) -> String {
    s.to_kebab_case()
}

pub fn screamingsnakecase(s: String) -> String {
    s.to_shouty_snake_case()
}

/// Deterministic v5 UUID for a non-empty seed, random v4 otherwise.
pub fn uuid_generate(seed: Option<String>) -> String {
    let namespace = Uuid::new_v5(&Uuid::NAMESPACE_DNS, UUID_NAMESPACE_NAME.as_bytes());
    match seed {
        Some(s) if !s.is_empty() => Uuid::new_v5(&namespace, s.as_bytes()).to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}
