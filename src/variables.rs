//! Variable resolution for template rendering.

use serde_json::{Map, Value};

use crate::identity::Identity;
use crate::template::Enricher;

/// Template variables.
pub type Variables = Map<String, Value>;

/// Base variables for password reset and verification emails.
///
/// `username` and `email` are `null` when the user record lacks them, which
/// renders as an empty string.
pub fn identity_variables(link: &str, app_name: &str, user: &dyn Identity) -> Variables {
    let mut vars = Variables::new();
    vars.insert("link".into(), Value::from(link));
    vars.insert("appName".into(), Value::from(app_name));
    vars.insert("username".into(), user.get("username").map_or(Value::Null, Value::from));
    vars.insert("email".into(), user.get("email").map_or(Value::Null, Value::from));
    vars
}

/// Resolve the variables for an identity-bound send.
///
/// The enricher's object is merged over the base map, so its keys win. A
/// result that is not an object is dropped with a warning.
pub async fn resolve_identity(
    template: &str,
    link: &str,
    app_name: &str,
    user: &dyn Identity,
    enricher: Option<&dyn Enricher>,
) -> Variables {
    let mut vars = identity_variables(link, app_name, user);

    let Some(enricher) = enricher else {
        return vars;
    };

    match enricher.enrich(user).await {
        Value::Object(extra) => {
            tracing::debug!(template, keys = extra.len(), "Merging enriched variables");
            vars.extend(extra);
        }
        Value::Null => {}
        other => {
            tracing::warn!(
                template,
                kind = value_kind(&other),
                "Enricher returned a non-object value; ignoring it"
            );
        }
    }

    vars
}

/// Resolve the variables for a direct send: exactly what the caller passed.
pub fn resolve_direct(variables: Option<&Variables>) -> Variables {
    variables.cloned().unwrap_or_default()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
