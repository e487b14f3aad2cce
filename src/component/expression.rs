// src/component/expression.rs

//! Placeholder evaluation for component parameters.
//!
//! Supported placeholders (names are case-insensitive):
//! - `{Platform}`: current platform, e.g. `linux-x64`
//! - `{LogicalCoreCount}`: available parallelism
//! - `{PackagePath:<name>}`: directory of a registered package
//! - `{Secret:<name>}`: value from the secret store
//! - `{<Parameter>}`: another parameter of the same component

use regex::{Captures, Regex};

use super::services::Services;
use crate::config::model::{ParameterValue, Parameters};
use crate::errors::ComponentError;
use crate::types::{BoxFuture, ErrorReason};

const PLACEHOLDER_PATTERN: &str = r"\{([A-Za-z][A-Za-z0-9_]*)(?::([A-Za-z0-9_\-\. ]+))?\}";

pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate placeholders in every string parameter, in place.
    fn evaluate<'a>(
        &'a self,
        services: &'a Services,
        parameters: &'a mut Parameters,
    ) -> BoxFuture<'a, Result<(), ComponentError>>;
}

/// Default evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileExpressionEvaluator;

impl ExpressionEvaluator for ProfileExpressionEvaluator {
    fn evaluate<'a>(
        &'a self,
        services: &'a Services,
        parameters: &'a mut Parameters,
    ) -> BoxFuture<'a, Result<(), ComponentError>> {
        Box::pin(async move {
            let pattern = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| {
                ComponentError::dependency(ErrorReason::NotSupported, "invalid placeholder pattern")
                    .with_source(e)
            })?;

            // Resolve against the bag as declared so that parameter
            // references do not see partially evaluated values.
            let original = parameters.clone();
            for (key, value) in original.iter() {
                let Some(text) = value.as_str() else {
                    continue;
                };
                if !pattern.is_match(text) {
                    continue;
                }
                let evaluated = evaluate_text(&pattern, text, services, &original).await?;
                if evaluated != text {
                    parameters.insert(key.clone(), ParameterValue::String(evaluated));
                }
            }
            Ok(())
        })
    }
}

async fn evaluate_text(
    pattern: &Regex,
    text: &str,
    services: &Services,
    parameters: &Parameters,
) -> Result<String, ComponentError> {
    // Collect owned matches up front; resolution awaits.
    let matches: Vec<(String, String, Option<String>)> = pattern
        .captures_iter(text)
        .map(|c: Captures<'_>| {
            (
                c[0].to_string(),
                c[1].to_string(),
                c.get(2).map(|m| m.as_str().trim().to_string()),
            )
        })
        .collect();

    let mut result = text.to_string();
    for (placeholder, name, argument) in matches {
        if let Some(replacement) = resolve(&name, argument.as_deref(), services, parameters).await? {
            result = result.replace(&placeholder, &replacement);
        }
    }
    Ok(result)
}

async fn resolve(
    name: &str,
    argument: Option<&str>,
    services: &Services,
    parameters: &Parameters,
) -> Result<Option<String>, ComponentError> {
    match (name.to_ascii_lowercase().as_str(), argument) {
        ("platform", None) => Ok(Some(services.platform.to_string())),
        ("logicalcorecount", None) => {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            Ok(Some(cores.to_string()))
        }
        ("packagepath", Some(package)) => {
            let found = services.packages.get_package(package).await?;
            match found {
                Some(p) => Ok(Some(p.path.to_string_lossy().into_owned())),
                None => Err(ComponentError::dependency(
                    ErrorReason::DependencyNotFound,
                    format!("Package '{package}' referenced by '{{PackagePath:{package}}}' is not registered."),
                )),
            }
        }
        ("secret", Some(secret)) => services
            .secrets
            .get_secret(secret)
            .await
            .map(Some)
            .map_err(|e| {
                ComponentError::dependency(
                    ErrorReason::DependencyNotFound,
                    format!("Secret '{secret}' could not be resolved."),
                )
                .with_source(e)
            }),
        (_, None) => Ok(parameters
            .get(name)
            .filter(|v| v.as_str().is_none_or(|s| !s.contains('{')))
            .map(ToString::to_string)),
        _ => Ok(None),
    }
}
