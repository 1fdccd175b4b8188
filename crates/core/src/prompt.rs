//! Prompt templates and the selectors that choose between them.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` render literal braces.
//! A [`ConditionalPromptSelector`] picks a template per backend: predicates
//! are evaluated in registration order and the first match wins.

use std::fmt;
use std::sync::Arc;

use crate::error::PromptError;
use crate::llm::Llm;
use crate::schema::Values;

/// A static prompt with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    partials: Values,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            partials: Values::new(),
        }
    }

    /// Pre-bind a variable; call-time values with the same name override it.
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance, partials included.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        let _ = self.render(&mut |name| {
            if !names.iter().any(|n: &String| n == name) {
                names.push(name.to_string());
            }
            Some(String::new())
        });
        names
    }

    /// Render with `values`, falling back to the partials.
    pub fn format(&self, values: &Values) -> Result<String, PromptError> {
        self.render(&mut |name| {
            values
                .get(name)
                .or_else(|| self.partials.get(name))
                .cloned()
        })
    }

    fn render(
        &self,
        lookup: &mut dyn FnMut(&str) -> Option<String>,
    ) -> Result<String, PromptError> {
        let src = self.template.as_str();
        let mut out = String::with_capacity(src.len());
        let mut rest = src;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
            } else {
                let offset = src.len() - tail.len();
                let close = tail
                    .find('}')
                    .ok_or(PromptError::UnclosedPlaceholder(offset))?;
                let name = tail[1..close].trim();
                let value =
                    lookup(name).ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
                out.push_str(&value);
                rest = &tail[close + 1..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Chooses a prompt depending on the backend in use.
pub trait PromptSelector: Send + Sync {
    fn get_prompt(&self, llm: &dyn Llm) -> &PromptTemplate;
}

/// A predicate over the active backend.
pub type Condition = Arc<dyn Fn(&dyn Llm) -> bool + Send + Sync>;

/// Selects the first prompt whose condition holds, or the default.
#[derive(Clone)]
pub struct ConditionalPromptSelector {
    default: PromptTemplate,
    conditionals: Vec<(Condition, PromptTemplate)>,
}

impl ConditionalPromptSelector {
    pub fn new(default: PromptTemplate) -> Self {
        Self {
            default,
            conditionals: Vec::new(),
        }
    }

    /// Register `prompt` for backends matching `condition`.
    pub fn when(
        mut self,
        condition: impl Fn(&dyn Llm) -> bool + Send + Sync + 'static,
        prompt: PromptTemplate,
    ) -> Self {
        self.conditionals.push((Arc::new(condition), prompt));
        self
    }

    pub fn default_prompt(&self) -> &PromptTemplate {
        &self.default
    }
}

impl PromptSelector for ConditionalPromptSelector {
    fn get_prompt(&self, llm: &dyn Llm) -> &PromptTemplate {
        self.conditionals
            .iter()
            .find(|(condition, _)| condition(llm))
            .map(|(_, prompt)| prompt)
            .unwrap_or(&self.default)
    }
}

impl fmt::Debug for ConditionalPromptSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalPromptSelector")
            .field("default", &self.default)
            .field("conditionals", &self.conditionals.len())
            .finish()
    }
}

/// Matches chat-protocol backends.
pub fn is_chat_model(llm: &dyn Llm) -> bool {
    llm.is_chat()
}

/// Builds a predicate matching backends whose model name contains `needle`.
pub fn model_name_contains(needle: &'static str) -> impl Fn(&dyn Llm) -> bool + Send + Sync {
    move |llm| llm.model().contains(needle)
}
