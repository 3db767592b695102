//! Prompt template substitution.
//!
//! Two placeholder families are recognized inside `{{ ... }}`:
//!
//! - `{{ inputs.<name> }}` — the run's input parameters, overlaid with the
//!   current step's own `with` parameters.
//! - `{{ steps.<id>.<field> }}` — a prior step's recorded output, visible
//!   only when the step is listed in `context_from`.
//!
//! A reference that cannot be resolved is an error, never an empty
//! substitution. Silent blanks mask configuration bugs.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::ParamValue;
use crate::workflow::context::StepOutput;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unresolved reference `{reference}`")]
    UnresolvedReference { reference: String },

    #[error("malformed placeholder `{placeholder}`")]
    MalformedPlaceholder { placeholder: String },
}

/// The names visible to one rendering: inputs plus the pre-filtered set of
/// step outputs this step may see.
#[derive(Debug)]
pub struct TemplateScope<'a> {
    pub inputs: &'a BTreeMap<String, ParamValue>,
    pub steps: BTreeMap<&'a str, &'a StepOutput>,
}

impl<'a> TemplateScope<'a> {
    pub fn new(inputs: &'a BTreeMap<String, ParamValue>) -> Self {
        Self {
            inputs,
            steps: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, id: &'a str, output: &'a StepOutput) -> Self {
        self.steps.insert(id, output);
        self
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder regex"))
}

/// Substitute every placeholder in `template` against `scope`.
pub fn render(template: &str, scope: &TemplateScope<'_>) -> Result<String, TemplateError> {
    let re = placeholder_re();
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in re.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 is the whole match");
        out.push_str(&template[last..whole.start()]);
        out.push_str(&resolve(&caps[1], whole.as_str(), scope)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn resolve(
    reference: &str,
    placeholder: &str,
    scope: &TemplateScope<'_>,
) -> Result<String, TemplateError> {
    if reference.is_empty() {
        return Err(TemplateError::MalformedPlaceholder {
            placeholder: placeholder.to_string(),
        });
    }
    let mut parts = reference.split('.');
    let family = parts.next().unwrap_or_default();

    match family {
        "inputs" => {
            let name = match (parts.next(), parts.next()) {
                (Some(name), None) if !name.is_empty() => name,
                _ => {
                    return Err(TemplateError::MalformedPlaceholder {
                        placeholder: placeholder.to_string(),
                    });
                }
            };
            scope
                .inputs
                .get(name)
                .map(ParamValue::as_text)
                .ok_or_else(|| TemplateError::UnresolvedReference {
                    reference: reference.to_string(),
                })
        }
        "steps" => {
            let (id, field) = match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(field), None) if !id.is_empty() && !field.is_empty() => (id, field),
                _ => {
                    return Err(TemplateError::MalformedPlaceholder {
                        placeholder: placeholder.to_string(),
                    });
                }
            };
            scope
                .steps
                .get(id)
                .and_then(|output| output.field(field))
                .map(str::to_string)
                .ok_or_else(|| TemplateError::UnresolvedReference {
                    reference: reference.to_string(),
                })
        }
        _ => Err(TemplateError::UnresolvedReference {
            reference: reference.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, ParamValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_renders_inputs() {
        let inputs = inputs(&[("prompt", "hello")]);
        let scope = TemplateScope::new(&inputs);
        assert_eq!(render("{{ inputs.prompt }}", &scope).unwrap(), "hello");
        assert_eq!(render("{{inputs.prompt}}!", &scope).unwrap(), "hello!");
    }

    #[test]
    fn test_renders_step_output() {
        let inputs = inputs(&[]);
        let output = StepOutput::new("hi");
        let scope = TemplateScope::new(&inputs).with_step("s1", &output);
        assert_eq!(
            render("{{ steps.s1.text }} world", &scope).unwrap(),
            "hi world"
        );
    }

    #[test]
    fn test_unknown_input_is_an_error() {
        let inputs = inputs(&[]);
        let scope = TemplateScope::new(&inputs);
        let err = render("{{ inputs.missing }}", &scope).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnresolvedReference {
                reference: "inputs.missing".to_string()
            }
        );
    }

    #[test]
    fn test_step_outside_scope_is_an_error() {
        // The output exists, but is not in this step's visible set.
        let inputs = inputs(&[]);
        let scope = TemplateScope::new(&inputs);
        assert!(matches!(
            render("{{ steps.b.text }}", &scope),
            Err(TemplateError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let inputs = inputs(&[]);
        let output = StepOutput::new("hi");
        let scope = TemplateScope::new(&inputs).with_step("s1", &output);
        assert!(matches!(
            render("{{ steps.s1.tokens }}", &scope),
            Err(TemplateError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_unknown_family_is_an_error() {
        let inputs = inputs(&[]);
        let scope = TemplateScope::new(&inputs);
        assert!(matches!(
            render("{{ vars.x }}", &scope),
            Err(TemplateError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_malformed_placeholders() {
        let inputs = inputs(&[("prompt", "p")]);
        let scope = TemplateScope::new(&inputs);
        for template in ["{{ inputs }}", "{{ inputs.a.b }}", "{{ steps.s1 }}", "{{ }}"] {
            assert!(matches!(
                render(template, &scope),
                Err(TemplateError::MalformedPlaceholder { .. })
            ));
        }
    }

    #[test]
    fn test_text_without_placeholders_passes_through() {
        let inputs = inputs(&[]);
        let scope = TemplateScope::new(&inputs);
        assert_eq!(render("plain text", &scope).unwrap(), "plain text");
    }

    #[test]
    fn test_multiple_placeholders_in_one_template() {
        let inputs = inputs(&[("a", "1"), ("b", "2")]);
        let scope = TemplateScope::new(&inputs);
        assert_eq!(
            render("{{ inputs.a }}+{{ inputs.b }}", &scope).unwrap(),
            "1+2"
        );
    }
}
