//! Prompt assembly for the code generation request
//!
//! The main prompt comes from an external template with four placeholders.
//! Every placeholder is always replaced: optional ingredients that are
//! missing get a fixed "not provided" sentence so the template prose still
//! reads correctly.

use std::path::{Path, PathBuf};

use generation::ContextStrategy;

use crate::constants::reference::LANGUAGE;
use crate::reference_files::ReferenceFile;

pub const NODE_JSON_PLACEHOLDER: &str = "{node_json}";
pub const IMAGE_SECTION_PLACEHOLDER: &str = "{image_section}";
pub const REFERENCE_SECTION_PLACEHOLDER: &str = "{reference_code_section}";
pub const INSTRUCTIONS_SECTION_PLACEHOLDER: &str = "{instructions_section}";

const IMAGE_INTRO: &str = "If SVG data is provided, it represents the vector graphics of the node. \
This is crucial for accurately rendering icons, complex shapes, and graphical elements.";
const IMAGE_ABSENT: &str = "(No SVG content was provided for this node).";

const REFERENCE_INTRO: &str = "Reference code from the existing project defines colors, typography \
and utilities that MUST be reused instead of redefined.";
const REFERENCE_PRIMED: &str = "Remember to use the custom Kotlin code context (colors, typography, \
utilities) I've already given you in our conversation.";
const REFERENCE_ABSENT: &str = "(No reference code files were provided).";

const INSTRUCTIONS_INTRO: &str = "Any additional instructions provided in this section are specific \
overrides or clarifications for the current generation task and must be followed with precision.";
const INSTRUCTIONS_ABSENT: &str = "(No additional user instructions were provided).";

const PRIMING_INTRO: &str = "You are an expert Android Jetpack Compose developer. I will provide you \
with several Kotlin files from my existing project. Please understand and remember these as context \
for a code generation task that will follow. You MUST prioritize using definitions (colors, \
typography, utilities, etc.) from these files when I later ask you to generate code. Do not \
redefine them if suitable ones exist in this provided context.\n\nHere is the custom code:\n";
const PRIMING_OUTRO: &str = "\nPlease acknowledge that you have received and will prioritize this \
custom code context for the subsequent generation task.";

/// Errors loading the prompt template
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Could not load prompt template from '{path}': {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Concatenate reference files in order, each framed by its file name
pub fn format_reference_files(files: &[ReferenceFile]) -> String {
    files
        .iter()
        .map(|file| {
            format!(
                "--- Start of content from '{name}' ---\n```{lang}\n{content}\n```\n--- End of content from '{name}' ---\n",
                name = file.filename,
                lang = LANGUAGE,
                content = file.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The single priming message carrying all reference files
pub fn priming_message(files: &[ReferenceFile]) -> String {
    format!(
        "{}\n{}{}",
        PRIMING_INTRO,
        format_reference_files(files),
        PRIMING_OUTRO
    )
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Image section: fenced SVG or the "not provided" sentence
pub fn image_section(svg: Option<&str>) -> String {
    match present(svg) {
        Some(svg) => format!("{}\n\nFigma Node SVG Content:\n```svg\n{}\n```", IMAGE_INTRO, svg),
        None => format!("{}\n\n{}", IMAGE_INTRO, IMAGE_ABSENT),
    }
}

/// Reference-code section for the given strategy
pub fn reference_section(files: &[ReferenceFile], strategy: ContextStrategy) -> String {
    if files.is_empty() {
        return format!("{}\n\n{}", REFERENCE_INTRO, REFERENCE_ABSENT);
    }
    match strategy {
        ContextStrategy::Primed => REFERENCE_PRIMED.to_string(),
        ContextStrategy::Inline => format!(
            "{}\n\nReference Code:\n{}",
            REFERENCE_INTRO,
            format_reference_files(files)
        ),
    }
}

/// Additional-instructions section: fenced text or the "not provided" sentence
pub fn instructions_section(instructions: Option<&str>) -> String {
    match present(instructions) {
        Some(text) => format!(
            "{}\n\nAdditional User Instructions:\n```text\n{}\n```",
            INSTRUCTIONS_INTRO, text
        ),
        None => format!("{}\n\n{}", INSTRUCTIONS_INTRO, INSTRUCTIONS_ABSENT),
    }
}

/// Fills the main prompt template
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
    strategy: ContextStrategy,
}

impl PromptAssembler {
    pub fn new(template: impl Into<String>, strategy: ContextStrategy) -> Self {
        Self {
            template: template.into(),
            strategy,
        }
    }

    /// Read the template from disk
    pub async fn load(path: &Path, strategy: ContextStrategy) -> Result<Self, PromptError> {
        let template = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PromptError::Template {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Loaded prompt template from {}", path.display());
        Ok(Self::new(template, strategy))
    }

    /// Build the main generation prompt
    pub fn assemble(
        &self,
        node_json: &str,
        svg: Option<&str>,
        files: &[ReferenceFile],
        instructions: Option<&str>,
    ) -> String {
        let image = image_section(svg);
        let reference = reference_section(files, self.strategy);
        let extra = instructions_section(instructions);

        fill_placeholders(
            &self.template,
            &[
                (NODE_JSON_PLACEHOLDER, node_json),
                (IMAGE_SECTION_PLACEHOLDER, &image),
                (REFERENCE_SECTION_PLACEHOLDER, &reference),
                (INSTRUCTIONS_SECTION_PLACEHOLDER, &extra),
            ],
        )
    }
}

/// Single left-to-right pass; substituted text is never scanned again.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = values
            .iter()
            .filter_map(|(placeholder, value)| {
                rest.find(placeholder).map(|at| (at, *placeholder, *value))
            })
            .min_by_key(|(at, _, _)| *at);

        match next {
            Some((at, placeholder, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + placeholder.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
