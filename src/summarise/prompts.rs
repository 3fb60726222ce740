//! Built-in prompt templates and directory overrides.

use std::path::Path;

use tracing::info;

use super::mode::SummaryMode;
use super::template::{PromptTemplate, TemplateError};

const PROSE_TEMPLATE: &str = include_str!("../../prompts/prompt_template.txt");
const BULLET_TEMPLATE: &str = include_str!("../../prompts/bullet_summary_template.txt");
const EXTRACTIVE_TEMPLATE: &str = include_str!("../../prompts/extractive_summary_template.txt");
const COMBINE_TEMPLATE: &str = include_str!("../../prompts/combine_template.txt");
const REFINE_TEMPLATE: &str = include_str!("../../prompts/refine_template.txt");

/// File name of the map-reduce combine template.
pub const COMBINE_FILE: &str = "combine_template.txt";
/// File name of the refine template.
pub const REFINE_FILE: &str = "refine_template.txt";

/// Every template the summariser needs.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    prose: PromptTemplate,
    bullet: PromptTemplate,
    extractive: PromptTemplate,
    combine: PromptTemplate,
    refine: PromptTemplate,
}

impl TemplateSet {
    /// Built-in templates.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_sources(
            PROSE_TEMPLATE,
            BULLET_TEMPLATE,
            EXTRACTIVE_TEMPLATE,
            COMBINE_TEMPLATE,
            REFINE_TEMPLATE,
        )
    }

    /// Built-ins, replaced by any template file present in `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let read = |file: &str, fallback: &'static str| -> Result<String, TemplateError> {
            let path = dir.join(file);
            if !path.exists() {
                return Ok(fallback.to_string());
            }
            info!("Using prompt template {}", path.display());
            std::fs::read_to_string(&path).map_err(|e| TemplateError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        };

        Self::from_sources(
            &read(SummaryMode::Prose.template_file(), PROSE_TEMPLATE)?,
            &read(SummaryMode::Bullet.template_file(), BULLET_TEMPLATE)?,
            &read(SummaryMode::Extractive.template_file(), EXTRACTIVE_TEMPLATE)?,
            &read(COMBINE_FILE, COMBINE_TEMPLATE)?,
            &read(REFINE_FILE, REFINE_TEMPLATE)?,
        )
    }

    fn from_sources(
        prose: &str,
        bullet: &str,
        extractive: &str,
        combine: &str,
        refine: &str,
    ) -> Result<Self, TemplateError> {
        let set = Self {
            prose: PromptTemplate::parse(prose)?,
            bullet: PromptTemplate::parse(bullet)?,
            extractive: PromptTemplate::parse(extractive)?,
            combine: PromptTemplate::parse(combine)?,
            refine: PromptTemplate::parse(refine)?,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        for mode in SummaryMode::ALL {
            require_variable(self.for_mode(mode), mode.template_file(), "content")?;
        }
        require_variable(&self.combine, COMBINE_FILE, "content")?;
        require_variable(&self.refine, REFINE_FILE, "content")?;
        require_variable(&self.refine, REFINE_FILE, "existing_summary")?;
        Ok(())
    }

    /// Template for a summary mode.
    pub fn for_mode(&self, mode: SummaryMode) -> &PromptTemplate {
        match mode {
            SummaryMode::Prose => &self.prose,
            SummaryMode::Bullet => &self.bullet,
            SummaryMode::Extractive => &self.extractive,
        }
    }

    /// Template that merges map-reduce partial summaries.
    pub fn combine(&self) -> &PromptTemplate {
        &self.combine
    }

    /// Template that folds a new chunk into an existing summary.
    pub fn refine(&self) -> &PromptTemplate {
        &self.refine
    }
}

fn require_variable(
    template: &PromptTemplate,
    file: &str,
    variable: &str,
) -> Result<(), TemplateError> {
    if template.uses(variable) {
        return Ok(());
    }
    if variable == "content" {
        Err(TemplateError::MissingContentVariable(file.to_string()))
    } else {
        Err(TemplateError::MissingVariable(format!("{} in {}", variable, file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_templates_are_valid() {
        let set = TemplateSet::builtin().unwrap();
        for mode in SummaryMode::ALL {
            assert!(set.for_mode(mode).uses("content"));
        }
        let combined = set.combine().render_content("a\nb").unwrap();
        assert!(combined.starts_with("Combine these summaries into one concise summary:\n\na\nb"));

        let vars = HashMap::from([("existing_summary", "old"), ("content", "new")]);
        let refined = set.refine().render(&vars).unwrap();
        assert!(refined.starts_with("Existing summary:\nold\n\nRefine it using this text:\nnew"));
    }

    #[test]
    fn test_directory_overrides_single_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bullet_summary_template.txt"), "BULLETS: {content}").unwrap();

        let set = TemplateSet::load(dir.path()).unwrap();
        assert_eq!(
            set.for_mode(SummaryMode::Bullet).render_content("x").unwrap(),
            "BULLETS: x"
        );
        // Others keep the built-in text
        assert_eq!(
            set.for_mode(SummaryMode::Prose),
            TemplateSet::builtin().unwrap().for_mode(SummaryMode::Prose)
        );
    }

    #[test]
    fn test_override_without_content_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("prompt_template.txt"), "Summarise please.").unwrap();

        let err = TemplateSet::load(dir.path()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingContentVariable("prompt_template.txt".to_string())
        );
    }
}
