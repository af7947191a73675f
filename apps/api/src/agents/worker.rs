use std::sync::Arc;

use super::errors::{AgentError, AgentResult};
use super::planning::{
    default_files, extension_of, extract_with, files_section, is_generatable, order_files,
    planning_ladder, CommaList, PlanSource, PlanStrategy, PlannedFile,
};
use super::prompts::{library, vars, PromptTemplate};
use super::provider::{ProviderError, ProviderGateway};
use super::retry::RetryPolicy;
use super::types::{ArtifactSet, PipelineReport, WorkOrder};
use crate::domain::repositories::ArtifactStore;

const SAME_EXTENSION_CONTEXT: usize = 3;
const MAX_CONTEXT_FILES: usize = 5;
const MAX_VALIDATION_FILES: usize = 5;
const NO_ISSUES_MARKER: &str = "no integration issues found";

/// Multi-stage generation pipeline run by a producer
///
/// analyze → plan → order → generate → validate/fix → summarize
///
/// Provider failures are absorbed by per-stage fallbacks and written to the
/// agent's diagnostic log. Only a missing provider configuration or a storage
/// failure aborts the run.
pub struct WorkPipeline {
    gateway: Arc<dyn ProviderGateway>,
    artifacts: Arc<dyn ArtifactStore>,
    retry: RetryPolicy,
}

impl WorkPipeline {
    /// Creates a new work pipeline
    ///
    /// # Arguments
    /// * `gateway` - Text-generation backend
    /// * `artifacts` - Where produced files and diagnostics are written
    /// * `retry` - Policy wrapped around every provider call
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        artifacts: Arc<dyn ArtifactStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            artifacts,
            retry,
        }
    }

    /// Runs every stage for `order` and returns the produced artifacts
    ///
    /// # Returns
    /// The artifact set (possibly empty) and a report, or a fatal error.
    pub async fn run(&self, order: &WorkOrder) -> AgentResult<(ArtifactSet, PipelineReport)> {
        let agent_id = order.agent_id.as_str();
        tracing::info!(agent_id, block_id = %order.block_id, "Starting work pipeline");

        let analysis = self.analyze(order).await?;
        let (planned, plan_source) = self.plan(order, &analysis).await?;
        let planned = order_files(planned);
        tracing::info!(
            agent_id,
            source = %plan_source,
            files = ?planned.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            "Planned files"
        );

        self.artifacts
            .clear(&order.agent_id)
            .await
            .map_err(AgentError::Store)?;

        let mut report = PipelineReport {
            plan_source,
            planned: planned.iter().map(|f| f.name.clone()).collect(),
            produced: Vec::new(),
            skipped: Vec::new(),
            fixed: Vec::new(),
            readme_generated: false,
        };

        let mut set = ArtifactSet::new();
        for file in &planned {
            if !is_generatable(&file.name) {
                tracing::warn!(agent_id, file = %file.name, "Skipping file with invalid name");
                report.skipped.push(file.name.clone());
                continue;
            }
            match self.generate_file(order, file, &set).await? {
                Some(content) => {
                    self.persist(order, &file.name, &content).await?;
                    set.insert(file.name.clone(), content);
                }
                None => report.skipped.push(file.name.clone()),
            }
        }

        if set.len() >= 2 {
            report.fixed = self.validate_and_fix(order, &mut set).await?;
        }

        let has_readme = set
            .names()
            .any(|name| name.to_ascii_uppercase().starts_with("README"));
        if !has_readme && !set.is_empty() {
            report.readme_generated = self.summarize(order, &mut set).await?;
        }

        if set.is_empty() {
            tracing::warn!(agent_id, "Work pipeline produced no artifacts");
        }

        report.produced = set.names().map(str::to_string).collect();
        tracing::info!(agent_id, produced = report.produced.len(), "Work pipeline finished");

        Ok((set, report))
    }

    /// One provider call under the retry policy
    ///
    /// A missing provider configuration becomes `ConfigError`; an empty
    /// answer counts as a failed call.
    async fn call(&self, order: &WorkOrder, stage: &str, prompt: &str) -> AgentResult<String> {
        let provider = order.provider.provider_type;
        let model = order.provider.model_name.as_deref();

        let result = self
            .retry
            .call(stage, || self.gateway.generate(provider, prompt, model))
            .await;

        match result {
            Ok(text) if text.trim().is_empty() => Err(AgentError::Provider(ProviderError::Permanent(
                "empty response".to_string(),
            ))),
            Ok(text) => Ok(text),
            Err(ProviderError::NotConfigured(message)) => Err(AgentError::ConfigError(message)),
            Err(e) => Err(e.into()),
        }
    }

    /// Calls the provider; fatal errors propagate, others are logged and yield `None`
    async fn attempt(&self, order: &WorkOrder, stage: &str, prompt: &str) -> AgentResult<Option<String>> {
        match self.call(order, stage, prompt).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(agent_id = %order.agent_id, stage, error = %e, "Stage call failed");
                self.log_failure(order, stage, &e, prompt).await;
                Ok(None)
            }
        }
    }

    async fn log_failure(&self, order: &WorkOrder, stage: &str, error: &AgentError, prompt: &str) {
        let entry = format!("Error: {}\nPrompt:\n{}\n", error, prompt);
        if let Err(e) = self.artifacts.write_log(&order.agent_id, stage, &entry).await {
            tracing::warn!(agent_id = %order.agent_id, stage, error = %e, "Failed to write diagnostic log");
        }
    }

    async fn persist(&self, order: &WorkOrder, name: &str, content: &str) -> AgentResult<()> {
        self.artifacts
            .write(&order.agent_id, name, content)
            .await
            .map_err(AgentError::Store)
    }

    fn task_vars(order: &WorkOrder) -> Vec<(&str, &str)> {
        vec![
            ("title", order.task.title.as_str()),
            ("description", order.task.description.as_str()),
        ]
    }

    fn render(template: PromptTemplate, order: &WorkOrder, extra: &[(&str, &str)]) -> String {
        let mut pairs = Self::task_vars(order);
        pairs.extend_from_slice(extra);
        tracing::debug!(agent_id = %order.agent_id, template = %template.id(), "Rendering prompt");
        template.prompt(&vars(&pairs))
    }

    async fn analyze(&self, order: &WorkOrder) -> AgentResult<String> {
        let prompt = Self::render(library::task_analysis(), order, &[]);
        let analysis = self.attempt(order, "analysis", &prompt).await?;

        Ok(analysis.unwrap_or_else(|| {
            format!(
                "Implementation for: {}. Requirements: {}",
                order.task.title, order.task.description
            )
        }))
    }

    async fn plan(&self, order: &WorkOrder, analysis: &str) -> AgentResult<(Vec<PlannedFile>, PlanSource)> {
        let agent_id = order.agent_id.as_str();
        let prompt = Self::render(library::file_planning(), order, &[("analysis", analysis)]);

        if let Some(response) = self.attempt(order, "planning", &prompt).await? {
            if let Some(plan) = extract_with(&planning_ladder(), &files_section(&response)) {
                return Ok(plan);
            }
            tracing::warn!(agent_id, "Planning answer held no filenames, asking for a plain list");
            self.log_failure(
                order,
                "planning_parse",
                &AgentError::ParseError("no filenames in planning answer".to_string()),
                &response,
            )
            .await;
        }

        let prompt = Self::render(library::filename_list(), order, &[]);
        if let Some(response) = self.attempt(order, "filename_list", &prompt).await? {
            match CommaList.extract(&response) {
                Ok(files) => return Ok((files, CommaList.source())),
                Err(e) => {
                    tracing::warn!(agent_id, error = %e, "Filename list held no filenames");
                }
            }
        }

        tracing::warn!(agent_id, "All plan strategies failed, using default files");
        Ok((
            default_files(&order.task.title, &order.task.description),
            PlanSource::Defaults,
        ))
    }

    async fn generate_file(
        &self,
        order: &WorkOrder,
        file: &PlannedFile,
        done: &ArtifactSet,
    ) -> AgentResult<Option<String>> {
        let extension = file.extension();
        let context = render_context(&select_context(done, &extension));
        let prompt = Self::render(
            library::file_generation(),
            order,
            &[
                ("extension", extension.as_str()),
                ("filename", file.name.as_str()),
                ("purpose", file.purpose.as_str()),
                ("guidance", guidance_for(&extension)),
                ("context", context.as_str()),
            ],
        );

        let stage = format!("generation_{}", file.name);
        if let Some(content) = self.attempt(order, &stage, &prompt).await? {
            let content = strip_code_fences(&content);
            if !content.trim().is_empty() {
                tracing::info!(agent_id = %order.agent_id, file = %file.name, "Generated file");
                return Ok(Some(content));
            }
        }

        tracing::info!(agent_id = %order.agent_id, file = %file.name, "Trying recovery prompt");
        let prompt = Self::render(library::file_recovery(), order, &[("filename", file.name.as_str())]);
        let stage = format!("recovery_{}", file.name);
        if let Some(content) = self.attempt(order, &stage, &prompt).await? {
            let content = strip_code_fences(&content);
            if !content.trim().is_empty() {
                return Ok(Some(content));
            }
        }

        tracing::warn!(agent_id = %order.agent_id, file = %file.name, "Giving up on file");
        Ok(None)
    }

    async fn validate_and_fix(&self, order: &WorkOrder, set: &mut ArtifactSet) -> AgentResult<Vec<String>> {
        let sample = validation_sample(set);
        let contents: String = sample
            .iter()
            .map(|(name, content)| format!("--- {} ---\n{}\n\n", name, content))
            .collect();
        let file_list = set
            .names()
            .map(|name| format!("- {}", name))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = Self::render(
            library::integration_validation(),
            order,
            &[("file_list", file_list.as_str()), ("contents", contents.as_str())],
        );

        let Some(issues) = self.attempt(order, "validation", &prompt).await? else {
            return Ok(Vec::new());
        };
        if issues.to_lowercase().contains(NO_ISSUES_MARKER) {
            tracing::info!(agent_id = %order.agent_id, "No integration issues reported");
            return Ok(Vec::new());
        }

        let to_fix: Vec<String> = set
            .names()
            .filter(|name| issues.contains(name))
            .map(str::to_string)
            .collect();

        let mut fixed = Vec::new();
        for name in to_fix {
            let current = set.get(&name).unwrap_or_default().to_string();
            let prompt = Self::render(
                library::integration_fix(),
                order,
                &[
                    ("filename", name.as_str()),
                    ("content", current.as_str()),
                    ("issues", issues.as_str()),
                ],
            );
            let stage = format!("fix_{}", name);
            let Some(content) = self.attempt(order, &stage, &prompt).await? else {
                continue;
            };
            let content = strip_code_fences(&content);
            if content.trim().is_empty() {
                continue;
            }
            self.persist(order, &name, &content).await?;
            set.insert(name.clone(), content);
            tracing::info!(agent_id = %order.agent_id, file = %name, "Applied integration fix");
            fixed.push(name);
        }

        Ok(fixed)
    }

    async fn summarize(&self, order: &WorkOrder, set: &mut ArtifactSet) -> AgentResult<bool> {
        let files = set.names().collect::<Vec<_>>().join(", ");
        let prompt = Self::render(library::readme(), order, &[("files", files.as_str())]);

        match self.attempt(order, "readme", &prompt).await? {
            Some(content) => {
                self.persist(order, "README.md", &content).await?;
                set.insert("README.md", content);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Earlier files shown to the provider while generating a file with `extension`
///
/// Up to three files sharing the extension, then markup for scripts and
/// styles (or scripts and styles for markup), five at most.
pub fn select_context<'a>(done: &'a ArtifactSet, extension: &str) -> Vec<(&'a str, &'a str)> {
    let mut picked: Vec<(&str, &str)> = Vec::new();

    for (name, content) in done.iter() {
        if picked.len() >= SAME_EXTENSION_CONTEXT {
            break;
        }
        if extension_of(name) == extension {
            picked.push((name, content));
        }
    }

    let companion: &[&str] = match extension {
        ".js" | ".css" => &[".html", ".htm"],
        ".html" | ".htm" => &[".js", ".css"],
        _ => &[],
    };
    for (name, content) in done.iter() {
        if picked.len() >= MAX_CONTEXT_FILES {
            break;
        }
        let ext = extension_of(name);
        let matches = companion.iter().any(|c| *c == ext);
        if matches && !picked.iter().any(|(n, _)| *n == name) {
            picked.push((name, content));
        }
    }

    picked
}

fn render_context(files: &[(&str, &str)]) -> String {
    if files.is_empty() {
        return String::new();
    }
    let mut out = String::from("Existing project files for context:\n\n");
    for (name, content) in files {
        out.push_str(&format!("--- BEGIN {name} ---\n{content}\n--- END {name} ---\n\n"));
    }
    out
}

/// Files shown to the validator: web files first, then entry points, five at most
pub fn validation_sample(set: &ArtifactSet) -> Vec<(&str, &str)> {
    let mut sample: Vec<(&str, &str)> = Vec::new();

    for ext in [".html", ".htm", ".js", ".css"] {
        for (name, content) in set.iter() {
            if sample.len() < MAX_VALIDATION_FILES
                && name.to_lowercase().ends_with(ext)
                && !sample.iter().any(|(n, _)| *n == name)
            {
                sample.push((name, content));
            }
        }
    }

    if sample.len() < 3 {
        for pattern in ["main", "index", "app"] {
            for (name, content) in set.iter() {
                if sample.len() < MAX_VALIDATION_FILES
                    && name.to_lowercase().contains(pattern)
                    && !sample.iter().any(|(n, _)| *n == name)
                {
                    sample.push((name, content));
                }
            }
        }
    }

    sample
}

/// Extension-specific instructions for the generation prompt
pub fn guidance_for(extension: &str) -> &'static str {
    match extension {
        ".html" | ".htm" => {
            "HTML guidelines:\n\
             - Full document with DOCTYPE, html, head and body\n\
             - Viewport meta tag for responsive layout\n\
             - Link stylesheets and scripts with correct relative paths\n\
             - Prefer semantic HTML5 elements"
        }
        ".css" => {
            "CSS guidelines:\n\
             - Responsive rules with media queries\n\
             - Consistent class naming, grouped by component\n\
             - Hover and active states where they make sense"
        }
        ".js" | ".jsx" | ".ts" | ".tsx" => {
            "JavaScript guidelines:\n\
             - Modern syntax and proper event handling\n\
             - Selectors that match the markup\n\
             - Handle errors and validate input where needed"
        }
        ".py" => {
            "Python guidelines:\n\
             - PEP 8 style with the imports it needs\n\
             - Docstrings on public functions\n\
             - Handle exceptions instead of crashing"
        }
        _ => "",
    }
}

/// Removes a markdown code fence wrapped around the whole answer
///
/// # Example
/// ```
/// use gameboard_api::agents::worker::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```html\n<p>hi</p>\n```"), "<p>hi</p>");
/// assert_eq!(strip_code_fences("plain"), "plain");
/// ```
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text.to_string();
    }

    let Some(newline) = trimmed.find('\n') else {
        return trimmed.trim_matches('`').trim().to_string();
    };
    let body = &trimmed[newline + 1..];
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };

    body.trim_end_matches(['\n', '\r']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::types::TaskBrief;
    use crate::domain::agent::{AgentId, ProviderConfig};
    use crate::infrastructure::artifacts::MemoryArtifactStore;
    use crate::infrastructure::providers::{Reply, ScriptedGateway};

    fn order(title: &str, description: &str) -> WorkOrder {
        WorkOrder {
            agent_id: AgentId::from("agent_test01"),
            block_id: "block_1".to_string(),
            marker_id: Some("marker_1".to_string()),
            task: TaskBrief::new(title, description),
            provider: ProviderConfig::default(),
        }
    }

    fn pipeline(gateway: ScriptedGateway) -> (WorkPipeline, Arc<ScriptedGateway>, Arc<MemoryArtifactStore>) {
        let gateway = Arc::new(gateway);
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = WorkPipeline::new(gateway.clone(), store.clone(), RetryPolicy::immediate(3));
        (pipeline, gateway, store)
    }

    fn set(names: &[&str]) -> ArtifactSet {
        let mut set = ArtifactSet::new();
        for name in names {
            set.insert(*name, format!("content of {}", name));
        }
        set
    }

    #[test]
    fn fences_with_language_are_stripped() {
        assert_eq!(strip_code_fences("```js\nlet a = 1;\n```\n"), "let a = 1;");
        assert_eq!(strip_code_fences("```\nx\ny\n```"), "x\ny");
        assert_eq!(strip_code_fences("```python\nprint(1)"), "print(1)");
        assert_eq!(strip_code_fences("no fence ```here```"), "no fence ```here```");
    }

    #[test]
    fn context_prefers_same_extension_then_markup() {
        let done = set(&["a.js", "b.js", "c.js", "d.js", "index.html", "e.css"]);

        let picked: Vec<&str> = select_context(&done, ".js").iter().map(|(n, _)| *n).collect();

        assert_eq!(picked, vec!["a.js", "b.js", "c.js", "index.html"]);
    }

    #[test]
    fn context_for_markup_pulls_scripts_and_styles() {
        let done = set(&["styles.css", "app.js", "other.html", "x.py"]);

        let picked: Vec<&str> = select_context(&done, ".html").iter().map(|(n, _)| *n).collect();

        assert_eq!(picked, vec!["other.html", "styles.css", "app.js"]);
    }

    #[test]
    fn context_is_capped_at_five() {
        let done = set(&["a.css", "b.css", "c.css", "1.html", "2.html", "3.html"]);
        assert_eq!(select_context(&done, ".css").len(), 5);
    }

    #[test]
    fn validation_sample_prefers_web_files() {
        let done = set(&["main.py", "util.py", "index.html", "app.js", "style.css"]);

        let sample: Vec<&str> = validation_sample(&done).iter().map(|(n, _)| *n).collect();

        assert_eq!(sample, vec!["index.html", "app.js", "style.css"]);
    }

    #[test]
    fn validation_sample_adds_entry_points_when_short() {
        let done = set(&["util.py", "main.py", "app_config.py", "notes.txt"]);

        let sample: Vec<&str> = validation_sample(&done).iter().map(|(n, _)| *n).collect();

        assert_eq!(sample, vec!["main.py", "app_config.py"]);
    }

    #[test]
    fn guidance_covers_known_extensions() {
        assert!(guidance_for(".htm").starts_with("HTML"));
        assert!(guidance_for(".tsx").starts_with("JavaScript"));
        assert!(guidance_for(".py").starts_with("Python"));
        assert_eq!(guidance_for(".rs"), "");
    }

    #[tokio::test]
    async fn numbered_plan_generates_ordered_files() {
        let gateway = ScriptedGateway::new()
            .on("Analyze this task", Reply::text("A static page"))
            .on(
                "ARCHITECTURE:",
                Reply::text("ARCHITECTURE:\nstatic\nFILES:\n1. script.js - logic\n2. index.html - page\n"),
            )
            .on("File to create: index.html", Reply::text("```html\n<html></html>\n```"))
            .on("File to create: script.js", Reply::text("console.log('hi');"))
            .on("validate the integration", Reply::text("No integration issues found."))
            .on("Create a README.md", Reply::text("# Page"));
        let (pipeline, gateway, store) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Page", "A page")).await.unwrap();

        assert_eq!(report.plan_source, PlanSource::NumberedList);
        assert_eq!(report.planned, vec!["index.html", "script.js"]);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["index.html", "script.js", "README.md"]);
        assert_eq!(set.get("index.html"), Some("<html></html>"));
        assert!(report.readme_generated);
        assert!(report.fixed.is_empty());

        let stored = store.list(&AgentId::from("agent_test01")).await.unwrap();
        assert_eq!(stored, vec!["README.md", "index.html", "script.js"]);

        // script.js saw index.html as context
        let script_prompt = gateway
            .calls()
            .into_iter()
            .find(|c| c.prompt.contains("File to create: script.js"))
            .unwrap()
            .prompt;
        assert!(script_prompt.contains("--- BEGIN index.html ---"));
    }

    #[tokio::test]
    async fn loose_tokens_used_when_lines_are_not_numbered() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("You should write calc.py - the calculator"))
            .on("File to create: calc.py", Reply::text("print(1 + 1)"))
            .otherwise(Reply::text("# Readme"));
        let (pipeline, _, _) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Calc", "adds")).await.unwrap();

        assert_eq!(report.plan_source, PlanSource::DottedTokens);
        assert_eq!(set.get("calc.py"), Some("print(1 + 1)"));
    }

    #[tokio::test]
    async fn filename_list_used_when_planning_fails() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::Fail(ProviderError::Permanent("boom".to_string())))
            .on("comma-separated list", Reply::text("main.py, README.md"))
            .on("File to create: main.py", Reply::text("print('x')"))
            .on("File to create: README.md", Reply::text("# x"))
            .otherwise(Reply::text("No integration issues found"));
        let (pipeline, gateway, store) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Tool", "does things")).await.unwrap();

        assert_eq!(report.plan_source, PlanSource::FilenameList);
        assert_eq!(set.len(), 2);
        assert!(!report.readme_generated);
        assert_eq!(gateway.count("Create a README.md"), 0);

        let logs = store.logs(&AgentId::from("agent_test01")).await;
        assert!(logs.iter().any(|(name, body)| name == "planning" && body.contains("boom")));
    }

    #[tokio::test]
    async fn defaults_when_every_strategy_fails() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("I cannot help with that"))
            .on("comma-separated list", Reply::text("nothing here"))
            .on("File to create:", Reply::text("content"))
            .otherwise(Reply::text("No integration issues found."));
        let (pipeline, _, _) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Website", "landing")).await.unwrap();

        assert_eq!(report.plan_source, PlanSource::Defaults);
        assert_eq!(report.planned, vec!["index.html", "styles.css", "script.js"]);
        assert_eq!(set.len(), 4);
    }

    #[tokio::test]
    async fn failed_analysis_uses_fallback_text() {
        let gateway = ScriptedGateway::new()
            .on("Analyze this task", Reply::Fail(ProviderError::Permanent("down".to_string())))
            .on("ARCHITECTURE:", Reply::text("1. notes.txt - notes"))
            .on("File to create:", Reply::text("hello"))
            .otherwise(Reply::text("# Readme"));
        let (pipeline, gateway, _) = pipeline(gateway);

        pipeline.run(&order("Notes", "write notes")).await.unwrap();

        let planning = gateway
            .calls()
            .into_iter()
            .find(|c| c.prompt.contains("ARCHITECTURE:"))
            .unwrap();
        assert!(planning
            .prompt
            .contains("Implementation for: Notes. Requirements: write notes"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let gateway = ScriptedGateway::new()
            .on(
                "Analyze this task",
                Reply::FailTimes {
                    times: 2,
                    error: ProviderError::Transient("429".to_string()),
                    text: "analysis".to_string(),
                },
            )
            .on("ARCHITECTURE:", Reply::text("1. a.txt - a"))
            .otherwise(Reply::text("ok"));
        let (pipeline, gateway, store) = pipeline(gateway);

        pipeline.run(&order("A", "b")).await.unwrap();

        assert_eq!(gateway.count("Analyze this task"), 3);
        assert!(store.logs(&AgentId::from("agent_test01")).await.is_empty());
    }

    #[tokio::test]
    async fn recovery_prompt_after_failed_generation() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("1. main.py - entry"))
            .on("File to create: main.py", Reply::text("   "))
            .on("Generate ONLY the content for file main.py", Reply::text("print('recovered')"))
            .otherwise(Reply::text("# Readme"));
        let (pipeline, _, _) = pipeline(gateway);

        let (set, _) = pipeline.run(&order("Py", "script")).await.unwrap();

        assert_eq!(set.get("main.py"), Some("print('recovered')"));
    }

    #[tokio::test]
    async fn all_generation_failures_still_finish_empty() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("1. a.txt - a\n2. b.txt - b"))
            .on("Analyze this task", Reply::text("analysis"))
            .otherwise(Reply::Fail(ProviderError::Permanent("nope".to_string())));
        let (pipeline, gateway, _) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("A", "b")).await.unwrap();

        assert!(set.is_empty());
        assert_eq!(report.skipped, vec!["a.txt", "b.txt"]);
        assert_eq!(gateway.count("validate the integration"), 0);
        assert_eq!(gateway.count("Create a README.md"), 0);
    }

    #[tokio::test]
    async fn invalid_names_are_skipped() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("no idea"))
            .on("comma-separated list", Reply::text("good.txt, bad;name.txt"))
            .otherwise(Reply::text("x"));
        let (pipeline, gateway, _) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("A", "b")).await.unwrap();

        assert_eq!(report.plan_source, PlanSource::FilenameList);
        assert_eq!(report.skipped, vec!["bad;name.txt"]);
        assert!(set.contains("good.txt"));
        assert_eq!(gateway.count("File to create: bad"), 0);
    }

    #[tokio::test]
    async fn integration_issues_trigger_fixes() {
        let gateway = ScriptedGateway::new()
            .on("Fix this file", Reply::text("fixed script"))
            .on("ARCHITECTURE:", Reply::text("1. index.html - page\n2. app.js - logic"))
            .on("File to create: index.html", Reply::text("<html></html>"))
            .on("File to create: app.js", Reply::text("broken script"))
            .on("validate the integration", Reply::text("app.js references a missing element"))
            .otherwise(Reply::text("# Readme"));
        let (pipeline, gateway, store) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Page", "p")).await.unwrap();

        assert_eq!(report.fixed, vec!["app.js"]);
        assert_eq!(set.get("app.js"), Some("fixed script"));
        assert_eq!(set.get("index.html"), Some("<html></html>"));
        assert_eq!(gateway.count("Fix this file"), 1);
        assert_eq!(
            store.read(&AgentId::from("agent_test01"), "app.js").await.unwrap().as_deref(),
            Some("fixed script")
        );
    }

    #[tokio::test]
    async fn failed_fix_keeps_original() {
        let gateway = ScriptedGateway::new()
            .on("Fix this file", Reply::Fail(ProviderError::Permanent("no".to_string())))
            .on("ARCHITECTURE:", Reply::text("1. index.html - page\n2. app.js - logic"))
            .on("File to create: app.js", Reply::text("original"))
            .on("validate the integration", Reply::text("app.js is wrong"))
            .otherwise(Reply::text("<p></p>"));
        let (pipeline, _, _) = pipeline(gateway);

        let (set, report) = pipeline.run(&order("Page", "p")).await.unwrap();

        assert!(report.fixed.is_empty());
        assert_eq!(set.get("app.js"), Some("original"));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_fatal() {
        let gateway = ScriptedGateway::new()
            .otherwise(Reply::Fail(ProviderError::NotConfigured("no key".to_string())));
        let (pipeline, gateway, _) = pipeline(gateway);

        let err = pipeline.run(&order("A", "b")).await.unwrap_err();

        assert!(matches!(err, AgentError::ConfigError(_)));
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn previous_artifacts_are_cleared() {
        let gateway = ScriptedGateway::new()
            .on("ARCHITECTURE:", Reply::text("1. new.txt - n"))
            .otherwise(Reply::text("x"));
        let (pipeline, _, store) = pipeline(gateway);
        let id = AgentId::from("agent_test01");
        store.write(&id, "old.txt", "stale").await.unwrap();

        pipeline.run(&order("A", "b")).await.unwrap();

        let files = store.list(&id).await.unwrap();
        assert!(!files.contains(&"old.txt".to_string()));
        assert!(files.contains(&"new.txt".to_string()));
    }
}
