// Prompt templates for provider interactions
//
// This module contains all prompt templates used by the work pipeline.
// Prompts are versioned so diagnostic logs can be traced back to a template.

use std::collections::HashMap;

/// Prompt template structure
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub system: String,
    pub user_template: String,
}

impl PromptTemplate {
    /// `name@version`, used to tag trace output
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Render the user template with variables
    ///
    /// Placeholders look like `{{name}}`. Substitution is single-pass, so
    /// values that themselves contain braces are inserted verbatim, and
    /// placeholders without a value are left untouched.
    ///
    /// # Example
    /// ```
    /// use gameboard_api::agents::prompts::{vars, PromptTemplate};
    ///
    /// let template = PromptTemplate {
    ///     name: "greet".to_string(),
    ///     version: "1.0.0".to_string(),
    ///     system: String::new(),
    ///     user_template: "Hello {{who}}, {{unknown}}".to_string(),
    /// };
    ///
    /// assert_eq!(template.render(&vars(&[("who", "world")])), "Hello world, {{unknown}}");
    /// ```
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        substitute(&self.user_template, variables)
    }

    /// System text followed by the rendered user template
    pub fn prompt(&self, variables: &HashMap<String, String>) -> String {
        let user = self.render(variables);
        if self.system.is_empty() {
            user
        } else {
            format!("{}\n\n{}", substitute(&self.system, variables), user)
        }
    }
}

fn substitute(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match variables.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + end + 4]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds a variable map from string pairs
pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub mod library {
    use super::PromptTemplate;

    fn template(name: &str, system: &str, user_template: &str) -> PromptTemplate {
        PromptTemplate {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            system: system.to_string(),
            user_template: user_template.to_string(),
        }
    }

    pub fn task_analysis() -> PromptTemplate {
        template(
            "task_analysis",
            "You are an experienced software architect.",
            "Analyze this task before any code is written.\n\n\
             Task Title: {{title}}\n\
             Task Description: {{description}}\n\n\
             Cover:\n\
             1. The kind of project (web app, game, script, API, ...)\n\
             2. Key features and requirements\n\
             3. Technical components needed\n\
             4. How users interact with it\n\
             5. Possible enhancements",
        )
    }

    pub fn file_planning() -> PromptTemplate {
        template(
            "file_planning",
            "You are an experienced developer planning an implementation.",
            "Plan the files for this task.\n\n\
             Task Title: {{title}}\n\
             Task Description: {{description}}\n\n\
             Analysis: {{analysis}}\n\n\
             Answer in exactly this format:\n\n\
             ARCHITECTURE:\n\
             <short architecture description>\n\n\
             FILES:\n\
             1. name.ext - purpose\n\
             2. name.ext - purpose\n\n\
             Rules:\n\
             - one file per numbered line, always with an extension\n\
             - no introductory sentences inside the FILES section\n\
             - each entry is NUMBER. FILENAME.EXT - DESCRIPTION",
        )
    }

    pub fn filename_list() -> PromptTemplate {
        template(
            "filename_list",
            "",
            "For the task \"{{title}}: {{description}}\", reply with the filenames needed \
             (with extensions) as a comma-separated list, for example: \
             index.html, styles.css, script.js\n\
             Reply with the list and nothing else.",
        )
    }

    pub fn file_generation() -> PromptTemplate {
        template(
            "file_generation",
            "You are an experienced developer writing one {{extension}} file of a project.",
            "Task: {{title}}\n\
             Description: {{description}}\n\n\
             File to create: {{filename}}\n\
             Purpose: {{purpose}}\n\n\
             {{guidance}}\n\n\
             {{context}}\n\
             Requirements:\n\
             1. Complete, working content for {{filename}}\n\
             2. Consistent with the other project files\n\
             3. Correct relative paths when referencing other files\n\
             4. No placeholders or TODOs\n\n\
             Respond with the raw file content only: no markdown fences, no explanations.",
        )
    }

    pub fn file_recovery() -> PromptTemplate {
        template(
            "file_recovery",
            "",
            "Generate ONLY the content for file {{filename}} for a project that implements:\n\
             {{title}}: {{description}}\n\n\
             Return the raw file content with no explanations or markdown.",
        )
    }

    pub fn integration_validation() -> PromptTemplate {
        template(
            "integration_validation",
            "You are a QA engineer.",
            "Please validate the integration between the files of this project.\n\n\
             Task: {{title}}\n\
             Description: {{description}}\n\n\
             All project files:\n\
             {{file_list}}\n\n\
             Contents under review:\n\
             {{contents}}\n\
             Look for broken references or paths between files, missing functionality, \
             inconsistent naming and components that do not fit together.\n\
             Name the affected file for every issue.\n\
             If everything is consistent, answer \"No integration issues found.\"",
        )
    }

    pub fn integration_fix() -> PromptTemplate {
        template(
            "integration_fix",
            "",
            "Fix this file so the reported integration issues are resolved.\n\n\
             File: {{filename}}\n\n\
             Current content:\n\
             {{content}}\n\n\
             Reported issues:\n\
             {{issues}}\n\n\
             Return only the corrected file content.",
        )
    }

    pub fn readme() -> PromptTemplate {
        template(
            "readme",
            "",
            "Create a README.md for this project.\n\n\
             Project: {{title}}\n\
             Description: {{description}}\n\n\
             Files: {{files}}\n\n\
             Include an overview, features, setup, usage and a short description of each file, \
             as well-structured Markdown.",
        )
    }
}
