//! Minimal LaTeX to markdown import.
//!
//! Regex substitutions only; anything not listed below passes through.

use once_cell::sync::Lazy;
use regex::Regex;

static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\\section\{(.*?)\}", "# $1"),
        (r"\\subsection\{(.*?)\}", "## $1"),
        (r"\\subsubsection\{(.*?)\}", "### $1"),
        (r"\\textbf\{(.*?)\}", "**$1**"),
        (r"\\textit\{(.*?)\}", "*$1*"),
        (r"(?s)\\begin\{abstract\}(.*?)\\end\{abstract\}", "> $1"),
        (
            r"\\begin\{document\}|\\end\{document\}|\\maketitle|\\tableofcontents",
            "",
        ),
        (r"\\documentclass\{.*?\}|\\usepackage\{.*?\}", ""),
        (r"\\title\{(.*?)\}", "# $1"),
        (r"\\author\{(.*?)\}", "*Author: $1*"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid latex rule"), replacement))
    .collect()
});

/// File name used for imported documents inside a project.
pub const IMPORTED_FILE_NAME: &str = "main_imported.md";

/// Converts the common LaTeX structure commands to markdown.
pub fn latex_to_markdown(source: &str) -> String {
    RULES
        .iter()
        .fold(source.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}
