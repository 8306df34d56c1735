//! Rendering a [`FinalDocument`] as Markdown, LaTeX or HTML.
//!
//! Rendering only produces text; writing it anywhere is the caller's business. The
//! Markdown and HTML renderings append a metadata block (generation time, topic, word
//! count, roles used and, when supplied, the quality metrics). The HTML and LaTeX
//! renderings parse the document with `pulldown-cmark` and leave out its header block.
//!
//! # Example
//!
//! ```
//! use essayforge::output::OutputFormat;
//!
//! let format: OutputFormat = "tex".parse().unwrap();
//! assert_eq!(format, OutputFormat::Latex);
//! assert_eq!(format.extension(), "tex");
//! assert!("pdf".parse::<OutputFormat>().is_err());
//! ```

use crate::quality::QualityMetrics;
use crate::synthesis::FinalDocument;
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

/// Supported renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Latex,
    Html,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Latex => "tex",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Latex => "latex",
            OutputFormat::Html => "html",
        };
        f.write_str(name)
    }
}

/// An unrecognised format name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormatError(pub String);

impl fmt::Display for OutputFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported output format: {} (expected markdown, latex or html)",
            self.0
        )
    }
}

impl Error for OutputFormatError {}

impl FromStr for OutputFormat {
    type Err = OutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "latex" | "tex" => Ok(OutputFormat::Latex),
            "html" => Ok(OutputFormat::Html),
            _ => Err(OutputFormatError(s.to_string())),
        }
    }
}

/// Render `document` in `format`.
pub fn render(
    document: &FinalDocument,
    quality: Option<&QualityMetrics>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Markdown => render_markdown(document, quality),
        OutputFormat::Latex => render_latex(document),
        OutputFormat::Html => render_html(document, quality),
    }
}

fn render_markdown(document: &FinalDocument, quality: Option<&QualityMetrics>) -> String {
    let meta = &document.metadata;
    let mut out = document.content.clone();
    out.push_str("\n\n---\n\n");
    let _ = write!(
        out,
        "**Generated:** {}\n\n**Topic:** {}\n\n**Word Count:** {}\n\n**Research Depth:** {} roles\n\n",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S"),
        meta.topic,
        group_thousands(meta.word_count),
        meta.roles_used.len()
    );
    if let Some(q) = quality {
        let _ = write!(
            out,
            "**Quality Metrics:**\n- Overall Score: {:.2}\n- Coherence: {:.2}\n- Citation Quality: {:.2}\n- Depth: {:.2}\n- Originality: {:.2}\n",
            q.overall_score, q.coherence, q.citation_quality, q.depth_score, q.originality
        );
    }
    out
}

fn render_latex(document: &FinalDocument) -> String {
    let mut out = String::from(
        "\\documentclass[12pt]{article}\n\
         \\usepackage[utf8]{inputenc}\n\
         \\usepackage{hyperref}\n\
         \\usepackage{cite}\n\n",
    );
    let _ = write!(
        out,
        "\\title{{{}}}\n\\author{{EssayForge}}\n\\date{{{}}}\n\n",
        escape_latex(&document.title),
        document.metadata.generated_at.format("%B %d, %Y")
    );
    out.push_str("\\begin{document}\n\n\\maketitle\n\n");
    out.push_str(&markdown_to_latex(&document.content));
    out.push_str("\n\\end{document}");
    out
}

fn render_html(document: &FinalDocument, quality: Option<&QualityMetrics>) -> String {
    let meta = &document.metadata;
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }}
        h1, h2, h3 {{ color: #2c3e50; }}
        h1 {{ border-bottom: 2px solid #3498db; padding-bottom: 10px; }}
        h2 {{ margin-top: 30px; }}
        .metadata {{ background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin-top: 40px; font-size: 0.9em; }}
    </style>
</head>
<body>
"#,
        escape_html(&document.title)
    );
    out.push_str(&markdown_to_html(&document.content));

    out.push_str("\n<div class=\"metadata\">");
    let _ = write!(
        out,
        "<p><strong>Generated:</strong> {}</p><p><strong>Topic:</strong> {}</p><p><strong>Word Count:</strong> {}</p><p><strong>Research Depth:</strong> {} roles</p>",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S"),
        escape_html(&meta.topic),
        group_thousands(meta.word_count),
        meta.roles_used.len()
    );
    if let Some(q) = quality {
        let _ = write!(
            out,
            "<p><strong>Quality Metrics:</strong></p><ul><li>Overall Score: {:.2}</li><li>Coherence: {:.2}</li><li>Citation Quality: {:.2}</li><li>Depth: {:.2}</li><li>Originality: {:.2}</li></ul>",
            q.overall_score, q.coherence, q.citation_quality, q.depth_score, q.originality
        );
    }
    out.push_str("</div>\n</body>\n</html>");
    out
}

/// Escape LaTeX special characters.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\^{}"),
            '\\' => out.push_str("\\textbackslash{}"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options
}

/// Drop a leading `---` delimited header block; it is already shown as the title and
/// metadata.
fn strip_front_matter(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("---\n") else {
        return content;
    };
    match rest.find("\n---\n") {
        Some(end) => rest[end + 5..].trim_start_matches('\n'),
        None => content,
    }
}

fn markdown_to_html(content: &str) -> String {
    let parser = Parser::new_ext(strip_front_matter(content), markdown_options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn markdown_to_latex(content: &str) -> String {
    let mut out = String::new();
    let mut in_code_block = false;

    for event in Parser::new_ext(strip_front_matter(content), markdown_options()) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => out.push_str(match level {
                    HeadingLevel::H1 => "\\section{",
                    HeadingLevel::H2 => "\\subsection{",
                    _ => "\\subsubsection{",
                }),
                Tag::Emphasis => out.push_str("\\emph{"),
                Tag::Strong => out.push_str("\\textbf{"),
                Tag::Link { dest_url, .. } => {
                    let _ = write!(out, "\\href{{{}}}{{", escape_latex_url(&dest_url));
                }
                Tag::List(Some(_)) => out.push_str("\\begin{enumerate}\n"),
                Tag::List(None) => out.push_str("\\begin{itemize}\n"),
                Tag::Item => out.push_str("\\item "),
                Tag::CodeBlock(_) => {
                    in_code_block = true;
                    out.push_str("\\begin{verbatim}\n");
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => out.push_str("}\n\n"),
                TagEnd::Paragraph => out.push_str("\n\n"),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => out.push('}'),
                TagEnd::List(true) => out.push_str("\\end{enumerate}\n\n"),
                TagEnd::List(false) => out.push_str("\\end{itemize}\n\n"),
                TagEnd::Item => out.push('\n'),
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    out.push_str("\\end{verbatim}\n\n");
                }
                _ => {}
            },
            Event::Text(text) if in_code_block => out.push_str(&text),
            Event::Text(text) => out.push_str(&escape_latex(&text)),
            Event::Code(code) => {
                let _ = write!(out, "\\texttt{{{}}}", escape_latex(&code));
            }
            Event::SoftBreak => out.push('\n'),
            Event::HardBreak => out.push_str("\\\\\n"),
            Event::Rule => out.push_str("\\noindent\\rule{\\linewidth}{0.4pt}\n\n"),
            _ => {}
        }
    }
    out.trim_end().to_string()
}

/// `#` and `%` must be escaped inside `\href`.
fn escape_latex_url(url: &str) -> String {
    url.replace('%', "\\%").replace('#', "\\#")
}

/// `12345` -> `"12,345"`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
