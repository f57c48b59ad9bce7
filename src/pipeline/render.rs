//! Metadata merging: turn markup + metadata + report type into a complete
//! typesettable document source.
//!
//! The output is pandoc-flavoured Markdown: a YAML metadata header (so the
//! PDF gets proper document properties), a raw LaTeX title page built from
//! the metadata, an optional abstract page, and the markup body verbatim.
//! Rendering is side-effect-free and never fails — every metadata field has
//! a documented default, applied in [`crate::report::ReportMetadata::resolved`].
//!
//! Metadata values are escaped before injection: once for YAML (quotes,
//! backslashes) and once for LaTeX (reserved characters), since a title like
//! `Cost & Benefit of 100% Coverage` is ordinary user input, not a syntax
//! error the student should have to debug from a typesetter log.

use crate::report::{ReportMetadata, ReportType, ResolvedMetadata};

/// Front-page skeleton shared by the generic and micro/mini variants.
const DEFAULT_TEMPLATE: &str = r#"---
title: "{{title}}"
author: "{{author}}"
geometry: margin=1in
---

```{=latex}
\begin{titlepage}
\centering
\vspace*{2.5cm}
{\Huge \bfseries {{label_title}} \par}
\vspace{1cm}
{\Large {{label}} \par}
\vspace{2.5cm}
{{details}}\vfill
\end{titlepage}
```

{{abstract_section}}{{body}}
"#;

/// Capstone variant: adds a certificate page between the front page and the
/// abstract, naming the guide and department.
const CAPSTONE_TEMPLATE: &str = r#"---
title: "{{title}}"
author: "{{author}}"
geometry: margin=1in
---

```{=latex}
\begin{titlepage}
\centering
\vspace*{2.5cm}
{\Huge \bfseries {{label_title}} \par}
\vspace{1cm}
{\Large {{label}} \par}
\vspace{2.5cm}
{{details}}\vfill
\end{titlepage}
\begin{titlepage}
\centering
{\Large \bfseries Certificate \par}
\vspace{1.5cm}
{{certificate}}
\vfill
\end{titlepage}
```

{{abstract_section}}{{body}}
"#;

/// Render the final document source for the given report type.
///
/// An unrecognized type never reaches this function as anything other than
/// [`ReportType::Default`] — the fallback lives in [`ReportType::parse`].
pub fn render_document(markup: &str, meta: &ReportMetadata, report_type: ReportType) -> String {
    let m = meta.resolved();

    let template = match report_type {
        ReportType::Capstone => CAPSTONE_TEMPLATE,
        _ => DEFAULT_TEMPLATE,
    };

    template
        .replace("{{title}}", &yaml_escape(&m.title))
        .replace("{{author}}", &yaml_escape(&m.author_name))
        .replace("{{label_title}}", &latex_escape(&m.title))
        .replace("{{label}}", report_type.front_page_label())
        .replace("{{details}}", &details_block(&m, report_type))
        .replace("{{certificate}}", &certificate_block(&m))
        .replace("{{abstract_section}}", &abstract_section(&m))
        .replace("{{body}}", markup)
}

/// Front-page detail lines; fields without a value are omitted entirely
/// rather than rendered as empty labels.
fn details_block(m: &ResolvedMetadata, report_type: ReportType) -> String {
    let mut lines = String::new();
    let mut push = |label: &str, value: &str| {
        if !value.trim().is_empty() {
            lines.push_str(&format!(
                "{{\\large {}: {} \\par}}\n\\vspace{{0.3cm}}\n",
                label,
                latex_escape(value)
            ));
        }
    };

    push("Submitted by", &m.author_name);
    push("Roll No", &m.roll_no);
    push("Department", &m.department);
    // Micro projects have no named guide on the front page.
    if report_type != ReportType::MicroProject {
        push("Under the guidance of", &m.guide_name);
    }
    push("Session", &m.session_year);
    lines
}

fn certificate_block(m: &ResolvedMetadata) -> String {
    let department = if m.department.trim().is_empty() {
        "the department".to_string()
    } else {
        format!("the {}", latex_escape(&m.department))
    };
    let guide = if m.guide_name.trim().is_empty() {
        "the undersigned".to_string()
    } else {
        latex_escape(&m.guide_name)
    };
    format!(
        "This is to certify that the report titled \\emph{{{}}} was carried out by {} of {} under the supervision of {}.",
        latex_escape(&m.title),
        latex_escape(&m.author_name),
        department,
        guide
    )
}

fn abstract_section(m: &ResolvedMetadata) -> String {
    if m.abstract_text.trim().is_empty() {
        String::new()
    } else {
        format!("# Abstract\n\n{}\n\n", m.abstract_text)
    }
}

/// Escape a value for a double-quoted YAML scalar.
fn yaml_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape LaTeX-reserved characters in a metadata value.
fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}
