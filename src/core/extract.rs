use crate::domain::model::TimerText;
use crate::utils::error::{ElementScope, PollError, Result};
use scraper::{ElementRef, Html};

// 不會顯示的子樹
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript", "head"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "tfoot", "thead",
    "tr", "ul",
];

const CELL_ELEMENTS: &[&str] = &["td", "th"];

/// Parses `html` and returns the rendered text of the first element whose id is
/// `element_id`, in document order.
///
/// Follows what a browser shows: `<br>` and block boundaries break lines,
/// table cells are separated by a space, `script`/`style`/`template` content is
/// skipped. Inside a line whitespace runs collapse to one space; empty lines
/// are dropped.
pub fn extract_element_text(html: &str, element_id: &str) -> Result<TimerText> {
    let document = Html::parse_document(html);

    let element = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(element_id))
        .ok_or_else(|| PollError::ElementNotFound {
            id: element_id.to_string(),
            scope: ElementScope::Fetched,
        })?;

    let mut raw = String::new();
    collect_rendered_text(element, &mut raw);

    let text = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(TimerText::new(text))
}

fn collect_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }

        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };

        let name = child_el.value().name();
        if HIDDEN_ELEMENTS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }

        let block = BLOCK_ELEMENTS.contains(&name);
        if block {
            out.push('\n');
        }

        collect_rendered_text(child_el, out);

        if block {
            out.push('\n');
        } else if CELL_ELEMENTS.contains(&name) {
            out.push(' ');
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
