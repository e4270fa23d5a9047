//! Home page rendering.
//!
//! Template syntax is small: `{{ name }}` substitutes an HTML-escaped value and
//! `{{#part left-arm}} ... {{/part}}` renders its body only when that part has an image.
//! Inside a part section `image`, `served_by` and `version` refer to the part.

use crate::domain::{AggregatedView, BodyPart, PartResult};
use std::fmt::Write as _;
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated tag starting at byte {offset}")]
    Unterminated { offset: usize },
    #[error("unknown placeholder `{name}` at byte {offset}")]
    UnknownPlaceholder { name: String, offset: usize },
    #[error("unknown body part `{name}` at byte {offset}")]
    UnknownPart { name: String, offset: usize },
    #[error("part sections cannot nest (byte {offset})")]
    NestedSection { offset: usize },
    #[error("`{{{{/part}}}}` without an open section at byte {offset}")]
    UnbalancedClose { offset: usize },
    #[error("section for `{part}` is never closed")]
    UnclosedSection { part: String },
    #[error("failed to write rendered output: {0}")]
    Execute(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placeholder {
    Hostname,
    Version,
    Daytime,
    SecretMessage,
    PartImage,
    PartServedBy,
    PartVersion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value(Placeholder),
    Part {
        part: BodyPart,
        body: Vec<Segment>,
    },
}

/// Parsed template, ready to be executed against any number of views.
#[derive(Clone, Debug)]
pub struct HomeTemplate {
    segments: Vec<Segment>,
}

impl HomeTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut root: Vec<Segment> = Vec::new();
        let mut section: Option<(BodyPart, Vec<Segment>)> = None;
        let mut cursor = 0;

        while let Some(found) = source[cursor..].find(OPEN) {
            let open_at = cursor + found;
            push_text(current(&mut root, &mut section), &source[cursor..open_at]);

            let tag_start = open_at + OPEN.len();
            let close_rel = source[tag_start..]
                .find(CLOSE)
                .ok_or(TemplateError::Unterminated { offset: open_at })?;
            let tag = source[tag_start..tag_start + close_rel].trim();
            cursor = tag_start + close_rel + CLOSE.len();

            if let Some(name) = tag.strip_prefix("#part") {
                if section.is_some() {
                    return Err(TemplateError::NestedSection { offset: open_at });
                }
                let name = name.trim();
                let part = BodyPart::from_name(name).ok_or_else(|| TemplateError::UnknownPart {
                    name: name.to_string(),
                    offset: open_at,
                })?;
                section = Some((part, Vec::new()));
            } else if tag == "/part" {
                let (part, body) = section
                    .take()
                    .ok_or(TemplateError::UnbalancedClose { offset: open_at })?;
                root.push(Segment::Part { part, body });
            } else {
                let placeholder = resolve_placeholder(tag, section.is_some()).ok_or_else(|| {
                    TemplateError::UnknownPlaceholder {
                        name: tag.to_string(),
                        offset: open_at,
                    }
                })?;
                current(&mut root, &mut section).push(Segment::Value(placeholder));
            }
        }

        if let Some((part, _)) = section {
            return Err(TemplateError::UnclosedSection {
                part: part.as_str().to_string(),
            });
        }
        push_text(&mut root, &source[cursor..]);

        Ok(Self { segments: root })
    }

    pub fn render(&self, view: &AggregatedView) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(4096);
        self.render_to(view, &mut output)?;
        Ok(output)
    }

    pub fn render_to<W: std::fmt::Write>(
        &self,
        view: &AggregatedView,
        out: &mut W,
    ) -> Result<(), TemplateError> {
        write_segments(&self.segments, view, None, out)
            .map_err(|err| TemplateError::Execute(err.to_string()))
    }
}

fn current<'a>(
    root: &'a mut Vec<Segment>,
    section: &'a mut Option<(BodyPart, Vec<Segment>)>,
) -> &'a mut Vec<Segment> {
    match section {
        Some((_, body)) => body,
        None => root,
    }
}

fn push_text(target: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(existing)) = target.last_mut() {
        existing.push_str(text);
    } else {
        target.push(Segment::Text(text.to_string()));
    }
}

fn resolve_placeholder(name: &str, in_part: bool) -> Option<Placeholder> {
    match (name, in_part) {
        ("image", true) => Some(Placeholder::PartImage),
        ("served_by", true) => Some(Placeholder::PartServedBy),
        ("version", true) => Some(Placeholder::PartVersion),
        ("hostname", _) => Some(Placeholder::Hostname),
        ("version", false) => Some(Placeholder::Version),
        ("daytime", _) => Some(Placeholder::Daytime),
        ("secret_message", _) => Some(Placeholder::SecretMessage),
        _ => None,
    }
}

fn write_segments<W: std::fmt::Write>(
    segments: &[Segment],
    view: &AggregatedView,
    part: Option<&PartResult>,
    out: &mut W,
) -> std::fmt::Result {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.write_str(text)?,
            Segment::Value(placeholder) => {
                let value = match (placeholder, part) {
                    (Placeholder::Hostname, _) => view.hostname.as_str(),
                    (Placeholder::Version, _) => view.version.as_str(),
                    (Placeholder::Daytime, _) => view.daytime.as_str(),
                    (Placeholder::SecretMessage, _) => view.secret_message.as_str(),
                    (Placeholder::PartImage, Some(part)) => part.image.as_str(),
                    (Placeholder::PartServedBy, Some(part)) => part.served_by.as_str(),
                    (Placeholder::PartVersion, Some(part)) => part.version.as_str(),
                    (_, None) => "",
                };
                write_escaped(out, value)?;
            }
            Segment::Part {
                part: body_part,
                body,
            } => {
                let result = view.parts.get(*body_part);
                if !result.image.is_empty() {
                    write_segments(body, view, Some(result), out)?;
                }
            }
        }
    }
    Ok(())
}

fn write_escaped<W: std::fmt::Write>(out: &mut W, value: &str) -> std::fmt::Result {
    for ch in value.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&#39;")?,
            other => out.write_char(other)?,
        }
    }
    Ok(())
}
