use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;

use deck::style::style_with_warnings;
use deck::{Document, Element, Origin, Section, StyleWarning, Styled};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::playground::{NoPlayground, Playground};
use crate::rules::{CodeView, Kind, LinkView, ListView, Rules, SectionView, TextBody, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Render top-level sections on a bounded pool of scoped threads.
    /// Output order is unchanged.
    pub parallel: bool,
}

/// A style warning together with the section and source position it came
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWarning {
    /// Formatted number of the section, e.g. `"2.1"`.
    pub section: String,
    /// Source line and character column of the offending markup.
    pub origin: Origin,
    /// `warning.column` is relative to the styled string, not the line.
    pub warning: StyleWarning,
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: unterminated `{}` kept as literal text",
            self.origin.line, self.origin.column, self.warning.sequence
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub output: String,
    pub warnings: Vec<RenderWarning>,
}

/// Walks a document and dispatches each node to its rule.
///
/// Rendering never mutates the document. Every text-bearing field is styled
/// exactly once, right before it is handed to a rule.
pub struct Renderer {
    rules: Rules,
    playground: Box<dyn Playground>,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(rules: Rules) -> Self {
        Renderer {
            rules,
            playground: Box::new(NoPlayground),
            options: RenderOptions::default(),
        }
    }

    pub fn with_playground(mut self, playground: impl Playground + 'static) -> Self {
        self.playground = Box::new(playground);
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Check that every kind present in `doc` has a rule.
    pub fn validate(&self, doc: &Document) -> Result<(), ConfigError> {
        let mut needed = BTreeSet::new();
        for section in doc.walk() {
            needed.insert(Kind::Section);
            needed.extend(section.elements.iter().map(|e| Kind::from(e.kind())));
        }
        let missing = self.rules.missing(&needed);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRules { missing })
        }
    }

    pub fn render(&self, doc: &Document) -> Result<Rendered, ConfigError> {
        self.validate(doc)?;

        let parts: Vec<(String, Vec<RenderWarning>)> = if self.options.parallel {
            self.render_parallel(&doc.sections)
        } else {
            doc.sections
                .iter()
                .map(|section| {
                    let mut warnings = Vec::new();
                    let out = self.render_section(section, &mut warnings);
                    (out, warnings)
                })
                .collect()
        };

        let mut rendered = Rendered {
            output: String::new(),
            warnings: Vec::new(),
        };
        for (out, warnings) in parts {
            rendered.output.push_str(&out);
            rendered.warnings.extend(warnings);
        }
        tracing::debug!(
            bytes = rendered.output.len(),
            warnings = rendered.warnings.len(),
            "rendered document"
        );
        Ok(rendered)
    }

    /// Contiguous chunks of top-level sections, one scoped thread per chunk
    /// and at most one chunk per available core. Chunks are joined by index.
    fn render_parallel(&self, sections: &[Section]) -> Vec<(String, Vec<RenderWarning>)> {
        let threads = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let chunk_size = chunk_len(sections.len(), threads);
        tracing::debug!(sections = sections.len(), threads, chunk_size, "parallel render");

        std::thread::scope(|scope| {
            let handles: Vec<_> = sections
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|section| {
                                let mut warnings = Vec::new();
                                let out = self.render_section(section, &mut warnings);
                                (out, warnings)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    fn render_section(&self, section: &Section, warnings: &mut Vec<RenderWarning>) -> String {
        let title = style_once(section, &section.title, section.title_origin(), warnings);

        let mut body = String::new();
        for element in &section.elements {
            body.push_str(&self.render_element(section, element, warnings));
        }
        for child in &section.children {
            body.push_str(&self.render_section(child, warnings));
        }

        self.dispatch(&View::Section(SectionView {
            number: &section.number,
            formatted_number: section.formatted_number(),
            depth: section.depth(),
            title,
            body,
        }))
    }

    fn render_element(
        &self,
        section: &Section,
        element: &Element,
        warnings: &mut Vec<RenderWarning>,
    ) -> String {
        let view = match element {
            Element::List(list) => View::List(ListView {
                indent: list.indent,
                items: list
                    .bullets
                    .iter()
                    .enumerate()
                    .map(|(i, bullet)| {
                        style_once(section, bullet, origin_at(&list.origins, i), warnings)
                    })
                    .collect(),
            }),
            Element::Text(text) if text.pre => View::Text(TextBody::Pre(&text.lines)),
            Element::Text(text) => View::Text(TextBody::Prose(
                text.lines
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        style_once(section, line, origin_at(&text.origins, i), warnings)
                    })
                    .collect(),
            )),
            Element::Code(code) => View::Code(CodeView {
                code,
                playable: self.playground.is_playable(code),
            }),
            Element::Image(media) => View::Image(media),
            Element::Video(video) => View::Video(video),
            Element::Background(media) => View::Background(media),
            Element::Iframe(media) => View::Iframe(media),
            Element::Link(link) => {
                let fallback = link.label.trim().is_empty();
                let label = if fallback {
                    Styled::plain(link.url.clone())
                } else {
                    style_once(section, &link.label, link.label_origin, warnings)
                };
                View::Link(LinkView {
                    url: &link.url,
                    label,
                    fallback,
                })
            }
            Element::Html(raw) => View::Html(raw),
            Element::Caption(caption) => View::Caption(style_once(
                section,
                &caption.text,
                caption.origin,
                warnings,
            )),
        };
        self.dispatch(&view)
    }

    fn dispatch(&self, view: &View<'_>) -> String {
        // `validate` has already checked that the rule exists.
        self.rules
            .get(view.kind())
            .map(|rule| rule(view))
            .unwrap_or_default()
    }
}

/// Length of the chunks that split `sections` items into at most `threads`
/// chunks.
fn chunk_len(sections: usize, threads: usize) -> usize {
    sections.div_ceil(threads.max(1)).max(1)
}

/// Elements built by hand may carry fewer origins than strings.
fn origin_at(origins: &[Origin], index: usize) -> Origin {
    origins.get(index).copied().unwrap_or_default()
}

/// `origin` is where `raw` starts in the source.
fn style_once(
    section: &Section,
    raw: &str,
    origin: Origin,
    warnings: &mut Vec<RenderWarning>,
) -> Styled {
    let (styled, found) = style_with_warnings(raw);
    for warning in found {
        let origin = origin.advance(warning.column);
        tracing::warn!(
            section = %section.formatted_number(),
            line = origin.line,
            column = origin.column,
            sequence = %warning.sequence,
            "unterminated inline markup"
        );
        warnings.push(RenderWarning {
            section: section.formatted_number(),
            origin,
            warning,
        });
    }
    styled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rules_fail_before_any_rendering() {
        let doc = deck::parse("# A\n- x\n.image a.png\n").unwrap();
        let renderer = Renderer::new(Rules::new().on(Kind::Section, |_| {
            panic!("rendering must not start");
        }));
        assert_eq!(
            renderer.render(&doc),
            Err(ConfigError::MissingRules {
                missing: vec![Kind::List, Kind::Image]
            })
        );
    }

    #[test]
    fn parallel_chunks_never_exceed_thread_count() {
        for (sections, threads) in [(0, 4), (1, 4), (7, 4), (200, 8), (3, 16), (5, 0)] {
            let len = chunk_len(sections, threads);
            assert!(len >= 1);
            assert!(sections.div_ceil(len) <= threads.max(1), "{sections} over {threads}");
        }
    }

    #[test]
    fn title_warnings_precede_body_warnings() {
        let doc = deck::parse("# *A\n- _b\n## *C\n").unwrap();
        let rendered = Renderer::new(Rules::html()).render(&doc).unwrap();
        let origins: Vec<Origin> = rendered.warnings.iter().map(|w| w.origin).collect();
        assert_eq!(
            origins,
            [Origin::new(1, 3), Origin::new(2, 3), Origin::new(3, 4)]
        );
    }

    #[test]
    fn only_observed_kinds_need_rules() {
        let doc = deck::parse("# A\n.caption hello\n").unwrap();
        let rules = Rules::new()
            .on(Kind::Section, |v| match v {
                View::Section(s) => format!("[{}|{}]", s.formatted_number, s.body),
                _ => String::new(),
            })
            .on(Kind::Caption, |v| match v {
                View::Caption(c) => c.plain_text(),
                _ => String::new(),
            });
        let rendered = Renderer::new(rules).render(&doc).unwrap();
        assert_eq!(rendered.output, "[1|hello]");
    }
}
