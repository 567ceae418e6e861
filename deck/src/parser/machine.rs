//! Parser state machine.
//!
//! [`transition`] is the pure transition table: given the current state and
//! a classified line it names the next state and the actions to run.
//! [`Machine`] owns the section stack and the element under construction and
//! executes those actions. Feeding it synthetic [`Line`]s exercises the
//! parser without going through the lexer.

use crate::document::{Document, Section};
use crate::element::{Code, Element, List, Origin, Text};
use crate::parser::directive::parse_directive;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lexer::{FenceInfo, Line, LineKind};
use crate::parser::HeaderPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Prose,
    Pre,
}

/// Parser states. `depth` is the depth of the innermost open section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    TopLevel,
    InSection(usize),
    InList { depth: usize, indent: usize },
    InCodeFence { depth: usize },
    InText { depth: usize, mode: TextMode },
}

impl State {
    pub fn depth(self) -> usize {
        match self {
            State::TopLevel => 0,
            State::InSection(depth)
            | State::InList { depth, .. }
            | State::InCodeFence { depth }
            | State::InText { depth, .. } => depth,
        }
    }

    /// The same state re-anchored at another section depth.
    fn at_depth(self, depth: usize) -> State {
        match self {
            State::TopLevel if depth == 0 => State::TopLevel,
            State::TopLevel | State::InSection(_) => State::InSection(depth),
            State::InList { indent, .. } => State::InList { depth, indent },
            State::InCodeFence { .. } => State::InCodeFence { depth },
            State::InText { mode, .. } => State::InText { depth, mode },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Finish the list or text element under construction.
    CloseElement,
    OpenSection,
    StartList,
    AppendBullet,
    EmitDirective,
    OpenFence,
    AppendFenceLine,
    CloseFence,
    StartText,
    AppendText,
    Skip,
    /// Content outside of any section.
    RejectOrphan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: State,
    pub actions: &'static [Action],
}

fn to(next: State, actions: &'static [Action]) -> Transition {
    Transition { next, actions }
}

/// The transition table.
///
/// For header lines the returned `InSection` carries the header's written
/// depth; the machine re-anchors it to the effective depth after applying
/// the header policy.
pub fn transition(state: State, line: &LineKind) -> Transition {
    use Action::*;

    let depth = state.depth();
    let section = State::InSection(depth);

    match (state, line) {
        // Fence context wins over every other classification.
        (State::InCodeFence { .. }, LineKind::FenceClose) => to(section, &[CloseFence]),
        (State::InCodeFence { .. }, _) => to(state, &[AppendFenceLine]),

        (_, LineKind::Comment) => to(state, &[Skip]),

        (State::InList { .. } | State::InText { .. }, LineKind::Header { depth: h, .. }) => {
            to(State::InSection(*h), &[CloseElement, OpenSection])
        }
        (_, LineKind::Header { depth: h, .. }) => to(State::InSection(*h), &[OpenSection]),

        (State::TopLevel, LineKind::Blank) => to(state, &[Skip]),
        (State::TopLevel, _) => to(state, &[RejectOrphan]),

        (State::InSection(_), LineKind::Blank | LineKind::FenceClose) => to(state, &[Skip]),
        (State::InSection(_), LineKind::Bullet { indent, .. }) => {
            to(State::InList { depth, indent: *indent }, &[StartList])
        }
        (State::InSection(_), LineKind::FenceOpen(_)) => {
            to(State::InCodeFence { depth }, &[OpenFence])
        }
        (State::InSection(_), LineKind::Directive { .. }) => to(state, &[EmitDirective]),
        (State::InSection(_), LineKind::Pre) => {
            to(State::InText { depth, mode: TextMode::Pre }, &[StartText])
        }
        (State::InSection(_), LineKind::Prose(_) | LineKind::Raw) => {
            to(State::InText { depth, mode: TextMode::Prose }, &[StartText])
        }

        (State::InList { indent, .. }, LineKind::Bullet { indent: next, .. }) => {
            if indent == *next {
                to(state, &[AppendBullet])
            } else {
                to(State::InList { depth, indent: *next }, &[CloseElement, StartList])
            }
        }
        (State::InText { .. }, LineKind::Bullet { indent, .. }) => {
            to(State::InList { depth, indent: *indent }, &[CloseElement, StartList])
        }

        (State::InText { mode: TextMode::Pre, .. }, LineKind::Pre)
        | (State::InText { mode: TextMode::Prose, .. }, LineKind::Prose(_) | LineKind::Raw) => {
            to(state, &[AppendText])
        }
        (State::InList { .. } | State::InText { .. }, LineKind::Pre) => {
            to(State::InText { depth, mode: TextMode::Pre }, &[CloseElement, StartText])
        }
        (State::InList { .. } | State::InText { .. }, LineKind::Prose(_) | LineKind::Raw) => {
            to(State::InText { depth, mode: TextMode::Prose }, &[CloseElement, StartText])
        }

        (State::InList { .. } | State::InText { .. }, LineKind::FenceOpen(_)) => {
            to(State::InCodeFence { depth }, &[CloseElement, OpenFence])
        }
        (State::InList { .. } | State::InText { .. }, LineKind::Directive { .. }) => {
            to(section, &[CloseElement, EmitDirective])
        }
        (State::InList { .. } | State::InText { .. }, LineKind::Blank | LineKind::FenceClose) => {
            to(section, &[CloseElement])
        }
    }
}

/// Element under construction.
enum Pending {
    List(List),
    Text {
        mode: TextMode,
        lines: Vec<String>,
        origins: Vec<Origin>,
    },
    Fence { info: FenceInfo, lines: Vec<String>, opened: Line },
}

struct SectionBuilder {
    /// Depth as written in the source, used to decide which sections a new
    /// header closes.
    written_depth: usize,
    number: Vec<usize>,
    title: String,
    line: usize,
    title_column: usize,
    elements: Vec<Element>,
    children: Vec<Section>,
}

impl SectionBuilder {
    fn into_section(self) -> Section {
        Section {
            number: self.number,
            title: self.title,
            elements: self.elements,
            children: self.children,
            line: self.line,
            title_column: self.title_column,
        }
    }
}

/// Executes transitions and builds the document tree.
pub struct Machine {
    state: State,
    policy: HeaderPolicy,
    file_id: usize,
    stack: Vec<SectionBuilder>,
    sections: Vec<Section>,
    pending: Option<Pending>,
}

impl Machine {
    pub fn new(policy: HeaderPolicy, file_id: usize) -> Self {
        Machine {
            state: State::TopLevel,
            policy,
            file_id,
            stack: Vec::new(),
            sections: Vec::new(),
            pending: None,
        }
    }

    pub fn feed(&mut self, line: Line) -> Result<(), ParseError> {
        let step = transition(self.state, &line.kind);
        for action in step.actions {
            self.apply(*action, &line)?;
        }
        self.state = step.next.at_depth(self.stack.len());
        Ok(())
    }

    /// Close everything still open and return the document.
    pub fn finish(mut self) -> Result<Document, ParseError> {
        if let Some(Pending::Fence { opened, .. }) = &self.pending {
            return Err(ParseError::new(ParseErrorKind::UnterminatedFence, opened, self.file_id)
                .with_note("add a closing fence with the same marker before the end of the input"));
        }
        self.close_element();
        self.close_sections(1);
        Ok(Document {
            sections: self.sections,
        })
    }

    fn apply(&mut self, action: Action, line: &Line) -> Result<(), ParseError> {
        match action {
            Action::Skip => {}
            Action::RejectOrphan => {
                return Err(self.error(ParseErrorKind::ContentOutsideSection, line));
            }
            Action::CloseElement => self.close_element(),
            Action::OpenSection => self.open_section(line)?,
            Action::StartList => {
                if let LineKind::Bullet { indent, text } = &line.kind {
                    self.pending = Some(Pending::List(List {
                        indent: *indent,
                        bullets: vec![text.clone()],
                        origins: vec![origin(line)],
                    }));
                }
            }
            Action::AppendBullet => {
                if let (Some(Pending::List(list)), LineKind::Bullet { text, .. }) =
                    (&mut self.pending, &line.kind)
                {
                    list.bullets.push(text.clone());
                    list.origins.push(origin(line));
                }
            }
            Action::EmitDirective => {
                if let LineKind::Directive { kind, args } = &line.kind {
                    let element = parse_directive(*kind, args, origin(line))
                        .map_err(|kind| self.error(kind, line))?;
                    self.push_element(element, line)?;
                }
            }
            Action::OpenFence => {
                if let LineKind::FenceOpen(info) = &line.kind {
                    self.pending = Some(Pending::Fence {
                        info: info.clone(),
                        lines: Vec::new(),
                        opened: line.clone(),
                    });
                }
            }
            Action::AppendFenceLine => {
                if let Some(Pending::Fence { lines, .. }) = &mut self.pending {
                    lines.push(line.raw.clone());
                }
            }
            Action::CloseFence => {
                if let Some(Pending::Fence { info, lines, .. }) = self.pending.take() {
                    let code = Code {
                        text: lines.join("\n"),
                        language: info.language,
                        edit: info.edit,
                        numbers: info.numbers,
                        play: info.play,
                    };
                    self.push_element(Element::Code(code), line)?;
                }
            }
            Action::StartText => {
                let mode = match line.kind {
                    LineKind::Pre => TextMode::Pre,
                    _ => TextMode::Prose,
                };
                self.pending = Some(Pending::Text {
                    mode,
                    lines: vec![text_content(line)],
                    origins: vec![origin(line)],
                });
            }
            Action::AppendText => {
                if let Some(Pending::Text { lines, origins, .. }) = &mut self.pending {
                    lines.push(text_content(line));
                    origins.push(origin(line));
                }
            }
        }
        Ok(())
    }

    fn open_section(&mut self, line: &Line) -> Result<(), ParseError> {
        let LineKind::Header { depth, title } = &line.kind else {
            return Ok(());
        };
        let written = *depth;

        match self.policy {
            HeaderPolicy::Forgiving => {
                while self.stack.last().is_some_and(|s| s.written_depth >= written) {
                    self.close_top();
                }
            }
            HeaderPolicy::Strict => {
                self.close_sections(written);
                let expected = self.stack.len() + 1;
                if written > expected {
                    return Err(self.error(
                        ParseErrorKind::SkippedHeaderLevel {
                            found: written,
                            expected,
                        },
                        line,
                    ));
                }
            }
        }

        let number = match self.stack.last() {
            Some(parent) => {
                let mut number = parent.number.clone();
                number.push(parent.children.len() + 1);
                number
            }
            None => vec![self.sections.len() + 1],
        };
        tracing::debug!(line = line.number, number = ?number, title = %title, "open section");

        self.stack.push(SectionBuilder {
            written_depth: written,
            number,
            title: title.clone(),
            line: line.number,
            title_column: line.text_column(),
            elements: Vec::new(),
            children: Vec::new(),
        });
        Ok(())
    }

    /// Close open sections until fewer than `depth` remain.
    fn close_sections(&mut self, depth: usize) {
        while self.stack.len() >= depth && !self.stack.is_empty() {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        let Some(builder) = self.stack.pop() else {
            return;
        };
        let section = builder.into_section();
        tracing::debug!(number = ?section.number, elements = section.elements.len(), "close section");
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(section),
            None => self.sections.push(section),
        }
    }

    fn close_element(&mut self) {
        let element = match self.pending.take() {
            Some(Pending::List(list)) => Element::List(list),
            Some(Pending::Text {
                mode: TextMode::Prose,
                lines,
                origins,
            }) => Element::Text(Text {
                pre: false,
                lines,
                origins,
            }),
            Some(Pending::Text {
                mode: TextMode::Pre,
                lines,
                mut origins,
            }) => {
                let common = common_indent(&lines);
                let lines = dedent(lines);
                origins.truncate(lines.len());
                for origin in &mut origins {
                    origin.column += common;
                }
                Element::Text(Text {
                    pre: true,
                    lines,
                    origins,
                })
            }
            Some(fence @ Pending::Fence { .. }) => {
                self.pending = Some(fence);
                return;
            }
            None => return,
        };
        if let Some(section) = self.stack.last_mut() {
            section.elements.push(element);
        }
    }

    fn push_element(&mut self, element: Element, line: &Line) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(section) => {
                section.elements.push(element);
                Ok(())
            }
            None => Err(self.error(ParseErrorKind::ContentOutsideSection, line)),
        }
    }

    fn error(&self, kind: ParseErrorKind, line: &Line) -> ParseError {
        ParseError::new(kind, line, self.file_id)
    }
}

fn origin(line: &Line) -> Origin {
    Origin::new(line.number, line.text_column())
}

fn text_content(line: &Line) -> String {
    match &line.kind {
        LineKind::Prose(text) => text.clone(),
        _ => line.raw.clone(),
    }
}

/// Leading whitespace characters shared by all non-blank lines.
fn common_indent(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0)
}

/// Strip the indentation common to all non-blank lines and drop trailing
/// blank lines.
fn dedent(mut lines: Vec<String>) -> Vec<String> {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let common = common_indent(&lines);
    lines
        .into_iter()
        .map(|l| l.chars().skip(common).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(number: usize, raw: &str, kind: LineKind) -> Line {
        Line {
            number,
            span: 0..raw.len(),
            raw: raw.to_string(),
            kind,
        }
    }

    fn header(number: usize, depth: usize, title: &str) -> Line {
        line(
            number,
            &format!("{} {title}", "#".repeat(depth)),
            LineKind::Header {
                depth,
                title: title.to_string(),
            },
        )
    }

    fn bullet(number: usize, indent: usize, text: &str) -> Line {
        line(
            number,
            &format!("{}- {text}", " ".repeat(indent)),
            LineKind::Bullet {
                indent,
                text: text.to_string(),
            },
        )
    }

    fn run(policy: HeaderPolicy, lines: Vec<Line>) -> Result<Document, ParseError> {
        let mut machine = Machine::new(policy, 0);
        for l in lines {
            machine.feed(l)?;
        }
        machine.finish()
    }

    #[test]
    fn table_fence_context_wins() {
        let fence = State::InCodeFence { depth: 1 };
        for kind in [
            LineKind::Header {
                depth: 1,
                title: "x".into(),
            },
            LineKind::Bullet {
                indent: 0,
                text: "x".into(),
            },
            LineKind::Blank,
            LineKind::Raw,
        ] {
            assert_eq!(transition(fence, &kind), to(fence, &[Action::AppendFenceLine]));
        }
        assert_eq!(
            transition(fence, &LineKind::FenceClose),
            to(State::InSection(1), &[Action::CloseFence])
        );
    }

    #[test]
    fn table_blank_closes_accumulating_states() {
        let list = State::InList {
            depth: 2,
            indent: 0,
        };
        assert_eq!(
            transition(list, &LineKind::Blank),
            to(State::InSection(2), &[Action::CloseElement])
        );
        assert_eq!(
            transition(State::InSection(2), &LineKind::Blank),
            to(State::InSection(2), &[Action::Skip])
        );
    }

    #[test]
    fn table_top_level_rejects_content() {
        assert_eq!(
            transition(State::TopLevel, &LineKind::Prose("x".into())).actions,
            &[Action::RejectOrphan]
        );
        assert_eq!(
            transition(State::TopLevel, &LineKind::Blank).actions,
            &[Action::Skip]
        );
    }

    #[test]
    fn table_bullet_indent_change_starts_new_list() {
        let list = State::InList {
            depth: 1,
            indent: 0,
        };
        let step = transition(
            list,
            &LineKind::Bullet {
                indent: 2,
                text: "x".into(),
            },
        );
        assert_eq!(step.actions, &[Action::CloseElement, Action::StartList]);
        assert_eq!(
            step.next,
            State::InList {
                depth: 1,
                indent: 2
            }
        );
    }

    #[test]
    fn synthetic_lines_build_nested_sections() {
        let doc = run(
            HeaderPolicy::Forgiving,
            vec![
                header(1, 1, "A"),
                header(2, 1, "B"),
                bullet(3, 0, "one"),
                bullet(4, 0, "two"),
                header(5, 2, "B.1"),
            ],
        )
        .unwrap();
        let numbers: Vec<Vec<usize>> = doc.walk().map(|s| s.number.clone()).collect();
        assert_eq!(numbers, vec![vec![1], vec![2], vec![2, 1]]);
        assert_eq!(
            doc.sections[1].elements,
            vec![Element::List(List {
                indent: 0,
                bullets: vec!["one".into(), "two".into()],
                origins: vec![Origin::new(3, 3), Origin::new(4, 3)],
            })]
        );
        assert_eq!(doc.sections[1].children[0].title_origin(), Origin::new(5, 4));
    }

    #[test]
    fn pre_origins_follow_the_dedented_text() {
        let doc = run(
            HeaderPolicy::Forgiving,
            vec![
                header(1, 1, "A"),
                line(2, "    a", LineKind::Pre),
                line(3, "      b", LineKind::Pre),
                line(4, "", LineKind::Pre),
            ],
        )
        .unwrap();
        assert_eq!(
            doc.sections[0].elements,
            vec![Element::Text(Text {
                pre: true,
                lines: vec!["a".into(), "  b".into()],
                origins: vec![Origin::new(2, 5), Origin::new(3, 5)],
            })]
        );
    }

    #[test]
    fn forgiving_policy_keeps_written_siblings_together() {
        let doc = run(
            HeaderPolicy::Forgiving,
            vec![header(1, 1, "A"), header(2, 3, "B"), header(3, 3, "C")],
        )
        .unwrap();
        let numbers: Vec<String> = doc.walk().map(Section::formatted_number).collect();
        assert_eq!(numbers, ["1", "1.1", "1.2"]);
    }

    #[test]
    fn strict_policy_rejects_skipped_level() {
        let err = run(
            HeaderPolicy::Strict,
            vec![header(1, 1, "A"), header(2, 3, "B")],
        )
        .unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            ParseErrorKind::SkippedHeaderLevel {
                found: 3,
                expected: 2
            }
        );
    }

    #[test]
    fn unterminated_fence_reports_opening_line() {
        let info = FenceInfo {
            marker: '`',
            len: 3,
            language: None,
            edit: false,
            numbers: false,
            play: false,
        };
        let err = run(
            HeaderPolicy::Forgiving,
            vec![
                header(1, 1, "A"),
                line(2, "```", LineKind::FenceOpen(info)),
                line(3, "x := 1", LineKind::Raw),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedFence);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn dedent_strips_common_indentation() {
        let lines = vec!["    a".to_string(), "      b".into(), "".into(), "    c".into(), "".into()];
        assert_eq!(dedent(lines), vec!["a", "  b", "", "c"]);
    }
}
