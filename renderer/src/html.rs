//! Default HTML rules.

use std::fmt::Write as _;
use std::num::NonZeroU32;

use deck::style::escape_html;
use deck::{Media, Styled};

use crate::rules::{CodeView, Kind, LinkView, ListView, Rules, SectionView, TextBody, View};

/// A rule set covering every kind with plain HTML.
pub fn rules() -> Rules {
    Kind::ALL
        .into_iter()
        .fold(Rules::new(), |rules, kind| rules.on(kind, render))
}

/// Render any view as HTML.
pub fn render(view: &View<'_>) -> String {
    match view {
        View::Section(section) => render_section(section),
        View::List(list) => render_list(list),
        View::Text(body) => render_text(body),
        View::Code(code) => render_code(code),
        View::Image(media) => format!("<div class=\"image\"><img{}></div>\n", media_attrs(media)),
        View::Video(video) => format!(
            "<div class=\"video\"><video{} controls><source src=\"{}\" type=\"{}\"></video></div>\n",
            dimension_attrs(video.media.height, video.media.width),
            escape_html(&video.media.url),
            escape_html(&video.source_type),
        ),
        View::Background(media) => {
            format!("<div class=\"background\"><img{}></div>\n", media_attrs(media))
        }
        View::Iframe(media) => format!("<iframe{}></iframe>\n", media_attrs(media)),
        View::Link(link) => render_link(link),
        // Trusted passthrough: no escaping.
        View::Html(raw) => format!("{raw}\n"),
        View::Caption(text) => format!("<figcaption>{}</figcaption>\n", text.to_html()),
    }
}

fn render_section(section: &SectionView<'_>) -> String {
    let level = section.depth.clamp(1, 6);
    format!(
        "<section id=\"section-{number}\" class=\"depth-{depth}\">\n<h{level}><span class=\"number\">{number}</span> {title}</h{level}>\n{body}</section>\n",
        number = section.formatted_number,
        depth = section.depth,
        title = section.title.to_html(),
        body = section.body,
    )
}

fn render_list(list: &ListView) -> String {
    let mut out = String::new();
    if list.indent == 0 {
        out.push_str("<ul>\n");
    } else {
        let _ = writeln!(out, "<ul class=\"indent-{}\">", list.indent);
    }
    for item in &list.items {
        let _ = writeln!(out, "<li>{}</li>", item.to_html());
    }
    out.push_str("</ul>\n");
    out
}

fn render_text(body: &TextBody<'_>) -> String {
    match body {
        TextBody::Pre(lines) => {
            let escaped: Vec<String> = lines.iter().map(|l| escape_html(l)).collect();
            format!("<div class=\"code\"><pre>{}</pre></div>\n", escaped.join("\n"))
        }
        TextBody::Prose(lines) => {
            let html: Vec<String> = lines.iter().map(Styled::to_html).collect();
            format!("<p>{}</p>\n", html.join("<br>\n"))
        }
    }
}

fn render_code(view: &CodeView<'_>) -> String {
    let code = view.code;
    let mut class = String::from("code");
    if view.playable {
        class.push_str(" playground");
    }
    let mut attrs = String::new();
    if let Some(lang) = &code.language {
        let _ = write!(attrs, " data-language=\"{}\"", escape_html(lang));
    }
    if code.edit {
        attrs.push_str(" contenteditable=\"true\" spellcheck=\"false\"");
    }

    let body = if code.numbers {
        code.text
            .split('\n')
            .enumerate()
            .map(|(i, line)| format!("<span num=\"{}\">{}</span>", i + 1, escape_html(line)))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        escape_html(&code.text)
    };
    format!("<div class=\"{class}\"{attrs}><pre>{body}</pre></div>\n")
}

fn render_link(link: &LinkView<'_>) -> String {
    format!(
        "<p class=\"link\"><a href=\"{}\" target=\"_blank\">{}</a></p>\n",
        escape_html(link.url),
        link.label.to_html()
    )
}

fn media_attrs(media: &Media) -> String {
    format!(
        " src=\"{}\"{}",
        escape_html(&media.url),
        dimension_attrs(media.height, media.width)
    )
}

/// Absent dimensions produce no attribute at all.
fn dimension_attrs(height: Option<NonZeroU32>, width: Option<NonZeroU32>) -> String {
    let mut out = String::new();
    if let Some(h) = height {
        let _ = write!(out, " height=\"{h}\"");
    }
    if let Some(w) = width {
        let _ = write!(out, " width=\"{w}\"");
    }
    out
}
