use std::num::NonZeroU32;

use crate::element::{Caption, Element, Link, Media, Origin, Video};
use crate::parser::error::ParseErrorKind;
use crate::parser::lexer::DirectiveKind;

/// One argument of a directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    /// Character offset of the first character of `text` in the argument
    /// string. For a quoted argument this is just past the opening quote.
    start: usize,
    text: String,
}

/// Build the element for a directive line from its argument text. `origin`
/// is where `args` starts in the source.
pub(crate) fn parse_directive(
    kind: DirectiveKind,
    args: &str,
    origin: Origin,
) -> Result<Element, ParseErrorKind> {
    match kind {
        DirectiveKind::Html => {
            if args.trim().is_empty() {
                return Err(missing(kind, "raw payload"));
            }
            Ok(Element::Html(args.to_string()))
        }
        DirectiveKind::Caption => {
            if args.is_empty() {
                return Err(missing(kind, "text"));
            }
            Ok(Element::Caption(Caption {
                text: args.to_string(),
                origin,
            }))
        }
        DirectiveKind::Link => {
            let words = split_args(kind, args)?;
            let url = required(kind, &words, 0, "url")?;
            let rest = &words[1..];
            let label = rest
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let label_origin = rest
                .first()
                .map_or(origin, |w| origin.advance(w.start + 1));
            Ok(Element::Link(Link {
                url,
                label,
                label_origin,
            }))
        }
        DirectiveKind::Video => {
            let words = split_args(kind, args)?;
            let url = required(kind, &words, 0, "url")?;
            let source_type = required(kind, &words, 1, "source type")?;
            let media = media(kind, url, &words[2..])?;
            Ok(Element::Video(Video { media, source_type }))
        }
        DirectiveKind::Image | DirectiveKind::Background | DirectiveKind::Iframe => {
            let words = split_args(kind, args)?;
            let url = required(kind, &words, 0, "url")?;
            let media = media(kind, url, &words[1..])?;
            Ok(match kind {
                DirectiveKind::Image => Element::Image(media),
                DirectiveKind::Background => Element::Background(media),
                _ => Element::Iframe(media),
            })
        }
    }
}

fn media(kind: DirectiveKind, url: String, dims: &[Word]) -> Result<Media, ParseErrorKind> {
    if dims.len() > 2 {
        tracing::debug!(directive = %kind, extra = ?&dims[2..], "ignoring extra directive arguments");
    }
    Ok(Media {
        url,
        height: dimension(kind, "height", dims.first())?,
        width: dimension(kind, "width", dims.get(1))?,
    })
}

/// `_` or a missing argument means "no dimension".
fn dimension(
    kind: DirectiveKind,
    field: &'static str,
    value: Option<&Word>,
) -> Result<Option<NonZeroU32>, ParseErrorKind> {
    match value.map(|w| w.text.as_str()) {
        None | Some("_") => Ok(None),
        Some(raw) => raw
            .parse::<NonZeroU32>()
            .map(Some)
            .map_err(|_| ParseErrorKind::InvalidDimension {
                directive: kind,
                field,
                value: raw.to_string(),
            }),
    }
}

fn required(
    kind: DirectiveKind,
    words: &[Word],
    index: usize,
    field: &'static str,
) -> Result<String, ParseErrorKind> {
    words
        .get(index)
        .map(|w| &w.text)
        .filter(|w| !w.is_empty() && w.as_str() != "_")
        .cloned()
        .ok_or_else(|| missing(kind, field))
}

fn missing(directive: DirectiveKind, field: &'static str) -> ParseErrorKind {
    ParseErrorKind::MissingArgument { directive, field }
}

/// Split on whitespace, honoring double-quoted arguments.
fn split_args(kind: DirectiveKind, args: &str) -> Result<Vec<Word>, ParseErrorKind> {
    let mut words = Vec::new();
    let mut chars = args.chars().enumerate().peekable();

    while let Some(&(at, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = Word {
            start: at,
            text: String::new(),
        };
        if ch == '"' {
            chars.next();
            word.start += 1;
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                word.text.push(c);
            }
            if !closed {
                return Err(ParseErrorKind::UnterminatedQuote { directive: kind });
            }
        } else {
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.text.push(c);
                chars.next();
            }
        }
        words.push(word);
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(n: u32) -> Option<NonZeroU32> {
        NonZeroU32::new(n)
    }

    fn directive(kind: DirectiveKind, args: &str) -> Result<Element, ParseErrorKind> {
        parse_directive(kind, args, Origin::new(1, 7))
    }

    #[test]
    fn image_with_dimensions() {
        let el = directive(DirectiveKind::Image, "gopher.png 300 _").unwrap();
        assert_eq!(
            el,
            Element::Image(Media {
                url: "gopher.png".into(),
                height: dim(300),
                width: None,
            })
        );
    }

    #[test]
    fn quoted_url() {
        let el = directive(DirectiveKind::Iframe, "\"a b.html\" _ 640").unwrap();
        assert_eq!(
            el,
            Element::Iframe(Media {
                url: "a b.html".into(),
                height: None,
                width: dim(640),
            })
        );
    }

    #[test]
    fn video_requires_source_type() {
        let err = directive(DirectiveKind::Video, "clip.mp4").unwrap_err();
        assert_eq!(
            err,
            ParseErrorKind::MissingArgument {
                directive: DirectiveKind::Video,
                field: "source type"
            }
        );
        let ok = directive(DirectiveKind::Video, "clip.mp4 video/mp4 _ 200").unwrap();
        let Element::Video(video) = ok else {
            panic!("expected video");
        };
        assert_eq!(video.source_type, "video/mp4");
        assert_eq!(video.media.width, dim(200));
    }

    #[test]
    fn zero_and_junk_dimensions_are_rejected() {
        for args in ["a.png 0", "a.png -3", "a.png tall"] {
            assert!(matches!(
                directive(DirectiveKind::Image, args),
                Err(ParseErrorKind::InvalidDimension { field: "height", .. })
            ));
        }
    }

    #[test]
    fn link_label_is_optional() {
        assert_eq!(
            directive(DirectiveKind::Link, "https://go.dev The  Go site").unwrap(),
            Element::Link(Link {
                url: "https://go.dev".into(),
                label: "The Go site".into(),
                label_origin: Origin::new(1, 22),
            })
        );
        assert_eq!(
            directive(DirectiveKind::Link, "https://go.dev").unwrap(),
            Element::Link(Link {
                url: "https://go.dev".into(),
                label: String::new(),
                label_origin: Origin::new(1, 7),
            })
        );
    }

    #[test]
    fn quoted_link_label_starts_inside_the_quote() {
        let Element::Link(link) = directive(DirectiveKind::Link, "u \"*big* news\"").unwrap() else {
            panic!("expected link");
        };
        assert_eq!(link.label, "*big* news");
        assert_eq!(link.label_origin, Origin::new(1, 10));
    }

    #[test]
    fn link_url_must_be_present() {
        for args in ["\"\" label", "_ label", "\"\""] {
            assert_eq!(
                directive(DirectiveKind::Link, args),
                Err(ParseErrorKind::MissingArgument {
                    directive: DirectiveKind::Link,
                    field: "url"
                }),
                "{args}"
            );
        }
    }

    #[test]
    fn html_payload_is_kept_verbatim() {
        assert_eq!(
            directive(DirectiveKind::Html, "  <b> x  "),
            Ok(Element::Html("  <b> x  ".into()))
        );
        assert!(matches!(
            directive(DirectiveKind::Html, "   "),
            Err(ParseErrorKind::MissingArgument { field: "raw payload", .. })
        ));
    }

    #[test]
    fn caption_keeps_its_origin() {
        assert_eq!(
            directive(DirectiveKind::Caption, "The *gopher*"),
            Ok(Element::Caption(Caption {
                text: "The *gopher*".into(),
                origin: Origin::new(1, 7),
            }))
        );
    }

    #[test]
    fn missing_payloads() {
        for kind in [
            DirectiveKind::Image,
            DirectiveKind::Background,
            DirectiveKind::Link,
            DirectiveKind::Html,
            DirectiveKind::Caption,
        ] {
            assert!(matches!(
                directive(kind, ""),
                Err(ParseErrorKind::MissingArgument { .. })
            ));
        }
    }

    #[test]
    fn unterminated_quote() {
        assert_eq!(
            directive(DirectiveKind::Image, "\"open.png 10"),
            Err(ParseErrorKind::UnterminatedQuote {
                directive: DirectiveKind::Image
            })
        );
    }
}
