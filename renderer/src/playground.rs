use deck::Code;
use serde::Deserialize;

/// Answers whether a code block can be executed by an external service.
///
/// The renderer only asks; it never runs code itself. Implementations must
/// answer synchronously and without I/O.
pub trait Playground: Send + Sync {
    fn is_playable(&self, code: &Code) -> bool;
}

impl<F> Playground for F
where
    F: Fn(&Code) -> bool + Send + Sync,
{
    fn is_playable(&self, code: &Code) -> bool {
        self(code)
    }
}

/// Nothing is playable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlayground;

impl Playground for NoPlayground {
    fn is_playable(&self, _code: &Code) -> bool {
        false
    }
}

/// Playable when the snippet is non-empty, its language is in `languages`,
/// and either the author asked for it (`-play`) or `play_all` is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanguagePlayground {
    pub languages: Vec<String>,
    pub play_all: bool,
}

impl Playground for LanguagePlayground {
    fn is_playable(&self, code: &Code) -> bool {
        if code.text.trim().is_empty() || !(code.play || self.play_all) {
            return false;
        }
        code.language
            .as_deref()
            .is_some_and(|lang| self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(text: &str, language: Option<&str>, play: bool) -> Code {
        Code {
            text: text.into(),
            language: language.map(String::from),
            play,
            ..Code::default()
        }
    }

    #[test]
    fn language_playground() {
        let pg = LanguagePlayground {
            languages: vec!["go".into(), "Rust".into()],
            play_all: false,
        };
        assert!(pg.is_playable(&code("fn main() {}", Some("rust"), true)));
        assert!(!pg.is_playable(&code("fn main() {}", Some("rust"), false)));
        assert!(!pg.is_playable(&code("   ", Some("go"), true)));
        assert!(!pg.is_playable(&code("x", Some("python"), true)));
        assert!(!pg.is_playable(&code("x", None, true)));

        let all = LanguagePlayground {
            play_all: true,
            ..pg
        };
        assert!(all.is_playable(&code("package main", Some("go"), false)));
    }

    #[test]
    fn closures_are_playgrounds() {
        let pg = |c: &Code| c.edit;
        assert!(!pg.is_playable(&Code::default()));
        assert!(!NoPlayground.is_playable(&code("x", Some("go"), true)));
    }
}
