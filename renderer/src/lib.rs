pub mod error;
pub mod html;
pub mod playground;
pub mod render;
pub mod rules;

pub use error::ConfigError;
pub use playground::{LanguagePlayground, NoPlayground, Playground};
pub use render::{RenderOptions, RenderWarning, Rendered, Renderer};
pub use rules::{CodeView, Kind, LinkView, ListView, Rule, Rules, SectionView, TextBody, View};
