use crate::element::{Element, Origin};

/// A parsed slide deck: the ordered list of top-level sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Every section at every depth, in document (pre-order) order.
    pub fn walk(&self) -> Sections<'_> {
        Sections::new(&self.sections)
    }

    pub fn section_count(&self) -> usize {
        self.walk().count()
    }

    pub fn element_count(&self) -> usize {
        self.walk().map(|section| section.elements.len()).sum()
    }
}

/// A titled, numbered slide or sub-slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Hierarchical position, e.g. `[2, 1]` for the first subsection of the
    /// second top-level section. Never empty.
    pub number: Vec<usize>,
    /// Raw title text; styled at render time.
    pub title: String,
    /// Content in document order. Always precedes `children` in the source.
    pub elements: Vec<Element>,
    pub children: Vec<Section>,
    /// 1-based source line of the header.
    pub line: usize,
    /// 1-based character column where the title starts on the header line.
    pub title_column: usize,
}

impl Section {
    pub fn depth(&self) -> usize {
        self.number.len()
    }

    /// Dot-joined form of the number, e.g. `"2.1"`.
    pub fn formatted_number(&self) -> String {
        self.number
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn title_origin(&self) -> Origin {
        Origin::new(self.line, self.title_column)
    }

    /// This section followed by all of its descendants, pre-order.
    pub fn walk(&self) -> Sections<'_> {
        Sections::new(std::slice::from_ref(self))
    }
}

/// Pre-order iterator over a section forest.
pub struct Sections<'a> {
    stack: Vec<&'a Section>,
}

impl<'a> Sections<'a> {
    fn new(roots: &'a [Section]) -> Self {
        Sections {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Sections<'a> {
    type Item = &'a Section;

    fn next(&mut self) -> Option<&'a Section> {
        let section = self.stack.pop()?;
        self.stack.extend(section.children.iter().rev());
        Some(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Caption;

    fn section(number: &[usize], children: Vec<Section>) -> Section {
        Section {
            number: number.to_vec(),
            title: format!("S{}", number.len()),
            elements: vec![Element::Caption(Caption {
                text: "c".into(),
                origin: Origin::new(2, 10),
            })],
            children,
            line: 1,
            title_column: 3,
        }
    }

    #[test]
    fn walk_is_pre_order() {
        let doc = Document {
            sections: vec![
                section(&[1], vec![section(&[1, 1], vec![]), section(&[1, 2], vec![])]),
                section(&[2], vec![section(&[2, 1], vec![section(&[2, 1, 1], vec![])])]),
            ],
        };
        let numbers: Vec<String> = doc.walk().map(Section::formatted_number).collect();
        assert_eq!(numbers, ["1", "1.1", "1.2", "2", "2.1", "2.1.1"]);
        assert_eq!(doc.section_count(), 6);
        assert_eq!(doc.element_count(), 6);
        assert!(!doc.is_empty());
        assert!(Document::default().is_empty());
    }

    #[test]
    fn depth_follows_number_length() {
        let s = section(&[3, 2, 1], vec![]);
        assert_eq!(s.depth(), 3);
        assert_eq!(s.formatted_number(), "3.2.1");
        assert_eq!(s.title_origin(), Origin::new(1, 3));
    }
}
