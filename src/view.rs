use crate::pipeline::AnnotatedLine;

/// Which rendered lines the viewer shows. Applied after a pass, never inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Hide lines marked excluded.
    pub only_filtered: bool,
    /// Hide lines with no text.
    pub hide_empty: bool,
}

impl ViewOptions {
    /// Whether some lines may be hidden.
    pub fn is_projecting(&self) -> bool {
        self.only_filtered || self.hide_empty
    }

    pub fn is_visible(&self, line: &AnnotatedLine) -> bool {
        !(self.only_filtered && line.excluded) && !(self.hide_empty && line.text.is_empty())
    }

    pub fn project<'a>(&self, lines: &'a [AnnotatedLine]) -> Vec<&'a AnnotatedLine> {
        lines.iter().filter(|l| self.is_visible(l)).collect()
    }
}

/// Lines as plain text, optionally prefixed with their line number.
pub fn export_text(lines: &[&AnnotatedLine], with_line_numbers: bool) -> String {
    lines
        .iter()
        .map(|line| {
            if with_line_numbers {
                format!("{} {}", line.number, line.text)
            } else {
                line.text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
