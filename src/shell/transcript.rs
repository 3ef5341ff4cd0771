//! The ordered record of everything rendered in a session.
//!
//! Text is addressed by character offset. Everything before the prompt-start
//! mark is immutable: [`Transcript::insert`] and [`Transcript::delete`] refuse
//! to touch it and report a no-op instead.

/// How a piece of text should be drawn. Interpretation is up to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTag {
    Plain,
    Prompt,
    Input,
    Label,
    Diagnostic,
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: StyleTag,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<Segment>,
    len: usize,
    prompt_start: usize,
    generation: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Bumped by every [`Transcript::clear_all`], so views can tell a wipe
    /// apart from ordinary growth.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn append(&mut self, text: &str, style: StyleTag) {
        if text.is_empty() {
            return;
        }
        self.len += text.chars().count();
        match self.segments.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.segments.push(Segment {
                text: text.to_string(),
                style,
            }),
        }
    }

    pub fn append_line(&mut self, text: &str, style: StyleTag) {
        self.append(text, style);
        self.append("\n", style);
    }

    /// Records the current end as the start of the editable region.
    pub fn mark_prompt_start(&mut self) {
        self.prompt_start = self.len;
    }

    pub fn prompt_start(&self) -> usize {
        self.prompt_start
    }

    /// Whether text may be inserted at `offset`.
    pub fn is_editable(&self, offset: usize) -> bool {
        offset >= self.prompt_start && offset <= self.len
    }

    /// Inserts `text` at `offset`. Returns false, leaving the content
    /// untouched, when the offset lies in the protected history.
    pub fn insert(&mut self, offset: usize, text: &str) -> bool {
        if !self.is_editable(offset) {
            return false;
        }
        if text.is_empty() {
            return true;
        }
        if offset == self.len {
            self.append(text, StyleTag::Input);
            return true;
        }

        let (index, within) = self.locate(offset);
        let segment = &mut self.segments[index];
        if segment.style == StyleTag::Input {
            let at = byte_index(&segment.text, within);
            segment.text.insert_str(at, text);
        } else {
            let at = byte_index(&segment.text, within);
            let tail = segment.text.split_off(at);
            let style = segment.style;
            let mut position = index + 1;
            if at == 0 {
                // Nothing was split off the front; keep the segment order.
                self.segments.remove(index);
                position = index;
            }
            let mut inserted = vec![Segment {
                text: text.to_string(),
                style: StyleTag::Input,
            }];
            if !tail.is_empty() {
                inserted.push(Segment { text: tail, style });
            }
            self.segments.splice(position..position, inserted);
        }
        self.len += text.chars().count();
        true
    }

    /// Deletes the character at `offset`. Returns false when it is part of
    /// the protected history or past the end.
    pub fn delete(&mut self, offset: usize) -> bool {
        if offset < self.prompt_start || offset >= self.len {
            return false;
        }
        let (index, within) = self.locate(offset);
        let segment = &mut self.segments[index];
        let at = byte_index(&segment.text, within);
        segment.text.remove(at);
        if segment.text.is_empty() {
            self.segments.remove(index);
        }
        self.len -= 1;
        true
    }

    /// Removes everything, including the prompt mark.
    pub fn clear_all(&mut self) {
        self.segments.clear();
        self.len = 0;
        self.prompt_start = 0;
        self.generation += 1;
    }

    /// Text from the prompt-start mark to the end.
    pub fn editable_text(&self) -> String {
        self.text().chars().skip(self.prompt_start).collect()
    }

    /// The last line of the transcript, without its terminator.
    pub fn current_line(&self) -> String {
        let text = self.text();
        let trimmed = text.strip_suffix('\n').unwrap_or(&text);
        match trimmed.rfind('\n') {
            Some(pos) => trimmed[pos + 1..].to_string(),
            None => trimmed.to_string(),
        }
    }

    /// Segments covering `offset..`, split at `offset` when necessary.
    pub fn segments_from(&self, offset: usize) -> Vec<Segment> {
        let mut out = Vec::new();
        let mut seen = 0;
        for segment in &self.segments {
            let count = segment.text.chars().count();
            if seen + count > offset {
                let skip = offset.saturating_sub(seen);
                out.push(Segment {
                    text: segment.text.chars().skip(skip).collect(),
                    style: segment.style,
                });
            }
            seen += count;
        }
        out
    }

    /// Segment index and character offset within it. `offset` must be < len.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut seen = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            let count = segment.text.chars().count();
            if offset < seen + count {
                return (index, offset - seen);
            }
            seen += count;
        }
        (self.segments.len().saturating_sub(1), 0)
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_prompt(history: &str, prompt: &str) -> Transcript {
        let mut transcript = Transcript::new();
        transcript.append(history, StyleTag::Plain);
        transcript.append(prompt, StyleTag::Prompt);
        transcript.mark_prompt_start();
        transcript
    }

    #[test]
    fn test_append_merges_same_style() {
        let mut transcript = Transcript::new();
        transcript.append_line("one", StyleTag::Plain);
        transcript.append_line("two", StyleTag::Plain);
        transcript.append_line("bad", StyleTag::Diagnostic);

        assert_eq!(transcript.segments().len(), 2);
        assert_eq!(transcript.text(), "one\ntwo\nbad\n");
        assert_eq!(transcript.len(), 12);
    }

    #[test]
    fn test_typing_after_prompt() {
        let mut transcript = with_prompt("old\n", "/tmp>");
        let end = transcript.len();

        assert!(transcript.insert(end, "ls"));
        assert!(transcript.insert(end, "x"));
        assert_eq!(transcript.editable_text(), "xls");
        assert_eq!(transcript.current_line(), "/tmp>xls");
    }

    #[test]
    fn test_history_is_immutable() {
        let mut transcript = with_prompt("old\n", "/tmp>");
        let mark = transcript.prompt_start();
        let before = transcript.text();

        assert!(!transcript.insert(0, "x"));
        assert!(!transcript.insert(mark - 1, "x"));
        assert!(!transcript.delete(mark - 1));
        assert!(!transcript.delete(0));
        assert_eq!(transcript.text(), before);
    }

    #[test]
    fn test_delete_in_editable_region() {
        let mut transcript = with_prompt("", ">");
        transcript.insert(1, "abc");

        assert!(transcript.delete(2));
        assert_eq!(transcript.text(), ">ac");
        assert!(!transcript.delete(3));
    }

    #[test]
    fn test_insert_inside_output_after_mark() {
        let mut transcript = with_prompt("", ">");
        transcript.append("done", StyleTag::Plain);

        assert!(transcript.insert(3, "-"));
        assert_eq!(transcript.text(), ">do-ne");
        let styles: Vec<_> = transcript.segments().iter().map(|s| s.style).collect();
        assert_eq!(
            styles,
            vec![StyleTag::Prompt, StyleTag::Plain, StyleTag::Input, StyleTag::Plain]
        );
    }

    #[test]
    fn test_multibyte_offsets() {
        let mut transcript = with_prompt("值🦀\n", ">");
        let end = transcript.len();
        assert_eq!(end, 4);
        assert!(transcript.insert(end, "é"));
        assert!(transcript.delete(end));
        assert_eq!(transcript.text(), "值🦀\n>");
    }

    #[test]
    fn test_clear_all() {
        let mut transcript = with_prompt("a\nb\n", "/x>");
        let generation = transcript.generation();
        transcript.clear_all();

        assert!(transcript.is_empty());
        assert_eq!(transcript.prompt_start(), 0);
        assert_eq!(transcript.generation(), generation + 1);
    }

    #[test]
    fn test_segments_from() {
        let mut transcript = Transcript::new();
        transcript.append("hello ", StyleTag::Label);
        transcript.append("world", StyleTag::Plain);

        let tail = transcript.segments_from(3);
        assert_eq!(tail[0].text, "lo ");
        assert_eq!(tail[1].text, "world");
        assert!(transcript.segments_from(11).is_empty());
    }
}
