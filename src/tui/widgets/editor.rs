use ratatui::layout::Rect;
use std::cmp;

/// Small text buffer behind every input field and the import box.
/// Columns are counted in chars, never bytes.
#[derive(Debug, Clone)]
pub struct Editor {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize,
    pub scroll_col: usize,
    /// Single-line editors turn newlines into spaces
    pub multi_line: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            scroll_offset: 0,
            scroll_col: 0,
            multi_line: false,
        }
    }

    pub fn multi_line() -> Self {
        Self {
            multi_line: true,
            ..Self::new()
        }
    }

    /// Editor pre-filled with `content`, cursor at the end
    pub fn from_string(content: &str) -> Self {
        let mut editor = Self::new();
        editor.insert_str(content);
        editor
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    fn current_line_len(&self) -> usize {
        self.lines
            .get(self.cursor_line)
            .map_or(0, |l| l.chars().count())
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices().nth(col).map_or(line.len(), |(i, _)| i)
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            if self.multi_line {
                self.insert_newline();
            } else {
                self.insert_char(' ');
            }
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let at = Self::byte_index(line, col);
            line.insert(at, ch);
            self.cursor_col = col + 1;
        }
    }

    /// Insert pasted text one line segment at a time. `\r\n` is normalized first.
    pub fn insert_str(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        for (i, segment) in text.split(['\n', '\r']).enumerate() {
            if i > 0 {
                if self.multi_line {
                    self.insert_newline();
                } else {
                    self.insert_segment(" ");
                }
            }
            self.insert_segment(segment);
        }
    }

    fn insert_segment(&mut self, segment: &str) {
        if segment.is_empty() {
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let at = Self::byte_index(line, col);
            line.insert_str(at, segment);
            self.cursor_col = col + segment.chars().count();
        }
    }

    pub fn insert_newline(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        let Some(line) = self.lines.get_mut(self.cursor_line) else {
            return;
        };
        let at = Self::byte_index(line, col);
        let remainder = line.split_off(at);
        self.lines.insert(self.cursor_line + 1, remainder);
        self.cursor_line += 1;
        self.cursor_col = 0;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if col > 0 {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let at = Self::byte_index(line, col - 1);
                line.remove(at);
                self.cursor_col = col - 1;
            }
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            if let Some(prev) = self.lines.get_mut(self.cursor_line) {
                prev.push_str(&current);
            }
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len()) - 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.current_line_len() {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.current_line_len();
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Lines in view, already scrolled horizontally and clipped to the inner width
    pub fn get_visible_lines(&self, viewport_height: usize, viewport_width: usize) -> Vec<String> {
        let start = cmp::min(self.scroll_offset, self.lines.len());
        let end = cmp::min(start + viewport_height, self.lines.len());
        self.lines[start..end]
            .iter()
            .map(|line| line.chars().skip(self.scroll_col).take(viewport_width).collect())
            .collect()
    }

    /// Keep the cursor inside a viewport of the given inner size
    pub fn update_scroll(&mut self, viewport_height: usize, viewport_width: usize) {
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if viewport_height > 0 && self.cursor_line >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor_line + 1 - viewport_height;
        }

        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        } else if viewport_width > 0 && self.cursor_col >= self.scroll_col + viewport_width {
            self.scroll_col = self.cursor_col + 1 - viewport_width;
        }
    }

    /// Terminal position of the cursor inside a bordered `area`
    pub fn get_cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let row = self.cursor_line.checked_sub(self.scroll_offset)?;
        let col = self.cursor_col.checked_sub(self.scroll_col)?;
        let inner_height = area.height.saturating_sub(2) as usize;
        let inner_width = area.width.saturating_sub(2) as usize;
        if row >= inner_height || col >= inner_width {
            return None;
        }
        Some((area.x + 1 + col as u16, area.y + 1 + row as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_delete_multibyte_chars() {
        let mut editor = Editor::new();
        editor.insert_str("Bài");
        assert_eq!(editor.cursor_col, 3);
        editor.delete_char();
        assert_eq!(editor.text(), "Bà");
        editor.move_cursor_left();
        editor.insert_char('x');
        assert_eq!(editor.text(), "Bxà");
    }

    #[test]
    fn test_single_line_editor_flattens_newlines() {
        let mut editor = Editor::from_string("a\nb");
        assert_eq!(editor.lines.len(), 1);
        assert_eq!(editor.text(), "a b");
        editor.insert_newline();
        assert_eq!(editor.lines.len(), 2);
    }

    #[test]
    fn test_multi_line_paste_and_backspace_joins_lines() {
        let mut editor = Editor::multi_line();
        editor.insert_str("Toán\tBài 1\r\nVăn\tBài 2");
        assert_eq!(editor.lines, vec!["Toán\tBài 1", "Văn\tBài 2"]);

        editor.move_cursor_home();
        editor.delete_char();
        assert_eq!(editor.lines.len(), 1);
        assert_eq!(editor.cursor_col, "Toán\tBài 1".chars().count());
    }

    #[test]
    fn test_paste_in_middle_of_line_splits_around_cursor() {
        let mut editor = Editor::multi_line();
        editor.insert_str("Toán|Lý");
        for _ in 0.."Lý".chars().count() {
            editor.move_cursor_left();
        }
        editor.insert_str("Hóa\nSinh ");
        assert_eq!(editor.lines, vec!["Toán|Hóa", "Sinh Lý"]);
        assert_eq!((editor.cursor_line, editor.cursor_col), (1, 5));
    }

    #[test]
    fn test_large_single_line_paste() {
        let payload = format!("[{}]", vec![r#"{"name": "Bài học"}"#; 20_000].join(","));
        let mut editor = Editor::multi_line();
        editor.insert_str(&payload);
        assert_eq!(editor.lines.len(), 1);
        assert_eq!(editor.text(), payload);
        assert_eq!(editor.cursor_col, payload.chars().count());
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut editor = Editor::multi_line();
        editor.insert_str("1\n2\n3\n4\n5");
        editor.update_scroll(2, 10);
        assert_eq!(editor.scroll_offset, 3);
        assert_eq!(editor.get_visible_lines(2, 10), vec!["4", "5"]);
        assert_eq!(editor.get_cursor_screen_pos(Rect::new(0, 0, 12, 4)), Some((2, 2)));
    }
}
