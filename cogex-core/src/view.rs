//! Visible structure of a control question.
//!
//! The widget only ever produces and mutates a [`View`]; how it ends up on
//! screen is up to the renderer the host plugs in.

/// Where a pointer event landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTarget {
    /// A radio row, or a dropdown entry when the renderer lists them
    Option(usize),
    /// Dropdown stepper arrows
    DropdownPrevious,
    DropdownNext,
    /// The submit / continue button
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Dropdown {
        options: Vec<String>,
        selected: Option<usize>,
        disabled: bool,
    },
    Radio {
        options: Vec<String>,
        checked: Option<usize>,
        disabled: bool,
    },
}

impl Control {
    pub fn options(&self) -> &[String] {
        match self {
            Control::Dropdown { options, .. } | Control::Radio { options, .. } => options,
        }
    }

    pub fn selection(&self) -> Option<usize> {
        match self {
            Control::Dropdown { selected, .. } => *selected,
            Control::Radio { checked, .. } => *checked,
        }
    }

    pub fn is_disabled(&self) -> bool {
        match self {
            Control::Dropdown { disabled, .. } | Control::Radio { disabled, .. } => *disabled,
        }
    }

    /// Selects `index`; out of range indices and locked controls are left alone.
    pub fn select(&mut self, index: usize) -> bool {
        if self.is_disabled() || index >= self.options().len() {
            return false;
        }
        match self {
            Control::Dropdown { selected, .. } => *selected = Some(index),
            Control::Radio { checked, .. } => *checked = Some(index),
        }
        true
    }

    pub fn lock(&mut self) {
        match self {
            Control::Dropdown { disabled, .. } | Control::Radio { disabled, .. } => {
                *disabled = true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Correct,
    Incorrect,
}

impl Tone {
    pub fn rgba(&self) -> [u8; 4] {
        match self {
            Tone::Correct => [0, 160, 0, 255],
            Tone::Incorrect => [210, 0, 0, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Only drawn dimmed; clicks still reach the widget.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub question: String,
    pub control: Control,
    pub feedback: Option<Feedback>,
    pub button: Button,
    pub instructions: Vec<String>,
}

/// The display slot a widget renders into. Owned by the host, lent to one
/// trial at a time.
#[derive(Debug, Default)]
pub struct Container {
    view: Option<View>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, view: View) {
        self.view = Some(view);
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut View> {
        self.view.as_mut()
    }

    pub fn clear(&mut self) {
        self.view = None;
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_none()
    }
}

/// Flattens trusted instruction HTML into display lines.
///
/// Block tags and `<br>` break lines, every other tag is dropped and the
/// common entities are decoded. Nothing is sanitized.
pub fn instruction_lines(html: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        current.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            current.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let tag = after[..close]
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if matches!(tag.as_str(), "br" | "p" | "div" | "li" | "h1" | "h2" | "h3" | "tr") {
            push_line(&mut lines, &mut current);
        }
        rest = &after[close + 1..];
    }
    current.push_str(rest);
    push_line(&mut lines, &mut current);
    lines
}

fn push_line(lines: &mut Vec<String>, current: &mut String) {
    let text = decode_entities(&current.split_whitespace().collect::<Vec<_>>().join(" "));
    if !text.is_empty() {
        lines.push(text);
    }
    current.clear();
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio() -> Control {
        Control::Radio {
            options: vec!["A".into(), "B".into()],
            checked: None,
            disabled: false,
        }
    }

    #[test]
    fn select_respects_bounds_and_lock() {
        let mut control = radio();
        assert!(!control.select(2));
        assert_eq!(control.selection(), None);
        assert!(control.select(1));
        assert_eq!(control.selection(), Some(1));
        control.lock();
        assert!(!control.select(0));
        assert_eq!(control.selection(), Some(1));
    }

    #[test]
    fn empty_control_never_selects() {
        let mut control = Control::Dropdown {
            options: Vec::new(),
            selected: None,
            disabled: false,
        };
        assert!(!control.select(0));
        assert_eq!(control.selection(), None);
    }

    #[test]
    fn tones_are_distinguishable() {
        assert_ne!(Tone::Correct.rgba(), Tone::Incorrect.rgba());
    }

    #[test]
    fn container_mount_and_clear() {
        let mut container = Container::new();
        assert!(container.is_empty());
        container.mount(View {
            question: "Q".into(),
            control: radio(),
            feedback: None,
            button: Button {
                label: "Submit".into(),
                enabled: true,
            },
            instructions: Vec::new(),
        });
        assert_eq!(container.view().map(|v| v.question.as_str()), Some("Q"));
        container.clear();
        assert!(container.is_empty());
    }

    #[test]
    fn instruction_html_flattens_to_lines() {
        let html = "<p>Select the <b>second</b> letter.</p><p>Press&nbsp;Enter<br/>to submit &amp; go on</p>";
        assert_eq!(
            instruction_lines(html),
            vec![
                "Select the second letter.".to_string(),
                "Press Enter".to_string(),
                "to submit & go on".to_string(),
            ]
        );
    }

    #[test]
    fn plain_text_and_unclosed_tags_survive() {
        assert_eq!(instruction_lines("just text"), vec!["just text".to_string()]);
        assert_eq!(instruction_lines("a < b"), vec!["a < b".to_string()]);
        assert!(instruction_lines("").is_empty());
    }
}
