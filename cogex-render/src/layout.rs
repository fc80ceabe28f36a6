use cogex_core::{Control, HitTarget, View};

pub const QUESTION_PX: f32 = 28.0;
pub const BODY_PX: f32 = 22.0;
pub const SMALL_PX: f32 = 16.0;

const MAX_COLUMN_WIDTH: f32 = 720.0;
const ROW_GAP: f32 = 14.0;
const ROW_HEIGHT: f32 = 40.0;
const BUTTON_PAD_X: f32 = 24.0;
const ARROW_WIDTH: f32 = 44.0;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const MUTED: [u8; 4] = [150, 150, 150, 255];

/// Measures rendered text; the layout never needs more than a width.
pub trait TextMeasure {
    fn text_width(&self, text: &str, size_px: f32) -> f32;
}

/// Fixed advance per character. Used where no font is loaded.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub advance_ratio: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance_ratio: 0.6 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn text_width(&self, text: &str, size_px: f32) -> f32 {
        text.chars().count() as f32 * size_px * self.advance_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Text {
        text: String,
        size_px: f32,
        color: [u8; 4],
    },
    RadioRow {
        label: String,
        checked: bool,
        disabled: bool,
    },
    DropdownBox {
        label: String,
        disabled: bool,
    },
    DropdownArrow {
        side: ArrowSide,
        disabled: bool,
    },
    Button {
        label: String,
        enabled: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub bounds: Bounds,
    pub kind: ItemKind,
    pub hit: Option<HitTarget>,
}

/// Positioned items in draw order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub items: Vec<LayoutItem>,
}

impl Layout {
    pub fn hit_test(&self, x: f32, y: f32) -> Option<HitTarget> {
        self.items
            .iter()
            .rev()
            .filter(|item| item.bounds.contains(x, y))
            .find_map(|item| item.hit)
    }

    pub fn bounds_of(&self, target: HitTarget) -> Option<Bounds> {
        self.items
            .iter()
            .find(|item| item.hit == Some(target))
            .map(|item| item.bounds)
    }
}

struct Column {
    left: f32,
    width: f32,
    cursor: f32,
}

impl Column {
    fn take(&mut self, h: f32) -> Bounds {
        let b = Bounds::new(self.left, self.cursor, self.width, h);
        self.cursor += h + ROW_GAP;
        b
    }
}

/// Lays `view` out in a centered column: question, control, feedback slot,
/// button, instructions.
pub fn layout(view: &View, width: u32, height: u32, measure: &dyn TextMeasure) -> Layout {
    let col_width = (width as f32 * 0.8).min(MAX_COLUMN_WIDTH);
    let mut col = Column {
        left: (width as f32 - col_width) * 0.5,
        width: col_width,
        cursor: height as f32 * 0.18,
    };
    let mut items = Vec::new();

    items.push(LayoutItem {
        bounds: col.take(QUESTION_PX * 1.6),
        kind: ItemKind::Text {
            text: view.question.clone(),
            size_px: QUESTION_PX,
            color: WHITE,
        },
        hit: None,
    });
    col.cursor += ROW_GAP;

    match &view.control {
        Control::Radio {
            options,
            checked,
            disabled,
        } => {
            for (i, label) in options.iter().enumerate() {
                items.push(LayoutItem {
                    bounds: col.take(ROW_HEIGHT),
                    kind: ItemKind::RadioRow {
                        label: label.clone(),
                        checked: *checked == Some(i),
                        disabled: *disabled,
                    },
                    hit: Some(HitTarget::Option(i)),
                });
            }
        }
        Control::Dropdown {
            options,
            selected,
            disabled,
        } => {
            let label = selected
                .and_then(|i| options.get(i))
                .cloned()
                .unwrap_or_default();
            let widest = options
                .iter()
                .map(|o| measure.text_width(o, BODY_PX))
                .fold(0.0f32, f32::max);
            let box_w = (widest + BUTTON_PAD_X * 2.0)
                .max(160.0)
                .min((col.width - ARROW_WIDTH * 2.0).max(ARROW_WIDTH));
            let row = col.take(ROW_HEIGHT);
            let box_x = row.x + (row.w - box_w) * 0.5;

            items.push(LayoutItem {
                bounds: Bounds::new(box_x - ARROW_WIDTH, row.y, ARROW_WIDTH, row.h),
                kind: ItemKind::DropdownArrow {
                    side: ArrowSide::Left,
                    disabled: *disabled,
                },
                hit: Some(HitTarget::DropdownPrevious),
            });
            items.push(LayoutItem {
                bounds: Bounds::new(box_x, row.y, box_w, row.h),
                kind: ItemKind::DropdownBox {
                    label,
                    disabled: *disabled,
                },
                hit: Some(HitTarget::DropdownNext),
            });
            items.push(LayoutItem {
                bounds: Bounds::new(box_x + box_w, row.y, ARROW_WIDTH, row.h),
                kind: ItemKind::DropdownArrow {
                    side: ArrowSide::Right,
                    disabled: *disabled,
                },
                hit: Some(HitTarget::DropdownNext),
            });
        }
    }

    // slot is reserved even when empty so the button does not move
    let feedback_slot = col.take(BODY_PX * 1.6);
    if let Some(feedback) = &view.feedback {
        items.push(LayoutItem {
            bounds: feedback_slot,
            kind: ItemKind::Text {
                text: feedback.text.clone(),
                size_px: BODY_PX,
                color: feedback.tone.rgba(),
            },
            hit: None,
        });
    }

    let row = col.take(ROW_HEIGHT + 4.0);
    let button_w = measure.text_width(&view.button.label, BODY_PX) + BUTTON_PAD_X * 2.0;
    items.push(LayoutItem {
        bounds: Bounds::new(row.x + (row.w - button_w) * 0.5, row.y, button_w, row.h),
        kind: ItemKind::Button {
            label: view.button.label.clone(),
            enabled: view.button.enabled,
        },
        hit: Some(HitTarget::Button),
    });

    for line in &view.instructions {
        items.push(LayoutItem {
            bounds: col.take(SMALL_PX * 1.5),
            kind: ItemKind::Text {
                text: line.clone(),
                size_px: SMALL_PX,
                color: MUTED,
            },
            hit: None,
        });
    }

    Layout { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{Button, Feedback, Tone};

    fn view(control: Control) -> View {
        View {
            question: "Which one?".into(),
            control,
            feedback: None,
            button: Button {
                label: "Submit".into(),
                enabled: true,
            },
            instructions: vec!["Take your time.".into()],
        }
    }

    fn radio(n: usize) -> Control {
        Control::Radio {
            options: (0..n).map(|i| format!("option {i}")).collect(),
            checked: Some(0),
            disabled: false,
        }
    }

    #[test]
    fn radio_rows_are_hit_targets_in_order() {
        let layout = layout(&view(radio(3)), 1280, 720, &MonospaceMeasure::default());
        for i in 0..3 {
            let b = layout.bounds_of(HitTarget::Option(i)).unwrap();
            let (cx, cy) = b.center();
            assert_eq!(layout.hit_test(cx, cy), Some(HitTarget::Option(i)));
        }
        let first = layout.bounds_of(HitTarget::Option(0)).unwrap();
        let second = layout.bounds_of(HitTarget::Option(1)).unwrap();
        assert!(second.y > first.bottom());
    }

    #[test]
    fn button_sits_below_controls_and_instructions_below_button() {
        let layout = layout(&view(radio(2)), 1280, 720, &MonospaceMeasure::default());
        let last_row = layout.bounds_of(HitTarget::Option(1)).unwrap();
        let button = layout.bounds_of(HitTarget::Button).unwrap();
        assert!(button.y > last_row.bottom());

        let instructions = layout.items.last().unwrap();
        assert!(matches!(&instructions.kind, ItemKind::Text { text, .. } if text == "Take your time."));
        assert!(instructions.bounds.y > button.bottom());
    }

    #[test]
    fn dropdown_has_stepper_targets() {
        let control = Control::Dropdown {
            options: vec!["red".into(), "green".into()],
            selected: Some(1),
            disabled: false,
        };
        let layout = layout(&view(control), 1280, 720, &MonospaceMeasure::default());
        let prev = layout.bounds_of(HitTarget::DropdownPrevious).unwrap();
        let (cx, cy) = prev.center();
        assert_eq!(layout.hit_test(cx, cy), Some(HitTarget::DropdownPrevious));
        assert!(layout.items.iter().any(
            |item| matches!(&item.kind, ItemKind::DropdownBox { label, .. } if label == "green")
        ));
    }

    #[test]
    fn empty_dropdown_lays_out() {
        let control = Control::Dropdown {
            options: Vec::new(),
            selected: None,
            disabled: false,
        };
        let layout = layout(&view(control), 800, 600, &MonospaceMeasure::default());
        assert!(layout.bounds_of(HitTarget::Button).is_some());
    }

    #[test]
    fn feedback_does_not_move_the_button() {
        let measure = MonospaceMeasure::default();
        let mut v = view(radio(2));
        let before = layout(&v, 1280, 720, &measure).bounds_of(HitTarget::Button);
        v.feedback = Some(Feedback {
            text: "Wrong".into(),
            tone: Tone::Incorrect,
        });
        let after = layout(&v, 1280, 720, &measure);
        assert_eq!(before.map(|b| b.y), after.bounds_of(HitTarget::Button).map(|b| b.y));
        assert!(after.items.iter().any(|item| matches!(
            &item.kind,
            ItemKind::Text { color, .. } if *color == Tone::Incorrect.rgba()
        )));
    }

    #[test]
    fn misses_return_none() {
        let layout = layout(&view(radio(1)), 1280, 720, &MonospaceMeasure::default());
        assert_eq!(layout.hit_test(1.0, 1.0), None);
    }

    #[test]
    fn same_view_same_layout() {
        let v = view(radio(4));
        let m = MonospaceMeasure::default();
        assert_eq!(layout(&v, 1024, 768, &m), layout(&v, 1024, 768, &m));
    }
}
