use cogex_core::{instruction_lines, Button, Control, DisplayMode, View, WidgetConfig};

/// Builds the initial visible structure of a trial.
///
/// Pure in the config: question, then the option control, an empty feedback
/// slot, the submit button and finally any instructions.
pub fn render(config: &WidgetConfig) -> View {
    let options = config.options.clone();
    let control = match config.display {
        // a native select always shows its first entry as chosen
        DisplayMode::Dropdown => Control::Dropdown {
            selected: (!options.is_empty()).then_some(0),
            options,
            disabled: false,
        },
        DisplayMode::Radio => Control::Radio {
            options,
            checked: None,
            disabled: false,
        },
    };

    // greyed out until there is something to submit
    let enabled = control.selection().is_some();
    View {
        question: config.question.clone(),
        control,
        feedback: None,
        button: Button {
            label: config.button_text.clone(),
            enabled,
        },
        instructions: config
            .instructions
            .as_deref()
            .map(instruction_lines)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(display: DisplayMode) -> WidgetConfig {
        WidgetConfig::new(
            "Pick B",
            vec!["A".into(), "B".into(), "C".into()],
            1,
            "yes",
            "no",
        )
        .with_display(display)
    }

    #[test]
    fn dropdown_preselects_first_option() {
        let view = render(&config(DisplayMode::Dropdown));
        assert_eq!(view.question, "Pick B");
        assert_eq!(view.control.options().len(), 3);
        assert_eq!(view.control.selection(), Some(0));
        assert!(view.feedback.is_none());
        assert_eq!(view.button.label, "Submit");
        assert!(view.button.enabled);
    }

    #[test]
    fn radio_starts_unchecked() {
        let view = render(&config(DisplayMode::Radio));
        assert!(matches!(view.control, Control::Radio { checked: None, .. }));
        assert!(!view.button.enabled);
    }

    #[test]
    fn empty_options_render_an_empty_control() {
        let mut config = config(DisplayMode::Dropdown);
        config.options.clear();
        let view = render(&config);
        assert!(view.control.options().is_empty());
        assert_eq!(view.control.selection(), None);
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = config(DisplayMode::Radio).with_instructions("<p>Use <b>F</b> or <b>J</b></p>");
        assert_eq!(render(&config), render(&config));
        assert_eq!(render(&config).instructions, vec!["Use F or J".to_string()]);
    }
}
