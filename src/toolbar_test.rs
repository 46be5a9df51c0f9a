use super::*;

#[test]
fn curated_items_in_order() {
    let items = default_tool_items();
    let actions: Vec<&str> = items.iter().map(|i| i.action.as_str()).collect();
    assert_eq!(actions, ["home", "back", "forward", "pan", "zoom", "download", "export"]);
}

#[test]
fn items_use_view_icon_names() {
    let toolbar = Toolbar::new(ButtonStyle::None, ToolbarPosition::Left);
    let icons: Vec<&str> = toolbar.items().iter().map(|i| i.icon.as_str()).collect();
    assert_eq!(icons, ["home", "arrow-left", "arrow-right", "arrows", "square-o", "floppy-o", "file-picture-o"]);
    assert!(toolbar.items().iter().all(|i| !i.tooltip.is_empty()));
}

#[test]
fn modes_are_exclusive() {
    let mut toolbar = Toolbar::new(ButtonStyle::Primary, ToolbarPosition::Left);
    assert_eq!(toolbar.mode(), NavMode::None);
    assert_eq!(toolbar.toggle(NavMode::Pan), NavMode::Pan);
    assert_eq!(toolbar.toggle(NavMode::Zoom), NavMode::Zoom);
    assert_eq!(toolbar.toggle(NavMode::Zoom), NavMode::None);
}

#[test]
fn orientation_follows_position() {
    let mut toolbar = Toolbar::new(ButtonStyle::None, ToolbarPosition::Top);
    assert_eq!(toolbar.orientation(), Orientation::Horizontal);
    toolbar.set_position(ToolbarPosition::Right);
    assert_eq!(toolbar.orientation(), Orientation::Vertical);
}

#[test]
fn starts_collapsed() {
    let mut toolbar = Toolbar::new(ButtonStyle::Info, ToolbarPosition::Left);
    assert!(toolbar.collapsed());
    toolbar.set_collapsed(false);
    assert!(!toolbar.collapsed());
    assert_eq!(toolbar.button_style(), ButtonStyle::Info);
}

#[test]
fn commands_for_actions() {
    assert_eq!(Toolbar::command_for("home"), Some(ToolbarCommand::Navigate("home".into())));
    assert_eq!(Toolbar::command_for("pan"), Some(ToolbarCommand::Toggle(NavMode::Pan)));
    assert_eq!(Toolbar::command_for("zoom"), Some(ToolbarCommand::Toggle(NavMode::Zoom)));
    assert_eq!(Toolbar::command_for("save_figure"), Some(ToolbarCommand::Download));
    assert_eq!(Toolbar::command_for("download"), Some(ToolbarCommand::Download));
    assert_eq!(Toolbar::command_for("export"), Some(ToolbarCommand::Export));
    assert_eq!(Toolbar::command_for("configure_subplots"), None);
}

#[test]
fn style_and_position_parse() {
    assert_eq!("Warning".parse::<ButtonStyle>(), Ok(ButtonStyle::Warning));
    assert_eq!("".parse::<ButtonStyle>(), Ok(ButtonStyle::None));
    assert_eq!("sideways".parse::<ToolbarPosition>(), Err(()));
}
