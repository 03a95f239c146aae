pub mod db;
pub mod help_popup;
pub mod history_picker;
pub mod keybinds;
pub mod line_input;
pub mod text_editor;
pub mod ui;
