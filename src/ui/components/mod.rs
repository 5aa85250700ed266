pub mod nav_tabs;
pub mod search_input;
