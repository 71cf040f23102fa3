use serde::{Deserialize, Serialize};

/// Screens the outer navigation shell can route to. The category screen
/// receives the handle but never drives a transition itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Home,
    FoodList,
    AddCategory,
    AddEvent,
}

#[derive(Debug, Clone)]
pub struct NavHandle {
    screens: Vec<Screen>,
}

impl NavHandle {
    pub fn new(screens: Vec<Screen>) -> Self {
        Self { screens }
    }

    /// The full screen set of the application shell.
    pub fn with_default_screens() -> Self {
        Self::new(vec![
            Screen::Home,
            Screen::FoodList,
            Screen::AddCategory,
            Screen::AddEvent,
        ])
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn can_reach(&self, screen: Screen) -> bool {
        self.screens.contains(&screen)
    }
}
