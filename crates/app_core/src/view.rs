//! Callbacks from the engine to the presentation layer
//!
//! All methods are invoked on the thread that pumps the [`Browser`](crate::Browser).

use app_fs::Entry;
use chrono::{DateTime, Local};

/// Scaled RGBA8 image ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Which navigation buttons are usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Affordance {
    pub back: bool,
    pub forward: bool,
    pub up: bool,
}

pub trait View {
    /// Full contents of the directory just navigated to
    fn on_list_updated(&mut self, parent: Option<&Entry>, children: &[Entry]);

    fn on_preview_text(&mut self, text: &str);

    fn on_preview_image(&mut self, image: &PreviewImage);

    fn on_preview_meta(&mut self, name: &str, modified: Option<DateTime<Local>>, size: Option<u64>);

    fn on_address_changed(&mut self, address: &str, editable: bool);

    fn on_navigation_affordance(&mut self, affordance: Affordance);

    fn on_error(&mut self, message: &str);

    fn on_preview_error(&mut self, message: &str);

    fn on_remote_connected(&mut self);

    fn on_remote_disconnected(&mut self);

    fn on_busy(&mut self);

    fn on_idle(&mut self);
}
