//! Line-oriented presentation layer

use app_core::{Affordance, PreviewImage, View};
use app_fs::Entry;
use chrono::{DateTime, Local};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// What the console last showed, shared with the command loop
#[derive(Default)]
pub struct Screen {
    pub entries: Vec<Entry>,
    pub address: String,
    pub affordance: Affordance,
    pub connected: bool,
}

impl Screen {
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn prompt(&self) -> String {
        let mut flags = String::new();
        if self.affordance.back {
            flags.push('<');
        }
        if self.affordance.forward {
            flags.push('>');
        }
        if self.affordance.up {
            flags.push('^');
        }
        format!("{} [{}]> ", self.address, flags)
    }
}

pub fn format_entry(index: usize, entry: &Entry) -> String {
    let kind = if entry.is_dir() {
        "<DIR>".to_string()
    } else if entry.is_navigable() {
        "<ZIP>".to_string()
    } else {
        entry.size().map(format_size).unwrap_or_default()
    };
    let modified = entry
        .modified()
        .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!("{:>4}  {:<16}  {:>10}  {}", index, modified, kind, entry.name())
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub struct ConsoleView {
    screen: Rc<RefCell<Screen>>,
}

impl ConsoleView {
    pub fn new(screen: Rc<RefCell<Screen>>) -> Self {
        Self { screen }
    }
}

/// Print the stored listing
pub fn print_listing(screen: &Screen) {
    if screen.entries.is_empty() {
        println!("  (empty)");
    }
    for (i, entry) in screen.entries.iter().enumerate() {
        println!("{}", format_entry(i, entry));
    }
}

impl View for ConsoleView {
    fn on_list_updated(&mut self, parent: Option<&Entry>, children: &[Entry]) {
        let mut screen = self.screen.borrow_mut();
        screen.entries = children.to_vec();
        if let Some(parent) = parent {
            println!("  (up: {})", parent.path_string());
        }
        print_listing(&screen);
    }

    fn on_preview_text(&mut self, text: &str) {
        println!("----- preview -----\n{}\n-------------------", text);
    }

    fn on_preview_image(&mut self, image: &PreviewImage) {
        println!("[image preview {}x{}, {} bytes RGBA]", image.width, image.height, image.data.len());
    }

    fn on_preview_meta(&mut self, name: &str, modified: Option<DateTime<Local>>, size: Option<u64>) {
        let modified = modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = size.map(format_size).unwrap_or_else(|| "-".to_string());
        println!("{}  modified {}  size {}", name, modified, size);
    }

    fn on_address_changed(&mut self, address: &str, editable: bool) {
        let mut screen = self.screen.borrow_mut();
        screen.address = address.to_string();
        if !editable {
            tracing::debug!("Address {} is not editable", address);
        }
    }

    fn on_navigation_affordance(&mut self, affordance: Affordance) {
        self.screen.borrow_mut().affordance = affordance;
    }

    fn on_error(&mut self, message: &str) {
        println!("error: {}", message);
    }

    fn on_preview_error(&mut self, message: &str) {
        println!("preview error: {}", message);
    }

    fn on_remote_connected(&mut self) {
        self.screen.borrow_mut().connected = true;
        println!("Connected.");
    }

    fn on_remote_disconnected(&mut self) {
        self.screen.borrow_mut().connected = false;
        println!("Disconnected.");
    }

    fn on_busy(&mut self) {
        print!("... ");
        let _ = std::io::stdout().flush();
    }

    fn on_idle(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_fs::LocalEntry;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(5), "5 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_prompt_flags() {
        let screen = Screen {
            address: "/tmp".to_string(),
            affordance: Affordance {
                back: true,
                forward: false,
                up: true,
            },
            ..Screen::default()
        };
        assert_eq!(screen.prompt(), "/tmp [<^]> ");
    }

    #[test]
    fn test_view_stores_listing() {
        let screen = Rc::new(RefCell::new(Screen::default()));
        let mut view = ConsoleView::new(Rc::clone(&screen));
        let children = vec![Entry::Local(LocalEntry::directory("/tmp/sub"))];

        view.on_list_updated(None, &children);
        view.on_address_changed("/tmp", true);
        assert_eq!(screen.borrow().entry(0).map(Entry::name), Some("sub"));
        assert!(screen.borrow().entry(1).is_none());
        assert_eq!(screen.borrow().address, "/tmp");
    }

    #[test]
    fn test_format_directory_entry() {
        let line = format_entry(2, &Entry::Local(LocalEntry::directory("/tmp/sub")));
        assert!(line.contains("<DIR>"));
        assert!(line.ends_with("sub"));
    }
}
