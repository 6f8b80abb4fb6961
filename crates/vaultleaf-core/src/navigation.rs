//! Folder navigation state.
//!
//! The navigator only tracks where the user is. It never touches the disk;
//! the browser checks that a folder exists before entering it and resets the
//! navigator when a reload finds the current folder gone.

use crate::error::Result;
use crate::store::RelativePath;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpOutcome {
    Moved,
    /// Already at the root; the host should apply its own back behaviour.
    AtRoot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    current: RelativePath,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &RelativePath {
        &self.current
    }

    pub fn at_root(&self) -> bool {
        self.current.is_root()
    }

    pub fn enter(&mut self, folder: &str) -> Result<&RelativePath> {
        self.current = self.current.join(folder)?;
        debug!(path = %self.current, "Entered folder");
        Ok(&self.current)
    }

    pub fn up(&mut self) -> UpOutcome {
        match self.current.parent() {
            Some(parent) => {
                self.current = parent;
                debug!(path = %self.current, "Moved up");
                UpOutcome::Moved
            }
            None => UpOutcome::AtRoot,
        }
    }

    pub fn reset(&mut self) {
        self.current = RelativePath::root();
    }

    /// Folder name for the title bar, or the application title at the root.
    pub fn title(&self, app_title: &str) -> String {
        self.current.leaf().unwrap_or(app_title).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_enter_up_equals_single_enter() {
        let mut walked = Navigator::new();
        walked.enter("A").expect("enter A");
        walked.enter("B").expect("enter B");
        assert_eq!(walked.up(), UpOutcome::Moved);

        let mut direct = Navigator::new();
        direct.enter("A").expect("enter A");
        assert_eq!(walked, direct);
        assert_eq!(walked.title("Vault"), "A");
    }

    #[test]
    fn up_at_root_is_a_no_op() {
        let mut nav = Navigator::new();
        assert_eq!(nav.up(), UpOutcome::AtRoot);
        assert!(nav.at_root());
        assert_eq!(nav.title("Vault"), "Vault");
    }

    #[test]
    fn invalid_folder_names_leave_state_untouched() {
        let mut nav = Navigator::new();
        nav.enter("docs").expect("enter");
        assert!(nav.enter("..").is_err());
        assert!(nav.enter("a/b").is_err());
        assert_eq!(nav.current().to_string(), "docs");
    }

    #[test]
    fn reset_returns_to_root() {
        let mut nav = Navigator::new();
        nav.enter("x").expect("enter");
        nav.enter("y").expect("enter");
        nav.reset();
        assert!(nav.at_root());
    }
}
