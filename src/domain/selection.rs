#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: Option<String>,
}

impl Selection {
    pub fn select(&mut self, site_name: impl Into<String>) {
        self.active = Some(site_name.into());
    }

    pub fn deselect(&mut self) {
        self.active = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_selected(&self, site_name: &str) -> bool {
        self.current() == Some(site_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_deselect() {
        let mut selection = Selection::default();
        assert_eq!(selection.current(), None);

        selection.select("Site A");
        assert_eq!(selection.current(), Some("Site A"));
        assert!(selection.is_selected("Site A"));
        assert!(!selection.is_selected("Site B"));

        selection.select("Site B");
        assert_eq!(selection.current(), Some("Site B"));

        selection.deselect();
        assert_eq!(selection.current(), None);
    }
}
