//! Detail overlay selection state.

use cashper_core::{Entity, EntityId};

/// Which single entity is open for detail viewing.
#[derive(Debug, Clone)]
pub struct DetailSelection<T> {
    selected: Option<T>,
    visible: bool,
}

impl<T> Default for DetailSelection<T> {
    fn default() -> Self {
        Self {
            selected: None,
            visible: false,
        }
    }
}

impl<T: Entity> DetailSelection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, entity: T) {
        self.selected = Some(entity);
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.selected = None;
        self.visible = false;
    }

    /// Close only if `id` is still the open entity.
    ///
    /// Returns whether the overlay was closed.
    pub fn close_if(&mut self, id: &EntityId) -> bool {
        if self.is_showing(id) {
            self.close();
            true
        } else {
            false
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    pub fn is_showing(&self, id: &EntityId) -> bool {
        self.visible && self.selected.as_ref().map(|e| e.id() == id).unwrap_or(false)
    }

    /// Keep the open entity in sync with a newer copy (e.g. after a status change).
    pub fn replace_if_showing(&mut self, entity: &T) {
        if self.is_showing(entity.id()) {
            self.selected = Some(entity.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashper_core::Record;
    use serde_json::json;

    fn record(id: i64) -> Record {
        serde_json::from_value(json!({"id": id, "status": "Pending"})).unwrap()
    }

    #[test]
    fn open_and_close() {
        let mut d = DetailSelection::new();
        assert!(!d.is_visible());

        d.open(record(1));
        assert!(d.is_visible());
        assert!(d.is_showing(&EntityId::Number(1)));

        d.close();
        assert!(!d.is_visible());
        assert!(d.selected().is_none());
    }

    #[test]
    fn close_if_ignores_other_entities() {
        let mut d = DetailSelection::new();
        d.open(record(2));
        assert!(!d.close_if(&EntityId::Number(1)));
        assert!(d.is_visible());
        assert!(d.close_if(&EntityId::Number(2)));
        assert!(!d.is_visible());
    }

    #[test]
    fn replace_if_showing_updates_open_entity_only() {
        let mut d = DetailSelection::new();
        d.open(record(1));

        let mut other = record(2);
        other.set_status("Approved");
        d.replace_if_showing(&other);
        assert_eq!(d.selected().unwrap().status(), Some("Pending"));

        let mut same = record(1);
        same.set_status("Approved");
        d.replace_if_showing(&same);
        assert_eq!(d.selected().unwrap().status(), Some("Approved"));
    }
}
