//! Ordered track settings list; order is the on-screen stacking order.

use crate::error::{LocusViewError, Result};
use crate::track_settings::TrackSettings;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftDirection {
    Up,
    Down,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackCollection {
    tracks: Vec<TrackSettings>,
}

impl TrackCollection {
    pub fn all(&self) -> &[TrackSettings] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn position_of(&self, track_id: &str) -> Result<usize> {
        let mut matches = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.track_id() == track_id);
        let (index, _) = matches.next().ok_or_else(|| {
            LocusViewError::contract(format!("no track with id '{track_id}'"))
        })?;
        if matches.next().is_some() {
            return Err(LocusViewError::contract(format!(
                "multiple tracks with id '{track_id}'"
            )));
        }
        Ok(index)
    }

    /// Exactly-one lookup; zero or multiple matches are contract violations.
    pub fn get(&self, track_id: &str) -> Result<&TrackSettings> {
        let index = self.position_of(track_id)?;
        Ok(&self.tracks[index])
    }

    pub fn get_mut(&mut self, track_id: &str) -> Result<&mut TrackSettings> {
        let index = self.position_of(track_id)?;
        Ok(&mut self.tracks[index])
    }

    pub fn push(&mut self, settings: TrackSettings) {
        self.tracks.push(settings);
    }

    pub fn remove(&mut self, track_id: &str) -> Result<TrackSettings> {
        let index = self.position_of(track_id)?;
        Ok(self.tracks.remove(index))
    }

    /// Bulk replace, used by the synchronizer and layout application.
    pub fn set_all(&mut self, tracks: Vec<TrackSettings>) {
        self.tracks = tracks;
    }

    /// Extracts a track and reinserts it at `position` (clamped to the end).
    pub fn move_to_position(&mut self, track_id: &str, position: usize) -> Result<()> {
        let index = self.position_of(track_id)?;
        let settings = self.tracks.remove(index);
        let position = position.min(self.tracks.len());
        self.tracks.insert(position, settings);
        Ok(())
    }

    /// Swaps a track with its neighbor; no-op at the boundaries.
    pub fn shift(&mut self, track_id: &str, direction: ShiftDirection) -> Result<()> {
        let index = self.position_of(track_id)?;
        match direction {
            ShiftDirection::Up => {
                if index > 0 {
                    self.tracks.swap(index, index - 1);
                }
            }
            ShiftDirection::Down => {
                if index + 1 < self.tracks.len() {
                    self.tracks.swap(index, index + 1);
                }
            }
        }
        Ok(())
    }

    pub fn toggle_hidden(&mut self, track_id: &str) -> Result<()> {
        let settings = self.get_mut(track_id)?;
        settings.is_hidden = !settings.is_hidden;
        Ok(())
    }

    pub fn toggle_expanded(&mut self, track_id: &str) -> Result<()> {
        let settings = self.get_mut(track_id)?;
        settings.is_expanded = !settings.is_expanded;
        Ok(())
    }

    pub fn set_y_axis_range(&mut self, track_id: &str, range: (f64, f64)) -> Result<()> {
        let settings = self.get_mut(track_id)?;
        if let Some(y_axis) = settings.y_axis.as_mut() {
            y_axis.range = range;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::Sample;

    fn collection_of(n: usize) -> (TrackCollection, Vec<String>) {
        let mut collection = TrackCollection::default();
        let mut ids = vec![];
        for _ in 0..n {
            let settings = TrackSettings::new_gene();
            ids.push(settings.track_id().to_string());
            collection.push(settings);
        }
        (collection, ids)
    }

    #[test]
    fn test_get_missing_is_contract_violation() {
        let (collection, _) = collection_of(2);
        assert!(collection.get("nope").unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_remove_then_get_fails() {
        let (mut collection, ids) = collection_of(2);
        let _removed = collection.remove(&ids[0]).unwrap();
        assert!(collection.get(&ids[0]).is_err());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_move_to_position() {
        let (mut collection, ids) = collection_of(3);
        collection.move_to_position(&ids[2], 0).unwrap();
        let order: Vec<&str> = collection.all().iter().map(|t| t.track_id()).collect();
        assert_eq!(order, vec![&ids[2], &ids[0], &ids[1]]);
    }

    #[test]
    fn test_move_past_end_clamps() {
        let (mut collection, ids) = collection_of(3);
        collection.move_to_position(&ids[0], 99).unwrap();
        let order: Vec<&str> = collection.all().iter().map(|t| t.track_id()).collect();
        assert_eq!(order, vec![&ids[1], &ids[2], &ids[0]]);
    }

    #[test]
    fn test_shift_at_boundary_is_noop() {
        let (mut collection, ids) = collection_of(2);
        collection.shift(&ids[0], ShiftDirection::Up).unwrap();
        collection.shift(&ids[1], ShiftDirection::Down).unwrap();
        let order: Vec<&str> = collection.all().iter().map(|t| t.track_id()).collect();
        assert_eq!(order, vec![&ids[0], &ids[1]]);
    }

    #[test]
    fn test_shift_swaps_neighbors() {
        let (mut collection, ids) = collection_of(3);
        collection.shift(&ids[1], ShiftDirection::Up).unwrap();
        let order: Vec<&str> = collection.all().iter().map(|t| t.track_id()).collect();
        assert_eq!(order, vec![&ids[1], &ids[0], &ids[2]]);
    }

    #[test]
    fn test_toggles() {
        let (mut collection, ids) = collection_of(1);
        collection.toggle_hidden(&ids[0]).unwrap();
        assert!(collection.get(&ids[0]).unwrap().is_hidden);
        collection.toggle_hidden(&ids[0]).unwrap();
        assert!(!collection.get(&ids[0]).unwrap().is_hidden);
        collection.toggle_expanded(&ids[0]).unwrap();
        assert!(collection.get(&ids[0]).unwrap().is_expanded);
    }

    #[test]
    fn test_set_y_axis_range() {
        let mut collection = TrackCollection::default();
        let settings = TrackSettings::new_coverage(&Sample::new("c", "s"));
        let id = settings.track_id().to_string();
        collection.push(settings);
        collection.set_y_axis_range(&id, (-4.0, 4.0)).unwrap();
        assert_eq!(
            collection.get(&id).unwrap().y_axis.as_ref().unwrap().range,
            (-4.0, 4.0)
        );
    }
}
