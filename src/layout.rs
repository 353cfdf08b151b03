//! Persisted track layout: order plus hidden/expanded flags, keyed by
//! portable identity so a record written in one session applies after a
//! reload that regenerated every internal track id.

use crate::error::Result;
use crate::track_collection::TrackCollection;
use crate::track_identity::portable_track_id;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    pub order: Vec<String>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub hidden: HashMap<String, bool>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub expanded: HashMap<String, bool>,
}

impl LayoutRecord {
    /// Snapshot of the current collection state.
    pub fn capture(collection: &TrackCollection) -> Result<Self> {
        let mut record = Self::default();
        for settings in collection.all() {
            let identity = portable_track_id(settings)?;
            record.order.push(identity.to_owned());
            let _previous = record.hidden.insert(identity.to_owned(), settings.is_hidden);
            let _previous = record.expanded.insert(identity, settings.is_expanded);
        }
        Ok(record)
    }

    /// Applies order and flags onto a freshly synchronized collection.
    /// Identities not mentioned by the record keep their relative order after
    /// all mentioned ones; stale record entries are ignored.
    pub fn apply(&self, collection: &mut TrackCollection) -> Result<()> {
        let mut tracks = collection.all().to_vec();
        let mut rank: Vec<usize> = Vec::with_capacity(tracks.len());
        for settings in tracks.iter_mut() {
            let identity = portable_track_id(settings)?;
            if let Some(hidden) = self.hidden.get(&identity) {
                settings.is_hidden = *hidden;
            }
            if let Some(expanded) = self.expanded.get(&identity) {
                settings.is_expanded = *expanded;
            }
            rank.push(
                self.order
                    .iter()
                    .position(|id| *id == identity)
                    .unwrap_or(usize::MAX),
            );
        }

        let mut indexed: Vec<(usize, usize)> = rank.into_iter().enumerate().collect();
        indexed.sort_by_key(|(_, r)| *r);
        let ordered: Vec<_> = indexed
            .into_iter()
            .map(|(i, _)| tracks[i].to_owned())
            .collect();
        collection.set_all(ordered);
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
