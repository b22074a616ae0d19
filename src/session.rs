//! Repository Browser Session — client-side navigation state machine.
//!
//! The session tracks where a browser is inside one repository (root,
//! subfolder, or file view), derives the store prefix for that location,
//! and caches listings and file views per prefix so revisits skip the
//! fetch. The machine itself performs no I/O: every navigation returns a
//! [`Navigation`] telling the embedding client what, if anything, to fetch,
//! and the client feeds results back through `store_listing` /
//! `store_file_view`.
//!
//! The current location is the single source of truth; there is no
//! separate back-stack. Duplicate navigation to the already-active
//! location is suppressed. Completions for a location the user has since
//! left are still cached (the stale-response race is accepted, matching
//! the listing cache's write-once nature).

use crate::models::{
    annotation::FileAnnotation,
    listing::{EntryKind, ListingEntry},
};
use std::collections::HashMap;
use thiserror::Error;

/// Where the session currently is inside the repository. Segments are
/// relative to the repo root, validated, and never empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    AtRepoRoot,
    InSubfolder(Vec<String>),
    ViewingFile(Vec<String>),
}

/// What the embedding client should do after a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Navigation to the already-active location; nothing to do.
    Unchanged,
    /// The new folder's listing is not cached; fetch it for this prefix.
    FetchListing { prefix: String },
    /// The new folder's listing was served from cache.
    CachedListing { prefix: String },
    /// The file view is not cached; fetch content+annotations for this key.
    FetchFile { key: String },
    /// The file view was served from cache.
    CachedFile { key: String },
}

/// A fetched file view: content plus its line-anchored annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileView {
    pub file_name: String,
    pub content: String,
    pub annotations: Vec<FileAnnotation>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("invalid path segment `{0}`")]
    InvalidSegment(String),
    #[error("cannot navigate into entries from a file view")]
    NotInFolder,
}

/// Navigation state for one repository.
pub struct BrowserSession {
    owner_label: String,
    repo_name: String,
    location: Location,
    listings: HashMap<String, Vec<ListingEntry>>,
    file_views: HashMap<String, FileView>,
}

impl BrowserSession {
    /// Open a session at the repository root. The caller should fetch the
    /// root listing indicated by the returned navigation.
    pub fn open(owner_label: impl Into<String>, repo_name: impl Into<String>) -> (Self, Navigation) {
        let session = Self {
            owner_label: owner_label.into(),
            repo_name: repo_name.into(),
            location: Location::AtRepoRoot,
            listings: HashMap::new(),
            file_views: HashMap::new(),
        };
        let prefix = session.resolve(&Location::AtRepoRoot);
        (session, Navigation::FetchListing { prefix })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The store prefix for a folder location (trailing slash included),
    /// or the exact key for a file location.
    pub fn resolve(&self, location: &Location) -> String {
        let base = format!("{}/{}", self.owner_label, self.repo_name);
        match location {
            Location::AtRepoRoot => format!("{}/", base),
            Location::InSubfolder(segments) => format!("{}/{}/", base, segments.join("/")),
            Location::ViewingFile(segments) => format!("{}/{}", base, segments.join("/")),
        }
    }

    /// Move to an explicit location, suppressing duplicate navigation and
    /// checking the cache before asking for a fetch.
    pub fn navigate(&mut self, target: Location) -> Navigation {
        if target == self.location {
            return Navigation::Unchanged;
        }
        let resolved = self.resolve(&target);
        let is_file = matches!(target, Location::ViewingFile(_));
        self.location = target;

        if is_file {
            if self.file_views.contains_key(&resolved) {
                Navigation::CachedFile { key: resolved }
            } else {
                Navigation::FetchFile { key: resolved }
            }
        } else if self.listings.contains_key(&resolved) {
            Navigation::CachedListing { prefix: resolved }
        } else {
            Navigation::FetchListing { prefix: resolved }
        }
    }

    /// Reconstruct a location from URL path segments (relative to the repo
    /// root) and navigate there. `is_file_view` distinguishes the folder
    /// route from the file route; segments are validated before use.
    pub fn navigate_segments(
        &mut self,
        segments: &[String],
        is_file_view: bool,
    ) -> Result<Navigation, NavError> {
        for segment in segments {
            validate_segment(segment)?;
        }
        let target = if is_file_view {
            Location::ViewingFile(segments.to_vec())
        } else if segments.is_empty() {
            Location::AtRepoRoot
        } else {
            Location::InSubfolder(segments.to_vec())
        };
        Ok(self.navigate(target))
    }

    /// Enter a folder entry of the current listing.
    pub fn enter_folder(&mut self, folder_name: &str) -> Result<Navigation, NavError> {
        validate_segment(folder_name)?;
        let mut segments = self.current_segments()?;
        segments.push(folder_name.to_string());
        Ok(self.navigate(Location::InSubfolder(segments)))
    }

    /// Open a file entry of the current listing.
    pub fn open_file(&mut self, file_name: &str) -> Result<Navigation, NavError> {
        validate_segment(file_name)?;
        let mut segments = self.current_segments()?;
        segments.push(file_name.to_string());
        Ok(self.navigate(Location::ViewingFile(segments)))
    }

    /// Record a completed listing fetch. Cached even when the user has
    /// already navigated elsewhere.
    pub fn store_listing(&mut self, prefix: impl Into<String>, items: Vec<ListingEntry>) {
        self.listings.insert(prefix.into(), items);
    }

    /// Record a completed file-view fetch.
    pub fn store_file_view(&mut self, key: impl Into<String>, view: FileView) {
        self.file_views.insert(key.into(), view);
    }

    /// The cached listing for the current folder, if present.
    pub fn current_items(&self) -> Option<&[ListingEntry]> {
        match self.location {
            Location::ViewingFile(_) => None,
            _ => self
                .listings
                .get(&self.resolve(&self.location))
                .map(Vec::as_slice),
        }
    }

    /// The cached view for the currently open file, if present.
    pub fn current_file(&self) -> Option<&FileView> {
        match self.location {
            Location::ViewingFile(_) => self.file_views.get(&self.resolve(&self.location)),
            _ => None,
        }
    }

    /// Select an entry from the current listing by name, entering folders
    /// and opening files accordingly.
    pub fn select_entry(&mut self, entry: &ListingEntry) -> Result<Navigation, NavError> {
        match entry.kind {
            EntryKind::Folder => self.enter_folder(&entry.name),
            EntryKind::File => self.open_file(&entry.name),
        }
    }

    fn current_segments(&self) -> Result<Vec<String>, NavError> {
        match &self.location {
            Location::AtRepoRoot => Ok(Vec::new()),
            Location::InSubfolder(segments) => Ok(segments.clone()),
            Location::ViewingFile(_) => Err(NavError::NotInFolder),
        }
    }
}

fn validate_segment(segment: &str) -> Result<(), NavError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(NavError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::ListingEntry;

    fn segs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn opening_a_session_requests_the_root_listing() {
        let (session, nav) = BrowserSession::open("JaneDoe-1", "demo");
        assert_eq!(session.location(), &Location::AtRepoRoot);
        assert_eq!(
            nav,
            Navigation::FetchListing {
                prefix: "JaneDoe-1/demo/".into()
            }
        );
    }

    #[test]
    fn entering_a_folder_builds_the_nested_prefix() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        let nav = session.enter_folder("sub").unwrap();
        assert_eq!(
            nav,
            Navigation::FetchListing {
                prefix: "JaneDoe-1/demo/sub/".into()
            }
        );

        let nav = session.enter_folder("deep").unwrap();
        assert_eq!(
            nav,
            Navigation::FetchListing {
                prefix: "JaneDoe-1/demo/sub/deep/".into()
            }
        );
        assert_eq!(
            session.location(),
            &Location::InSubfolder(segs(&["sub", "deep"]))
        );
    }

    #[test]
    fn opening_a_file_resolves_the_exact_key() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        session.enter_folder("sub").unwrap();
        let nav = session.open_file("b.txt").unwrap();
        assert_eq!(
            nav,
            Navigation::FetchFile {
                key: "JaneDoe-1/demo/sub/b.txt".into()
            }
        );
    }

    #[test]
    fn duplicate_navigation_is_suppressed() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        session.enter_folder("sub").unwrap();
        let nav = session
            .navigate_segments(&segs(&["sub"]), false)
            .unwrap();
        assert_eq!(nav, Navigation::Unchanged);
    }

    #[test]
    fn cached_prefixes_skip_the_fetch() {
        let (mut session, nav) = BrowserSession::open("JaneDoe-1", "demo");
        let Navigation::FetchListing { prefix } = nav else {
            panic!("expected a root fetch");
        };
        session.store_listing(
            prefix,
            vec![
                ListingEntry::folder("sub", "JaneDoe-1/demo/sub/"),
                ListingEntry::file("a.txt", "JaneDoe-1/demo/a.txt", 5),
            ],
        );
        assert_eq!(session.current_items().unwrap().len(), 2);

        // Leave and come back: the revisit is served from cache.
        session.enter_folder("sub").unwrap();
        let nav = session.navigate_segments(&[], false).unwrap();
        assert_eq!(
            nav,
            Navigation::CachedListing {
                prefix: "JaneDoe-1/demo/".into()
            }
        );
    }

    #[test]
    fn cached_file_views_skip_the_fetch() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        session.open_file("a.txt").unwrap();
        session.store_file_view(
            "JaneDoe-1/demo/a.txt",
            FileView {
                file_name: "a.txt".into(),
                content: "hello".into(),
                annotations: Vec::new(),
            },
        );
        assert_eq!(session.current_file().unwrap().content, "hello");

        session.navigate_segments(&[], false).unwrap();
        let nav = session
            .navigate_segments(&segs(&["a.txt"]), true)
            .unwrap();
        assert_eq!(
            nav,
            Navigation::CachedFile {
                key: "JaneDoe-1/demo/a.txt".into()
            }
        );
    }

    #[test]
    fn stale_completion_is_still_cached() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        session.enter_folder("sub").unwrap();
        // The root fetch from open() completes only now, after the user
        // moved on. It lands in the cache without touching the current view.
        session.store_listing(
            "JaneDoe-1/demo/",
            vec![ListingEntry::folder("sub", "JaneDoe-1/demo/sub/")],
        );
        assert_eq!(
            session.location(),
            &Location::InSubfolder(segs(&["sub"]))
        );
        assert!(session.current_items().is_none());
    }

    #[test]
    fn selecting_entries_routes_on_kind() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        let folder = ListingEntry::folder("sub", "JaneDoe-1/demo/sub/");
        let nav = session.select_entry(&folder).unwrap();
        assert!(matches!(nav, Navigation::FetchListing { .. }));

        let file = ListingEntry::file("b.txt", "JaneDoe-1/demo/sub/b.txt", 3);
        let nav = session.select_entry(&file).unwrap();
        assert_eq!(
            nav,
            Navigation::FetchFile {
                key: "JaneDoe-1/demo/sub/b.txt".into()
            }
        );
    }

    #[test]
    fn navigation_from_a_file_view_requires_segments() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        session.open_file("a.txt").unwrap();
        assert_eq!(session.enter_folder("sub"), Err(NavError::NotInFolder));
    }

    #[test]
    fn invalid_segments_are_rejected() {
        let (mut session, _) = BrowserSession::open("JaneDoe-1", "demo");
        assert!(matches!(
            session.navigate_segments(&segs(&[".."]), false),
            Err(NavError::InvalidSegment(_))
        ));
        assert!(session.enter_folder("a/b").is_err());
        assert!(session.open_file("").is_err());
    }
}
