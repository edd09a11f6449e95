use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{DuplicatePolicy, StoreConfig};
use crate::error::{Position, StoreError, StoreResult};
use crate::lines::LineReader;
use crate::root;

/// Projects a record onto the key it is indexed under.
pub type IdentityFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Index and end-of-file bookkeeping, guarded together with the file.
#[derive(Default)]
struct StoreState {
    /// Key to byte offset of the line holding the record.
    index: HashMap<String, u64>,
    /// Length of the file as last measured by this store.
    end: u64,
    /// The last line on disk has no trailing newline.
    unterminated: bool,
}

/// Append-only JSON Lines log with an in-memory offset index.
///
/// Each record is one line of compact JSON. The index maps the key produced
/// by the identity function to the byte offset where that record's line
/// starts, so a point lookup is a seek plus a single line read. The index is
/// rebuilt from the file on open and never persisted.
///
/// Every operation takes one mutex covering both the index and the file and
/// holds it for the full duration, I/O included. A long scan therefore
/// blocks lookups and appends on the same store. Visitors and predicates run
/// with the lock held and must not call back into the same store.
pub struct JsonLineStore<T> {
    path: PathBuf,
    config: StoreConfig,
    identity: IdentityFn<T>,
    state: Mutex<StoreState>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonLineStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the store at `path` with the default configuration.
    ///
    /// Relative paths resolve against the project root. A missing file is
    /// not an error; the store starts empty and the file is created by the
    /// first `save`.
    pub fn open<F>(path: impl AsRef<Path>, identity: F) -> StoreResult<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::open_with_config(path, identity, StoreConfig::default())
    }

    /// Open the store at `path`, building the index from the file.
    ///
    /// Fails if any line cannot be parsed as a record, naming the line and
    /// its byte offset.
    pub fn open_with_config<F>(
        path: impl AsRef<Path>,
        identity: F,
        config: StoreConfig,
    ) -> StoreResult<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let store = Self {
            path: root::resolve(path.as_ref())?,
            config,
            identity: Box::new(identity),
            state: Mutex::new(StoreState::default()),
            _record: PhantomData,
        };
        store.reload()?;
        Ok(store)
    }

    /// Rebuild the index from the backing file.
    ///
    /// On failure the previous index is left in place. Returns the number of
    /// indexed keys.
    pub fn reload(&self) -> StoreResult<usize> {
        let mut state = self.lock();
        *state = self.build_index()?;
        Ok(state.index.len())
    }

    fn build_index(&self) -> StoreResult<StoreState> {
        let mut state = StoreState::default();
        let Some(mut lines) = LineReader::open(&self.path, self.config.max_line_len)? else {
            debug!(path = %self.path.display(), "backing file absent; index empty");
            return Ok(state);
        };

        let mut duplicates = 0usize;
        while let Some(line) = lines.next_line()? {
            let record: T = line.parse()?;
            let key = (self.identity)(&record);
            match state.index.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(line.offset);
                }
                Entry::Occupied(mut slot) => {
                    duplicates += 1;
                    trace!(key = %slot.key(), line = line.number, "duplicate key");
                    match self.config.duplicate_policy {
                        DuplicatePolicy::LastWins => {
                            slot.insert(line.offset);
                        }
                        DuplicatePolicy::FirstWins => {}
                        DuplicatePolicy::Reject => {
                            return Err(StoreError::DuplicateKey {
                                path: self.path.clone(),
                                key: slot.key().clone(),
                                line: line.number,
                            });
                        }
                    }
                }
            }
        }

        state.end = lines.offset();
        state.unterminated = lines.unterminated();
        debug!(
            path = %self.path.display(),
            lines = lines.lines_read(),
            keys = state.index.len(),
            duplicates,
            bytes = state.end,
            "index built"
        );
        Ok(state)
    }

    /// Look up a record by key.
    pub fn find_by_id(&self, key: &str) -> StoreResult<T> {
        let state = self.lock();
        let offset = *state.index.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        (&mut reader)
            .take(self.config.max_line_len as u64 + 1)
            .read_until(b'\n', &mut buf)?;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }

        let record: T =
            serde_json::from_slice(&buf).map_err(|source| StoreError::InvalidDataFormat {
                path: self.path.clone(),
                position: Position::Offset(offset),
                source,
            })?;
        if (self.identity)(&record) != key {
            return Err(StoreError::IndexMismatch {
                key: key.to_string(),
                offset,
            });
        }
        Ok(record)
    }

    /// Append a record. Returns the byte offset its line starts at.
    ///
    /// A record whose key is already indexed is rejected before any I/O.
    /// The index entry is only added once the write has succeeded.
    pub fn save(&self, record: &T) -> StoreResult<u64> {
        let mut state = self.lock();
        let key = (self.identity)(record);
        if state.index.contains_key(&key) {
            return Err(StoreError::AlreadyExists { key });
        }

        let encoded = serde_json::to_vec(record).map_err(StoreError::Serialization)?;
        if encoded.len() > self.config.max_line_len {
            return Err(StoreError::LineTooLong {
                path: self.path.clone(),
                position: Position::Offset(state.end),
                limit: self.config.max_line_len,
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        sync_end(&mut file, &mut state)?;

        let mut payload = Vec::with_capacity(encoded.len() + 2);
        let mut offset = state.end;
        if state.unterminated {
            payload.push(b'\n');
            offset += 1;
        }
        payload.extend_from_slice(&encoded);
        payload.push(b'\n');

        // A failed write may leave part of the payload on disk; the next
        // save measures the file again before choosing its offset.
        file.write_all(&payload)?;
        file.flush()?;

        state.end += payload.len() as u64;
        state.unterminated = false;
        debug!(key = %key, offset, len = encoded.len(), "record appended");
        state.index.insert(key, offset);
        Ok(offset)
    }

    /// Visit every record in file order.
    ///
    /// Stops at the first error, whether from parsing or from `visit`.
    pub fn find_all<E, V>(&self, visit: V) -> Result<(), E>
    where
        E: From<StoreError>,
        V: FnMut(T) -> Result<(), E>,
    {
        self.scan(|_| true, visit)
    }

    /// Visit the records matching `predicate`, in file order.
    ///
    /// Every line is parsed, matching or not, so corruption anywhere in the
    /// file aborts the scan. Lines after a malformed one are never visited.
    pub fn find_all_where<E, P, V>(&self, predicate: P, visit: V) -> Result<(), E>
    where
        E: From<StoreError>,
        P: FnMut(&T) -> bool,
        V: FnMut(T) -> Result<(), E>,
    {
        self.scan(predicate, visit)
    }

    /// Visit one page of the records matching `predicate`.
    ///
    /// Matches are ranked in file order starting at 1; `visit` sees those
    /// ranked `(page - 1) * page_size + 1` through `page * page_size`. The
    /// whole file is still scanned and the returned total counts every
    /// match. A page or page size of zero selects an empty window.
    pub fn find_all_where_paginated<E, P, V>(
        &self,
        predicate: P,
        page: usize,
        page_size: usize,
        mut visit: V,
    ) -> Result<usize, E>
    where
        E: From<StoreError>,
        P: FnMut(&T) -> bool,
        V: FnMut(T) -> Result<(), E>,
    {
        let window = page_window(page, page_size);
        let mut total = 0usize;
        self.scan(predicate, |record| {
            let rank = total;
            total += 1;
            if window.contains(&rank) {
                visit(record)
            } else {
                Ok(())
            }
        })?;
        Ok(total)
    }

    fn scan<E, P, V>(&self, mut predicate: P, mut visit: V) -> Result<(), E>
    where
        E: From<StoreError>,
        P: FnMut(&T) -> bool,
        V: FnMut(T) -> Result<(), E>,
    {
        let _state = self.lock();
        let Some(mut lines) = LineReader::open(&self.path, self.config.max_line_len)? else {
            return Ok(());
        };

        let mut matched = 0u64;
        while let Some(line) = lines.next_line()? {
            let record: T = line.parse()?;
            if predicate(&record) {
                matched += 1;
                visit(record)?;
            }
        }
        trace!(path = %self.path.display(), lines = lines.lines_read(), matched, "scan complete");
        Ok(())
    }

    /// Whether a record is indexed under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().index.contains_key(key)
    }
}

impl<T> JsonLineStore<T> {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // State only changes after a completed write, so a panic elsewhere
        // while the lock was held cannot leave it inconsistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().index.is_empty()
    }

    /// Resolved path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<T> std::fmt::Debug for JsonLineStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLineStore")
            .field("path", &self.path)
            .field("keys", &self.len())
            .finish()
    }
}

/// Take the end of file from the append handle. When it differs from the
/// recorded end the file grew behind our back, and the last byte decides
/// whether the next record needs a leading newline.
fn sync_end(file: &mut File, state: &mut StoreState) -> StoreResult<()> {
    let end = file.seek(SeekFrom::End(0))?;
    if end != state.end {
        state.unterminated = if end == 0 {
            false
        } else {
            file.seek(SeekFrom::Start(end - 1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            last[0] != b'\n'
        };
        trace!(recorded = state.end, actual = end, "end of file resynchronized");
        state.end = end;
    }
    Ok(())
}

/// Zero-based match ranks selected by a 1-based page.
fn page_window(page: usize, page_size: usize) -> std::ops::Range<usize> {
    if page == 0 || page_size == 0 {
        return 0..0;
    }
    let start = (page - 1).saturating_mul(page_size);
    start..start.saturating_add(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Entity {
        id: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        name: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        group: String,
    }

    impl Entity {
        fn new(id: &str) -> Self {
            Self {
                id: id.into(),
                name: String::new(),
                group: String::new(),
            }
        }

        fn named(id: &str, name: &str) -> Self {
            Self {
                name: name.into(),
                ..Self::new(id)
            }
        }

        fn grouped(id: &str, group: &str) -> Self {
            Self {
                group: group.into(),
                ..Self::new(id)
            }
        }
    }

    fn entity_id(e: &Entity) -> String {
        e.id.clone()
    }

    fn write_jsonl(path: &Path, entities: &[Entity]) {
        let mut out = String::new();
        for e in entities {
            out.push_str(&serde_json::to_string(e).unwrap());
            out.push('\n');
        }
        fs::write(path, out).unwrap();
    }

    fn open(path: &Path) -> JsonLineStore<Entity> {
        JsonLineStore::open(path, entity_id).unwrap()
    }

    fn collect_ids(store: &JsonLineStore<Entity>) -> Vec<String> {
        let mut ids = Vec::new();
        store
            .find_all(|e: Entity| -> StoreResult<()> {
                ids.push(e.id);
                Ok(())
            })
            .unwrap();
        ids
    }

    /// Error type for visitor tests: either a store failure or our own.
    #[derive(Debug)]
    enum VisitError {
        Store(StoreError),
        Rejected(String),
    }

    impl From<StoreError> for VisitError {
        fn from(e: StoreError) -> Self {
            Self::Store(e)
        }
    }

    // -----------------------------------------------------------------------
    // Open / index build
    // -----------------------------------------------------------------------

    #[test]
    fn open_builds_index_and_finds_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.jsonl");
        write_jsonl(
            &path,
            &[
                Entity::named("1", "Alice"),
                Entity::named("2", "Bob"),
                Entity::named("3", "Carol"),
            ],
        );

        let store = open(&path);
        assert_eq!(store.len(), 3);
        let got = store.find_by_id("2").unwrap();
        assert_eq!(got, Entity::named("2", "Bob"));
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("absent.jsonl"));
        assert!(store.is_empty());
        assert!(collect_ids(&store).is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_line_fails_open_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\":\"1\"}\n{broken\n").unwrap();

        let err = JsonLineStore::<Entity>::open(&path, entity_id).unwrap_err();
        match err {
            StoreError::InvalidDataFormat { position, .. } => {
                assert_eq!(position, Position::Line { number: 2, offset: 11 });
            }
            other => panic!("expected InvalidDataFormat, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_on_rebuild_last_wins_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dups.jsonl");
        write_jsonl(&path, &[Entity::named("k", "first"), Entity::named("k", "second")]);

        let store = open(&path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id("k").unwrap().name, "second");
    }

    #[test]
    fn duplicate_on_rebuild_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dups.jsonl");
        write_jsonl(&path, &[Entity::named("k", "first"), Entity::named("k", "second")]);

        let config = StoreConfig::default().with_duplicate_policy(DuplicatePolicy::FirstWins);
        let store = JsonLineStore::open_with_config(&path, entity_id, config).unwrap();
        assert_eq!(store.find_by_id("k").unwrap().name, "first");
    }

    #[test]
    fn duplicate_on_rebuild_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dups.jsonl");
        write_jsonl(&path, &[Entity::new("a"), Entity::new("k"), Entity::new("k")]);

        let config = StoreConfig::default().with_duplicate_policy(DuplicatePolicy::Reject);
        let err = JsonLineStore::open_with_config(&path, entity_id, config).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref key, line: 3, .. } if key == "k"));
    }

    #[test]
    fn reload_picks_up_external_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reload.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{}", serde_json::to_string(&Entity::new("2")).unwrap()).unwrap();
        drop(file);

        assert!(!store.contains_key("2"));
        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.find_by_id("2").unwrap().id, "2");
    }

    #[test]
    fn failed_reload_keeps_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reload.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "garbage").unwrap();
        drop(file);

        assert!(store.reload().unwrap_err().is_corruption());
        assert!(store.contains_key("1"));
    }

    #[test]
    fn oversized_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.jsonl");
        write_jsonl(&path, &[Entity::named("1", &"x".repeat(200))]);

        let config = StoreConfig::default().with_max_line_len(64);
        let err = JsonLineStore::open_with_config(&path, entity_id, config).unwrap_err();
        assert!(matches!(err, StoreError::LineTooLong { limit: 64, .. }));
        assert_eq!(err.line(), Some(1));
    }

    // -----------------------------------------------------------------------
    // Point lookup
    // -----------------------------------------------------------------------

    #[test]
    fn find_by_id_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("e.jsonl"));
        let err = store.find_by_id("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn find_by_id_detects_corrupted_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1"), Entity::new("2")]);
        let store = open(&path);

        // Overwrite the second line in place with invalid JSON of equal length.
        let len = fs::read_to_string(&path).unwrap().len();
        let first_len = serde_json::to_string(&Entity::new("1")).unwrap().len() + 1;
        let mut bytes = fs::read(&path).unwrap();
        for b in &mut bytes[first_len..len - 1] {
            *b = b'#';
        }
        fs::write(&path, bytes).unwrap();

        let err = store.find_by_id("2").unwrap_err();
        match err {
            StoreError::InvalidDataFormat { position, .. } => {
                assert_eq!(position, Position::Offset(first_len as u64));
            }
            other => panic!("expected InvalidDataFormat, got {other:?}"),
        }
    }

    #[test]
    fn find_by_id_detects_index_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("a")]);
        let store = open(&path);

        write_jsonl(&path, &[Entity::new("b")]);
        let err = store.find_by_id("a").unwrap_err();
        assert!(matches!(err, StoreError::IndexMismatch { offset: 0, .. }));
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    #[test]
    fn save_then_find_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("e.jsonl"));

        let e = Entity::named("10", "Delta");
        assert_eq!(store.save(&e).unwrap(), 0);
        assert_eq!(store.find_by_id("10").unwrap(), e);
        assert_eq!(collect_ids(&store), vec!["10"]);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/e.jsonl");
        let store = open(&path);

        store.save(&Entity::new("1")).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"1\"}\n");
    }

    #[test]
    fn save_offsets_match_line_starts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        let store = open(&path);

        let off1 = store.save(&Entity::new("1")).unwrap();
        let off2 = store.save(&Entity::new("22")).unwrap();
        let off3 = store.save(&Entity::new("333")).unwrap();
        assert_eq!(off1, 0);
        assert_eq!(off2, 11);
        assert_eq!(off3, 23);
        assert_eq!(fs::metadata(&path).unwrap().len(), 36);
    }

    #[test]
    fn duplicate_save_is_side_effect_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::named("dup", "Original")]);
        let store = open(&path);
        let len_before = fs::metadata(&path).unwrap().len();

        let err = store.save(&Entity::named("dup", "Changed")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { ref key } if key == "dup"));
        assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id("dup").unwrap().name, "Original");
    }

    #[test]
    fn save_after_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        fs::write(&path, "{\"id\":\"1\"}").unwrap();
        let store = open(&path);

        let off = store.save(&Entity::new("2")).unwrap();
        assert_eq!(off, 11);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"1\"}\n{\"id\":\"2\"}\n"
        );
        assert_eq!(store.find_by_id("2").unwrap().id, "2");
        assert_eq!(collect_ids(&open(&path)), vec!["1", "2"]);
    }

    #[test]
    fn save_after_interrupted_append_starts_on_new_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);

        // Leftover of a write that failed partway through.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"id\":\"hal").unwrap();
        drop(file);
        let torn_end = fs::metadata(&path).unwrap().len();

        let off = store.save(&Entity::new("2")).unwrap();
        assert_eq!(off, torn_end + 1);
        assert_eq!(store.find_by_id("2").unwrap().id, "2");
        assert_eq!(store.find_by_id("1").unwrap().id, "1");

        let off = store.save(&Entity::new("3")).unwrap();
        assert_eq!(store.find_by_id("3").unwrap().id, "3");
        assert_eq!(off, fs::metadata(&path).unwrap().len() - 11);
    }

    #[test]
    fn save_after_external_append_uses_real_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"id\":\"x\"}\n").unwrap();
        drop(file);

        let off = store.save(&Entity::new("2")).unwrap();
        assert_eq!(off, 22);
        assert_eq!(store.find_by_id("2").unwrap().id, "2");
        assert_eq!(collect_ids(&open(&path)), vec!["1", "x", "2"]);
    }

    #[test]
    fn save_rejects_record_over_line_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        let config = StoreConfig::default().with_max_line_len(32);
        let store = JsonLineStore::open_with_config(&path, entity_id, config).unwrap();

        let err = store.save(&Entity::named("1", &"y".repeat(64))).unwrap_err();
        assert!(matches!(err, StoreError::LineTooLong { .. }));
        assert!(!path.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn saved_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        {
            let store = open(&path);
            for i in 0..20 {
                store.save(&Entity::named(&i.to_string(), &format!("n{i}"))).unwrap();
            }
        }
        let store = open(&path);
        assert_eq!(store.len(), 20);
        for i in 0..20 {
            assert_eq!(store.find_by_id(&i.to_string()).unwrap().name, format!("n{i}"));
        }
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    #[test]
    fn find_all_where_preserves_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(
            &path,
            &[
                Entity::grouped("5", "A"),
                Entity::grouped("1", "B"),
                Entity::grouped("9", "A"),
                Entity::grouped("2", "A"),
            ],
        );
        let store = open(&path);

        let mut seen = Vec::new();
        store
            .find_all_where(
                |e: &Entity| e.group == "A",
                |e| -> StoreResult<()> {
                    seen.push(e.id);
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(seen, vec!["5", "9", "2"]);
    }

    #[test]
    fn corruption_short_circuits_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        fs::write(&path, "{\"id\":\"1\"}\n{not json}\n{\"id\":\"3\"}\n").unwrap();
        let store: JsonLineStore<Entity> = JsonLineStore {
            path: path.clone(),
            config: StoreConfig::default(),
            identity: Box::new(entity_id),
            state: Mutex::new(StoreState::default()),
            _record: PhantomData,
        };

        let mut visits = 0;
        let err = store
            .find_all_where(
                |_: &Entity| true,
                |_| -> StoreResult<()> {
                    visits += 1;
                    Ok(())
                },
            )
            .unwrap_err();
        assert_eq!(visits, 1);
        match err {
            StoreError::InvalidDataFormat { path: p, position, .. } => {
                assert_eq!(p, path);
                assert_eq!(position.line(), Some(2));
            }
            other => panic!("expected InvalidDataFormat, got {other:?}"),
        }
    }

    #[test]
    fn visitor_error_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1"), Entity::new("2"), Entity::new("3")]);
        let store = open(&path);

        let mut visits = 0;
        let err = store
            .find_all(|e: Entity| {
                visits += 1;
                if e.id == "2" {
                    Err(VisitError::Rejected(e.id))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(visits, 2);
        assert!(matches!(err, VisitError::Rejected(ref id) if id == "2"));
    }

    #[test]
    fn store_error_converts_into_visitor_error_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);
        fs::write(&path, "nope\n").unwrap();

        let err = store.find_all(|_: Entity| -> Result<(), VisitError> { Ok(()) }).unwrap_err();
        assert!(matches!(err, VisitError::Store(StoreError::InvalidDataFormat { .. })));
    }

    #[test]
    fn paginated_scan_returns_window_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(
            &path,
            &[
                Entity::grouped("1", "A"),
                Entity::grouped("2", "B"),
                Entity::grouped("3", "A"),
                Entity::grouped("4", "A"),
                Entity::grouped("5", "B"),
                Entity::grouped("6", "A"),
                Entity::grouped("7", "A"),
            ],
        );
        let store = open(&path);

        let mut collected = Vec::new();
        let total = store
            .find_all_where_paginated(
                |e: &Entity| e.group == "A",
                2,
                2,
                |e| -> StoreResult<()> {
                    collected.push(e.id);
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(collected, vec!["4", "6"]);
    }

    #[test]
    fn paginated_scan_past_end_counts_but_does_not_visit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1"), Entity::new("2")]);
        let store = open(&path);

        let mut visits = 0;
        let total = store
            .find_all_where_paginated(
                |_: &Entity| true,
                5,
                10,
                |_| -> StoreResult<()> {
                    visits += 1;
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(visits, 0);
    }

    #[test]
    fn paginated_scan_zero_page_is_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);

        let mut visits = 0;
        let total = store
            .find_all_where_paginated(|_: &Entity| true, 0, 10, |_| -> StoreResult<()> {
                visits += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!((total, visits), (1, 0));
    }

    #[test]
    fn paginated_scan_still_detects_late_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        write_jsonl(&path, &[Entity::new("1")]);
        let store = open(&path);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "[").unwrap();
        drop(file);

        let err = store
            .find_all_where_paginated(|_: &Entity| true, 1, 1, |_| -> StoreResult<()> { Ok(()) })
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn page_window_bounds() {
        assert_eq!(page_window(1, 10), 0..10);
        assert_eq!(page_window(3, 2), 4..6);
        assert_eq!(page_window(0, 2), 0..0);
        assert_eq!(page_window(2, 0), 0..0);
        assert_eq!(page_window(usize::MAX, 2).end, usize::MAX);
    }

    #[test]
    fn concurrent_saves_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.jsonl");
        let store = std::sync::Arc::new(open(&path));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.save(&Entity::new(&format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 100);
        let reopened = open(&path);
        assert_eq!(reopened.len(), 100);
        assert_eq!(reopened.find_by_id("3-24").unwrap().id, "3-24");
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    mod properties {
        use super::{open, write_jsonl, Entity};
        use crate::error::StoreResult;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn pagination_total_and_window_size(
                groups in proptest::collection::vec(0u8..3, 0..40),
                page in 1usize..8,
                page_size in 1usize..6,
            ) {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("p.jsonl");
                let entities: Vec<Entity> = groups
                    .iter()
                    .enumerate()
                    .map(|(i, g)| Entity::grouped(&i.to_string(), &g.to_string()))
                    .collect();
                write_jsonl(&path, &entities);
                let store = open(&path);

                let expected: Vec<String> = entities
                    .iter()
                    .filter(|e| e.group == "0")
                    .map(|e| e.id.clone())
                    .collect();
                let mut visited = Vec::new();
                let total = store
                    .find_all_where_paginated(
                        |e: &Entity| e.group == "0",
                        page,
                        page_size,
                        |e| -> StoreResult<()> {
                            visited.push(e.id);
                            Ok(())
                        },
                    )
                    .unwrap();

                prop_assert_eq!(total, expected.len());
                let skip = (page - 1) * page_size;
                let want: Vec<String> =
                    expected.into_iter().skip(skip).take(page_size).collect();
                prop_assert_eq!(visited.len(), page_size.min(total.saturating_sub(skip)));
                prop_assert_eq!(visited, want);
            }

            #[test]
            fn reopened_index_resolves_every_saved_key(
                names in proptest::collection::vec("[a-z \\n\"]{0,12}", 1..25),
            ) {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("r.jsonl");
                {
                    let store = open(&path);
                    for (i, name) in names.iter().enumerate() {
                        store.save(&Entity::named(&format!("id-{i}"), name)).unwrap();
                    }
                }
                let store = open(&path);
                prop_assert_eq!(store.len(), names.len());
                for (i, name) in names.iter().enumerate() {
                    let got = store.find_by_id(&format!("id-{i}")).unwrap();
                    prop_assert_eq!(&got.name, name);
                }
            }
        }
    }
}
