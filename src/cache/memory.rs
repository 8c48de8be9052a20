use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Error, Snapshot, SnapshotStore};

/// An in-memory store with knobs for simulating a broken cache location.
#[derive(Default)]
pub(crate) struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
    corrupt: AtomicBool,
    read_only: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn with_snapshot(snapshot: Snapshot) -> MemoryStore {
        let store = MemoryStore::default();
        *store.snapshot.lock().unwrap() = Some(snapshot);
        store
    }

    /// Subsequent reads fail as if the stored document could not be parsed.
    pub(crate) fn corrupt(&self) {
        self.corrupt.store(true, Ordering::SeqCst);
    }

    /// Subsequent writes fail with a permission error.
    pub(crate) fn make_read_only(&self) {
        self.read_only.store(true, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self) -> Result<Option<Snapshot>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.corrupt.load(Ordering::SeqCst) {
            let err = serde_json::from_str::<Snapshot>("{").unwrap_err();
            return Err(Error::Corrupt(err));
        }

        Ok(self.snapshot())
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), Error> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::io(
                "memory",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        self.corrupt.store(false, Ordering::SeqCst);
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());

        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.snapshot.lock().unwrap() = None;

        Ok(())
    }
}
