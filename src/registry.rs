use rustc_hash::FxHashMap;
use std::{
    io::{Error as IoError, ErrorKind},
    sync::{Arc, Weak},
};

use crate::{Error, Result, WaitableHandle};

/// Registered handles in wait order, paired 1:1 with a handle -> session table.
///
/// The position of a handle in `handles` is the ordinal the wait primitive
/// reports when that handle becomes ready.
#[derive(Debug)]
pub(crate) struct Registry<S> {
    handles: Vec<WaitableHandle>,
    entries: FxHashMap<WaitableHandle, Weak<S>>,
}

/// Result of resolving a ready handle.
#[derive(Debug)]
pub(crate) enum Lookup<S> {
    Live(Arc<S>),
    /// Registered, but the session was dropped without closing.
    Dead,
    Missing,
}

impl<S: PartialEq> Registry<S> {
    pub(crate) fn try_new(initial_capacity: usize) -> std::io::Result<Self> {
        let mut entries =
            FxHashMap::<WaitableHandle, Weak<S>>::with_hasher(rustc_hash::FxBuildHasher);
        let mut handles = Vec::<WaitableHandle>::new();
        if entries.try_reserve(initial_capacity).is_err()
            || handles.try_reserve(initial_capacity).is_err()
        {
            Err(IoError::from(ErrorKind::OutOfMemory))
        } else {
            Ok(Self { handles, entries })
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.handles.len(), self.entries.len());
        self.handles.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn handles(&self) -> &[WaitableHandle] {
        &self.handles
    }

    /// Handle under which a session equal to `session` is registered.
    pub(crate) fn find(&self, session: &S) -> Option<WaitableHandle> {
        self.entries.iter().find_map(|(handle, registered)| {
            if std::ptr::eq(registered.as_ptr(), session) {
                return Some(*handle);
            }
            match registered.upgrade() {
                Some(registered) if *registered == *session => Some(*handle),
                _ => None,
            }
        })
    }

    #[inline]
    pub(crate) fn contains(&self, session: &S) -> bool {
        self.find(session).is_some()
    }

    /// Appends `handle` last and maps it to `session`.
    ///
    /// The caller has already checked that no equal session is registered.
    pub(crate) fn insert(
        &mut self,
        handle: WaitableHandle,
        session: &Arc<S>,
        limit: usize,
    ) -> Result<()> {
        if let Some(registered) = self.entries.get(&handle) {
            if registered.strong_count() > 0 {
                return Err(Error::HandleInUse(handle));
            }
            // The native handle was recycled after its session was dropped
            log::debug!("{:?}: replacing a dropped session", handle);
            self.remove(handle);
        }
        if self.handles.len() >= limit {
            return Err(Error::Capacity { limit });
        }
        self.handles.push(handle);
        self.entries.insert(handle, Arc::downgrade(session));
        Ok(())
    }

    /// Removes `handle` from both the wait order and the table, keeping the
    /// relative order of the remaining handles.
    pub(crate) fn remove(&mut self, handle: WaitableHandle) -> bool {
        match self.handles.iter().position(|registered| *registered == handle) {
            Some(index) => {
                self.handles.remove(index);
                self.entries.remove(&handle);
                true
            }
            None => false,
        }
    }

    pub(crate) fn lookup(&self, handle: WaitableHandle) -> Lookup<S> {
        match self.entries.get(&handle) {
            Some(registered) => match registered.upgrade() {
                Some(session) => Lookup::Live(session),
                None => Lookup::Dead,
            },
            None => Lookup::Missing,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.handles.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[derive(Debug, PartialEq)]
    struct Session(u32);

    fn h(raw: i32) -> WaitableHandle {
        WaitableHandle::new(raw as _)
    }

    fn registry() -> Registry<Session> {
        Registry::try_new(4).unwrap()
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut r = registry();
        let (s1, s2, s3) = (
            Arc::new(Session(1)),
            Arc::new(Session(2)),
            Arc::new(Session(3)),
        );
        r.insert(h(10), &s1, usize::MAX).unwrap();
        r.insert(h(11), &s2, usize::MAX).unwrap();
        r.insert(h(12), &s3, usize::MAX).unwrap();
        assert_eq!(r.handles(), &[h(10), h(11), h(12)]);
        assert_eq!(r.len(), 3);
        assert_eq!(r.find(&Session(2)), Some(h(11)));
        assert!(matches!(r.lookup(h(12)), Lookup::Live(s) if *s == Session(3)));
    }

    #[test]
    fn test_remove_middle() {
        let mut r = registry();
        let sessions: Vec<_> = (1..=3).map(|i| Arc::new(Session(i))).collect();
        for (i, s) in sessions.iter().enumerate() {
            r.insert(h(10 + i as i32), s, usize::MAX).unwrap();
        }
        assert!(r.remove(h(11)));
        assert_eq!(r.handles(), &[h(10), h(12)]);
        assert_eq!(r.len(), 2);
        assert!(matches!(r.lookup(h(11)), Lookup::Missing));
        assert!(!r.contains(&Session(2)));
        assert!(!r.remove(h(11)));
    }

    #[test]
    fn test_handle_collision() {
        let mut r = registry();
        let s1 = Arc::new(Session(1));
        let s2 = Arc::new(Session(2));
        r.insert(h(10), &s1, usize::MAX).unwrap();
        assert!(matches!(
            r.insert(h(10), &s2, usize::MAX),
            Err(Error::HandleInUse(handle)) if handle == h(10)
        ));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_recycled_handle() {
        let mut r = registry();
        let s1 = Arc::new(Session(1));
        let s2 = Arc::new(Session(2));
        let s3 = Arc::new(Session(3));
        r.insert(h(10), &s1, usize::MAX).unwrap();
        r.insert(h(11), &s2, usize::MAX).unwrap();
        drop(s1);
        assert!(matches!(r.lookup(h(10)), Lookup::Dead));
        r.insert(h(10), &s3, usize::MAX).unwrap();
        assert_eq!(r.handles(), &[h(11), h(10)]);
        assert!(matches!(r.lookup(h(10)), Lookup::Live(s) if *s == Session(3)));
    }

    #[test]
    fn test_capacity() {
        let mut r = registry();
        let s1 = Arc::new(Session(1));
        let s2 = Arc::new(Session(2));
        r.insert(h(10), &s1, 1).unwrap();
        assert!(matches!(
            r.insert(h(11), &s2, 1),
            Err(Error::Capacity { limit: 1 })
        ));
        assert_eq!(r.handles(), &[h(10)]);
    }

    #[test]
    fn test_find_dropped_session() {
        let mut r = registry();
        let s1 = Arc::new(Session(1));
        r.insert(h(10), &s1, usize::MAX).unwrap();
        drop(s1);
        assert!(!r.contains(&Session(1)));
        r.clear();
        assert!(r.is_empty());
    }

    #[test]
    fn test_random_churn() {
        let mut rng = rand::thread_rng();
        let mut r = registry();
        let sessions: Vec<_> = (0..16).map(|i| Arc::new(Session(i))).collect();
        for _ in 0..2_000 {
            let i = rng.gen_range(0..sessions.len());
            let handle = h(100 + i as i32);
            if rng.gen_bool(0.5) {
                if !r.contains(&sessions[i]) {
                    r.insert(handle, &sessions[i], usize::MAX).unwrap();
                }
            } else {
                r.remove(handle);
            }
            let mut unique = r.handles().to_vec();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), r.handles().len());
            assert_eq!(r.entries.len(), r.handles().len());
            for handle in r.handles() {
                assert!(r.entries.contains_key(handle));
            }
        }
    }
}
