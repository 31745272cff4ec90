//! Read-only database access: connection opening, pool, query watchdog

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tokio::sync::Mutex;

use crate::types::GuardError;

/// Open a connection on which the engine itself refuses writes.
///
/// `SQLITE_OPEN_READ_ONLY` makes mutation structurally impossible rather
/// than policy-forbidden: a write statement that somehow reached the engine
/// would fail with a readonly error.
pub fn open_read_only(path: &Path, busy_timeout: Duration) -> Result<Connection, GuardError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| GuardError::CatalogUnavailable(format!("{}: {e}", path.display())))?;
    conn.busy_timeout(busy_timeout)
        .map_err(|e| GuardError::CatalogUnavailable(e.to_string()))?;

    Ok(conn)
}

/// Fixed-size pool of read-only connections, handed out round-robin.
///
/// Sized once at startup and never resized. Each call locks one connection
/// for the duration of a single engine round trip; cursors never outlive
/// the lock, so there is no cross-call cursor reuse.
#[derive(Clone)]
pub struct DbPool {
    conns: Arc<Vec<Mutex<Connection>>>,
    next: Arc<AtomicUsize>,
}

impl DbPool {
    pub fn open(path: &Path, size: usize, busy_timeout: Duration) -> Result<Self, GuardError> {
        let size = size.max(1);
        let mut conns = Vec::with_capacity(size);
        for _ in 0..size {
            conns.push(Mutex::new(open_read_only(path, busy_timeout)?));
        }
        tracing::debug!(size, "opened read-only connection pool");

        Ok(Self {
            conns: Arc::new(conns),
            next: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Borrow the next connection slot.
    pub fn get(&self) -> &Mutex<Connection> {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.conns.len();
        &self.conns[i]
    }

    pub fn size(&self) -> usize {
        self.conns.len()
    }
}

/// Interrupts an in-flight statement once its deadline passes.
///
/// Dropping the watchdog disarms it. An interrupted statement surfaces as
/// `SQLITE_INTERRUPT`, which callers map to [`GuardError::Timeout`].
pub struct Watchdog {
    timer: tokio::task::JoinHandle<()>,
}

impl Watchdog {
    pub fn arm(conn: &Connection, deadline: Duration) -> Self {
        let handle = conn.get_interrupt_handle();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            handle.interrupt();
        });
        Self { timer }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Whether an engine error is the result of a watchdog interrupt.
pub fn interrupted(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::OperationInterrupted
    )
}
