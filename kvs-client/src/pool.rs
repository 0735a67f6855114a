//! # Connection Pool
//!
//! Purpose: Reuse TCP connections to the store across calls so each command
//! pays one round-trip instead of a handshake.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: A bounded set of reusable connections.
//! 2. **Scoped Acquisition**: `PooledConnection` hands its connection back on drop,
//!    on every exit path.
//! 3. **Blocking at the Ceiling**: When `max_active` connections are open and none
//!    is idle, `acquire` waits for a release instead of failing.
//! 4. **Fail Fast on Open**: The first connection is dialed while opening the pool.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::resp::{encode_command, read_reply, Reply};

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections parked in the idle set.
    pub idle: usize,
    /// Open connections, idle or in use.
    pub active: usize,
}

struct PoolState {
    idle: VecDeque<Connection>,
    active: usize,
}

struct PoolInner {
    config: StoreConfig,
    state: Mutex<PoolState>,
    released: Condvar,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Counters stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_slot(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        drop(state);
        self.released.notify_one();
    }

    fn give_back(&self, conn: Connection) {
        let mut state = self.lock();
        if state.idle.len() < self.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.active = state.active.saturating_sub(1);
        }
        drop(state);
        self.released.notify_one();
    }
}

/// Shared handle to a connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Opens the pool and dials its first connection.
    ///
    /// Fails when the limits are invalid or the endpoint is unreachable.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let first = Connection::dial(&config)?;
        debug!(
            addr = %config.addr,
            max_idle = config.max_idle,
            max_active = config.max_active,
            "connection pool opened"
        );

        let mut idle = VecDeque::with_capacity(config.max_idle.min(64));
        let active = if config.max_idle > 0 {
            idle.push_back(first);
            1
        } else {
            0
        };

        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState { idle, active }),
                released: Condvar::new(),
            }),
        })
    }

    /// Takes a connection, dialing a new one when none is idle.
    ///
    /// Blocks while `max_active` connections are checked out.
    pub fn acquire(&self) -> StoreResult<PooledConnection> {
        let mut state = self.inner.lock();
        loop {
            if let Some(conn) = state.idle.pop_front() {
                return Ok(PooledConnection::new(self.inner.clone(), conn));
            }
            if state.active < self.inner.config.max_active {
                state.active += 1;
                break;
            }
            trace!(active = state.active, "pool at capacity, waiting for a release");
            state = self
                .inner
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(state);

        match Connection::dial(&self.inner.config) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.inner.release_slot();
                Err(err)
            }
        }
    }

    /// Current idle and active counts.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.lock();
        PoolStats {
            idle: state.idle.len(),
            active: state.active,
        }
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    broken: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            broken: false,
        }
    }

    /// Sends one command and reads its reply.
    ///
    /// Any I/O or framing failure marks the connection broken so it is
    /// closed instead of reused.
    pub fn exec(&mut self, args: &[&[u8]]) -> StoreResult<Reply> {
        let conn = match self.conn.as_mut() {
            Some(conn) if !self.broken => conn,
            _ => return Err(StoreError::Protocol("connection already failed")),
        };
        let reply = conn.exec(args);
        if reply.is_err() {
            self.broken = true;
        }
        reply
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.broken {
            drop(conn);
            self.pool.release_slot();
        } else {
            self.pool.give_back(conn);
        }
    }
}

/// Single TCP connection with reusable buffers.
struct Connection {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: BytesMut,
}

impl Connection {
    fn dial(config: &StoreConfig) -> StoreResult<Self> {
        let stream = connect_stream(config)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(true)?;
        trace!(addr = %config.addr, "dialed store connection");

        Ok(Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: BytesMut::with_capacity(256),
        })
    }

    fn exec(&mut self, args: &[&[u8]]) -> StoreResult<Reply> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_reply(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(config: &StoreConfig) -> StoreResult<TcpStream> {
    let addrs: Vec<SocketAddr> = config
        .addr
        .to_socket_addrs()
        .map_err(|_| StoreError::InvalidAddress(config.addr.clone()))?
        .collect();
    let Some(first) = addrs.first() else {
        return Err(StoreError::InvalidAddress(config.addr.clone()));
    };
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(first, timeout)?,
        None => TcpStream::connect(&addrs[..])?,
    };
    Ok(stream)
}
