//! In-process RESP2 store for integration tests: SET / GET / DEL over a
//! shared map, one thread per connection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use kvs_client::{KeyValueClient, RetryPolicy, StoreConfig};

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    // Commands to answer by closing the connection instead of replying.
    drop_next: AtomicUsize,
    commands: AtomicUsize,
}

pub struct FakeStore {
    addr: String,
    shared: Arc<Shared>,
}

impl FakeStore {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let shared = Arc::new(Shared::default());

        let accept_shared = shared.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let shared = accept_shared.clone();
                thread::spawn(move || serve(stream, shared));
            }
        });

        FakeStore { addr, shared }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Makes the next `count` commands fail by closing their connection.
    pub fn drop_next(&self, count: usize) {
        self.shared.drop_next.store(count, Ordering::SeqCst);
    }

    /// Commands answered so far.
    pub fn commands(&self) -> usize {
        self.shared.commands.load(Ordering::SeqCst)
    }

    /// Raw value under the fully scoped key.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.shared.data.lock().unwrap().get(key.as_bytes()).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.shared
            .data
            .lock()
            .unwrap()
            .insert(key.as_bytes().to_vec(), value.to_vec());
    }

    pub fn client(&self, domain: &str) -> KeyValueClient {
        KeyValueClient::connect(self.config(domain)).expect("client")
    }

    pub fn config(&self, domain: &str) -> StoreConfig {
        let mut config = StoreConfig::new(self.addr.clone(), domain);
        config.max_idle = 4;
        config.max_active = 8;
        config.read_timeout = Some(Duration::from_secs(2));
        config.write_timeout = Some(Duration::from_secs(2));
        config.connect_timeout = Some(Duration::from_secs(2));
        config.retry = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        config
    }
}

fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let mut writer = stream.try_clone().expect("clone");
    let mut reader = BufReader::new(stream);
    while let Some(args) = read_command(&mut reader) {
        let should_drop = shared
            .drop_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_drop {
            return;
        }
        shared.commands.fetch_add(1, Ordering::SeqCst);
        let reply = dispatch(&args, &shared);
        if writer.write_all(&reply).and_then(|_| writer.flush()).is_err() {
            return;
        }
    }
}

fn dispatch(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    let mut data = shared.data.lock().unwrap();
    match (args[0].as_slice(), args.len()) {
        (b"SET", 3) => {
            data.insert(args[1].clone(), args[2].clone());
            b"+OK\r\n".to_vec()
        }
        (b"GET", 2) => match data.get(&args[1]) {
            Some(value) => {
                let mut out = format!("${}\r\n", value.len()).into_bytes();
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
                out
            }
            None => b"$-1\r\n".to_vec(),
        },
        (b"DEL", 2) => {
            let removed = data.remove(&args[1]).is_some() as i64;
            format!(":{removed}\r\n").into_bytes()
        }
        _ => b"-ERR unknown command\r\n".to_vec(),
    }
}

fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<Vec<u8>>> {
    let count = read_header(reader, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_header(reader, b'$')?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).ok()?;
        data.truncate(len);
        args.push(data);
    }
    Some(args)
}

fn read_header(reader: &mut BufReader<TcpStream>, marker: u8) -> Option<usize> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).ok()? == 0 || line.first() != Some(&marker) {
        return None;
    }
    std::str::from_utf8(&line[1..line.len() - 2]).ok()?.parse().ok()
}
