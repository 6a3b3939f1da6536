//! Mock tio server for integration testing
//!
//! Speaks the text protocol on `MOCK_TIO_PORT` (default 2605) and keeps
//! container record counts in memory. Values pushed are discarded; only
//! the counts matter to the harness.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Default)]
struct Container {
    container_type: String,
    count: u64,
}

/// Containers shared by every connection
type Store = Arc<Mutex<HashMap<String, Container>>>;

fn main() {
    let port: u16 = std::env::var("MOCK_TIO_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(2605);

    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("mock_tio: cannot listen on port {}: {}", port, e);
            std::process::exit(1);
        }
    };
    eprintln!("mock_tio: listening on port {}", port);

    let store = Store::default();

    for stream in listener.incoming() {
        let Ok(stream) = stream else {
            continue;
        };
        let store = Arc::clone(&store);
        thread::spawn(move || serve(stream, store));
    }
}

fn serve(stream: TcpStream, store: Store) {
    let Ok(write_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut writer = write_half;
    let mut session = Session::new(store);

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break; // EOF
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let answer = session.process_command(&tokens);
        if writer.write_all(answer.as_bytes()).is_err() || writer.flush().is_err() {
            break;
        }
    }
}

/// Per-connection handle table
struct Session {
    store: Store,
    handles: HashMap<u32, String>,
    next_handle: u32,
}

impl Session {
    fn new(store: Store) -> Self {
        Self {
            store,
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    fn process_command(&mut self, tokens: &[&str]) -> String {
        let result = match tokens {
            ["ping", ..] => Ok("pong".to_string()),
            ["create", name, container_type, ..] => Ok(self.create(name, container_type)),
            ["open", name, ..] => self.open(name),
            ["get_count", handle] => self.with_container(handle, |c| format!("count {}", c.count)),
            ["push_back", handle, ..] => self.with_container(handle, |c| {
                c.count += 1;
                String::new()
            }),
            ["clear", handle] => self.with_container(handle, |c| {
                c.count = 0;
                String::new()
            }),
            ["close", handle] => self.close(handle),
            [command, ..] => Err(format!("invalid command {}", command)),
            [] => Err("empty command".to_string()),
        };

        match result {
            Ok(fields) if fields.is_empty() => "answer ok\r\n".to_string(),
            Ok(fields) => format!("answer ok {}\r\n", fields),
            Err(desc) => format!("answer error {}\r\n", desc),
        }
    }

    fn issue_handle(&mut self, name: &str) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, name.to_string());
        handle
    }

    fn create(&mut self, name: &str, container_type: &str) -> String {
        let container_type = {
            let mut store = lock(&self.store);
            let container = store.entry(name.to_string()).or_insert_with(|| Container {
                container_type: container_type.to_string(),
                count: 0,
            });
            container.container_type.clone()
        };
        let handle = self.issue_handle(name);
        format!("handle {} {}", handle, container_type)
    }

    fn open(&mut self, name: &str) -> Result<String, String> {
        let container_type = match lock(&self.store).get(name) {
            Some(container) => container.container_type.clone(),
            None => return Err("no such container".to_string()),
        };
        let handle = self.issue_handle(name);
        Ok(format!("handle {} {}", handle, container_type))
    }

    fn close(&mut self, handle: &str) -> Result<String, String> {
        let handle: u32 = handle.parse().map_err(|_| "invalid handle".to_string())?;
        self.handles
            .remove(&handle)
            .map(|_| String::new())
            .ok_or_else(|| "invalid handle".to_string())
    }

    fn with_container(
        &self,
        handle: &str,
        f: impl FnOnce(&mut Container) -> String,
    ) -> Result<String, String> {
        let name = handle
            .parse::<u32>()
            .ok()
            .and_then(|h| self.handles.get(&h))
            .ok_or_else(|| "invalid handle".to_string())?;

        let mut store = lock(&self.store);
        let container = store
            .get_mut(name)
            .ok_or_else(|| "no such container".to_string())?;
        Ok(f(container))
    }
}

fn lock(store: &Store) -> std::sync::MutexGuard<'_, HashMap<String, Container>> {
    // A panicked connection thread leaves the counts intact
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
