//! Mock tiobench driver for integration testing
//!
//! Accepts the real driver's stress flags, writes records to the mock tio
//! server on `MOCK_TIO_PORT` and prints the same report lines tiobench
//! does. Behaviour can be skewed for failure tests:
//!
//! - `MOCK_TIOBENCH_DROP`: write this many records fewer than reported
//! - `MOCK_TIOBENCH_EXIT`: exit with this code after reporting
//! - `MOCK_TIOBENCH_SYMBOLS`: space-separated symbols (default `PETR4 VALE5`)

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tiobench_harness::tio::SymbolContainer;

#[derive(Parser)]
#[command(name = "mock_tiobench")]
struct Args {
    #[arg(long = "run-test-parallel-data-stress")]
    parallel_data_stress: bool,

    #[arg(long = "run-test-umdf-feeder-stress")]
    feeder_stress: bool,

    #[arg(long = "umdf-feeder-test-total-operations", default_value_t = 1000)]
    total_operations: u64,

    #[arg(long = "umdf-feeder-test-total-feeders", default_value_t = 20)]
    total_feeders: u64,

    #[arg(long = "umdf-feeder-test-total-clients", default_value_t = 3)]
    total_clients: u64,
}

fn main() {
    let args = Args::parse();

    let drop_records: u64 = env_or("MOCK_TIOBENCH_DROP", 0);
    let exit_code: i32 = env_or("MOCK_TIOBENCH_EXIT", 0);

    println!("tiobench starting...");

    let result = if args.parallel_data_stress {
        parallel_data_stress(&args, drop_records)
    } else if args.feeder_stress {
        feeder_stress(&args, drop_records)
    } else {
        println!("nothing to do");
        Ok(())
    };

    if let Err(e) = result {
        println!("EXCEPTION: {}", e);
        std::process::exit(2);
    }

    io::stdout().flush().ok();
    std::process::exit(exit_code);
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parallel_data_stress(args: &Args, drop_records: u64) -> io::Result<()> {
    let started = Instant::now();
    let mut cn = Connection::open()?;

    let name = format!("parallel_map_{}", std::process::id());
    let handle = cn.create(&name, "volatile_map")?;
    for i in 0..args.total_operations.saturating_sub(drop_records) {
        cn.push_back(handle, i)?;
    }

    let elapsed = started.elapsed().as_secs_f64().max(0.001);
    println!("n={}", args.total_operations);
    println!(
        "MAP {} C:{} R:{:.0} per sec",
        name,
        args.total_operations,
        args.total_operations as f64 / elapsed
    );
    Ok(())
}

fn feeder_stress(args: &Args, drop_records: u64) -> io::Result<()> {
    let symbols: Vec<String> = std::env::var("MOCK_TIOBENCH_SYMBOLS")
        .unwrap_or_else(|_| "PETR4 VALE5".to_string())
        .split(' ')
        .map(str::to_string)
        .collect();

    let mut cn = Connection::open()?;

    let mut books = Vec::new();
    for symbol in &symbols {
        for child in SymbolContainer::ALL {
            let handle = cn.create(&child.path(symbol), "volatile_list")?;
            if child.counts_operations() {
                books.push(handle);
            }
        }
    }

    let total = (args.total_feeders * args.total_operations).saturating_sub(drop_records);
    if !books.is_empty() {
        for i in 0..total {
            let book = books[(i as usize) % books.len()];
            cn.push_back(book, i)?;
        }
    }

    let eol = if cfg!(windows) { "\r\n" } else { "\n" };
    print!("Total Feeders: {}{}", args.total_feeders, eol);
    print!("Symbols: {}{}", symbols.join(" "), eol);
    print!("Total Clients: {}{}", args.total_clients, eol);
    Ok(())
}

/// Blocking text protocol session with the mock server
struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    /// Connect, retrying while the freshly started server comes up
    fn open() -> io::Result<Self> {
        let port: u16 = env_or("MOCK_TIO_PORT", 2605);
        let deadline = Instant::now() + Duration::from_secs(10);

        let stream = loop {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(stream) => break stream,
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(_) => thread::sleep(Duration::from_millis(50)),
            }
        };

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    fn command(&mut self, line: &str) -> io::Result<Vec<String>> {
        write!(self.writer, "{}\r\n", line)?;
        self.writer.flush()?;

        loop {
            let mut answer = String::new();
            if self.reader.read_line(&mut answer)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "server closed"));
            }
            let fields: Vec<String> = answer.split_whitespace().map(str::to_string).collect();
            match fields.first().map(String::as_str) {
                Some("answer") if fields.get(1).map(String::as_str) == Some("ok") => {
                    return Ok(fields[2..].to_vec())
                }
                Some("answer") => {
                    return Err(io::Error::new(io::ErrorKind::Other, answer.trim().to_string()))
                }
                _ => continue,
            }
        }
    }

    fn create(&mut self, name: &str, container_type: &str) -> io::Result<u32> {
        let fields = self.command(&format!("create {} {}", name, container_type))?;
        match fields.as_slice() {
            [tag, handle, ..] if tag == "handle" => handle
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad handle")),
            _ => Err(io::Error::new(io::ErrorKind::InvalidData, "bad create answer")),
        }
    }

    fn push_back(&mut self, handle: u32, value: u64) -> io::Result<()> {
        self.command(&format!("push_back {} {}", handle, value))?;
        Ok(())
    }
}
