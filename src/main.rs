//! Interactive shell for exercising a buffer pool manager directly: create
//! and fetch pages, pin/unpin them, force flushes and evictions, and inspect
//! pool state, all against a file-backed disk manager.

use once_cell::sync::Lazy;
use regex::Regex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::{Arc, RwLock};
use talondb::config::PoolConfig;
use talondb::storage::buffer::BufferPoolManager;
use talondb::storage::disk::disk_manager::{DiskManager, FileDiskManager, PageId};

static COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)(?:\s+(.*))?$").expect("static regex is valid"));

const HELP_TEXT: &str = "\
commands:
  new                    allocate a page, print its id
  fetch <id>             pin a page, print its first byte
  poke <id> <byte>       write a byte into a pinned page's first slot, marking it dirty
  unpin <id> [dirty]     unpin a page (dirty defaults to false)
  flush <id>             flush a single page to disk
  flush-all              flush every resident page
  delete <id>            delete a page (fails while pinned)
  status                 print pool occupancy and hit-rate metrics
  help                   print this message
  quit                   exit the shell";

fn main() {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "bufferpool.toml".to_string());
    let db_path = args.next().unwrap_or_else(|| "talondb.db".to_string());

    let config = match PoolConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config from {config_path}: {e}, using defaults");
            PoolConfig::default()
        }
    };

    let disk_manager: Arc<dyn DiskManager> =
        match FileDiskManager::new_with_handle(&db_path, config.page_size) {
            Ok(dm) => dm,
            Err(e) => {
                eprintln!("failed to open database file {db_path}: {e}");
                std::process::exit(1);
            }
        };

    let bpm = BufferPoolManager::new_with_handle(&config, disk_manager);

    println!(
        "talondb shell: pool_size={}, page_size={}, replacer={:?}",
        config.pool_size, config.page_size, config.replacer_policy
    );
    println!("type `help` for a list of commands");

    run_repl(bpm);
}

fn run_repl(bpm: Arc<RwLock<BufferPoolManager>>) {
    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");

    loop {
        let line = match editor.readline("talondb> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let Some(captures) = COMMAND.captures(line) else {
            println!("could not parse command, try `help`");
            continue;
        };
        let command = &captures[1];
        let rest = captures.get(2).map(|m| m.as_str()).unwrap_or("").trim();

        if command == "quit" || command == "exit" {
            break;
        }
        dispatch(&bpm, command, rest);
    }
}

fn dispatch(bpm: &Arc<RwLock<BufferPoolManager>>, command: &str, rest: &str) {
    match command {
        "help" => println!("{HELP_TEXT}"),
        "new" => match bpm.write().unwrap().new_page() {
            Ok(Some((page_id, _))) => println!("allocated page {page_id} (pinned)"),
            Ok(None) => println!("pool exhausted: every frame is pinned"),
            Err(e) => println!("error: {e}"),
        },
        "fetch" => match parse_page_id(rest) {
            Some(page_id) => match bpm.write().unwrap().fetch_page(&page_id) {
                Ok(Some(frame)) => {
                    let byte = frame.read().unwrap().data()[0];
                    println!("fetched page {page_id}, first byte = {byte}");
                }
                Ok(None) => println!("pool exhausted: every frame is pinned"),
                Err(e) => println!("error: {e}"),
            },
            None => println!("usage: fetch <id>"),
        },
        "poke" => {
            let mut parts = rest.split_whitespace();
            let page_id = parts.next().and_then(|s| s.parse::<PageId>().ok());
            let byte = parts.next().and_then(|s| s.parse::<u8>().ok());
            match (page_id, byte) {
                (Some(page_id), Some(byte)) => {
                    let mut pool = bpm.write().unwrap();
                    match pool.fetch_page(&page_id) {
                        Ok(Some(frame)) => {
                            frame.write().unwrap().data_mut()[0] = byte;
                            pool.unpin_page(&page_id, true);
                            println!("wrote byte {byte} into page {page_id}");
                        }
                        Ok(None) => println!("pool exhausted: every frame is pinned"),
                        Err(e) => println!("error: {e}"),
                    }
                }
                _ => println!("usage: poke <id> <byte>"),
            }
        }
        "unpin" => {
            let mut parts = rest.split_whitespace();
            let page_id = parts.next().and_then(|s| s.parse::<PageId>().ok());
            let dirty = parts
                .next()
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            match page_id {
                Some(page_id) => {
                    if bpm.write().unwrap().unpin_page(&page_id, dirty) {
                        println!("unpinned page {page_id}");
                    } else {
                        println!("page {page_id} was not pinned");
                    }
                }
                None => println!("usage: unpin <id> [dirty]"),
            }
        }
        "flush" => match parse_page_id(rest) {
            Some(page_id) => match bpm.write().unwrap().flush_page(&page_id) {
                Ok(true) => println!("flushed page {page_id}"),
                Ok(false) => println!("page {page_id} is not resident"),
                Err(e) => println!("error: {e}"),
            },
            None => println!("usage: flush <id>"),
        },
        "flush-all" => match bpm.write().unwrap().flush_all_pages() {
            Ok(()) => println!("flushed all resident pages"),
            Err(e) => println!("error: {e}"),
        },
        "delete" => match parse_page_id(rest) {
            Some(page_id) => match bpm.write().unwrap().delete_page(page_id) {
                Ok(true) => println!("deleted page {page_id}"),
                Ok(false) => println!("page {page_id} is pinned, cannot delete"),
                Err(e) => println!("error: {e}"),
            },
            None => println!("usage: delete <id>"),
        },
        "status" => {
            let pool = bpm.read().unwrap();
            let metrics = pool.metrics();
            println!(
                "pool_size={} hits={} misses={} evictions={} hit_rate={:.3} p99_fetch={:?}",
                pool.size(),
                metrics.hits(),
                metrics.misses(),
                metrics.evictions(),
                metrics.hit_rate(),
                metrics.fetch_latency_p99(),
            );
        }
        other => println!("unknown command `{other}`, try `help`"),
    }
}

fn parse_page_id(arg: &str) -> Option<PageId> {
    arg.split_whitespace().next()?.parse::<PageId>().ok()
}
