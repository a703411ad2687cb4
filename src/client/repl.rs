//! Interactive REPL
//!
//! Line-oriented front end over [`Client`]. Protocol errors are printed by
//! their taxonomy kind and the loop continues; transport faults trigger a
//! bounded reconnection back-off.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crate::client::Client;
use crate::error::QooilError;

const HELP: &str = "\
Commands:
  help                  show this help
  ping                  check the server is alive
  pwd                   print the remote working directory
  cd <dir>              change the remote working directory
  ls [dir]              list a remote directory
  cat <file>            print a remote file
  get <remote> <local>  download a file
  put <remote> <local>  upload a file
  delete <file>         delete a remote file
  stat <path>           show what a remote path is
  quit                  close the session and exit";

/// Reconnection attempts before giving up
const RECONNECT_ATTEMPTS: u32 = 5;

/// Run the REPL against `addr` until quit or the connection is lost for
/// good; returns the process exit code
pub fn run(addr: &str) -> i32 {
    let mut client = match connect_with_backoff(addr) {
        Some(client) => client,
        None => {
            eprintln!("could not connect to {addr}");
            return 1;
        }
    };
    println!("connected to {addr} (type 'help' for commands)");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("qooil> ");
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                // EOF on stdin behaves like quit
                let _ = client.close();
                return 0;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("stdin error: {e}");
                return 1;
            }
        }

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        if command == "quit" {
            match client.close() {
                Ok(()) => return 0,
                Err(e) => {
                    eprintln!("error: {e}");
                    return 0;
                }
            }
        }

        match execute(&mut client, command, &args) {
            Ok(()) => {}
            Err(QooilError::Protocol { kind, .. }) => println!("error: {kind}"),
            Err(e) => {
                eprintln!("connection lost: {e}");
                match connect_with_backoff(addr) {
                    Some(fresh) => {
                        client = fresh;
                        println!("reconnected");
                    }
                    None => {
                        eprintln!("could not reconnect to {addr}");
                        return 1;
                    }
                }
            }
        }
    }
}

fn execute(client: &mut Client, command: &str, args: &[&str]) -> crate::Result<()> {
    match (command, args) {
        ("help", _) => {
            println!("{HELP}");
            Ok(())
        }
        ("ping", _) => {
            client.ping()?;
            println!("pong");
            Ok(())
        }
        ("pwd", _) => {
            println!("{}", client.cwd()?);
            Ok(())
        }
        ("cd", [dir]) => client.set_cwd(dir),
        ("ls", []) => list(client, "."),
        ("ls", [dir]) => list(client, dir),
        ("cat", [file]) => {
            let mut stdout = io::stdout().lock();
            client.get_file(file, &mut stdout)?;
            let _ = stdout.flush();
            Ok(())
        }
        ("get", [remote, local]) => {
            let mut out = File::create(local)?;
            let size = client.get_file(remote, &mut out)?;
            println!("{size} bytes");
            Ok(())
        }
        ("put", [remote, local]) => {
            let mut input = File::open(local)?;
            let size = input.metadata()?.len();
            client.put_file(remote, &mut input, size)?;
            println!("{size} bytes");
            Ok(())
        }
        ("delete", [file]) => client.delete_file(file),
        ("stat", [path]) => stat(client, path),
        _ => {
            println!("unknown or malformed command (type 'help')");
            Ok(())
        }
    }
}

fn list(client: &mut Client, dir: &str) -> crate::Result<()> {
    client.list_entries(dir)?;
    while let Some(entry) = client.read_entry()? {
        if entry.is_dir {
            println!("{}/", entry.name_lossy());
        } else {
            println!("{}", entry.name_lossy());
        }
    }
    Ok(())
}

/// The protocol has no stat message; list the parent and match the name.
fn stat(client: &mut Client, path: &str) -> crate::Result<()> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => (".", trimmed),
    };
    if name.is_empty() {
        println!("stat: invalid path");
        return Ok(());
    }

    client.list_entries(parent)?;
    let mut found = None;
    while let Some(entry) = client.read_entry()? {
        if entry.name == name.as_bytes() {
            found = Some(entry);
        }
    }
    match found {
        Some(entry) if entry.is_dir => println!("{name}: directory"),
        Some(_) => println!("{name}: file"),
        None => println!("{name}: not found"),
    }
    Ok(())
}

fn connect_with_backoff(addr: &str) -> Option<Client> {
    let mut delay = Duration::from_millis(500);
    for attempt in 1..=RECONNECT_ATTEMPTS {
        match Client::connect(addr) {
            Ok(client) => return Some(client),
            Err(e) => {
                tracing::warn!("connect attempt {attempt}/{RECONNECT_ATTEMPTS} failed: {e}");
                if attempt < RECONNECT_ATTEMPTS {
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    None
}
