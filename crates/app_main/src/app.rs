//! Application main loop

use crate::command::{self, Command, HELP};
use crate::console::{self, ConsoleView, Screen};
use anyhow::Result;
use app_core::{AppConfig, Browser};
use app_fs::Entry;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::Duration;

/// How often job results are applied while waiting for input
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Read stdin on its own thread so the loop can keep pumping job results
fn spawn_input() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

pub fn run(config: AppConfig) -> Result<()> {
    let screen = Rc::new(RefCell::new(Screen::default()));
    let start_dir = config.start_dir();
    let mut browser = Browser::new(Box::new(ConsoleView::new(Rc::clone(&screen))), config)?;

    println!("OmniFiler {} - type help for commands", env!("CARGO_PKG_VERSION"));
    browser.navigate_by_path(&start_dir.display().to_string());
    browser.run_until_idle(Duration::from_secs(30));

    let input = spawn_input()?;
    print_prompt(&screen.borrow());

    loop {
        match input.recv_timeout(PUMP_INTERVAL) {
            Ok(line) => {
                let keep_going = match command::parse(&line) {
                    Ok(Some(cmd)) => execute(&mut browser, &screen, cmd),
                    Ok(None) => true,
                    Err(message) => {
                        println!("{}", message);
                        true
                    }
                };
                if !keep_going {
                    break;
                }
                if browser.pump() == 0 && !browser.is_busy() {
                    print_prompt(&screen.borrow());
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if browser.pump() > 0 && !browser.is_busy() {
                    print_prompt(&screen.borrow());
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!("Shutting down");
    browser.cleanup();
    Ok(())
}

/// Apply one command. Returns `false` to exit.
fn execute(browser: &mut Browser, screen: &Rc<RefCell<Screen>>, cmd: Command) -> bool {
    tracing::debug!("Command: {:?}", cmd);
    match &cmd {
        Command::List => console::print_listing(&screen.borrow()),
        Command::Cd(path) => browser.navigate_by_path(path),
        Command::Open(i) | Command::Select(i) => {
            let entry = screen.borrow().entry(*i).cloned();
            match (entry, &cmd) {
                (None, _) => println!("no entry {}", i),
                (Some(entry), Command::Open(_)) => browser.activate(&entry),
                (Some(entry), _) => browser.select(&entry),
            }
        }
        Command::Up => browser.navigate_up(),
        Command::Back => browser.navigate_back(),
        Command::Forward => browser.navigate_forward(),
        Command::Ftp {
            host,
            port,
            user,
            pass,
        } => browser.connect(host, port, user, pass),
        Command::Disconnect => browser.disconnect(),
        Command::Cancel => browser.cancel(),
        Command::Roots => {
            let mut screen = screen.borrow_mut();
            screen.entries = app_fs::list_roots()
                .into_iter()
                .map(Entry::Local)
                .collect();
            console::print_listing(&screen);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

fn print_prompt(screen: &Screen) {
    print!("{}", screen.prompt());
    let _ = std::io::stdout().flush();
}

