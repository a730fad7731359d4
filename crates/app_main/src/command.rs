//! Console command parsing

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Cd(String),
    Open(usize),
    Select(usize),
    Up,
    Back,
    Forward,
    Ftp {
        host: String,
        port: String,
        user: String,
        pass: String,
    },
    Disconnect,
    Cancel,
    Roots,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  ls                              show the current listing
  cd <path>                       go to a local directory
  open <n>                        enter entry n, or open it with the desktop
  sel <n>                         preview entry n
  up | back | fwd                 navigate
  ftp <host> [port] [user] [pass] connect to an FTP server
  disconnect                      close the FTP session
  cancel                          stop the running job
  roots                           list file system roots
  help                            show this text
  quit                            exit";

/// Parse one input line. Empty lines give `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "" => return Ok(None),
        "ls" => Command::List,
        "cd" if rest.is_empty() => return Err("usage: cd <path>".to_string()),
        "cd" => Command::Cd(rest.to_string()),
        "open" => Command::Open(index(rest)?),
        "sel" => Command::Select(index(rest)?),
        "up" | ".." => Command::Up,
        "back" => Command::Back,
        "fwd" | "forward" => Command::Forward,
        "ftp" => {
            let mut args = rest.split_whitespace().map(str::to_string);
            let host = args
                .next()
                .ok_or_else(|| "usage: ftp <host> [port] [user] [pass]".to_string())?;
            // "-" leaves a field blank
            let mut field = || args.next().filter(|a| a != "-").unwrap_or_default();
            Command::Ftp {
                host,
                port: field(),
                user: field(),
                pass: field(),
            }
        }
        "disconnect" => Command::Disconnect,
        "cancel" => Command::Cancel,
        "roots" => Command::Roots,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {} (try help)", other)),
    };
    Ok(Some(command))
}

fn index(arg: &str) -> Result<usize, String> {
    arg.parse()
        .map_err(|_| format!("expected an entry number, got {:?}", arg))
}
