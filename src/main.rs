// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{self, BufRead, Write};

use mimalloc::MiMalloc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use poscore::error::UciError;
use poscore::misc::engine_info;
use poscore::movegen::{divide, MoveList};
use poscore::tree::{NodeId, Tree};
use poscore::{bitboard, uci, Config, Position};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

struct Session {
    config: Config,
    tree: Tree,
    current: NodeId,
}

impl Session {
    fn new(config: Config) -> Session {
        let tree = Tree::with_config(Position::startpos(), &config);
        let current = tree.root();
        Session {
            config,
            tree,
            current,
        }
    }

    fn position(&self) -> &Position {
        self.tree.position(self.current)
    }

    // Handles one command line. Returns false on "quit".
    fn handle(&mut self, line: &str, out: &mut impl Write) -> Result<bool, UciError> {
        let (cmd, args) = match line.trim().split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (line.trim(), ""),
        };

        match cmd {
            "" => {}
            "quit" | "stop" => return Ok(false),
            "uci" => {
                writeln!(out, "id name {}", engine_info(true))?;
                writeln!(out, "uciok")?;
            }
            "isready" => {
                writeln!(out, "readyok")?;
            }
            "ucinewgame" => *self = Session::new(self.config.clone()),
            "position" => {
                let command = uci::parse_position(args)?;
                let (tree, current) =
                    command.build_tree(self.config.chess960, self.config.halfmove_limit)?;
                self.tree = tree;
                self.current = current;
                debug!(fen = %self.position().fen(), "position set");
            }
            "d" => {
                writeln!(out, "{}", self.position())?;
            }
            "moves" => {
                let chess960 = self.position().is_chess960();
                let moves: Vec<String> = MoveList::legal(self.position())
                    .iter()
                    .map(|&m| uci::move_str(m, chess960))
                    .collect();
                writeln!(out, "{}", moves.join(" "))?;
            }
            "draw" => {
                writeln!(out, "{}", self.tree.is_draw(self.current))?;
            }
            "perft" => self.perft(args.split_whitespace().next(), out)?,
            "go" => {
                let mut tokens = args.split_whitespace();
                match tokens.next() {
                    Some("perft") => self.perft(tokens.next(), out)?,
                    _ => warn!(args, "only 'go perft <depth>' is supported"),
                }
            }
            _ => warn!(command = cmd, "unknown command"),
        }

        Ok(true)
    }

    fn perft(&self, depth: Option<&str>, out: &mut impl Write) -> Result<(), UciError> {
        let depth = uci::parse_depth(depth)?;
        let pos = self.position();
        let start = std::time::Instant::now();

        let mut nodes = 0;
        for (m, count) in divide(pos, depth) {
            writeln!(out, "{}: {}", uci::move_str(m, pos.is_chess960()), count)?;
            nodes += count;
        }
        writeln!(out, "\nNodes searched: {nodes}")?;

        info!(depth, nodes, elapsed_ms = start.elapsed().as_millis() as u64, "perft finished");
        Ok(())
    }
}

fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("poscore=info")),
        )
        .with_writer(io::stderr)
        .init();

    info!("{}", engine_info(false));
    bitboard::init();

    let mut session = Session::new(config);
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read stdin: {e}");
                break;
            }
        };

        let mut out = stdout.lock();
        let handled = session.handle(&line, &mut out);
        let flushed = out.flush().map_err(UciError::from);
        match handled.and_then(|go_on| flushed.map(|_| go_on)) {
            Ok(true) => {}
            Ok(false) => break,
            Err(UciError::Output(e)) => {
                error!("{e}");
                break;
            }
            Err(e) => warn!(command = %line, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_reported() {
        let mut session = Session::new(Config::default());
        assert_eq!(
            session.handle("isready", &mut ClosedPipe),
            Err(UciError::Output("closed".to_string()))
        );
    }

    #[test]
    fn commands_write_their_answers() {
        let mut session = Session::new(Config::default());
        let mut out = Vec::new();
        assert_eq!(session.handle("position startpos moves e2e4", &mut out), Ok(true));
        assert_eq!(session.handle("perft 1", &mut out), Ok(true));
        assert_eq!(session.handle("quit", &mut out), Ok(false));
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("Nodes searched: 20\n"));
    }
}
