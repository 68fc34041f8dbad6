//! Interactive loop for `medallion chat`
//!
//! `quit`/`exit` (or end of input) leave the loop; blank lines are ignored.

use std::io::{self, BufRead, Write};

use crate::llm::LlmAdapter;
use crate::session::{Session, SessionState};
use crate::warehouse::Warehouse;

const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

const BANNER: &str = "Medallion transform agent. Type `help` for examples, `quit` to leave.";

/// Drive `session` from `input` until quit or end of input
///
/// Returns the number of turns handled.
pub fn run_repl<W, A, R, O>(session: &mut Session<W, A>, input: R, output: &mut O) -> io::Result<usize>
where
    W: Warehouse,
    A: LlmAdapter,
    R: BufRead,
    O: Write,
{
    writeln!(output, "{}", BANNER)?;
    writeln!(output, "Connected to {}", session.warehouse().endpoint())?;

    let mut turns = 0;
    let mut lines = input.lines();
    loop {
        write!(output, "{}", prompt(session.state()))?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;
        let message = line.trim();

        if message.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }

        let reply = session.handle(message);
        writeln!(output, "\n{}\n", reply)?;
        turns += 1;
    }

    writeln!(output, "Goodbye.")?;
    Ok(turns)
}

fn prompt(state: SessionState) -> &'static str {
    match state {
        SessionState::AwaitingConfirmation => "confirm> ",
        _ => "> ",
    }
}
