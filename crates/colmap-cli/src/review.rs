//! Console reviewer: answers review tickets from a line-based input.

use std::io::{self, BufRead, Write};

use colmap_approval::{ReviewDesk, ReviewTicket};
use tracing::{debug, info};

/// A reviewer's reply to the approval prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Approve,
    Reject(Option<String>),
}

/// Parses one prompt reply.
///
/// `y`/`yes`/`approve` approve; an empty line or `n`/`no`/`reject` reject.
/// Text after the keyword becomes the note, as in `n wrong key column`.
/// Anything else is unrecognized.
pub fn parse_answer(line: &str) -> Option<Answer> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));
    let note = (!rest.is_empty()).then(|| rest.to_string());
    match word.to_ascii_lowercase().as_str() {
        "y" | "yes" | "approve" => Some(Answer::Approve),
        "" | "n" | "no" | "reject" => Some(Answer::Reject(note)),
        _ => None,
    }
}

/// Serves tickets from `desk` until every broker is dropped or `input`
/// ends. Returns the number of decisions sent.
///
/// A ticket still open when `input` ends is dropped, which the requester
/// sees as the reviewer hanging up.
pub fn serve_desk<R: BufRead, W: Write>(
    desk: &ReviewDesk,
    mut input: R,
    mut output: W,
) -> io::Result<usize> {
    let mut decided = 0;
    for ticket in desk.tickets() {
        match prompt(&ticket, &mut input, &mut output)? {
            Some(Answer::Approve) => {
                info!(correlation_id = %ticket.request.correlation_id, "approved at console");
                ticket.approve();
            }
            Some(Answer::Reject(note)) => {
                info!(correlation_id = %ticket.request.correlation_id, "rejected at console");
                ticket.decide(false, note);
            }
            None => {
                debug!("console input closed during review");
                return Ok(decided);
            }
        }
        decided += 1;
    }
    Ok(decided)
}

fn prompt<R: BufRead, W: Write>(
    ticket: &ReviewTicket,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<Answer>> {
    let payload = &ticket.request.payload;
    writeln!(output, "{}", ticket.request.hint)?;
    if !payload.explanations.is_empty() {
        writeln!(output, "Why:")?;
        for line in &payload.explanations {
            writeln!(output, "  {line}")?;
        }
    }
    for factor in &payload.risk.risk_factors {
        writeln!(output, "Risk factor: {factor}")?;
    }
    loop {
        write!(output, "Approve these mappings? [y/N] ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if let Some(answer) = parse_answer(&line) {
            return Ok(Some(answer));
        }
        writeln!(output, "Please answer y or n.")?;
    }
}
