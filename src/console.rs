//! Line-oriented interactive session over the pending-jobs table.
//!
//! The console reads one command per line and drives a [`Session`]. Input and
//! output are generic so the loop can be scripted in tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use log::debug;

use crate::{
    api::{ApiClient, Transport},
    data::RowId,
    edits::EditField,
    filter::parse_filter_arg,
    session::{EditOutcome, IntimationKind, LoadReport, SendOutcome, Session, SessionError},
    table,
};

const PROMPT: &str = "intimation> ";

const HELP: &str = "\
Commands:
  show                         print the filtered table
  filter COL=TEXT[; COL=TEXT]  set column filters (empty TEXT removes one)
  clear-filters                remove every filter
  select ID...                 add rows to the selection
  deselect ID...               remove rows from the selection
  select-all                   select every visible row
  deselect-all                 clear the selection
  edit ID FIELD [VALUE]        edit date, cartons or qty (no VALUE reverts)
  date ID DD-MM-YYYY           update the expected delivery date upstream
  send                         send intimations for the selection
  kind first|second            switch intimation type and reload
  refresh                      reload pending jobs
  help                         show this text
  quit                         leave the console";

/// Message shown when a load leaves nothing to display.
pub fn empty_dataset_message(session: &Session) -> &'static str {
    if session.date_range().is_some() {
        "No pending jobs found for the selected date range"
    } else {
        "No pending jobs data available"
    }
}

/// Table of the current view, or the matching empty-state message.
pub fn render_session(session: &Session) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} for {}", session.kind().label(), session.username()));
    if let Some(range) = session.date_range() {
        out.push_str(&format!(" ({})", range.describe()));
    }
    out.push('\n');
    if session.store().is_empty() {
        out.push_str(empty_dataset_message(session));
        out.push('\n');
        return out;
    }
    if session.store().view_len() == 0 {
        out.push_str("No matching records found. Try adjusting your filters.\n");
        return out;
    }
    out.push_str(&table::render_view(session));
    out.push_str(&format!(
        "{} of {} row(s) shown, {} selected [{}]\n",
        session.store().view_len(),
        session.store().len(),
        session.selection().size(),
        session.select_all_label()
    ));
    out
}

pub fn describe_load(report: &LoadReport) -> Option<String> {
    report.drift.map(|drift| {
        format!(
            "Warning: feed has {} column(s), expected {}; column layout may have changed",
            drift.found, drift.expected
        )
    })
}

pub fn describe_send(outcome: &SendOutcome) -> String {
    match outcome {
        SendOutcome::FirstIntimation { sent, results, .. } => match results {
            Some(results) => format!(
                "Sent intimations for {sent} item(s)\n{}",
                table::render_results(results)
            ),
            None => format!("Sent intimations for {sent} item(s)\n"),
        },
        SendOutcome::MaterialReadiness { items, .. } => {
            format!("Successfully sent material readiness data for {items} item(s)\n")
        }
    }
}

/// Confirmation question for a send of the current selection. Fails before
/// asking when there is nothing to send.
pub fn send_prompt(session: &Session) -> Result<String, SessionError> {
    match session.kind() {
        IntimationKind::First => session.confirmation_prompt(),
        IntimationKind::Second => Ok(format!(
            "Send material readiness data for {} item(s)?",
            session.readiness_payload()?.len()
        )),
    }
}

/// Reads a y/N answer; anything but `y`/`yes` declines.
pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{prompt} [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("Reading confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub struct Console<'a, T: Transport> {
    session: &'a mut Session,
    api: &'a ApiClient<T>,
    today: NaiveDate,
}

enum Flow {
    Continue,
    Quit,
}

impl<'a, T: Transport> Console<'a, T> {
    pub fn new(session: &'a mut Session, api: &'a ApiClient<T>, today: NaiveDate) -> Self {
        Self {
            session,
            api,
            today,
        }
    }

    /// Runs until `quit` or end of input. Command failures are reported and
    /// the loop continues; only I/O errors end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, output: &mut W) -> Result<()> {
        write!(output, "{}", render_session(self.session))?;
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("console command: {line}");
            match self.execute(line, &mut input, output) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(err) => writeln!(output, "error: {err:#}")?,
            }
        }
    }

    fn execute<R: BufRead, W: Write>(
        &mut self,
        line: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<Flow> {
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));
        match command {
            "show" => write!(output, "{}", render_session(self.session))?,
            "filter" => {
                let filters = rest
                    .split(';')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(parse_filter_arg)
                    .collect::<Result<Vec<_>>>()?;
                if filters.is_empty() {
                    bail!("Usage: filter COL=TEXT[; COL=TEXT]");
                }
                self.session.filter_by(
                    filters
                        .iter()
                        .map(|(column, text)| (column.as_str(), text.as_str())),
                );
                write!(output, "{}", render_session(self.session))?;
            }
            "clear-filters" => {
                self.session.clear_filters();
                write!(output, "{}", render_session(self.session))?;
            }
            "select" | "deselect" => {
                let ids = parse_ids(rest)?;
                for id in ids {
                    let changed = if command == "select" {
                        self.session.select(id.clone())
                    } else {
                        self.session.deselect(&id)
                    };
                    if !changed {
                        writeln!(output, "{id}: unchanged")?;
                    }
                }
                writeln!(output, "{} selected", self.session.selection().size())?;
            }
            "select-all" => {
                let size = self.session.select_all_visible();
                writeln!(output, "{size} selected")?;
            }
            "deselect-all" => {
                self.session.deselect_all();
                writeln!(output, "0 selected")?;
            }
            "edit" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let (Some(id), Some(field)) = (parts.next(), parts.next()) else {
                    bail!("Usage: edit ID FIELD [VALUE]");
                };
                let id = parse_id(id);
                let field = field.parse::<EditField>()?;
                let value = parts.next().unwrap_or("");
                let label = table::row_label(self.session, &id);
                match self.session.edit(&id, field, value)? {
                    EditOutcome::Set { value, tracked: true } => {
                        writeln!(output, "{label}: {field} set to {value}")?
                    }
                    EditOutcome::Set { value, tracked: false } => {
                        writeln!(output, "{label}: {field} set to {value} (local only)")?
                    }
                    EditOutcome::Cleared => writeln!(output, "{label}: {field} cleared")?,
                }
            }
            "date" => {
                let (id, date) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("Usage: date ID DD-MM-YYYY"))?;
                let id = parse_id(id);
                let canonical = self.session.update_delivery_date(self.api, &id, date)?;
                writeln!(output, "Delivery date of {id} updated to {canonical}")?;
            }
            "send" => {
                let prompt = send_prompt(self.session)?;
                if !confirm(&prompt, input, output)? {
                    writeln!(output, "Cancelled")?;
                    return Ok(Flow::Continue);
                }
                let outcome = self.session.send(self.api, self.today)?;
                write!(output, "{}", describe_send(&outcome))?;
                write!(output, "{}", render_session(self.session))?;
            }
            "kind" => {
                let kind = match rest {
                    "first" | "1" => IntimationKind::First,
                    "second" | "2" => IntimationKind::Second,
                    other => bail!("Unknown intimation kind '{other}' (expected first or second)"),
                };
                if self.session.set_kind(kind) {
                    self.reload(output)
                        .with_context(|| format!("Failed to load {} data", kind.label()))?;
                } else {
                    writeln!(output, "Already showing {}", kind.label())?;
                }
            }
            "refresh" => self.reload(output)?,
            "help" => writeln!(output, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => bail!("Unknown command '{other}'; type help for a list"),
        }
        Ok(Flow::Continue)
    }

    fn reload<W: Write>(&mut self, output: &mut W) -> Result<()> {
        let report = self.session.refresh(self.api, self.today)?;
        if let Some(warning) = describe_load(&report) {
            writeln!(output, "{warning}")?;
        }
        write!(output, "{}", render_session(self.session))?;
        Ok(())
    }
}

fn parse_id(text: &str) -> RowId {
    text.parse::<RowId>().unwrap_or_else(|never| match never {})
}

fn parse_ids(text: &str) -> Result<Vec<RowId>> {
    let ids = text.split_whitespace().map(parse_id).collect::<Vec<_>>();
    if ids.is_empty() {
        bail!("Expected one or more row identifiers");
    }
    Ok(ids)
}
