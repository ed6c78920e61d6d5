use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    data::RowId,
    edits::EditField,
    session::{DEFAULT_HIDDEN_TRAILING, IntimationKind},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Review pending jobs and send WhatsApp delivery intimations",
    long_about = None
)]
pub struct Cli {
    /// Settings file holding the signed-in user and the API base override
    #[arg(
        long,
        global = true,
        env = "INTIMATION_STATE",
        default_value = "intimation-settings.yaml"
    )]
    pub state: PathBuf,
    /// API base URL for this run, overriding the stored one
    #[arg(long = "api-base", global = true, env = "INTIMATION_API_BASE")]
    pub api_base: Option<String>,
    /// Trailing feed columns that are never displayed
    #[arg(long = "hidden-trailing", global = true, default_value_t = DEFAULT_HIDDEN_TRAILING)]
    pub hidden_trailing: usize,
    /// Expected column count of the feed; a mismatch is reported as schema drift
    #[arg(long = "expected-columns", global = true)]
    pub expected_columns: Option<usize>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and list first-intimation pending jobs
    Login(LoginArgs),
    /// Forget the signed-in user
    Logout,
    /// List pending jobs for the signed-in user
    Pending(PendingArgs),
    /// Send intimations for selected jobs
    Send(SendArgs),
    /// Change the expected delivery date of one job
    UpdateDate(UpdateDateArgs),
    /// Show how the columns of a saved feed would be classified
    Classify(ClassifyArgs),
    /// Show or change stored settings
    Config(ConfigArgs),
    /// Interactive session over the pending-jobs table
    Console(ConsoleArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username to sign in as
    pub username: String,
}

#[derive(Debug, Args)]
pub struct PendingArgs {
    /// Which intimation's pending jobs to fetch
    #[arg(long, value_enum, default_value_t = IntimationKind::First)]
    pub kind: IntimationKind,
    /// Column filters of the form `column=text` (case-insensitive substring)
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Print the filtered rows as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[arg(long, value_enum, default_value_t = IntimationKind::First)]
    pub kind: IntimationKind,
    /// Column filters applied before selection
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Row identifiers to select (order booking id or `row-N`)
    #[arg(long = "id", action = clap::ArgAction::Append, conflicts_with = "all")]
    pub ids: Vec<RowId>,
    /// Select every row in the filtered view
    #[arg(long)]
    pub all: bool,
    /// Field edits of the form `ID:FIELD=VALUE` (fields: date, cartons, qty)
    #[arg(long = "edit", action = clap::ArgAction::Append, value_parser = parse_edit)]
    pub edits: Vec<EditArg>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct UpdateDateArgs {
    /// Which intimation's pending jobs hold the row
    #[arg(long, value_enum, default_value_t = IntimationKind::First)]
    pub kind: IntimationKind,
    /// Order booking identifier of the job
    #[arg(long)]
    pub id: RowId,
    /// New expected delivery date (DD-MM-YYYY)
    #[arg(long)]
    pub date: String,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Saved feed (`.json` rows or fetch response, `.csv` export, `-` for stdin)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Intimation kind whose editable columns apply
    #[arg(long, value_enum, default_value_t = IntimationKind::First)]
    pub kind: IntimationKind,
    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the stored user and the API base in effect
    Show,
    /// Store an API base override
    SetApiBase {
        /// Absolute http:// or https:// URL
        url: String,
    },
    /// Remove the API base override
    ClearApiBase,
}

#[derive(Debug, Args)]
pub struct ConsoleArgs {
    #[arg(long, value_enum, default_value_t = IntimationKind::First)]
    pub kind: IntimationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditArg {
    pub id: RowId,
    pub field: EditField,
    pub value: String,
}

pub fn parse_edit(value: &str) -> Result<EditArg, String> {
    let (id, rest) = value
        .split_once(':')
        .ok_or_else(|| format!("Edit '{value}' must look like ID:FIELD=VALUE"))?;
    let (field, input) = rest
        .split_once('=')
        .ok_or_else(|| format!("Edit '{value}' must look like ID:FIELD=VALUE"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("Edit '{value}' is missing a row identifier"));
    }
    let field = field.parse::<EditField>().map_err(|err| err.to_string())?;
    Ok(EditArg {
        id: id.parse::<RowId>().unwrap_or_else(|never| match never {}),
        field,
        value: input.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_edit_splits_id_field_and_value() {
        let edit = parse_edit("101:cartons=12").unwrap();
        assert_eq!(edit.id, RowId::Order("101".into()));
        assert_eq!(edit.field, EditField::NoOfCarton);
        assert_eq!(edit.value, "12");

        let cleared = parse_edit("row-3:date=").unwrap();
        assert_eq!(cleared.id, RowId::Position(3));
        assert_eq!(cleared.value, "");
    }

    #[test]
    fn update_date_accepts_a_kind() {
        let cli = Cli::try_parse_from([
            "intimation-desk",
            "update-date",
            "--kind",
            "second",
            "--id",
            "201",
            "--date",
            "25-12-2024",
        ])
        .unwrap();
        let Commands::UpdateDate(args) = cli.command else {
            panic!("expected update-date");
        };
        assert_eq!(args.kind, IntimationKind::Second);
        assert_eq!(args.id, RowId::Order("201".into()));

        let cli = Cli::try_parse_from([
            "intimation-desk",
            "update-date",
            "--id",
            "101",
            "--date",
            "25-12-2024",
        ])
        .unwrap();
        let Commands::UpdateDate(args) = cli.command else {
            panic!("expected update-date");
        };
        assert_eq!(args.kind, IntimationKind::First);
    }

    #[test]
    fn parse_edit_rejects_malformed_input() {
        assert!(parse_edit("101cartons=12").is_err());
        assert!(parse_edit("101:cartons").is_err());
        assert!(parse_edit(":qty=1").is_err());
        assert!(parse_edit("101:colour=red").is_err());
    }
}
