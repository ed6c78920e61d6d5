//! Column role detection for pending-job feeds.
//!
//! The feed's column set is only known at runtime, so the columns that drive
//! behaviour (the editable delivery date, the carton fields, the contact
//! number) are located by matching their names against ordered rule lists.
//! A role that nothing matches is reported as absent; the features that
//! depend on it are simply not offered.

use std::fmt;

use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnRole {
    Mobile,
    FinalDeliveryDate,
    JobName,
    ClientName,
    ReadinessDate,
    CartonCount,
    QtyPerCarton,
    Plain,
}

impl ColumnRole {
    pub const TRACKED: [ColumnRole; 7] = [
        ColumnRole::Mobile,
        ColumnRole::FinalDeliveryDate,
        ColumnRole::JobName,
        ColumnRole::ClientName,
        ColumnRole::ReadinessDate,
        ColumnRole::CartonCount,
        ColumnRole::QtyPerCarton,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ColumnRole::Mobile => "mobile",
            ColumnRole::FinalDeliveryDate => "final-delivery-date",
            ColumnRole::JobName => "job-name",
            ColumnRole::ClientName => "client-name",
            ColumnRole::ReadinessDate => "readiness-date",
            ColumnRole::CartonCount => "carton-count",
            ColumnRole::QtyPerCarton => "qty-per-carton",
            ColumnRole::Plain => "plain",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the carton columns are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditableColumns {
    /// Readiness date, carton count and quantity per carton found by name.
    #[default]
    Heuristic,
    /// Fixed zero-based positions; the readiness date is not tracked.
    Positional {
        carton_count: usize,
        qty_per_carton: usize,
    },
}

/// Human-readable header: a space before each capital letter, underscores
/// to spaces, first letter capitalised, trimmed.
pub fn display_name(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 8);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(if ch == '_' { ' ' } else { ch });
    }
    let mut chars = spaced.chars();
    let capitalised = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    capitalised.trim().to_string()
}

/// Lowercased name forms shared by every rule.
#[derive(Debug, Clone)]
pub struct ColumnName {
    pub key: String,
    pub display: String,
    display_lower: String,
    key_lower: String,
    combined: String,
}

impl ColumnName {
    pub fn new(key: &str) -> Self {
        let display = display_name(key);
        let display_lower = display.to_lowercase();
        let key_lower = key.to_lowercase();
        let combined = format!("{display_lower} {key_lower}");
        Self {
            key: key.to_string(),
            display,
            display_lower,
            key_lower,
            combined,
        }
    }

    /// Identifier columns such as "Dispatch Schedule ID".
    pub fn is_internal_id(&self) -> bool {
        is_internal_id_text(&self.combined)
    }

    pub fn is_date_like(&self) -> bool {
        is_date_column(&self.display)
    }
}

fn is_internal_id_text(text: &str) -> bool {
    text.contains("id") && (text.contains("schedule") || text.contains("dispatch"))
}

/// Date-likeness test on a display name, after excluding identifier columns.
pub fn is_date_column(display: &str) -> bool {
    let lower = display.to_lowercase();
    if is_internal_id_text(&lower) {
        return false;
    }
    let has_date = lower.contains("date");
    if (lower.ends_with(" id") || lower.ends_with("id")) && !has_date {
        return false;
    }
    if (lower.contains("dispatch") || lower.contains("schedule")) && !has_date && lower.contains("id")
    {
        return false;
    }
    let keyword = ["date", "delivery", "order date"]
        .iter()
        .any(|word| lower.contains(word));
    let schedule_date = lower.contains("schedule")
        && !lower.contains("id")
        && (has_date || lower.contains("delivery"));
    keyword || schedule_date
}

/// One heuristic in a role's ordered rule list.
#[derive(Debug, Clone, Copy)]
pub enum RoleRule {
    /// Display name or raw key contains any phrase.
    Phrase(&'static [&'static str]),
    /// Display name contains any phrase.
    DisplayPhrase(&'static [&'static str]),
    /// Raw key contains any phrase.
    KeyPhrase(&'static [&'static str]),
    /// Display name contains every word.
    DisplayWords(&'static [&'static str]),
    /// Display and key together contain one of `any`, all of `all`, and
    /// none of `none`.
    Combined {
        any: &'static [&'static str],
        all: &'static [&'static str],
        none: &'static [&'static str],
    },
}

impl RoleRule {
    pub fn matches(&self, name: &ColumnName) -> bool {
        match self {
            RoleRule::Phrase(phrases) => phrases
                .iter()
                .any(|p| name.display_lower.contains(p) || name.key_lower.contains(p)),
            RoleRule::DisplayPhrase(phrases) => {
                phrases.iter().any(|p| name.display_lower.contains(p))
            }
            RoleRule::KeyPhrase(phrases) => phrases.iter().any(|p| name.key_lower.contains(p)),
            RoleRule::DisplayWords(words) => words.iter().all(|w| name.display_lower.contains(w)),
            RoleRule::Combined { any, all, none } => {
                (any.is_empty() || any.iter().any(|w| name.combined.contains(w)))
                    && all.iter().all(|w| name.combined.contains(w))
                    && !none.iter().any(|w| name.combined.contains(w))
            }
        }
    }
}

/// Rule list for one role.
#[derive(Debug, Clone, Copy)]
pub struct RoleMatcher {
    pub role: ColumnRole,
    pub skip_internal_ids: bool,
    pub rules: &'static [RoleRule],
}

impl RoleMatcher {
    pub fn matches(&self, name: &ColumnName) -> bool {
        if self.skip_internal_ids && name.is_internal_id() {
            return false;
        }
        self.rules.iter().any(|rule| rule.matches(name))
    }

    /// Index of the first column this matcher accepts.
    pub fn find(&self, names: &[ColumnName]) -> Option<usize> {
        names.iter().position(|name| self.matches(name))
    }
}

pub const MOBILE: RoleMatcher = RoleMatcher {
    role: ColumnRole::Mobile,
    skip_internal_ids: false,
    rules: &[RoleRule::DisplayPhrase(&["mobile", "concern mobile"])],
};

pub const FINAL_DELIVERY_DATE: RoleMatcher = RoleMatcher {
    role: ColumnRole::FinalDeliveryDate,
    skip_internal_ids: true,
    rules: &[
        RoleRule::Phrase(&[
            "final delivery date",
            "finaldeliverydate",
            "final delivery",
            "finaldelivery",
            "final_delivery_date",
            "expected delivery date",
            "expecteddeliverydate",
        ]),
        RoleRule::Combined {
            any: &[],
            all: &["final", "delivery", "date"],
            none: &[],
        },
    ],
};

pub const JOB_NAME: RoleMatcher = RoleMatcher {
    role: ColumnRole::JobName,
    skip_internal_ids: false,
    rules: &[
        RoleRule::DisplayPhrase(&["job name"]),
        RoleRule::KeyPhrase(&["jobname", "job_name"]),
        RoleRule::DisplayWords(&["job", "name"]),
    ],
};

pub const CLIENT_NAME: RoleMatcher = RoleMatcher {
    role: ColumnRole::ClientName,
    skip_internal_ids: false,
    rules: &[
        RoleRule::DisplayPhrase(&["client name"]),
        RoleRule::KeyPhrase(&["clientname", "client_name"]),
        RoleRule::DisplayWords(&["client", "name"]),
    ],
};

pub const READINESS_DATE: RoleMatcher = RoleMatcher {
    role: ColumnRole::ReadinessDate,
    skip_internal_ids: true,
    rules: &[
        RoleRule::Phrase(&[
            "readiness date",
            "readinessdate",
            "ready for dispatch date",
            "readyfordispatchdate",
        ]),
        RoleRule::Combined {
            any: &["ready", "readiness"],
            all: &["date"],
            none: &[],
        },
    ],
};

pub const CARTON_COUNT: RoleMatcher = RoleMatcher {
    role: ColumnRole::CartonCount,
    skip_internal_ids: false,
    rules: &[
        RoleRule::Phrase(&[
            "no of carton",
            "noofcarton",
            "no_of_carton",
            "number of carton",
            "carton count",
            "cartoncount",
        ]),
        RoleRule::Combined {
            any: &["carton"],
            all: &[],
            none: &["qty", "quantity", "per"],
        },
    ],
};

pub const QTY_PER_CARTON: RoleMatcher = RoleMatcher {
    role: ColumnRole::QtyPerCarton,
    skip_internal_ids: false,
    rules: &[
        RoleRule::Phrase(&[
            "qty per carton",
            "qtypercarton",
            "qty_per_carton",
            "quantity per carton",
        ]),
        RoleRule::Combined {
            any: &["qty", "quantity"],
            all: &["carton"],
            none: &[],
        },
    ],
};

/// Role assignments as indices into the visible column list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub mobile: Option<usize>,
    pub final_delivery_date: Option<usize>,
    pub job_name: Option<usize>,
    pub client_name: Option<usize>,
    pub readiness_date: Option<usize>,
    pub carton_count: Option<usize>,
    pub qty_per_carton: Option<usize>,
}

impl ColumnRoles {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Mobile => self.mobile,
            ColumnRole::FinalDeliveryDate => self.final_delivery_date,
            ColumnRole::JobName => self.job_name,
            ColumnRole::ClientName => self.client_name,
            ColumnRole::ReadinessDate => self.readiness_date,
            ColumnRole::CartonCount => self.carton_count,
            ColumnRole::QtyPerCarton => self.qty_per_carton,
            ColumnRole::Plain => None,
        }
    }

    /// Index in the -1-for-missing convention of the upstream dashboards.
    pub fn index_or_missing(&self, role: ColumnRole) -> i64 {
        self.get(role).map(|idx| idx as i64).unwrap_or(-1)
    }

    /// Role held by the column at `index`, `Plain` when it has none.
    pub fn role_of(&self, index: usize) -> ColumnRole {
        ColumnRole::TRACKED
            .into_iter()
            .find(|role| self.get(*role) == Some(index))
            .unwrap_or(ColumnRole::Plain)
    }
}

/// Keys left after hiding the feed's trailing technical columns. When the
/// feed has no more columns than that, everything is shown.
pub fn visible_columns<S: AsRef<str>>(keys: &[S], hidden_trailing: usize) -> Vec<String> {
    let shown = if keys.len() > hidden_trailing {
        &keys[..keys.len() - hidden_trailing]
    } else {
        keys
    };
    shown.iter().map(|key| key.as_ref().to_string()).collect()
}

pub fn classify<S: AsRef<str>>(keys: &[S], editable: EditableColumns) -> ColumnRoles {
    let names = keys
        .iter()
        .map(|key| ColumnName::new(key.as_ref()))
        .collect::<Vec<_>>();

    let mut roles = ColumnRoles {
        mobile: MOBILE.find(&names),
        job_name: JOB_NAME.find(&names),
        client_name: CLIENT_NAME.find(&names),
        ..ColumnRoles::default()
    };

    match editable {
        EditableColumns::Heuristic => {
            roles.readiness_date = READINESS_DATE.find(&names);
            roles.carton_count = CARTON_COUNT.find(&names);
            roles.qty_per_carton = QTY_PER_CARTON.find(&names);
        }
        EditableColumns::Positional {
            carton_count,
            qty_per_carton,
        } => {
            roles.carton_count = (carton_count < names.len()).then_some(carton_count);
            roles.qty_per_carton = (qty_per_carton < names.len()).then_some(qty_per_carton);
        }
    }

    roles.final_delivery_date = FINAL_DELIVERY_DATE
        .find(&names)
        .or_else(|| last_date_column(&names, roles.readiness_date));

    // A fixed position never overrides the delivery date column.
    if let EditableColumns::Positional { .. } = editable {
        let delivery = roles.final_delivery_date;
        roles.carton_count = roles.carton_count.filter(|idx| Some(*idx) != delivery);
        roles.qty_per_carton = roles.qty_per_carton.filter(|idx| Some(*idx) != delivery);
    }

    debug!(
        "Column roles: mobile={:?} final_delivery_date={:?} job_name={:?} client_name={:?} readiness_date={:?} carton_count={:?} qty_per_carton={:?}",
        roles.mobile,
        roles.final_delivery_date,
        roles.job_name,
        roles.client_name,
        roles.readiness_date,
        roles.carton_count,
        roles.qty_per_carton
    );
    roles
}

// The feed conventionally puts the final delivery date after every other date.
fn last_date_column(names: &[ColumnName], claimed: Option<usize>) -> Option<usize> {
    let candidates = names
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            Some(*idx) != claimed && !name.is_internal_id() && name.is_date_like()
        })
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    match candidates.last() {
        Some(idx) => {
            warn!(
                "Final delivery date column not found by name; using last date column '{}' of [{}]",
                names[*idx].key,
                candidates.iter().map(|i| names[*i].key.as_str()).join(", ")
            );
            Some(*idx)
        }
        None => {
            warn!("No final delivery date column found; delivery date edits are unavailable");
            None
        }
    }
}

/// Per-column summary used by the `classify` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub index: usize,
    pub key: String,
    pub display: String,
    pub date_like: bool,
    pub role: ColumnRole,
}

pub fn describe<S: AsRef<str>>(keys: &[S], roles: &ColumnRoles) -> Vec<ColumnSummary> {
    keys.iter()
        .enumerate()
        .map(|(index, key)| {
            let name = ColumnName::new(key.as_ref());
            ColumnSummary {
                index,
                date_like: !name.is_internal_id() && name.is_date_like(),
                display: name.display,
                key: name.key,
                role: roles.role_of(index),
            }
        })
        .collect()
}
