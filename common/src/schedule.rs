// Five-field time-plan parsing, description and next fire time calculation
//
// Expressions follow the classic crontab layout:
// minute hour day-of-month month day-of-week
// Each field accepts `*`, integers, `a-b` ranges, `a,b,c` lists and `/n` steps.

use crate::errors::ScheduleError;
use chrono::{DateTime, TimeZone};
use cron::Schedule as CronSchedule;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Position of a field inside the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day-of-month",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day-of-week",
        }
    }

    /// Inclusive bounds accepted in the source text (day-of-week allows 7 for Sunday)
    pub fn bounds(self) -> (u32, u32) {
        match self {
            FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::DayOfMonth => (1, 31),
            FieldKind::Month => (1, 12),
            FieldKind::DayOfWeek => (0, 7),
        }
    }

    fn normalize(self, value: u32) -> u32 {
        match (self, value) {
            (FieldKind::DayOfWeek, 7) => 0,
            _ => value,
        }
    }

    fn full_set(self) -> BTreeSet<u32> {
        let (min, max) = self.bounds();
        (min..=max).map(|v| self.normalize(v)).collect()
    }
}

/// Range a step applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBase {
    Any,
    From(u32),
    Range(u32, u32),
}

/// One comma-separated item of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Any,
    Value(u32),
    Range(u32, u32),
    Step { base: StepBase, step: u32 },
}

/// A parsed field with its expanded set of matching values
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    source: String,
    terms: Vec<Term>,
    values: BTreeSet<u32>,
}

impl Field {
    fn parse(kind: FieldKind, source: &str, expression: &str) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::InvalidCronExpression {
            expression: expression.to_string(),
            reason,
        };

        let mut terms = Vec::new();
        let mut values = BTreeSet::new();

        for item in source.split(',') {
            if item.is_empty() {
                return Err(invalid(format!(
                    "{} field '{}' has an empty list item",
                    kind.name(),
                    source
                )));
            }
            let term = parse_term(kind, item).map_err(invalid)?;
            let (start, end, step) = term_span(kind, term);
            values.extend((start..=end).step_by(step as usize).map(|v| kind.normalize(v)));
            terms.push(term);
        }

        Ok(Self {
            kind,
            source: source.to_string(),
            terms,
            values,
        })
    }

    pub fn values(&self) -> &BTreeSet<u32> {
        &self.values
    }

    /// Classic cron treats a field written with a leading `*` as unrestricted
    /// when combining day-of-month with day-of-week.
    fn is_star(&self) -> bool {
        self.source.starts_with('*')
    }

    fn single_term(&self) -> Option<Term> {
        match self.terms.as_slice() {
            [term] => Some(*term),
            _ => None,
        }
    }

    fn plain_values(&self) -> Option<Vec<u32>> {
        self.terms
            .iter()
            .map(|term| match term {
                Term::Value(v) => Some(self.kind.normalize(*v)),
                _ => None,
            })
            .collect()
    }

    /// Field rendered in the six-field syntax understood by the `cron` crate
    fn to_cron_crate_field(&self) -> String {
        if self.values == self.kind.full_set() {
            return "*".to_string();
        }
        self.values
            .iter()
            .map(|v| match self.kind {
                FieldKind::DayOfWeek => WEEKDAY_ABBREVIATIONS[*v as usize].to_string(),
                _ => v.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn parse_number(kind: FieldKind, text: &str) -> Result<u32, String> {
    let value: u32 = text
        .parse()
        .map_err(|_| format!("{} field value '{}' is not a number", kind.name(), text))?;
    let (min, max) = kind.bounds();
    if value < min || value > max {
        return Err(format!(
            "{} value {} out of range {}-{}",
            kind.name(),
            value,
            min,
            max
        ));
    }
    Ok(value)
}

fn parse_range(kind: FieldKind, text: &str) -> Result<(u32, u32), String> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| format!("{} field '{}' is not a range", kind.name(), text))?;
    let start = parse_number(kind, start)?;
    let end = parse_number(kind, end)?;
    if start > end {
        return Err(format!(
            "{} range {}-{} starts after it ends",
            kind.name(),
            start,
            end
        ));
    }
    Ok((start, end))
}

fn parse_term(kind: FieldKind, item: &str) -> Result<Term, String> {
    if let Some((base, step)) = item.split_once('/') {
        let step: u32 = step
            .parse()
            .map_err(|_| format!("{} step '{}' is not a number", kind.name(), step))?;
        if step == 0 {
            return Err(format!("{} step must be at least 1", kind.name()));
        }
        let base = if base == "*" {
            StepBase::Any
        } else if base.contains('-') {
            let (start, end) = parse_range(kind, base)?;
            StepBase::Range(start, end)
        } else {
            StepBase::From(parse_number(kind, base)?)
        };
        return Ok(Term::Step { base, step });
    }

    if item == "*" {
        Ok(Term::Any)
    } else if item.contains('-') {
        let (start, end) = parse_range(kind, item)?;
        Ok(Term::Range(start, end))
    } else {
        Ok(Term::Value(parse_number(kind, item)?))
    }
}

/// Inclusive span and step covered by a term
fn term_span(kind: FieldKind, term: Term) -> (u32, u32, u32) {
    let (min, max) = kind.bounds();
    // `*` on day-of-week covers 0-6; 7 is only an alias
    let max_any = if kind == FieldKind::DayOfWeek { 6 } else { max };
    match term {
        Term::Any => (min, max_any, 1),
        Term::Value(v) => (v, v, 1),
        Term::Range(a, b) => (a, b, 1),
        Term::Step { base, step } => match base {
            StepBase::Any => (min, max_any, step),
            StepBase::From(a) => (a, max_any.max(a), step),
            StepBase::Range(a, b) => (a, b, step),
        },
    }
}

/// A validated five-field time plan
#[derive(Debug, Clone)]
pub struct CronExpr {
    fields: [Field; 5],
    schedules: Vec<CronSchedule>,
}

impl CronExpr {
    /// Parse and validate a five-field expression
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ScheduleError::InvalidCronExpression {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, found {}", parts.len()),
            });
        }

        let fields = [
            Field::parse(FieldKind::Minute, parts[0], expression)?,
            Field::parse(FieldKind::Hour, parts[1], expression)?,
            Field::parse(FieldKind::DayOfMonth, parts[2], expression)?,
            Field::parse(FieldKind::Month, parts[3], expression)?,
            Field::parse(FieldKind::DayOfWeek, parts[4], expression)?,
        ];

        let schedules = build_schedules(&fields, expression)?;
        Ok(Self { fields, schedules })
    }

    pub fn field(&self, kind: FieldKind) -> &Field {
        &self.fields[kind as usize]
    }

    /// Next fire time strictly after `after`, in the same timezone
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(after).next())
            .min()
    }

    /// English rendering of the plan, e.g. "Every 15 minutes, between 13:00 and 16:59"
    pub fn describe(&self) -> String {
        let mut parts = vec![self.describe_time()];
        match (self.describe_day_of_month(), self.describe_day_of_week()) {
            // Either day field firing is enough, see `build_schedules`
            (Some(dom), Some(dow)) => {
                let dow = dow.strip_prefix("only ").unwrap_or(&dow);
                parts.push(format!("{} or {}", dom, dow));
                parts.extend(self.describe_month());
            }
            (dom, dow) => {
                parts.extend(dom);
                parts.extend(self.describe_month());
                parts.extend(dow);
            }
        }
        parts.join(", ")
    }

    fn describe_time(&self) -> String {
        let minute = self.field(FieldKind::Minute);
        let hour = self.field(FieldKind::Hour);

        if let (Some(minutes), Some(hours)) = (minute.plain_values(), hour.plain_values()) {
            if minutes.len() * hours.len() <= 4 {
                let times: Vec<String> = hours
                    .iter()
                    .flat_map(|h| minutes.iter().map(move |m| format!("{:02}:{:02}", h, m)))
                    .collect();
                return format!("At {}", join_list(&times));
            }
        }

        let minute_text = match minute.single_term() {
            Some(Term::Any) => "Every minute".to_string(),
            Some(Term::Step {
                base: StepBase::Any,
                step,
            }) => format!("Every {} minutes", step),
            Some(Term::Step {
                base: StepBase::From(a),
                step,
            }) => format!("Every {} minutes, starting at minute {} past the hour", step, a),
            Some(Term::Step {
                base: StepBase::Range(a, b),
                step,
            }) => format!(
                "Every {} minutes, minutes {} through {} past the hour",
                step, a, b
            ),
            Some(Term::Range(a, b)) => {
                format!("Every minute, minutes {} through {} past the hour", a, b)
            }
            _ => match minute.plain_values() {
                Some(values) if values.len() == 1 => {
                    format!("At minute {} past the hour", values[0])
                }
                Some(values) => format!("At minutes {} past the hour", join_numbers(&values)),
                None => format!("At minutes {} past the hour", minute.source),
            },
        };

        let hour_text = match hour.single_term() {
            Some(Term::Any) => None,
            Some(Term::Value(h)) => Some(format!("between {:02}:00 and {:02}:59", h, h)),
            Some(Term::Range(a, b)) => Some(format!("between {:02}:00 and {:02}:59", a, b)),
            Some(Term::Step {
                base: StepBase::Any,
                step,
            }) => Some(format!("every {} hours", step)),
            Some(Term::Step { step, .. }) => Some(format!(
                "every {} hours, hours {}",
                step,
                join_numbers(&hour.values.iter().copied().collect::<Vec<_>>())
            )),
            None => Some(format!(
                "during hours {}",
                join_numbers(&hour.values.iter().copied().collect::<Vec<_>>())
            )),
        };

        match hour_text {
            Some(hour_text) => format!("{}, {}", minute_text, hour_text),
            None => minute_text,
        }
    }

    fn describe_day_of_month(&self) -> Option<String> {
        let field = self.field(FieldKind::DayOfMonth);
        match field.single_term() {
            Some(Term::Any) => None,
            Some(Term::Range(a, b)) => Some(format!("between day {} and {} of the month", a, b)),
            Some(Term::Step {
                base: StepBase::Any,
                step,
            }) => Some(format!("every {} days", step)),
            _ => {
                let values: Vec<u32> = field.values.iter().copied().collect();
                let noun = if values.len() == 1 { "day" } else { "days" };
                Some(format!("on {} {} of the month", noun, join_numbers(&values)))
            }
        }
    }

    fn describe_month(&self) -> Option<String> {
        let field = self.field(FieldKind::Month);
        let name = |m: u32| MONTH_NAMES[(m - 1) as usize].to_string();
        describe_named(field, name, "months")
    }

    fn describe_day_of_week(&self) -> Option<String> {
        let field = self.field(FieldKind::DayOfWeek);
        let name = |d: u32| WEEKDAY_NAMES[(d % 7) as usize].to_string();
        describe_named(field, name, "days of the week")
    }
}

/// Shared rendering for month and weekday fields
fn describe_named(field: &Field, name: impl Fn(u32) -> String, unit: &str) -> Option<String> {
    match field.single_term() {
        Some(Term::Any) => None,
        Some(Term::Range(a, b)) => Some(format!("{} through {}", name(a), name(b))),
        Some(Term::Step {
            base: StepBase::Any,
            step,
        }) => Some(format!("every {} {}", step, unit)),
        _ => {
            let names: Vec<String> = field.values.iter().map(|v| name(*v)).collect();
            Some(format!("{} {}", only_prefix(field.kind), join_list(&names)))
        }
    }
}

fn only_prefix(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Month => "only in",
        _ => "only on",
    }
}

fn join_numbers(values: &[u32]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    join_list(&items)
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Build the `cron` crate schedules used for next fire time calculation.
///
/// When both day fields are restricted a day matches if either field does,
/// which the `cron` crate cannot express in one schedule, so two are built.
fn build_schedules(fields: &[Field; 5], expression: &str) -> Result<Vec<CronSchedule>, ScheduleError> {
    let [minute, hour, dom, month, dow] = fields;
    let day_pairs = if !dom.is_star() && !dow.is_star() {
        vec![
            (dom.to_cron_crate_field(), "*".to_string()),
            ("*".to_string(), dow.to_cron_crate_field()),
        ]
    } else {
        vec![(dom.to_cron_crate_field(), dow.to_cron_crate_field())]
    };

    day_pairs
        .into_iter()
        .map(|(dom_field, dow_field)| {
            let six_field = format!(
                "0 {} {} {} {} {}",
                minute.to_cron_crate_field(),
                hour.to_cron_crate_field(),
                dom_field,
                month.to_cron_crate_field(),
                dow_field
            );
            CronSchedule::from_str(&six_field).map_err(|e| ScheduleError::InvalidCronExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

impl FromStr for CronExpr {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.fields.iter().map(|field| field.source.as_str()).collect();
        write!(f, "{}", sources.join(" "))
    }
}
