//! Attribute-based condition predicates attached to grants.
//!
//! Conditions narrow when a grant applies: time windows (absolute or
//! recurring), department match, ownership, and logical composition.
//! Evaluation is short-circuit left-to-right and has no side effects.
//!
//! A malformed or unknown condition always degrades to "no access": it
//! evaluates to `false` and is logged, never surfaced as a fatal error, so
//! a bad condition definition cannot crash unrelated request handling.

use crate::{context::TenantContext, resource::ResourceTenancy};
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

/// A predicate narrowing when a grant applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Valid while `start <= now < end`.
    TimeWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Valid on the listed weekdays between `start_time` and `end_time`
    /// interpreted in `timezone`. Overnight windows (start after end) wrap
    /// past midnight.
    RecurringWindow {
        weekdays: Vec<Weekday>,
        start_time: NaiveTime,
        end_time: NaiveTime,
        timezone: String,
    },
    /// The resource's department must equal the context's department.
    DepartmentMatch,
    /// The resource's owner must equal the context's user.
    Ownership,
    /// All inner conditions must hold.
    All { conditions: Vec<Condition> },
    /// At least one inner condition must hold.
    Any { conditions: Vec<Condition> },
    /// The inner condition must not hold.
    Not { condition: Box<Condition> },
    /// Any condition kind this build does not recognize. Fails closed.
    #[serde(other)]
    Unknown,
}

impl Condition {
    /// Evaluate this condition against a contextual resource and tenant
    /// context at the given instant.
    ///
    /// Returns `false` for malformed definitions rather than erroring.
    pub fn evaluate(
        &self,
        resource: Option<&ResourceTenancy>,
        ctx: &TenantContext,
        now: DateTime<Utc>,
    ) -> bool {
        match self {
            Condition::TimeWindow { start, end } => {
                if start >= end {
                    warn!("Condition rejected: time window with start >= end");
                    return false;
                }
                *start <= now && now < *end
            }
            Condition::RecurringWindow {
                weekdays,
                start_time,
                end_time,
                timezone,
            } => {
                let tz: Tz = match timezone.parse() {
                    Ok(tz) => tz,
                    Err(_) => {
                        warn!("Condition rejected: unknown timezone '{timezone}'");
                        return false;
                    }
                };
                let local = now.with_timezone(&tz);
                if !weekdays.contains(&local.weekday()) {
                    return false;
                }
                let time_of_day = local.time();
                if start_time <= end_time {
                    time_of_day >= *start_time && time_of_day < *end_time
                } else {
                    // Overnight window, e.g. 22:00 - 06:00.
                    time_of_day >= *start_time || time_of_day < *end_time
                }
            }
            Condition::DepartmentMatch => match resource {
                Some(res) => {
                    res.department_id().is_some() && res.department_id() == ctx.department_id()
                }
                None => false,
            },
            Condition::Ownership => match resource {
                Some(res) => res.owner_id() == Some(ctx.user_id()),
                None => false,
            },
            Condition::All { conditions } => conditions
                .iter()
                .all(|c| c.evaluate(resource, ctx, now)),
            Condition::Any { conditions } => conditions
                .iter()
                .any(|c| c.evaluate(resource, ctx, now)),
            Condition::Not { condition } => !condition.evaluate(resource, ctx, now),
            Condition::Unknown => {
                warn!("Condition rejected: unknown condition kind (failing closed)");
                false
            }
        }
    }

    /// Convenience constructor for a business-hours window (Mon-Fri 9-17).
    pub fn business_hours(timezone: impl Into<String>) -> Self {
        use Weekday::*;
        Condition::RecurringWindow {
            weekdays: vec![Mon, Tue, Wed, Thu, Fri],
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            timezone: timezone.into(),
        }
    }

    /// Conjunction of conditions.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::All {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Disjunction of conditions.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Any {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Negation of a condition.
    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }
}
