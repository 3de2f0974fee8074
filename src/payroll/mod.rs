//! The payroll service: cycle lifecycle, payslip generation, settlement and
//! the audit gate, on top of the transactional store.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use payroll_engine::config::ConfigLoader;
//! use payroll_engine::models::CycleStatus;
//! use payroll_engine::payroll::{NewCycle, PayrollService};
//!
//! let service = PayrollService::from_config(ConfigLoader::load("./config/payroll").unwrap());
//! let cycle = service
//!     .create_cycle(NewCycle {
//!         name: "January 2025".to_string(),
//!         start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!         end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!         group_ids: vec![1],
//!     })
//!     .unwrap();
//! service.transition(cycle.id, CycleStatus::Auditing).unwrap();
//! let outcome = service.transition(cycle.id, CycleStatus::Review).unwrap();
//! println!("{:?}", outcome.run);
//! ```

mod audit;
mod generation;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::{ConfigLoader, EngineSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditFlag, CycleStatus, FlagStatus, GroupId, PayCycle, Payslip, PayslipLine, PayslipStatus,
};
use crate::settlement::{SettlementSummary, finalize_cycle_items};
use crate::store::{PayrollStore, StoreSeed};

pub use audit::{AuditReport, Finding, detect};
pub use generation::{EmployeeRunDetail, EmployeeRunStatus, RunScope, RunSummary};

use generation::{apply_plans, plan_run, set_payslip_status};

/// Parameters of a new cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycle {
    /// Display name.
    pub name: String,
    /// First day, inclusive.
    pub start_date: NaiveDate,
    /// Last day, inclusive.
    pub end_date: NaiveDate,
    /// Groups to attach.
    pub group_ids: Vec<GroupId>,
}

/// Result of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// The cycle after the transition.
    pub cycle: PayCycle,
    /// Generation summary, on entering review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunSummary>,
    /// Settlement summary, on finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementSummary>,
}

/// A payslip with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayslipWithLines {
    /// The payslip.
    pub payslip: Payslip,
    /// Its lines.
    pub lines: Vec<PayslipLine>,
}

/// Runs payroll cycles against a store.
#[derive(Debug)]
pub struct PayrollService {
    store: PayrollStore,
    settings: EngineSettings,
}

impl PayrollService {
    /// Creates a service over a fresh store holding `seed`.
    pub fn new(settings: EngineSettings, seed: StoreSeed) -> Self {
        Self {
            store: PayrollStore::new(seed),
            settings,
        }
    }

    /// Creates a service from loaded configuration.
    pub fn from_config(config: ConfigLoader) -> Self {
        let (settings, seed) = config.into_parts();
        Self::new(settings, seed)
    }

    /// The engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The underlying store.
    pub fn store(&self) -> &PayrollStore {
        &self.store
    }

    /// Creates a draft cycle over a date range and a set of groups.
    ///
    /// Rejects an empty name, an inverted range, an empty or unknown group
    /// set, and an exact duplicate of an existing cycle's range and groups.
    pub fn create_cycle(&self, request: NewCycle) -> EngineResult<PayCycle> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("name", "must not be empty"));
        }
        if request.start_date > request.end_date {
            return Err(EngineError::validation(
                "end_date",
                format!(
                    "must not be before start_date ({} > {})",
                    request.start_date, request.end_date
                ),
            ));
        }
        let mut group_ids = request.group_ids;
        group_ids.sort_unstable();
        group_ids.dedup();
        if group_ids.is_empty() {
            return Err(EngineError::validation(
                "group_ids",
                "at least one group is required",
            ));
        }

        let cycle = self.store.transaction(|tables| {
            for id in &group_ids {
                tables.group(*id)?;
            }
            if let Some(existing) = tables.cycles.values().find(|c| {
                c.start_date == request.start_date
                    && c.end_date == request.end_date
                    && c.group_ids == group_ids
            }) {
                return Err(EngineError::DuplicateCycle {
                    start_date: request.start_date,
                    end_date: request.end_date,
                    existing: existing.id,
                });
            }

            let cycle = PayCycle {
                id: Uuid::new_v4(),
                name: name.to_string(),
                start_date: request.start_date,
                end_date: request.end_date,
                status: CycleStatus::Draft,
                group_ids,
                created_at: Utc::now(),
                finalized_at: None,
                paid_at: None,
            };
            tables.cycles.insert(cycle.id, cycle.clone());
            Ok(cycle)
        })?;

        info!(
            cycle_id = %cycle.id,
            start_date = %cycle.start_date,
            end_date = %cycle.end_date,
            groups = ?cycle.group_ids,
            "Cycle created"
        );
        Ok(cycle)
    }

    /// Looks up a cycle.
    pub fn get_cycle(&self, cycle_id: Uuid) -> EngineResult<PayCycle> {
        self.store.read(|t| t.cycle(cycle_id).cloned())?
    }

    /// Every cycle, oldest range first.
    pub fn list_cycles(&self) -> EngineResult<Vec<PayCycle>> {
        self.store.read(|t| {
            let mut cycles: Vec<PayCycle> = t.cycles.values().cloned().collect();
            cycles.sort_by(|a, b| {
                (a.start_date, a.created_at).cmp(&(b.start_date, b.created_at))
            });
            cycles
        })
    }

    /// Moves a cycle along one edge of its state machine.
    ///
    /// Entering review regenerates every payslip of the cycle; finalizing
    /// settles every processed item and freezes the payslips; paying marks
    /// them paid. Each transition commits atomically with its side effects.
    pub fn transition(&self, cycle_id: Uuid, to: CycleStatus) -> EngineResult<TransitionOutcome> {
        self.store.with_cycle_lock(cycle_id, || {
            let cycle = self.get_cycle(cycle_id)?;
            let from = cycle.status;
            if !from.can_transition_to(to) {
                return Err(EngineError::InvalidTransition { from, to });
            }

            let outcome = match (from, to) {
                (CycleStatus::Auditing, CycleStatus::Review) => self.enter_review(&cycle)?,
                (CycleStatus::Review, CycleStatus::Finalized) => self.finalize(&cycle)?,
                (CycleStatus::Finalized, CycleStatus::Paid) => self.mark_paid(&cycle)?,
                _ => self.store.transaction(|tables| {
                    let stored = tables.cycle_mut(cycle_id)?;
                    stored.status = to;
                    Ok(TransitionOutcome {
                        cycle: stored.clone(),
                        run: None,
                        settlement: None,
                    })
                })?,
            };

            info!(cycle_id = %cycle_id, from = %from, to = %to, "Cycle transitioned");
            Ok(outcome)
        })
    }

    fn enter_review(&self, cycle: &PayCycle) -> EngineResult<TransitionOutcome> {
        if self.settings.audit.block_review_on_open_flags {
            let open_flags = self
                .store
                .read(|t| audit::open_flag_count(t, cycle.id))?;
            if open_flags > 0 {
                return Err(EngineError::AuditNotClear {
                    cycle_id: cycle.id,
                    open_flags,
                });
            }
        }

        let scope = RunScope::Cycle;
        let plans = self
            .store
            .read(|t| plan_run(t, cycle, &self.settings, &scope))?;
        let outcome = self.store.transaction(|tables| {
            let summary = apply_plans(tables, cycle, &scope, plans);
            let stored = tables.cycle_mut(cycle.id)?;
            stored.status = CycleStatus::Review;
            Ok(TransitionOutcome {
                cycle: stored.clone(),
                run: Some(summary),
                settlement: None,
            })
        })?;

        if let Some(run) = &outcome.run {
            info!(
                cycle_id = %cycle.id,
                processed = run.processed,
                errors = run.errors,
                total = run.total,
                "Payslips generated"
            );
        }
        Ok(outcome)
    }

    fn finalize(&self, cycle: &PayCycle) -> EngineResult<TransitionOutcome> {
        self.store.transaction(|tables| {
            let settlement = finalize_cycle_items(tables, cycle);
            set_payslip_status(tables, cycle.id, PayslipStatus::Finalized);
            let stored = tables.cycle_mut(cycle.id)?;
            stored.status = CycleStatus::Finalized;
            stored.finalized_at = Some(Utc::now());
            info!(
                cycle_id = %cycle.id,
                settled = settlement.settled,
                skipped = settlement.skipped,
                "Cycle settled"
            );
            Ok(TransitionOutcome {
                cycle: stored.clone(),
                run: None,
                settlement: Some(settlement),
            })
        })
    }

    fn mark_paid(&self, cycle: &PayCycle) -> EngineResult<TransitionOutcome> {
        self.store.transaction(|tables| {
            set_payslip_status(tables, cycle.id, PayslipStatus::Paid);
            let stored = tables.cycle_mut(cycle.id)?;
            stored.status = CycleStatus::Paid;
            stored.paid_at = Some(Utc::now());
            Ok(TransitionOutcome {
                cycle: stored.clone(),
                run: None,
                settlement: None,
            })
        })
    }

    /// Recomputes one group's components for every eligible employee.
    ///
    /// Only lines of the group's components are replaced. Runs on the same
    /// (cycle, group) serialize; runs on different groups do not.
    pub fn run_group(&self, cycle_id: Uuid, group_id: GroupId) -> EngineResult<RunSummary> {
        self.store.with_group_lock(cycle_id, group_id, || {
            let (cycle, group) = self.store.read(|t| -> EngineResult<_> {
                let cycle = t.cycle(cycle_id)?;
                if !cycle.group_ids.contains(&group_id) {
                    return Err(EngineError::not_found("Group", group_id));
                }
                ensure_recomputable(cycle, group_id)?;
                Ok((cycle.clone(), t.group(group_id)?.clone()))
            })??;

            let scope = RunScope::Group(&group);
            let plans = self
                .store
                .read(|t| plan_run(t, &cycle, &self.settings, &scope))?;
            let summary = self.store.transaction(|tables| {
                ensure_recomputable(tables.cycle(cycle_id)?, group_id)?;
                Ok(apply_plans(tables, &cycle, &scope, plans))
            })?;

            info!(
                cycle_id = %cycle_id,
                group_id = group_id,
                processed = summary.processed,
                errors = summary.errors,
                total = summary.total,
                "Group run complete"
            );
            Ok(summary)
        })
    }

    /// Payslips of a cycle with their lines, ordered by employee.
    pub fn list_payslips(&self, cycle_id: Uuid) -> EngineResult<Vec<PayslipWithLines>> {
        self.store.read(|t| -> EngineResult<_> {
            t.cycle(cycle_id)?;
            let mut payslips: Vec<PayslipWithLines> = t
                .payslips
                .values()
                .filter(|p| p.cycle_id == cycle_id)
                .map(|p| PayslipWithLines {
                    payslip: p.clone(),
                    lines: t.lines_of(p.id).cloned().collect(),
                })
                .collect();
            payslips.sort_by(|a, b| a.payslip.employee_id.cmp(&b.payslip.employee_id));
            Ok(payslips)
        })?
    }

    /// Detects issues and records new flags.
    pub fn run_audit(&self, cycle_id: Uuid) -> EngineResult<AuditReport> {
        let report = self.store.transaction(|tables| {
            let cycle = tables.cycle(cycle_id)?.clone();
            let findings = detect(tables, &cycle);
            let inserted = audit::record(tables, cycle_id, &findings);
            let open_flags = audit::open_flag_count(tables, cycle_id);
            Ok(AuditReport {
                cycle_id,
                detected: findings.len(),
                inserted,
                open_flags,
                clear: open_flags == 0,
            })
        })?;
        info!(
            cycle_id = %cycle_id,
            detected = report.detected,
            inserted = report.inserted.len(),
            open_flags = report.open_flags,
            "Audit run"
        );
        Ok(report)
    }

    /// Re-runs detection and reports whether the cycle is clear.
    ///
    /// Flags already open are not duplicated; flags whose issue has gone are
    /// left open until resolved.
    pub fn verify_audit(&self, cycle_id: Uuid) -> EngineResult<AuditReport> {
        let report = self.run_audit(cycle_id)?;
        if !report.clear {
            info!(
                cycle_id = %cycle_id,
                open_flags = report.open_flags,
                "Audit not clear"
            );
        }
        Ok(report)
    }

    /// Flags of a cycle, optionally filtered by status, oldest first.
    pub fn list_flags(
        &self,
        cycle_id: Uuid,
        status: Option<FlagStatus>,
    ) -> EngineResult<Vec<AuditFlag>> {
        self.store.read(|t| -> EngineResult<_> {
            t.cycle(cycle_id)?;
            Ok(t.flags
                .iter()
                .filter(|f| f.cycle_id == cycle_id)
                .filter(|f| status.is_none_or(|s| f.status == s))
                .cloned()
                .collect())
        })?
    }

    /// Resolves an open flag.
    pub fn resolve_flag(&self, flag_id: Uuid, note: Option<String>) -> EngineResult<AuditFlag> {
        let flag = self.store.transaction(|tables| {
            let flag = tables
                .flags
                .iter_mut()
                .find(|f| f.id == flag_id)
                .ok_or_else(|| EngineError::not_found("Flag", flag_id))?;
            if flag.status == FlagStatus::Resolved {
                return Err(EngineError::FlagAlreadyResolved { flag_id });
            }
            flag.status = FlagStatus::Resolved;
            flag.resolved_at = Some(Utc::now());
            flag.resolution_note = note;
            Ok(flag.clone())
        })?;
        info!(flag_id = %flag_id, cycle_id = %flag.cycle_id, "Audit flag resolved");
        Ok(flag)
    }
}

fn ensure_recomputable(cycle: &PayCycle, group_id: GroupId) -> EngineResult<()> {
    match cycle.status {
        status if status.accepts_recomputation() => Ok(()),
        CycleStatus::Draft => Err(EngineError::validation(
            "status",
            "group runs require an auditing or review cycle",
        )),
        status => Err(EngineError::GroupAlreadyProcessed {
            cycle_id: cycle.id,
            group_id,
            status,
        }),
    }
}
