//! Reconciliation of persisted installments against their plans.
//!
//! Installments are materialized lazily and their due dates used to be
//! recomputed in several places, so the persisted `planos` collection drifts.
//! A reconciliation pass brings it back in line:
//!
//! 1. duplicates sharing `(dueDate, type, analysisId)` collapse into one,
//!    the paid copy winning
//! 2. installments whose owner record is gone and whose client has no
//!    appointment or analysis are pruned, unless an owner collection could
//!    not be read in full
//! 3. legacy installments without an owner reference are adopted when their
//!    client has exactly one plan of that type
//! 4. each owner's installments are matched to the expected slots, by
//!    sequence first and then by due date within one day, and drifted due
//!    dates are rewritten
//! 5. missing slots are materialized: slot 1 always, slot `k` once slot
//!    `k - 1` is paid
//!
//! Nothing paid is ever removed, and toggling never creates a second
//! installment for a slot that already exists.

use chrono::Months;
use log::{debug, warn};
use shared::{PlanInstallment, PlanKind, ReconciliationSummary};
use std::collections::{HashMap, HashSet};

use crate::backend::domain::client_service::client_key;
use crate::backend::domain::errors::DomainError;
use crate::backend::domain::plan_schedule::{PlanOwner, PlanTerms};

/// Tolerance, in days, when matching an installment to a slot by date
pub const DATE_MATCH_TOLERANCE_DAYS: i64 = 1;

/// What currently exists on the owning side of the installments
#[derive(Debug, Clone, Default)]
pub struct KnownRecords {
    /// [`client_key`] of every client with an appointment or analysis
    pub clients: HashSet<String>,
    /// Ids of every appointment and analysis
    pub ids: HashSet<String>,
    /// False when an owner collection had unreadable parts; nothing is pruned then
    pub complete: bool,
}

impl KnownRecords {
    fn owns(&self, installment: &PlanInstallment) -> bool {
        installment
            .analysis_id
            .as_ref()
            .map(|id| self.ids.contains(id))
            .unwrap_or(false)
            || self.clients.contains(&client_key(&installment.client_name))
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub installments: Vec<PlanInstallment>,
    pub summary: ReconciliationSummary,
    /// True when anything differs from the input, including field syncs not counted in the summary
    pub changed: bool,
}

/// Result of toggling one installment
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub installment: PlanInstallment,
    pub created_next: Option<PlanInstallment>,
}

/// Duplicate-suppression key: `(dueDate, type, analysisId)`; legacy rows
/// without an owner fall back to the client name
fn duplicate_key(installment: &PlanInstallment) -> (chrono::NaiveDate, PlanKind, String) {
    let owner = match &installment.analysis_id {
        Some(id) => format!("id:{}", id),
        None => format!("client:{}", client_key(&installment.client_name)),
    };
    (installment.due_date, installment.kind, owner)
}

/// Collapse duplicates, keeping the first position of each key.
///
/// Among duplicates the paid copy wins, then the smallest id, so the result
/// does not depend on input order. Returns the kept installments and the
/// number removed.
pub fn dedupe_installments(installments: Vec<PlanInstallment>) -> (Vec<PlanInstallment>, usize) {
    let mut kept: Vec<PlanInstallment> = Vec::with_capacity(installments.len());
    let mut positions: HashMap<(chrono::NaiveDate, PlanKind, String), usize> = HashMap::new();
    let mut removed = 0;

    for installment in installments {
        let key = duplicate_key(&installment);
        match positions.get(&key) {
            Some(&index) => {
                removed += 1;
                let current = &kept[index];
                let better = (installment.is_paid() && !current.is_paid())
                    || (installment.is_paid() == current.is_paid() && installment.id < current.id);
                if better {
                    kept[index] = installment;
                }
            }
            None => {
                positions.insert(key, kept.len());
                kept.push(installment);
            }
        }
    }

    (kept, removed)
}

fn new_installment(
    owner: &PlanOwner,
    terms: &PlanTerms,
    sequence: u32,
    due_date: chrono::NaiveDate,
    now: &str,
) -> PlanInstallment {
    PlanInstallment {
        id: PlanInstallment::generate_id(terms.kind, &owner.id, sequence),
        kind: terms.kind,
        client_name: owner.client_name.clone(),
        amount: terms.amount,
        due_date,
        sequence,
        total: terms.total,
        active: true,
        created_at: now.to_string(),
        analysis_id: Some(owner.id.clone()),
    }
}

/// Give ownerless installments an owner when their client has exactly one plan of that type
fn adopt_legacy(installments: &mut [PlanInstallment], owners: &[PlanOwner]) -> bool {
    let mut candidates: HashMap<(String, PlanKind), Vec<&PlanOwner>> = HashMap::new();
    for owner in owners {
        for kind in [PlanKind::Monthly, PlanKind::Weekly] {
            if owner.has_plan(kind) {
                candidates
                    .entry((client_key(&owner.client_name), kind))
                    .or_default()
                    .push(owner);
            }
        }
    }

    let mut changed = false;
    for installment in installments.iter_mut().filter(|i| i.analysis_id.is_none()) {
        let key = (client_key(&installment.client_name), installment.kind);
        if let Some([owner]) = candidates.get(&key).map(Vec::as_slice) {
            debug!("Adopting legacy installment {} into {}", installment.id, owner.id);
            installment.analysis_id = Some(owner.id.clone());
            changed = true;
        }
    }
    changed
}

/// Run a full reconciliation pass.
///
/// `now` is the RFC 3339 timestamp stamped on created installments.
pub fn reconcile(
    installments: Vec<PlanInstallment>,
    owners: &[PlanOwner],
    known: &KnownRecords,
    now: &str,
) -> ReconcileOutcome {
    let mut summary = ReconciliationSummary::default();

    let (mut installments, duplicates) = dedupe_installments(installments);
    summary.duplicates_removed = duplicates;

    if known.complete {
        let before_prune = installments.len();
        installments.retain(|i| known.owns(i));
        summary.orphans_pruned = before_prune - installments.len();
    } else {
        warn!("Owner records were not read in full, keeping every installment");
    }

    let mut changed = adopt_legacy(&mut installments, owners);

    for owner in owners {
        for kind in [PlanKind::Monthly, PlanKind::Weekly] {
            let terms = match owner.terms(kind) {
                Ok(Some(terms)) => terms,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {} plan of {}: {}", kind.label(), owner.id, e);
                    continue;
                }
            };
            changed |= reconcile_owner_plan(&mut installments, owner, &terms, now, &mut summary);
        }
    }

    changed |= summary.has_changes();
    ReconcileOutcome {
        installments,
        summary,
        changed,
    }
}

fn reconcile_owner_plan(
    installments: &mut Vec<PlanInstallment>,
    owner: &PlanOwner,
    terms: &PlanTerms,
    now: &str,
    summary: &mut ReconciliationSummary,
) -> bool {
    let members: Vec<usize> = installments
        .iter()
        .enumerate()
        .filter(|(_, i)| i.kind == terms.kind && i.analysis_id.as_deref() == Some(owner.id.as_str()))
        .map(|(index, _)| index)
        .collect();

    // slot sequence -> installment index
    let mut claimed: HashMap<u32, usize> = HashMap::new();
    let mut unmatched = Vec::new();

    for &index in &members {
        let sequence = installments[index].sequence;
        if terms.slot(sequence).is_some() && !claimed.contains_key(&sequence) {
            claimed.insert(sequence, index);
        } else {
            unmatched.push(index);
        }
    }

    for index in unmatched {
        let due = installments[index].due_date;
        let slot = terms.slots.iter().find(|slot| {
            !claimed.contains_key(&slot.sequence)
                && (slot.due_date - due).num_days().abs() <= DATE_MATCH_TOLERANCE_DAYS
        });
        match slot {
            Some(slot) => {
                claimed.insert(slot.sequence, index);
            }
            None => debug!(
                "Installment {} matches no slot of {} plan {}",
                installments[index].id,
                terms.kind.label(),
                owner.id
            ),
        }
    }

    let mut changed = false;
    for (&sequence, &index) in &claimed {
        let Some(slot) = terms.slot(sequence) else { continue };
        let installment = &mut installments[index];

        if installment.sequence != sequence {
            installment.sequence = sequence;
            changed = true;
        }
        if installment.due_date != slot.due_date {
            debug!(
                "Correcting due date of {} from {} to {}",
                installment.id, installment.due_date, slot.due_date
            );
            installment.due_date = slot.due_date;
            summary.dates_corrected += 1;
        }
        if installment.total != terms.total {
            installment.total = terms.total;
            changed = true;
        }
        if installment.client_name != owner.client_name {
            installment.client_name = owner.client_name.clone();
            changed = true;
        }
        // Paid installments keep the amount that was actually charged
        if installment.active && installment.amount != terms.amount {
            installment.amount = terms.amount;
            changed = true;
        }
    }

    for slot in &terms.slots {
        if claimed.contains_key(&slot.sequence) {
            continue;
        }
        let previous_paid = slot.sequence == 1
            || claimed
                .get(&(slot.sequence - 1))
                .map(|&index| installments[index].is_paid())
                .unwrap_or(false);
        if !previous_paid {
            break;
        }
        let installment = new_installment(owner, terms, slot.sequence, slot.due_date, now);
        debug!("Materializing installment {}", installment.id);
        claimed.insert(slot.sequence, installments.len());
        installments.push(installment);
        summary.created += 1;
    }

    changed
}

fn same_slot(a: &PlanInstallment, b: &PlanInstallment, sequence: u32) -> bool {
    if b.kind != a.kind || b.sequence != sequence {
        return false;
    }
    match (&a.analysis_id, &b.analysis_id) {
        (Some(owner), Some(other)) => owner == other,
        (None, None) => client_key(&a.client_name) == client_key(&b.client_name),
        _ => false,
    }
}

/// `base` itself when unused, otherwise the first free `base-N`
fn unique_id(installments: &[PlanInstallment], base: String) -> String {
    let mut id = base.clone();
    let mut suffix = 1;
    while installments.iter().any(|i| i.id == id) {
        suffix += 1;
        id = format!("{}-{}", base, suffix);
    }
    id
}

/// Due date of the slot after `installment` when its owner is unknown
fn following_due_date(installment: &PlanInstallment) -> Option<chrono::NaiveDate> {
    match installment.kind {
        PlanKind::Monthly => installment.due_date.checked_add_months(Months::new(1)),
        PlanKind::Weekly => installment.due_date.checked_add_days(chrono::Days::new(7)),
    }
}

/// Flip the paid state of one installment.
///
/// Marking paid materializes the next slot when it is within the plan and
/// does not exist yet. Marking pending never removes anything.
pub fn toggle_installment(
    installments: &mut Vec<PlanInstallment>,
    id: &str,
    owners: &[PlanOwner],
    now: &str,
) -> Result<ToggleOutcome, DomainError> {
    let index = installments
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| DomainError::not_found("Installment", id))?;

    installments[index].active = !installments[index].active;
    let toggled = installments[index].clone();

    if toggled.active {
        return Ok(ToggleOutcome {
            installment: toggled,
            created_next: None,
        });
    }

    let next_sequence = toggled.sequence + 1;
    if next_sequence > toggled.total
        || installments.iter().any(|i| same_slot(&toggled, i, next_sequence))
    {
        return Ok(ToggleOutcome {
            installment: toggled,
            created_next: None,
        });
    }

    let owner = toggled
        .analysis_id
        .as_deref()
        .and_then(|owner_id| owners.iter().find(|o| o.id == owner_id));

    let next = match owner.map(|o| (o, o.terms(toggled.kind))) {
        Some((owner, Ok(Some(terms)))) => match terms.slot(next_sequence) {
            Some(slot) => {
                let mut next = new_installment(owner, &terms, next_sequence, slot.due_date, now);
                next.id = unique_id(installments, next.id);
                next
            }
            None => {
                return Ok(ToggleOutcome {
                    installment: toggled,
                    created_next: None,
                })
            }
        },
        _ => {
            let due_date = following_due_date(&toggled).ok_or(DomainError::DateOutOfRange)?;
            let owner_key = toggled
                .analysis_id
                .clone()
                .unwrap_or_else(|| client_key(&toggled.client_name));
            let id = unique_id(
                installments,
                PlanInstallment::generate_id(toggled.kind, &owner_key, next_sequence),
            );
            PlanInstallment {
                id,
                kind: toggled.kind,
                client_name: toggled.client_name.clone(),
                amount: toggled.amount,
                due_date,
                sequence: next_sequence,
                total: toggled.total,
                active: true,
                created_at: now.to_string(),
                analysis_id: toggled.analysis_id.clone(),
            }
        }
    };

    installments.push(next.clone());
    Ok(ToggleOutcome {
        installment: toggled,
        created_next: Some(next),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{MonthlyPlanConfig, WeeklyPlanConfig};

    const NOW: &str = "2024-06-01T12:00:00+00:00";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_owner(id: &str, client: &str, installments: u32, due_day: Option<u32>) -> PlanOwner {
        PlanOwner {
            id: id.to_string(),
            client_name: client.to_string(),
            start_date: date(2024, 1, 15),
            monthly: Some(MonthlyPlanConfig { installments, amount: 100.0, due_day }),
            weekly: None,
        }
    }

    fn weekly_owner(id: &str, client: &str, installments: u32) -> PlanOwner {
        PlanOwner {
            id: id.to_string(),
            client_name: client.to_string(),
            start_date: date(2024, 1, 15),
            monthly: None,
            weekly: Some(WeeklyPlanConfig {
                installments,
                amount: 40.0,
                due_weekday: Some("sexta".to_string()),
            }),
        }
    }

    fn installment(
        owner: Option<&str>,
        client: &str,
        kind: PlanKind,
        sequence: u32,
        due: NaiveDate,
        paid: bool,
    ) -> PlanInstallment {
        PlanInstallment {
            id: PlanInstallment::generate_id(kind, owner.unwrap_or(client), sequence),
            kind,
            client_name: client.to_string(),
            amount: 100.0,
            due_date: due,
            sequence,
            total: 3,
            active: !paid,
            created_at: String::new(),
            analysis_id: owner.map(str::to_string),
        }
    }

    fn clients(names: &[&str]) -> KnownRecords {
        KnownRecords {
            clients: names.iter().map(|n| client_key(n)).collect(),
            ids: HashSet::new(),
            complete: true,
        }
    }

    fn for_owner<'a>(installments: &'a [PlanInstallment], owner: &str) -> Vec<&'a PlanInstallment> {
        let mut found: Vec<_> = installments
            .iter()
            .filter(|i| i.analysis_id.as_deref() == Some(owner))
            .collect();
        found.sort_by_key(|i| (i.kind, i.sequence));
        found
    }

    #[test]
    fn test_materializes_first_slot_for_new_plan() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let outcome = reconcile(Vec::new(), &owners, &clients(&["Ana"]), NOW);

        assert_eq!(outcome.installments.len(), 1);
        let first = &outcome.installments[0];
        assert_eq!(first.id, "plano::a1::1");
        assert_eq!(first.due_date, date(2024, 2, 29));
        assert!(first.active);
        assert_eq!(first.created_at, NOW);
        assert_eq!(outcome.summary.created, 1);
        assert!(outcome.changed);
    }

    #[test]
    fn test_materializes_up_to_first_pending_slot() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let existing = vec![installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), true)];
        let outcome = reconcile(existing, &owners, &clients(&["Ana"]), NOW);

        let mine = for_owner(&outcome.installments, "a1");
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].sequence, 2);
        assert_eq!(mine[1].due_date, date(2024, 3, 31));
        assert!(mine[1].active);
    }

    #[test]
    fn test_corrects_drifted_due_date_by_sequence() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let existing = vec![installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 3, 2), false)];
        let outcome = reconcile(existing, &owners, &clients(&["Ana"]), NOW);

        assert_eq!(outcome.installments.len(), 1);
        assert_eq!(outcome.installments[0].due_date, date(2024, 2, 29));
        assert_eq!(outcome.summary.dates_corrected, 1);
        assert_eq!(outcome.summary.created, 0);
    }

    #[test]
    fn test_matches_by_date_within_one_day_when_sequence_is_taken() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let mut second = installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 3, 30), false);
        second.id = "legacy-2".to_string();
        let existing = vec![
            installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), true),
            second,
        ];
        let outcome = reconcile(existing, &owners, &clients(&["Ana"]), NOW);

        let mine = for_owner(&outcome.installments, "a1");
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].id, "legacy-2");
        assert_eq!(mine[1].sequence, 2);
        assert_eq!(mine[1].due_date, date(2024, 3, 31));
        assert_eq!(outcome.summary.created, 0);
    }

    #[test]
    fn test_prunes_orphans() {
        let existing = vec![
            installment(None, "Ana", PlanKind::Weekly, 1, date(2024, 1, 19), false),
            installment(None, "Fantasma", PlanKind::Weekly, 1, date(2024, 1, 19), false),
        ];
        let outcome = reconcile(existing, &[], &clients(&["ana"]), NOW);

        assert_eq!(outcome.installments.len(), 1);
        assert_eq!(outcome.installments[0].client_name, "Ana");
        assert_eq!(outcome.summary.orphans_pruned, 1);
    }

    #[test]
    fn test_renamed_client_keeps_owned_history() {
        let owners = vec![monthly_owner("a1", "Ana Maria", 3, Some(31))];
        let existing = vec![
            installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), true),
            installment(Some("a1"), "Ana", PlanKind::Monthly, 2, date(2024, 3, 31), false),
        ];
        let mut known = clients(&["Ana Maria"]);
        known.ids.insert("a1".to_string());
        let outcome = reconcile(existing, &owners, &known, NOW);

        assert_eq!(outcome.summary.orphans_pruned, 0);
        assert_eq!(outcome.summary.created, 0);
        let mine = for_owner(&outcome.installments, "a1");
        assert_eq!(mine.len(), 2);
        assert!(mine[0].is_paid());
        assert!(mine.iter().all(|i| i.client_name == "Ana Maria"));
    }

    #[test]
    fn test_incomplete_owner_records_prune_nothing() {
        let existing = vec![
            installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), true),
            installment(None, "Bia", PlanKind::Weekly, 1, date(2024, 1, 19), false),
        ];
        let mut known = clients(&[]);
        known.complete = false;
        let outcome = reconcile(existing, &[], &known, NOW);

        assert_eq!(outcome.installments.len(), 2);
        assert_eq!(outcome.summary.orphans_pruned, 0);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_dedupe_prefers_paid_copy_regardless_of_order() {
        let pending = installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), false);
        let mut paid = pending.clone();
        paid.active = false;
        paid.id = "zzz".to_string();

        let (kept, removed) = dedupe_installments(vec![pending.clone(), paid.clone()]);
        assert_eq!(removed, 1);
        assert_eq!(kept, vec![paid.clone()]);

        let (kept, _) = dedupe_installments(vec![paid.clone(), pending]);
        assert_eq!(kept, vec![paid]);
    }

    #[test]
    fn test_dedupe_keeps_same_date_for_different_owners() {
        let a = installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), false);
        let b = installment(Some("a2"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), false);
        let c = installment(None, "Bia", PlanKind::Monthly, 1, date(2024, 2, 29), false);
        let (kept, removed) = dedupe_installments(vec![a, b, c]);
        assert_eq!(kept.len(), 3);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_adopts_legacy_installment_for_single_plan() {
        let owners = vec![weekly_owner("w1", "Ana", 4)];
        let existing = vec![installment(None, "ana", PlanKind::Weekly, 1, date(2024, 1, 20), false)];
        let outcome = reconcile(existing, &owners, &clients(&["Ana"]), NOW);

        assert_eq!(outcome.installments.len(), 1);
        let adopted = &outcome.installments[0];
        assert_eq!(adopted.analysis_id.as_deref(), Some("w1"));
        assert_eq!(adopted.due_date, date(2024, 1, 19));
        assert_eq!(adopted.client_name, "Ana");
        assert_eq!(adopted.total, 4);
        assert!(outcome.changed);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31)), weekly_owner("w1", "Bia", 2)];
        let known = clients(&["Ana", "Bia"]);
        let first = reconcile(Vec::new(), &owners, &known, NOW);
        let second = reconcile(first.installments.clone(), &owners, &known, NOW);

        assert!(!second.changed);
        assert_eq!(second.summary, ReconciliationSummary::default());
        assert_eq!(second.installments, first.installments);
    }

    #[test]
    fn test_shrunk_plan_keeps_history_beyond_total() {
        let owners = vec![monthly_owner("a1", "Ana", 1, Some(31))];
        let existing = vec![
            installment(Some("a1"), "Ana", PlanKind::Monthly, 1, date(2024, 2, 29), true),
            installment(Some("a1"), "Ana", PlanKind::Monthly, 2, date(2024, 3, 31), true),
        ];
        let outcome = reconcile(existing, &owners, &clients(&["Ana"]), NOW);
        assert_eq!(outcome.installments.len(), 2);
    }

    #[test]
    fn test_toggle_paid_creates_next_slot_once() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let mut installments = reconcile(Vec::new(), &owners, &clients(&["Ana"]), NOW).installments;

        let outcome = toggle_installment(&mut installments, "plano::a1::1", &owners, NOW).unwrap();
        assert!(outcome.installment.is_paid());
        let next = outcome.created_next.expect("next slot created");
        assert_eq!(next.sequence, 2);
        assert_eq!(next.due_date, date(2024, 3, 31));
        assert!(next.active);
        assert_eq!(installments.len(), 2);

        // Unpay and pay again: history stays, no duplicate slot
        let outcome = toggle_installment(&mut installments, "plano::a1::1", &owners, NOW).unwrap();
        assert!(!outcome.installment.is_paid());
        assert!(outcome.created_next.is_none());
        assert_eq!(installments.len(), 2);

        let outcome = toggle_installment(&mut installments, "plano::a1::1", &owners, NOW).unwrap();
        assert!(outcome.created_next.is_none());
        assert_eq!(installments.len(), 2);
    }

    #[test]
    fn test_toggle_last_slot_creates_nothing() {
        let owners = vec![monthly_owner("a1", "Ana", 1, None)];
        let mut installments = reconcile(Vec::new(), &owners, &clients(&["Ana"]), NOW).installments;
        let outcome = toggle_installment(&mut installments, "plano::a1::1", &owners, NOW).unwrap();
        assert!(outcome.created_next.is_none());
        assert_eq!(installments.len(), 1);
    }

    #[test]
    fn test_toggle_legacy_installment_without_owner() {
        let mut installments = vec![installment(None, "Ana", PlanKind::Weekly, 1, date(2024, 1, 19), false)];
        let outcome = toggle_installment(&mut installments, "semanal::Ana::1", &[], NOW).unwrap();

        let next = outcome.created_next.unwrap();
        assert_eq!(next.due_date, date(2024, 1, 26));
        assert_eq!(next.sequence, 2);
        assert_eq!(next.id, "semanal::ana::2");
        assert!(next.analysis_id.is_none());
    }

    #[test]
    fn test_toggle_never_deletes_and_adds_at_most_one() {
        let owners = vec![weekly_owner("w1", "Ana", 5)];
        let mut installments = reconcile(Vec::new(), &owners, &clients(&["Ana"]), NOW).installments;

        for step in 0..12 {
            let ids: Vec<String> = installments.iter().map(|i| i.id.clone()).collect();
            let target = ids[step % ids.len()].clone();
            let before = installments.len();
            toggle_installment(&mut installments, &target, &owners, NOW).unwrap();

            assert!(installments.len() == before || installments.len() == before + 1);
            for id in &ids {
                assert!(installments.iter().any(|i| &i.id == id));
            }
            let mut sequences: Vec<u32> = installments.iter().map(|i| i.sequence).collect();
            sequences.sort_unstable();
            sequences.dedup();
            assert_eq!(sequences.len(), installments.len());
        }
    }

    #[test]
    fn test_toggle_with_owner_never_reuses_an_id() {
        let owners = vec![monthly_owner("a1", "Ana", 3, Some(31))];
        let mut installments = reconcile(Vec::new(), &owners, &clients(&["Ana"]), NOW).installments;
        // A stray record already holds the id slot 2 would get
        let mut stray = installment(Some("other"), "Bia", PlanKind::Monthly, 5, date(2024, 8, 31), false);
        stray.id = "plano::a1::2".to_string();
        installments.push(stray);

        let outcome = toggle_installment(&mut installments, "plano::a1::1", &owners, NOW).unwrap();
        let next = outcome.created_next.unwrap();
        assert_eq!(next.id, "plano::a1::2-2");
        assert_eq!(next.sequence, 2);

        let mut ids: Vec<&str> = installments.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), installments.len());
    }

    #[test]
    fn test_toggle_unknown_id_is_not_found() {
        let mut installments = Vec::new();
        let err = toggle_installment(&mut installments, "nope", &[], NOW).unwrap_err();
        assert!(err.is_not_found());
    }
}
