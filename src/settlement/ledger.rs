use crate::core::allocation::Allocation;
use crate::core::money::{convert, RoundingPolicy};
use crate::core::obligation::Obligation;
use crate::core::payment::{Payment, PaymentStatus};
use crate::error::{AllocationLimit, Result, SettlementError};
use crate::fx::resolver::RateResolver;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A request to apply part of a payment to an obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub payment_id: Uuid,
    pub obligation_id: Uuid,
    /// Amount in the payment's currency.
    pub amount: i64,
    /// Credit obligation netted in the same allocation.
    #[serde(default)]
    pub credit_id: Option<Uuid>,
}

impl AllocationRequest {
    pub fn new(payment_id: Uuid, obligation_id: Uuid, amount: i64) -> Self {
        Self {
            payment_id,
            obligation_id,
            amount,
            credit_id: None,
        }
    }

    pub fn with_credit(mut self, credit_id: Uuid) -> Self {
        self.credit_id = Some(credit_id);
        self
    }
}

/// Recorded payments, their approval workflow and their allocations.
///
/// An allocation is *void* when its payment was rejected: it stays on record
/// but neither settles anything nor consumes capacity. Allocations of pending
/// payments do not settle anything yet, but they do reserve capacity on the
/// payment, the target obligation and the credit, so pre-allocating a payment
/// under review can never over-commit an obligation once approved.
#[derive(Debug, Clone, Default)]
pub struct PaymentLedger {
    payments: HashMap<Uuid, Payment>,
    allocations: Vec<Allocation>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, payment: Payment) -> Uuid {
        let id = payment.id();
        info!(
            "recorded {:?} payment {} of {} {} from {}",
            payment.direction(),
            id,
            payment.amount(),
            payment.currency(),
            payment.counterparty()
        );
        self.payments.insert(id, payment);
        id
    }

    pub fn payment(&self, id: Uuid) -> Result<&Payment> {
        self.payments
            .get(&id)
            .ok_or(SettlementError::UnknownPayment(id))
    }

    fn payment_mut(&mut self, id: Uuid) -> Result<&mut Payment> {
        self.payments
            .get_mut(&id)
            .ok_or(SettlementError::UnknownPayment(id))
    }

    pub fn payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.values()
    }

    /// Approve a pending payment; its allocations start to count.
    pub fn approve(&mut self, id: Uuid, actor: &str, at: DateTime<Utc>) -> Result<&Payment> {
        let payment = self.payment_mut(id)?;
        payment.approve(actor, at)?;
        info!("approved payment {} by {}", id, actor);
        Ok(&*payment)
    }

    /// Reject a pending payment; its allocations become void.
    pub fn reject(&mut self, id: Uuid, reason: &str) -> Result<&Payment> {
        let payment = self.payment_mut(id)?;
        payment.reject(reason)?;
        info!("rejected payment {}: {}", id, reason);
        Ok(&*payment)
    }

    /// Delete a payment that is still pending, together with its allocations.
    pub fn delete_payment(&mut self, id: Uuid) -> Result<Payment> {
        let status = self.payment(id)?.status();
        if status != PaymentStatus::PendingApproval {
            return Err(SettlementError::InvalidTransition {
                entity: format!("payment {id}"),
                from: status.to_string(),
                to: "DELETED".into(),
            });
        }
        self.allocations.retain(|a| a.payment_id != id);
        let payment = self
            .payments
            .remove(&id)
            .ok_or(SettlementError::UnknownPayment(id))?;
        info!("deleted pending payment {}", id);
        Ok(payment)
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn allocation(&self, id: Uuid) -> Result<&Allocation> {
        self.allocations
            .iter()
            .find(|a| a.id == id)
            .ok_or(SettlementError::UnknownAllocation(id))
    }

    pub fn allocations_for_payment(&self, payment_id: Uuid) -> impl Iterator<Item = &Allocation> {
        self.allocations
            .iter()
            .filter(move |a| a.payment_id == payment_id)
    }

    /// Every allocation paired with its payment's current status.
    pub fn history(&self) -> impl Iterator<Item = (&Allocation, PaymentStatus)> {
        self.allocations.iter().filter_map(move |a| {
            self.payments
                .get(&a.payment_id)
                .map(|p| (a, p.status()))
        })
    }

    /// Allocations touching one obligation, as target or as credit.
    pub fn history_for(&self, obligation_id: Uuid) -> Vec<(&Allocation, PaymentStatus)> {
        self.history()
            .filter(|(a, _)| a.touches(obligation_id))
            .collect()
    }

    /// Payment amount not yet taken by non-void allocations.
    pub fn unallocated(&self, payment_id: Uuid) -> Result<i64> {
        let payment = self.payment(payment_id)?;
        if payment.is_rejected() {
            return Ok(0);
        }
        let used: i64 = self
            .allocations_for_payment(payment_id)
            .map(|a| a.allocated_amount)
            .sum();
        Ok(payment.amount() - used)
    }

    /// Amount of an obligation (or credit) reserved by non-void allocations,
    /// in the obligation's currency.
    pub fn committed(&self, obligation_id: Uuid) -> i64 {
        self.history()
            .filter(|(a, status)| *status != PaymentStatus::Rejected && a.touches(obligation_id))
            .map(|(a, _)| a.amount_in_document_currency)
            .sum()
    }

    /// Allocate part of a payment to `target`, optionally netting `credit`.
    ///
    /// # Checks, in order
    ///
    /// 1. The payment exists and is not rejected; the amount is positive.
    /// 2. The target is a normal obligation that is not waived; the credit,
    ///    if any, is a non-waived credit in the target's currency.
    /// 3. No allocation exists yet for the same (payment, target, credit).
    /// 4. The amount fits in the payment's unallocated amount.
    /// 5. The amount converts into the target currency using the approved
    ///    rate as of the payment date; a missing rate fails the allocation.
    /// 6. The converted amount fits in the target's unreserved balance and
    ///    in the credit's available balance.
    ///
    /// Over-allocation is always an error; the ledger never caps an amount.
    pub fn allocate(
        &mut self,
        request: &AllocationRequest,
        target: &Obligation,
        credit: Option<&Obligation>,
        rates: &dyn RateResolver,
        rounding: RoundingPolicy,
    ) -> Result<Allocation> {
        if request.obligation_id != target.id() || request.credit_id != credit.map(|c| c.id()) {
            return Err(SettlementError::InvalidAllocation {
                reason: "request does not match the supplied obligations".into(),
            });
        }
        let payment = self.payment(request.payment_id)?;
        if payment.is_rejected() {
            return Err(SettlementError::InvalidTransition {
                entity: format!("payment {}", payment.id()),
                from: payment.status().to_string(),
                to: "ALLOCATED".into(),
            });
        }
        if request.amount <= 0 {
            return Err(SettlementError::InvalidAmount {
                reason: format!("allocation amount must be positive, got {}", request.amount),
            });
        }
        check_target(target)?;
        if let Some(credit) = credit {
            check_credit(target, credit)?;
        }

        let key = (request.payment_id, target.id(), credit.map(|c| c.id()));
        if self.allocations.iter().any(|a| a.key() == key) {
            return Err(SettlementError::DuplicateAllocation {
                payment: key.0,
                obligation: key.1,
                credit: key.2,
            });
        }

        let unallocated = self.unallocated(request.payment_id)?;
        if request.amount > unallocated {
            warn!(
                "allocation of {} rejected: payment {} has {} unallocated",
                request.amount, request.payment_id, unallocated
            );
            return Err(SettlementError::OverAllocation {
                limit: AllocationLimit::Payment(request.payment_id),
                requested: request.amount,
                available: unallocated,
            });
        }

        let (exchange_rate, converted) = if payment.currency() == target.currency() {
            (None, request.amount)
        } else {
            let rate = rates
                .resolve(payment.currency(), target.currency(), payment.payment_date())
                .map_err(|e| {
                    warn!("allocation rejected: {}", e);
                    SettlementError::from(e)
                })?;
            (Some(rate), convert(request.amount, rate, rounding)?)
        };
        if converted <= 0 {
            return Err(SettlementError::InvalidAllocation {
                reason: format!(
                    "{} {} converts to nothing in {}",
                    request.amount,
                    payment.currency(),
                    target.currency()
                ),
            });
        }

        let available = target.amount() - self.committed(target.id());
        if converted > available {
            warn!(
                "allocation of {} rejected: obligation {} has {} open",
                converted,
                target.id(),
                available
            );
            return Err(SettlementError::OverAllocation {
                limit: AllocationLimit::Obligation(target.id()),
                requested: converted,
                available,
            });
        }

        if let Some(credit) = credit {
            let credit_available = credit.amount() - self.committed(credit.id());
            if converted > credit_available {
                return Err(SettlementError::OverAllocation {
                    limit: AllocationLimit::Credit(credit.id()),
                    requested: converted,
                    available: credit_available,
                });
            }
        }

        let allocation = Allocation {
            id: Uuid::new_v4(),
            payment_id: request.payment_id,
            obligation_id: target.id(),
            credit_id: credit.map(|c| c.id()),
            allocated_amount: request.amount,
            exchange_rate,
            amount_in_document_currency: converted,
        };
        info!(
            "allocated {} of payment {} to obligation {} ({} in {})",
            allocation.allocated_amount,
            allocation.payment_id,
            allocation.obligation_id,
            allocation.amount_in_document_currency,
            target.currency()
        );
        self.allocations.push(allocation.clone());
        Ok(allocation)
    }

    /// Remove an allocation whose payment is still pending approval.
    pub fn remove_allocation(&mut self, id: Uuid) -> Result<Allocation> {
        let allocation = self.allocation(id)?;
        let status = self.payment(allocation.payment_id)?.status();
        if status != PaymentStatus::PendingApproval {
            return Err(SettlementError::InvalidTransition {
                entity: format!("allocation {id}"),
                from: status.to_string(),
                to: "REMOVED".into(),
            });
        }
        let index = self
            .allocations
            .iter()
            .position(|a| a.id == id)
            .ok_or(SettlementError::UnknownAllocation(id))?;
        info!("removed allocation {}", id);
        Ok(self.allocations.remove(index))
    }
}

fn check_target(target: &Obligation) -> Result<()> {
    if target.is_credit() {
        return Err(SettlementError::InvalidAllocation {
            reason: format!("obligation {} is a credit and cannot be a target", target.id()),
        });
    }
    if target.is_waived() {
        return Err(SettlementError::AlreadyWaived {
            obligation: target.id(),
        });
    }
    Ok(())
}

fn check_credit(target: &Obligation, credit: &Obligation) -> Result<()> {
    if !credit.is_credit() {
        return Err(SettlementError::InvalidAllocation {
            reason: format!("obligation {} is not a credit", credit.id()),
        });
    }
    if credit.is_waived() {
        return Err(SettlementError::AlreadyWaived {
            obligation: credit.id(),
        });
    }
    if credit.currency() != target.currency() {
        return Err(SettlementError::InvalidAllocation {
            reason: format!(
                "credit currency {} differs from obligation currency {}",
                credit.currency(),
                target.currency()
            ),
        });
    }
    Ok(())
}
