//! Timelock ordering and expiry validation
//!
//! The cross-chain safety of the protocol rests on one ordering rule: the
//! party that locks second must be able to reclaim first. All checks here are
//! pure functions of their inputs; nothing touches a clock or a chain.

use serde::{Deserialize, Serialize};

use crate::error::{SwapError, SwapResult};

/// Default horizon past which an initiator timelock looks suspicious.
pub const DEFAULT_FAR_FUTURE_HORIZON_SECS: u64 = 24 * 3600;

/// Non-fatal warning produced by validation; the operation proceeds, but the
/// advisory is recorded in the outcome and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "advisory")]
pub enum TimelockAdvisory {
    /// The initiator timelock is further out than the configured horizon.
    /// Usually a unit mistake (ms vs s) or a hostile counterparty stretching
    /// the exposure window; worth an operator's look either way.
    SuspiciousFarFutureTimelock { timelock: u64, horizon: u64 },
}

/// Validates timelock ordering between the two legs of a swap.
#[derive(Debug, Clone, Copy)]
pub struct TimelockValidator {
    far_future_horizon_secs: u64,
    reject_far_future: bool,
}

impl TimelockValidator {
    pub fn new(far_future_horizon_secs: u64, reject_far_future: bool) -> Self {
        Self {
            far_future_horizon_secs,
            reject_far_future,
        }
    }

    /// Self-consistency check when initiating: the timelock must be in the
    /// future. There is no counterpart leg yet, so only the far-future
    /// advisory can fire beyond that.
    pub fn validate_initiator(
        &self,
        now: u64,
        timelock: u64,
    ) -> SwapResult<Option<TimelockAdvisory>> {
        if timelock <= now {
            return Err(SwapError::TimelockInPast { timelock, now });
        }
        self.far_future_check(now, timelock)
    }

    /// Check a responder's timelock against the observed initiator timelock.
    ///
    /// The responder locks second and must hold the shorter window:
    /// `responder < initiator` strictly, equal values rejected. The initiator
    /// timelock may be unknown when it was supplied out of band.
    pub fn validate_responder(
        &self,
        now: u64,
        responder: u64,
        initiator: Option<u64>,
    ) -> SwapResult<Option<TimelockAdvisory>> {
        if responder <= now {
            return Err(SwapError::TimelockInPast {
                timelock: responder,
                now,
            });
        }
        let Some(initiator) = initiator else {
            return Ok(None);
        };
        if initiator <= responder {
            return Err(SwapError::TimelockOrderingInvalid {
                responder,
                initiator,
            });
        }
        self.far_future_check(now, initiator)
    }

    /// A refund is eligible only strictly after the timelock has passed.
    pub fn validate_refund_eligible(&self, now: u64, timelock: u64) -> SwapResult<()> {
        if now <= timelock {
            return Err(SwapError::TimelockNotExpired { timelock, now });
        }
        Ok(())
    }

    fn far_future_check(&self, now: u64, timelock: u64) -> SwapResult<Option<TimelockAdvisory>> {
        let horizon = self.far_future_horizon_secs;
        if timelock > now.saturating_add(horizon) {
            if self.reject_far_future {
                return Err(SwapError::TimelockTooFarOut { timelock, horizon });
            }
            return Ok(Some(TimelockAdvisory::SuspiciousFarFutureTimelock {
                timelock,
                horizon,
            }));
        }
        Ok(None)
    }
}

impl Default for TimelockValidator {
    fn default() -> Self {
        Self::new(DEFAULT_FAR_FUTURE_HORIZON_SECS, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn responder_rejects_timelock_in_past() {
        let v = TimelockValidator::default();
        assert!(matches!(
            v.validate_responder(NOW, NOW, Some(NOW + 600)),
            Err(SwapError::TimelockInPast { .. })
        ));
        assert!(matches!(
            v.validate_responder(NOW, NOW - 1, Some(NOW + 600)),
            Err(SwapError::TimelockInPast { .. })
        ));
    }

    #[test]
    fn responder_must_expire_before_initiator() {
        let v = TimelockValidator::default();
        // responder shorter than initiator: fine
        assert!(v
            .validate_responder(NOW, NOW + 300, Some(NOW + 600))
            .unwrap()
            .is_none());
        // reversed ordering rejected
        assert!(matches!(
            v.validate_responder(NOW, NOW + 600, Some(NOW + 300)),
            Err(SwapError::TimelockOrderingInvalid { .. })
        ));
        // equality rejected, not just "less"
        assert!(matches!(
            v.validate_responder(NOW, NOW + 600, Some(NOW + 600)),
            Err(SwapError::TimelockOrderingInvalid { .. })
        ));
    }

    #[test]
    fn unknown_initiator_timelock_skips_ordering_check() {
        let v = TimelockValidator::default();
        assert!(v.validate_responder(NOW, NOW + 300, None).unwrap().is_none());
    }

    #[test]
    fn far_future_initiator_fires_advisory() {
        let v = TimelockValidator::default();
        let far = NOW + DEFAULT_FAR_FUTURE_HORIZON_SECS + 1;
        let advisory = v.validate_responder(NOW, NOW + 300, Some(far)).unwrap();
        assert_eq!(
            advisory,
            Some(TimelockAdvisory::SuspiciousFarFutureTimelock {
                timelock: far,
                horizon: DEFAULT_FAR_FUTURE_HORIZON_SECS,
            })
        );
        // exactly at the horizon is still fine
        assert!(v
            .validate_responder(NOW, NOW + 300, Some(NOW + DEFAULT_FAR_FUTURE_HORIZON_SECS))
            .unwrap()
            .is_none());
    }

    #[test]
    fn far_future_can_be_a_hard_rejection() {
        let v = TimelockValidator::new(DEFAULT_FAR_FUTURE_HORIZON_SECS, true);
        let far = NOW + DEFAULT_FAR_FUTURE_HORIZON_SECS + 1;
        assert!(matches!(
            v.validate_responder(NOW, NOW + 300, Some(far)),
            Err(SwapError::TimelockTooFarOut { .. })
        ));
        assert!(matches!(
            v.validate_initiator(NOW, far),
            Err(SwapError::TimelockTooFarOut { .. })
        ));
    }

    #[test]
    fn refund_eligibility_is_strict() {
        let v = TimelockValidator::default();
        assert!(matches!(
            v.validate_refund_eligible(NOW, NOW + 1),
            Err(SwapError::TimelockNotExpired { .. })
        ));
        // boundary: still locked at now == timelock
        assert!(matches!(
            v.validate_refund_eligible(NOW, NOW),
            Err(SwapError::TimelockNotExpired { .. })
        ));
        // eligible one second later
        assert!(v.validate_refund_eligible(NOW + 1, NOW).is_ok());
    }

    #[test]
    fn initiator_self_check() {
        let v = TimelockValidator::default();
        assert!(v.validate_initiator(NOW, NOW + 600).unwrap().is_none());
        assert!(matches!(
            v.validate_initiator(NOW, NOW),
            Err(SwapError::TimelockInPast { .. })
        ));
    }
}
