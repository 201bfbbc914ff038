use serde::{Deserialize, Serialize};

/// Kind of clearing being priced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingType {
    Standard,
    Expedited,
    /// Counter-obligations (disputes, corrections) clear at a reduced rate.
    Counter,
}

/// Risk classification supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Standard,
    Elevated,
}

/// Inputs to fee composition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRequest {
    pub clearing_type: ClearingType,
    pub amount_minor: u128,
    pub risk_level: RiskLevel,
}

/// One line of the fee breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLine {
    pub label: String,
    pub amount: u128,
}

/// A composed fee quote. Informational: fee settlement is a separate
/// obligation, never folded into the cleared amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub clearing_fee: u128,
    pub processing_fee: u128,
    pub total_fee: u128,
    pub effective_rate_bps: u32,
    pub breakdown: Vec<FeeLine>,
}

/// Pure function of its inputs; consulted before clearing, never mutates
/// the ledger.
pub trait FeeCalculator: Send + Sync {
    fn quote(&self, request: &FeeRequest) -> FeeQuote;
}

/// Default basis-point schedule with a flat processing fee.
#[derive(Clone, Debug)]
pub struct StandardFeeCalculator {
    pub standard_bps: u32,
    pub expedited_bps: u32,
    pub counter_bps: u32,
    pub elevated_risk_surcharge_bps: u32,
    pub processing_flat: u128,
}

impl Default for StandardFeeCalculator {
    fn default() -> Self {
        Self {
            standard_bps: 50,
            expedited_bps: 90,
            counter_bps: 25,
            elevated_risk_surcharge_bps: 40,
            processing_flat: 30,
        }
    }
}

impl StandardFeeCalculator {
    fn rate_bps(&self, request: &FeeRequest) -> u32 {
        let base = match request.clearing_type {
            ClearingType::Standard => self.standard_bps,
            ClearingType::Expedited => self.expedited_bps,
            ClearingType::Counter => self.counter_bps,
        };
        let surcharge = match request.risk_level {
            RiskLevel::Low => 0,
            RiskLevel::Standard => self.elevated_risk_surcharge_bps / 4,
            RiskLevel::Elevated => self.elevated_risk_surcharge_bps,
        };
        base + surcharge
    }
}

impl FeeCalculator for StandardFeeCalculator {
    fn quote(&self, request: &FeeRequest) -> FeeQuote {
        let rate = self.rate_bps(request);
        let clearing_fee = request.amount_minor * rate as u128 / 10_000;
        let processing_fee = self.processing_flat;
        let total_fee = clearing_fee + processing_fee;
        let effective_rate_bps = if request.amount_minor == 0 {
            0
        } else {
            (total_fee * 10_000 / request.amount_minor).min(u32::MAX as u128) as u32
        };

        FeeQuote {
            clearing_fee,
            processing_fee,
            total_fee,
            effective_rate_bps,
            breakdown: vec![
                FeeLine {
                    label: format!("clearing @ {rate}bps"),
                    amount: clearing_fee,
                },
                FeeLine {
                    label: "processing".into(),
                    amount: processing_fee,
                },
            ],
        }
    }
}
