//! 工時計費

use chrono::NaiveDateTime;
use oilmill_core::{checked_add, checked_mul, CostError, CostingConfig, RateProvider};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CostWarning, WarningKind};

/// 工時（實際與計費）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilledDuration {
    /// 實際工時（可含小數）
    pub actual_hours: Decimal,
    /// 計費工時（無條件進位到整點）
    pub billed_hours: Decimal,
}

/// 工時成本結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCostResult {
    pub duration: BilledDuration,
    pub labour_rate: Option<Decimal>,
    pub utility_rate: Option<Decimal>,
    /// 計費工時 ×（人工費率 + 水電費率），缺失的費率不計入
    pub cost: Decimal,
    /// 是否有費率缺失
    pub degraded: bool,
    /// 缺失的費率要素ID
    pub missing_rates: Vec<String>,
    pub warnings: Vec<CostWarning>,
}

/// 工時計費器
pub struct TimeTracker;

impl TimeTracker {
    /// 計算實際與計費工時
    pub fn duration(start: NaiveDateTime, end: NaiveDateTime) -> oilmill_core::Result<BilledDuration> {
        if end <= start {
            return Err(CostError::InvalidInterval { start, end });
        }

        let seconds = (end - start).num_seconds();
        let actual_hours = Decimal::from(seconds) / Decimal::from(3600);
        let billed_hours = actual_hours.ceil().max(Decimal::ONE);

        Ok(BilledDuration {
            actual_hours,
            billed_hours,
        })
    }

    /// 計算工時成本，費率由 `rates` 提供
    ///
    /// 查無費率時不以任何常數替代，改標記為降級結果並附上警告
    pub fn cost<R>(
        subject: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rates: &R,
        config: &CostingConfig,
    ) -> oilmill_core::Result<TimeCostResult>
    where
        R: RateProvider + ?Sized,
    {
        let duration = Self::duration(start, end)?;

        let labour_rate = rates.rate(&config.labour_rate_element_id);
        let utility_rate = rates.rate(&config.utility_rate_element_id);

        let mut missing_rates = Vec::new();
        if labour_rate.is_none() {
            missing_rates.push(config.labour_rate_element_id.clone());
        }
        if utility_rate.is_none() {
            missing_rates.push(config.utility_rate_element_id.clone());
        }

        for rate in [labour_rate, utility_rate].into_iter().flatten() {
            oilmill_core::ensure_non_negative("工時費率", rate)?;
        }

        let hourly = checked_add(
            "每小時費率",
            labour_rate.unwrap_or(Decimal::ZERO),
            utility_rate.unwrap_or(Decimal::ZERO),
        )?;
        let cost = checked_mul("工時成本", duration.billed_hours, hourly)?;

        let mut warnings = Vec::new();
        let degraded = !missing_rates.is_empty();
        if degraded {
            tracing::warn!("{} 工時計費缺少費率: {:?}", subject, missing_rates);
            warnings.push(CostWarning::warning(
                subject,
                WarningKind::DegradedRates,
                format!("費率主檔缺少 {}，工時成本未完整計入", missing_rates.join(", ")),
            ));
        }

        tracing::debug!(
            "{} 實際工時 {}，計費工時 {}，成本 {}",
            subject,
            duration.actual_hours,
            duration.billed_hours,
            cost
        );

        Ok(TimeCostResult {
            duration,
            labour_rate,
            utility_rate,
            cost,
            degraded,
            missing_rates,
            warnings,
        })
    }
}
