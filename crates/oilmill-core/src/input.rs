//! 成本輸入（單次計算的套用／覆寫設定）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::element::CostElement;
use crate::{CostError, Result};

/// 成本輸入
///
/// 每次計算都以完整快照傳入，計算過程不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInput {
    /// 成本要素ID（參照）
    pub element_id: String,

    /// 是否套用（必要要素一律視為套用）
    pub is_applied: bool,

    /// 覆寫費率
    pub override_rate: Option<Decimal>,

    /// 實際金額（僅 actual 計算方式使用）
    pub actual_amount: Option<Decimal>,
}

impl CostInput {
    /// 創建套用的成本輸入
    pub fn applied(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
            is_applied: true,
            override_rate: None,
            actual_amount: None,
        }
    }

    /// 創建不套用的成本輸入
    pub fn skipped(element_id: &str) -> Self {
        Self {
            is_applied: false,
            ..Self::applied(element_id)
        }
    }

    /// 建構器模式：設置覆寫費率
    pub fn with_override_rate(mut self, rate: Decimal) -> Self {
        self.override_rate = Some(rate);
        self
    }

    /// 建構器模式：由表單文字設置覆寫費率
    ///
    /// 空白表示不覆寫；無法解析或為負數時回報錯誤
    pub fn with_override_str(mut self, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.override_rate = None;
            return Ok(self);
        }

        let rate = Decimal::from_str(trimmed).map_err(|_| {
            CostError::InvalidCostInput(format!(
                "{} 覆寫費率格式錯誤: {}",
                self.element_id, raw
            ))
        })?;
        crate::ensure_non_negative(&format!("{} 覆寫費率", self.element_id), rate)?;
        self.override_rate = Some(rate);
        Ok(self)
    }

    /// 建構器模式：設置實際金額
    pub fn with_actual_amount(mut self, amount: Decimal) -> Self {
        self.actual_amount = Some(amount);
        self
    }

    /// 實際生效的套用狀態
    pub fn effective_applied(&self, element: &CostElement) -> bool {
        !element.is_optional || self.is_applied
    }

    /// 實際生效的費率（覆寫優先）
    pub fn effective_rate(&self, element: &CostElement) -> Decimal {
        self.override_rate.unwrap_or(element.default_rate)
    }
}
