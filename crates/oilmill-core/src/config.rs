//! 成本計算配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CostError, Result};

/// 成本計算參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostingConfig {
    /// 每袋公斤數（per_bag 計算用）
    pub bag_divisor: Decimal,

    /// 總收率超過此百分比時發出警告
    pub high_yield_warning_percent: Decimal,

    /// 總收率超過此百分比（且未超過警告值）時提示含加工添加物
    pub processing_addition_percent: Decimal,

    /// 工時計費的人工費率要素ID
    pub labour_rate_element_id: String,

    /// 工時計費的水電費率要素ID
    pub utility_rate_element_id: String,
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            bag_divisor: Decimal::from(50),
            high_yield_warning_percent: Decimal::from(110),
            processing_addition_percent: Decimal::from(100),
            labour_rate_element_id: "labour".to_string(),
            utility_rate_element_id: "electricity".to_string(),
        }
    }
}

impl CostingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 JSON 載入（未提供的欄位使用預設值）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置每袋公斤數
    pub fn with_bag_divisor(mut self, bag_divisor: Decimal) -> Self {
        self.bag_divisor = bag_divisor;
        self
    }

    /// 建構器模式：設置收率門檻
    pub fn with_yield_thresholds(mut self, processing_addition: Decimal, high_warning: Decimal) -> Self {
        self.processing_addition_percent = processing_addition;
        self.high_yield_warning_percent = high_warning;
        self
    }

    /// 建構器模式：設置工時費率要素
    pub fn with_rate_elements(mut self, labour: &str, utility: &str) -> Self {
        self.labour_rate_element_id = labour.to_string();
        self.utility_rate_element_id = utility.to_string();
        self
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        if self.bag_divisor <= Decimal::ZERO {
            return Err(CostError::InvalidCostInput(format!(
                "每袋公斤數必須大於 0: {}",
                self.bag_divisor
            )));
        }
        if self.processing_addition_percent > self.high_yield_warning_percent {
            return Err(CostError::InvalidCostInput(format!(
                "收率提示門檻 {} 不可高於警告門檻 {}",
                self.processing_addition_percent, self.high_yield_warning_percent
            )));
        }
        Ok(())
    }
}
