//! # Oil Mill Core
//!
//! 成本要素、庫存批次與混油來源的核心資料模型

pub mod blend;
pub mod catalog;
pub mod config;
pub mod element;
pub mod input;
pub mod lot;
pub mod rates;

// Re-export 主要類型
pub use blend::BlendComponent;
pub use catalog::CostElementCatalog;
pub use config::CostingConfig;
pub use element::{Activity, CalculationMethod, CostElement, CostElementRow};
pub use input::CostInput;
pub use lot::InventoryLot;
pub use rates::RateProvider;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// 成本引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CostError {
    #[error("無效的成本輸入: {0}")]
    InvalidCostInput(String),

    #[error("不支援的計算方式: {0}")]
    UnsupportedCalculationMethod(String),

    #[error("混油比例合計必須剛好為 100%，目前為 {total}%")]
    PercentageMismatch { total: Decimal },

    #[error("混合油種必須指定成品油種")]
    ResultOilTypeRequired,

    #[error("庫存不足：需要 {requested}, 可用 {available}")]
    InsufficientInventory {
        requested: Decimal,
        available: Decimal,
    },

    #[error("無效的時間區間：結束 {end} 不晚於開始 {start}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("混油至少需要 2 個來源批次，目前 {0} 個")]
    InsufficientBlendComponents(usize),

    #[error("找不到成本要素: {0}")]
    CostElementNotFound(String),

    #[error("成本要素重複: {0}")]
    DuplicateCostElement(String),

    #[error("找不到庫存批次: {0}")]
    LotNotFound(String),

    #[error("數值溢位: {0}")]
    ArithmeticOverflow(String),

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CostError>;

/// 檢查數值不為負
///
/// 引擎對負數一律回報錯誤，不做截斷
pub fn ensure_non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(CostError::InvalidCostInput(format!(
            "{} 不可為負數: {}",
            field, value
        )));
    }
    Ok(())
}

/// 乘法，溢位時回報錯誤
pub fn checked_mul(field: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| CostError::ArithmeticOverflow(format!("{}: {} × {}", field, a, b)))
}

/// 加法，溢位時回報錯誤
pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| CostError::ArithmeticOverflow(format!("{}: {} + {}", field, a, b)))
}

/// 除法，溢位或除數為 0 時回報錯誤（呼叫端應先處理除數為 0 的情況）
pub fn checked_div(field: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_div(b)
        .ok_or_else(|| CostError::ArithmeticOverflow(format!("{}: {} ÷ {}", field, a, b)))
}

/// 合計，溢位時回報錯誤
pub fn checked_sum<I>(field: &str, values: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| checked_add(field, acc, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            checked_mul("小計", Decimal::from(3), Decimal::new(25, 1)).unwrap(),
            Decimal::new(75, 1)
        );
        assert_eq!(
            checked_sum("合計", vec![Decimal::ONE, Decimal::from(2)]).unwrap(),
            Decimal::from(3)
        );

        assert!(matches!(
            checked_mul("小計", Decimal::MAX, Decimal::from(2)),
            Err(CostError::ArithmeticOverflow(_))
        ));
        assert!(matches!(
            checked_sum("合計", vec![Decimal::MAX, Decimal::MAX]),
            Err(CostError::ArithmeticOverflow(_))
        ));
        assert!(matches!(
            checked_div("單價", Decimal::MAX, Decimal::new(1, 2)),
            Err(CostError::ArithmeticOverflow(_))
        ));
    }
}
