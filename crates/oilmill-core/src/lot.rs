//! 庫存批次模型

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CostError, Result};

/// 庫存批次（生產批號或混油批號）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLot {
    /// 批次ID
    pub lot_id: String,

    /// 生產數量
    pub produced_quantity: Decimal,

    /// 剩餘數量
    pub remaining_quantity: Decimal,

    /// 單位成本（生產時估算）
    pub unit_cost: Decimal,

    /// 生產時間
    pub produced_at: NaiveDateTime,

    /// 追溯碼
    pub traceable_code: Option<String>,

    /// 油種
    pub oil_type: Option<String>,

    /// 來源生產批號（副產品批次對應的生產批）
    pub source_batch_code: Option<String>,
}

impl InventoryLot {
    /// 創建新的庫存批次（剩餘數量等於生產數量）
    pub fn new(
        lot_id: String,
        produced_quantity: Decimal,
        unit_cost: Decimal,
        produced_at: NaiveDateTime,
    ) -> Self {
        Self {
            lot_id,
            produced_quantity,
            remaining_quantity: produced_quantity,
            unit_cost,
            produced_at,
            traceable_code: None,
            oil_type: None,
            source_batch_code: None,
        }
    }

    /// 建構器模式：設置剩餘數量
    pub fn with_remaining_quantity(mut self, remaining_quantity: Decimal) -> Self {
        self.remaining_quantity = remaining_quantity;
        self
    }

    /// 建構器模式：設置追溯碼
    pub fn with_traceable_code(mut self, code: &str) -> Self {
        self.traceable_code = Some(code.to_string());
        self
    }

    /// 建構器模式：設置油種
    pub fn with_oil_type(mut self, oil_type: &str) -> Self {
        self.oil_type = Some(oil_type.to_string());
        self
    }

    /// 建構器模式：設置來源生產批號
    pub fn with_source_batch_code(mut self, batch_code: &str) -> Self {
        self.source_batch_code = Some(batch_code.to_string());
        self
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// 驗證：0 ≤ 剩餘 ≤ 生產，成本不為負
    pub fn validate(&self) -> Result<()> {
        crate::ensure_non_negative(&format!("{} 剩餘數量", self.lot_id), self.remaining_quantity)?;
        crate::ensure_non_negative(&format!("{} 單位成本", self.lot_id), self.unit_cost)?;
        if self.remaining_quantity > self.produced_quantity {
            return Err(CostError::InvalidCostInput(format!(
                "{} 剩餘數量 {} 超過生產數量 {}",
                self.lot_id, self.remaining_quantity, self.produced_quantity
            )));
        }
        Ok(())
    }

    /// 是否已耗盡
    pub fn is_depleted(&self) -> bool {
        self.remaining_quantity <= Decimal::ZERO
    }

    /// 批齡（天）
    pub fn age_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.produced_at.date()).num_days()
    }

    /// 扣減剩餘數量（不可低於 0）
    pub fn consume(&mut self, quantity: Decimal) -> Result<()> {
        crate::ensure_non_negative("扣減數量", quantity)?;
        if quantity > self.remaining_quantity {
            return Err(CostError::InsufficientInventory {
                requested: quantity,
                available: self.remaining_quantity,
            });
        }
        self.remaining_quantity -= quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn produced_at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_create_lot() {
        let lot = InventoryLot::new(
            "CAKE-0301".to_string(),
            Decimal::from(200),
            Decimal::from(20),
            produced_at(1),
        )
        .with_source_batch_code("B-0301")
        .with_traceable_code("SEED-77/B-0301/CAKE");

        assert_eq!(lot.remaining_quantity, Decimal::from(200));
        assert_eq!(lot.source_batch_code.as_deref(), Some("B-0301"));
        assert!(lot.validate().is_ok());
        assert!(!lot.is_depleted());
        assert_eq!(lot.age_days(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()), 10);
    }

    #[test]
    fn test_consume() {
        let mut lot = InventoryLot::new(
            "OIL-01".to_string(),
            Decimal::from(100),
            Decimal::from(160),
            produced_at(2),
        );

        assert!(lot.consume(Decimal::from(60)).is_ok());
        assert_eq!(lot.remaining_quantity, Decimal::from(40));

        // 超量扣減應該失敗，且數量不變
        assert!(matches!(
            lot.consume(Decimal::from(41)),
            Err(CostError::InsufficientInventory { .. })
        ));
        assert_eq!(lot.remaining_quantity, Decimal::from(40));

        assert!(lot.consume(Decimal::from(40)).is_ok());
        assert!(lot.is_depleted());
    }

    #[test]
    fn test_unit_cost_update_keeps_quantities() {
        let lot = InventoryLot::new(
            "OIL-03".to_string(),
            Decimal::from(300),
            Decimal::from(160),
            produced_at(4),
        )
        .with_remaining_quantity(Decimal::from(120))
        .with_unit_cost(Decimal::from(162));

        assert_eq!(lot.unit_cost, Decimal::from(162));
        assert_eq!(lot.produced_quantity, Decimal::from(300));
        assert_eq!(lot.remaining_quantity, Decimal::from(120));
        assert!(lot.validate().is_ok());
    }

    #[test]
    fn test_remaining_above_produced_is_invalid() {
        let lot = InventoryLot::new(
            "OIL-02".to_string(),
            Decimal::from(100),
            Decimal::from(160),
            produced_at(3),
        )
        .with_remaining_quantity(Decimal::from(120));

        assert!(matches!(lot.validate(), Err(CostError::InvalidCostInput(_))));
    }
}
