//! 混油來源模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lot::InventoryLot;

/// 混油來源（一個來源批次對混油的貢獻）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendComponent {
    /// 來源批次ID
    pub source_lot_id: String,

    /// 佔混油比例（0–100）
    pub percentage_of_blend: Decimal,

    /// 來源單位成本
    pub source_unit_cost: Decimal,

    /// 實際油種
    pub actual_oil_type: String,

    /// 來源可用數量（提供時會檢查是否足夠）
    pub available_quantity: Option<Decimal>,
}

impl BlendComponent {
    pub fn new(
        source_lot_id: String,
        percentage_of_blend: Decimal,
        source_unit_cost: Decimal,
        actual_oil_type: String,
    ) -> Self {
        Self {
            source_lot_id,
            percentage_of_blend,
            source_unit_cost,
            actual_oil_type,
            available_quantity: None,
        }
    }

    /// 由庫存批次建立來源（帶入成本、油種與剩餘數量）
    pub fn from_lot(lot: &InventoryLot, percentage_of_blend: Decimal) -> Self {
        Self {
            source_lot_id: lot.lot_id.clone(),
            percentage_of_blend,
            source_unit_cost: lot.unit_cost,
            actual_oil_type: lot.oil_type.clone().unwrap_or_default(),
            available_quantity: Some(lot.remaining_quantity),
        }
    }

    /// 建構器模式：設置來源可用數量
    pub fn with_available_quantity(mut self, quantity: Decimal) -> Self {
        self.available_quantity = Some(quantity);
        self
    }
}
