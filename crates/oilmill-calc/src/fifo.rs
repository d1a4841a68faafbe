//! 先進先出庫存分配

use oilmill_core::{ensure_non_negative, CostError, InventoryLot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{CostWarning, WarningKind};

/// 單一批次的分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotAllocation {
    pub lot_id: String,
    pub allocated_quantity: Decimal,
    /// 批次生產時的估算單位成本
    pub unit_cost: Decimal,
    pub source_batch_code: Option<String>,
    pub traceable_code: Option<String>,
}

/// 分配結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FifoAllocation {
    pub requested: Decimal,
    pub allocations: Vec<LotAllocation>,
    pub allocated_total: Decimal,
    /// 不足數量 = 需求 − 已分配
    pub shortage: Decimal,
    pub warnings: Vec<CostWarning>,
}

impl FifoAllocation {
    pub fn is_fully_allocated(&self) -> bool {
        self.shortage.is_zero()
    }

    /// 呼叫端不接受部分分配時，將不足轉為錯誤
    pub fn ensure_fulfilled(&self) -> oilmill_core::Result<()> {
        if self.is_fully_allocated() {
            Ok(())
        } else {
            Err(CostError::InsufficientInventory {
                requested: self.requested,
                available: self.allocated_total,
            })
        }
    }
}

/// 先進先出分配器
pub struct FifoAllocator;

impl FifoAllocator {
    /// 依批次順序（呼叫端已排為最舊優先）分配需求數量
    ///
    /// 不修改批次；不足時回傳 `shortage > 0` 並附警告，不視為錯誤
    pub fn allocate(
        lots: &[InventoryLot],
        quantity_requested: Decimal,
    ) -> oilmill_core::Result<FifoAllocation> {
        ensure_non_negative("需求數量", quantity_requested)?;

        let mut remaining = quantity_requested;
        let mut allocations = Vec::new();

        for lot in lots {
            if remaining <= Decimal::ZERO {
                break;
            }
            lot.validate()?;
            if lot.is_depleted() {
                continue;
            }

            let allocated = remaining.min(lot.remaining_quantity);
            tracing::debug!("FIFO 分配: {} ← {}", lot.lot_id, allocated);

            allocations.push(LotAllocation {
                lot_id: lot.lot_id.clone(),
                allocated_quantity: allocated,
                unit_cost: lot.unit_cost,
                source_batch_code: lot.source_batch_code.clone(),
                traceable_code: lot.traceable_code.clone(),
            });
            remaining -= allocated;
        }

        let allocated_total: Decimal = allocations.iter().map(|a| a.allocated_quantity).sum();
        let shortage = quantity_requested - allocated_total;

        let mut warnings = Vec::new();
        if shortage > Decimal::ZERO {
            tracing::warn!(
                "FIFO 庫存不足：需要 {}，僅分配 {}",
                quantity_requested,
                allocated_total
            );
            warnings.push(CostWarning::warning(
                "FIFO",
                WarningKind::InventoryShortage,
                format!("需要 {}，可分配 {}，不足 {}", quantity_requested, allocated_total, shortage),
            ));
        }

        Ok(FifoAllocation {
            requested: quantity_requested,
            allocations,
            allocated_total,
            shortage,
            warnings,
        })
    }

    /// 依生產時間排序（最舊優先），同時間以批次ID排序
    pub fn sort_oldest_first(lots: &mut [InventoryLot]) {
        lots.sort_by(|a, b| {
            a.produced_at
                .cmp(&b.produced_at)
                .then_with(|| a.lot_id.cmp(&b.lot_id))
        });
    }

    /// 確認銷售後套用分配，回傳扣減後的批次副本
    ///
    /// 供持久層在交易內使用；快照已過期（剩餘不足）或批次ID重複時回報錯誤
    pub fn commit(
        lots: &[InventoryLot],
        allocation: &FifoAllocation,
    ) -> oilmill_core::Result<Vec<InventoryLot>> {
        let mut updated = lots.to_vec();
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(lots.len());
        for (i, lot) in lots.iter().enumerate() {
            if index.insert(lot.lot_id.as_str(), i).is_some() {
                return Err(CostError::InvalidCostInput(format!(
                    "庫存批次ID重複: {}",
                    lot.lot_id
                )));
            }
        }

        for entry in &allocation.allocations {
            let i = *index
                .get(entry.lot_id.as_str())
                .ok_or_else(|| CostError::LotNotFound(entry.lot_id.clone()))?;
            updated[i].consume(entry.allocated_quantity)?;
        }

        Ok(updated)
    }
}
