//! 副產品銷售對帳
//!
//! 銷售實際單價與批次生產時估算單價的差額，回溯修正來源批次的淨油成本。
//! 調整方向固定為「銷售 → 批次」，批次成本不會反向影響銷售結果。

use oilmill_core::{checked_add, checked_div, checked_mul, checked_sum, ensure_non_negative, CostError};
use rayon::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::BatchCostResult;
use crate::calculator::{CostCalculation, CostLine};
use crate::fifo::FifoAllocation;
use crate::{CostWarning, WarningKind};

/// 銷售對帳輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleInput {
    /// 銷售單號
    pub sale_code: String,

    /// FIFO 分配結果（每批的估算單價取自分配時的單位成本）
    pub allocation: FifoAllocation,

    /// 實際銷售單價
    pub sale_rate: Decimal,

    pub quantity_sold: Decimal,

    /// 銷售附加成本（包裝、運輸等）
    pub additional_costs: CostCalculation,
}

impl SaleInput {
    pub fn new(sale_code: &str, allocation: FifoAllocation, sale_rate: Decimal) -> Self {
        let quantity_sold = allocation.allocated_total;
        Self {
            sale_code: sale_code.to_string(),
            allocation,
            sale_rate,
            quantity_sold,
            additional_costs: CostCalculation::empty(),
        }
    }

    /// 建構器模式：設置附加成本
    pub fn with_additional_costs(mut self, costs: CostCalculation) -> Self {
        self.additional_costs = costs;
        self
    }
}

/// 單一批次的對帳調整
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotCostAdjustment {
    pub lot_id: String,
    pub source_batch_code: Option<String>,
    pub allocated_quantity: Decimal,
    pub estimated_rate: Decimal,
    pub sale_rate: Decimal,
    /// （估算單價 − 銷售單價）× 數量；正數表示淨油成本增加
    pub rate_adjustment: Decimal,
    /// 依數量比例分攤的附加成本
    pub additional_cost_share: Decimal,
    pub total_adjustment: Decimal,
}

/// 銷售對帳結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleCostResult {
    pub id: Uuid,
    pub sale_code: String,
    pub quantity_sold: Decimal,
    pub sale_rate: Decimal,
    pub lot_adjustments: Vec<LotCostAdjustment>,
    pub additional_cost_lines: Vec<CostLine>,
    pub additional_costs_total: Decimal,
    pub gross_revenue: Decimal,
    /// 銷售收入 − 附加成本
    pub net_revenue: Decimal,
    /// Σ 批次單價調整 + 附加成本
    pub total_adjustment: Decimal,
    pub warnings: Vec<CostWarning>,
}

impl SaleCostResult {
    /// 指定生產批次應回溯的調整總額
    pub fn adjustment_for_batch(&self, batch_code: &str) -> Decimal {
        self.lot_adjustments
            .iter()
            .filter(|a| a.source_batch_code.as_deref() == Some(batch_code))
            .map(|a| a.total_adjustment)
            .sum()
    }

    /// 將調整回溯到各來源批次，回傳修正後的批次成本（未涉及的批次原樣返回）
    pub fn apply_to_batches(
        &self,
        batches: &[BatchCostResult],
    ) -> oilmill_core::Result<Vec<BatchCostResult>> {
        batches
            .iter()
            .map(|batch| {
                let adjustment = self.adjustment_for_batch(&batch.batch_code);
                if adjustment.is_zero() {
                    Ok(batch.clone())
                } else {
                    batch.with_reconciliation(adjustment)
                }
            })
            .collect()
    }
}

/// 銷售對帳引擎
pub struct SalesReconciliationEngine;

impl SalesReconciliationEngine {
    /// 計算銷售對帳調整
    pub fn reconcile(input: &SaleInput) -> oilmill_core::Result<SaleCostResult> {
        ensure_non_negative("銷售單價", input.sale_rate)?;
        ensure_non_negative("銷售數量", input.quantity_sold)?;
        ensure_non_negative("附加成本", input.additional_costs.total)?;

        let allocation = &input.allocation;
        if input.quantity_sold != allocation.allocated_total {
            return Err(CostError::InvalidCostInput(format!(
                "{} 銷售數量 {} 與分配數量 {} 不一致",
                input.sale_code, input.quantity_sold, allocation.allocated_total
            )));
        }

        tracing::debug!(
            "開始銷售對帳 {}：{} 個批次，數量 {}，單價 {}",
            input.sale_code,
            allocation.allocations.len(),
            input.quantity_sold,
            input.sale_rate
        );

        let additional_costs_total = input.additional_costs.total;
        let shares = Self::pro_rata_shares(allocation, additional_costs_total)?;

        let mut lot_adjustments = Vec::with_capacity(allocation.allocations.len());
        for (entry, share) in allocation.allocations.iter().zip(shares) {
            let rate_adjustment = checked_mul(
                &format!("{} 單價調整", entry.lot_id),
                entry.unit_cost - input.sale_rate,
                entry.allocated_quantity,
            )?;
            lot_adjustments.push(LotCostAdjustment {
                lot_id: entry.lot_id.clone(),
                source_batch_code: entry.source_batch_code.clone(),
                allocated_quantity: entry.allocated_quantity,
                estimated_rate: entry.unit_cost,
                sale_rate: input.sale_rate,
                rate_adjustment,
                additional_cost_share: share,
                total_adjustment: checked_add(
                    &format!("{} 調整合計", entry.lot_id),
                    rate_adjustment,
                    share,
                )?,
            });
        }

        let rate_adjustments =
            checked_sum("單價調整", lot_adjustments.iter().map(|a| a.rate_adjustment))?;
        let total_adjustment = checked_add("回溯調整", rate_adjustments, additional_costs_total)?;
        let gross_revenue = checked_mul("銷售收入", input.sale_rate, input.quantity_sold)?;
        let net_revenue = gross_revenue - additional_costs_total;

        let mut warnings = Vec::new();
        if allocation.shortage > Decimal::ZERO {
            warnings.push(CostWarning::warning(
                &input.sale_code,
                WarningKind::InventoryShortage,
                format!("部分出貨：不足 {}", allocation.shortage),
            ));
        }

        tracing::info!(
            "銷售 {} 對帳完成：淨收入 {}，回溯調整 {}",
            input.sale_code,
            net_revenue,
            total_adjustment
        );

        Ok(SaleCostResult {
            id: Uuid::new_v4(),
            sale_code: input.sale_code.clone(),
            quantity_sold: input.quantity_sold,
            sale_rate: input.sale_rate,
            lot_adjustments,
            additional_cost_lines: input.additional_costs.applied_lines().cloned().collect(),
            additional_costs_total,
            gross_revenue,
            net_revenue,
            total_adjustment,
            warnings,
        })
    }

    /// 平行對帳多筆互不相關的銷售，結果順序與輸入一致
    pub fn reconcile_all(inputs: &[SaleInput]) -> Vec<oilmill_core::Result<SaleCostResult>> {
        inputs.par_iter().map(Self::reconcile).collect()
    }

    /// 附加成本依分配數量比例分攤（無條件捨去至小數兩位），最後一批吸收尾差
    ///
    /// 前面各批只捨不入，尾差因此不會為負
    fn pro_rata_shares(
        allocation: &FifoAllocation,
        total: Decimal,
    ) -> oilmill_core::Result<Vec<Decimal>> {
        let count = allocation.allocations.len();
        if count == 0 || allocation.allocated_total.is_zero() {
            return Ok(vec![Decimal::ZERO; count]);
        }

        let mut shares = Vec::with_capacity(count);
        let mut assigned = Decimal::ZERO;
        for (i, entry) in allocation.allocations.iter().enumerate() {
            let share = if i + 1 == count {
                total - assigned
            } else {
                checked_div(
                    "附加成本分攤",
                    checked_mul("附加成本分攤", total, entry.allocated_quantity)?,
                    allocation.allocated_total,
                )?
                .round_dp_with_strategy(2, RoundingStrategy::ToZero)
            };
            assigned += share;
            shares.push(share);
        }
        Ok(shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::FifoAllocator;
    use chrono::NaiveDate;
    use oilmill_core::InventoryLot;

    fn cake_lot(id: &str, batch: &str, remaining: i64, estimated_rate: i64, d: u32) -> InventoryLot {
        InventoryLot::new(
            id.to_string(),
            Decimal::from(remaining),
            Decimal::from(estimated_rate),
            NaiveDate::from_ymd_opt(2025, 8, d)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
        )
        .with_source_batch_code(batch)
    }

    fn additional(total: i64) -> CostCalculation {
        CostCalculation {
            lines: Vec::new(),
            total: Decimal::from(total),
        }
    }

    #[test]
    fn test_sold_below_estimate_increases_oil_cost() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 50, 20, 1)];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(50)).unwrap();

        let result =
            SalesReconciliationEngine::reconcile(&SaleInput::new("S-1", allocation, Decimal::from(15)))
                .unwrap();

        assert_eq!(result.lot_adjustments[0].rate_adjustment, Decimal::from(250));
        assert_eq!(result.total_adjustment, Decimal::from(250));
        assert_eq!(result.gross_revenue, Decimal::from(750));
        assert_eq!(result.net_revenue, Decimal::from(750));
        assert_eq!(result.adjustment_for_batch("B-1"), Decimal::from(250));
    }

    #[test]
    fn test_sold_above_estimate_decreases_oil_cost() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 100, 20, 1)];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(40)).unwrap();

        let result =
            SalesReconciliationEngine::reconcile(&SaleInput::new("S-2", allocation, Decimal::from(24)))
                .unwrap();

        assert_eq!(result.total_adjustment, Decimal::from(-160));
    }

    #[test]
    fn test_additional_costs_split_pro_rata() {
        let lots = vec![
            cake_lot("CAKE-1", "B-1", 30, 20, 1),
            cake_lot("CAKE-2", "B-2", 100, 22, 2),
        ];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(90)).unwrap();
        let input = SaleInput::new("S-3", allocation, Decimal::from(18))
            .with_additional_costs(additional(100));

        let result = SalesReconciliationEngine::reconcile(&input).unwrap();

        let first = &result.lot_adjustments[0];
        let second = &result.lot_adjustments[1];
        assert_eq!(first.rate_adjustment, Decimal::from(60)); // (20-18) × 30
        assert_eq!(second.rate_adjustment, Decimal::from(240)); // (22-18) × 60
        assert_eq!(
            first.additional_cost_share + second.additional_cost_share,
            Decimal::from(100)
        );
        assert_eq!(first.additional_cost_share, Decimal::new(3333, 2));
        assert_eq!(second.additional_cost_share, Decimal::new(6667, 2));

        assert_eq!(result.additional_costs_total, Decimal::from(100));
        assert_eq!(result.total_adjustment, Decimal::from(400));
        assert_eq!(result.net_revenue, Decimal::from(1520)); // 18 × 90 − 100
        assert_eq!(
            result.adjustment_for_batch("B-1") + result.adjustment_for_batch("B-2"),
            result.total_adjustment
        );
    }

    #[test]
    fn test_small_additional_cost_never_goes_negative() {
        let lots = vec![
            cake_lot("CAKE-1", "B-1", 3, 20, 1),
            cake_lot("CAKE-2", "B-2", 3, 20, 2),
            cake_lot("CAKE-3", "B-3", 3, 20, 3),
            cake_lot("CAKE-4", "B-4", 1, 20, 4),
        ];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(10)).unwrap();
        let mut costs = additional(0);
        costs.total = Decimal::new(2, 2);
        let input = SaleInput::new("S-3A", allocation, Decimal::from(20)).with_additional_costs(costs);

        let result = SalesReconciliationEngine::reconcile(&input).unwrap();

        let shares: Vec<Decimal> = result
            .lot_adjustments
            .iter()
            .map(|a| a.additional_cost_share)
            .collect();
        // 0.02 × 3/10 = 0.006 → 0.00，尾差全由最後一批吸收
        assert_eq!(
            shares,
            vec![Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::new(2, 2)]
        );
        assert!(shares.iter().all(|s| *s >= Decimal::ZERO));
        assert_eq!(shares.iter().copied().sum::<Decimal>(), Decimal::new(2, 2));
        assert_eq!(result.total_adjustment, Decimal::new(2, 2));
    }

    #[test]
    fn test_overflowing_sale_is_error() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 50, 20, 1)];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(50)).unwrap();

        assert!(matches!(
            SalesReconciliationEngine::reconcile(&SaleInput::new("S-3B", allocation, Decimal::MAX)),
            Err(CostError::ArithmeticOverflow(_))
        ));
    }

    #[test]
    fn test_quantity_must_match_allocation() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 50, 20, 1)];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(50)).unwrap();
        let mut input = SaleInput::new("S-4", allocation, Decimal::from(15));
        input.quantity_sold = Decimal::from(60);

        assert!(matches!(
            SalesReconciliationEngine::reconcile(&input),
            Err(CostError::InvalidCostInput(_))
        ));
    }

    #[test]
    fn test_partial_fill_carries_warning() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 30, 20, 1)];
        let allocation = FifoAllocator::allocate(&lots, Decimal::from(50)).unwrap();

        let result =
            SalesReconciliationEngine::reconcile(&SaleInput::new("S-5", allocation, Decimal::from(20)))
                .unwrap();

        assert_eq!(result.quantity_sold, Decimal::from(30));
        assert_eq!(result.warnings[0].kind, WarningKind::InventoryShortage);
        assert_eq!(result.total_adjustment, Decimal::ZERO);
    }

    #[test]
    fn test_reconcile_all() {
        let lots = vec![cake_lot("CAKE-1", "B-1", 100, 20, 1)];
        let inputs = vec![
            SaleInput::new(
                "S-6",
                FifoAllocator::allocate(&lots, Decimal::from(10)).unwrap(),
                Decimal::from(10),
            ),
            SaleInput::new(
                "S-7",
                FifoAllocator::allocate(&lots, Decimal::from(20)).unwrap(),
                Decimal::from(-1),
            ),
        ];

        let results = SalesReconciliationEngine::reconcile_all(&inputs);

        assert_eq!(results[0].as_ref().unwrap().total_adjustment, Decimal::from(100));
        assert!(results[1].is_err());
    }
}
