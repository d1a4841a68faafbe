//! 生產批次成本計算

use oilmill_core::{
    checked_add, checked_div, checked_mul, checked_sum, ensure_non_negative, Activity,
    CostingConfig, InventoryLot,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::calculator::{CostCalculation, CostLine};
use crate::{CostWarning, WarningKind};

/// 種子耗用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConsumption {
    /// 種子批次ID
    pub lot_id: String,
    /// 乾燥前數量
    pub quantity_before_drying: Decimal,
    /// 單位成本
    pub unit_cost: Decimal,
}

/// 單一生產階段的延伸成本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCost {
    pub activity: Activity,
    pub calculation: CostCalculation,
}

/// 批次成本計算輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCostInput {
    /// 生產批號
    pub batch_code: String,

    pub seed: SeedConsumption,

    /// 乾燥後質量
    pub mass_after: Decimal,

    /// 出油量
    pub oil_yield: Decimal,

    /// 油餅產量與預估單價
    pub cake_yield: Decimal,
    pub cake_rate: Decimal,

    /// 油渣產量與預估單價
    pub sludge_yield: Decimal,
    pub sludge_rate: Decimal,

    /// 基本成本（非階段要素）
    pub basic_costs: CostCalculation,

    /// 延伸成本（各生產階段）
    pub extended_costs: Vec<StageCost>,
}

impl BatchCostInput {
    /// 創建批次輸入（無乾燥損耗、無副產品）
    pub fn new(batch_code: &str, seed: SeedConsumption, oil_yield: Decimal) -> Self {
        let mass_after = seed.quantity_before_drying;
        Self {
            batch_code: batch_code.to_string(),
            seed,
            mass_after,
            oil_yield,
            cake_yield: Decimal::ZERO,
            cake_rate: Decimal::ZERO,
            sludge_yield: Decimal::ZERO,
            sludge_rate: Decimal::ZERO,
            basic_costs: CostCalculation::empty(),
            extended_costs: Vec::new(),
        }
    }

    /// 建構器模式：設置乾燥後質量
    pub fn with_mass_after(mut self, mass_after: Decimal) -> Self {
        self.mass_after = mass_after;
        self
    }

    /// 建構器模式：設置油餅產量與單價
    pub fn with_cake(mut self, yield_qty: Decimal, rate: Decimal) -> Self {
        self.cake_yield = yield_qty;
        self.cake_rate = rate;
        self
    }

    /// 建構器模式：設置油渣產量與單價
    pub fn with_sludge(mut self, yield_qty: Decimal, rate: Decimal) -> Self {
        self.sludge_yield = yield_qty;
        self.sludge_rate = rate;
        self
    }

    /// 建構器模式：設置基本成本
    pub fn with_basic_costs(mut self, calculation: CostCalculation) -> Self {
        self.basic_costs = calculation;
        self
    }

    /// 建構器模式：加入一個階段的延伸成本
    pub fn with_stage_cost(mut self, activity: Activity, calculation: CostCalculation) -> Self {
        self.extended_costs.push(StageCost {
            activity,
            calculation,
        });
        self
    }

    /// 乾燥前質量
    pub fn mass_before(&self) -> Decimal {
        self.seed.quantity_before_drying
    }

    fn validate(&self) -> oilmill_core::Result<()> {
        ensure_non_negative("種子數量", self.seed.quantity_before_drying)?;
        ensure_non_negative("種子單位成本", self.seed.unit_cost)?;
        ensure_non_negative("乾燥後質量", self.mass_after)?;
        ensure_non_negative("出油量", self.oil_yield)?;
        ensure_non_negative("油餅產量", self.cake_yield)?;
        ensure_non_negative("油餅單價", self.cake_rate)?;
        ensure_non_negative("油渣產量", self.sludge_yield)?;
        ensure_non_negative("油渣單價", self.sludge_rate)?;
        Ok(())
    }
}

/// 副產品收入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByproductRevenue {
    pub cake_revenue: Decimal,
    pub sludge_revenue: Decimal,
    pub total: Decimal,
}

/// 收率診斷（僅供參考，不阻擋）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldDiagnostics {
    /// 乾燥損耗 = 乾燥前 − 乾燥後
    pub drying_loss: Decimal,
    /// 乾燥損耗佔乾燥前百分比
    pub drying_loss_percent: Decimal,
    /// 以下皆相對於乾燥後質量
    pub oil_yield_percent: Decimal,
    pub cake_yield_percent: Decimal,
    pub sludge_yield_percent: Decimal,
    pub total_yield_percent: Decimal,
}

/// 批次成本結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCostResult {
    pub id: Uuid,
    pub batch_code: String,
    pub seed_lot_id: String,

    /// 種子成本
    pub seed_cost: Decimal,

    /// 基本成本明細（已套用）
    pub basic_lines: Vec<CostLine>,

    /// 基本成本合計（含種子成本）
    pub basic_total: Decimal,

    /// 延伸成本明細（已套用、依要素ID去重）
    pub extended_lines: Vec<CostLine>,

    pub extended_total: Decimal,

    /// 總生產成本
    pub total_production_cost: Decimal,

    pub byproduct_revenue: ByproductRevenue,

    /// 淨油成本（含銷售對帳調整）
    pub net_oil_cost: Decimal,

    pub oil_yield: Decimal,

    /// 每公斤油成本（出油量為 0 時為 0 並附警告）
    pub cost_per_kg_oil: Decimal,

    /// 累計的銷售對帳調整
    pub reconciliation_adjustment: Decimal,

    pub diagnostics: YieldDiagnostics,

    pub warnings: Vec<CostWarning>,
}

impl BatchCostResult {
    /// 套用銷售對帳調整，回傳修正後的新結果
    ///
    /// 正數增加淨油成本，負數減少
    pub fn with_reconciliation(&self, adjustment: Decimal) -> oilmill_core::Result<Self> {
        let mut corrected = self.clone();
        corrected.reconciliation_adjustment =
            checked_add("累計對帳調整", self.reconciliation_adjustment, adjustment)?;
        corrected.net_oil_cost = checked_add("淨油成本", self.net_oil_cost, adjustment)?;
        corrected.cost_per_kg_oil = per_kg(corrected.net_oil_cost, corrected.oil_yield)?;

        tracing::info!(
            "批次 {} 套用對帳調整 {}：淨油成本 {} → {}",
            self.batch_code,
            adjustment,
            self.net_oil_cost,
            corrected.net_oil_cost
        );

        Ok(corrected)
    }

    /// 以本批次目前的每公斤油成本更新其油品庫存批次的單位成本
    ///
    /// 非本批次產出的庫存批次原樣返回
    pub fn apply_to_lot(&self, lot: &InventoryLot) -> InventoryLot {
        if lot.source_batch_code.as_deref() != Some(self.batch_code.as_str()) {
            return lot.clone();
        }
        lot.clone().with_unit_cost(self.cost_per_kg_oil)
    }
}

fn per_kg(net_oil_cost: Decimal, oil_yield: Decimal) -> oilmill_core::Result<Decimal> {
    if oil_yield.is_zero() {
        Ok(Decimal::ZERO)
    } else {
        checked_div("每公斤油成本", net_oil_cost, oil_yield)
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> oilmill_core::Result<Decimal> {
    if whole.is_zero() {
        Ok(Decimal::ZERO)
    } else {
        checked_mul("收率", checked_div("收率", part, whole)?, Decimal::from(100))
    }
}

/// 收集已套用且未出現過的明細行
fn collect_unique<'a, I>(lines: I, seen: &mut HashSet<String>) -> Vec<CostLine>
where
    I: IntoIterator<Item = &'a CostLine>,
{
    lines
        .into_iter()
        .filter(|l| l.is_applied)
        .filter(|l| seen.insert(l.element_id.clone()))
        .cloned()
        .collect()
}

/// 批次成本計算引擎
pub struct BatchCostEngine;

impl BatchCostEngine {
    /// 計算批次成本
    pub fn compute(
        input: &BatchCostInput,
        config: &CostingConfig,
    ) -> oilmill_core::Result<BatchCostResult> {
        input.validate()?;
        config.validate()?;

        tracing::debug!("開始計算批次成本: {}", input.batch_code);

        // Step 1-2: 種子成本 + 基本成本
        let seed_cost = checked_mul(
            "種子成本",
            input.seed.quantity_before_drying,
            input.seed.unit_cost,
        )?;
        let mut seen = HashSet::new();
        let basic_lines = collect_unique(&input.basic_costs.lines, &mut seen);
        let basic_total = checked_sum(
            "基本成本",
            std::iter::once(seed_cost).chain(basic_lines.iter().map(|l| l.total)),
        )?;

        // Step 3: 延伸成本（已出現的要素不重複計入）
        let extended_lines = collect_unique(
            input.extended_costs.iter().flat_map(|s| s.calculation.lines.iter()),
            &mut seen,
        );
        let extended_total = checked_sum("延伸成本", extended_lines.iter().map(|l| l.total))?;
        tracing::debug!(
            "延伸成本 {} 項（{} 個階段），合計 {}",
            extended_lines.len(),
            input.extended_costs.len(),
            extended_total
        );

        // Step 4-6: 總成本、副產品收入、淨油成本
        let total_production_cost = checked_add("總生產成本", basic_total, extended_total)?;
        let cake_revenue = checked_mul("油餅收入", input.cake_yield, input.cake_rate)?;
        let sludge_revenue = checked_mul("油渣收入", input.sludge_yield, input.sludge_rate)?;
        let byproduct_revenue = ByproductRevenue {
            cake_revenue,
            sludge_revenue,
            total: checked_add("副產品收入", cake_revenue, sludge_revenue)?,
        };
        let net_oil_cost = total_production_cost - byproduct_revenue.total;

        // Step 7: 每公斤油成本
        let mut warnings = Vec::new();
        if input.oil_yield.is_zero() {
            tracing::warn!("批次 {} 出油量為 0，每公斤成本記為 0", input.batch_code);
            warnings.push(CostWarning::warning(
                &input.batch_code,
                WarningKind::ZeroOilYield,
                "出油量為 0，無法計算每公斤油成本".to_string(),
            ));
        }
        let cost_per_kg_oil = per_kg(net_oil_cost, input.oil_yield)?;

        let diagnostics = Self::diagnose(input)?;
        warnings.extend(Self::yield_warnings(&input.batch_code, &diagnostics, config));

        let result = BatchCostResult {
            id: Uuid::new_v4(),
            batch_code: input.batch_code.clone(),
            seed_lot_id: input.seed.lot_id.clone(),
            seed_cost,
            basic_lines,
            basic_total,
            extended_lines,
            extended_total,
            total_production_cost,
            byproduct_revenue,
            net_oil_cost,
            oil_yield: input.oil_yield,
            cost_per_kg_oil,
            reconciliation_adjustment: Decimal::ZERO,
            diagnostics,
            warnings,
        };

        tracing::info!(
            "批次 {} 成本完成：總成本 {}，淨油成本 {}，每公斤 {}",
            result.batch_code,
            result.total_production_cost,
            result.net_oil_cost,
            result.cost_per_kg_oil
        );

        Ok(result)
    }

    /// 平行計算多個互不相關的批次，結果順序與輸入一致
    pub fn compute_all(
        inputs: &[BatchCostInput],
        config: &CostingConfig,
    ) -> Vec<oilmill_core::Result<BatchCostResult>> {
        inputs
            .par_iter()
            .map(|input| Self::compute(input, config))
            .collect()
    }

    /// 乾燥損耗與收率
    fn diagnose(input: &BatchCostInput) -> oilmill_core::Result<YieldDiagnostics> {
        let mass_before = input.mass_before();
        let drying_loss = mass_before - input.mass_after;
        let total_output = checked_sum(
            "總產出",
            [input.oil_yield, input.cake_yield, input.sludge_yield],
        )?;

        Ok(YieldDiagnostics {
            drying_loss,
            drying_loss_percent: percent_of(drying_loss, mass_before)?,
            oil_yield_percent: percent_of(input.oil_yield, input.mass_after)?,
            cake_yield_percent: percent_of(input.cake_yield, input.mass_after)?,
            sludge_yield_percent: percent_of(input.sludge_yield, input.mass_after)?,
            total_yield_percent: percent_of(total_output, input.mass_after)?,
        })
    }

    /// 總收率門檻檢查
    fn yield_warnings(
        batch_code: &str,
        diagnostics: &YieldDiagnostics,
        config: &CostingConfig,
    ) -> Vec<CostWarning> {
        let total = diagnostics.total_yield_percent;
        let mut warnings = Vec::new();

        if total > config.high_yield_warning_percent {
            tracing::warn!("批次 {} 總收率 {}% 異常偏高", batch_code, total);
            warnings.push(CostWarning::warning(
                batch_code,
                WarningKind::HighTotalYield,
                format!("總收率 {}% 異常偏高，請核對產量", total.round_dp(2)),
            ));
        } else if total > config.processing_addition_percent {
            warnings.push(CostWarning::info(
                batch_code,
                WarningKind::ProcessingAdditions,
                format!("總收率 {}% 含加工添加物", total.round_dp(2)),
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{CostCalculator, CostContext};
    use crate::has_warning;
    use oilmill_core::{CalculationMethod, CostElement};
    use rstest::rstest;
    use std::collections::HashMap;

    fn seed(quantity: i64, unit_cost: i64) -> SeedConsumption {
        SeedConsumption {
            lot_id: "SEED-01".to_string(),
            quantity_before_drying: Decimal::from(quantity),
            unit_cost: Decimal::from(unit_cost),
        }
    }

    fn stage(id: &str, activity: Activity, rate: i64, mass: i64) -> CostCalculation {
        let element = CostElement::new(
            id.to_string(),
            id.to_string(),
            CalculationMethod::PerKg,
            Decimal::from(rate),
        )
        .with_activity(activity);
        CostCalculator::compute(
            &[element],
            &HashMap::new(),
            &CostContext::new(Decimal::from(mass)),
        )
        .unwrap()
    }

    #[test]
    fn test_batch_cost_with_byproducts() {
        let input = BatchCostInput::new("B-100", seed(1000, 50), Decimal::from(300))
            .with_stage_cost(Activity::Crushing, stage("crush", Activity::Crushing, 2, 1000))
            .with_cake(Decimal::from(200), Decimal::from(20));

        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();

        assert_eq!(result.seed_cost, Decimal::from(50000));
        assert_eq!(result.basic_total, Decimal::from(50000));
        assert_eq!(result.extended_total, Decimal::from(2000));
        assert_eq!(result.total_production_cost, Decimal::from(52000));
        assert_eq!(result.byproduct_revenue.total, Decimal::from(4000));
        assert_eq!(result.net_oil_cost, Decimal::from(48000));
        assert_eq!(result.cost_per_kg_oil, Decimal::from(160));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_elements_across_stages_counted_once() {
        let input = BatchCostInput::new("B-101", seed(1000, 10), Decimal::from(300))
            .with_basic_costs(stage("common-labour", Activity::General, 1, 1000))
            .with_stage_cost(Activity::Drying, stage("loader", Activity::Drying, 1, 1000))
            .with_stage_cost(Activity::Crushing, stage("loader", Activity::Crushing, 1, 900))
            .with_stage_cost(Activity::Crushing, stage("common-labour", Activity::Crushing, 1, 900))
            .with_stage_cost(Activity::Filtering, stage("press", Activity::Filtering, 1, 300));

        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();

        let ids: Vec<_> = result
            .extended_lines
            .iter()
            .map(|l| l.element_id.as_str())
            .collect();
        assert_eq!(ids, vec!["loader", "press"]);
        // 第一次出現的 loader (1000) + press (300)
        assert_eq!(result.extended_total, Decimal::from(1300));
        assert_eq!(result.basic_total, Decimal::from(11000));
    }

    #[test]
    fn test_zero_oil_yield_is_warning_not_error() {
        let input = BatchCostInput::new("B-102", seed(100, 50), Decimal::ZERO);

        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();

        assert_eq!(result.cost_per_kg_oil, Decimal::ZERO);
        assert_eq!(result.net_oil_cost, Decimal::from(5000));
        assert!(has_warning(&result.warnings, WarningKind::ZeroOilYield));
    }

    #[test]
    fn test_drying_diagnostics() {
        let input = BatchCostInput::new("B-103", seed(1000, 40), Decimal::from(360))
            .with_mass_after(Decimal::from(900))
            .with_cake(Decimal::from(450), Decimal::from(22))
            .with_sludge(Decimal::from(45), Decimal::from(8));

        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();
        let d = result.diagnostics;

        assert_eq!(d.drying_loss, Decimal::from(100));
        assert_eq!(d.drying_loss_percent, Decimal::from(10));
        assert_eq!(d.oil_yield_percent, Decimal::from(40));
        assert_eq!(d.cake_yield_percent, Decimal::from(50));
        assert_eq!(d.sludge_yield_percent, Decimal::from(5));
        assert_eq!(d.total_yield_percent, Decimal::from(95));
        assert_eq!(result.byproduct_revenue.sludge_revenue, Decimal::from(360));
        assert!(result.warnings.is_empty());
    }

    #[rstest]
    #[case(500, 420, 40, None)]
    #[case(500, 500, 0, None)]
    #[case(500, 500, 30, Some(WarningKind::ProcessingAdditions))]
    #[case(500, 560, 0, Some(WarningKind::ProcessingAdditions))]
    #[case(500, 600, 0, Some(WarningKind::ProcessingAdditions))]
    #[case(500, 600, 10, Some(WarningKind::HighTotalYield))]
    fn test_total_yield_thresholds(
        #[case] oil: i64,
        #[case] cake: i64,
        #[case] sludge: i64,
        #[case] expected: Option<WarningKind>,
    ) {
        // 乾燥後 1000 kg
        let input = BatchCostInput::new("B-104", seed(1000, 30), Decimal::from(oil))
            .with_cake(Decimal::from(cake), Decimal::from(10))
            .with_sludge(Decimal::from(sludge), Decimal::from(5));

        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();
        let kinds: Vec<_> = result.warnings.iter().map(|w| w.kind).collect();

        match expected {
            Some(kind) => assert_eq!(kinds, vec![kind]),
            None => assert!(kinds.is_empty()),
        }
    }

    #[test]
    fn test_negative_mass_rejected() {
        let input = BatchCostInput::new("B-105", seed(1000, 30), Decimal::from(300))
            .with_mass_after(Decimal::from(-1));

        assert!(BatchCostEngine::compute(&input, &CostingConfig::default()).is_err());
    }

    #[test]
    fn test_reconciliation_feedback() {
        let input = BatchCostInput::new("B-106", seed(1000, 50), Decimal::from(300))
            .with_cake(Decimal::from(200), Decimal::from(20));
        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();
        assert_eq!(result.net_oil_cost, Decimal::from(46000));

        let corrected = result.with_reconciliation(Decimal::from(300)).unwrap();
        assert_eq!(corrected.net_oil_cost, Decimal::from(46300));
        assert_eq!(corrected.reconciliation_adjustment, Decimal::from(300));
        // 46300 / 300 = 154.33...
        assert_eq!(corrected.cost_per_kg_oil.round_dp(2), Decimal::new(15433, 2));
        assert_eq!(corrected.total_production_cost, result.total_production_cost);

        // 原結果不變
        assert_eq!(result.net_oil_cost, Decimal::from(46000));
    }

    #[test]
    fn test_corrected_cost_flows_into_oil_lot() {
        let input = BatchCostInput::new("B-107", seed(1000, 50), Decimal::from(300))
            .with_cake(Decimal::from(200), Decimal::from(20));
        let result = BatchCostEngine::compute(&input, &CostingConfig::default()).unwrap();
        let produced_at = chrono::NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap();
        let oil = InventoryLot::new(
            "OIL-107".to_string(),
            Decimal::from(300),
            result.cost_per_kg_oil,
            produced_at,
        )
        .with_source_batch_code("B-107")
        .with_remaining_quantity(Decimal::from(120));
        let other = oil.clone().with_source_batch_code("B-999");

        let corrected = result.with_reconciliation(Decimal::from(600)).unwrap();
        let updated = corrected.apply_to_lot(&oil);

        // (48000 + 600) / 300 = 162
        assert_eq!(updated.unit_cost, Decimal::from(162));
        assert_eq!(updated.remaining_quantity, Decimal::from(120));
        assert_eq!(corrected.apply_to_lot(&other).unit_cost, Decimal::from(160));
    }

    #[test]
    fn test_overflowing_amounts_are_errors() {
        let input = BatchCostInput::new("B-108", seed(1, 1), Decimal::from(300))
            .with_cake(Decimal::MAX, Decimal::from(2));

        assert!(matches!(
            BatchCostEngine::compute(&input, &CostingConfig::default()),
            Err(oilmill_core::CostError::ArithmeticOverflow(_))
        ));

        let result = BatchCostEngine::compute(
            &BatchCostInput::new("B-109", seed(1000, 50), Decimal::from(300)),
            &CostingConfig::default(),
        )
        .unwrap();
        assert!(result.with_reconciliation(Decimal::MAX).is_err());
    }

    #[test]
    fn test_compute_all_preserves_order() {
        let inputs = vec![
            BatchCostInput::new("B-1", seed(100, 10), Decimal::from(30)),
            BatchCostInput::new("B-2", seed(200, 10), Decimal::from(60)),
            BatchCostInput::new("B-3", seed(-1, 10), Decimal::from(60)),
        ];

        let results = BatchCostEngine::compute_all(&inputs, &CostingConfig::default());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().batch_code, "B-1");
        assert_eq!(results[1].as_ref().unwrap().seed_cost, Decimal::from(2000));
        assert!(results[2].is_err());
    }
}
