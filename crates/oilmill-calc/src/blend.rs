//! 混油加權成本計算

use chrono::NaiveDateTime;
use oilmill_core::{
    checked_div, checked_mul, checked_sum, ensure_non_negative, BlendComponent, CostError,
    InventoryLot,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::{CostWarning, WarningKind};

/// 混油計算輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendInput {
    /// 混油批號
    pub blend_code: String,

    pub components: Vec<BlendComponent>,

    /// 混油總量
    pub total_quantity: Decimal,

    /// 指定成品油種（混合油種時必填）
    pub result_oil_type: Option<String>,
}

impl BlendInput {
    pub fn new(blend_code: &str, components: Vec<BlendComponent>, total_quantity: Decimal) -> Self {
        Self {
            blend_code: blend_code.to_string(),
            components,
            total_quantity,
            result_oil_type: None,
        }
    }

    /// 建構器模式：指定成品油種
    pub fn with_result_oil_type(mut self, oil_type: &str) -> Self {
        self.result_oil_type = Some(oil_type.to_string());
        self
    }
}

/// 單一來源的分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendAllocation {
    pub source_lot_id: String,
    pub percentage: Decimal,
    /// 分配數量 = 總量 × 比例 / 100
    pub allocated_quantity: Decimal,
    pub unit_cost: Decimal,
    pub cost: Decimal,
}

/// 混油成本結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendCostResult {
    pub id: Uuid,
    pub blend_code: String,
    pub oil_type: String,
    /// 是否為混合油種
    pub is_mixed: bool,
    pub total_quantity: Decimal,
    pub total_cost: Decimal,
    /// 加權平均單位成本
    pub weighted_unit_cost: Decimal,
    pub allocations: Vec<BlendAllocation>,
    pub warnings: Vec<CostWarning>,
}

impl BlendCostResult {
    /// 建立混油成品庫存批次
    pub fn to_inventory_lot(&self, produced_at: NaiveDateTime) -> InventoryLot {
        InventoryLot::new(
            self.blend_code.clone(),
            self.total_quantity,
            self.weighted_unit_cost,
            produced_at,
        )
        .with_oil_type(&self.oil_type)
        .with_traceable_code(&self.blend_code)
    }

    /// 各來源批次應扣減的數量（由持久層在交易中套用）
    pub fn source_decrements(&self) -> Vec<(String, Decimal)> {
        self.allocations
            .iter()
            .filter(|a| a.allocated_quantity > Decimal::ZERO)
            .map(|a| (a.source_lot_id.clone(), a.allocated_quantity))
            .collect()
    }
}

/// 混油成本計算引擎
pub struct BlendCostEngine;

impl BlendCostEngine {
    /// 計算混油加權成本與油種
    pub fn compute(input: &BlendInput) -> oilmill_core::Result<BlendCostResult> {
        tracing::debug!(
            "開始計算混油 {}：來源 {} 個，總量 {}",
            input.blend_code,
            input.components.len(),
            input.total_quantity
        );

        Self::validate(input)?;
        let (oil_type, is_mixed) = Self::determine_oil_type(input)?;

        let hundred = Decimal::from(100);
        let mut allocations = Vec::with_capacity(input.components.len());
        let mut warnings = Vec::new();

        for component in &input.components {
            let field = format!("{} 分配", component.source_lot_id);
            let allocated_quantity = checked_div(
                &field,
                checked_mul(&field, input.total_quantity, component.percentage_of_blend)?,
                hundred,
            )?;
            let cost = checked_mul(&field, allocated_quantity, component.source_unit_cost)?;

            if let Some(available) = component.available_quantity {
                if allocated_quantity > available {
                    tracing::warn!(
                        "混油 {} 來源 {} 不足：需要 {}，可用 {}",
                        input.blend_code,
                        component.source_lot_id,
                        allocated_quantity,
                        available
                    );
                    warnings.push(CostWarning::warning(
                        &input.blend_code,
                        WarningKind::InventoryShortage,
                        format!(
                            "來源 {} 需要 {}，僅剩 {}",
                            component.source_lot_id, allocated_quantity, available
                        ),
                    ));
                }
            }

            allocations.push(BlendAllocation {
                source_lot_id: component.source_lot_id.clone(),
                percentage: component.percentage_of_blend,
                allocated_quantity,
                unit_cost: component.source_unit_cost,
                cost,
            });
        }

        let total_cost = checked_sum("混油總成本", allocations.iter().map(|a| a.cost))?;
        let weighted_unit_cost = checked_div("加權單位成本", total_cost, input.total_quantity)?;

        tracing::info!(
            "混油 {} 完成：油種 {}，加權成本 {}",
            input.blend_code,
            oil_type,
            weighted_unit_cost
        );

        Ok(BlendCostResult {
            id: Uuid::new_v4(),
            blend_code: input.blend_code.clone(),
            oil_type,
            is_mixed,
            total_quantity: input.total_quantity,
            total_cost,
            weighted_unit_cost,
            allocations,
            warnings,
        })
    }

    /// 驗證來源數量、比例與總量
    pub fn validate(input: &BlendInput) -> oilmill_core::Result<()> {
        if input.components.len() < 2 {
            return Err(CostError::InsufficientBlendComponents(input.components.len()));
        }
        if input.total_quantity <= Decimal::ZERO {
            return Err(CostError::InvalidCostInput(format!(
                "混油總量必須大於 0: {}",
                input.total_quantity
            )));
        }

        let hundred = Decimal::from(100);
        let mut seen = HashSet::new();
        for component in &input.components {
            if !seen.insert(component.source_lot_id.as_str()) {
                return Err(CostError::InvalidCostInput(format!(
                    "來源批次重複: {}",
                    component.source_lot_id
                )));
            }
            ensure_non_negative(
                &format!("{} 比例", component.source_lot_id),
                component.percentage_of_blend,
            )?;
            if component.percentage_of_blend > hundred {
                return Err(CostError::InvalidCostInput(format!(
                    "{} 比例超過 100: {}",
                    component.source_lot_id, component.percentage_of_blend
                )));
            }
            ensure_non_negative(
                &format!("{} 單位成本", component.source_lot_id),
                component.source_unit_cost,
            )?;
        }

        // 必須剛好 100，不允許任何誤差
        let total = checked_sum(
            "混油比例",
            input.components.iter().map(|c| c.percentage_of_blend),
        )?;
        if total != hundred {
            return Err(CostError::PercentageMismatch { total });
        }

        Ok(())
    }

    /// 決定成品油種，回傳（油種, 是否混合）
    fn determine_oil_type(input: &BlendInput) -> oilmill_core::Result<(String, bool)> {
        let types: BTreeSet<&str> = input
            .components
            .iter()
            .filter(|c| c.percentage_of_blend > Decimal::ZERO)
            .map(|c| c.actual_oil_type.trim())
            .collect();

        let requested = input
            .result_oil_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if types.len() == 1 {
            let inherited = types.into_iter().next().unwrap_or_default().to_string();
            if let Some(requested) = requested {
                if requested != inherited {
                    tracing::debug!(
                        "混油 {} 為單一油種 {}，忽略指定油種 {}",
                        input.blend_code,
                        inherited,
                        requested
                    );
                }
            }
            return Ok((inherited, false));
        }

        match requested {
            Some(oil_type) => Ok((oil_type.to_string(), true)),
            None => Err(CostError::ResultOilTypeRequired),
        }
    }
}
