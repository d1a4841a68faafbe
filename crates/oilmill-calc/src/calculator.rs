//! 成本要素計算

use oilmill_core::{
    checked_div, checked_mul, checked_sum, ensure_non_negative, Activity, CalculationMethod,
    CostElement, CostElementCatalog, CostError, CostInput, CostingConfig,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::time_tracker::BilledDuration;

/// 計算情境（該次製程的數量資料）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostContext {
    /// 該階段的主要質量（一般要素的計量基礎）
    pub primary_mass: Decimal,

    /// 乾燥前質量（Drying 要素使用）
    pub mass_before: Decimal,

    /// 乾燥後質量
    pub mass_after: Decimal,

    /// 出油量（Common 要素使用）
    pub oil_yield: Decimal,

    /// 計費工時
    pub hours: Decimal,

    /// 指定袋數（未指定時由質量推算）
    pub bag_count: Option<Decimal>,

    /// 每袋公斤數
    pub bag_divisor: Decimal,
}

impl CostContext {
    /// 創建新的計算情境（乾燥前後質量預設等於主要質量）
    pub fn new(primary_mass: Decimal) -> Self {
        Self {
            primary_mass,
            mass_before: primary_mass,
            mass_after: primary_mass,
            oil_yield: Decimal::ZERO,
            hours: Decimal::ZERO,
            bag_count: None,
            bag_divisor: Decimal::from(50),
        }
    }

    /// 依配置創建計算情境
    pub fn from_config(primary_mass: Decimal, config: &CostingConfig) -> Self {
        Self::new(primary_mass).with_bag_divisor(config.bag_divisor)
    }

    /// 建構器模式：設置乾燥前後質量
    pub fn with_masses(mut self, mass_before: Decimal, mass_after: Decimal) -> Self {
        self.mass_before = mass_before;
        self.mass_after = mass_after;
        self
    }

    /// 建構器模式：設置出油量
    pub fn with_oil_yield(mut self, oil_yield: Decimal) -> Self {
        self.oil_yield = oil_yield;
        self
    }

    /// 建構器模式：設置計費工時
    pub fn with_hours(mut self, hours: Decimal) -> Self {
        self.hours = hours;
        self
    }

    /// 建構器模式：以計費工時設置工時（不使用實際工時）
    pub fn with_billed_duration(mut self, duration: BilledDuration) -> Self {
        self.hours = duration.billed_hours;
        self
    }

    /// 建構器模式：設置袋數
    pub fn with_bag_count(mut self, bag_count: Decimal) -> Self {
        self.bag_count = Some(bag_count);
        self
    }

    /// 建構器模式：設置每袋公斤數
    pub fn with_bag_divisor(mut self, bag_divisor: Decimal) -> Self {
        self.bag_divisor = bag_divisor;
        self
    }

    fn validate(&self) -> oilmill_core::Result<()> {
        ensure_non_negative("主要質量", self.primary_mass)?;
        ensure_non_negative("乾燥前質量", self.mass_before)?;
        ensure_non_negative("乾燥後質量", self.mass_after)?;
        ensure_non_negative("出油量", self.oil_yield)?;
        ensure_non_negative("工時", self.hours)?;
        if let Some(bags) = self.bag_count {
            ensure_non_negative("袋數", bags)?;
        }
        if self.bag_divisor <= Decimal::ZERO {
            return Err(CostError::InvalidCostInput(format!(
                "每袋公斤數必須大於 0: {}",
                self.bag_divisor
            )));
        }
        Ok(())
    }

    /// 依作業階段選擇質量基礎
    pub fn mass_driver(&self, activity: &Activity) -> Decimal {
        match activity {
            Activity::Common => self.oil_yield,
            Activity::Drying => self.mass_before,
            _ => self.primary_mass,
        }
    }
}

/// 成本明細行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub element_id: String,
    pub element_name: String,
    pub category: String,
    pub activity: Activity,
    pub calculation_method: CalculationMethod,
    /// 計算數量
    pub quantity: Decimal,
    /// 生效費率（actual 方式為實際金額）
    pub rate: Decimal,
    /// 是否使用覆寫費率
    pub rate_overridden: bool,
    pub is_applied: bool,
    /// 小計（未套用為 0）
    pub total: Decimal,
}

/// 成本計算結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostCalculation {
    pub lines: Vec<CostLine>,
    pub total: Decimal,
}

impl CostCalculation {
    /// 創建空的計算結果
    pub fn empty() -> Self {
        Self::default()
    }

    /// 已套用的明細行
    pub fn applied_lines(&self) -> impl Iterator<Item = &CostLine> {
        self.lines.iter().filter(|l| l.is_applied)
    }

    pub fn line(&self, element_id: &str) -> Option<&CostLine> {
        self.lines.iter().find(|l| l.element_id == element_id)
    }

    /// 指定作業階段的小計
    pub fn total_for_activity(&self, activity: &Activity) -> Decimal {
        self.applied_lines()
            .filter(|l| &l.activity == activity)
            .map(|l| l.total)
            .sum()
    }
}

/// 成本要素計算器
///
/// 純函數：相同輸入必得相同輸出
pub struct CostCalculator;

impl CostCalculator {
    /// 計算成本要素明細與合計
    ///
    /// `inputs` 中沒有對應項目的要素：必要要素視為套用，可選要素視為不套用。
    /// `inputs` 中多餘的項目（其他階段的要素）會被忽略。
    pub fn compute(
        elements: &[CostElement],
        inputs: &HashMap<String, CostInput>,
        context: &CostContext,
    ) -> oilmill_core::Result<CostCalculation> {
        context.validate()?;

        let mut lines = Vec::with_capacity(elements.len());
        for element in elements {
            let input = match inputs.get(&element.element_id) {
                Some(input) => input.clone(),
                None if element.is_optional => CostInput::skipped(&element.element_id),
                None => CostInput::applied(&element.element_id),
            };
            lines.push(Self::compute_line(element, &input, context)?);
        }

        let total = checked_sum(
            "成本合計",
            lines.iter().filter(|l| l.is_applied).map(|l| l.total),
        )?;

        tracing::debug!("成本要素 {} 項，合計 {}", lines.len(), total);

        Ok(CostCalculation { lines, total })
    }

    /// 以目錄中符合條件的要素計算
    pub fn compute_for_catalog<F>(
        catalog: &CostElementCatalog,
        filter: F,
        inputs: &HashMap<String, CostInput>,
        context: &CostContext,
    ) -> oilmill_core::Result<CostCalculation>
    where
        F: Fn(&CostElement) -> bool,
    {
        Self::compute(&catalog.select(filter), inputs, context)
    }

    /// 單一要素計算
    fn compute_line(
        element: &CostElement,
        input: &CostInput,
        context: &CostContext,
    ) -> oilmill_core::Result<CostLine> {
        element.validate()?;
        if let Some(rate) = input.override_rate {
            ensure_non_negative(&format!("{} 覆寫費率", element.element_id), rate)?;
        }

        let is_applied = input.effective_applied(element);
        let mut rate = input.effective_rate(element);
        let driver = context.mass_driver(&element.activity);

        let quantity = match element.calculation_method {
            CalculationMethod::PerKg => driver,
            CalculationMethod::PerHour => context.hours,
            CalculationMethod::PerBag => match context.bag_count {
                Some(bags) => bags,
                None => checked_div(
                    &format!("{} 袋數", element.element_id),
                    driver,
                    context.bag_divisor,
                )?
                .ceil(),
            },
            CalculationMethod::Fixed => {
                if is_applied {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
            CalculationMethod::Actual => Decimal::ONE,
        };

        let total = if !is_applied {
            Decimal::ZERO
        } else if element.calculation_method == CalculationMethod::Actual {
            let amount = input.actual_amount.ok_or_else(|| {
                CostError::InvalidCostInput(format!(
                    "{} 為實際金額計算，但未提供金額",
                    element.element_id
                ))
            })?;
            ensure_non_negative(&format!("{} 實際金額", element.element_id), amount)?;
            rate = amount;
            amount
        } else {
            checked_mul(&format!("{} 小計", element.element_id), quantity, rate)?
        };

        Ok(CostLine {
            element_id: element.element_id.clone(),
            element_name: element.name.clone(),
            category: element.category.clone(),
            activity: element.activity.clone(),
            calculation_method: element.calculation_method,
            quantity,
            rate,
            rate_overridden: input.override_rate.is_some(),
            is_applied,
            total,
        })
    }
}
