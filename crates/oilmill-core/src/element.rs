//! 成本要素主檔模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CostError, Result};

/// 計算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// 按公斤計
    PerKg,
    /// 按工時計
    PerHour,
    /// 按袋計
    PerBag,
    /// 固定金額
    Fixed,
    /// 實際發生金額
    Actual,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::PerKg => "per_kg",
            CalculationMethod::PerHour => "per_hour",
            CalculationMethod::PerBag => "per_bag",
            CalculationMethod::Fixed => "fixed",
            CalculationMethod::Actual => "actual",
        }
    }
}

impl FromStr for CalculationMethod {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_kg" => Ok(CalculationMethod::PerKg),
            "per_hour" => Ok(CalculationMethod::PerHour),
            "per_bag" => Ok(CalculationMethod::PerBag),
            "fixed" => Ok(CalculationMethod::Fixed),
            "actual" => Ok(CalculationMethod::Actual),
            _ => Err(CostError::UnsupportedCalculationMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 作業階段標籤
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Activity {
    /// 乾燥
    Drying,
    /// 壓榨
    Crushing,
    /// 過濾
    Filtering,
    /// 共用（以出油量計）
    Common,
    /// 一般
    General,
    /// 銷售階段（包裝、運輸等）
    Sales,
    /// 其他自訂標籤
    Other(String),
}

impl Activity {
    pub fn as_str(&self) -> &str {
        match self {
            Activity::Drying => "Drying",
            Activity::Crushing => "Crushing",
            Activity::Filtering => "Filtering",
            Activity::Common => "Common",
            Activity::General => "General",
            Activity::Sales => "Sales",
            Activity::Other(name) => name,
        }
    }

    /// 是否屬於生產階段範圍（乾燥／壓榨／過濾）
    pub fn is_stage_scoped(&self) -> bool {
        matches!(
            self,
            Activity::Drying | Activity::Crushing | Activity::Filtering
        )
    }
}

impl From<String> for Activity {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "drying" => Activity::Drying,
            "crushing" => Activity::Crushing,
            "filtering" => Activity::Filtering,
            "common" => Activity::Common,
            "general" | "" => Activity::General,
            "sales" | "sale" => Activity::Sales,
            _ => Activity::Other(value.trim().to_string()),
        }
    }
}

impl From<&str> for Activity {
    fn from(value: &str) -> Self {
        Activity::from(value.to_string())
    }
}

impl From<Activity> for String {
    fn from(value: Activity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成本要素（主檔，引擎唯讀）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostElement {
    /// 要素ID
    pub element_id: String,

    /// 名稱（如「壓榨人工」）
    pub name: String,

    /// 類別（Labor / Utilities / Consumables ...）
    pub category: String,

    /// 作業階段
    pub activity: Activity,

    /// 計量單位
    pub unit_type: String,

    /// 計算方式
    pub calculation_method: CalculationMethod,

    /// 預設費率
    pub default_rate: Decimal,

    /// 是否可選（false 表示必定套用）
    pub is_optional: bool,
}

impl CostElement {
    /// 創建新的成本要素（預設為必要、一般階段）
    pub fn new(
        element_id: String,
        name: String,
        calculation_method: CalculationMethod,
        default_rate: Decimal,
    ) -> Self {
        Self {
            element_id,
            name,
            category: "General".to_string(),
            activity: Activity::General,
            unit_type: default_unit(calculation_method).to_string(),
            calculation_method,
            default_rate,
            is_optional: false,
        }
    }

    /// 建構器模式：設置類別
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// 建構器模式：設置作業階段
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    /// 建構器模式：設置計量單位
    pub fn with_unit_type(mut self, unit_type: &str) -> Self {
        self.unit_type = unit_type.to_string();
        self
    }

    /// 建構器模式：設為可選
    pub fn as_optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// 驗證主檔資料
    pub fn validate(&self) -> Result<()> {
        if self.element_id.trim().is_empty() {
            return Err(CostError::InvalidCostInput(
                "成本要素ID不可為空".to_string(),
            ));
        }
        crate::ensure_non_negative(&format!("{} 預設費率", self.element_id), self.default_rate)
    }
}

fn default_unit(method: CalculationMethod) -> &'static str {
    match method {
        CalculationMethod::PerKg => "kg",
        CalculationMethod::PerHour => "hour",
        CalculationMethod::PerBag => "bag",
        CalculationMethod::Fixed | CalculationMethod::Actual => "lot",
    }
}

/// 主檔原始資料列（計算方式仍為字串）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostElementRow {
    pub element_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    pub calculation_method: String,
    pub default_rate: Decimal,
    #[serde(default)]
    pub is_optional: bool,
}

impl TryFrom<CostElementRow> for CostElement {
    type Error = CostError;

    fn try_from(row: CostElementRow) -> Result<Self> {
        let method: CalculationMethod = row.calculation_method.parse()?;
        let mut element = CostElement::new(row.element_id, row.name, method, row.default_rate);
        if let Some(category) = row.category {
            element.category = category;
        }
        if let Some(activity) = row.activity {
            element.activity = Activity::from(activity);
        }
        if let Some(unit_type) = row.unit_type {
            element.unit_type = unit_type;
        }
        element.is_optional = row.is_optional;
        element.validate()?;
        Ok(element)
    }
}
