//! 成本要素目錄

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::element::{Activity, CostElement, CostElementRow};
use crate::rates::RateProvider;
use crate::{CostError, Result};

/// 成本要素目錄（依主檔順序保存）
#[derive(Debug, Clone, Default)]
pub struct CostElementCatalog {
    elements: Vec<CostElement>,
    index: HashMap<String, usize>,
}

impl CostElementCatalog {
    /// 由成本要素建立目錄，ID 重複或費率為負時失敗
    pub fn new(elements: Vec<CostElement>) -> Result<Self> {
        let mut catalog = Self::default();
        for element in elements {
            catalog.insert(element)?;
        }
        Ok(catalog)
    }

    /// 由主檔原始資料列建立目錄
    pub fn from_rows(rows: Vec<CostElementRow>) -> Result<Self> {
        let elements = rows
            .into_iter()
            .map(CostElement::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(elements)
    }

    /// 由 JSON 主檔陣列建立目錄
    pub fn from_json_str(json: &str) -> Result<Self> {
        let rows: Vec<CostElementRow> = serde_json::from_str(json)?;
        Self::from_rows(rows)
    }

    fn insert(&mut self, element: CostElement) -> Result<()> {
        element.validate()?;
        if self.index.contains_key(&element.element_id) {
            return Err(CostError::DuplicateCostElement(element.element_id));
        }
        self.index
            .insert(element.element_id.clone(), self.elements.len());
        self.elements.push(element);
        Ok(())
    }

    pub fn get(&self, element_id: &str) -> Option<&CostElement> {
        self.index.get(element_id).map(|&i| &self.elements[i])
    }

    /// 取得成本要素，找不到時回報錯誤
    pub fn require(&self, element_id: &str) -> Result<&CostElement> {
        self.get(element_id)
            .ok_or_else(|| CostError::CostElementNotFound(element_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CostElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 依作業階段篩選
    pub fn by_activity(&self, activity: &Activity) -> Vec<CostElement> {
        self.select(|e| &e.activity == activity)
    }

    /// 基本成本要素（非生產階段、非銷售）
    pub fn basic_elements(&self) -> Vec<CostElement> {
        self.select(|e| !e.activity.is_stage_scoped() && e.activity != Activity::Sales)
    }

    /// 指定生產階段的延伸成本要素
    pub fn stage_elements(&self, activity: &Activity) -> Vec<CostElement> {
        self.by_activity(activity)
    }

    /// 銷售階段附加成本要素
    pub fn sale_elements(&self) -> Vec<CostElement> {
        self.by_activity(&Activity::Sales)
    }

    /// 以條件篩選（保留主檔順序）
    pub fn select<F>(&self, filter: F) -> Vec<CostElement>
    where
        F: Fn(&CostElement) -> bool,
    {
        self.elements.iter().filter(|&e| filter(e)).cloned().collect()
    }
}

impl RateProvider for CostElementCatalog {
    fn rate(&self, element_id: &str) -> Option<Decimal> {
        self.get(element_id).map(|e| e.default_rate)
    }
}
